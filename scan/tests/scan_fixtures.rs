use protoc_paths::{NodeCache, SystemDiskInterface};
use protoc_scan::{resolve, scan, FeatureSet, ResolveError};
use std::path::{Path, PathBuf};

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn scan_service(protoc_includes: &[&str]) -> (Vec<String>, Vec<String>) {
    let disk = SystemDiskInterface;
    let mut cache = NodeCache::new(fixtures(), fixtures().join("build"));
    let features: FeatureSet = "py".parse().unwrap();
    let roots = resolve(&mut cache, &disk, &features, &[], protoc_includes).expect("dirs exist");
    let root = cache.source("app/service.proto").unwrap();
    let result = scan(&mut cache, &disk, root, &roots).expect("scan succeeds");
    let mut nodes: Vec<String> = result
        .nodes
        .iter()
        .map(|n| cache.get(*n).to_string_lossy().replace('\\', "/"))
        .collect();
    nodes.sort();
    let mut names = result.names;
    names.sort();
    (nodes, names)
}

#[test]
fn scans_fixture_project() {
    let (nodes, names) = scan_service(&["proto", "vendor"]);
    assert_eq!(nodes, vec!["proto/common/types.proto", "proto/shared.proto"]);
    assert_eq!(names, vec!["google/protobuf/timestamp.proto"]);
}

#[test]
fn search_order_picks_the_vendored_copy() {
    let (nodes, names) = scan_service(&["vendor", "proto"]);
    assert_eq!(nodes, vec!["proto/common/types.proto", "vendor/shared.proto"]);
    assert_eq!(
        names,
        vec!["google/protobuf/timestamp.proto", "vendor_only.proto"]
    );
}

#[test]
fn missing_include_dir_is_reported() {
    let disk = SystemDiskInterface;
    let mut cache = NodeCache::new(fixtures(), fixtures().join("build"));
    let features: FeatureSet = "py".parse().unwrap();
    let err = resolve(&mut cache, &disk, &features, &[], &["proto", "not_a_dir"]).unwrap_err();
    assert!(matches!(err, ResolveError::MissingIncludeDir(_)));
    assert_eq!(
        err.to_string(),
        "could not find include directory 'not_a_dir'"
    );
}
