use protoc_metrics::scoped_metric;
use protoc_paths::{NodeCache, NodeRef};
use protoc_scan::{Feature, FeatureSet};

use crate::PlanError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Compiled or interpreted downstream, so it joins the generator's sources.
    Source,
    /// Only ever included.
    Header,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOutput {
    pub node: NodeRef,
    pub feature: Feature,
    pub kind: OutputKind,
}

/// What compiling one schema has to produce, and the flags that make the compiler produce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPlan {
    pub source: NodeRef,
    pub outputs: Vec<PlannedOutput>,
    pub flags: Vec<String>,
}

impl ArtifactPlan {
    pub fn output_nodes(&self) -> Vec<NodeRef> {
        self.outputs.iter().map(|o| o.node).collect()
    }
}

fn generated(feature: Feature) -> &'static [(&'static str, OutputKind)] {
    match feature {
        Feature::Cxx => &[(".pb.cc", OutputKind::Source), (".pb.h", OutputKind::Header)],
        Feature::Python => &[("_pb2.py", OutputKind::Source)],
    }
}

fn out_flag(feature: Feature) -> &'static str {
    match feature {
        Feature::Cxx => "--cpp_out",
        Feature::Python => "--python_out",
    }
}

/// Plans the outputs of `source` for every recognized feature, C++ first.
///
/// Outputs are declared in the build tree next to where `source` would sit, and each language
/// gets an `--<lang>_out=` flag pointing there, relative to the build root.
pub fn plan(
    cache: &mut NodeCache,
    source: NodeRef,
    features: &FeatureSet,
) -> Result<ArtifactPlan, PlanError> {
    scoped_metric!("plan");
    if features.is_empty() {
        return Err(PlanError::UnsupportedFeatures(features.clone()));
    }

    let parent = cache.parent(source);
    let out_dir = cache.get_bld(parent);
    let out_dir = cache.bld_path(out_dir);

    let mut outputs = Vec::new();
    let mut flags = Vec::new();
    for feature in features.iter() {
        for (ext, kind) in generated(feature) {
            outputs.push(PlannedOutput {
                node: cache.change_ext(source, ext),
                feature,
                kind: *kind,
            });
        }
        flags.push(format!("{}={}", out_flag(feature), out_dir.display()));
    }

    Ok(ArtifactPlan {
        source,
        outputs,
        flags,
    })
}
