use std::{io, path::PathBuf, time::SystemTime};

use protoc_metrics::scoped_metric;
use protoc_paths::{DiskInterface, NodeCache, NodeRef, Tree};
use protoc_scan::DependencyResult;
use protoc_tasks::Task;

use crate::CheckError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MTime {
    DoesNotExist,
    Modified(SystemTime),
}

/// Why a task has to run, if it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dirtiness {
    Clean,
    OutputMissing(NodeRef),
    /// An input or dependency changed after the oldest output was written.
    Newer(NodeRef),
    /// A dependency in the build tree that has not been generated yet.
    InputPending(NodeRef),
}

impl Dirtiness {
    pub fn is_dirty(&self) -> bool {
        !matches!(self, Dirtiness::Clean)
    }
}

fn mtime<D: DiskInterface>(
    cache: &NodeCache,
    disk: &D,
    node: NodeRef,
) -> Result<MTime, CheckError> {
    let path = cache.abs_path(node);
    match disk.modified(&path) {
        Ok(t) => Ok(MTime::Modified(t)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(MTime::DoesNotExist),
        Err(source) => Err(CheckError::Stat { path, source }),
    }
}

fn needed_by(cache: &NodeCache, task: &Task) -> PathBuf {
    task.outputs
        .first()
        .map(|o| cache.bld_path(*o))
        .unwrap_or_default()
}

/// Decides whether `task` has to run, given what scanning it found.
///
/// The primary input and every resolved dependency are compared against the oldest output.
/// Unresolved import names are not files and play no part.
pub fn check<D: DiskInterface>(
    task: &Task,
    deps: &DependencyResult,
    cache: &NodeCache,
    disk: &D,
) -> Result<Dirtiness, CheckError> {
    scoped_metric!("check");

    let mut inputs = Vec::with_capacity(deps.nodes.len() + 1);
    inputs.push(task.input);
    inputs.extend(deps.nodes.iter().copied().filter(|n| *n != task.input));

    let mut times = Vec::with_capacity(inputs.len());
    let mut pending = None;
    for node in inputs {
        match mtime(cache, disk, node)? {
            MTime::Modified(t) => times.push((node, t)),
            MTime::DoesNotExist if cache.tree(node) == Tree::Build => {
                pending.get_or_insert(node);
            }
            MTime::DoesNotExist => {
                return Err(CheckError::MissingInput {
                    input: cache.get(node).to_owned(),
                    output: needed_by(cache, task),
                });
            }
        }
    }

    let mut oldest: Option<SystemTime> = None;
    for output in &task.outputs {
        match mtime(cache, disk, *output)? {
            MTime::DoesNotExist => return Ok(Dirtiness::OutputMissing(*output)),
            MTime::Modified(t) => {
                oldest = Some(oldest.map_or(t, |o| o.min(t)));
            }
        }
    }

    if let Some(node) = pending {
        return Ok(Dirtiness::InputPending(node));
    }

    let oldest = match oldest {
        Some(t) => t,
        None => return Ok(Dirtiness::Clean),
    };
    Ok(times
        .into_iter()
        .find(|(_, t)| *t > oldest)
        .map_or(Dirtiness::Clean, |(node, _)| Dirtiness::Newer(node)))
}

#[cfg(test)]
mod test {
    use super::*;
    use protoc_paths::memory::MemoryDisk;
    use protoc_scan::{FeatureSet, SearchRoots};
    use protoc_tasks::{plan, synthesize, Configuration, FlagPolicy, TaskGenerator};

    fn task(cache: &mut NodeCache, features: &str) -> Task {
        let features: FeatureSet = features.parse().unwrap();
        let source = cache.source("a.proto").unwrap();
        let mut generator = TaskGenerator::new("app", features.clone());
        let env = Configuration::new("protoc").env(FlagPolicy::PerFile);
        let plan = plan(cache, source, &features).unwrap();
        synthesize(cache, &mut generator, &plan, &env, SearchRoots::default()).unwrap()
    }

    fn deps(cache: &mut NodeCache, names: &[&str]) -> DependencyResult {
        DependencyResult {
            nodes: names.iter().map(|n| cache.source(n).unwrap()).collect(),
            names: vec![],
        }
    }

    #[test]
    fn fresh_outputs_are_clean() {
        let mut cache = NodeCache::new("/p", "/p/build");
        let task = task(&mut cache, "cxx");
        let deps = deps(&mut cache, &["b.proto"]);
        let mut disk = MemoryDisk::new();
        disk.touch("/p/a.proto", 10);
        disk.touch("/p/b.proto", 20);
        disk.touch("/p/build/a.pb.cc", 30);
        disk.touch("/p/build/a.pb.h", 30);
        assert_eq!(check(&task, &deps, &cache, &disk).unwrap(), Dirtiness::Clean);
    }

    #[test]
    fn missing_output() {
        let mut cache = NodeCache::new("/p", "/p/build");
        let task = task(&mut cache, "cxx");
        let mut disk = MemoryDisk::new();
        disk.touch("/p/a.proto", 10);
        disk.touch("/p/build/a.pb.cc", 30);
        let dirty = check(&task, &DependencyResult::default(), &cache, &disk).unwrap();
        assert_eq!(dirty, Dirtiness::OutputMissing(task.outputs[1]));
        assert!(dirty.is_dirty());
    }

    #[test]
    fn edited_import_makes_the_task_stale() {
        let mut cache = NodeCache::new("/p", "/p/build");
        let task = task(&mut cache, "py");
        let deps = deps(&mut cache, &["b.proto", "c.proto"]);
        let mut disk = MemoryDisk::new();
        disk.touch("/p/a.proto", 10);
        disk.touch("/p/b.proto", 10);
        disk.touch("/p/c.proto", 10);
        disk.touch("/p/build/a_pb2.py", 20);
        assert_eq!(check(&task, &deps, &cache, &disk).unwrap(), Dirtiness::Clean);

        disk.touch("/p/c.proto", 25);
        assert_eq!(
            check(&task, &deps, &cache, &disk).unwrap(),
            Dirtiness::Newer(deps.nodes[1])
        );
    }

    #[test]
    fn compares_against_the_oldest_output() {
        let mut cache = NodeCache::new("/p", "/p/build");
        let task = task(&mut cache, "cxx py");
        let mut disk = MemoryDisk::new();
        disk.touch("/p/a.proto", 15);
        disk.touch("/p/build/a.pb.cc", 20);
        disk.touch("/p/build/a.pb.h", 20);
        disk.touch("/p/build/a_pb2.py", 10);
        assert_eq!(
            check(&task, &DependencyResult::default(), &cache, &disk).unwrap(),
            Dirtiness::Newer(task.input)
        );
    }

    #[test]
    fn missing_input_is_an_error() {
        let mut cache = NodeCache::new("/p", "/p/build");
        let task = task(&mut cache, "cxx");
        let mut disk = MemoryDisk::new();
        disk.touch("/p/build/a.pb.cc", 30);
        disk.touch("/p/build/a.pb.h", 30);
        let err = check(&task, &DependencyResult::default(), &cache, &disk).unwrap_err();
        assert_eq!(
            err.to_string(),
            "'a.proto', needed by 'a.pb.cc', missing and no known rule to make it"
        );
    }

    #[test]
    fn generated_dependency_not_built_yet() {
        let mut cache = NodeCache::new("/p", "/p/build");
        let task = task(&mut cache, "cxx");
        let generated = cache.find_or_declare("gen/b.proto").unwrap();
        let deps = DependencyResult {
            nodes: vec![generated],
            names: vec![],
        };
        let mut disk = MemoryDisk::new();
        disk.touch("/p/a.proto", 10);
        disk.touch("/p/build/a.pb.cc", 30);
        disk.touch("/p/build/a.pb.h", 30);
        assert_eq!(
            check(&task, &deps, &cache, &disk).unwrap(),
            Dirtiness::InputPending(generated)
        );
    }
}
