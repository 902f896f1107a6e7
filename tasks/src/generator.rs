use protoc_paths::{DiskInterface, NodeCache, NodeRef};
use protoc_scan::{resolve, resolve_dirs, Feature, FeatureSet, SearchRoots};

use crate::{
    config::USELIB,
    env::InvocationEnv,
    plan::plan,
    task::{synthesize, Task},
    ProcessError, Tasks,
};

/// A build target as the build tool declares it.
#[derive(Debug, Clone)]
pub struct TaskGenerator {
    pub name: String,
    pub features: FeatureSet,
    /// Grows as schemas are processed: generated sources are appended so later steps compile
    /// them.
    pub source: Vec<NodeRef>,
    /// Include directories of the C++ side, already resolved.
    pub includes: Vec<NodeRef>,
    /// Extra schema include directories, relative to the project root.
    pub protoc_includes: Vec<String>,
    pub uses: Vec<String>,
}

fn is_schema(cache: &NodeCache, node: NodeRef) -> bool {
    cache
        .file_name(node)
        .map(|name| name.ends_with(".proto"))
        .unwrap_or(false)
}

impl TaskGenerator {
    pub fn new<S: Into<String>>(name: S, features: FeatureSet) -> TaskGenerator {
        TaskGenerator {
            name: name.into(),
            features,
            source: vec![],
            includes: vec![],
            protoc_includes: vec![],
            uses: vec![],
        }
    }

    pub fn add_use(&mut self, token: &str) {
        if !self.uses.iter().any(|u| u == token) {
            self.uses.push(token.to_owned());
        }
    }

    /// Processes every schema among the generator's declared sources, in order.
    ///
    /// Sources appended while processing are generated code and are not revisited.
    pub fn process<D: DiskInterface>(
        &mut self,
        cache: &mut NodeCache,
        disk: &D,
        env: &mut InvocationEnv,
    ) -> Result<Tasks, ProcessError> {
        let incpaths = if self.features.contains(Feature::Cxx) {
            self.includes
                .iter()
                .map(|dir| cache.bld_path(*dir).to_string_lossy().into_owned())
                .collect()
        } else {
            vec![]
        };
        env.set_incpaths(incpaths);

        let roots = resolve(
            cache,
            disk,
            &self.features,
            &self.includes,
            &self.protoc_includes,
        )?;

        let declared: Vec<NodeRef> = self
            .source
            .iter()
            .copied()
            .filter(|node| is_schema(cache, *node))
            .collect();
        let mut tasks = Tasks::default();
        for node in declared {
            tasks.push(process_schema(self, cache, disk, env, node, &roots)?);
        }
        Ok(tasks)
    }
}

/// Plans, stores flags and synthesizes the task for one schema of `generator`.
///
/// Fails before anything is created if no recognized feature is active, a `protoc_includes`
/// entry is not a directory or the command line holds a word `sh` cannot quote.
pub fn process_schema<D: DiskInterface>(
    generator: &mut TaskGenerator,
    cache: &mut NodeCache,
    disk: &D,
    env: &mut InvocationEnv,
    node: NodeRef,
    roots: &SearchRoots,
) -> Result<Task, ProcessError> {
    let plan = plan(cache, node, &generator.features)?;

    let incdirs = resolve_dirs(cache, disk, &generator.protoc_includes)?;

    if env.store_flags(&plan.flags) {
        tracing::debug!(flags = ?plan.flags, generator = %generator.name, "stored protoc flags");
    } else if env.flags() != &plan.flags[..] {
        tracing::debug!(
            planned = ?plan.flags,
            stored = ?env.flags(),
            policy = ?env.policy(),
            "planned flags differ from stored flags"
        );
    }

    env.set_protoc_incpaths(
        incdirs
            .iter()
            .map(|dir| cache.bld_path(*dir).to_string_lossy().into_owned())
            .collect(),
    );

    let task = synthesize(cache, generator, &plan, env, roots.clone())?;
    tracing::info!(
        source = %cache.get(node).display(),
        outputs = task.outputs.len(),
        "synthesized protoc task"
    );

    generator.add_use(USELIB);
    Ok(task)
}
