use std::{fmt, path::PathBuf};

use protoc_paths::{DiskInterface, NodeCache, NodeRef};
use protoc_scan::{scan, DependencyResult, ScanError, SearchRoots};
use shlex::QuoteError;

use crate::{
    env::InvocationEnv,
    generator::TaskGenerator,
    plan::{ArtifactPlan, OutputKind},
};

/// A fully rendered compiler command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    line: String,
}

impl Invocation {
    /// Quotes every word for `sh`. Only a NUL byte cannot be quoted.
    pub fn new(program: PathBuf, args: Vec<String>) -> Result<Invocation, QuoteError> {
        let mut line = shlex::try_quote(&program.to_string_lossy())?.into_owned();
        for arg in &args {
            line.push(' ');
            line.push_str(&shlex::try_quote(arg)?);
        }
        Ok(Invocation {
            program,
            args,
            line,
        })
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}

/// One compiler run: a schema in, the planned artifacts out.
#[derive(Debug, Clone)]
pub struct Task {
    pub input: NodeRef,
    pub outputs: Vec<NodeRef>,
    pub invocation: Invocation,
    roots: SearchRoots,
}

impl Task {
    pub const NAME: &'static str = "protoc";

    pub fn search_roots(&self) -> &SearchRoots {
        &self.roots
    }

    /// Runs before the task is considered for execution. Every resolved node is an extra input
    /// edge, so editing any transitively imported schema makes this task stale.
    pub fn scan<D: DiskInterface>(
        &self,
        cache: &mut NodeCache,
        disk: &D,
    ) -> Result<DependencyResult, ScanError> {
        scan(cache, disk, self.input, &self.roots)
    }
}

/// Binds `plan` to a task and hands its compilable outputs to `generator`.
///
/// The command line is rendered from `env` as it is now, so the flags a task gets depend on
/// what was stored before it. The generator is left alone if the command line cannot be quoted.
pub fn synthesize(
    cache: &NodeCache,
    generator: &mut TaskGenerator,
    plan: &ArtifactPlan,
    env: &InvocationEnv,
    roots: SearchRoots,
) -> Result<Task, QuoteError> {
    let mut args = env.render_args(&plan.flags);
    args.push(cache.bld_path(plan.source).to_string_lossy().into_owned());
    let invocation = Invocation::new(env.protoc().clone(), args)?;

    for output in &plan.outputs {
        if output.kind == OutputKind::Source {
            generator.source.push(output.node);
        }
    }

    Ok(Task {
        input: plan.source,
        outputs: plan.output_nodes(),
        invocation,
        roots,
    })
}
