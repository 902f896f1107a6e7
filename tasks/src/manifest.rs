use protoc_paths::{DiskInterface, NodeCache, NodeRef};
use protoc_scan::ScanError;

use crate::{config::Configuration, task::Task, Tasks};

/// Escapes a path for the left or right hand side of a ninja build edge.
pub fn escape(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '$' | ' ' | ':' => {
                out.push('$');
                out.push(c);
            }
            '\n' => out.push_str("$\n"),
            c => out.push(c),
        }
    }
    out
}

fn escape_value(value: &str) -> String {
    value.replace('$', "$$")
}

fn bld_path(cache: &NodeCache, node: NodeRef) -> String {
    escape(&cache.bld_path(node).to_string_lossy())
}

fn edge<D: DiskInterface>(
    task: &Task,
    cache: &mut NodeCache,
    disk: &D,
) -> Result<String, ScanError> {
    let deps = task.scan(cache, disk)?;
    let outputs: Vec<String> = task.outputs.iter().map(|n| bld_path(cache, *n)).collect();
    let implicit: Vec<String> = deps
        .nodes
        .iter()
        .filter(|n| **n != task.input)
        .map(|n| bld_path(cache, *n))
        .collect();

    let mut out = format!(
        "build {}: {} {}",
        outputs.join(" "),
        Task::NAME,
        bld_path(cache, task.input)
    );
    if !implicit.is_empty() {
        out.push_str(" | ");
        out.push_str(&implicit.join(" "));
    }
    out.push('\n');
    out.push_str(&format!(
        "  cmd = {}\n",
        escape_value(&task.invocation.to_string())
    ));
    Ok(out)
}

fn uselib_vars(config: &Configuration) -> String {
    let mut out = String::new();
    for (name, lib) in &config.uselib {
        let name = name.to_lowercase();
        if !lib.cflags.is_empty() {
            out.push_str(&format!(
                "{}_cflags = {}\n",
                name,
                escape_value(&lib.cflags.join(" "))
            ));
        }
        if !lib.libs.is_empty() {
            out.push_str(&format!(
                "{}_libs = {}\n",
                name,
                escape_value(&lib.libs.join(" "))
            ));
        }
    }
    out
}

/// Renders `tasks` as a ninja manifest meant to live in the build root.
///
/// Every task is scanned, and what it imports becomes an implicit input of its edge. Imports
/// that did not resolve are left out. Use libraries with known flags become top level variables
/// for the edges that compile the generated code.
pub fn manifest<D: DiskInterface>(
    tasks: &Tasks,
    config: &Configuration,
    cache: &mut NodeCache,
    disk: &D,
) -> Result<String, ScanError> {
    let mut out = uselib_vars(config);
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(&format!(
        "rule {}\n  command = $cmd\n  description = PROTOC $in\n",
        Task::NAME
    ));
    for task in tasks {
        out.push('\n');
        out.push_str(&edge(task, cache, disk)?);
    }
    Ok(out)
}
