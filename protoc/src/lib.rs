/*
 * Copyright 2020 Nikhil Marathe <nsm.nikhil@gmail.com>
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::{
    ffi::OsString,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use console::style;
use thiserror::Error;

use protoc_builder::{check, Dirtiness};
use protoc_metrics::scoped_metric;
use protoc_paths::{DiskInterface, NodeCache, SystemDiskInterface};
use protoc_scan::{FeatureSet, ResolveError};
use protoc_tasks::{
    manifest, Configuration, FlagPolicy, Task, TaskGenerator, Tasks, UseLib, USELIB,
};

pub const USAGE: &str = "\
usage: protoc-plan [options] [sources...]

options:
  -C DIR               change to DIR before doing anything else
  -d MODE              enable debugging (use '-d list' to list modes)
  -t TOOL              what to print: commands (default), deps, ninja, dirty
  -I, --include DIR    C++ include directory, also searched for imports
  --protoc-include DIR schema include directory, searched for imports with py
  --features LIST      feature tags of the target, e.g. 'cxx cxxprogram py'
  --build-dir DIR      where generated files go [build]
  --protoc PATH        compiler to invoke [protoc]
  --flag-policy POLICY first-writer (default) or per-file
  --uselib-cflags FLAGS, --uselib-libs FLAGS
                       flags of the protobuf runtime, for the manifest
  -v, --verbose        log what is being planned
";

/// Nothing to do with rustc debug vs. release.
#[derive(Debug, PartialEq, Eq)]
pub enum DebugMode {
    List,
    Stats,
}

#[derive(Error, Debug)]
#[error("unknown debug setting '{0}'")]
pub struct DebugModeError(String);

impl std::str::FromStr for DebugMode {
    type Err = DebugModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stats" => Ok(DebugMode::Stats),
            "list" => Ok(DebugMode::List),
            e => Err(DebugModeError(e.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// One compiler command line per schema.
    Commands,
    /// What each schema imports, transitively.
    Deps,
    /// A ninja manifest to generate the code with.
    Ninja,
    /// Which tasks are out of date.
    Dirty,
}

impl Default for Tool {
    fn default() -> Self {
        Tool::Commands
    }
}

#[derive(Error, Debug)]
#[error("unknown tool '{0}'")]
pub struct ToolError(String);

impl std::str::FromStr for Tool {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "commands" => Ok(Tool::Commands),
            "deps" => Ok(Tool::Deps),
            "ninja" => Ok(Tool::Ninja),
            "dirty" => Ok(Tool::Dirty),
            e => Err(ToolError(e.to_owned())),
        }
    }
}

#[derive(Debug)]
pub struct Config {
    pub execution_dir: Option<String>,
    pub build_dir: String,
    pub protoc: String,
    pub features: FeatureSet,
    pub includes: Vec<String>,
    pub protoc_includes: Vec<String>,
    pub flag_policy: FlagPolicy,
    pub uselib: UseLib,
    pub debug_modes: Vec<DebugMode>,
    pub tool: Tool,
    pub verbose: bool,
    pub sources: Vec<String>,
}

fn split_flags(flags: Option<String>) -> Vec<String> {
    flags
        .map(|f| f.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default()
}

impl Config {
    /// Parses everything after the program name.
    pub fn from_args(args: Vec<OsString>) -> anyhow::Result<Config> {
        let mut args = pico_args::Arguments::from_vec(args);
        Ok(Config {
            execution_dir: args.opt_value_from_str("-C")?,
            build_dir: args
                .opt_value_from_str("--build-dir")?
                .unwrap_or_else(|| "build".to_owned()),
            protoc: args
                .opt_value_from_str("--protoc")?
                .unwrap_or_else(|| "protoc".to_owned()),
            features: args
                .opt_value_from_str("--features")?
                .unwrap_or_default(),
            includes: args.values_from_str(["-I", "--include"])?,
            protoc_includes: args.values_from_str("--protoc-include")?,
            flag_policy: args
                .opt_value_from_str("--flag-policy")?
                .unwrap_or_default(),
            uselib: UseLib {
                cflags: split_flags(args.opt_value_from_str("--uselib-cflags")?),
                libs: split_flags(args.opt_value_from_str("--uselib-libs")?),
            },
            debug_modes: args.values_from_str("-d")?,
            tool: args.opt_value_from_str("-t")?.unwrap_or_default(),
            verbose: args.contains(["-v", "--verbose"]),
            sources: args.free()?,
        })
    }
}

fn describe(cache: &NodeCache, state: Dirtiness) -> String {
    match state {
        Dirtiness::Clean => "clean".to_owned(),
        Dirtiness::OutputMissing(node) => {
            format!("dirty, output {} missing", cache.get(node).display())
        }
        Dirtiness::Newer(node) => {
            format!("dirty, {} is newer than the outputs", cache.get(node).display())
        }
        Dirtiness::InputPending(node) => {
            format!("dirty, {} not generated yet", cache.get(node).display())
        }
    }
}

fn print_deps<D: DiskInterface, W: Write>(
    tasks: &Tasks,
    cache: &mut NodeCache,
    disk: &D,
    out: &mut W,
) -> anyhow::Result<()> {
    for task in tasks {
        let deps = task.scan(cache, disk)?;
        writeln!(out, "{}:", cache.get(task.input).display())?;
        for node in &deps.nodes {
            writeln!(out, "    {}", cache.get(*node).display())?;
        }
        for name in &deps.names {
            writeln!(out, "    {} (unresolved)", name)?;
        }
    }
    Ok(())
}

fn print_dirty<D: DiskInterface, W: Write>(
    tasks: &Tasks,
    cache: &mut NodeCache,
    disk: &D,
    out: &mut W,
) -> anyhow::Result<()> {
    for task in tasks {
        let deps = task.scan(cache, disk)?;
        let state = check(task, &deps, cache, disk)?;
        writeln!(
            out,
            "{} {}: {}",
            style(Task::NAME).blue(),
            cache.get(task.input).display(),
            describe(cache, state)
        )?;
    }
    Ok(())
}

/// Plans every source of `config` against `root` and prints what the selected tool asks for.
pub fn execute<D: DiskInterface, W: Write>(
    config: &Config,
    root: &Path,
    disk: &D,
    out: &mut W,
) -> anyhow::Result<()> {
    let mut cache = NodeCache::new(root, root.join(&config.build_dir));
    let mut generator = TaskGenerator::new(Task::NAME, config.features.clone());
    for include in &config.includes {
        let dir = cache
            .find_dir(disk, include)
            .ok_or_else(|| ResolveError::MissingIncludeDir(include.clone()))?;
        generator.includes.push(dir);
    }
    for source in &config.sources {
        let node = cache
            .source(source)
            .ok_or_else(|| anyhow!("source '{}' is outside {}", source, root.display()))?;
        generator.source.push(node);
    }
    generator.protoc_includes = config.protoc_includes.clone();

    let configuration = Configuration::new(PathBuf::from(&config.protoc))
        .with_uselib(USELIB, config.uselib.clone());
    let mut env = configuration.env(config.flag_policy);

    let tasks = {
        scoped_metric!("process");
        generator
            .process(&mut cache, disk, &mut env)
            .context("planning schemas")?
    };
    if tasks.is_empty() {
        tracing::info!("no schema files given");
    }

    match config.tool {
        Tool::Commands => {
            for task in &tasks {
                writeln!(out, "{}", task.invocation)?;
            }
        }
        Tool::Deps => print_deps(&tasks, &mut cache, disk, out)?,
        Tool::Ninja => {
            let text = manifest(&tasks, &configuration, &mut cache, disk)?;
            write!(out, "{}", text)?;
        }
        Tool::Dirty => print_dirty(&tasks, &mut cache, disk, out)?,
    }
    Ok(())
}

pub fn run(config: Config) -> anyhow::Result<()> {
    if let Some(dir) = &config.execution_dir {
        std::env::set_current_dir(&dir).with_context(|| format!("changing to {} for -C", &dir))?;
    }

    if config.debug_modes.contains(&DebugMode::List) {
        println!("debugging modes:");
        println!("  stats  print operation counts/timing info");
        println!("  list   list all available modes");
        return Ok(());
    }

    let metrics_enabled = config.debug_modes.iter().any(|v| v == &DebugMode::Stats);
    if metrics_enabled {
        protoc_metrics::enable();
    }

    let root = std::env::current_dir().context("finding the current directory")?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = execute(&config, &root, &SystemDiskInterface, &mut out);

    if metrics_enabled {
        protoc_metrics::dump();
    }
    result
}
