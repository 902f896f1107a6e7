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

use std::{collections::HashSet, path::PathBuf};

use protoc_metrics::scoped_metric;
use protoc_paths::{DiskInterface, NodeCache, NodeRef};
use thiserror::Error;

mod features;
mod imports;
mod search;

pub use features::{Feature, FeatureSet};
pub use imports::imports;
pub use search::{resolve, resolve_dirs, SearchRoots};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("could not find include directory '{0}'")]
    MissingIncludeDir(String),
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What scanning one schema found.
///
/// `nodes` are dependency edges for the build graph. `names` are imports no search root could
/// satisfy, usually the well-known types shipped with the compiler; whether that is fine is the
/// caller's call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DependencyResult {
    pub nodes: Vec<NodeRef>,
    pub names: Vec<String>,
}

impl DependencyResult {
    fn add_node(&mut self, node: NodeRef, seen: &mut HashSet<NodeRef>) {
        if seen.insert(node) {
            self.nodes.push(node);
        }
    }

    fn add_name(&mut self, name: &str) {
        if !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_owned());
        }
    }
}

/// Finds every schema `root` transitively imports.
///
/// Each file is read at most once, so import cycles terminate. Order of `nodes` follows discovery
/// and carries no meaning beyond determinism.
pub fn scan<D: DiskInterface>(
    cache: &mut NodeCache,
    disk: &D,
    root: NodeRef,
    roots: &SearchRoots,
) -> Result<DependencyResult, ScanError> {
    scoped_metric!("scan");
    let mut result = DependencyResult::default();
    let mut visited = HashSet::new();
    let mut resolved = HashSet::new();
    let mut pending = vec![root];

    while let Some(node) = pending.pop() {
        if !visited.insert(node) {
            continue;
        }

        let path = cache.abs_path(node);
        let contents = disk
            .read(&path)
            .map_err(|source| ScanError::Read { path, source })?;
        let contents = String::from_utf8_lossy(&contents);

        let mut found = Vec::new();
        for import in imports(&contents) {
            let hit = roots
                .dirs()
                .iter()
                .find_map(|dir| cache.find_resource(disk, *dir, import));
            match hit {
                Some(dep) => {
                    result.add_node(dep, &mut resolved);
                    found.push(dep);
                }
                None => {
                    tracing::debug!(import, from = %cache.get(node).display(), "unresolved import");
                    result.add_name(import);
                }
            }
        }
        // Reversed so the first import of a file is scanned next.
        pending.extend(found.into_iter().rev());
    }

    Ok(result)
}
