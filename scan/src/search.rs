use protoc_paths::{DiskInterface, NodeCache, NodeRef};

use crate::{Feature, FeatureSet, ResolveError};

/// Directories consulted, in order, to resolve an import. The first directory that contains the
/// imported path wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRoots {
    dirs: Vec<NodeRef>,
}

impl SearchRoots {
    pub fn new(dirs: Vec<NodeRef>) -> SearchRoots {
        SearchRoots { dirs }
    }

    pub fn dirs(&self) -> &[NodeRef] {
        &self.dirs
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

/// Looks up each directory name relative to the project root.
pub fn resolve_dirs<D, S>(
    cache: &mut NodeCache,
    disk: &D,
    names: &[S],
) -> Result<Vec<NodeRef>, ResolveError>
where
    D: DiskInterface,
    S: AsRef<str>,
{
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            cache
                .find_dir(disk, name)
                .ok_or_else(|| ResolveError::MissingIncludeDir(name.to_owned()))
        })
        .collect()
}

/// Builds the search roots of a task generator.
///
/// C++ targets search the generator's own `includes`, which the caller has already resolved.
/// Python has no such notion, so `protoc_includes` is looked up here, and a name that is not a
/// directory fails now instead of silently matching nothing later.
pub fn resolve<D, S>(
    cache: &mut NodeCache,
    disk: &D,
    features: &FeatureSet,
    generator_includes: &[NodeRef],
    explicit_include_dirs: &[S],
) -> Result<SearchRoots, ResolveError>
where
    D: DiskInterface,
    S: AsRef<str>,
{
    let mut dirs = Vec::new();
    if features.contains(Feature::Cxx) {
        dirs.extend_from_slice(generator_includes);
    }
    if features.contains(Feature::Python) {
        dirs.extend(resolve_dirs(cache, disk, explicit_include_dirs)?);
    }
    Ok(SearchRoots::new(dirs))
}
