use std::{
    collections::{hash_map::Entry, HashMap},
    ffi::OsString,
    path::{Component, Path, PathBuf},
};

mod disk_interface;
pub use disk_interface::{DiskInterface, SystemDiskInterface};

#[cfg(any(test, feature = "testing"))]
pub mod memory;

pub type NodeRef = usize;

/// Which tree a node lives in. Schema sources live in the source tree, everything the compiler
/// produces lives in the build tree, which mirrors the source tree's layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tree {
    Source,
    Build,
}

#[derive(Debug)]
struct PathNode {
    tree: Tree,
    // Normalized and relative to the tree root. Empty for the root itself.
    path: PathBuf,
}

// Rough translation of HashMap entry API to be more ergonomic.
pub enum InsertResult {
    AlreadyExists(NodeRef),
    Inserted(NodeRef),
}

/// Hands out stable identities for files and directories.
///
/// Paths are normalized lexically (no `.`, `..` folded into the parent) before interning, so two
/// spellings of the same file map to the same `NodeRef`. Nothing here touches disk unless a
/// `DiskInterface` is passed in.
#[derive(Debug)]
pub struct NodeCache {
    src_root: PathBuf,
    bld_root: PathBuf,
    nodes: Vec<PathNode>,
    map: HashMap<(Tree, PathBuf), NodeRef>,
}

/// Folds `.` and `..` components. Returns `None` for paths that are absolute or escape the root.
pub fn normalize<P: AsRef<Path>>(path: P) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::Normal(part) => out.push(part),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

/// Lexical path from `base` to `target`. Both must be absolute.
fn relative_to(target: &Path, base: &Path) -> PathBuf {
    let target: Vec<Component> = target.components().collect();
    let base: Vec<Component> = base.components().collect();
    let common = target
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut out = PathBuf::new();
    for _ in common..base.len() {
        out.push("..");
    }
    for component in &target[common..] {
        out.push(component.as_os_str());
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

impl NodeCache {
    pub fn new<S: Into<PathBuf>, B: Into<PathBuf>>(src_root: S, bld_root: B) -> NodeCache {
        NodeCache {
            src_root: src_root.into(),
            bld_root: bld_root.into(),
            nodes: vec![],
            map: HashMap::new(),
        }
    }

    pub fn src_root(&self) -> &Path {
        &self.src_root
    }

    pub fn bld_root(&self) -> &Path {
        &self.bld_root
    }

    /// The same path ends up returning a re-used noderef. `path` must already be normalized.
    fn insert(&mut self, tree: Tree, path: PathBuf) -> InsertResult {
        match self.map.entry((tree, path)) {
            Entry::Occupied(e) => InsertResult::AlreadyExists(*e.get()),
            Entry::Vacant(e) => {
                self.nodes.push(PathNode {
                    tree,
                    path: e.key().1.clone(),
                });
                let idx = self.nodes.len() - 1;
                e.insert(idx);
                InsertResult::Inserted(idx)
            }
        }
    }

    fn insert_and_get(&mut self, tree: Tree, path: PathBuf) -> NodeRef {
        match self.insert(tree, path) {
            InsertResult::AlreadyExists(r) => r,
            InsertResult::Inserted(r) => r,
        }
    }

    /// Interns a source tree path without checking the disk.
    pub fn source<P: AsRef<Path>>(&mut self, path: P) -> Option<NodeRef> {
        let path = normalize(path)?;
        Some(self.insert_and_get(Tree::Source, path))
    }

    /// Interns a build tree path. Used for outputs, which need not exist yet.
    pub fn find_or_declare<P: AsRef<Path>>(&mut self, path: P) -> Option<NodeRef> {
        let path = normalize(path)?;
        Some(self.insert_and_get(Tree::Build, path))
    }

    /// An existing directory of the source tree, relative to the project root.
    pub fn find_dir<D: DiskInterface, P: AsRef<Path>>(
        &mut self,
        disk: &D,
        path: P,
    ) -> Option<NodeRef> {
        let path = normalize(path)?;
        if !disk.is_dir(self.src_root.join(&path)) {
            return None;
        }
        Some(self.insert_and_get(Tree::Source, path))
    }

    /// An existing file below `dir`.
    ///
    /// Outputs already declared in the build tree are preferred over the source tree, so a schema
    /// generated by an earlier task is found before it exists on disk.
    pub fn find_resource<D: DiskInterface, P: AsRef<Path>>(
        &mut self,
        disk: &D,
        dir: NodeRef,
        path: P,
    ) -> Option<NodeRef> {
        let path = normalize(self.nodes[dir].path.join(path))?;
        if let Some(declared) = self.map.get(&(Tree::Build, path.clone())) {
            return Some(*declared);
        }
        let tree = self.nodes[dir].tree;
        if !disk.is_file(self.root(tree).join(&path)) {
            return None;
        }
        Some(self.insert_and_get(tree, path))
    }

    pub fn get(&self, node: NodeRef) -> &Path {
        &self.nodes[node].path
    }

    pub fn tree(&self, node: NodeRef) -> Tree {
        self.nodes[node].tree
    }

    fn root(&self, tree: Tree) -> &Path {
        match tree {
            Tree::Source => &self.src_root,
            Tree::Build => &self.bld_root,
        }
    }

    pub fn abs_path(&self, node: NodeRef) -> PathBuf {
        let node = &self.nodes[node];
        let root = self.root(node.tree);
        if node.path.as_os_str().is_empty() {
            root.to_owned()
        } else {
            root.join(&node.path)
        }
    }

    /// The path the compiler sees, which runs from the build root.
    pub fn bld_path(&self, node: NodeRef) -> PathBuf {
        relative_to(&self.abs_path(node), &self.bld_root)
    }

    pub fn parent(&mut self, node: NodeRef) -> NodeRef {
        let tree = self.nodes[node].tree;
        let parent = self.nodes[node]
            .path
            .parent()
            .map(Path::to_owned)
            .unwrap_or_default();
        self.insert_and_get(tree, parent)
    }

    /// The build tree counterpart of `node`.
    pub fn get_bld(&mut self, node: NodeRef) -> NodeRef {
        let path = self.nodes[node].path.clone();
        self.insert_and_get(Tree::Build, path)
    }

    pub fn file_name(&self, node: NodeRef) -> Option<&str> {
        self.nodes[node].path.file_name().and_then(|n| n.to_str())
    }

    /// Replaces everything after the last `.` of the file name with `ext` and declares the result
    /// next to the build tree counterpart of `node`. `ext` carries its own leading separator, so
    /// `a.proto` with `_pb2.py` becomes `a_pb2.py`.
    pub fn change_ext(&mut self, node: NodeRef, ext: &str) -> NodeRef {
        let path = &self.nodes[node].path;
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        let stem = match name.rfind('.') {
            Some(k) => &name[..k],
            None => &name[..],
        };
        let mut new_name = OsString::from(stem);
        new_name.push(ext);
        let declared = path.with_file_name(new_name);
        self.insert_and_get(Tree::Build, declared)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
