use crate::DiskInterface;
use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    io::{Error, ErrorKind, Result},
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

#[derive(Debug)]
struct MemoryFile {
    contents: Vec<u8>,
    mtime: SystemTime,
}

/// An in-memory filesystem. Directories exist implicitly for every file ancestor.
#[derive(Debug, Default)]
pub struct MemoryDisk {
    files: HashMap<PathBuf, MemoryFile>,
    dirs: HashSet<PathBuf>,
    reads: RefCell<HashMap<PathBuf, usize>>,
}

fn not_found(p: &Path) -> Error {
    Error::new(ErrorKind::NotFound, format!("{} not found", p.display()))
}

impl MemoryDisk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file<P: Into<PathBuf>, C: Into<Vec<u8>>>(&mut self, path: P, contents: C) {
        self.add_file_at(path, contents, UNIX_EPOCH);
    }

    pub fn add_file_at<P: Into<PathBuf>, C: Into<Vec<u8>>>(
        &mut self,
        path: P,
        contents: C,
        mtime: SystemTime,
    ) {
        self.files.insert(
            path.into(),
            MemoryFile {
                contents: contents.into(),
                mtime,
            },
        );
    }

    pub fn add_dir<P: Into<PathBuf>>(&mut self, path: P) {
        self.dirs.insert(path.into());
    }

    /// Sets the modification time to `secs` seconds after the epoch, creating an empty file if
    /// needed.
    pub fn touch<P: Into<PathBuf>>(&mut self, path: P, secs: u64) {
        let mtime = UNIX_EPOCH + Duration::from_secs(secs);
        self.files
            .entry(path.into())
            .and_modify(|f| f.mtime = mtime)
            .or_insert(MemoryFile {
                contents: vec![],
                mtime,
            });
    }

    /// How many times `path` has been read.
    pub fn reads<P: AsRef<Path>>(&self, path: P) -> usize {
        self.reads
            .borrow()
            .get(path.as_ref())
            .copied()
            .unwrap_or(0)
    }
}

impl DiskInterface for MemoryDisk {
    fn read<P: AsRef<Path>>(&self, p: P) -> Result<Vec<u8>> {
        let p = p.as_ref();
        let file = self.files.get(p).ok_or_else(|| not_found(p))?;
        *self.reads.borrow_mut().entry(p.to_owned()).or_insert(0) += 1;
        Ok(file.contents.clone())
    }

    fn modified<P: AsRef<Path>>(&self, p: P) -> Result<SystemTime> {
        let p = p.as_ref();
        self.files
            .get(p)
            .map(|f| f.mtime)
            .ok_or_else(|| not_found(p))
    }

    fn is_file<P: AsRef<Path>>(&self, p: P) -> bool {
        self.files.contains_key(p.as_ref())
    }

    fn is_dir<P: AsRef<Path>>(&self, p: P) -> bool {
        let p = p.as_ref();
        self.dirs.iter().any(|d| d.starts_with(p))
            || self
                .files
                .keys()
                .any(|f| f.starts_with(p) && f.as_path() != p)
    }
}
