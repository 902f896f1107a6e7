use protoc_metrics::scoped_metric;
use std::{io::Result, path::Path, time::SystemTime};

/// Everything the scanner and the staleness check need from the filesystem.
pub trait DiskInterface {
    fn read<P: AsRef<Path>>(&self, p: P) -> Result<Vec<u8>>;
    fn modified<P: AsRef<Path>>(&self, p: P) -> Result<SystemTime>;
    fn is_file<P: AsRef<Path>>(&self, p: P) -> bool;
    fn is_dir<P: AsRef<Path>>(&self, p: P) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDiskInterface;

impl DiskInterface for SystemDiskInterface {
    fn read<P: AsRef<Path>>(&self, p: P) -> Result<Vec<u8>> {
        scoped_metric!("read");
        std::fs::read(p)
    }

    fn modified<P: AsRef<Path>>(&self, p: P) -> Result<SystemTime> {
        scoped_metric!("stat");
        std::fs::metadata(p)?.modified()
    }

    fn is_file<P: AsRef<Path>>(&self, p: P) -> bool {
        scoped_metric!("stat");
        p.as_ref().is_file()
    }

    fn is_dir<P: AsRef<Path>>(&self, p: P) -> bool {
        scoped_metric!("stat");
        p.as_ref().is_dir()
    }
}
