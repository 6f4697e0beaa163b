use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// File access used to load and re-stat resources.
pub trait ResourceStore {
    /// Last modification time of the file at `path`.
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Convenient alias for owning stores behind trait objects.
pub type BoxedResourceStore = Box<dyn ResourceStore>;

/// Store backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskStore;

impl ResourceStore for DiskStore {
    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}
