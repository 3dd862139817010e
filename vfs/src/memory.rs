use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::VfsError;
use crate::provider::VfsProvider;

/// In-memory VFS provider for tests and embedded assets.
///
/// Cloning shares the same storage, so files can still be inserted after a
/// clone has been mounted in a [`Vfs`](crate::Vfs).
///
/// # Example
///
/// ```ignore
/// let mem = MemoryProvider::new();
/// mem.insert("triangle.vert.spv", vertex_words);
///
/// let mut vfs = Vfs::new();
/// vfs.mount("builtin", mem);
/// ```
#[derive(Clone, Default)]
pub struct MemoryProvider {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryProvider {
    /// Create an empty in-memory provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file at the given path, replacing any previous contents.
    ///
    /// The path should use forward slashes and have no leading slash.
    pub fn insert(&self, path: impl Into<String>, data: Vec<u8>) {
        self.files.write().insert(path.into(), data);
    }

    /// Remove a file at the given path, returning its data if it existed.
    pub fn remove(&self, path: &str) -> Option<Vec<u8>> {
        self.files.write().remove(path)
    }

    /// Number of stored files.
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Whether no files are stored.
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

impl VfsProvider for MemoryProvider {
    fn read(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| VfsError::NotFound(path.to_owned()))
    }

    fn exists(&self, path: &str) -> bool {
        self.files.read().contains_key(path)
    }

    fn describe(&self) -> String {
        format!("memory({} files)", self.len())
    }
}
