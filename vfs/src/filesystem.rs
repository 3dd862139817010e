use std::path::PathBuf;

use crate::VfsError;
use crate::provider::VfsProvider;

/// File system VFS provider reading files under a root directory.
///
/// Path traversal is prevented by the VFS path normalization which rejects
/// `..` segments before they reach the provider.
///
/// # Example
///
/// ```ignore
/// let mut vfs = Vfs::new();
/// vfs.mount("shaders", FileSystemProvider::new("./shaders"));
///
/// // Reads ./shaders/triangle.frag.spv
/// let bytes = vfs.read("shaders/triangle.frag.spv")?;
/// ```
pub struct FileSystemProvider {
    root: PathBuf,
}

impl FileSystemProvider {
    /// Create a provider rooted at the given directory.
    ///
    /// The directory does not need to exist yet; it is checked at read time.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl VfsProvider for FileSystemProvider {
    fn read(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        let full_path = self.resolve(path);
        let data = std::fs::read(&full_path)?;
        log::debug!("Read {} bytes from {}", data.len(), full_path.display());
        Ok(data)
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn describe(&self) -> String {
        format!("filesystem({})", self.root.display())
    }
}
