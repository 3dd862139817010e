use std::collections::HashMap;

use crate::error::VfsError;
use crate::path;
use crate::provider::VfsProvider;

/// Virtual file system that routes paths to mounted providers.
///
/// Paths are structured as `"source_name/rest/of/path"`. The first path
/// segment selects the provider. If no source name matches, the default
/// source (if set) is tried with the full path.
///
/// # Example
///
/// ```ignore
/// let mut vfs = Vfs::new();
/// vfs.mount("assets", FileSystemProvider::new("./assets"));
/// vfs.set_default("assets");
///
/// // Both read ./assets/shaders/vert.spv
/// let a = vfs.read("assets/shaders/vert.spv")?;
/// let b = vfs.read("shaders/vert.spv")?;
/// ```
#[derive(Default)]
pub struct Vfs {
    sources: HashMap<String, Box<dyn VfsProvider>>,
    default_source: Option<String>,
}

impl Vfs {
    /// Create an empty VFS with no mounted sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a provider under the given source name.
    ///
    /// Replaces any previously mounted provider with the same name.
    pub fn mount(&mut self, name: impl Into<String>, provider: impl VfsProvider) {
        let name = name.into();
        log::debug!("Mounted {} at {name:?}", provider.describe());
        self.sources.insert(name, Box::new(provider));
    }

    /// Set the default source name used when a path does not match any mount.
    pub fn set_default(&mut self, name: impl Into<String>) {
        self.default_source = Some(name.into());
    }

    /// Read the entire contents of a file.
    ///
    /// The returned buffer is exactly as long as the file.
    pub fn read(&self, raw_path: &str) -> Result<Vec<u8>, VfsError> {
        let (provider, resolved_path) = self.resolve(raw_path)?;
        provider.read(&resolved_path)
    }

    /// Check whether a file exists.
    pub fn exists(&self, raw_path: &str) -> Result<bool, VfsError> {
        let (provider, resolved_path) = self.resolve(raw_path)?;
        Ok(provider.exists(&resolved_path))
    }

    /// Names of all mounted sources, sorted.
    pub fn sources(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve a raw path to a provider reference and the path within that provider.
    fn resolve(&self, raw_path: &str) -> Result<(&dyn VfsProvider, String), VfsError> {
        let normalized = path::normalize(raw_path)?;
        let (source, rest) = path::split_source(&normalized);

        if !rest.is_empty()
            && let Some(provider) = self.sources.get(source)
        {
            return Ok((provider.as_ref(), rest.to_owned()));
        }

        if let Some(default_name) = &self.default_source
            && let Some(provider) = self.sources.get(default_name)
        {
            return Ok((provider.as_ref(), normalized));
        }

        Err(VfsError::NoSuchSource(source.to_owned()))
    }
}
