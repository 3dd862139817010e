//! Virtual file system for the Lantern renderer.
//!
//! Routes asset paths to mounted storage backends through the [`VfsProvider`]
//! trait and the [`Vfs`] router. Reads are synchronous and return the exact
//! file contents, so the buffer length is the file size.
//!
//! # Providers
//!
//! - [`MemoryProvider`] — in-memory storage for tests and embedded assets
//! - [`FileSystemProvider`] — files under a root directory (native only)
//!
//! ```ignore
//! let mut vfs = Vfs::new();
//! vfs.mount("shaders", FileSystemProvider::new("./shaders"));
//! let bytes = vfs.read("shaders/triangle.vert.spv")?;
//! ```

mod error;
#[cfg(all(feature = "filesystem", not(target_arch = "wasm32")))]
mod filesystem;
mod memory;
pub mod path;
mod provider;
mod vfs;

pub use error::VfsError;
#[cfg(all(feature = "filesystem", not(target_arch = "wasm32")))]
pub use filesystem::FileSystemProvider;
pub use memory::MemoryProvider;
pub use provider::VfsProvider;
pub use vfs::Vfs;
