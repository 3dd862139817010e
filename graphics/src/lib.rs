//! # Lantern Graphics
//!
//! Lifecycle and frame loop of a minimal Vulkan renderer that draws one
//! hard-coded triangle.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`capabilities`] - Layer and extension negotiation
//! - [`device`] - GPU and queue family selection
//! - [`swapchain`] - Presentation chain creation and recreation
//! - [`pipeline`] / [`shader`] - Render pass, pipeline and shader loading
//! - [`frame`] - The acquire, record, submit, present loop
//! - [`Renderer`] - Facade composing all of the above
//! - [`backend`] - The [`GpuBackend`] seam with Vulkan and Dummy (for testing) backends
//!
//! ## Example
//!
//! ```ignore
//! use lantern_graphics::{Renderer, RendererConfig, ShaderSet, vk};
//!
//! let shaders = ShaderSet::load(&vfs, "shaders/triangle.vert.wgsl", "shaders/triangle.frag.wgsl")?;
//! let mut renderer = Renderer::create(&window, size, &RendererConfig::default(), &shaders)?;
//! renderer.draw()?;
//! ```

pub mod backend;
pub mod capabilities;
pub mod config;
pub mod device;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod renderer;
pub mod shader;
pub mod swapchain;

pub use ash::vk;

// Re-export main types for convenience
pub use backend::{AcquireOutcome, GpuBackend, PresentOutcome};
#[cfg(feature = "dummy")]
pub use backend::{DummyBackend, DummyCall, DummyGpu, DummyObject, DummySurface};
#[cfg(feature = "vulkan-backend")]
pub use backend::VulkanBackend;
pub use config::RendererConfig;
pub use error::{CapabilityKind, GraphicsError, QueueKind};
pub use frame::{DrawOutcome, FrameExecutor, FrameState, RecreateCause, RecreateStage};
pub use pipeline::PipelineState;
pub use renderer::Renderer;
pub use shader::{ShaderCode, ShaderSet, ShaderStage};
pub use swapchain::{PresentationChain, SurfaceInfo};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before using any graphics functionality.
pub fn init() {
    log::info!("Lantern Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_backend() {
        let backend = DummyBackend::new();
        assert_eq!(backend.name(), "Dummy Backend");
    }
}
