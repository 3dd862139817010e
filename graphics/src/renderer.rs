//! Renderer facade.
//!
//! [`Renderer`] composes the backend (instance, surface, device and the
//! enumeration arena), the pipeline, the presentation chain and the frame
//! executor. Creation runs each step once; on failure everything created so
//! far is released in reverse order before the error is returned. Dropping
//! the renderer waits for the device and tears down in strict reverse
//! dependency order.
//!
//! # Example
//!
//! ```ignore
//! use lantern_graphics::{Renderer, RendererConfig, ShaderSet, vk};
//!
//! let shaders = ShaderSet::load(&vfs, "shaders/triangle.vert.wgsl", "shaders/triangle.frag.wgsl")?;
//! let size = vk::Extent2D { width: 1280, height: 720 };
//! let mut renderer = Renderer::create(&window, size, &RendererConfig::default(), &shaders)?;
//!
//! loop {
//!     renderer.resize(current_size);
//!     renderer.draw()?;
//! }
//! ```

use ash::vk;
use scopeguard::ScopeGuard;

use crate::backend::GpuBackend;
use crate::config::RendererConfig;
use crate::error::GraphicsError;
use crate::frame::{DrawOutcome, FrameExecutor};
use crate::pipeline::PipelineState;
use crate::shader::ShaderSet;
use crate::swapchain::{PresentationChain, SurfaceInfo};

#[cfg(feature = "vulkan-backend")]
use crate::backend::VulkanBackend;

/// Owns every GPU object of the triangle renderer.
pub struct Renderer<B: GpuBackend> {
    executor: FrameExecutor,
    chain: PresentationChain,
    pipeline: PipelineState,
    window_size: vk::Extent2D,
    backend: B,
}

#[cfg(feature = "vulkan-backend")]
impl Renderer<VulkanBackend> {
    /// Create a Vulkan renderer for `window`.
    pub fn create<W>(
        window: &W,
        window_size: vk::Extent2D,
        config: &RendererConfig,
        shaders: &ShaderSet,
    ) -> Result<Self, GraphicsError>
    where
        W: raw_window_handle::HasDisplayHandle + raw_window_handle::HasWindowHandle,
    {
        let backend = VulkanBackend::new(window, config)?;
        Self::with_backend(backend, window_size, config, shaders)
    }
}

impl<B: GpuBackend> Renderer<B> {
    /// Build pipeline, chain and frame slot on an existing backend.
    pub fn with_backend(
        backend: B,
        window_size: vk::Extent2D,
        config: &RendererConfig,
        shaders: &ShaderSet,
    ) -> Result<Self, GraphicsError> {
        log::info!("Creating renderer on {} backend", backend.name());

        let surface = SurfaceInfo::negotiate(&backend)?;

        let pipeline = scopeguard::guard(
            PipelineState::new(&backend, surface.format.format, shaders)?,
            |mut pipeline| pipeline.destroy(&backend),
        );
        let chain = scopeguard::guard(
            PresentationChain::create(&backend, window_size, &pipeline)?,
            |mut chain| chain.destroy(&backend),
        );
        let executor = FrameExecutor::new(
            &backend,
            backend.queue_families().graphics,
            config.clear_color,
        )?;

        let chain = ScopeGuard::into_inner(chain);
        let pipeline = ScopeGuard::into_inner(pipeline);

        log::info!("Renderer ready");

        Ok(Self {
            executor,
            chain,
            pipeline,
            window_size,
            backend,
        })
    }

    /// Record the current window size. The chain picks it up the next time
    /// it is recreated.
    pub fn resize(&mut self, window_size: vk::Extent2D) {
        if self.window_size != window_size {
            log::debug!(
                "Window resized to {}x{}",
                window_size.width,
                window_size.height
            );
            self.window_size = window_size;
        }
    }

    /// Run one frame at the recorded window size.
    pub fn draw(&mut self) -> Result<DrawOutcome, GraphicsError> {
        self.executor.draw(
            &self.backend,
            &mut self.chain,
            &self.pipeline,
            self.window_size,
        )
    }

    pub fn window_size(&self) -> vk::Extent2D {
        self.window_size
    }

    pub fn chain(&self) -> &PresentationChain {
        &self.chain
    }

    pub fn pipeline(&self) -> &PipelineState {
        &self.pipeline
    }

    pub fn executor(&self) -> &FrameExecutor {
        &self.executor
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: GpuBackend> std::fmt::Debug for Renderer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("backend", &self.backend.name())
            .field("window_size", &self.window_size)
            .field("chain", &self.chain)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl<B: GpuBackend> Drop for Renderer<B> {
    fn drop(&mut self) {
        if let Err(e) = self.backend.wait_idle() {
            log::error!("Failed to wait for device idle during teardown: {e}");
        }

        self.executor.destroy(&self.backend);
        self.chain.destroy(&self.backend);
        self.pipeline.destroy(&self.backend);

        log::info!(
            "Renderer destroyed after {} frames ({} chain recreations)",
            self.executor.frames_presented(),
            self.executor.recreations()
        );
        // The backend field drops next: device, surface, messenger, instance, arena.
    }
}
