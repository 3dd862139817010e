//! GPU backend abstraction layer.
//!
//! The renderer lifecycle (presentation chain, pipeline, frame executor,
//! facade) is written against [`GpuBackend`], which exposes the handful of
//! device operations it needs in terms of raw Vulkan handle types.
//!
//! # Available Backends
//!
//! - `vulkan-backend` (default): native Vulkan through ash, see [`vulkan`]
//! - `dummy` (default): no-op backend with scripted results, see [`dummy`]
//!
//! Every method takes `&self`; the backend is owned by the renderer and
//! driven from a single thread.

#[cfg(feature = "dummy")]
pub mod dummy;

#[cfg(feature = "vulkan-backend")]
pub mod vulkan;

use ash::vk;

use crate::device::QueueFamilyIndices;
use crate::error::GraphicsError;
use crate::frame::{FrameRecording, FrameSubmission};
use crate::pipeline::{GraphicsPipelineDescriptor, RenderPassDescriptor};
use crate::swapchain::SwapchainDescriptor;

#[cfg(feature = "dummy")]
pub use dummy::{DummyBackend, DummyCall, DummyGpu, DummyObject, DummySurface};
#[cfg(feature = "vulkan-backend")]
pub use vulkan::VulkanBackend;

/// Result of asking the presentation engine for the next image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image was acquired and the chain matches the surface.
    Ready(u32),
    /// An image was acquired but the chain no longer matches the surface exactly.
    Suboptimal(u32),
    /// The chain is incompatible with the surface; nothing was acquired.
    OutOfDate,
}

/// Result of queueing an image for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// The image was presented.
    Presented,
    /// The image was presented but the chain no longer matches the surface exactly.
    Suboptimal,
    /// The chain is incompatible with the surface.
    OutOfDate,
}

/// Device operations needed by the renderer lifecycle.
///
/// Creation methods return raw handles owned by the caller, which must hand
/// them back to the matching `destroy_*` method. Slices returned by the
/// query methods live in the backend's arena.
pub trait GpuBackend {
    /// Backend name for log output.
    fn name(&self) -> &'static str;

    /// Queue families resolved when the device was selected.
    fn queue_families(&self) -> QueueFamilyIndices;

    // --- Surface queries ---

    /// Surface formats supported by the selected device.
    fn surface_formats(&self) -> Result<&[vk::SurfaceFormatKHR], GraphicsError>;

    /// Present modes supported by the selected device.
    fn surface_present_modes(&self) -> Result<&[vk::PresentModeKHR], GraphicsError>;

    /// Current surface capabilities. Never cached.
    fn surface_capabilities(&self) -> Result<vk::SurfaceCapabilitiesKHR, GraphicsError>;

    // --- Presentation chain ---

    /// Create a swapchain for the renderer's surface.
    fn create_swapchain(
        &self,
        descriptor: &SwapchainDescriptor,
    ) -> Result<vk::SwapchainKHR, GraphicsError>;

    /// Images owned by a swapchain.
    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> Result<&[vk::Image], GraphicsError>;

    /// Create a 2D color view of a swapchain image.
    fn create_image_view(
        &self,
        image: vk::Image,
        format: vk::Format,
    ) -> Result<vk::ImageView, GraphicsError>;

    /// Create a single-attachment framebuffer.
    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> Result<vk::Framebuffer, GraphicsError>;

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);
    fn destroy_image_view(&self, view: vk::ImageView);
    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);

    // --- Pipeline objects ---

    /// Wrap SPIR-V words in a shader module.
    fn create_shader_module(&self, code: &[u32]) -> Result<vk::ShaderModule, GraphicsError>;

    fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
    ) -> Result<vk::RenderPass, GraphicsError>;

    /// Create a pipeline layout with no descriptor sets and no push constants.
    fn create_pipeline_layout(&self) -> Result<vk::PipelineLayout, GraphicsError>;

    fn create_graphics_pipeline(
        &self,
        descriptor: &GraphicsPipelineDescriptor,
    ) -> Result<vk::Pipeline, GraphicsError>;

    fn destroy_shader_module(&self, module: vk::ShaderModule);
    fn destroy_render_pass(&self, render_pass: vk::RenderPass);
    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout);
    fn destroy_pipeline(&self, pipeline: vk::Pipeline);

    // --- Frame resources ---

    /// Create a command pool whose buffers can be reset individually.
    fn create_command_pool(&self, queue_family: u32) -> Result<vk::CommandPool, GraphicsError>;

    /// Allocate one primary command buffer.
    fn allocate_command_buffer(
        &self,
        pool: vk::CommandPool,
    ) -> Result<vk::CommandBuffer, GraphicsError>;

    fn create_semaphore(&self) -> Result<vk::Semaphore, GraphicsError>;
    fn create_fence(&self, signaled: bool) -> Result<vk::Fence, GraphicsError>;

    /// Destroy a command pool, freeing its command buffers.
    fn destroy_command_pool(&self, pool: vk::CommandPool);
    fn destroy_semaphore(&self, semaphore: vk::Semaphore);
    fn destroy_fence(&self, fence: vk::Fence);

    // --- Frame loop ---

    /// Block until the fence is signaled. No timeout.
    fn wait_for_fence(&self, fence: vk::Fence) -> Result<(), GraphicsError>;

    fn reset_fence(&self, fence: vk::Fence) -> Result<(), GraphicsError>;

    /// Acquire the next image, signaling `signal` once it is available.
    ///
    /// Out-of-date and suboptimal are reported as outcomes; any other
    /// failure is an error.
    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        signal: vk::Semaphore,
    ) -> Result<AcquireOutcome, GraphicsError>;

    /// Reset and re-record the frame's command buffer.
    fn record_frame(&self, recording: &FrameRecording) -> Result<(), GraphicsError>;

    /// Submit the frame's command buffer to the graphics queue.
    fn submit(&self, submission: &FrameSubmission) -> Result<(), GraphicsError>;

    /// Present an image on the present queue after `wait` is signaled.
    fn present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> Result<PresentOutcome, GraphicsError>;

    /// Block until the device has finished all submitted work.
    fn wait_idle(&self) -> Result<(), GraphicsError>;
}
