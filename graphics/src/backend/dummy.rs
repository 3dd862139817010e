//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations. It hands out unique
//! handles, tracks which ones are still alive, records every call, and
//! replays scripted acquire/present results so the frame executor's
//! recovery paths can be driven without a display.
//!
//! Submissions complete immediately by default. With auto-completion turned
//! off they stay pending until [`DummyGpu::complete_submissions`] is called,
//! typically from another thread, which makes the in-flight fence block like
//! it would on real hardware.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use ash::vk;
use ash::vk::Handle;
use lantern_core::Arena;
use parking_lot::{Condvar, Mutex};

use crate::device::QueueFamilyIndices;
use crate::error::GraphicsError;
use crate::frame::{FrameRecording, FrameSubmission};
use crate::pipeline::{GraphicsPipelineDescriptor, RenderPassDescriptor};
use crate::swapchain::SwapchainDescriptor;

use super::{AcquireOutcome, GpuBackend, PresentOutcome};

/// Kind of object created by the dummy backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DummyObject {
    Swapchain,
    ImageView,
    Framebuffer,
    ShaderModule,
    RenderPass,
    PipelineLayout,
    Pipeline,
    CommandPool,
    Semaphore,
    Fence,
}

impl DummyObject {
    fn create_operation(self) -> &'static str {
        match self {
            Self::Swapchain => "create swapchain",
            Self::ImageView => "create image view",
            Self::Framebuffer => "create framebuffer",
            Self::ShaderModule => "create shader module",
            Self::RenderPass => "create render pass",
            Self::PipelineLayout => "create pipeline layout",
            Self::Pipeline => "create graphics pipeline",
            Self::CommandPool => "create command pool",
            Self::Semaphore => "create semaphore",
            Self::Fence => "create fence",
        }
    }
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum DummyCall {
    Create(DummyObject),
    Destroy(DummyObject),
    AllocateCommandBuffer,
    QuerySurfaceCapabilities,
    WaitForFence,
    ResetFence,
    Acquire,
    RecordFrame(FrameRecording),
    Submit(FrameSubmission),
    Present { image_index: u32 },
    WaitIdle,
    /// Pending submissions finished on the simulated GPU.
    GpuComplete,
    /// The backend itself was dropped (device, surface, instance).
    DestroyDevice,
}

/// Surface properties reported by the dummy backend.
#[derive(Debug, Clone)]
pub struct DummySurface {
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
}

impl Default for DummySurface {
    /// A typical desktop surface: BGRA sRGB, FIFO plus mailbox, at least
    /// two images, 1280x720 with extents bounded to `[1, 4096]`.
    fn default() -> Self {
        Self {
            formats: vec![
                vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_UNORM,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
                vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_SRGB,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
            ],
            present_modes: vec![vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO],
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 0,
                current_extent: vk::Extent2D {
                    width: 1280,
                    height: 720,
                },
                min_image_extent: vk::Extent2D {
                    width: 1,
                    height: 1,
                },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                max_image_array_layers: 1,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                ..Default::default()
            },
        }
    }
}

impl DummySurface {
    /// Report `width`x`height` as the current extent.
    pub fn with_current_extent(mut self, width: u32, height: u32) -> Self {
        self.capabilities.current_extent = vk::Extent2D { width, height };
        self
    }
}

#[derive(Debug, Default)]
struct DummyState {
    surface: DummySurface,
    next_handle: u64,
    live: HashMap<u64, DummyObject>,
    invalid_destroys: usize,
    swapchains: HashMap<u64, Vec<vk::Image>>,
    fences: HashMap<u64, bool>,
    pending: Vec<u64>,
    auto_complete: bool,
    next_image: u32,
    acquire_script: VecDeque<Result<AcquireOutcome, vk::Result>>,
    present_script: VecDeque<Result<PresentOutcome, vk::Result>>,
    submit_errors: VecDeque<vk::Result>,
    failures: Vec<DummyObject>,
    calls: Vec<DummyCall>,
}

impl DummyState {
    fn mint(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn complete_pending(&mut self) -> usize {
        let completed = self.pending.len();
        for fence in self.pending.drain(..) {
            if let Some(signaled) = self.fences.get_mut(&fence) {
                *signaled = true;
            }
        }
        if completed > 0 {
            self.calls.push(DummyCall::GpuComplete);
        }
        completed
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<DummyState>,
    fence_signaled: Condvar,
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    shared: Arc<Shared>,
    families: QueueFamilyIndices,
    arena: Arena,
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyBackend {
    /// Create a dummy backend with a default surface and one shared queue family.
    pub fn new() -> Self {
        Self::with_surface(DummySurface::default())
    }

    /// Create a dummy backend reporting `surface`.
    pub fn with_surface(surface: DummySurface) -> Self {
        let state = DummyState {
            surface,
            auto_complete: true,
            ..Default::default()
        };

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                fence_signaled: Condvar::new(),
            }),
            families: QueueFamilyIndices {
                graphics: 0,
                present: 0,
            },
            arena: Arena::with_chunk_size(64 * 1024),
        }
    }

    /// Use distinct (or custom) queue families.
    pub fn with_queue_families(mut self, families: QueueFamilyIndices) -> Self {
        self.families = families;
        self
    }

    /// Whether submissions complete on their own. On by default.
    pub fn with_auto_complete(self, enabled: bool) -> Self {
        self.shared.state.lock().auto_complete = enabled;
        self
    }

    /// Handle to the simulated GPU, usable from other threads.
    pub fn gpu(&self) -> DummyGpu {
        DummyGpu {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Replace the reported surface properties (e.g. after a window resize).
    pub fn set_surface(&self, surface: DummySurface) {
        self.shared.state.lock().surface = surface;
    }

    /// Change only the reported surface capabilities.
    pub fn set_surface_capabilities(&self, capabilities: vk::SurfaceCapabilitiesKHR) {
        self.shared.state.lock().surface.capabilities = capabilities;
    }

    /// Queue a result for a future `acquire_next_image`. Without a script,
    /// images are handed out round-robin.
    pub fn script_acquire(&self, outcome: AcquireOutcome) {
        self.shared.state.lock().acquire_script.push_back(Ok(outcome));
    }

    /// Make a future `acquire_next_image` fail with `result`.
    pub fn script_acquire_error(&self, result: vk::Result) {
        self.shared.state.lock().acquire_script.push_back(Err(result));
    }

    /// Queue a result for a future `present`. Without a script, every
    /// present succeeds.
    pub fn script_present(&self, outcome: PresentOutcome) {
        self.shared.state.lock().present_script.push_back(Ok(outcome));
    }

    /// Make a future `present` fail with `result`.
    pub fn script_present_error(&self, result: vk::Result) {
        self.shared.state.lock().present_script.push_back(Err(result));
    }

    /// Make a future `submit` fail with `result`. The failed submission
    /// never reaches the simulated queue.
    pub fn script_submit_error(&self, result: vk::Result) {
        self.shared.state.lock().submit_errors.push_back(result);
    }

    /// Make the next creation of `object` fail.
    pub fn fail_next(&self, object: DummyObject) {
        self.shared.state.lock().failures.push(object);
    }

    /// Snapshot of the call log.
    pub fn calls(&self) -> Vec<DummyCall> {
        self.gpu().calls()
    }

    /// Number of objects created and not yet destroyed.
    pub fn live_objects(&self) -> usize {
        self.gpu().live_objects()
    }

    /// Bytes held by the enumeration arena.
    pub fn arena_bytes(&self) -> usize {
        self.arena.allocated_bytes()
    }

    fn create<H: Handle>(&self, object: DummyObject) -> Result<H, GraphicsError> {
        let mut state = self.shared.state.lock();

        if let Some(pos) = state.failures.iter().position(|f| *f == object) {
            state.failures.remove(pos);
            log::trace!("DummyBackend: failing {:?} on request", object);
            return Err(GraphicsError::Vulkan {
                operation: object.create_operation(),
                result: vk::Result::ERROR_OUT_OF_DEVICE_MEMORY,
            });
        }

        let raw = state.mint();
        state.live.insert(raw, object);
        state.calls.push(DummyCall::Create(object));
        log::trace!("DummyBackend: creating {:?} {:#x}", object, raw);

        Ok(H::from_raw(raw))
    }

    fn destroy<H: Handle>(&self, object: DummyObject, handle: H) {
        let raw = handle.as_raw();
        let mut state = self.shared.state.lock();

        match state.live.remove(&raw) {
            Some(kind) if kind == object => {
                log::trace!("DummyBackend: destroying {:?} {:#x}", object, raw);
            }
            _ => {
                log::error!("DummyBackend: destroying unknown {:?} {:#x}", object, raw);
                state.invalid_destroys += 1;
            }
        }
        state.calls.push(DummyCall::Destroy(object));
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn queue_families(&self) -> QueueFamilyIndices {
        self.families
    }

    fn surface_formats(&self) -> Result<&[vk::SurfaceFormatKHR], GraphicsError> {
        let formats = self.shared.state.lock().surface.formats.clone();
        Ok(self.arena.alloc_from_vec(formats))
    }

    fn surface_present_modes(&self) -> Result<&[vk::PresentModeKHR], GraphicsError> {
        let modes = self.shared.state.lock().surface.present_modes.clone();
        Ok(self.arena.alloc_from_vec(modes))
    }

    fn surface_capabilities(&self) -> Result<vk::SurfaceCapabilitiesKHR, GraphicsError> {
        let mut state = self.shared.state.lock();
        state.calls.push(DummyCall::QuerySurfaceCapabilities);
        Ok(state.surface.capabilities)
    }

    fn create_swapchain(
        &self,
        descriptor: &SwapchainDescriptor,
    ) -> Result<vk::SwapchainKHR, GraphicsError> {
        let swapchain: vk::SwapchainKHR = self.create(DummyObject::Swapchain)?;

        let mut state = self.shared.state.lock();
        let images: Vec<vk::Image> = (0..descriptor.min_image_count)
            .map(|_| vk::Image::from_raw(state.mint()))
            .collect();
        state.swapchains.insert(swapchain.as_raw(), images);
        state.next_image = 0;

        log::trace!(
            "DummyBackend: swapchain {}x{} with {} images",
            descriptor.extent.width,
            descriptor.extent.height,
            descriptor.min_image_count
        );

        Ok(swapchain)
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> Result<&[vk::Image], GraphicsError> {
        let images = self
            .shared
            .state
            .lock()
            .swapchains
            .get(&swapchain.as_raw())
            .cloned()
            .ok_or(GraphicsError::Vulkan {
                operation: "get swapchain images",
                result: vk::Result::ERROR_UNKNOWN,
            })?;
        Ok(self.arena.alloc_from_vec(images))
    }

    fn create_image_view(
        &self,
        _image: vk::Image,
        _format: vk::Format,
    ) -> Result<vk::ImageView, GraphicsError> {
        self.create(DummyObject::ImageView)
    }

    fn create_framebuffer(
        &self,
        _render_pass: vk::RenderPass,
        _view: vk::ImageView,
        _extent: vk::Extent2D,
    ) -> Result<vk::Framebuffer, GraphicsError> {
        self.create(DummyObject::Framebuffer)
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        self.destroy(DummyObject::Framebuffer, framebuffer);
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.destroy(DummyObject::ImageView, view);
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        self.shared
            .state
            .lock()
            .swapchains
            .remove(&swapchain.as_raw());
        self.destroy(DummyObject::Swapchain, swapchain);
    }

    fn create_shader_module(&self, code: &[u32]) -> Result<vk::ShaderModule, GraphicsError> {
        log::trace!("DummyBackend: shader module of {} words", code.len());
        self.create(DummyObject::ShaderModule)
    }

    fn create_render_pass(
        &self,
        _descriptor: &RenderPassDescriptor,
    ) -> Result<vk::RenderPass, GraphicsError> {
        self.create(DummyObject::RenderPass)
    }

    fn create_pipeline_layout(&self) -> Result<vk::PipelineLayout, GraphicsError> {
        self.create(DummyObject::PipelineLayout)
    }

    fn create_graphics_pipeline(
        &self,
        _descriptor: &GraphicsPipelineDescriptor,
    ) -> Result<vk::Pipeline, GraphicsError> {
        self.create(DummyObject::Pipeline)
    }

    fn destroy_shader_module(&self, module: vk::ShaderModule) {
        self.destroy(DummyObject::ShaderModule, module);
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        self.destroy(DummyObject::RenderPass, render_pass);
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        self.destroy(DummyObject::PipelineLayout, layout);
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        self.destroy(DummyObject::Pipeline, pipeline);
    }

    fn create_command_pool(&self, queue_family: u32) -> Result<vk::CommandPool, GraphicsError> {
        log::trace!("DummyBackend: command pool on family {queue_family}");
        self.create(DummyObject::CommandPool)
    }

    fn allocate_command_buffer(
        &self,
        _pool: vk::CommandPool,
    ) -> Result<vk::CommandBuffer, GraphicsError> {
        let mut state = self.shared.state.lock();
        state.calls.push(DummyCall::AllocateCommandBuffer);
        let raw = state.mint();
        Ok(vk::CommandBuffer::from_raw(raw))
    }

    fn create_semaphore(&self) -> Result<vk::Semaphore, GraphicsError> {
        self.create(DummyObject::Semaphore)
    }

    fn create_fence(&self, signaled: bool) -> Result<vk::Fence, GraphicsError> {
        let fence: vk::Fence = self.create(DummyObject::Fence)?;
        self.shared
            .state
            .lock()
            .fences
            .insert(fence.as_raw(), signaled);
        Ok(fence)
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        self.destroy(DummyObject::CommandPool, pool);
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.destroy(DummyObject::Semaphore, semaphore);
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        {
            let mut state = self.shared.state.lock();
            state.fences.remove(&fence.as_raw());
            state.pending.retain(|f| *f != fence.as_raw());
        }
        self.destroy(DummyObject::Fence, fence);
    }

    fn wait_for_fence(&self, fence: vk::Fence) -> Result<(), GraphicsError> {
        let raw = fence.as_raw();
        let mut state = self.shared.state.lock();
        state.calls.push(DummyCall::WaitForFence);

        loop {
            let signaled = state.fences.get(&raw).copied();
            match signaled {
                Some(true) => return Ok(()),
                Some(false) if state.pending.contains(&raw) => {
                    self.shared.fence_signaled.wait(&mut state);
                }
                // Unsignaled with nothing in flight would never complete.
                _ => {
                    return Err(GraphicsError::Vulkan {
                        operation: "wait for fence",
                        result: vk::Result::ERROR_DEVICE_LOST,
                    });
                }
            }
        }
    }

    fn reset_fence(&self, fence: vk::Fence) -> Result<(), GraphicsError> {
        let mut state = self.shared.state.lock();
        state.calls.push(DummyCall::ResetFence);
        match state.fences.get_mut(&fence.as_raw()) {
            Some(signaled) => {
                *signaled = false;
                Ok(())
            }
            None => Err(GraphicsError::Vulkan {
                operation: "reset fence",
                result: vk::Result::ERROR_UNKNOWN,
            }),
        }
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        _signal: vk::Semaphore,
    ) -> Result<AcquireOutcome, GraphicsError> {
        let mut state = self.shared.state.lock();
        state.calls.push(DummyCall::Acquire);

        let image_count = state
            .swapchains
            .get(&swapchain.as_raw())
            .map(|images| images.len() as u32)
            .ok_or(GraphicsError::Vulkan {
                operation: "acquire next image",
                result: vk::Result::ERROR_SURFACE_LOST_KHR,
            })?;

        match state.acquire_script.pop_front() {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(result)) => Err(GraphicsError::Vulkan {
                operation: "acquire next image",
                result,
            }),
            None => {
                let index = state.next_image % image_count.max(1);
                state.next_image = index + 1;
                Ok(AcquireOutcome::Ready(index))
            }
        }
    }

    fn record_frame(&self, recording: &FrameRecording) -> Result<(), GraphicsError> {
        self.shared
            .state
            .lock()
            .calls
            .push(DummyCall::RecordFrame(*recording));
        Ok(())
    }

    fn submit(&self, submission: &FrameSubmission) -> Result<(), GraphicsError> {
        let raw = submission.fence.as_raw();
        let mut state = self.shared.state.lock();
        state.calls.push(DummyCall::Submit(*submission));

        if let Some(result) = state.submit_errors.pop_front() {
            return Err(GraphicsError::Vulkan {
                operation: "queue submit",
                result,
            });
        }

        if state.fences.get(&raw) != Some(&false) {
            log::error!("DummyBackend: submitting with a signaled or unknown fence");
            return Err(GraphicsError::Vulkan {
                operation: "queue submit",
                result: vk::Result::ERROR_UNKNOWN,
            });
        }

        state.pending.push(raw);
        if state.auto_complete {
            state.complete_pending();
            self.shared.fence_signaled.notify_all();
        }
        Ok(())
    }

    fn present(
        &self,
        _swapchain: vk::SwapchainKHR,
        image_index: u32,
        _wait: vk::Semaphore,
    ) -> Result<PresentOutcome, GraphicsError> {
        let mut state = self.shared.state.lock();
        state.calls.push(DummyCall::Present { image_index });

        match state.present_script.pop_front() {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(result)) => Err(GraphicsError::Vulkan {
                operation: "queue present",
                result,
            }),
            None => Ok(PresentOutcome::Presented),
        }
    }

    /// Finishes all pending submissions before returning.
    fn wait_idle(&self) -> Result<(), GraphicsError> {
        let mut state = self.shared.state.lock();
        state.calls.push(DummyCall::WaitIdle);
        if state.complete_pending() > 0 {
            self.shared.fence_signaled.notify_all();
        }
        Ok(())
    }
}

impl Drop for DummyBackend {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.calls.push(DummyCall::DestroyDevice);

        if !state.live.is_empty() {
            log::error!(
                "DummyBackend: {} objects leaked: {:?}",
                state.live.len(),
                state.live.values().collect::<Vec<_>>()
            );
        }
    }
}

/// Cloneable handle to the dummy backend's simulated GPU.
#[derive(Debug, Clone)]
pub struct DummyGpu {
    shared: Arc<Shared>,
}

impl DummyGpu {
    /// Finish every pending submission and signal its fence.
    ///
    /// Returns the number of submissions completed.
    pub fn complete_submissions(&self) -> usize {
        let completed = self.shared.state.lock().complete_pending();
        if completed > 0 {
            self.shared.fence_signaled.notify_all();
        }
        completed
    }

    /// Submissions waiting for [`complete_submissions`](Self::complete_submissions).
    pub fn pending_submissions(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Snapshot of the call log.
    pub fn calls(&self) -> Vec<DummyCall> {
        self.shared.state.lock().calls.clone()
    }

    /// Number of objects created and not yet destroyed.
    pub fn live_objects(&self) -> usize {
        self.shared.state.lock().live.len()
    }

    /// Live objects of one kind.
    pub fn live_objects_of(&self, object: DummyObject) -> usize {
        self.shared
            .state
            .lock()
            .live
            .values()
            .filter(|o| **o == object)
            .count()
    }

    /// Destroy calls for handles that were not alive.
    pub fn invalid_destroys(&self) -> usize {
        self.shared.state.lock().invalid_destroys
    }
}
