//! Frame execution: acquire, record, submit, present.
//!
//! There is exactly one frame slot. The in-flight fence is the only point of
//! back-pressure between the CPU and the GPU: a frame starts by waiting on
//! it, so the command buffer and both semaphores are never touched while the
//! GPU may still be using them.
//!
//! ```text
//! Idle -> Acquiring -> Recording -> Submitted -> Presenting -> Idle
//!            |                                      |
//!            +-- out of date / suboptimal ----------+--> recreate chain, back to Idle
//! ```
//!
//! The fence is reset only after an image was acquired. Resetting it earlier
//! would leave it unsignaled forever when the acquire path bails out to
//! recreate the chain. If recording or submission fails after the reset, the
//! fence and the image-available semaphore are replaced so the next frame
//! neither blocks nor waits on a stale signal.
//!
//! An empty chain (deferred at zero area, or left behind by a failed
//! rebuild) is rebuilt before the fence wait. The swapchain handle passed to
//! acquire is never null.

use ash::vk;
use scopeguard::ScopeGuard;

use crate::backend::{AcquireOutcome, GpuBackend, PresentOutcome};
use crate::error::GraphicsError;
use crate::pipeline::PipelineState;
use crate::swapchain::PresentationChain;

/// Clear color used when none is configured.
pub const DEFAULT_CLEAR_COLOR: [f32; 4] = [1.0, 0.5, 0.25, 1.0];

/// Vertices drawn per frame (one triangle).
pub const TRIANGLE_VERTEX_COUNT: u32 = 3;

/// Command buffer contents for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRecording {
    pub command_buffer: vk::CommandBuffer,
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub pipeline: vk::Pipeline,
    /// Render area, viewport and scissor.
    pub extent: vk::Extent2D,
    pub clear_color: [f32; 4],
    pub vertex_count: u32,
    pub instance_count: u32,
}

/// One graphics-queue submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSubmission {
    pub command_buffer: vk::CommandBuffer,
    /// Waited on before `wait_stage` runs.
    pub wait_semaphore: vk::Semaphore,
    pub wait_stage: vk::PipelineStageFlags,
    /// Signaled when the commands complete.
    pub signal_semaphore: vk::Semaphore,
    /// Signaled when the commands complete.
    pub fence: vk::Fence,
}

/// Where the single frame slot currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameState {
    #[default]
    Idle,
    Acquiring,
    Recording,
    Submitted,
    Presenting,
}

/// Which call reported the chain as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecreateStage {
    Acquire,
    Present,
}

/// How the chain was reported stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecreateCause {
    OutOfDate,
    Suboptimal,
}

/// What one call to [`FrameExecutor::draw`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// The frame was rendered and presented.
    Presented { image_index: u32 },
    /// The chain was rebuilt and the frame dropped.
    Recreated {
        stage: RecreateStage,
        cause: RecreateCause,
    },
    /// The window has no area; nothing was done.
    Skipped,
}

/// Command pool, command buffer and synchronization objects of the frame slot.
#[derive(Debug)]
pub struct FrameSync {
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    image_available: vk::Semaphore,
    render_finished: vk::Semaphore,
    in_flight: vk::Fence,
}

impl FrameSync {
    /// Create the frame slot's objects. The fence starts signaled so the
    /// first frame does not wait.
    pub fn new<B: GpuBackend + ?Sized>(
        backend: &B,
        graphics_family: u32,
    ) -> Result<Self, GraphicsError> {
        let mut sync = scopeguard::guard(
            Self {
                command_pool: vk::CommandPool::null(),
                command_buffer: vk::CommandBuffer::null(),
                image_available: vk::Semaphore::null(),
                render_finished: vk::Semaphore::null(),
                in_flight: vk::Fence::null(),
            },
            |mut sync| sync.destroy(backend),
        );

        sync.command_pool = backend.create_command_pool(graphics_family)?;
        sync.command_buffer = backend.allocate_command_buffer(sync.command_pool)?;
        sync.image_available = backend.create_semaphore()?;
        sync.render_finished = backend.create_semaphore()?;
        sync.in_flight = backend.create_fence(true)?;

        Ok(ScopeGuard::into_inner(sync))
    }

    /// Replace the image-available semaphore with a fresh, unsignaled one.
    ///
    /// Only valid while the device is idle.
    fn renew_image_available<B: GpuBackend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> Result<(), GraphicsError> {
        let fresh = backend.create_semaphore()?;
        backend.destroy_semaphore(std::mem::replace(&mut self.image_available, fresh));
        Ok(())
    }

    /// Restore the slot after a frame failed between resetting the fence
    /// and a successful submit.
    ///
    /// Nothing reached the queue, so the reset fence would never signal and
    /// the image-available semaphore still holds the acquire's signal. Both
    /// are replaced; the new fence starts signaled.
    fn renew_after_abandoned_frame<B: GpuBackend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> Result<(), GraphicsError> {
        backend.wait_idle()?;
        let fence = backend.create_fence(true)?;
        backend.destroy_fence(std::mem::replace(&mut self.in_flight, fence));
        self.renew_image_available(backend)
    }

    /// Destroy semaphores, then the fence, then the command pool (which
    /// frees the command buffer). Null handles are skipped.
    pub fn destroy<B: GpuBackend + ?Sized>(&mut self, backend: &B) {
        for semaphore in [
            std::mem::take(&mut self.image_available),
            std::mem::take(&mut self.render_finished),
        ] {
            if semaphore != vk::Semaphore::null() {
                backend.destroy_semaphore(semaphore);
            }
        }
        if self.in_flight != vk::Fence::null() {
            backend.destroy_fence(std::mem::take(&mut self.in_flight));
        }
        if self.command_pool != vk::CommandPool::null() {
            backend.destroy_command_pool(std::mem::take(&mut self.command_pool));
            self.command_buffer = vk::CommandBuffer::null();
        }
    }

    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    pub fn image_available(&self) -> vk::Semaphore {
        self.image_available
    }

    pub fn render_finished(&self) -> vk::Semaphore {
        self.render_finished
    }

    pub fn in_flight(&self) -> vk::Fence {
        self.in_flight
    }
}

/// Drives the single frame slot.
#[derive(Debug)]
pub struct FrameExecutor {
    sync: FrameSync,
    state: FrameState,
    clear_color: [f32; 4],
    frames_presented: u64,
    recreations: u64,
}

impl FrameExecutor {
    /// Create the frame slot on the graphics queue family.
    pub fn new<B: GpuBackend + ?Sized>(
        backend: &B,
        graphics_family: u32,
        clear_color: [f32; 4],
    ) -> Result<Self, GraphicsError> {
        Ok(Self {
            sync: FrameSync::new(backend, graphics_family)?,
            state: FrameState::Idle,
            clear_color,
            frames_presented: 0,
            recreations: 0,
        })
    }

    /// Run one frame.
    ///
    /// A zero-area window skips the frame entirely. An empty chain is built
    /// first, and the frame is skipped if the surface still has no area. An
    /// out-of-date or suboptimal chain is rebuilt and the frame dropped. Any
    /// other failure is returned as an error, and the slot stays usable for
    /// the next call.
    pub fn draw<B: GpuBackend + ?Sized>(
        &mut self,
        backend: &B,
        chain: &mut PresentationChain,
        pipeline: &PipelineState,
        window_size: vk::Extent2D,
    ) -> Result<DrawOutcome, GraphicsError> {
        if window_size.width == 0 || window_size.height == 0 {
            log::trace!("Skipping frame: window has no area");
            return Ok(DrawOutcome::Skipped);
        }

        let outcome = self.run(backend, chain, pipeline, window_size);
        self.transition(FrameState::Idle);
        outcome
    }

    fn run<B: GpuBackend + ?Sized>(
        &mut self,
        backend: &B,
        chain: &mut PresentationChain,
        pipeline: &PipelineState,
        window_size: vk::Extent2D,
    ) -> Result<DrawOutcome, GraphicsError> {
        if chain.is_empty() {
            log::debug!("Building deferred presentation chain");
            chain.recreate(backend, window_size, pipeline)?;
            if chain.is_empty() {
                log::trace!("Skipping frame: surface has no area");
                return Ok(DrawOutcome::Skipped);
            }
        }

        backend.wait_for_fence(self.sync.in_flight)?;

        self.transition(FrameState::Acquiring);
        let acquired =
            backend.acquire_next_image(chain.swapchain(), self.sync.image_available)?;
        let image_index = match acquired {
            AcquireOutcome::Ready(index) => index,
            AcquireOutcome::Suboptimal(_) => {
                let outcome = self.recover(
                    backend,
                    chain,
                    pipeline,
                    window_size,
                    RecreateStage::Acquire,
                    RecreateCause::Suboptimal,
                );
                // The abandoned acquire still signals the semaphore, even
                // when the rebuild failed.
                self.sync.renew_image_available(backend)?;
                return outcome;
            }
            AcquireOutcome::OutOfDate => {
                return self.recover(
                    backend,
                    chain,
                    pipeline,
                    window_size,
                    RecreateStage::Acquire,
                    RecreateCause::OutOfDate,
                );
            }
        };

        let framebuffer = chain.framebuffer(image_index).ok_or_else(|| {
            GraphicsError::InitializationFailed(format!(
                "acquired image {} but the chain has {} framebuffers",
                image_index,
                chain.framebuffers().len()
            ))
        })?;

        if let Err(err) = self.record_and_submit(backend, chain, pipeline, framebuffer) {
            log::warn!("Frame abandoned before reaching the queue: {err}");
            if let Err(e) = self.sync.renew_after_abandoned_frame(backend) {
                log::error!("Failed to restore the frame slot: {e}");
            }
            return Err(err);
        }

        self.transition(FrameState::Presenting);
        match backend.present(chain.swapchain(), image_index, self.sync.render_finished)? {
            PresentOutcome::Presented => {
                self.frames_presented += 1;
                Ok(DrawOutcome::Presented { image_index })
            }
            PresentOutcome::Suboptimal => self.recover(
                backend,
                chain,
                pipeline,
                window_size,
                RecreateStage::Present,
                RecreateCause::Suboptimal,
            ),
            PresentOutcome::OutOfDate => self.recover(
                backend,
                chain,
                pipeline,
                window_size,
                RecreateStage::Present,
                RecreateCause::OutOfDate,
            ),
        }
    }

    fn record_and_submit<B: GpuBackend + ?Sized>(
        &mut self,
        backend: &B,
        chain: &PresentationChain,
        pipeline: &PipelineState,
        framebuffer: vk::Framebuffer,
    ) -> Result<(), GraphicsError> {
        self.transition(FrameState::Recording);
        backend.reset_fence(self.sync.in_flight)?;
        backend.record_frame(&FrameRecording {
            command_buffer: self.sync.command_buffer,
            render_pass: pipeline.render_pass(),
            framebuffer,
            pipeline: pipeline.pipeline(),
            extent: chain.extent(),
            clear_color: self.clear_color,
            vertex_count: TRIANGLE_VERTEX_COUNT,
            instance_count: 1,
        })?;

        self.transition(FrameState::Submitted);
        backend.submit(&FrameSubmission {
            command_buffer: self.sync.command_buffer,
            wait_semaphore: self.sync.image_available,
            wait_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            signal_semaphore: self.sync.render_finished,
            fence: self.sync.in_flight,
        })
    }

    /// Shared recovery path for both acquire and present.
    fn recover<B: GpuBackend + ?Sized>(
        &mut self,
        backend: &B,
        chain: &mut PresentationChain,
        pipeline: &PipelineState,
        window_size: vk::Extent2D,
        stage: RecreateStage,
        cause: RecreateCause,
    ) -> Result<DrawOutcome, GraphicsError> {
        log::info!("Chain reported {cause:?} on {stage:?}, recreating");

        chain.recreate(backend, window_size, pipeline)?;
        self.recreations += 1;

        Ok(DrawOutcome::Recreated { stage, cause })
    }

    fn transition(&mut self, next: FrameState) {
        if self.state != next {
            log::trace!("Frame: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Release the frame slot's objects.
    pub fn destroy<B: GpuBackend + ?Sized>(&mut self, backend: &B) {
        self.sync.destroy(backend);
    }

    pub fn sync(&self) -> &FrameSync {
        &self.sync
    }

    /// Current slot state. `Idle` between calls to [`draw`](Self::draw).
    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Frames that reached the display.
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Chain recreations triggered by acquire or present.
    pub fn recreations(&self) -> u64 {
        self.recreations
    }
}
