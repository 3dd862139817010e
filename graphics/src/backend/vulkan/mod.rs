//! Native Vulkan backend implementation using ash.
//!
//! [`VulkanBackend`] is the renderer context: it owns the instance, the
//! optional debug messenger, the window surface, the chosen physical device,
//! the logical device with its graphics and present queues, and the arena
//! that backs every enumeration result. Everything built on top of it
//! (swapchain, pipeline, frame objects) is owned by the renderer and handed
//! back through [`GpuBackend`] for destruction.

mod command;
mod debug;
mod device;
mod instance;
mod pipeline;
mod swapchain;
mod sync;

use ash::vk;
use lantern_core::Arena;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use scopeguard::ScopeGuard;

use crate::config::RendererConfig;
use crate::device::QueueFamilyIndices;
use crate::error::GraphicsError;
use crate::frame::{FrameRecording, FrameSubmission};
use crate::pipeline::{GraphicsPipelineDescriptor, RenderPassDescriptor};
use crate::swapchain::SwapchainDescriptor;

use self::debug::DebugMessenger;
use super::{AcquireOutcome, GpuBackend, PresentOutcome};

/// Vulkan-based GPU backend using ash.
pub struct VulkanBackend {
    /// Vulkan entry points (function loader).
    entry: ash::Entry,
    /// Vulkan instance.
    instance: ash::Instance,
    /// Debug messenger for validation layer output.
    debug_messenger: Option<DebugMessenger>,
    /// Surface extension.
    surface_loader: ash::khr::surface::Instance,
    /// Window surface.
    surface: vk::SurfaceKHR,
    /// Selected physical device.
    physical_device: vk::PhysicalDevice,
    /// Logical device.
    device: ash::Device,
    /// Graphics queue.
    graphics_queue: vk::Queue,
    /// Present queue (may be the graphics queue).
    present_queue: vk::Queue,
    /// Queue family indices of the two queues.
    families: QueueFamilyIndices,
    /// Swapchain extension.
    swapchain_loader: ash::khr::swapchain::Device,
    /// Whether validation layers are enabled.
    validation_enabled: bool,
    /// Storage for enumeration results, freed once at drop.
    arena: Arena,
}

impl std::fmt::Debug for VulkanBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanBackend")
            .field("validation_enabled", &self.validation_enabled)
            .field("families", &self.families)
            .field("arena", &self.arena)
            .finish()
    }
}

impl VulkanBackend {
    /// Initialize Vulkan for `window`.
    ///
    /// Negotiates instance layers and extensions, creates the instance, the
    /// debug messenger (with validation) and the surface, selects a GPU and
    /// its queue families, checks device extensions and creates the logical
    /// device. Anything created before a failing step is destroyed again.
    pub fn new<W>(window: &W, config: &RendererConfig) -> Result<Self, GraphicsError>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| GraphicsError::InitializationFailed(format!("No display handle: {e}")))?
            .as_raw();
        let window_handle = window
            .window_handle()
            .map_err(|e| GraphicsError::InitializationFailed(format!("No window handle: {e}")))?
            .as_raw();

        // Load Vulkan entry points
        let entry = unsafe { ash::Entry::load() }.map_err(|e| {
            GraphicsError::InitializationFailed(format!("Failed to load Vulkan: {}", e))
        })?;

        let arena = Arena::new();

        let required = instance::negotiate_instance_capabilities(
            &entry,
            &arena,
            display,
            config.validation,
        )?;

        let instance = scopeguard::guard(
            instance::create_instance(&entry, config, &required)?,
            |instance| unsafe { instance.destroy_instance(None) },
        );

        let debug_messenger = if required.wants_debug_utils() {
            Some(DebugMessenger::new(&entry, &instance)?)
        } else {
            None
        };
        let debug_messenger = scopeguard::guard(debug_messenger, |messenger| {
            if let Some(messenger) = &messenger {
                messenger.destroy();
            }
        });

        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
        let surface = unsafe {
            ash_window::create_surface(&entry, &instance, display, window_handle, None)
        }
        .map_err(GraphicsError::vulkan("create surface"))?;
        let surface = scopeguard::guard(surface, |surface| unsafe {
            surface_loader.destroy_surface(surface, None);
        });

        let physical_device = device::select_physical_device(&instance, &arena)?;
        let families = device::find_device_queue_families(
            &instance,
            &surface_loader,
            physical_device,
            *surface,
            &arena,
        )?;

        let device = scopeguard::guard(
            device::create_logical_device(&instance, physical_device, &families, &arena)?,
            |device| unsafe { device.destroy_device(None) },
        );

        let graphics_queue = unsafe { device.get_device_queue(families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(families.present, 0) };
        let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);

        let device = ScopeGuard::into_inner(device);
        let surface = ScopeGuard::into_inner(surface);
        let debug_messenger = ScopeGuard::into_inner(debug_messenger);
        let instance = ScopeGuard::into_inner(instance);

        log::info!(
            "Vulkan backend initialized (validation: {})",
            config.validation
        );

        Ok(Self {
            entry,
            instance,
            debug_messenger,
            surface_loader,
            surface,
            physical_device,
            device,
            graphics_queue,
            present_queue,
            families,
            swapchain_loader,
            validation_enabled: config.validation,
            arena,
        })
    }

    /// Get the Vulkan entry.
    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    /// Get the Vulkan instance.
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Get the Vulkan device.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the physical device.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    pub fn validation_enabled(&self) -> bool {
        self.validation_enabled
    }

    /// Enumeration arena statistics.
    pub fn arena(&self) -> &Arena {
        &self.arena
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                log::error!("Failed to wait for device idle before destroying it: {e}");
            }

            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);

            if let Some(messenger) = &self.debug_messenger {
                messenger.destroy();
            }

            self.instance.destroy_instance(None);
        }

        log::info!("Vulkan backend destroyed");
    }
}

impl GpuBackend for VulkanBackend {
    fn name(&self) -> &'static str {
        "Vulkan Backend (ash)"
    }

    fn queue_families(&self) -> QueueFamilyIndices {
        self.families
    }

    fn surface_formats(&self) -> Result<&[vk::SurfaceFormatKHR], GraphicsError> {
        let formats = unsafe {
            self.surface_loader
                .get_physical_device_surface_formats(self.physical_device, self.surface)
        }
        .map_err(GraphicsError::vulkan("get surface formats"))?;
        Ok(self.arena.alloc_from_vec(formats))
    }

    fn surface_present_modes(&self) -> Result<&[vk::PresentModeKHR], GraphicsError> {
        let modes = unsafe {
            self.surface_loader
                .get_physical_device_surface_present_modes(self.physical_device, self.surface)
        }
        .map_err(GraphicsError::vulkan("get surface present modes"))?;
        Ok(self.arena.alloc_from_vec(modes))
    }

    fn surface_capabilities(&self) -> Result<vk::SurfaceCapabilitiesKHR, GraphicsError> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)
        }
        .map_err(GraphicsError::vulkan("get surface capabilities"))
    }

    fn create_swapchain(
        &self,
        descriptor: &SwapchainDescriptor,
    ) -> Result<vk::SwapchainKHR, GraphicsError> {
        swapchain::create_swapchain(&self.swapchain_loader, self.surface, descriptor)
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> Result<&[vk::Image], GraphicsError> {
        let images = unsafe { self.swapchain_loader.get_swapchain_images(swapchain) }
            .map_err(GraphicsError::vulkan("get swapchain images"))?;
        Ok(self.arena.alloc_from_vec(images))
    }

    fn create_image_view(
        &self,
        image: vk::Image,
        format: vk::Format,
    ) -> Result<vk::ImageView, GraphicsError> {
        swapchain::create_image_view(&self.device, image, format)
    }

    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> Result<vk::Framebuffer, GraphicsError> {
        swapchain::create_framebuffer(&self.device, render_pass, view, extent)
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        unsafe { self.device.destroy_framebuffer(framebuffer, None) };
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) };
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) };
    }

    fn create_shader_module(&self, code: &[u32]) -> Result<vk::ShaderModule, GraphicsError> {
        pipeline::create_shader_module(&self.device, code)
    }

    fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
    ) -> Result<vk::RenderPass, GraphicsError> {
        pipeline::create_render_pass(&self.device, descriptor)
    }

    fn create_pipeline_layout(&self) -> Result<vk::PipelineLayout, GraphicsError> {
        pipeline::create_pipeline_layout(&self.device)
    }

    fn create_graphics_pipeline(
        &self,
        descriptor: &GraphicsPipelineDescriptor,
    ) -> Result<vk::Pipeline, GraphicsError> {
        pipeline::create_graphics_pipeline(&self.device, descriptor)
    }

    fn destroy_shader_module(&self, module: vk::ShaderModule) {
        unsafe { self.device.destroy_shader_module(module, None) };
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        unsafe { self.device.destroy_render_pass(render_pass, None) };
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        unsafe { self.device.destroy_pipeline_layout(layout, None) };
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        unsafe { self.device.destroy_pipeline(pipeline, None) };
    }

    fn create_command_pool(&self, queue_family: u32) -> Result<vk::CommandPool, GraphicsError> {
        command::create_command_pool(&self.device, queue_family)
    }

    fn allocate_command_buffer(
        &self,
        pool: vk::CommandPool,
    ) -> Result<vk::CommandBuffer, GraphicsError> {
        command::allocate_command_buffer(&self.device, pool)
    }

    fn create_semaphore(&self) -> Result<vk::Semaphore, GraphicsError> {
        sync::create_semaphore(&self.device)
    }

    fn create_fence(&self, signaled: bool) -> Result<vk::Fence, GraphicsError> {
        sync::create_fence(&self.device, signaled)
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        unsafe { self.device.destroy_command_pool(pool, None) };
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { self.device.destroy_semaphore(semaphore, None) };
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { self.device.destroy_fence(fence, None) };
    }

    fn wait_for_fence(&self, fence: vk::Fence) -> Result<(), GraphicsError> {
        sync::wait_for_fence(&self.device, fence)
    }

    fn reset_fence(&self, fence: vk::Fence) -> Result<(), GraphicsError> {
        sync::reset_fence(&self.device, fence)
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        signal: vk::Semaphore,
    ) -> Result<AcquireOutcome, GraphicsError> {
        swapchain::acquire_next_image(&self.swapchain_loader, swapchain, signal)
    }

    fn record_frame(&self, recording: &FrameRecording) -> Result<(), GraphicsError> {
        command::record_frame(&self.device, recording)
    }

    fn submit(&self, submission: &FrameSubmission) -> Result<(), GraphicsError> {
        command::submit(&self.device, self.graphics_queue, submission)
    }

    fn present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> Result<PresentOutcome, GraphicsError> {
        swapchain::present(
            &self.swapchain_loader,
            self.present_queue,
            swapchain,
            image_index,
            wait,
        )
    }

    fn wait_idle(&self) -> Result<(), GraphicsError> {
        unsafe { self.device.device_wait_idle() }.map_err(GraphicsError::vulkan("device wait idle"))
    }
}
