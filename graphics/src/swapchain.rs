//! Presentation chain (swapchain) management.
//!
//! The chain owns the swapchain, one image view and one framebuffer per
//! swapchain image. All three arrays are always built and torn down together,
//! so their lengths match the image count reported by the driver.
//!
//! Surface capabilities are queried fresh on every (re)creation because they
//! change with the window size. Recreation is reactive: the frame executor
//! calls [`PresentationChain::recreate`] after an acquire or present reports
//! the chain as out of date or suboptimal.
//!
//! A chain is never built at zero area. When the window or the clamped
//! extent has no area, the chain stays empty (null swapchain, no images) and
//! the executor builds it on the first frame with a usable size.
//!
//! # Choices
//!
//! | property | preference | fallback |
//! |---|---|---|
//! | surface format | `B8G8R8A8_SRGB` + `SRGB_NONLINEAR` | first reported |
//! | present mode | `FIFO` | first reported |
//! | image count | `min + 1` | clamped to a non-zero `max` |
//! | extent | see [`choose_extent`] | |
//! | sharing | exclusive for one family | concurrent across both |

use ash::vk;
use scopeguard::ScopeGuard;

use crate::backend::GpuBackend;
use crate::device::QueueFamilyIndices;
use crate::error::GraphicsError;
use crate::pipeline::PipelineState;

/// Preferred surface format.
pub const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Preferred present mode (vsync, no tearing).
pub const PREFERRED_PRESENT_MODE: vk::PresentModeKHR = vk::PresentModeKHR::FIFO;

fn is_preferred_format(format: &vk::SurfaceFormatKHR) -> bool {
    format.format == PREFERRED_SURFACE_FORMAT.format
        && format.color_space == PREFERRED_SURFACE_FORMAT.color_space
}

/// Pick the surface format: the preferred sRGB format if offered, else the
/// first one reported. `None` only for an empty list.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    let chosen = formats
        .iter()
        .find(|f| is_preferred_format(f))
        .or_else(|| formats.first())
        .copied()?;

    if !is_preferred_format(&chosen) {
        log::warn!(
            "Preferred surface format unavailable, using {:?}/{:?}",
            chosen.format,
            chosen.color_space
        );
    }

    Some(chosen)
}

/// Pick the present mode: FIFO if offered, else the first one reported.
///
/// The fallback mode is not guaranteed to be vsync'd.
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> Option<vk::PresentModeKHR> {
    if modes.contains(&PREFERRED_PRESENT_MODE) {
        return Some(PREFERRED_PRESENT_MODE);
    }

    let fallback = modes.first().copied()?;
    log::warn!("FIFO present mode unavailable, falling back to {fallback:?}; vsync not guaranteed");
    Some(fallback)
}

/// One more image than the minimum, clamped to the maximum when the
/// maximum is non-zero (zero means unbounded).
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 && capabilities.max_image_count < desired {
        capabilities.max_image_count
    } else {
        desired
    }
}

/// Chain extent.
///
/// When the capabilities report the "any extent" sentinel (`u32::MAX`
/// width), the reported current extent is used verbatim. Otherwise the
/// window size is clamped component-wise into `[min, max]`.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    window_size: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width == u32::MAX {
        log::warn!(
            "Surface reports the any-extent sentinel, using {}x{} verbatim instead of the window size",
            capabilities.current_extent.width,
            capabilities.current_extent.height
        );
        return capabilities.current_extent;
    }

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;

    vk::Extent2D {
        width: window_size.width.clamp(min.width, max.width.max(min.width)),
        height: window_size.height.clamp(min.height, max.height.max(min.height)),
    }
}

fn is_zero_area(extent: vk::Extent2D) -> bool {
    extent.width == 0 || extent.height == 0
}

/// Exclusive sharing for a single family, concurrent across both otherwise.
///
/// Returns the sharing mode and the family indices to share between (empty
/// for exclusive).
pub fn choose_sharing_mode(families: &QueueFamilyIndices) -> (vk::SharingMode, Vec<u32>) {
    if families.is_shared() {
        (vk::SharingMode::EXCLUSIVE, Vec::new())
    } else {
        (vk::SharingMode::CONCURRENT, families.unique())
    }
}

/// Negotiated surface properties for one chain generation.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceInfo {
    /// Capabilities at the time of negotiation.
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Chosen pixel format and color space.
    pub format: vk::SurfaceFormatKHR,
    /// Chosen present mode.
    pub present_mode: vk::PresentModeKHR,
}

impl SurfaceInfo {
    /// Query formats, present modes and capabilities and pick from them.
    pub fn negotiate<B: GpuBackend + ?Sized>(backend: &B) -> Result<Self, GraphicsError> {
        let format = choose_surface_format(backend.surface_formats()?).ok_or_else(|| {
            GraphicsError::InitializationFailed("surface reports no formats".to_string())
        })?;
        let present_mode = choose_present_mode(backend.surface_present_modes()?).ok_or_else(
            || GraphicsError::InitializationFailed("surface reports no present modes".to_string()),
        )?;
        let capabilities = backend.surface_capabilities()?;

        Ok(Self {
            capabilities,
            format,
            present_mode,
        })
    }
}

/// Everything needed to create a swapchain.
#[derive(Debug, Clone)]
pub struct SwapchainDescriptor {
    /// Requested number of images.
    pub min_image_count: u32,
    /// Pixel format and color space.
    pub format: vk::SurfaceFormatKHR,
    /// Image extent.
    pub extent: vk::Extent2D,
    /// Presentation mode.
    pub present_mode: vk::PresentModeKHR,
    /// Exclusive or concurrent.
    pub sharing_mode: vk::SharingMode,
    /// Families sharing the images (concurrent mode only).
    pub queue_family_indices: Vec<u32>,
    /// Surface transform to apply.
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

impl SwapchainDescriptor {
    /// Derive the descriptor for a negotiated surface and window size.
    pub fn new(
        surface: &SurfaceInfo,
        families: &QueueFamilyIndices,
        window_size: vk::Extent2D,
    ) -> Self {
        let (sharing_mode, queue_family_indices) = choose_sharing_mode(families);

        Self {
            min_image_count: choose_image_count(&surface.capabilities),
            format: surface.format,
            extent: choose_extent(&surface.capabilities, window_size),
            present_mode: surface.present_mode,
            sharing_mode,
            queue_family_indices,
            pre_transform: surface.capabilities.current_transform,
        }
    }
}

/// Swapchain, image views and framebuffers of one chain generation.
#[derive(Debug)]
pub struct PresentationChain {
    swapchain: vk::SwapchainKHR,
    surface: SurfaceInfo,
    extent: vk::Extent2D,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    framebuffers: Vec<vk::Framebuffer>,
    generation: u64,
}

impl PresentationChain {
    /// Create the chain and its framebuffers for `pipeline`'s render pass.
    pub fn create<B: GpuBackend + ?Sized>(
        backend: &B,
        window_size: vk::Extent2D,
        pipeline: &PipelineState,
    ) -> Result<Self, GraphicsError> {
        Self::build(backend, window_size, pipeline, 0)
    }

    /// Tear the chain down and build it again for the current surface.
    ///
    /// Waits for the device to go idle first. If rebuilding fails, the chain
    /// is left empty and [`destroy`](Self::destroy) is a no-op. An empty
    /// chain can be recreated like any other.
    pub fn recreate<B: GpuBackend + ?Sized>(
        &mut self,
        backend: &B,
        window_size: vk::Extent2D,
        pipeline: &PipelineState,
    ) -> Result<(), GraphicsError> {
        backend.wait_idle()?;

        let generation = self.generation + 1;
        self.destroy(backend);
        *self = Self::build(backend, window_size, pipeline, generation)?;

        if !self.is_empty() {
            log::info!(
                "Recreated presentation chain (generation {}): {}x{}",
                generation,
                self.extent.width,
                self.extent.height
            );
        }

        Ok(())
    }

    fn build<B: GpuBackend + ?Sized>(
        backend: &B,
        window_size: vk::Extent2D,
        pipeline: &PipelineState,
        generation: u64,
    ) -> Result<Self, GraphicsError> {
        let surface = SurfaceInfo::negotiate(backend)?;

        if surface.format.format != pipeline.format() {
            return Err(GraphicsError::SurfaceFormatChanged {
                expected: pipeline.format(),
                found: surface.format.format,
            });
        }

        let descriptor = SwapchainDescriptor::new(&surface, &backend.queue_families(), window_size);

        if is_zero_area(window_size) || is_zero_area(descriptor.extent) {
            log::debug!(
                "Deferring presentation chain: window {}x{}, surface extent {}x{}",
                window_size.width,
                window_size.height,
                descriptor.extent.width,
                descriptor.extent.height
            );
            return Ok(Self {
                swapchain: vk::SwapchainKHR::null(),
                surface,
                extent: vk::Extent2D::default(),
                images: Vec::new(),
                image_views: Vec::new(),
                framebuffers: Vec::new(),
                generation,
            });
        }

        // Released in reverse order if anything below fails.
        let mut chain = scopeguard::guard(
            Self {
                swapchain: vk::SwapchainKHR::null(),
                surface,
                extent: descriptor.extent,
                images: Vec::new(),
                image_views: Vec::new(),
                framebuffers: Vec::new(),
                generation,
            },
            |mut chain| chain.destroy(backend),
        );

        chain.swapchain = backend.create_swapchain(&descriptor)?;
        chain.images = backend.swapchain_images(chain.swapchain)?.to_vec();

        for i in 0..chain.images.len() {
            let view = backend.create_image_view(chain.images[i], surface.format.format)?;
            chain.image_views.push(view);
        }

        for i in 0..chain.image_views.len() {
            let framebuffer =
                backend.create_framebuffer(pipeline.render_pass(), chain.image_views[i], chain.extent)?;
            chain.framebuffers.push(framebuffer);
        }

        let chain = ScopeGuard::into_inner(chain);

        log::info!(
            "Presentation chain ready: {}x{}, {} images, {:?}/{:?}, {:?}",
            chain.extent.width,
            chain.extent.height,
            chain.images.len(),
            surface.format.format,
            surface.format.color_space,
            surface.present_mode
        );

        Ok(chain)
    }

    /// Destroy framebuffers, then image views, then the swapchain.
    ///
    /// Swapchain images belong to the swapchain and are not freed
    /// individually. Calling this twice is harmless.
    pub fn destroy<B: GpuBackend + ?Sized>(&mut self, backend: &B) {
        for framebuffer in self.framebuffers.drain(..) {
            backend.destroy_framebuffer(framebuffer);
        }
        for view in self.image_views.drain(..) {
            backend.destroy_image_view(view);
        }
        self.images.clear();

        if self.swapchain != vk::SwapchainKHR::null() {
            backend.destroy_swapchain(self.swapchain);
            self.swapchain = vk::SwapchainKHR::null();
        }
    }

    /// Whether the chain has no swapchain, either because it was deferred at
    /// zero area or because a rebuild failed.
    pub fn is_empty(&self) -> bool {
        self.swapchain == vk::SwapchainKHR::null()
    }

    /// The swapchain handle.
    pub fn swapchain(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Chain extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Negotiated surface properties of this generation.
    pub fn surface(&self) -> &SurfaceInfo {
        &self.surface
    }

    /// Chosen surface format.
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.surface.format
    }

    /// Chosen present mode.
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.surface.present_mode
    }

    /// Number of images the driver created.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    pub fn framebuffers(&self) -> &[vk::Framebuffer] {
        &self.framebuffers
    }

    /// Framebuffer wrapping the image at `image_index`.
    pub fn framebuffer(&self, image_index: u32) -> Option<vk::Framebuffer> {
        self.framebuffers.get(image_index as usize).copied()
    }

    /// How many times the chain has been recreated.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
