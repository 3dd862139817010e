//! Vulkan swapchain, image view and framebuffer objects.

use ash::vk;

use crate::backend::{AcquireOutcome, PresentOutcome};
use crate::error::GraphicsError;
use crate::swapchain::SwapchainDescriptor;

/// Create a swapchain on `surface` as described.
pub fn create_swapchain(
    loader: &ash::khr::swapchain::Device,
    surface: vk::SurfaceKHR,
    descriptor: &SwapchainDescriptor,
) -> Result<vk::SwapchainKHR, GraphicsError> {
    let create_info = vk::SwapchainCreateInfoKHR::default()
        .surface(surface)
        .min_image_count(descriptor.min_image_count)
        .image_format(descriptor.format.format)
        .image_color_space(descriptor.format.color_space)
        .image_extent(descriptor.extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(descriptor.sharing_mode)
        .queue_family_indices(&descriptor.queue_family_indices)
        .pre_transform(descriptor.pre_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(descriptor.present_mode)
        .clipped(true);

    unsafe { loader.create_swapchain(&create_info, None) }
        .map_err(GraphicsError::vulkan("create swapchain"))
}

/// 2D color view over a whole swapchain image.
pub fn create_image_view(
    device: &ash::Device,
    image: vk::Image,
    format: vk::Format,
) -> Result<vk::ImageView, GraphicsError> {
    let view_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping::default())
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });

    unsafe { device.create_image_view(&view_info, None) }
        .map_err(GraphicsError::vulkan("create image view"))
}

/// Framebuffer with `view` as its only attachment.
pub fn create_framebuffer(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    view: vk::ImageView,
    extent: vk::Extent2D,
) -> Result<vk::Framebuffer, GraphicsError> {
    let attachments = [view];
    let create_info = vk::FramebufferCreateInfo::default()
        .render_pass(render_pass)
        .attachments(&attachments)
        .width(extent.width)
        .height(extent.height)
        .layers(1);

    unsafe { device.create_framebuffer(&create_info, None) }
        .map_err(GraphicsError::vulkan("create framebuffer"))
}

/// Acquire the next image with no timeout.
pub fn acquire_next_image(
    loader: &ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    signal: vk::Semaphore,
) -> Result<AcquireOutcome, GraphicsError> {
    let result = unsafe {
        loader.acquire_next_image(swapchain, u64::MAX, signal, vk::Fence::null())
    };

    match result {
        Ok((index, false)) => Ok(AcquireOutcome::Ready(index)),
        Ok((index, true)) => {
            log::trace!("Swapchain suboptimal on acquire");
            Ok(AcquireOutcome::Suboptimal(index))
        }
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
            log::debug!("Swapchain out of date on acquire");
            Ok(AcquireOutcome::OutOfDate)
        }
        Err(e) => Err(GraphicsError::vulkan("acquire next image")(e)),
    }
}

/// Queue `image_index` for presentation once `wait` is signaled.
pub fn present(
    loader: &ash::khr::swapchain::Device,
    queue: vk::Queue,
    swapchain: vk::SwapchainKHR,
    image_index: u32,
    wait: vk::Semaphore,
) -> Result<PresentOutcome, GraphicsError> {
    let wait_semaphores = [wait];
    let swapchains = [swapchain];
    let image_indices = [image_index];

    let present_info = vk::PresentInfoKHR::default()
        .wait_semaphores(&wait_semaphores)
        .swapchains(&swapchains)
        .image_indices(&image_indices);

    let result = unsafe { loader.queue_present(queue, &present_info) };

    match result {
        Ok(false) => {
            log::trace!("Presented image {}", image_index);
            Ok(PresentOutcome::Presented)
        }
        Ok(true) => {
            log::trace!("Swapchain suboptimal on present");
            Ok(PresentOutcome::Suboptimal)
        }
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
            log::debug!("Swapchain out of date on present");
            Ok(PresentOutcome::OutOfDate)
        }
        Err(e) => Err(GraphicsError::vulkan("queue present")(e)),
    }
}
