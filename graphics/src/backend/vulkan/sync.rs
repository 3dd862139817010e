//! Vulkan synchronization primitives (fences, semaphores).

use ash::vk;

use crate::error::GraphicsError;

pub fn create_semaphore(device: &ash::Device) -> Result<vk::Semaphore, GraphicsError> {
    let create_info = vk::SemaphoreCreateInfo::default();

    unsafe { device.create_semaphore(&create_info, None) }
        .map_err(GraphicsError::vulkan("create semaphore"))
}

pub fn create_fence(device: &ash::Device, signaled: bool) -> Result<vk::Fence, GraphicsError> {
    let flags = if signaled {
        vk::FenceCreateFlags::SIGNALED
    } else {
        vk::FenceCreateFlags::empty()
    };
    let create_info = vk::FenceCreateInfo::default().flags(flags);

    unsafe { device.create_fence(&create_info, None) }.map_err(GraphicsError::vulkan("create fence"))
}

/// Block until `fence` is signaled. No timeout.
pub fn wait_for_fence(device: &ash::Device, fence: vk::Fence) -> Result<(), GraphicsError> {
    unsafe { device.wait_for_fences(&[fence], true, u64::MAX) }
        .map_err(GraphicsError::vulkan("wait for fence"))
}

pub fn reset_fence(device: &ash::Device, fence: vk::Fence) -> Result<(), GraphicsError> {
    unsafe { device.reset_fences(&[fence]) }.map_err(GraphicsError::vulkan("reset fence"))
}
