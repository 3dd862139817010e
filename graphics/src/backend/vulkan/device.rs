//! Vulkan physical and logical device management.

use std::ffi::CStr;

use ash::vk;
use lantern_core::Arena;

use crate::capabilities::{RequiredCapabilities, ensure_supported};
use crate::device::{
    AdapterInfo, QueueFamilyIndices, QueueFamilyInfo, find_queue_families, select_adapter,
};
use crate::error::{CapabilityKind, GraphicsError};

/// Enumerate the GPUs and pick one (discrete, then integrated, then the first).
pub fn select_physical_device(
    instance: &ash::Instance,
    arena: &Arena,
) -> Result<vk::PhysicalDevice, GraphicsError> {
    let devices = arena.alloc_from_vec(
        unsafe { instance.enumerate_physical_devices() }
            .map_err(GraphicsError::vulkan("enumerate physical devices"))?,
    );

    let adapters: Vec<AdapterInfo> = devices
        .iter()
        .map(|&device| {
            let properties = unsafe { instance.get_physical_device_properties(device) };
            let name = properties
                .device_name_as_c_str()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            AdapterInfo::new(name, properties.device_type.into())
        })
        .collect();

    let index = select_adapter(&adapters).ok_or(GraphicsError::NoPhysicalDevice)?;
    Ok(devices[index])
}

/// Resolve graphics and present queue families for `surface`.
pub fn find_device_queue_families(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    arena: &Arena,
) -> Result<QueueFamilyIndices, GraphicsError> {
    let properties = arena.alloc_from_vec(unsafe {
        instance.get_physical_device_queue_family_properties(physical_device)
    });

    let mut families = Vec::with_capacity(properties.len());
    for (index, family) in properties.iter().enumerate() {
        let supports_present = unsafe {
            surface_loader.get_physical_device_surface_support(
                physical_device,
                index as u32,
                surface,
            )
        }
        .map_err(GraphicsError::vulkan("query surface support"))?;

        families.push(QueueFamilyInfo {
            supports_graphics: family.queue_flags.contains(vk::QueueFlags::GRAPHICS),
            supports_present,
        });
    }

    find_queue_families(&families)
}

/// Check the device extensions and create the logical device with one
/// queue per distinct family.
pub fn create_logical_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    families: &QueueFamilyIndices,
    arena: &Arena,
) -> Result<ash::Device, GraphicsError> {
    let required = RequiredCapabilities::for_device();

    let available = arena.alloc_from_vec(
        unsafe { instance.enumerate_device_extension_properties(physical_device) }
            .map_err(GraphicsError::vulkan("enumerate device extensions"))?,
    );
    let available: Vec<&CStr> = available
        .iter()
        .filter_map(|e| e.extension_name_as_c_str().ok())
        .collect();
    ensure_supported(
        CapabilityKind::DeviceExtension,
        &required.extensions,
        &available,
    )?;

    let queue_priorities = [1.0f32];
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = families
        .unique()
        .into_iter()
        .map(|family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(&queue_priorities)
        })
        .collect();

    let extension_names = required.extension_ptrs();
    let features = vk::PhysicalDeviceFeatures::default();

    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .enabled_features(&features);

    let device = unsafe { instance.create_device(physical_device, &create_info, None) }
        .map_err(GraphicsError::vulkan("create device"))?;

    log::info!(
        "Logical device created with {} queue(s)",
        queue_create_infos.len()
    );

    Ok(device)
}
