//! Vulkan instance creation and capability negotiation.

use std::ffi::{CStr, CString};

use ash::vk;
use lantern_core::Arena;
use raw_window_handle::RawDisplayHandle;

use crate::capabilities::{RequiredCapabilities, ensure_supported};
use crate::config::RendererConfig;
use crate::error::{CapabilityKind, GraphicsError};

/// Vulkan 1.0 is all the triangle needs.
const REQUIRED_API_VERSION: u32 = vk::make_api_version(0, 1, 0, 0);

const ENGINE_NAME: &CStr = c"Lantern";

/// Instance requirements for `display`, negotiated against what the loader reports.
///
/// Fails if any layer or extension is missing.
pub fn negotiate_instance_capabilities(
    entry: &ash::Entry,
    arena: &Arena,
    display: RawDisplayHandle,
    validation: bool,
) -> Result<RequiredCapabilities, GraphicsError> {
    let window_extensions = ash_window::enumerate_required_extensions(display)
        .map_err(GraphicsError::vulkan("enumerate window extensions"))?;
    // SAFETY: ash-window returns pointers to static, null-terminated extension names.
    let window_extensions = window_extensions
        .iter()
        .map(|&ptr| unsafe { CStr::from_ptr(ptr) });

    let required = RequiredCapabilities::for_instance(window_extensions, validation);

    let layers = arena.alloc_from_vec(
        unsafe { entry.enumerate_instance_layer_properties() }
            .map_err(GraphicsError::vulkan("enumerate instance layers"))?,
    );
    let layer_names: Vec<&CStr> = layers
        .iter()
        .filter_map(|l| l.layer_name_as_c_str().ok())
        .collect();
    ensure_supported(CapabilityKind::Layer, &required.layers, &layer_names)?;

    let extensions = arena.alloc_from_vec(
        unsafe { entry.enumerate_instance_extension_properties(None) }
            .map_err(GraphicsError::vulkan("enumerate instance extensions"))?,
    );
    let extension_names: Vec<&CStr> = extensions
        .iter()
        .filter_map(|e| e.extension_name_as_c_str().ok())
        .collect();
    ensure_supported(
        CapabilityKind::InstanceExtension,
        &required.extensions,
        &extension_names,
    )?;

    Ok(required)
}

/// Create the instance with exactly the negotiated layers and extensions.
pub fn create_instance(
    entry: &ash::Entry,
    config: &RendererConfig,
    required: &RequiredCapabilities,
) -> Result<ash::Instance, GraphicsError> {
    let app_name = CString::new(config.application_name.as_str()).map_err(|e| {
        GraphicsError::InitializationFailed(format!("Invalid application name: {e}"))
    })?;

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(ENGINE_NAME)
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(REQUIRED_API_VERSION);

    let layer_names = required.layer_ptrs();
    let extension_names = required.extension_ptrs();

    // Instance creation flags
    #[allow(unused_mut)]
    let mut create_flags = vk::InstanceCreateFlags::empty();

    #[cfg(target_os = "macos")]
    {
        create_flags |= vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
    }

    let create_info = vk::InstanceCreateInfo::default()
        .flags(create_flags)
        .application_info(&app_info)
        .enabled_layer_names(&layer_names)
        .enabled_extension_names(&extension_names);

    let instance = unsafe { entry.create_instance(&create_info, None) }
        .map_err(GraphicsError::vulkan("create instance"))?;

    log::info!(
        "Vulkan instance created for {:?} ({} layers, {} extensions)",
        config.application_name,
        required.layers.len(),
        required.extensions.len()
    );

    Ok(instance)
}
