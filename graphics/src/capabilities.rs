//! Capability negotiation.
//!
//! Every required layer and extension must be reported by the platform.
//! Negotiation is all-or-nothing: if anything is missing, nothing is enabled
//! and the error lists every absent name.

use std::ffi::{CStr, CString};

use crate::error::{CapabilityKind, GraphicsError};

/// Khronos validation layer.
pub const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Debug utilities instance extension (diagnostics sink).
pub const DEBUG_UTILS_EXTENSION_NAME: &CStr = c"VK_EXT_debug_utils";

/// Swapchain device extension.
pub const SWAPCHAIN_EXTENSION_NAME: &CStr = c"VK_KHR_swapchain";

#[cfg(target_os = "macos")]
const PORTABILITY_ENUMERATION_EXTENSION_NAME: &CStr = c"VK_KHR_portability_enumeration";

#[cfg(target_os = "macos")]
const PORTABILITY_SUBSET_EXTENSION_NAME: &CStr = c"VK_KHR_portability_subset";

/// Layers and extensions the renderer requires at one level (instance or device).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredCapabilities {
    /// Required layers (instance level only).
    pub layers: Vec<CString>,
    /// Required extensions.
    pub extensions: Vec<CString>,
}

impl RequiredCapabilities {
    /// Instance-level requirements.
    ///
    /// `window_extensions` are the surface extensions demanded by the
    /// windowing system. Validation adds the Khronos validation layer and the
    /// debug utilities extension.
    pub fn for_instance<'a>(
        window_extensions: impl IntoIterator<Item = &'a CStr>,
        validation: bool,
    ) -> Self {
        let mut required = Self::default();

        for name in window_extensions {
            required.push_extension(name);
        }

        #[cfg(target_os = "macos")]
        required.push_extension(PORTABILITY_ENUMERATION_EXTENSION_NAME);

        if validation {
            required.push_extension(DEBUG_UTILS_EXTENSION_NAME);
            required.push_layer(VALIDATION_LAYER_NAME);
        }

        required
    }

    /// Device-level requirements. Swapchain support is always required.
    pub fn for_device() -> Self {
        let mut required = Self::default();
        required.push_extension(SWAPCHAIN_EXTENSION_NAME);

        #[cfg(target_os = "macos")]
        required.push_extension(PORTABILITY_SUBSET_EXTENSION_NAME);

        required
    }

    /// Add a layer unless already present.
    pub fn push_layer(&mut self, name: &CStr) {
        if !self.layers.iter().any(|l| l.as_c_str() == name) {
            self.layers.push(name.to_owned());
        }
    }

    /// Add an extension unless already present.
    pub fn push_extension(&mut self, name: &CStr) {
        if !self.extensions.iter().any(|e| e.as_c_str() == name) {
            self.extensions.push(name.to_owned());
        }
    }

    /// Whether the debug utilities extension is part of this set.
    pub fn wants_debug_utils(&self) -> bool {
        self.extensions
            .iter()
            .any(|e| e.as_c_str() == DEBUG_UTILS_EXTENSION_NAME)
    }

    /// Pointers suitable for `enabled_layer_names`.
    ///
    /// The pointers borrow from `self`.
    pub fn layer_ptrs(&self) -> Vec<*const std::ffi::c_char> {
        self.layers.iter().map(|l| l.as_ptr()).collect()
    }

    /// Pointers suitable for `enabled_extension_names`.
    ///
    /// The pointers borrow from `self`.
    pub fn extension_ptrs(&self) -> Vec<*const std::ffi::c_char> {
        self.extensions.iter().map(|e| e.as_ptr()).collect()
    }
}

/// Check that every name in `required` is in `supported`.
///
/// Returns [`GraphicsError::MissingCapability`] listing all missing names,
/// in the order they were required.
pub fn ensure_supported<R, S>(
    kind: CapabilityKind,
    required: &[R],
    supported: &[S],
) -> Result<(), GraphicsError>
where
    R: AsRef<CStr>,
    S: AsRef<CStr>,
{
    let mut missing = Vec::new();
    for name in required {
        let name: &CStr = name.as_ref();
        if !supported.iter().any(|s| s.as_ref() == name) {
            missing.push(name.to_string_lossy().into_owned());
        }
    }

    if !missing.is_empty() {
        log::error!("Missing required {kind}(s): {}", missing.join(", "));
        return Err(GraphicsError::MissingCapability { kind, missing });
    }

    for name in required {
        log::debug!("Enabling {kind} {:?}", name.as_ref());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn names(list: &[&str]) -> Vec<CString> {
        list.iter().map(|n| CString::new(*n).unwrap()).collect()
    }

    #[rstest]
    #[case::empty_requirements(&[], &["VK_KHR_surface"], true)]
    #[case::exact_match(&["VK_KHR_surface"], &["VK_KHR_surface"], true)]
    #[case::proper_subset(&["A", "C"], &["A", "B", "C"], true)]
    #[case::one_missing(&["A", "D"], &["A", "B", "C"], false)]
    #[case::nothing_supported(&["A"], &[], false)]
    fn test_negotiation_is_subset_check(
        #[case] required: &[&str],
        #[case] supported: &[&str],
        #[case] expected_ok: bool,
    ) {
        let result = ensure_supported(
            CapabilityKind::InstanceExtension,
            &names(required),
            &names(supported),
        );
        assert_eq!(result.is_ok(), expected_ok);
    }

    #[test]
    fn test_failure_lists_every_missing_name() {
        let err = ensure_supported(
            CapabilityKind::Layer,
            &names(&["VK_LAYER_A", "VK_LAYER_B", "VK_LAYER_C"]),
            &names(&["VK_LAYER_B"]),
        )
        .unwrap_err();

        match err {
            GraphicsError::MissingCapability { kind, missing } => {
                assert_eq!(kind, CapabilityKind::Layer);
                assert_eq!(missing, vec!["VK_LAYER_A", "VK_LAYER_C"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_instance_requirements_with_validation() {
        let required =
            RequiredCapabilities::for_instance([c"VK_KHR_surface", c"VK_KHR_xlib_surface"], true);

        assert_eq!(required.layers, vec![VALIDATION_LAYER_NAME.to_owned()]);
        assert!(required.wants_debug_utils());
        assert_eq!(required.extensions[0].as_c_str(), c"VK_KHR_surface");
        assert_eq!(required.extensions[1].as_c_str(), c"VK_KHR_xlib_surface");
    }

    #[test]
    fn test_instance_requirements_without_validation() {
        let required = RequiredCapabilities::for_instance([c"VK_KHR_surface"], false);

        assert!(required.layers.is_empty());
        assert!(!required.wants_debug_utils());
    }

    #[test]
    fn test_duplicates_are_collapsed() {
        let required = RequiredCapabilities::for_instance(
            [c"VK_KHR_surface", c"VK_KHR_surface", DEBUG_UTILS_EXTENSION_NAME],
            true,
        );

        let debug_count = required
            .extensions
            .iter()
            .filter(|e| e.as_c_str() == DEBUG_UTILS_EXTENSION_NAME)
            .count();
        let surface_count = required
            .extensions
            .iter()
            .filter(|e| e.as_c_str() == c"VK_KHR_surface")
            .count();
        assert_eq!(debug_count, 1);
        assert_eq!(surface_count, 1);
    }

    #[test]
    fn test_device_requirements_include_swapchain() {
        let required = RequiredCapabilities::for_device();
        assert!(
            required
                .extensions
                .iter()
                .any(|e| e.as_c_str() == SWAPCHAIN_EXTENSION_NAME)
        );
        assert_eq!(required.extension_ptrs().len(), required.extensions.len());
    }
}
