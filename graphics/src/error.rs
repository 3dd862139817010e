//! Graphics error types.

use std::fmt;

use ash::vk;
use lantern_vfs::VfsError;
use thiserror::Error;

use crate::shader::ShaderStage;

/// Which requirement list a missing capability belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    /// Instance validation layer.
    Layer,
    /// Instance extension.
    InstanceExtension,
    /// Device extension.
    DeviceExtension,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layer => write!(f, "layer"),
            Self::InstanceExtension => write!(f, "instance extension"),
            Self::DeviceExtension => write!(f, "device extension"),
        }
    }
}

/// Queue capability that must be found on the selected device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    /// Graphics command execution.
    Graphics,
    /// Presentation to the target surface.
    Present,
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graphics => write!(f, "graphics"),
            Self::Present => write!(f, "present"),
        }
    }
}

/// Errors that can occur in the graphics system.
#[derive(Debug, Error)]
pub enum GraphicsError {
    /// Required layers or extensions are not supported by the platform.
    #[error("unsupported {kind}(s): {}", .missing.join(", "))]
    MissingCapability {
        kind: CapabilityKind,
        missing: Vec<String>,
    },
    /// The instance exposes no physical devices.
    #[error("no Vulkan-capable GPU found")]
    NoPhysicalDevice,
    /// The selected device has no queue family with the given capability.
    #[error("no {0} queue family found")]
    MissingQueueFamily(QueueKind),
    /// An API call returned an unexpected result.
    #[error("{operation} failed: {result:?}")]
    Vulkan {
        operation: &'static str,
        result: vk::Result,
    },
    /// Failed to initialize the graphics system.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    /// No mounted source holds the shader file.
    #[error("{stage:?} shader not found: {path} (mounted sources: {})", .mounted.join(", "))]
    ShaderNotFound {
        stage: ShaderStage,
        path: String,
        mounted: Vec<String>,
    },
    /// A shader binary or source could not be loaded.
    #[error("failed to load shader: {0}")]
    ShaderLoad(#[from] VfsError),
    /// Shader source could not be compiled to SPIR-V.
    #[error("shader compilation failed: {0}")]
    ShaderCompilationFailed(String),
    /// Shader bytes are not valid SPIR-V.
    #[error("invalid shader: {0}")]
    InvalidShader(String),
    /// The surface format changed after the render pass was built.
    #[error("surface format changed from {expected:?} to {found:?}")]
    SurfaceFormatChanged { expected: vk::Format, found: vk::Format },
}

impl GraphicsError {
    /// Build a `map_err` adapter that tags a raw API result with the failing operation.
    pub fn vulkan(operation: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |result| {
            log::error!("{operation} failed: {result:?}");
            Self::Vulkan { operation, result }
        }
    }
}
