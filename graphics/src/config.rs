//! Renderer configuration.

use crate::frame::DEFAULT_CLEAR_COLOR;

/// Settings fixed at renderer creation.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Application name reported to the driver.
    pub application_name: String,
    /// Enable the Khronos validation layer and the debug messenger.
    pub validation: bool,
    /// Color the frame is cleared to before the triangle is drawn.
    pub clear_color: [f32; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            application_name: "Lantern".to_string(),
            validation: cfg!(debug_assertions),
            clear_color: DEFAULT_CLEAR_COLOR,
        }
    }
}

impl RendererConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validation = enabled;
        self
    }

    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }
}
