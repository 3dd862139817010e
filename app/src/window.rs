//! Window state tracked between ticks.
//!
//! Winit events are reduced to [`WindowSignal`]s and folded into a
//! [`WindowState`], so the main loop only looks at three facts: whether the
//! window is still running, whether it was resized during the current tick,
//! and its current size in physical pixels.

use lantern_graphics::vk;
use winit::event::WindowEvent;

/// The window events the renderer cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSignal {
    /// The user asked to close the window.
    CloseRequested,
    /// The drawable area changed, in physical pixels.
    Resized { width: u32, height: u32 },
    /// The window was destroyed.
    Destroyed,
}

impl WindowSignal {
    /// Reduce a winit event to a signal, if it is one we track.
    pub fn from_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::CloseRequested => Some(Self::CloseRequested),
            WindowEvent::Destroyed => Some(Self::Destroyed),
            WindowEvent::Resized(size) => Some(Self::Resized {
                width: size.width,
                height: size.height,
            }),
            _ => None,
        }
    }
}

/// Running flag, resize flag and size of the single window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    running: bool,
    resized: bool,
    width: u32,
    height: u32,
}

impl WindowState {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            running: true,
            resized: false,
            width,
            height,
        }
    }

    /// Fold one signal into the state.
    pub fn apply(&mut self, signal: WindowSignal) {
        match signal {
            WindowSignal::CloseRequested | WindowSignal::Destroyed => {
                if self.running {
                    log::info!("Window closing ({signal:?})");
                }
                self.running = false;
            }
            WindowSignal::Resized { width, height } => {
                if (width, height) != (self.width, self.height) {
                    log::debug!("Window resized to {width}x{height}");
                    self.width = width;
                    self.height = height;
                    self.resized = true;
                }
            }
        }
    }

    /// Start a new tick; clears the resize flag.
    pub fn begin_tick(&mut self) {
        self.resized = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether the size changed since the last [`begin_tick`](Self::begin_tick).
    pub fn was_resized(&self) -> bool {
        self.resized
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Size as a Vulkan extent.
    pub fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }

    /// Minimized windows report a zero-area size.
    pub fn is_minimized(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
