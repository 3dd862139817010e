//! # Lantern App
//!
//! Window and main-loop shell for the Lantern triangle renderer.
//!
//! ## Overview
//!
//! - [`TriangleArgs`] - Command line configuration
//! - [`WindowState`] - Running, resize and size facts folded from window events
//! - [`FpsCounter`] - Periodic frame rate logging
//! - [`App`] - The winit application that owns the window and the renderer
//! - [`run`] - Logging setup plus the event loop, mapped to a process exit code
//!
//! ## Example
//!
//! ```ignore
//! use clap::Parser;
//! use lantern_app::TriangleArgs;
//!
//! fn main() -> std::process::ExitCode {
//!     lantern_app::run(TriangleArgs::parse())
//! }
//! ```

mod app;
mod args;
mod timing;
mod window;

use std::process::ExitCode;

pub use app::App;
pub use args::{DEFAULT_FRAGMENT_SHADER, DEFAULT_VERTEX_SHADER, TriangleArgs};
pub use timing::FpsCounter;
pub use window::{WindowSignal, WindowState};

/// App library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the app library version.
pub fn init() {
    log::info!("Lantern App v{} initialized", VERSION);
}

/// Initialize logging and run the triangle until the window closes.
///
/// `RUST_LOG` overrides the default `info` filter. Returns success on a
/// graceful shutdown and failure on any fatal error.
pub fn run(args: TriangleArgs) -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    lantern_core::init();
    lantern_graphics::init();
    init();

    log::debug!("{:?}", args);
    App::run(args)
}
