//! Command line arguments for the triangle shell.
//!
//! # Examples
//!
//! ```bash
//! # Show help
//! ./triangle --help
//!
//! # Larger window, validation forced off
//! ./triangle --width 1920 --height 1080 --no-validation
//!
//! # Render 100 ticks then exit (useful for testing)
//! ./triangle --max-frames 100
//! ```

use std::path::PathBuf;

use clap::Parser;
use lantern_graphics::{RendererConfig, vk};

/// Default vertex shader path, relative to the asset directory.
pub const DEFAULT_VERTEX_SHADER: &str = "shaders/triangle.vert.wgsl";
/// Default fragment shader path, relative to the asset directory.
pub const DEFAULT_FRAGMENT_SHADER: &str = "shaders/triangle.frag.wgsl";

/// Triangle demo arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "triangle",
    about = "Draws one triangle through the Lantern Vulkan renderer",
    version
)]
pub struct TriangleArgs {
    /// Initial window width in pixels.
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Initial window height in pixels.
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Window title, also reported to the driver as the application name.
    #[arg(long, default_value = "Test")]
    pub title: String,

    /// Enable GPU validation layers (slower but helps catch bugs).
    #[arg(long, conflicts_with = "no_validation")]
    pub validation: bool,

    /// Disable GPU validation layers.
    #[arg(long, conflicts_with = "validation")]
    pub no_validation: bool,

    /// Exit after N ticks.
    #[arg(long)]
    pub max_frames: Option<u64>,

    /// Directory the shader paths are resolved against.
    #[arg(long)]
    pub asset_dir: Option<PathBuf>,

    /// Vertex shader, `.wgsl` source or `.spv` binary.
    #[arg(long, default_value = DEFAULT_VERTEX_SHADER)]
    pub vertex_shader: String,

    /// Fragment shader, `.wgsl` source or `.spv` binary.
    #[arg(long, default_value = DEFAULT_FRAGMENT_SHADER)]
    pub fragment_shader: String,

    /// Log the frame rate every N ticks.
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
    pub fps_interval: u64,
}

impl Default for TriangleArgs {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Test".to_string(),
            validation: false,
            no_validation: false,
            max_frames: None,
            asset_dir: None,
            vertex_shader: DEFAULT_VERTEX_SHADER.to_string(),
            fragment_shader: DEFAULT_FRAGMENT_SHADER.to_string(),
            fps_interval: 100,
        }
    }
}

impl TriangleArgs {
    /// Use `dir` for assets unless `--asset-dir` was given.
    pub fn with_default_asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        if self.asset_dir.is_none() {
            self.asset_dir = Some(dir.into());
        }
        self
    }

    /// Asset directory, falling back to the working directory.
    pub fn asset_dir(&self) -> PathBuf {
        self.asset_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Whether validation layers are requested.
    ///
    /// `--validation` forces on, `--no-validation` forces off, otherwise
    /// debug builds validate.
    pub fn validation(&self) -> bool {
        self.validation || (!self.no_validation && cfg!(debug_assertions))
    }

    /// Requested initial window size.
    pub fn window_size(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }

    /// Renderer configuration derived from these arguments.
    pub fn renderer_config(&self) -> RendererConfig {
        RendererConfig::new()
            .with_application_name(self.title.clone())
            .with_validation(self.validation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> TriangleArgs {
        TriangleArgs::try_parse_from(std::iter::once("triangle").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);

        assert_eq!(args.window_size(), vk::Extent2D { width: 1280, height: 720 });
        assert_eq!(args.title, "Test");
        assert_eq!(args.max_frames, None);
        assert_eq!(args.fps_interval, 100);
        assert_eq!(args.vertex_shader, DEFAULT_VERTEX_SHADER);
        assert_eq!(args.fragment_shader, DEFAULT_FRAGMENT_SHADER);
        assert_eq!(args.validation(), cfg!(debug_assertions));
        assert_eq!(args.asset_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_parsed_defaults_match_default_impl() {
        let parsed = parse(&[]);
        let default = TriangleArgs::default();

        assert_eq!(parsed.window_size(), default.window_size());
        assert_eq!(parsed.title, default.title);
        assert_eq!(parsed.fps_interval, default.fps_interval);
        assert_eq!(parsed.vertex_shader, default.vertex_shader);
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "--width",
            "800",
            "--height",
            "600",
            "--title",
            "Lantern",
            "--max-frames",
            "10",
            "--asset-dir",
            "/tmp/assets",
            "--vertex-shader",
            "shaders/tri.vert.spv",
            "--fps-interval",
            "5",
        ]);

        assert_eq!(args.window_size(), vk::Extent2D { width: 800, height: 600 });
        assert_eq!(args.title, "Lantern");
        assert_eq!(args.max_frames, Some(10));
        assert_eq!(args.asset_dir(), PathBuf::from("/tmp/assets"));
        assert_eq!(args.vertex_shader, "shaders/tri.vert.spv");
        assert_eq!(args.fps_interval, 5);
    }

    #[rstest]
    #[case::forced_on(&["--validation"], true)]
    #[case::forced_off(&["--no-validation"], false)]
    #[case::build_default(&[], cfg!(debug_assertions))]
    fn test_validation_flags(#[case] flags: &[&str], #[case] expected: bool) {
        let args = parse(flags);
        assert_eq!(args.validation(), expected);
        assert_eq!(args.renderer_config().validation, expected);
    }

    #[test]
    fn test_conflicting_validation_flags_are_rejected() {
        let result = TriangleArgs::try_parse_from(["triangle", "--validation", "--no-validation"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_fps_interval_is_rejected() {
        let result = TriangleArgs::try_parse_from(["triangle", "--fps-interval", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_asset_dir_does_not_override_flag() {
        let args = parse(&["--asset-dir", "custom"]).with_default_asset_dir("fallback");
        assert_eq!(args.asset_dir(), PathBuf::from("custom"));

        let args = parse(&[]).with_default_asset_dir("fallback");
        assert_eq!(args.asset_dir(), PathBuf::from("fallback"));
    }

    #[test]
    fn test_title_becomes_application_name() {
        let config = parse(&["--title", "Demo"]).renderer_config();
        assert_eq!(config.application_name, "Demo");
    }
}
