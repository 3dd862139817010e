//! Triangle demo.
//!
//! Opens a window and draws one triangle every tick until the window is
//! closed. Shaders are compiled from the WGSL sources shipped next to this
//! crate unless `--asset-dir` points elsewhere.
//!
//! ```bash
//! cargo run --bin triangle -- --max-frames 300
//! ```

use std::process::ExitCode;

use clap::Parser;
use lantern_app::TriangleArgs;

fn main() -> ExitCode {
    let args = TriangleArgs::parse().with_default_asset_dir(env!("CARGO_MANIFEST_DIR"));
    lantern_app::run(args)
}
