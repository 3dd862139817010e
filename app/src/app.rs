//! Main application struct and event loop.

use std::process::ExitCode;

use winit::application::ApplicationHandler;
use winit::event::{StartCause, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
#[cfg(target_os = "windows")]
use winit::platform::windows::EventLoopBuilderExtWindows;
use winit::window::{Window, WindowId};

use lantern_graphics::{
    DrawOutcome, GpuBackend, GraphicsError, Renderer, ShaderSet, VulkanBackend, vk,
};
use lantern_vfs::{FileSystemProvider, Vfs};

use crate::args::TriangleArgs;
use crate::timing::FpsCounter;
use crate::window::{WindowSignal, WindowState};

/// VFS source name the asset directory is mounted under.
const ASSET_SOURCE: &str = "assets";

/// Owns the window and the renderer and ticks them.
///
/// Each loop iteration is one tick: window events are folded into the
/// [`WindowState`], then one frame is drawn in `about_to_wait`. The loop
/// stops when the window closes, `--max-frames` ticks have run, or the
/// renderer fails.
///
/// # Example
///
/// ```ignore
/// use lantern_app::{App, TriangleArgs};
///
/// let code = App::run(TriangleArgs::parse());
/// ```
pub struct App {
    args: TriangleArgs,
    // Declared before `window`: the surface must go before the window it
    // was created from.
    renderer: Option<Renderer<VulkanBackend>>,
    window: Option<Window>,
    state: WindowState,
    fps: FpsCounter,
    ticks: u64,
    failed: bool,
}

impl App {
    /// Create the application. Nothing is opened until the event loop resumes.
    pub fn new(args: TriangleArgs) -> Self {
        let state = WindowState::new(args.width, args.height);
        let fps = FpsCounter::new(args.fps_interval);
        Self {
            args,
            renderer: None,
            window: None,
            state,
            fps,
            ticks: 0,
            failed: false,
        }
    }

    /// Run the event loop until the window closes.
    ///
    /// Returns success on a graceful shutdown and failure if the window,
    /// the renderer or the event loop could not be brought up or failed
    /// while running.
    pub fn run(args: TriangleArgs) -> ExitCode {
        #[cfg(target_os = "windows")]
        let event_loop = EventLoop::builder().with_any_thread(true).build();

        #[cfg(not(target_os = "windows"))]
        let event_loop = EventLoop::new();

        let event_loop = match event_loop {
            Ok(event_loop) => event_loop,
            Err(e) => {
                log::error!("Failed to create event loop: {}", e);
                return ExitCode::FAILURE;
            }
        };
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = Self::new(args);
        if let Err(e) = event_loop.run_app(&mut app) {
            log::error!("Event loop error: {}", e);
            return ExitCode::FAILURE;
        }

        app.exit_code()
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.failed {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, what: &str, error: &GraphicsError) {
        log::error!("{}: {}", what, error);
        self.failed = true;
        event_loop.exit();
    }

    fn init_renderer(&self, window: &Window) -> Result<Renderer<VulkanBackend>, GraphicsError> {
        let asset_dir = self.args.asset_dir();
        log::info!("Loading shaders from {}", asset_dir.display());

        let mut vfs = Vfs::new();
        vfs.mount(ASSET_SOURCE, FileSystemProvider::new(asset_dir));
        vfs.set_default(ASSET_SOURCE);

        let shaders = ShaderSet::load(&vfs, &self.args.vertex_shader, &self.args.fragment_shader)?;

        let size = window.inner_size();
        let window_size = vk::Extent2D {
            width: size.width,
            height: size.height,
        };

        Renderer::create(window, window_size, &self.args.renderer_config(), &shaders)
    }

    /// Draw one frame at the current window size.
    fn tick(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = &mut self.renderer else {
            return;
        };

        if self.state.was_resized() {
            renderer.resize(self.state.extent());
        }

        match renderer.draw() {
            Ok(DrawOutcome::Presented { image_index }) => {
                log::trace!("Presented image {}", image_index);
            }
            Ok(DrawOutcome::Recreated { stage, cause }) => {
                log::debug!("Chain recreated at {:?} ({:?})", stage, cause);
            }
            Ok(DrawOutcome::Skipped) => {}
            Err(e) => {
                self.fail(event_loop, "Frame failed", &e);
                return;
            }
        }

        self.ticks += 1;
        self.fps.tick();

        if let Some(max_frames) = self.args.max_frames
            && self.ticks >= max_frames
        {
            log::info!("Reached max frames limit ({}), exiting", max_frames);
            event_loop.exit();
        }
    }
}

impl ApplicationHandler for App {
    fn new_events(&mut self, _event_loop: &ActiveEventLoop, _cause: StartCause) {
        self.state.begin_tick();
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title(self.args.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.args.width,
                self.args.height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => window,
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                self.failed = true;
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        self.state = WindowState::new(size.width, size.height);
        log::info!("Window created: {}x{}", size.width, size.height);

        match self.init_renderer(&window) {
            Ok(renderer) => {
                log::info!("Renderer ready ({})", renderer.backend().name());
                self.renderer = Some(renderer);
                self.window = Some(window);
            }
            Err(e) => {
                self.window = Some(window);
                self.fail(event_loop, "Failed to initialize renderer", &e);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(signal) = WindowSignal::from_event(&event) else {
            return;
        };

        self.state.apply(signal);
        if !self.state.is_running() {
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_running() && !event_loop.exiting() {
            self.tick(event_loop);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // Renderer first; it waits for the GPU before releasing anything.
        if let Some(renderer) = self.renderer.take() {
            let presented = renderer.executor().frames_presented();
            let recreations = renderer.executor().recreations();
            drop(renderer);
            log::info!(
                "Shut down after {} ticks ({} frames presented, {} chain recreations)",
                self.ticks,
                presented,
                recreations
            );
        }
        self.window = None;
    }
}
