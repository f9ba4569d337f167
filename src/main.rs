//! Café viewer binary
//!
//! Opens a window, starts loading the café model in the background and runs
//! the frame loop with the debug panel on top.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use thiserror::Error;
use winit::error::{EventLoopError, OsError};
use winit::event::{Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::window::Window;

use cafe_viewer::backend::traits::GraphicsBackend;
use cafe_viewer::debug_panel::PanelStatus;
use cafe_viewer::{
    BindPolicy, DebugPanel, FrameDriver, FrameHandler, FrameStats, GltfLoader, PointerTracker,
    Viewer, ViewerConfig, ViewerError, WgpuBackend, WgpuEguiIntegration, WindowHost,
};

/// Baked-lighting café scene viewer
#[derive(Parser, Debug)]
#[command(name = "cafe", version, about)]
struct Args {
    /// Directory containing cafe.glb and its baked textures
    #[arg(long, default_value = "assets")]
    assets: PathBuf,

    /// Fail when a material binding names a node the model lacks
    #[arg(long)]
    strict_bindings: bool,

    /// Disable vertical sync
    #[arg(long)]
    no_vsync: bool,

    /// Start with bloom enabled
    #[arg(long)]
    bloom: bool,

    /// Initial window width in logical pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Initial window height in logical pixels
    #[arg(long, default_value_t = 720)]
    height: u32,
}

impl Args {
    fn config(&self) -> ViewerConfig {
        let policy = if self.strict_bindings {
            BindPolicy::Strict
        } else {
            BindPolicy::SkipMissing
        };
        ViewerConfig::default()
            .with_asset_dir(&self.assets)
            .with_vsync(!self.no_vsync)
            .with_bind_policy(policy)
            .with_bloom(self.bloom)
            .with_size(self.width, self.height)
    }
}

#[derive(Error, Debug)]
enum AppError {
    #[error("event loop: {0}")]
    EventLoop(#[from] EventLoopError),
    #[error("window: {0}")]
    Window(#[from] OsError),
    #[error(transparent)]
    Viewer(#[from] ViewerError),
}

/// One frame of the viewer with the panel drawn over it
struct PanelFrame<'a> {
    viewer: &'a mut Viewer<WgpuBackend>,
    egui: &'a mut WgpuEguiIntegration,
    panel: &'a mut DebugPanel,
    window: &'a Window,
    stats: FrameStats,
}

impl FrameHandler for PanelFrame<'_> {
    type Error = ViewerError;

    fn on_update(&mut self, delta_time: f32) {
        self.viewer.on_update(delta_time);
    }

    fn on_draw(&mut self) -> Result<(), ViewerError> {
        let status = PanelStatus {
            stats: &self.stats,
            load_error: self.viewer.load_error(),
            loading: self.viewer.is_loading(),
        };
        let panel = &mut *self.panel;
        self.egui.run(self.window, |ctx| panel.show(ctx, status));

        let egui = &mut *self.egui;
        self.viewer
            .render_with_overlay(|backend, frame| egui.paint(backend, frame))?;
        Ok(())
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), AppError> {
    let config = args.config();
    log::info!("Loading scene from {}", config.asset_dir.display());

    let event_loop = EventLoop::new()?;
    let host = WindowHost::new(&event_loop, &config.title, config.width, config.height)?;

    let backend = WgpuBackend::new(host.window_arc(), config.vsync).map_err(ViewerError::from)?;
    let mut viewer = Viewer::new(backend, &config, host.scale_factor())?;
    let (width, height) = host.logical_size();
    viewer.resize(width, height, host.scale_factor())?;

    let mut egui = WgpuEguiIntegration::new(viewer.backend(), host.window());
    egui.set_surface_scale(host.physical_size(), viewer.backend().surface_size());
    let mut panel = DebugPanel::new(viewer.pipeline().parameters_handle());
    let mut pointer = PointerTracker::new();

    viewer.start_loading(Arc::new(GltfLoader), config.manifest());

    let mut driver = FrameDriver::new();
    driver.start(&host);

    event_loop.run(move |event, elwt| {
        let Event::WindowEvent { event, .. } = event else {
            return;
        };

        let consumed = egui.on_window_event(host.window(), &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested");
                elwt.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                let (width, height) = host.logical_size();
                if let Err(e) = viewer.resize(width, height, host.scale_factor()) {
                    log::error!("Resize failed: {}", e);
                    elwt.exit();
                    return;
                }
                egui.set_surface_scale(host.physical_size(), viewer.backend().surface_size());
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = viewer.poll_load() {
                    log::error!("{}", e);
                    elwt.exit();
                    return;
                }

                let mut frame = PanelFrame {
                    viewer: &mut viewer,
                    egui: &mut egui,
                    panel: &mut panel,
                    window: host.window(),
                    stats: driver.stats().clone(),
                };
                if let Err(e) = driver.tick(Instant::now(), &mut frame, &host) {
                    log::error!("Frame failed: {}", e);
                    elwt.exit();
                }
            }
            WindowEvent::MouseInput { .. } | WindowEvent::MouseWheel { .. } if consumed => {
                PointerTracker::release(viewer.input_mut());
            }
            other => {
                pointer.handle_event(&other, viewer.input_mut());
            }
        }
    })?;

    Ok(())
}
