//! Viewer: owns the backend, scene, camera and pipeline and wires them
//! together for the frame loop.

use std::sync::Arc;
use thiserror::Error;

use crate::asset::{AssetLoader, AssetManifest, LoadError, LoadedAsset, PendingLoad};
use crate::backend::traits::*;
use crate::binder::{bind, BindError, BindPolicy, BindReport, BindingTable};
use crate::cafe;
use crate::frame::FrameHandler;
use crate::pipeline::{FrameReport, PipelineParameters, RenderPipeline};
use crate::resources::{MaterialRegistry, MaterialRole};
use crate::scene::{Camera, CameraController, CameraInput, OrbitControls, Scene};
use crate::ViewerConfig;

/// Upper bound on the device pixel ratio used for rendering
pub const MAX_PIXEL_RATIO: f32 = 2.0;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error("bind error: {0}")]
    Bind(#[from] BindError),
}

/// Pixel ratio actually rendered at: `min(ratio, 2)`. Ratios that are not
/// positive numbers fall back to 1.
pub fn effective_pixel_ratio(ratio: f32) -> f32 {
    if ratio.is_nan() || ratio <= 0.0 {
        1.0
    } else {
        ratio.min(MAX_PIXEL_RATIO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Viewport {
    width: u32,
    height: u32,
    pixel_ratio: f32,
}

pub struct Viewer<B: GraphicsBackend> {
    backend: B,
    pipeline: RenderPipeline,
    scene: Scene,
    camera: Camera,
    controls: OrbitControls,
    input: CameraInput,
    registry: MaterialRegistry,
    bindings: BindingTable,
    default_role: MaterialRole,
    bind_policy: BindPolicy,
    pending: Option<PendingLoad>,
    load_error: Option<String>,
    viewport: Option<Viewport>,
}

impl<B: GraphicsBackend> Viewer<B> {
    /// Set up the café scene on `backend`. `pixel_ratio` decides the target
    /// kind once, here.
    pub fn new(mut backend: B, config: &ViewerConfig, pixel_ratio: f32) -> Result<Self, ViewerError> {
        let pixel_ratio = effective_pixel_ratio(pixel_ratio);
        let pipeline = RenderPipeline::new(
            &mut backend,
            pixel_ratio,
            config.msaa_samples,
            config.parameters.clone(),
        )?;

        let (width, height) = backend.surface_size();
        let camera = config.camera.camera(width as f32 / height.max(1) as f32);
        let controls = OrbitControls::new(config.camera.target).with_damping(config.damping_factor);

        Ok(Self {
            backend,
            pipeline,
            scene: Scene::new(),
            camera,
            controls,
            input: CameraInput::new(),
            registry: cafe::registry(),
            bindings: cafe::binding_table(),
            default_role: cafe::DEFAULT_ROLE,
            bind_policy: config.bind_policy,
            pending: None,
            load_error: None,
            viewport: None,
        })
    }

    /// Replace the materials and bindings applied to loaded assets.
    pub fn with_bindings(
        mut self,
        registry: MaterialRegistry,
        bindings: BindingTable,
        default_role: MaterialRole,
    ) -> Self {
        self.registry = registry;
        self.bindings = bindings;
        self.default_role = default_role;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn controls_mut(&mut self) -> &mut OrbitControls {
        &mut self.controls
    }

    /// Input accumulated until the next controls update
    pub fn input_mut(&mut self) -> &mut CameraInput {
        &mut self.input
    }

    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    pub fn parameters(&self) -> PipelineParameters {
        self.pipeline.parameters().borrow().clone()
    }

    /// Last load failure, if the scene could not be loaded
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Start loading in the background. Replaces any load in flight.
    pub fn start_loading(&mut self, loader: Arc<dyn AssetLoader>, manifest: AssetManifest) {
        self.load_error = None;
        self.pending = Some(PendingLoad::spawn(loader, manifest));
    }

    /// Install the load result once it arrives. A load failure leaves the
    /// scene empty and is not an error here; a strict bind failure is.
    /// Returns whether anything changed.
    pub fn poll_load(&mut self) -> Result<bool, ViewerError> {
        let Some(result) = self.pending.as_mut().and_then(PendingLoad::poll) else {
            return Ok(false);
        };
        self.pending = None;

        match result {
            Ok(asset) => {
                self.install_asset(asset)?;
            }
            Err(err) => self.report_load_failure(err),
        }
        Ok(true)
    }

    /// Bind materials onto the asset and make it the current scene.
    pub fn install_asset(&mut self, asset: LoadedAsset) -> Result<BindReport, BindError> {
        let LoadedAsset { mut graph, textures } = asset;
        let report = bind(
            &mut graph,
            &self.bindings,
            &self.registry,
            self.default_role,
            self.bind_policy,
        )?;

        for key in self.registry.texture_keys() {
            if !textures.contains_key(&key) {
                log::warn!("Asset is missing texture '{}'", key.as_str());
            }
        }

        log::info!(
            "Scene installed: {} nodes, {} bindings ({} skipped)",
            graph.len(),
            report.bound,
            report.skipped.len()
        );
        self.scene.install(graph, textures);
        self.load_error = None;
        Ok(report)
    }

    pub fn report_load_failure(&mut self, err: LoadError) {
        log::error!("Failed to load scene: {}", err);
        self.load_error = Some(err.to_string());
    }

    /// Propagate a viewport change: camera projection first, then the
    /// backend surface at the clamped pixel ratio, then the pipeline target
    /// and pass buffers sized from the surface. Repeating the same size is
    /// a no-op.
    pub fn resize(&mut self, width: u32, height: u32, pixel_ratio: f32) -> Result<bool, ViewerError> {
        if width == 0 || height == 0 {
            return Ok(false);
        }
        let viewport = Viewport {
            width,
            height,
            pixel_ratio: effective_pixel_ratio(pixel_ratio),
        };
        if self.viewport == Some(viewport) {
            return Ok(false);
        }

        self.camera.set_aspect(width as f32, height as f32);
        self.camera.update_projection();

        let physical_width = (width as f32 * viewport.pixel_ratio).round() as u32;
        let physical_height = (height as f32 * viewport.pixel_ratio).round() as u32;
        self.backend.resize(physical_width, physical_height);

        let (surface_width, surface_height) = self.backend.surface_size();
        self.pipeline
            .resize(&mut self.backend, surface_width, surface_height)?;

        log::debug!(
            "Viewport {}x{} @{} -> surface {}x{}",
            width,
            height,
            viewport.pixel_ratio,
            surface_width,
            surface_height
        );
        self.viewport = Some(viewport);
        Ok(true)
    }

    /// Feed pending input to the controls and advance their damping.
    /// Returns whether the camera moved.
    pub fn update_controls(&mut self) -> bool {
        self.controls.handle_input(&self.input);
        self.input.reset_deltas();
        self.controls.update(&mut self.camera)
    }

    pub fn render(&mut self) -> Result<FrameReport, ViewerError> {
        self.render_with_overlay(|_, _| {})
    }

    /// Render a frame, letting `overlay` draw on the swapchain (the debug
    /// panel) before present. A lost surface is reconfigured and the frame
    /// skipped.
    pub fn render_with_overlay(
        &mut self,
        overlay: impl FnOnce(&mut B, &FrameContext),
    ) -> Result<FrameReport, ViewerError> {
        match self
            .pipeline
            .render_with_overlay(&mut self.backend, &self.scene, &self.camera, overlay)
        {
            Ok(report) => Ok(report),
            Err(BackendError::SurfaceLost) => {
                log::warn!("Surface lost, reconfiguring");
                let (width, height) = self.backend.surface_size();
                self.backend.resize(width, height);
                Ok(FrameReport::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl<B: GraphicsBackend> FrameHandler for Viewer<B> {
    type Error = ViewerError;

    fn on_update(&mut self, _delta_time: f32) {
        self.update_controls();
    }

    fn on_draw(&mut self) -> Result<(), ViewerError> {
        self.render().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;

    #[test]
    fn test_pixel_ratio_clamp() {
        assert_eq!(effective_pixel_ratio(1.0), 1.0);
        assert_eq!(effective_pixel_ratio(3.0), 2.0);
        assert_eq!(effective_pixel_ratio(0.0), 1.0);
        assert_eq!(effective_pixel_ratio(f32::NAN), 1.0);
    }

    #[test]
    fn test_empty_scene_renders_cleared_frame() {
        let mut viewer = Viewer::new(DummyBackend::new(640, 480), &ViewerConfig::default(), 1.0).unwrap();
        let report = viewer.render().unwrap();
        assert_eq!(report.executed, vec!["Scene Pass", "Output"]);
        assert!(!viewer.scene().is_loaded());
    }

    #[test]
    fn test_load_failure_keeps_empty_scene() {
        let mut viewer = Viewer::new(DummyBackend::new(64, 64), &ViewerConfig::default(), 1.0).unwrap();
        viewer.pending = Some(PendingLoad::ready(Err(LoadError::EmptyScene("cafe.glb".into()))));

        assert!(viewer.poll_load().unwrap());
        assert!(viewer.load_error().is_some());
        assert!(!viewer.scene().is_loaded());
        assert!(!viewer.poll_load().unwrap());
        assert!(viewer.render().is_ok());
    }
}
