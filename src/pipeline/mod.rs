//! Multi-pass render pipeline
//!
//! Each frame runs:
//! 1. Scene pass - draws the bound scene into the shared target, replacing it
//! 2. Bloom (optional) - extract, blur and composite back into the target
//! 3. Output - presents the target on the swapchain
//!
//! Parameters live in a shared cell that the debug panel writes between
//! frames; the pipeline snapshots them once at the start of every frame.

pub mod pass;
pub mod postprocess;
pub mod scene_pass;
pub mod target;

pub use pass::{PassExecuteContext, PassSetupContext, PassTexture, RenderPass, TextureSize};
pub use postprocess::{BloomPass, OutputPass};
pub use scene_pass::ScenePass;
pub use target::{RenderTarget, TargetKind, DEPTH_FORMAT, TARGET_FORMAT};

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::backend::traits::*;
use crate::resources::Color;
use crate::scene::{Camera, Scene};

/// Live-tunable pipeline state
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineParameters {
    pub bloom_enabled: bool,
    pub bloom_strength: f32,
    pub bloom_radius: f32,
    pub bloom_threshold: f32,
    pub clear_color: Color,
}

impl Default for PipelineParameters {
    fn default() -> Self {
        Self {
            bloom_enabled: false,
            bloom_strength: 0.3,
            bloom_radius: 1.0,
            bloom_threshold: 0.6,
            clear_color: Color::from_hex(0x333333),
        }
    }
}

impl PipelineParameters {
    pub fn with_bloom(mut self, enabled: bool) -> Self {
        self.bloom_enabled = enabled;
        self
    }

    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }
}

/// Single-threaded shared parameter cell. The pipeline holds the only
/// strong reference; editors hold a [`Weak`].
pub type SharedParameters = Rc<RefCell<PipelineParameters>>;

/// What ran during one frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Names of the passes executed, in order
    pub executed: Vec<&'static str>,
}

impl FrameReport {
    pub fn ran(&self, pass: &str) -> bool {
        self.executed.iter().any(|name| *name == pass)
    }
}

pub struct RenderPipeline {
    target: RenderTarget,
    passes: Vec<Box<dyn RenderPass>>,
    output: OutputPass,
    parameters: SharedParameters,
}

impl RenderPipeline {
    /// Build the scene and bloom pass chain. The target kind is decided here
    /// once and never re-evaluated.
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        pixel_ratio: f32,
        samples: u32,
        parameters: PipelineParameters,
    ) -> BackendResult<Self> {
        let passes: Vec<Box<dyn RenderPass>> =
            vec![Box::new(ScenePass::new()), Box::new(BloomPass::new())];
        Self::with_passes(backend, pixel_ratio, samples, parameters, passes)
    }

    /// Build with a custom pass chain. An empty chain presents the cleared
    /// target unchanged.
    pub fn with_passes(
        backend: &mut dyn GraphicsBackend,
        pixel_ratio: f32,
        samples: u32,
        parameters: PipelineParameters,
        passes: Vec<Box<dyn RenderPass>>,
    ) -> BackendResult<Self> {
        let supported = backend.supports_multisample(TARGET_FORMAT, samples)
            && backend.supports_multisample(DEPTH_FORMAT, samples);
        let kind = TargetKind::select(pixel_ratio, supported, samples);
        if pixel_ratio == 1.0 && samples > 1 && !supported {
            log::warn!("{}x multisampling unsupported, using a standard target", samples);
        }
        log::info!("Render target: {:?}", kind);

        let (width, height) = backend.surface_size();
        let target = RenderTarget::new(backend, kind, width, height)?;

        let mut pipeline = Self {
            target,
            passes,
            output: OutputPass::new(),
            parameters: Rc::new(RefCell::new(parameters)),
        };
        pipeline.setup_passes(backend)?;
        Ok(pipeline)
    }

    fn setup_passes(&mut self, backend: &mut dyn GraphicsBackend) -> BackendResult<()> {
        let mut ctx = PassSetupContext {
            backend,
            target: &self.target,
        };
        for pass in &mut self.passes {
            log::trace!("Setting up pass {}", pass.name());
            pass.setup(&mut ctx)?;
        }
        self.output.setup(&mut ctx)
    }

    pub fn parameters(&self) -> &SharedParameters {
        &self.parameters
    }

    /// Non-owning handle for editors
    pub fn parameters_handle(&self) -> Weak<RefCell<PipelineParameters>> {
        Rc::downgrade(&self.parameters)
    }

    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    pub fn target_kind(&self) -> TargetKind {
        self.target.kind()
    }

    /// Names of the configurable passes, in execution order
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Resize the target and every pass buffer. Returns `false` and does
    /// nothing when the size is unchanged.
    pub fn resize(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        width: u32,
        height: u32,
    ) -> BackendResult<bool> {
        if !self.target.resize(backend, width, height)? {
            return Ok(false);
        }
        log::debug!("Pipeline resized to {}x{}", width, height);
        self.setup_passes(backend)?;
        Ok(true)
    }

    pub fn render<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        scene: &Scene,
        camera: &Camera,
    ) -> BackendResult<FrameReport> {
        self.render_with_overlay(backend, scene, camera, |_, _| {})
    }

    /// Render a frame and let `overlay` draw on the swapchain before it is
    /// presented.
    pub fn render_with_overlay<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        scene: &Scene,
        camera: &Camera,
        overlay: impl FnOnce(&mut B, &FrameContext),
    ) -> BackendResult<FrameReport> {
        let params = self.parameters.borrow().clone();
        let frame = backend.begin_frame()?;
        let mut report = FrameReport::default();

        {
            let mut ctx = PassExecuteContext {
                backend: &mut *backend,
                scene,
                camera,
                target: &self.target,
                params: &params,
                swapchain_view: frame.swapchain_view,
            };

            for pass in &mut self.passes {
                if !pass.is_enabled(&params) {
                    continue;
                }
                pass.execute(&mut ctx)?;
                report.executed.push(pass.name());
            }

            self.output.execute(&mut ctx)?;
            report.executed.push(self.output.name());
        }

        overlay(backend, &frame);
        backend.end_frame()?;
        Ok(report)
    }

    /// Free every GPU resource the pipeline owns.
    pub fn destroy(mut self, backend: &mut dyn GraphicsBackend) {
        for pass in &mut self.passes {
            pass.release(backend);
        }
        self.output.release(backend);
        self.target.destroy(backend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;

    #[test]
    fn test_default_parameters() {
        let params = PipelineParameters::default();
        assert!(!params.bloom_enabled);
        assert_eq!(params.bloom_strength, 0.3);
        assert_eq!(params.bloom_radius, 1.0);
        assert_eq!(params.bloom_threshold, 0.6);
        assert_eq!(params.clear_color.to_hex(), 0x333333);
    }

    #[test]
    fn test_empty_chain_only_presents() {
        let mut backend = DummyBackend::new(320, 240);
        let mut pipeline = RenderPipeline::with_passes(
            &mut backend,
            1.0,
            4,
            PipelineParameters::default(),
            Vec::new(),
        )
        .unwrap();

        let report = pipeline
            .render(&mut backend, &Scene::new(), &Camera::default())
            .unwrap();
        assert_eq!(report.executed, vec!["Output"]);
    }

    #[test]
    fn test_parameters_snapshot_per_frame() {
        let mut backend = DummyBackend::new(320, 240);
        let mut pipeline =
            RenderPipeline::new(&mut backend, 1.0, 4, PipelineParameters::default()).unwrap();
        let handle = pipeline.parameters_handle();

        let scene = Scene::new();
        let camera = Camera::default();
        assert!(!pipeline.render(&mut backend, &scene, &camera).unwrap().ran("Bloom"));

        if let Some(params) = handle.upgrade() {
            params.borrow_mut().bloom_enabled = true;
        }
        assert!(pipeline.render(&mut backend, &scene, &camera).unwrap().ran("Bloom"));
    }

    #[test]
    fn test_weak_handle_dies_with_pipeline() {
        let mut backend = DummyBackend::new(64, 64);
        let pipeline =
            RenderPipeline::new(&mut backend, 1.0, 4, PipelineParameters::default()).unwrap();
        let handle = pipeline.parameters_handle();
        pipeline.destroy(&mut backend);
        assert!(handle.upgrade().is_none());
    }
}
