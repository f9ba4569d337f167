//! Café viewer - a baked-lighting scene viewer on wgpu
//!
//! Loads a glTF café model, binds a fixed set of unlit materials onto its
//! named nodes and draws it from a damped orbit camera, optionally with a
//! bloom pass.
//!
//! # Features
//! - Name-based material binding with a strict or skip-missing policy
//! - Multi-pass pipeline with multisampled target selection and bloom
//! - Background asset loading; the viewer renders an empty scene until it
//!   arrives
//! - egui debug panel bound to the live pipeline parameters
//! - GPU-less [`backend::dummy::DummyBackend`] for tests

pub mod asset;
pub mod backend;
pub mod binder;
pub mod cafe;
pub mod debug_panel;
pub mod egui_integration;
pub mod frame;
pub mod pipeline;
pub mod resources;
pub mod scene;
pub mod viewer;
pub mod window;

use glam::Vec3;
use std::path::PathBuf;

pub use asset::{AssetLoader, AssetManifest, GltfLoader, LoadError, LoadedAsset, PendingLoad};
pub use binder::{bind, BindError, BindPolicy, BindReport, BindingTable};
pub use debug_panel::DebugPanel;
pub use egui_integration::WgpuEguiIntegration;
pub use frame::{DriverState, FrameDriver, FrameHandler, FrameHost, FrameStats};
pub use pipeline::{FrameReport, PipelineParameters, RenderPipeline, SharedParameters, TargetKind};
pub use viewer::{effective_pixel_ratio, Viewer, ViewerError};
pub use window::{PointerTracker, WindowHost};

// Re-export wgpu backend for direct access
pub use backend::wgpu_backend::WgpuBackend;

/// Initial camera placement and projection
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 45.0,
            near: 0.1,
            far: 100.0,
            position: Vec3::new(12.0, 8.0, 16.0),
            target: Vec3::ZERO,
        }
    }
}

impl CameraConfig {
    pub fn camera(&self, aspect: f32) -> scene::Camera {
        scene::Camera::new(
            self.position,
            self.target,
            scene::Projection::perspective(self.fov_y_degrees, aspect, self.near, self.far),
        )
    }
}

/// Configuration for the viewer
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Enable vsync
    pub vsync: bool,
    /// Directory holding the model and its textures
    pub asset_dir: PathBuf,
    /// Model file name inside `asset_dir`
    pub model: String,
    pub camera: CameraConfig,
    /// Orbit damping per frame (0 disables inertia)
    pub damping_factor: f32,
    /// Initial pipeline parameters
    pub parameters: PipelineParameters,
    pub bind_policy: BindPolicy,
    /// Sample count when a multisampled target is selected
    pub msaa_samples: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Café".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
            asset_dir: PathBuf::from("assets"),
            model: cafe::MODEL_FILE.to_string(),
            camera: CameraConfig::default(),
            damping_factor: 0.05,
            parameters: PipelineParameters::default(),
            bind_policy: BindPolicy::default(),
            msaa_samples: 4,
        }
    }
}

impl ViewerConfig {
    pub fn with_asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.asset_dir = dir.into();
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn with_bind_policy(mut self, policy: BindPolicy) -> Self {
        self.bind_policy = policy;
        self
    }

    pub fn with_bloom(mut self, enabled: bool) -> Self {
        self.parameters.bloom_enabled = enabled;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Absolute paths of every file the scene needs
    pub fn manifest(&self) -> AssetManifest {
        cafe::manifest(&self.model).resolve(&self.asset_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_scene() {
        let config = ViewerConfig::default();
        assert_eq!(config.camera.fov_y_degrees, 45.0);
        assert_eq!(config.camera.position, Vec3::new(12.0, 8.0, 16.0));
        assert_eq!(config.damping_factor, 0.05);
        assert_eq!(config.bind_policy, BindPolicy::SkipMissing);
        assert!(!config.parameters.bloom_enabled);
    }

    #[test]
    fn test_manifest_resolves_in_asset_dir() {
        let manifest = ViewerConfig::default()
            .with_asset_dir("/data/cafe")
            .manifest();
        assert_eq!(manifest.model, PathBuf::from("/data/cafe/cafe.glb"));
        assert_eq!(manifest.textures.len(), 2);
        assert!(manifest
            .textures
            .iter()
            .all(|(_, path)| path.starts_with("/data/cafe")));
    }
}
