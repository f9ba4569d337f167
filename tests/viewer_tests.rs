//! Viewer integration tests on the dummy backend.
//!
//! These drive the whole viewer (binding, pipeline, resize and frame loop)
//! without a GPU by asserting on the calls the dummy backend records.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rstest::rstest;

use cafe_viewer::asset::{AssetLoader, AssetManifest, LoadError, LoadedAsset};
use cafe_viewer::backend::dummy::{BackendEvent, DummyBackend};
use cafe_viewer::backend::traits::GraphicsBackend;
use cafe_viewer::cafe;
use cafe_viewer::debug_panel::{DebugPanel, ParameterEdit};
use cafe_viewer::resources::{MaterialRole, Mesh, TextureData, TextureKey};
use cafe_viewer::scene::{SceneGraph, Transform};
use cafe_viewer::{
    effective_pixel_ratio, BindError, BindPolicy, FrameDriver, FrameHost, TargetKind, Viewer,
    ViewerConfig,
};

/// Top-level nodes named like the café model, plus one the table does not name
fn cafe_like_asset() -> LoadedAsset {
    let mut graph = SceneGraph::new();
    let cube = graph.add_mesh(Mesh::cube());
    for name in ["building", "MainWindow", "chair"] {
        graph.add_root(name, Some(cube), Transform::default());
    }

    let mut textures = HashMap::new();
    textures.insert(TextureKey::new(cafe::BAKED_TEXTURE), TextureData::white());
    textures.insert(TextureKey::new(cafe::BUILDING_TEXTURE), TextureData::white());

    LoadedAsset { graph, textures }
}

fn viewer(config: &ViewerConfig) -> Viewer<DummyBackend> {
    Viewer::new(DummyBackend::new(640, 480), config, 1.0).unwrap()
}

fn role_of(viewer: &Viewer<DummyBackend>, name: &str) -> Option<MaterialRole> {
    let graph = viewer.scene().graph()?;
    let node = graph.find_top_level(name)?;
    graph.node(node).material.as_ref().map(|m| m.role)
}

struct CountingHost {
    requests: Cell<u32>,
}

impl FrameHost for CountingHost {
    fn request_frame(&self) {
        self.requests.set(self.requests.get() + 1);
    }
}

struct StaticLoader;

impl AssetLoader for StaticLoader {
    fn load(&self, _manifest: &AssetManifest) -> Result<LoadedAsset, LoadError> {
        Ok(cafe_like_asset())
    }
}

#[test]
fn test_skip_missing_binds_present_nodes() {
    let mut viewer = viewer(&ViewerConfig::default());
    let report = viewer.install_asset(cafe_like_asset()).unwrap();

    assert_eq!(report.bound, 2);
    assert_eq!(report.skipped.len(), cafe::binding_table().len() - 2);
    assert!(report
        .skipped
        .contains(&BindError::MissingNode("Stairs".to_string())));

    assert_eq!(role_of(&viewer, "building"), Some(MaterialRole::BuildingAndStairs));
    assert_eq!(role_of(&viewer, "MainWindow"), Some(MaterialRole::EmissiveWindow));
    assert_eq!(role_of(&viewer, "chair"), Some(MaterialRole::Baked));
}

#[test]
fn test_strict_binding_rejects_incomplete_model() {
    let config = ViewerConfig::default().with_bind_policy(BindPolicy::Strict);
    let mut viewer = viewer(&config);

    let err = viewer.install_asset(cafe_like_asset()).unwrap_err();
    assert!(matches!(err, BindError::MissingNode(_)));
    assert!(!viewer.scene().is_loaded());
}

#[test]
fn test_loaded_scene_is_drawn() {
    let mut viewer = viewer(&ViewerConfig::default());
    viewer.install_asset(cafe_like_asset()).unwrap();
    viewer.backend_mut().clear_events();

    viewer.render().unwrap();

    let draws = viewer
        .backend()
        .events()
        .iter()
        .filter(|e| matches!(e, BackendEvent::DrawIndexed { .. }))
        .count();
    assert_eq!(draws, 3);
    assert_eq!(viewer.backend().pass_labels(), ["Scene Pass", "Output Pass"]);
}

#[test]
fn test_bloom_follows_panel_toggle() {
    let mut viewer = viewer(&ViewerConfig::default());
    let panel = DebugPanel::new(viewer.pipeline().parameters_handle());

    viewer.render().unwrap();
    assert!(!viewer
        .backend()
        .pass_labels()
        .iter()
        .any(|label| label.starts_with("Bloom")));

    assert!(panel.apply(ParameterEdit::BloomEnabled(true)));
    viewer.backend_mut().clear_events();
    let report = viewer.render().unwrap();

    assert!(report.ran("Bloom"));
    assert_eq!(
        viewer.backend().pass_labels(),
        [
            "Scene Pass",
            "Bloom Extract",
            "Bloom Blur H",
            "Bloom Blur V",
            "Bloom Composite",
            "Output Pass"
        ]
    );
}

#[test]
fn test_resize_updates_camera_then_surface_then_target() {
    let mut viewer = viewer(&ViewerConfig::default());
    viewer.backend_mut().clear_events();

    assert!(viewer.resize(800, 400, 1.0).unwrap());
    let camera = viewer.camera();
    assert!((camera.projection.aspect - 2.0).abs() < 1e-6);
    assert_eq!(camera.projection_matrix(), camera.projection.matrix());

    let events = viewer.backend().events();
    let resize_at = events
        .iter()
        .position(|e| matches!(e, BackendEvent::Resize { width: 800, height: 400 }))
        .unwrap();
    let target_at = events
        .iter()
        .position(|e| {
            matches!(e, BackendEvent::CreateTexture { label: Some(l), width: 800, height: 400, .. } if l == "Target Color")
        })
        .unwrap();
    assert!(resize_at < target_at);
    assert_eq!(viewer.pipeline().target().size(), (800, 400));
}

#[test]
fn test_repeated_resize_is_noop() {
    let mut viewer = viewer(&ViewerConfig::default());
    assert!(viewer.resize(800, 600, 1.0).unwrap());
    viewer.backend_mut().clear_events();

    assert!(!viewer.resize(800, 600, 1.0).unwrap());
    assert!(!viewer.resize(0, 600, 1.0).unwrap());
    assert!(viewer.backend().events().is_empty());
}

#[test]
fn test_resizes_and_reinstalls_do_not_grow_live_resources() {
    let mut viewer = viewer(&ViewerConfig::default());
    let panel = DebugPanel::new(viewer.pipeline().parameters_handle());
    assert!(panel.apply(ParameterEdit::BloomEnabled(true)));
    viewer.install_asset(cafe_like_asset()).unwrap();
    viewer.render().unwrap();

    let bind_groups = viewer.backend().live_bind_group_count();
    let textures = viewer.backend().live_texture_count();

    for step in 1..=50 {
        viewer.resize(640 + step, 480 + step / 2, 1.0).unwrap();
        viewer.render().unwrap();
    }
    for _ in 0..5 {
        viewer.install_asset(cafe_like_asset()).unwrap();
        viewer.render().unwrap();
    }

    assert_eq!(viewer.backend().live_bind_group_count(), bind_groups);
    assert_eq!(viewer.backend().live_texture_count(), textures);
}

#[test]
fn test_surface_uses_clamped_pixel_ratio() {
    let mut viewer = Viewer::new(DummyBackend::new(640, 480), &ViewerConfig::default(), 3.0).unwrap();
    viewer.resize(500, 300, 3.0).unwrap();

    assert_eq!(viewer.backend().surface_size(), (1000, 600));
    assert_eq!(viewer.pipeline().target().size(), (1000, 600));
}

#[rstest]
#[case(1.0, true, TargetKind::Multisampled { samples: 4 })]
#[case(2.0, true, TargetKind::Standard)]
#[case(1.5, true, TargetKind::Standard)]
#[case(1.0, false, TargetKind::Standard)]
fn test_target_kind_selection(
    #[case] pixel_ratio: f32,
    #[case] multisample: bool,
    #[case] expected: TargetKind,
) {
    let backend = if multisample {
        DummyBackend::new(320, 240)
    } else {
        DummyBackend::new(320, 240).without_multisample()
    };
    let mut viewer = Viewer::new(backend, &ViewerConfig::default(), pixel_ratio).unwrap();
    assert_eq!(viewer.pipeline().target_kind(), expected);

    viewer.backend_mut().clear_events();
    viewer.render().unwrap();
    let scene_pass_resolves = viewer.backend().events().iter().any(|e| {
        matches!(e, BackendEvent::BeginRenderPass { label: Some(l), resolves: true, .. } if l == "Scene Pass")
    });
    assert_eq!(scene_pass_resolves, expected != TargetKind::Standard);
}

#[rstest]
#[case(0.5, 0.5)]
#[case(1.0, 1.0)]
#[case(2.0, 2.0)]
#[case(2.625, 2.0)]
#[case(-1.0, 1.0)]
fn test_pixel_ratio_is_clamped(#[case] ratio: f32, #[case] expected: f32) {
    assert_eq!(effective_pixel_ratio(ratio), expected);
}

#[test]
fn test_frame_driver_renders_each_tick() {
    let mut viewer = viewer(&ViewerConfig::default());
    let host = CountingHost {
        requests: Cell::new(0),
    };
    let mut driver = FrameDriver::new();

    let start = Instant::now();
    driver.tick(start, &mut viewer, &host).unwrap();
    assert_eq!(host.requests.get(), 0);

    driver.start(&host);
    for frame in 1..=3 {
        driver
            .tick(start + Duration::from_millis(16 * frame), &mut viewer, &host)
            .unwrap();
    }

    let frames = viewer
        .backend()
        .events()
        .iter()
        .filter(|e| matches!(e, BackendEvent::EndFrame))
        .count();
    assert_eq!(frames, 3);
    assert_eq!(host.requests.get(), 4);
    assert_eq!(driver.stats().frame_count(), 3);
}

#[test]
fn test_background_load_installs_scene() {
    let mut viewer = viewer(&ViewerConfig::default());
    viewer.start_loading(Arc::new(StaticLoader), ViewerConfig::default().manifest());
    assert!(viewer.is_loading());

    let deadline = Instant::now() + Duration::from_secs(5);
    while !viewer.poll_load().unwrap() {
        assert!(Instant::now() < deadline, "load never finished");
        std::thread::sleep(Duration::from_millis(1));
    }

    assert!(!viewer.is_loading());
    assert!(viewer.scene().is_loaded());
    assert_eq!(role_of(&viewer, "chair"), Some(MaterialRole::Baked));
}
