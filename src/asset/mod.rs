//! Scene asset loading
//!
//! Loading runs off the frame loop. [`PendingLoad::spawn`] moves the work to
//! a background thread and the viewer polls it once per frame, so the
//! render loop keeps drawing (an empty scene) while the model decodes.

mod error;
mod gltf_loader;

pub use error::LoadError;
pub use gltf_loader::{load_scene_file, load_scene_slice, GltfLoader};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use crate::resources::{TextureData, TextureKey};
use crate::scene::SceneGraph;

/// Files that make up one scene: the model plus the textures its
/// materials reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetManifest {
    pub model: PathBuf,
    pub textures: Vec<(TextureKey, PathBuf)>,
}

impl AssetManifest {
    pub fn new(model: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            textures: Vec::new(),
        }
    }

    pub fn with_texture(mut self, key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.textures.push((TextureKey::new(key), path.into()));
        self
    }

    /// Resolve relative paths against `dir`. Absolute paths are kept.
    pub fn resolve(&self, dir: &Path) -> Self {
        Self {
            model: dir.join(&self.model),
            textures: self
                .textures
                .iter()
                .map(|(key, path)| (key.clone(), dir.join(path)))
                .collect(),
        }
    }
}

/// Everything a successful load produces
#[derive(Debug, Default)]
pub struct LoadedAsset {
    pub graph: SceneGraph,
    pub textures: HashMap<TextureKey, TextureData>,
}

/// Source of scene content
pub trait AssetLoader: Send + Sync {
    fn load(&self, manifest: &AssetManifest) -> Result<LoadedAsset, LoadError>;
}

/// A load in flight. Delivers its result exactly once.
pub struct PendingLoad {
    rx: Option<mpsc::Receiver<Result<LoadedAsset, LoadError>>>,
}

impl PendingLoad {
    /// Run `loader` on a background thread.
    pub fn spawn(loader: Arc<dyn AssetLoader>, manifest: AssetManifest) -> Self {
        let (tx, rx) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name("asset-loader".into())
            .spawn(move || {
                log::info!("Loading {}", manifest.model.display());
                let result = loader.load(&manifest);
                // The receiver may be gone if the viewer shut down first
                let _ = tx.send(result);
            });

        if let Err(e) = spawned {
            log::error!("Failed to spawn loader thread: {}", e);
        }

        Self { rx: Some(rx) }
    }

    /// A load that has already finished.
    pub fn ready(result: Result<LoadedAsset, LoadError>) -> Self {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(result);
        Self { rx: Some(rx) }
    }

    /// Non-blocking. Returns `Some` the first time a result is available
    /// and `None` before and after.
    pub fn poll(&mut self) -> Option<Result<LoadedAsset, LoadError>> {
        let rx = self.rx.as_ref()?;
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(mpsc::TryRecvError::Empty) => return None,
            Err(mpsc::TryRecvError::Disconnected) => Err(LoadError::LoaderDisconnected),
        };
        self.rx = None;
        Some(result)
    }

    /// Whether the result has been taken
    pub fn is_finished(&self) -> bool {
        self.rx.is_none()
    }

    /// Block until the result arrives.
    pub fn wait(mut self) -> Result<LoadedAsset, LoadError> {
        match self.rx.take() {
            Some(rx) => rx.recv().unwrap_or(Err(LoadError::LoaderDisconnected)),
            None => Err(LoadError::LoaderDisconnected),
        }
    }
}

impl std::fmt::Debug for PendingLoad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingLoad")
            .field("finished", &self.is_finished())
            .finish()
    }
}
