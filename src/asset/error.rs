//! Error types for asset loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading the scene asset.
///
/// A load error leaves the viewer running with an empty scene.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid glTF in {}: {source}", path.display())]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },
    #[error("{} requires unsupported extension {extension}; decompress the asset offline", path.display())]
    UnsupportedExtension { path: PathBuf, extension: String },
    #[error("mesh '{mesh}' primitive {primitive} has no POSITION attribute")]
    MissingPositions { mesh: String, primitive: usize },
    #[error("failed to decode texture {}: {source}", path.display())]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{} contains no scene", .0.display())]
    EmptyScene(PathBuf),
    #[error("loader thread stopped before delivering a result")]
    LoaderDisconnected,
}
