//! Scene management

mod camera;
mod graph;
mod orbit;
mod transform;

pub use camera::*;
pub use graph::*;
pub use orbit::*;
pub use transform::*;

use std::collections::HashMap;

use crate::resources::{TextureData, TextureKey};

/// The content the pipeline draws
///
/// Until an asset is installed the scene has no graph, which is a valid
/// state: the pipeline renders it as a cleared frame.
#[derive(Debug, Default)]
pub struct Scene {
    graph: Option<SceneGraph>,
    textures: HashMap<TextureKey, TextureData>,
    revision: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the scene content. Bumps the revision so GPU copies are
    /// rebuilt on the next frame.
    pub fn install(&mut self, graph: SceneGraph, textures: HashMap<TextureKey, TextureData>) {
        self.graph = Some(graph);
        self.textures = textures;
        self.revision += 1;
    }

    pub fn clear(&mut self) {
        self.graph = None;
        self.textures.clear();
        self.revision += 1;
    }

    pub fn is_loaded(&self) -> bool {
        self.graph.is_some()
    }

    pub fn graph(&self) -> Option<&SceneGraph> {
        self.graph.as_ref()
    }

    pub fn texture(&self, key: &TextureKey) -> Option<&TextureData> {
        self.textures.get(key)
    }

    pub fn textures(&self) -> impl Iterator<Item = (&TextureKey, &TextureData)> {
        self.textures.iter()
    }

    /// Changes whenever the content is replaced
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_bumps_revision() {
        let mut scene = Scene::new();
        assert!(!scene.is_loaded());
        let start = scene.revision();

        scene.install(SceneGraph::new(), HashMap::new());
        assert!(scene.is_loaded());
        assert_eq!(scene.revision(), start + 1);

        scene.clear();
        assert!(!scene.is_loaded());
        assert_eq!(scene.revision(), start + 2);
    }
}
