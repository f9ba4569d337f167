//! glTF 2.0 scene loading.
//!
//! Reads the default scene (or the first one) into a [`SceneGraph`]. All
//! triangle primitives of a glTF mesh are merged into one [`Mesh`] because
//! materials are assigned per node, never per primitive.

use glam::{Mat4, Vec2, Vec3};
use std::collections::HashMap;
use std::path::Path;

use super::{AssetLoader, AssetManifest, LoadError, LoadedAsset};
use crate::resources::{Mesh, TextureData, Vertex};
use crate::scene::{MeshId, NodeId, SceneGraph, Transform};

/// Extensions this loader can read, matching the `gltf` crate features we
/// enable. Anything else listed as required (notably Draco mesh
/// compression) is rejected before validation.
const SUPPORTED_EXTENSIONS: &[&str] = &["KHR_materials_emissive_strength", "KHR_texture_transform"];

/// Loads the manifest's glTF model and its baked textures from disk.
#[derive(Debug, Default, Clone)]
pub struct GltfLoader;

impl GltfLoader {
    pub fn new() -> Self {
        Self
    }
}

impl AssetLoader for GltfLoader {
    fn load(&self, manifest: &AssetManifest) -> Result<LoadedAsset, LoadError> {
        let graph = load_scene_file(&manifest.model)?;

        let mut textures = HashMap::new();
        for (key, path) in &manifest.textures {
            let data = TextureData::from_file(path).map_err(|source| LoadError::Texture {
                path: path.clone(),
                source,
            })?;
            log::debug!("Loaded texture {} ({}x{})", key.as_str(), data.width, data.height);
            textures.insert(key.clone(), data);
        }

        log::info!(
            "Loaded {} ({} nodes, {} meshes, {} textures)",
            manifest.model.display(),
            graph.len(),
            graph.meshes().len(),
            textures.len()
        );

        Ok(LoadedAsset { graph, textures })
    }
}

/// Load a `.glb`/`.gltf` file. External buffers resolve relative to it.
pub fn load_scene_file(path: &Path) -> Result<SceneGraph, LoadError> {
    let data = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_scene_slice(&data, path.parent(), path)
}

/// Load from bytes. `origin` is only used in error messages.
pub fn load_scene_slice(
    data: &[u8],
    base_dir: Option<&Path>,
    origin: &Path,
) -> Result<SceneGraph, LoadError> {
    let gltf_err = |source| LoadError::Gltf {
        path: origin.to_path_buf(),
        source,
    };

    // Validation would also reject unknown required extensions, but only
    // with a generic error.
    let gltf::Gltf { document, blob } =
        gltf::Gltf::from_slice_without_validation(data).map_err(gltf_err)?;

    if let Some(extension) = document
        .extensions_required()
        .find(|ext| !SUPPORTED_EXTENSIONS.contains(ext))
    {
        return Err(LoadError::UnsupportedExtension {
            path: origin.to_path_buf(),
            extension: extension.to_string(),
        });
    }

    let gltf = gltf::Gltf {
        document: gltf::Document::from_json(document.into_json()).map_err(gltf_err)?,
        blob,
    };

    let buffers =
        gltf::import_buffers(&gltf.document, base_dir, gltf.blob.clone()).map_err(gltf_err)?;

    let scene = gltf
        .document
        .default_scene()
        .or_else(|| gltf.document.scenes().next())
        .ok_or_else(|| LoadError::EmptyScene(origin.to_path_buf()))?;

    let mut ctx = LoadContext {
        buffers: &buffers,
        graph: SceneGraph::new(),
        mesh_map: HashMap::new(),
    };

    for node in scene.nodes() {
        ctx.load_node(&node, None)?;
    }

    Ok(ctx.graph)
}

struct LoadContext<'a> {
    buffers: &'a [gltf::buffer::Data],
    graph: SceneGraph,
    /// glTF mesh index → merged mesh, shared by every node instancing it
    mesh_map: HashMap<usize, Option<MeshId>>,
}

impl LoadContext<'_> {
    fn load_node(&mut self, node: &gltf::Node<'_>, parent: Option<NodeId>) -> Result<(), LoadError> {
        let name = node.name().unwrap_or_default();
        let transform = Transform::from_matrix(Mat4::from_cols_array_2d(&node.transform().matrix()));
        let mesh = match node.mesh() {
            Some(mesh) => self.load_mesh(&mesh)?,
            None => None,
        };

        let id = match parent {
            Some(parent) => self.graph.add_child(parent, name, mesh, transform),
            None => self.graph.add_root(name, mesh, transform),
        };

        for child in node.children() {
            self.load_node(&child, Some(id))?;
        }
        Ok(())
    }

    fn load_mesh(&mut self, mesh: &gltf::Mesh<'_>) -> Result<Option<MeshId>, LoadError> {
        if let Some(id) = self.mesh_map.get(&mesh.index()) {
            return Ok(*id);
        }

        let name = mesh.name().unwrap_or_default();
        let buffers = self.buffers;
        let mut merged = Mesh::new(name);

        for (index, primitive) in mesh.primitives().enumerate() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "Skipping {:?} primitive {} of mesh '{}'",
                    primitive.mode(),
                    index,
                    name
                );
                continue;
            }

            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d[..]));

            let positions: Vec<Vec3> = reader
                .read_positions()
                .ok_or_else(|| LoadError::MissingPositions {
                    mesh: name.to_string(),
                    primitive: index,
                })?
                .map(Vec3::from)
                .collect();
            let normals: Vec<Vec3> = reader
                .read_normals()
                .map(|iter| iter.map(Vec3::from).collect())
                .unwrap_or_default();
            let uvs: Vec<Vec2> = reader
                .read_tex_coords(0)
                .map(|iter| iter.into_f32().map(Vec2::from).collect())
                .unwrap_or_default();

            let vertices: Vec<Vertex> = positions
                .iter()
                .enumerate()
                .map(|(i, position)| {
                    Vertex::new(
                        *position,
                        normals.get(i).copied().unwrap_or(Vec3::Y),
                        uvs.get(i).copied().unwrap_or(Vec2::ZERO),
                    )
                })
                .collect();

            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..vertices.len() as u32).collect(),
            };

            merged.append(&vertices, &indices);
        }

        let id = if merged.is_empty() {
            None
        } else {
            Some(self.graph.add_mesh(merged))
        };
        self.mesh_map.insert(mesh.index(), id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const TRIANGLE_GLTF: &str = r#"{
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0, 1]}],
        "nodes": [
            {"name": "building", "mesh": 0, "children": [2]},
            {"name": "MainWindow", "mesh": 0, "translation": [1.0, 0.0, 0.0]},
            {"name": "Inner", "mesh": 0}
        ],
        "meshes": [{"name": "tri", "primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}],
        "buffers": [{"uri": "tri.bin", "byteLength": 44}],
        "bufferViews": [
            {"buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962},
            {"buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963}
        ],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
             "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
            {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}
        ]
    }"#;

    fn triangle_bin() -> Vec<u8> {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let indices: [u16; 3] = [0, 1, 2];
        let mut bytes = bytemuck::cast_slice::<f32, u8>(&positions).to_vec();
        bytes.extend_from_slice(bytemuck::cast_slice(&indices));
        bytes.resize(44, 0);
        bytes
    }

    fn fixture_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cafe-viewer-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("tri.bin"), triangle_bin()).unwrap();
        std::fs::write(dir.join("tri.gltf"), TRIANGLE_GLTF).unwrap();
        dir
    }

    #[test]
    fn test_loads_hierarchy_and_shares_meshes() {
        let dir = fixture_dir("hierarchy");
        let graph = load_scene_file(&dir.join("tri.gltf")).unwrap();

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.roots().len(), 2);
        assert_eq!(graph.meshes().len(), 1);
        assert_eq!(graph.meshes()[0].triangle_count(), 1);

        let building = graph.find_top_level("building").unwrap();
        assert_eq!(graph.node(building).children.len(), 1);
        assert!(graph.find_top_level("Inner").is_none());

        let window = graph.find_top_level("MainWindow").unwrap();
        assert_eq!(graph.node(window).transform.position, Vec3::X);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_scene_file(Path::new("/nonexistent/cafe.glb")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_required_compression_extension_is_rejected() {
        let json = r#"{
            "asset": {"version": "2.0"},
            "extensionsUsed": ["KHR_draco_mesh_compression"],
            "extensionsRequired": ["KHR_draco_mesh_compression"],
            "scenes": [{"nodes": []}]
        }"#;
        let err = load_scene_slice(json.as_bytes(), None, Path::new("cafe.glb")).unwrap_err();
        match err {
            LoadError::UnsupportedExtension { extension, .. } => {
                assert_eq!(extension, "KHR_draco_mesh_compression");
            }
            other => panic!("expected UnsupportedExtension, got {other:?}"),
        }
    }

    #[test]
    fn test_supported_required_extensions_load() {
        for extension in SUPPORTED_EXTENSIONS {
            let json = format!(
                r#"{{
                    "asset": {{"version": "2.0"}},
                    "extensionsUsed": ["{extension}"],
                    "extensionsRequired": ["{extension}"],
                    "scenes": [{{"nodes": []}}]
                }}"#
            );
            let graph = load_scene_slice(json.as_bytes(), None, Path::new("cafe.glb")).unwrap();
            assert_eq!(graph.len(), 0);
        }
    }

    #[test]
    fn test_invalid_document_still_fails_validation() {
        let json = r#"{
            "asset": {"version": "2.0"},
            "scenes": [{"nodes": [7]}]
        }"#;
        let result = load_scene_slice(json.as_bytes(), None, Path::new("broken.gltf"));
        assert!(matches!(result, Err(LoadError::Gltf { .. })));
    }

    #[test]
    fn test_document_without_scenes_is_empty() {
        let json = r#"{"asset": {"version": "2.0"}}"#;
        let result = load_scene_slice(json.as_bytes(), None, Path::new("empty.gltf"));
        assert!(matches!(result, Err(LoadError::EmptyScene(_))));
    }
}
