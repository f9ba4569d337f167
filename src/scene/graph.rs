//! Scene graph produced by the asset loader
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. The
//! top-level children of the scene are its roots; only they are reachable
//! through [`SceneGraph::find_top_level`].

use glam::Mat4;
use std::collections::HashMap;
use std::sync::Arc;

use super::Transform;
use crate::resources::{MaterialDescriptor, Mesh};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub(crate) usize);

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub mesh: Option<MeshId>,
    pub transform: Transform,
    /// Assigned after load by the binder
    pub material: Option<Arc<MaterialDescriptor>>,
    pub children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl SceneNode {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// A node ready to draw: mesh, world matrix and material
#[derive(Debug, Clone)]
pub struct DrawItem {
    pub node: NodeId,
    pub mesh: MeshId,
    pub world: Mat4,
    pub material: Option<Arc<MaterialDescriptor>>,
}

#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    roots: Vec<NodeId>,
    meshes: Vec<Mesh>,
    /// Top-level name → first root carrying it
    name_index: HashMap<String, NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        let id = MeshId(self.meshes.len());
        self.meshes.push(mesh);
        id
    }

    /// Add a top-level child of the scene.
    pub fn add_root(&mut self, name: &str, mesh: Option<MeshId>, transform: Transform) -> NodeId {
        let id = self.push_node(name, mesh, transform, None);
        self.roots.push(id);
        self.name_index.entry(name.to_string()).or_insert(id);
        id
    }

    /// Add a child under `parent`.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: &str,
        mesh: Option<MeshId>,
        transform: Transform,
    ) -> NodeId {
        let id = self.push_node(name, mesh, transform, Some(parent));
        self.nodes[parent.0].children.push(id);
        id
    }

    fn push_node(
        &mut self,
        name: &str,
        mesh: Option<MeshId>,
        transform: Transform,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            name: name.to_string(),
            mesh,
            transform,
            material: None,
            children: Vec::new(),
            parent,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id.0]
    }

    pub fn mesh(&self, id: MeshId) -> &Mesh {
        &self.meshes[id.0]
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// First top-level child named exactly `name`. Nested nodes are not
    /// considered even when they carry the same name.
    pub fn find_top_level(&self, name: &str) -> Option<NodeId> {
        self.name_index.get(name).copied()
    }

    /// Every node, depth-first pre-order from the roots.
    pub fn traverse(&self) -> Traverse<'_> {
        Traverse {
            graph: self,
            stack: self.roots.iter().rev().copied().collect(),
        }
    }

    /// Set the material of every node.
    pub fn assign_all(&mut self, material: &Arc<MaterialDescriptor>) {
        for node in &mut self.nodes {
            node.material = Some(material.clone());
        }
    }

    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let node = self.node(id);
        let local = node.transform.matrix();
        match node.parent {
            Some(parent) => self.world_matrix(parent) * local,
            None => local,
        }
    }

    /// Nodes with geometry, in traversal order.
    pub fn draw_items(&self) -> Vec<DrawItem> {
        let mut items = Vec::new();
        let mut stack: Vec<(NodeId, Mat4)> =
            self.roots.iter().rev().map(|id| (*id, Mat4::IDENTITY)).collect();
        while let Some((id, parent_world)) = stack.pop() {
            let node = self.node(id);
            let world = parent_world * node.transform.matrix();
            if let Some(mesh) = node.mesh {
                items.push(DrawItem {
                    node: id,
                    mesh,
                    world,
                    material: node.material.clone(),
                });
            }
            stack.extend(node.children.iter().rev().map(|c| (*c, world)));
        }
        items
    }
}

pub struct Traverse<'a> {
    graph: &'a SceneGraph,
    stack: Vec<NodeId>,
}

impl Iterator for Traverse<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.graph.node(id).children.iter().rev().copied());
        Some(id)
    }
}
