//! Assigns registry materials onto named scene nodes after load.
//!
//! Every node first receives the default material. The binding table then
//! overrides individual top-level nodes by exact name, in table order, so a
//! later entry for the same name wins. Running the same bind twice gives the
//! same assignment as running it once.

use std::sync::Arc;
use thiserror::Error;

use crate::resources::{MaterialDescriptor, MaterialRegistry, MaterialRole};
use crate::scene::{NodeId, SceneGraph};

/// Errors that can occur while binding materials
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("no top-level node named '{0}'")]
    MissingNode(String),
    #[error("material role '{0}' is not registered")]
    UnknownRole(MaterialRole),
}

/// What to do when a table entry names a node the asset lacks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BindPolicy {
    /// Validate the whole table first and fail without touching the graph
    Strict,
    /// Bind what is present; report the rest
    #[default]
    SkipMissing,
}

/// Ordered node name → role overrides
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingTable {
    entries: Vec<(String, MaterialRole)>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, MaterialRole)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(name, role)| (name.to_string(), role))
                .collect(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, role: MaterialRole) {
        self.entries.push((name.into(), role));
    }

    pub fn with(mut self, name: impl Into<String>, role: MaterialRole) -> Self {
        self.push(name, role);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, MaterialRole)> {
        self.entries.iter().map(|(name, role)| (name.as_str(), *role))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of a successful bind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindReport {
    /// Number of overrides applied
    pub bound: usize,
    /// Entries that could not be applied under [`BindPolicy::SkipMissing`]
    pub skipped: Vec<BindError>,
}

impl BindReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Bind `table` onto `graph`, using `default_role` for every node not named
/// in the table.
pub fn bind(
    graph: &mut SceneGraph,
    table: &BindingTable,
    registry: &MaterialRegistry,
    default_role: MaterialRole,
    policy: BindPolicy,
) -> Result<BindReport, BindError> {
    let default = registry
        .get(default_role)
        .ok_or(BindError::UnknownRole(default_role))?
        .clone();

    // Resolve everything before mutating so a strict failure leaves the
    // graph as it was.
    let mut resolved: Vec<(NodeId, Arc<MaterialDescriptor>)> = Vec::with_capacity(table.len());
    let mut skipped = Vec::new();

    for (name, role) in table.iter() {
        let material = registry.get(role).ok_or(BindError::UnknownRole(role))?;

        match graph.find_top_level(name) {
            Some(node) => resolved.push((node, material.clone())),
            None => {
                let err = BindError::MissingNode(name.to_string());
                match policy {
                    BindPolicy::Strict => return Err(err),
                    BindPolicy::SkipMissing => {
                        log::warn!("Skipping material '{}': {}", role, err);
                        skipped.push(err);
                    }
                }
            }
        }
    }

    graph.assign_all(&default);
    for (node, material) in &resolved {
        graph.node_mut(*node).material = Some(material.clone());
    }

    log::debug!(
        "Bound {} of {} materials over {} nodes",
        resolved.len(),
        table.len(),
        graph.len()
    );

    Ok(BindReport {
        bound: resolved.len(),
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Color;
    use crate::scene::Transform;

    fn registry() -> MaterialRegistry {
        MaterialRegistry::new()
            .with(MaterialDescriptor::textured(MaterialRole::Baked, "baked"))
            .with(MaterialDescriptor::flat(MaterialRole::EmissiveWhite, Color::WHITE))
            .with(MaterialDescriptor::flat(
                MaterialRole::EmissiveWindow,
                Color::from_hex(0x04AAC0),
            ))
    }

    fn graph(names: &[&str]) -> SceneGraph {
        let mut graph = SceneGraph::new();
        for name in names {
            graph.add_root(name, None, Transform::default());
        }
        graph
    }

    fn role_of(graph: &SceneGraph, name: &str) -> Option<MaterialRole> {
        let id = graph.find_top_level(name)?;
        graph.node(id).material.as_ref().map(|m| m.role)
    }

    #[test]
    fn test_overrides_named_nodes_and_defaults_the_rest() {
        let mut g = graph(&["building", "LobbyLightPillar", "MainWindow"]);
        let table = BindingTable::new()
            .with("LobbyLightPillar", MaterialRole::EmissiveWhite)
            .with("MainWindow", MaterialRole::EmissiveWindow);

        let report = bind(&mut g, &table, &registry(), MaterialRole::Baked, BindPolicy::Strict).unwrap();

        assert_eq!(report.bound, 2);
        assert!(report.is_complete());
        assert_eq!(role_of(&g, "building"), Some(MaterialRole::Baked));
        assert_eq!(role_of(&g, "LobbyLightPillar"), Some(MaterialRole::EmissiveWhite));
        assert_eq!(role_of(&g, "MainWindow"), Some(MaterialRole::EmissiveWindow));
    }

    #[test]
    fn test_shares_one_descriptor_per_role() {
        let reg = registry();
        let mut g = graph(&["a", "b"]);
        bind(&mut g, &BindingTable::new(), &reg, MaterialRole::Baked, BindPolicy::Strict).unwrap();

        let baked = reg.get(MaterialRole::Baked).unwrap();
        for id in g.traverse() {
            assert!(Arc::ptr_eq(g.node(id).material.as_ref().unwrap(), baked));
        }
    }

    #[test]
    fn test_strict_missing_node_leaves_graph_untouched() {
        let mut g = graph(&["building"]);
        let table = BindingTable::new()
            .with("building", MaterialRole::EmissiveWhite)
            .with("Missing", MaterialRole::EmissiveWindow);

        let err = bind(&mut g, &table, &registry(), MaterialRole::Baked, BindPolicy::Strict).unwrap_err();

        assert_eq!(err, BindError::MissingNode("Missing".into()));
        assert_eq!(role_of(&g, "building"), None);
    }

    #[test]
    fn test_skip_missing_binds_the_rest() {
        let mut g = graph(&["building", "MainWindow"]);
        let table = BindingTable::new()
            .with("Missing", MaterialRole::EmissiveWhite)
            .with("MainWindow", MaterialRole::EmissiveWindow);

        let report =
            bind(&mut g, &table, &registry(), MaterialRole::Baked, BindPolicy::SkipMissing).unwrap();

        assert_eq!(report.bound, 1);
        assert_eq!(report.skipped, vec![BindError::MissingNode("Missing".into())]);
        assert_eq!(role_of(&g, "MainWindow"), Some(MaterialRole::EmissiveWindow));
        assert_eq!(role_of(&g, "building"), Some(MaterialRole::Baked));
    }

    #[test]
    fn test_later_entry_wins() {
        let mut g = graph(&["MainWindow"]);
        let table = BindingTable::new()
            .with("MainWindow", MaterialRole::EmissiveWhite)
            .with("MainWindow", MaterialRole::EmissiveWindow);

        bind(&mut g, &table, &registry(), MaterialRole::Baked, BindPolicy::Strict).unwrap();
        assert_eq!(role_of(&g, "MainWindow"), Some(MaterialRole::EmissiveWindow));
    }

    #[test]
    fn test_nested_nodes_get_default_only() {
        let mut g = SceneGraph::new();
        let parent = g.add_root("parent", None, Transform::default());
        let nested = g.add_child(parent, "MainWindow", None, Transform::default());
        let table = BindingTable::new().with("MainWindow", MaterialRole::EmissiveWindow);

        let report =
            bind(&mut g, &table, &registry(), MaterialRole::Baked, BindPolicy::SkipMissing).unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(g.node(nested).material.as_ref().unwrap().role, MaterialRole::Baked);
    }

    #[test]
    fn test_bind_is_idempotent() {
        let mut once = graph(&["building", "LobbyLightPillar"]);
        let table = BindingTable::new().with("LobbyLightPillar", MaterialRole::EmissiveWhite);
        let reg = registry();

        bind(&mut once, &table, &reg, MaterialRole::Baked, BindPolicy::Strict).unwrap();
        let first: Vec<_> = once.traverse().map(|id| once.node(id).material.clone()).collect();

        bind(&mut once, &table, &reg, MaterialRole::Baked, BindPolicy::Strict).unwrap();
        let second: Vec<_> = once.traverse().map(|id| once.node(id).material.clone()).collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_unregistered_role_is_an_error() {
        let mut g = graph(&["roof"]);
        let table = BindingTable::new().with("roof", MaterialRole::EmissiveRoof);
        let err = bind(&mut g, &table, &registry(), MaterialRole::Baked, BindPolicy::SkipMissing).unwrap_err();
        assert_eq!(err, BindError::UnknownRole(MaterialRole::EmissiveRoof));
    }
}
