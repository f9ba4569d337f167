//! Unlit material definitions and the role registry
//!
//! Lighting in the café scene is baked into textures, so every material is
//! unlit: either a baked texture lookup or a flat emissive color. Materials
//! are identified by [`MaterialRole`] and shared between nodes through `Arc`.

use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::Color;

/// What a material is used for in the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MaterialRole {
    /// Default baked texture, assigned to every node first
    Baked,
    BuildingAndStairs,
    EmissiveWhite,
    EmissiveWindow,
    EmissiveRoof,
    EmissiveAccent,
}

impl MaterialRole {
    pub const ALL: [MaterialRole; 6] = [
        MaterialRole::Baked,
        MaterialRole::BuildingAndStairs,
        MaterialRole::EmissiveWhite,
        MaterialRole::EmissiveWindow,
        MaterialRole::EmissiveRoof,
        MaterialRole::EmissiveAccent,
    ];

    /// Short name used in binding tables
    pub fn name(&self) -> &'static str {
        match self {
            MaterialRole::Baked => "baked",
            MaterialRole::BuildingAndStairs => "buildingAndStairs",
            MaterialRole::EmissiveWhite => "white",
            MaterialRole::EmissiveWindow => "window",
            MaterialRole::EmissiveRoof => "roof",
            MaterialRole::EmissiveAccent => "accent",
        }
    }
}

impl fmt::Display for MaterialRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown material role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for MaterialRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MaterialRole::ALL
            .into_iter()
            .find(|role| role.name() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Key of a texture supplied with the asset (file stem, e.g. `"baked"`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureKey(pub String);

impl TextureKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// How a material shades its surface
#[derive(Debug, Clone, PartialEq)]
pub enum Shading {
    UnlitTextured { texture: TextureKey },
    UnlitColor { color: Color },
}

/// Immutable material description shared by every node of the same role
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDescriptor {
    pub role: MaterialRole,
    pub shading: Shading,
    pub double_sided: bool,
}

impl MaterialDescriptor {
    pub fn textured(role: MaterialRole, texture: impl Into<String>) -> Self {
        Self {
            role,
            shading: Shading::UnlitTextured {
                texture: TextureKey::new(texture),
            },
            double_sided: false,
        }
    }

    pub fn flat(role: MaterialRole, color: Color) -> Self {
        Self {
            role,
            shading: Shading::UnlitColor { color },
            double_sided: false,
        }
    }

    pub fn with_double_sided(mut self, double_sided: bool) -> Self {
        self.double_sided = double_sided;
        self
    }

    pub fn texture(&self) -> Option<&TextureKey> {
        match &self.shading {
            Shading::UnlitTextured { texture } => Some(texture),
            Shading::UnlitColor { .. } => None,
        }
    }

    /// Create a uniform data struct for GPU
    pub fn uniform_data(&self) -> MaterialUniformData {
        match &self.shading {
            Shading::UnlitTextured { .. } => MaterialUniformData {
                color: Vec4::ONE,
                params: Vec4::new(1.0, 0.0, 0.0, 0.0),
            },
            Shading::UnlitColor { color } => MaterialUniformData {
                color: color.0.extend(1.0),
                params: Vec4::ZERO,
            },
        }
    }
}

/// Material uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialUniformData {
    pub color: Vec4,
    pub params: Vec4, // x=sample texture, yzw=padding
}

/// Fixed role → material mapping, one shared instance per role
#[derive(Debug, Clone, Default)]
pub struct MaterialRegistry {
    materials: HashMap<MaterialRole, Arc<MaterialDescriptor>>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor under its role, replacing any previous one.
    pub fn insert(&mut self, descriptor: MaterialDescriptor) -> Arc<MaterialDescriptor> {
        let shared = Arc::new(descriptor);
        self.materials.insert(shared.role, shared.clone());
        shared
    }

    pub fn with(mut self, descriptor: MaterialDescriptor) -> Self {
        self.insert(descriptor);
        self
    }

    pub fn get(&self, role: MaterialRole) -> Option<&Arc<MaterialDescriptor>> {
        self.materials.get(&role)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Texture keys referenced by any registered material, sorted.
    pub fn texture_keys(&self) -> Vec<TextureKey> {
        let mut keys: Vec<TextureKey> = self
            .materials
            .values()
            .filter_map(|m| m.texture().cloned())
            .collect();
        keys.sort_by(|a, b| a.0.cmp(&b.0));
        keys.dedup();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names_round_trip() {
        for role in MaterialRole::ALL {
            assert_eq!(role.name().parse::<MaterialRole>(), Ok(role));
        }
        assert_eq!(
            "neon".parse::<MaterialRole>(),
            Err(UnknownRole("neon".to_string()))
        );
    }

    #[test]
    fn test_registry_shares_one_instance_per_role() {
        let mut registry = MaterialRegistry::new();
        let white = registry.insert(MaterialDescriptor::flat(MaterialRole::EmissiveWhite, Color::WHITE));
        let fetched = registry.get(MaterialRole::EmissiveWhite).unwrap();
        assert!(Arc::ptr_eq(&white, fetched));
        assert!(registry.get(MaterialRole::EmissiveRoof).is_none());
    }

    #[test]
    fn test_texture_keys_are_deduplicated() {
        let registry = MaterialRegistry::new()
            .with(MaterialDescriptor::textured(MaterialRole::Baked, "baked"))
            .with(MaterialDescriptor::textured(MaterialRole::BuildingAndStairs, "baked"))
            .with(MaterialDescriptor::flat(MaterialRole::EmissiveRoof, Color::WHITE));
        assert_eq!(registry.texture_keys(), vec![TextureKey::new("baked")]);
    }

    #[test]
    fn test_uniform_data_flags_texture_sampling() {
        let textured = MaterialDescriptor::textured(MaterialRole::Baked, "baked");
        assert_eq!(textured.uniform_data().params.x, 1.0);
        let flat = MaterialDescriptor::flat(MaterialRole::EmissiveWindow, Color::from_hex(0x04AAC0));
        assert_eq!(flat.uniform_data().params.x, 0.0);
        assert_eq!(flat.uniform_data().color.w, 1.0);
    }
}
