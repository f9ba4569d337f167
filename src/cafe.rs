//! The café scene: its materials, node bindings and asset files.

use crate::asset::AssetManifest;
use crate::binder::BindingTable;
use crate::resources::{Color, MaterialDescriptor, MaterialRegistry, MaterialRole};

pub const MODEL_FILE: &str = "cafe.glb";
pub const BAKED_TEXTURE: &str = "baked";
pub const BUILDING_TEXTURE: &str = "buildingAndStairs";

/// Role given to every node the binding table does not name
pub const DEFAULT_ROLE: MaterialRole = MaterialRole::Baked;

pub const WHITE_EMISSION: u32 = 0xffffff;
pub const WINDOW_EMISSION: u32 = 0x04aac0;
pub const ROOF_EMISSION: u32 = 0xff4e4b;
pub const ACCENT_EMISSION: u32 = 0xff6848;

/// One material per role. Baked surfaces are double-sided since the model
/// has open walls seen from both sides.
pub fn registry() -> MaterialRegistry {
    MaterialRegistry::new()
        .with(MaterialDescriptor::textured(MaterialRole::Baked, BAKED_TEXTURE).with_double_sided(true))
        .with(
            MaterialDescriptor::textured(MaterialRole::BuildingAndStairs, BUILDING_TEXTURE)
                .with_double_sided(true),
        )
        .with(MaterialDescriptor::flat(
            MaterialRole::EmissiveWhite,
            Color::from_hex(WHITE_EMISSION),
        ))
        .with(MaterialDescriptor::flat(
            MaterialRole::EmissiveWindow,
            Color::from_hex(WINDOW_EMISSION),
        ))
        .with(MaterialDescriptor::flat(
            MaterialRole::EmissiveRoof,
            Color::from_hex(ROOF_EMISSION),
        ))
        .with(MaterialDescriptor::flat(
            MaterialRole::EmissiveAccent,
            Color::from_hex(ACCENT_EMISSION),
        ))
}

/// Node names as exported from the modelling tool, typos included.
pub fn binding_table() -> BindingTable {
    BindingTable::from_pairs([
        ("building", MaterialRole::BuildingAndStairs),
        ("Stairs", MaterialRole::BuildingAndStairs),
        ("Stairs001", MaterialRole::BuildingAndStairs),
        ("LobbyLightPillar", MaterialRole::EmissiveWhite),
        ("MainWindow", MaterialRole::EmissiveWindow),
        ("SmallWindow", MaterialRole::EmissiveWindow),
        ("Rooflight1001", MaterialRole::EmissiveRoof),
        ("Roofligh2001", MaterialRole::EmissiveRoof),
        ("Rooflight3001", MaterialRole::EmissiveRoof),
        ("HiddenDoorEmission", MaterialRole::EmissiveAccent),
    ])
}

/// Files relative to the asset directory
pub fn manifest(model: &str) -> AssetManifest {
    AssetManifest::new(model)
        .with_texture(BAKED_TEXTURE, format!("{}.jpg", BAKED_TEXTURE))
        .with_texture(BUILDING_TEXTURE, format!("{}.jpg", BUILDING_TEXTURE))
}
