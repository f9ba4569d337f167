//! Resource management
//!
//! Meshes, textures, colors and the material registry.

mod color;
mod material;
mod mesh;
mod texture;

pub use color::*;
pub use material::*;
pub use mesh::*;
pub use texture::*;
