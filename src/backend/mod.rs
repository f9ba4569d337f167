//! Backend abstraction layer
//!
//! [`GraphicsBackend`] is implemented by the wgpu renderer and by
//! [`dummy::DummyBackend`], which records calls instead of touching a GPU.

pub mod dummy;
pub mod traits;
pub mod types;
pub mod wgpu_backend;

pub use traits::*;
pub use types::*;
