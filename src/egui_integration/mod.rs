//! egui GUI integration
//!
//! Draws the debug panel on top of the presented frame.

mod wgpu;

pub use self::wgpu::WgpuEguiIntegration;
