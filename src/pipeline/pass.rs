//! Render pass trait and the contexts passes run in

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::pipeline::target::RenderTarget;
use crate::pipeline::PipelineParameters;
use crate::scene::{Camera, Scene};

/// Texture size specification
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextureSize {
    /// Absolute size in pixels
    Absolute { width: u32, height: u32 },
    /// Relative to the render target (1.0 = full size)
    Relative { width_scale: f32, height_scale: f32 },
}

impl Default for TextureSize {
    fn default() -> Self {
        TextureSize::Relative {
            width_scale: 1.0,
            height_scale: 1.0,
        }
    }
}

impl TextureSize {
    /// Never resolves to zero; wgpu rejects empty textures.
    pub fn resolve(&self, target_width: u32, target_height: u32) -> (u32, u32) {
        let (width, height) = match self {
            TextureSize::Absolute { width, height } => (*width, *height),
            TextureSize::Relative {
                width_scale,
                height_scale,
            } => (
                ((target_width as f32) * width_scale) as u32,
                ((target_height as f32) * height_scale) as u32,
            ),
        };
        (width.max(1), height.max(1))
    }
}

/// A texture owned by a pass, sized from the target
#[derive(Debug, Clone, Copy)]
pub struct PassTexture {
    pub texture: TextureHandle,
    pub view: TextureViewHandle,
    pub width: u32,
    pub height: u32,
}

impl PassTexture {
    pub fn destroy(self, backend: &mut dyn GraphicsBackend) {
        backend.destroy_texture(self.texture);
    }
}

/// Context for (re)allocating pass resources
pub struct PassSetupContext<'a> {
    pub backend: &'a mut dyn GraphicsBackend,
    pub target: &'a RenderTarget,
}

impl<'a> PassSetupContext<'a> {
    /// Create a texture with size relative to the render target
    pub fn create_texture_relative(
        &mut self,
        name: &str,
        size: TextureSize,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> BackendResult<PassTexture> {
        let (target_width, target_height) = self.target.size();
        let (width, height) = size.resolve(target_width, target_height);

        let texture = self.backend.create_texture(&TextureDescriptor {
            label: Some(name.to_string()),
            width,
            height,
            format,
            usage,
            ..Default::default()
        })?;
        let view = self.backend.create_texture_view(texture)?;

        Ok(PassTexture {
            texture,
            view,
            width,
            height,
        })
    }
}

/// Context for executing a render pass
pub struct PassExecuteContext<'a> {
    pub backend: &'a mut dyn GraphicsBackend,
    pub scene: &'a Scene,
    pub camera: &'a Camera,
    pub target: &'a RenderTarget,
    /// Snapshot taken at the start of the frame
    pub params: &'a PipelineParameters,
    /// Current swapchain image
    pub swapchain_view: TextureViewHandle,
}

/// One step of the frame
pub trait RenderPass {
    /// Get the pass name for debugging and frame reports
    fn name(&self) -> &'static str;

    /// Allocate size-dependent resources. Called once at construction and
    /// again after every target resize.
    fn setup(&mut self, ctx: &mut PassSetupContext) -> BackendResult<()>;

    /// Whether the pass runs this frame
    fn is_enabled(&self, _params: &PipelineParameters) -> bool {
        true
    }

    /// Record commands
    fn execute(&mut self, ctx: &mut PassExecuteContext) -> BackendResult<()>;

    /// Free every GPU resource the pass owns
    fn release(&mut self, _backend: &mut dyn GraphicsBackend) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_size_never_zero() {
        let half = TextureSize::Relative {
            width_scale: 0.5,
            height_scale: 0.5,
        };
        assert_eq!(half.resolve(800, 600), (400, 300));
        assert_eq!(half.resolve(1, 1), (1, 1));
        assert_eq!(
            TextureSize::Absolute {
                width: 0,
                height: 16
            }
            .resolve(800, 600),
            (1, 16)
        );
    }
}
