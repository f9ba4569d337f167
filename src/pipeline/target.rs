//! The shared color target every pass draws into

use crate::backend::traits::*;
use crate::backend::types::*;

/// HDR color format of the target; the output pass encodes to the swapchain.
pub const TARGET_FORMAT: TextureFormat = TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Kind of target, chosen once when the pipeline is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Multisampled color and depth, resolved into a sampled texture
    Multisampled { samples: u32 },
    Standard,
}

impl TargetKind {
    /// Multisample only at a pixel ratio of exactly 1: at higher ratios the
    /// extra resolution already smooths edges.
    pub fn select(pixel_ratio: f32, multisample_supported: bool, samples: u32) -> Self {
        if pixel_ratio == 1.0 && multisample_supported && samples > 1 {
            TargetKind::Multisampled { samples }
        } else {
            TargetKind::Standard
        }
    }

    pub fn sample_count(&self) -> u32 {
        match self {
            TargetKind::Multisampled { samples } => *samples,
            TargetKind::Standard => 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Attachment {
    texture: TextureHandle,
    view: TextureViewHandle,
}

impl Attachment {
    fn create(
        backend: &mut dyn GraphicsBackend,
        label: &str,
        width: u32,
        height: u32,
        format: TextureFormat,
        sample_count: u32,
        usage: TextureUsage,
    ) -> BackendResult<Self> {
        let texture = backend.create_texture(&TextureDescriptor {
            label: Some(label.to_string()),
            width,
            height,
            sample_count,
            format,
            usage,
            ..Default::default()
        })?;
        let view = backend.create_texture_view(texture)?;
        Ok(Self { texture, view })
    }
}

#[derive(Debug)]
pub struct RenderTarget {
    kind: TargetKind,
    width: u32,
    height: u32,
    color: Attachment,
    /// Present only for multisampled targets
    resolve: Option<Attachment>,
    depth: Attachment,
}

impl RenderTarget {
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        kind: TargetKind,
        width: u32,
        height: u32,
    ) -> BackendResult<Self> {
        let width = width.max(1);
        let height = height.max(1);
        let samples = kind.sample_count();

        let color_usage = match kind {
            TargetKind::Multisampled { .. } => TextureUsage::RENDER_ATTACHMENT,
            TargetKind::Standard => {
                TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING
            }
        };
        let color = Attachment::create(
            backend,
            "Target Color",
            width,
            height,
            TARGET_FORMAT,
            samples,
            color_usage,
        )?;

        let resolve = match kind {
            TargetKind::Multisampled { .. } => Some(Attachment::create(
                backend,
                "Target Resolve",
                width,
                height,
                TARGET_FORMAT,
                1,
                TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
            )?),
            TargetKind::Standard => None,
        };

        let depth = Attachment::create(
            backend,
            "Target Depth",
            width,
            height,
            DEPTH_FORMAT,
            samples,
            TextureUsage::RENDER_ATTACHMENT,
        )?;

        log::debug!("Render target {}x{} ({:?})", width, height, kind);

        Ok(Self {
            kind,
            width,
            height,
            color,
            resolve,
            depth,
        })
    }

    /// Reallocate at a new size. Returns `false` without touching the GPU
    /// when the size is unchanged.
    pub fn resize(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        width: u32,
        height: u32,
    ) -> BackendResult<bool> {
        let width = width.max(1);
        let height = height.max(1);
        if (width, height) == (self.width, self.height) {
            return Ok(false);
        }

        let replacement = Self::new(backend, self.kind, width, height)?;
        let old = std::mem::replace(self, replacement);
        old.destroy(backend);
        Ok(true)
    }

    pub fn destroy(self, backend: &mut dyn GraphicsBackend) {
        backend.destroy_texture(self.color.texture);
        if let Some(resolve) = self.resolve {
            backend.destroy_texture(resolve.texture);
        }
        backend.destroy_texture(self.depth.texture);
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn sample_count(&self) -> u32 {
        self.kind.sample_count()
    }

    /// Single-sample view later passes read from
    pub fn sampled_view(&self) -> TextureViewHandle {
        self.resolve.unwrap_or(self.color).view
    }

    /// Attachment for drawing the scene; multisampled targets resolve on store.
    pub fn color_attachment(&self, load_op: LoadOp) -> ColorAttachment {
        ColorAttachment {
            view: self.color.view,
            resolve_target: self.resolve.map(|r| r.view),
            load_op,
            store_op: StoreOp::Store,
        }
    }

    /// Single-sample attachment for compositing on top of the resolved image
    pub fn composite_attachment(&self) -> ColorAttachment {
        ColorAttachment {
            view: self.sampled_view(),
            resolve_target: None,
            load_op: LoadOp::Load,
            store_op: StoreOp::Store,
        }
    }

    pub fn depth_attachment(&self) -> DepthStencilAttachment {
        DepthStencilAttachment {
            view: self.depth.view,
            depth_load_op: LoadOp::Clear([1.0, 0.0, 0.0, 0.0]),
            depth_store_op: StoreOp::Discard,
            depth_clear_value: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use rstest::rstest;

    #[rstest]
    #[case(1.0, true, 4, TargetKind::Multisampled { samples: 4 })]
    #[case(1.0, false, 4, TargetKind::Standard)]
    #[case(2.0, true, 4, TargetKind::Standard)]
    #[case(1.5, true, 4, TargetKind::Standard)]
    #[case(1.0, true, 1, TargetKind::Standard)]
    fn test_target_selection(
        #[case] ratio: f32,
        #[case] supported: bool,
        #[case] samples: u32,
        #[case] expected: TargetKind,
    ) {
        assert_eq!(TargetKind::select(ratio, supported, samples), expected);
    }

    #[test]
    fn test_multisampled_target_resolves() {
        let mut backend = DummyBackend::new(64, 64);
        let target =
            RenderTarget::new(&mut backend, TargetKind::Multisampled { samples: 4 }, 64, 64).unwrap();
        assert_eq!(backend.live_texture_count(), 3);
        assert!(target.color_attachment(LoadOp::Load).resolve_target.is_some());
        assert_ne!(target.sampled_view(), target.color_attachment(LoadOp::Load).view);
    }

    #[test]
    fn test_standard_target_samples_its_color() {
        let mut backend = DummyBackend::new(64, 64);
        let target = RenderTarget::new(&mut backend, TargetKind::Standard, 64, 64).unwrap();
        assert_eq!(backend.live_texture_count(), 2);
        assert_eq!(target.sampled_view(), target.color_attachment(LoadOp::Load).view);
    }

    #[test]
    fn test_resize_same_size_is_noop() {
        let mut backend = DummyBackend::new(64, 64);
        let mut target = RenderTarget::new(&mut backend, TargetKind::Standard, 64, 64).unwrap();
        backend.clear_events();

        assert!(!target.resize(&mut backend, 64, 64).unwrap());
        assert!(backend.events().is_empty());

        assert!(target.resize(&mut backend, 128, 32).unwrap());
        assert_eq!(target.size(), (128, 32));
        assert_eq!(backend.live_texture_count(), 2);
    }
}
