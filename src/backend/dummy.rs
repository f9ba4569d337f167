//! Recording backend for tests
//!
//! Hands out handles without touching a GPU and records the calls the
//! render pipeline cares about, so tests can assert on pass order, target
//! sizes and sample counts.

use std::collections::HashSet;

use crate::backend::traits::*;
use crate::backend::types::*;

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    Resize { width: u32, height: u32 },
    CreateTexture {
        label: Option<String>,
        width: u32,
        height: u32,
        sample_count: u32,
        format: TextureFormat,
    },
    DestroyTexture,
    CreatePipeline { label: Option<String>, sample_count: u32 },
    BeginRenderPass {
        label: Option<String>,
        load_op: Option<LoadOp>,
        resolves: bool,
    },
    EndRenderPass,
    Draw { count: u32 },
    DrawIndexed { count: u32 },
    BeginFrame,
    EndFrame,
}

/// Backend that records instead of rendering
#[derive(Debug)]
pub struct DummyBackend {
    width: u32,
    height: u32,
    multisample: bool,
    next_id: u64,
    live_textures: HashSet<u64>,
    live_bind_groups: HashSet<u64>,
    events: Vec<BackendEvent>,
}

impl DummyBackend {
    /// Create a dummy backend with a surface of the given size that
    /// supports 4x multisampling.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            multisample: true,
            next_id: 1,
            live_textures: HashSet::new(),
            live_bind_groups: HashSet::new(),
            events: Vec::new(),
        }
    }

    /// Report multisampled render targets as unsupported.
    pub fn without_multisample(mut self) -> Self {
        self.multisample = false;
        self
    }

    /// Everything recorded since creation or the last [`Self::clear_events`].
    pub fn events(&self) -> &[BackendEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Labels of every render pass begun, in order.
    pub fn pass_labels(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                BackendEvent::BeginRenderPass { label, .. } => {
                    Some(label.clone().unwrap_or_default())
                }
                _ => None,
            })
            .collect()
    }

    /// Number of textures created and not yet destroyed.
    pub fn live_texture_count(&self) -> usize {
        self.live_textures.len()
    }

    /// Number of bind groups created and not yet destroyed.
    pub fn live_bind_group_count(&self) -> usize {
        self.live_bind_groups.len()
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl GraphicsBackend for DummyBackend {
    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            log::trace!("DummyBackend: resize to {}x{}", width, height);
            self.width = width;
            self.height = height;
            self.events.push(BackendEvent::Resize { width, height });
        }
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn begin_frame(&mut self) -> BackendResult<FrameContext> {
        self.events.push(BackendEvent::BeginFrame);
        let view = self.next();
        Ok(FrameContext {
            swapchain_view: TextureViewHandle(view),
            width: self.width,
            height: self.height,
        })
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        self.events.push(BackendEvent::EndFrame);
        Ok(())
    }

    fn swapchain_format(&self) -> TextureFormat {
        TextureFormat::Bgra8UnormSrgb
    }

    fn supports_multisample(&self, _format: TextureFormat, sample_count: u32) -> bool {
        sample_count <= 1 || (self.multisample && sample_count == 4)
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {})",
            desc.label,
            desc.size
        );
        Ok(BufferHandle(self.next()))
    }

    fn create_buffer_init(
        &mut self,
        desc: &BufferDescriptor,
        _data: &[u8],
    ) -> BackendResult<BufferHandle> {
        self.create_buffer(desc)
    }

    fn write_buffer(&mut self, _buffer: BufferHandle, _offset: u64, _data: &[u8]) {}

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{}, {} samples)",
            desc.label,
            desc.width,
            desc.height,
            desc.sample_count
        );
        if desc.sample_count > 1 && !self.supports_multisample(desc.format, desc.sample_count) {
            return Err(BackendError::TextureCreationFailed(format!(
                "{} samples unsupported",
                desc.sample_count
            )));
        }
        let id = self.next();
        self.live_textures.insert(id);
        self.events.push(BackendEvent::CreateTexture {
            label: desc.label.clone(),
            width: desc.width,
            height: desc.height,
            sample_count: desc.sample_count,
            format: desc.format,
        });
        Ok(TextureHandle(id))
    }

    fn create_texture_view(&mut self, texture: TextureHandle) -> BackendResult<TextureViewHandle> {
        if !self.live_textures.contains(&texture.0) {
            return Err(BackendError::InvalidHandle(format!("texture {}", texture.0)));
        }
        Ok(TextureViewHandle(self.next()))
    }

    fn write_texture(&mut self, _texture: TextureHandle, _data: &[u8], _width: u32, _height: u32) {}

    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> BackendResult<SamplerHandle> {
        log::trace!("DummyBackend: creating sampler {:?}", desc.label);
        Ok(SamplerHandle(self.next()))
    }

    fn create_bind_group_layout(
        &mut self,
        _entries: &[BindGroupLayoutEntry],
    ) -> BackendResult<BindGroupLayoutHandle> {
        Ok(BindGroupLayoutHandle(self.next()))
    }

    fn create_bind_group(
        &mut self,
        _layout: BindGroupLayoutHandle,
        _entries: &[(u32, BindGroupEntry)],
    ) -> BackendResult<BindGroupHandle> {
        let id = self.next();
        self.live_bind_groups.insert(id);
        Ok(BindGroupHandle(id))
    }

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor,
    ) -> BackendResult<RenderPipelineHandle> {
        self.events.push(BackendEvent::CreatePipeline {
            label: desc.label.clone(),
            sample_count: desc.sample_count,
        });
        Ok(RenderPipelineHandle(self.next()))
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor) {
        let first = desc.color_attachments.first();
        self.events.push(BackendEvent::BeginRenderPass {
            label: desc.label.clone(),
            load_op: first.map(|a| a.load_op.clone()),
            resolves: first.map_or(false, |a| a.resolve_target.is_some()),
        });
    }

    fn end_render_pass(&mut self) {
        self.events.push(BackendEvent::EndRenderPass);
    }

    fn set_render_pipeline(&mut self, _pipeline: RenderPipelineHandle) {}

    fn set_bind_group(&mut self, _index: u32, _bind_group: BindGroupHandle) {}

    fn set_vertex_buffer(&mut self, _slot: u32, _buffer: BufferHandle, _offset: u64) {}

    fn set_index_buffer(&mut self, _buffer: BufferHandle, _offset: u64) {}

    fn set_viewport(&mut self, _x: f32, _y: f32, _w: f32, _h: f32, _min: f32, _max: f32) {}

    fn draw(&mut self, vertices: std::ops::Range<u32>, _instances: std::ops::Range<u32>) {
        self.events.push(BackendEvent::Draw {
            count: vertices.end - vertices.start,
        });
    }

    fn draw_indexed(
        &mut self,
        indices: std::ops::Range<u32>,
        _base_vertex: i32,
        _instances: std::ops::Range<u32>,
    ) {
        self.events.push(BackendEvent::DrawIndexed {
            count: indices.end - indices.start,
        });
    }

    fn destroy_buffer(&mut self, _buffer: BufferHandle) {}

    fn destroy_bind_group(&mut self, bind_group: BindGroupHandle) {
        self.live_bind_groups.remove(&bind_group.0);
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if self.live_textures.remove(&texture.0) {
            self.events.push(BackendEvent::DestroyTexture);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_backend_has_no_events() {
        let backend = DummyBackend::new(800, 600);
        assert_eq!(backend.surface_size(), (800, 600));
        assert!(backend.events().is_empty());
    }

    #[test]
    fn test_zero_resize_is_ignored() {
        let mut backend = DummyBackend::new(800, 600);
        backend.resize(0, 600);
        assert_eq!(backend.surface_size(), (800, 600));
        assert!(backend.events().is_empty());
    }

    #[test]
    fn test_multisample_texture_rejected_when_unsupported() {
        let mut backend = DummyBackend::new(64, 64).without_multisample();
        let desc = TextureDescriptor {
            sample_count: 4,
            format: TextureFormat::Rgba16Float,
            ..Default::default()
        };
        assert!(backend.create_texture(&desc).is_err());
        assert!(!backend.supports_multisample(TextureFormat::Rgba16Float, 4));
        assert!(backend.supports_multisample(TextureFormat::Rgba16Float, 1));
    }

    #[test]
    fn test_destroyed_texture_views_fail() {
        let mut backend = DummyBackend::new(64, 64);
        let tex = backend.create_texture(&TextureDescriptor::default()).unwrap();
        assert!(backend.create_texture_view(tex).is_ok());
        backend.destroy_texture(tex);
        assert_eq!(backend.live_texture_count(), 0);
        assert!(backend.create_texture_view(tex).is_err());
    }

    #[test]
    fn test_bind_groups_are_counted_until_destroyed() {
        let mut backend = DummyBackend::new(64, 64);
        let layout = backend.create_bind_group_layout(&[]).unwrap();
        let first = backend.create_bind_group(layout, &[]).unwrap();
        let second = backend.create_bind_group(layout, &[]).unwrap();
        assert_eq!(backend.live_bind_group_count(), 2);

        backend.destroy_bind_group(first);
        backend.destroy_bind_group(first);
        assert_eq!(backend.live_bind_group_count(), 1);
        backend.destroy_bind_group(second);
        assert_eq!(backend.live_bind_group_count(), 0);
    }
}
