//! The [`GraphicsBackend`] trait and the handles it hands out
//!
//! Passes talk to the GPU only through this trait. It is object safe so the
//! pipeline can hold `&mut dyn GraphicsBackend`; constructors live on the
//! concrete backends.

use crate::backend::types::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("no GPU adapter can present to this window")]
    NoAdapter,
    #[error("surface creation failed: {0}")]
    SurfaceCreationFailed(String),
    #[error("device request failed: {0}")]
    DeviceCreationFailed(String),
    #[error("could not acquire swapchain image: {0}")]
    AcquireImageFailed(String),
    #[error("texture creation failed: {0}")]
    TextureCreationFailed(String),
    #[error("pipeline creation failed: {0}")]
    PipelineCreationFailed(String),
    #[error("unknown {0}")]
    InvalidHandle(String),
    /// Outdated or lost swapchain. The frame is skipped and the surface
    /// reconfigured.
    #[error("surface lost")]
    SurfaceLost,
    #[error("out of GPU memory")]
    OutOfMemory,
}

pub type BackendResult<T> = Result<T, BackendError>;

macro_rules! handles {
    ($($(#[$meta:meta])* $name:ident;)+) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(pub(crate) u64);
        )+
    };
}

handles! {
    BufferHandle;
    TextureHandle;
    /// A view of a texture, or of the current swapchain image
    TextureViewHandle;
    SamplerHandle;
    RenderPipelineHandle;
    BindGroupHandle;
    BindGroupLayoutHandle;
}

#[derive(Debug, Clone)]
pub enum BindGroupEntry {
    Buffer {
        buffer: BufferHandle,
        offset: u64,
        size: Option<u64>,
    },
    Texture(TextureViewHandle),
    Sampler(SamplerHandle),
}

#[derive(Debug, Clone)]
pub struct BindGroupLayoutEntry {
    pub binding: u32,
    pub visibility: ShaderStageFlags,
    pub ty: BindingType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingType {
    UniformBuffer,
    /// Filterable float 2D texture
    Texture,
    /// Filtering sampler
    Sampler,
}

/// A render pipeline built from one WGSL module with `vs_main` and
/// `fs_main` entry points.
#[derive(Debug, Clone)]
pub struct RenderPipelineDescriptor {
    pub label: Option<String>,
    pub shader: String,
    pub vertex_layouts: Vec<VertexBufferLayout>,
    pub bind_group_layouts: Vec<BindGroupLayoutHandle>,
    pub cull_mode: CullMode,
    pub depth: Option<DepthState>,
    pub color_targets: Vec<ColorTargetState>,
    /// Must match the sample count of every attachment the pipeline draws into.
    pub sample_count: u32,
}

/// Depth test is always `Less`
#[derive(Debug, Clone)]
pub struct DepthState {
    pub format: TextureFormat,
    pub write_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct ColorTargetState {
    pub format: TextureFormat,
    pub blend: BlendMode,
}

#[derive(Debug, Clone)]
pub struct ColorAttachment {
    pub view: TextureViewHandle,
    /// Single-sample texture a multisampled `view` is resolved into at store.
    pub resolve_target: Option<TextureViewHandle>,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOp {
    /// Linear RGBA
    Clear([f32; 4]),
    Load,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Store,
    Discard,
}

#[derive(Debug, Clone)]
pub struct DepthStencilAttachment {
    pub view: TextureViewHandle,
    pub depth_load_op: LoadOp,
    pub depth_store_op: StoreOp,
    pub depth_clear_value: f32,
}

#[derive(Debug, Clone)]
pub struct RenderPassDescriptor {
    pub label: Option<String>,
    pub color_attachments: Vec<ColorAttachment>,
    pub depth_stencil_attachment: Option<DepthStencilAttachment>,
}

/// The swapchain image acquired for one frame
pub struct FrameContext {
    pub swapchain_view: TextureViewHandle,
    pub width: u32,
    pub height: u32,
}

pub trait GraphicsBackend {
    /// Reconfigure the swapchain. Zero sizes are ignored.
    fn resize(&mut self, width: u32, height: u32);

    /// Current swapchain size, possibly clamped to device limits
    fn surface_size(&self) -> (u32, u32);

    /// Acquire the next swapchain image and open the frame's command stream.
    fn begin_frame(&mut self) -> BackendResult<FrameContext>;

    /// Submit everything recorded since [`Self::begin_frame`] and present.
    fn end_frame(&mut self) -> BackendResult<()>;

    fn swapchain_format(&self) -> TextureFormat;

    /// Whether render attachments of `format` may use `sample_count` samples.
    /// Color formats must also resolve; depth is never resolved.
    fn supports_multisample(&self, format: TextureFormat, sample_count: u32) -> bool;

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle>;

    fn create_buffer_init(&mut self, desc: &BufferDescriptor, data: &[u8])
        -> BackendResult<BufferHandle>;

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]);

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle>;

    fn create_texture_view(&mut self, texture: TextureHandle) -> BackendResult<TextureViewHandle>;

    /// Upload tightly packed 4-byte texels covering the whole texture.
    fn write_texture(&mut self, texture: TextureHandle, data: &[u8], width: u32, height: u32);

    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> BackendResult<SamplerHandle>;

    fn create_bind_group_layout(
        &mut self,
        entries: &[BindGroupLayoutEntry],
    ) -> BackendResult<BindGroupLayoutHandle>;

    fn create_bind_group(
        &mut self,
        layout: BindGroupLayoutHandle,
        entries: &[(u32, BindGroupEntry)],
    ) -> BackendResult<BindGroupHandle>;

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor,
    ) -> BackendResult<RenderPipelineHandle>;

    // Pass recording. Everything between begin and end belongs to one pass.

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor);

    fn end_render_pass(&mut self);

    fn set_render_pipeline(&mut self, pipeline: RenderPipelineHandle);

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupHandle);

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, offset: u64);

    /// Bind an index buffer of `u32` indices.
    fn set_index_buffer(&mut self, buffer: BufferHandle, offset: u64);

    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32, min_depth: f32, max_depth: f32);

    fn draw(&mut self, vertices: std::ops::Range<u32>, instances: std::ops::Range<u32>);

    fn draw_indexed(
        &mut self,
        indices: std::ops::Range<u32>,
        base_vertex: i32,
        instances: std::ops::Range<u32>,
    );

    fn destroy_buffer(&mut self, buffer: BufferHandle);

    /// Drop a bind group. Groups keep the views they reference alive, so
    /// they must go before their textures can be freed.
    fn destroy_bind_group(&mut self, bind_group: BindGroupHandle);

    /// Destroy a texture together with every view created from it.
    fn destroy_texture(&mut self, texture: TextureHandle);
}
