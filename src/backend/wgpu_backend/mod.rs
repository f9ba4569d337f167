//! wgpu implementation of [`GraphicsBackend`]
//!
//! Resources live in id-keyed tables; every handle kind draws from one id
//! counter. Pass commands are buffered between `begin_render_pass` and
//! `end_render_pass` and replayed into a real wgpu pass at the end, because
//! a wgpu pass borrows every resource it touches.

mod convert;

use std::borrow::Cow;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::backend::traits::*;
use crate::backend::types::*;

#[derive(Clone)]
enum PassCommand {
    Pipeline(RenderPipelineHandle),
    BindGroup(u32, BindGroupHandle),
    VertexBuffer { slot: u32, buffer: BufferHandle, offset: u64 },
    IndexBuffer { buffer: BufferHandle, offset: u64 },
    Viewport { x: f32, y: f32, width: f32, height: f32, depth: Range<f32> },
    Draw { vertices: Range<u32>, instances: Range<u32> },
    DrawIndexed { indices: Range<u32>, base_vertex: i32, instances: Range<u32> },
}

struct RecordingPass {
    descriptor: RenderPassDescriptor,
    commands: Vec<PassCommand>,
}

pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,

    frame: Option<wgpu::SurfaceTexture>,
    /// Id standing for the swapchain view during the current frame
    frame_view_id: u64,
    encoder: Option<wgpu::CommandEncoder>,
    recording: Option<RecordingPass>,

    next_id: u64,
    buffers: HashMap<u64, wgpu::Buffer>,
    textures: HashMap<u64, wgpu::Texture>,
    /// View id to (view, owning texture id)
    views: HashMap<u64, (wgpu::TextureView, u64)>,
    samplers: HashMap<u64, wgpu::Sampler>,
    layouts: HashMap<u64, wgpu::BindGroupLayout>,
    bind_groups: HashMap<u64, wgpu::BindGroup>,
    pipelines: HashMap<u64, wgpu::RenderPipeline>,
}

/// Scale `(width, height)` down so neither side exceeds `max_size`.
fn clamp_extent(width: u32, height: u32, max_size: u32) -> (u32, u32) {
    if width <= max_size && height <= max_size {
        return (width.max(1), height.max(1));
    }
    let scale = (max_size as f32 / width as f32).min(max_size as f32 / height as f32);
    (
        ((width as f32 * scale) as u32).max(1),
        ((height as f32 * scale) as u32).max(1),
    )
}

/// Depth attachments are never resolved, so they only need the sample count.
fn multisample_allowed(flags: wgpu::TextureFormatFeatureFlags, sample_count: u32, resolve: bool) -> bool {
    if sample_count <= 1 {
        return true;
    }
    flags.sample_count_supported(sample_count)
        && (!resolve || flags.contains(wgpu::TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE))
}

/// Resample tightly packed RGBA8 texels to `extent`, the size
/// `create_texture` actually allocated. `None` when `data` is too short.
fn fit_texels(data: &[u8], (width, height): (u32, u32), extent: (u32, u32)) -> Option<Cow<'_, [u8]>> {
    if (width, height) == extent {
        let needed = width as usize * height as usize * 4;
        return (data.len() >= needed).then(|| Cow::Borrowed(&data[..needed]));
    }
    let source = image::RgbaImage::from_raw(width, height, data.to_vec())?;
    let resized = image::imageops::resize(
        &source,
        extent.0,
        extent.1,
        image::imageops::FilterType::Triangle,
    );
    Some(Cow::Owned(resized.into_raw()))
}

impl WgpuBackend {
    /// Blocking constructor: selects an adapter for the window surface and
    /// configures the swapchain with an sRGB format when one is offered.
    pub fn new(window: Arc<winit::window::Window>, vsync: bool) -> BackendResult<Self> {
        pollster::block_on(Self::new_async(window, vsync))
    }

    pub async fn new_async(window: Arc<winit::window::Window>, vsync: bool) -> BackendResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let size = window.inner_size();
        let surface = instance
            .create_surface(window)
            .map_err(|e| BackendError::SurfaceCreationFailed(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(BackendError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("Using {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Viewer Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| BackendError::DeviceCreationFailed(e.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| BackendError::SurfaceCreationFailed("no supported formats".into()))?;
        if !format.is_srgb() {
            log::warn!("No sRGB surface format, output pass will encode ({:?})", format);
        }

        let (width, height) =
            clamp_extent(size.width, size.height, device.limits().max_texture_dimension_2d);
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        Ok(Self {
            surface,
            adapter,
            device,
            queue,
            surface_config,
            frame: None,
            frame_view_id: 0,
            encoder: None,
            recording: None,
            next_id: 1,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            views: HashMap::new(),
            samplers: HashMap::new(),
            layouts: HashMap::new(),
            bind_groups: HashMap::new(),
            pipelines: HashMap::new(),
        })
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn max_extent(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn record(&mut self, command: PassCommand) {
        if let Some(pass) = self.recording.as_mut() {
            pass.commands.push(command);
        }
    }

    /// Look up a view, mapping the frame's swapchain id onto `swapchain`.
    fn view<'a>(
        &'a self,
        handle: TextureViewHandle,
        swapchain: Option<&'a wgpu::TextureView>,
    ) -> Option<&'a wgpu::TextureView> {
        if handle.0 == self.frame_view_id {
            swapchain
        } else {
            self.views.get(&handle.0).map(|(view, _)| view)
        }
    }

    fn swapchain_view(&self) -> Option<wgpu::TextureView> {
        self.frame
            .as_ref()
            .map(|frame| frame.texture.create_view(&wgpu::TextureViewDescriptor::default()))
    }

    fn replay<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>, commands: &[PassCommand]) {
        for command in commands {
            match command {
                PassCommand::Pipeline(handle) => {
                    if let Some(pipeline) = self.pipelines.get(&handle.0) {
                        pass.set_pipeline(pipeline);
                    }
                }
                PassCommand::BindGroup(index, handle) => {
                    if let Some(group) = self.bind_groups.get(&handle.0) {
                        pass.set_bind_group(*index, group, &[]);
                    }
                }
                PassCommand::VertexBuffer { slot, buffer, offset } => {
                    if let Some(buffer) = self.buffers.get(&buffer.0) {
                        pass.set_vertex_buffer(*slot, buffer.slice(*offset..));
                    }
                }
                PassCommand::IndexBuffer { buffer, offset } => {
                    if let Some(buffer) = self.buffers.get(&buffer.0) {
                        pass.set_index_buffer(buffer.slice(*offset..), wgpu::IndexFormat::Uint32);
                    }
                }
                PassCommand::Viewport { x, y, width, height, depth } => {
                    pass.set_viewport(*x, *y, *width, *height, depth.start, depth.end);
                }
                PassCommand::Draw { vertices, instances } => {
                    pass.draw(vertices.clone(), instances.clone());
                }
                PassCommand::DrawIndexed { indices, base_vertex, instances } => {
                    pass.draw_indexed(indices.clone(), *base_vertex, instances.clone());
                }
            }
        }
    }

    fn buffer_binding(
        &self,
        buffer: BufferHandle,
        offset: u64,
        size: Option<u64>,
    ) -> BackendResult<wgpu::BindingResource<'_>> {
        let buffer = self
            .buffers
            .get(&buffer.0)
            .ok_or_else(|| BackendError::InvalidHandle(format!("buffer {}", buffer.0)))?;
        Ok(wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer,
            offset,
            size: size.and_then(std::num::NonZeroU64::new),
        }))
    }
}

impl GraphicsBackend for WgpuBackend {
    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let (width, height) = clamp_extent(width, height, self.max_extent());
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    fn begin_frame(&mut self) -> BackendResult<FrameContext> {
        let frame = self.surface.get_current_texture().map_err(|e| match e {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => BackendError::SurfaceLost,
            wgpu::SurfaceError::OutOfMemory => BackendError::OutOfMemory,
            other => BackendError::AcquireImageFailed(other.to_string()),
        })?;

        // The swapchain view is created lazily by each pass that targets it.
        self.frame_view_id = self.allocate_id();
        self.frame = Some(frame);
        self.encoder = Some(
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Frame Encoder"),
                }),
        );

        Ok(FrameContext {
            swapchain_view: TextureViewHandle(self.frame_view_id),
            width: self.surface_config.width,
            height: self.surface_config.height,
        })
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
        }
        if let Some(frame) = self.frame.take() {
            frame.present();
        }
        Ok(())
    }

    fn swapchain_format(&self) -> TextureFormat {
        convert::surface_format(self.surface_config.format)
    }

    fn supports_multisample(&self, format: TextureFormat, sample_count: u32) -> bool {
        let flags = self
            .adapter
            .get_texture_format_features(convert::texture_format(format))
            .flags;
        multisample_allowed(flags, sample_count, !format.is_depth())
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: desc.label.as_deref(),
            size: desc.size,
            usage: convert::buffer_usage(desc.usage),
            mapped_at_creation: false,
        });
        let id = self.allocate_id();
        self.buffers.insert(id, buffer);
        Ok(BufferHandle(id))
    }

    fn create_buffer_init(
        &mut self,
        desc: &BufferDescriptor,
        data: &[u8],
    ) -> BackendResult<BufferHandle> {
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: desc.label.as_deref(),
            contents: data,
            usage: convert::buffer_usage(desc.usage),
        });
        let id = self.allocate_id();
        self.buffers.insert(id, buffer);
        Ok(BufferHandle(id))
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        if let Some(buffer) = self.buffers.get(&buffer.0) {
            self.queue.write_buffer(buffer, offset, data);
        }
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        let (width, height) = clamp_extent(desc.width, desc.height, self.max_extent());
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: desc.label.as_deref(),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: desc.sample_count.max(1),
            dimension: wgpu::TextureDimension::D2,
            format: convert::texture_format(desc.format),
            usage: convert::texture_usage(desc.usage),
            view_formats: &[],
        });
        let id = self.allocate_id();
        self.textures.insert(id, texture);
        Ok(TextureHandle(id))
    }

    fn create_texture_view(&mut self, texture: TextureHandle) -> BackendResult<TextureViewHandle> {
        let view = self
            .textures
            .get(&texture.0)
            .ok_or_else(|| BackendError::InvalidHandle(format!("texture {}", texture.0)))?
            .create_view(&wgpu::TextureViewDescriptor::default());
        let id = self.allocate_id();
        self.views.insert(id, (view, texture.0));
        Ok(TextureViewHandle(id))
    }

    fn write_texture(&mut self, texture: TextureHandle, data: &[u8], width: u32, height: u32) {
        let Some(texture) = self.textures.get(&texture.0) else {
            return;
        };
        let extent = (texture.width(), texture.height());
        let Some(texels) = fit_texels(data, (width, height), extent) else {
            log::warn!("Skipping {}x{} texture upload: {} bytes of data", width, height, data.len());
            return;
        };
        if extent != (width, height) {
            log::warn!(
                "Downscaled {}x{} texture to {}x{} to fit device limits",
                width, height, extent.0, extent.1
            );
        }
        self.queue.write_texture(
            texture.as_image_copy(),
            &texels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(extent.0 * 4),
                rows_per_image: Some(extent.1),
            },
            wgpu::Extent3d {
                width: extent.0,
                height: extent.1,
                depth_or_array_layers: 1,
            },
        );
    }

    fn create_sampler(&mut self, desc: &SamplerDescriptor) -> BackendResult<SamplerHandle> {
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: desc.label.as_deref(),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let id = self.allocate_id();
        self.samplers.insert(id, sampler);
        Ok(SamplerHandle(id))
    }

    fn create_bind_group_layout(
        &mut self,
        entries: &[BindGroupLayoutEntry],
    ) -> BackendResult<BindGroupLayoutHandle> {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = entries
            .iter()
            .map(|entry| wgpu::BindGroupLayoutEntry {
                binding: entry.binding,
                visibility: convert::shader_stages(entry.visibility),
                ty: convert::binding_type(entry.ty),
                count: None,
            })
            .collect();
        let layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: None,
                entries: &entries,
            });
        let id = self.allocate_id();
        self.layouts.insert(id, layout);
        Ok(BindGroupLayoutHandle(id))
    }

    fn create_bind_group(
        &mut self,
        layout: BindGroupLayoutHandle,
        entries: &[(u32, BindGroupEntry)],
    ) -> BackendResult<BindGroupHandle> {
        let layout = self
            .layouts
            .get(&layout.0)
            .ok_or_else(|| BackendError::InvalidHandle(format!("bind group layout {}", layout.0)))?;

        let mut resources = Vec::with_capacity(entries.len());
        for (binding, entry) in entries {
            let resource = match entry {
                BindGroupEntry::Buffer { buffer, offset, size } => {
                    self.buffer_binding(*buffer, *offset, *size)?
                }
                BindGroupEntry::Texture(view) => self
                    .views
                    .get(&view.0)
                    .map(|(view, _)| wgpu::BindingResource::TextureView(view))
                    .ok_or_else(|| BackendError::InvalidHandle(format!("texture view {}", view.0)))?,
                BindGroupEntry::Sampler(sampler) => self
                    .samplers
                    .get(&sampler.0)
                    .map(wgpu::BindingResource::Sampler)
                    .ok_or_else(|| BackendError::InvalidHandle(format!("sampler {}", sampler.0)))?,
            };
            resources.push(wgpu::BindGroupEntry {
                binding: *binding,
                resource,
            });
        }

        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout,
            entries: &resources,
        });
        let id = self.allocate_id();
        self.bind_groups.insert(id, group);
        Ok(BindGroupHandle(id))
    }

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor,
    ) -> BackendResult<RenderPipelineHandle> {
        let label = desc.label.as_deref().unwrap_or("pipeline");
        let layouts = desc
            .bind_group_layouts
            .iter()
            .map(|handle| self.layouts.get(&handle.0))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                BackendError::PipelineCreationFailed(format!("{}: unknown bind group layout", label))
            })?;

        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: desc.label.as_deref(),
                source: wgpu::ShaderSource::Wgsl(desc.shader.as_str().into()),
            });
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: desc.label.as_deref(),
                bind_group_layouts: &layouts,
                push_constant_ranges: &[],
            });

        // Attributes are collected first so the buffer layouts can borrow them
        let attributes: Vec<Vec<wgpu::VertexAttribute>> = desc
            .vertex_layouts
            .iter()
            .map(|layout| {
                layout
                    .attributes
                    .iter()
                    .map(|attr| wgpu::VertexAttribute {
                        format: convert::vertex_format(attr.format),
                        offset: attr.offset,
                        shader_location: attr.location,
                    })
                    .collect()
            })
            .collect();
        let buffers: Vec<wgpu::VertexBufferLayout> = desc
            .vertex_layouts
            .iter()
            .zip(&attributes)
            .map(|(layout, attributes)| wgpu::VertexBufferLayout {
                array_stride: layout.array_stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();

        let targets: Vec<Option<wgpu::ColorTargetState>> = desc
            .color_targets
            .iter()
            .map(|target| {
                Some(wgpu::ColorTargetState {
                    format: convert::texture_format(target.format),
                    blend: convert::blend(target.blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: desc.label.as_deref(),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: "vs_main",
                    buffers: &buffers,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: "fs_main",
                    targets: &targets,
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    cull_mode: convert::cull_mode(desc.cull_mode),
                    ..Default::default()
                },
                depth_stencil: desc.depth.as_ref().map(|depth| wgpu::DepthStencilState {
                    format: convert::texture_format(depth.format),
                    depth_write_enabled: depth.write_enabled,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: desc.sample_count.max(1),
                    ..Default::default()
                },
                multiview: None,
            });

        let id = self.allocate_id();
        self.pipelines.insert(id, pipeline);
        Ok(RenderPipelineHandle(id))
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor) {
        self.recording = Some(RecordingPass {
            descriptor: desc.clone(),
            commands: Vec::new(),
        });
    }

    fn end_render_pass(&mut self) {
        let Some(recorded) = self.recording.take() else {
            return;
        };
        let Some(mut encoder) = self.encoder.take() else {
            log::warn!("Render pass {:?} recorded outside a frame", recorded.descriptor.label);
            return;
        };

        let swapchain = self.swapchain_view();
        let desc = &recorded.descriptor;

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = desc
            .color_attachments
            .iter()
            .map(|attachment| {
                let view = self.view(attachment.view, swapchain.as_ref())?;
                let resolve_target = match attachment.resolve_target {
                    Some(handle) => Some(self.view(handle, swapchain.as_ref())?),
                    None => None,
                };
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: convert::color_load(&attachment.load_op),
                        store: convert::store(attachment.store_op),
                    },
                })
            })
            .collect();

        let depth_stencil_attachment = desc.depth_stencil_attachment.as_ref().and_then(|depth| {
            Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.view(depth.view, swapchain.as_ref())?,
                depth_ops: Some(wgpu::Operations {
                    load: convert::depth_load(&depth.depth_load_op, depth.depth_clear_value),
                    store: convert::store(depth.depth_store_op),
                }),
                stencil_ops: None,
            })
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: desc.label.as_deref(),
                color_attachments: &color_attachments,
                depth_stencil_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.replay(&mut pass, &recorded.commands);
        }

        self.encoder = Some(encoder);
    }

    fn set_render_pipeline(&mut self, pipeline: RenderPipelineHandle) {
        self.record(PassCommand::Pipeline(pipeline));
    }

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupHandle) {
        self.record(PassCommand::BindGroup(index, bind_group));
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, offset: u64) {
        self.record(PassCommand::VertexBuffer { slot, buffer, offset });
    }

    fn set_index_buffer(&mut self, buffer: BufferHandle, offset: u64) {
        self.record(PassCommand::IndexBuffer { buffer, offset });
    }

    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32, min_depth: f32, max_depth: f32) {
        self.record(PassCommand::Viewport {
            x,
            y,
            width,
            height,
            depth: min_depth..max_depth,
        });
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.record(PassCommand::Draw { vertices, instances });
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.record(PassCommand::DrawIndexed {
            indices,
            base_vertex,
            instances,
        });
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if let Some(buffer) = self.buffers.remove(&buffer.0) {
            buffer.destroy();
        }
    }

    fn destroy_bind_group(&mut self, bind_group: BindGroupHandle) {
        self.bind_groups.remove(&bind_group.0);
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.views.retain(|_, (_, owner)| *owner != texture.0);
        if let Some(texture) = self.textures.remove(&texture.0) {
            texture.destroy();
        }
    }
}

// Access for the egui overlay renderer
impl WgpuBackend {
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn wgpu_surface_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    /// Device, queue and the frame encoder together, so external renderers
    /// can borrow all three at once. The encoder is `None` outside a frame.
    pub fn device_queue_encoder(
        &mut self,
    ) -> (&wgpu::Device, &wgpu::Queue, Option<&mut wgpu::CommandEncoder>) {
        (&self.device, &self.queue, self.encoder.as_mut())
    }

    /// Draw egui paint jobs over whatever `target` already holds.
    pub fn render_egui(
        &mut self,
        renderer: &egui_wgpu::Renderer,
        paint_jobs: &[egui::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
        target: TextureViewHandle,
    ) {
        let swapchain = self.swapchain_view();
        let Some(mut encoder) = self.encoder.take() else {
            return;
        };

        if let Some(view) = self.view(target, swapchain.as_ref()) {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Panel Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            renderer.render(&mut pass, paint_jobs, screen_descriptor);
        }

        self.encoder = Some(encoder);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_extent_within_limits() {
        assert_eq!(clamp_extent(1920, 1080, 8192), (1920, 1080));
        assert_eq!(clamp_extent(0, 0, 8192), (1, 1));
    }

    #[test]
    fn test_clamp_extent_keeps_aspect() {
        assert_eq!(clamp_extent(16384, 8192, 8192), (8192, 4096));
        assert_eq!(clamp_extent(4096, 16384, 8192), (2048, 8192));
    }

    #[test]
    fn test_depth_multisample_needs_no_resolve() {
        use wgpu::TextureFormatFeatureFlags as Flags;
        let depth = Flags::MULTISAMPLE_X4;
        assert!(multisample_allowed(depth, 4, false));
        assert!(!multisample_allowed(depth, 4, true));
        assert!(multisample_allowed(depth | Flags::MULTISAMPLE_RESOLVE, 4, true));
        assert!(!multisample_allowed(Flags::MULTISAMPLE_RESOLVE, 4, true));
        assert!(multisample_allowed(Flags::empty(), 1, true));
    }

    #[test]
    fn test_oversized_texels_are_downscaled() {
        let data = vec![255u8; 8 * 4 * 4];
        let fitted = fit_texels(&data, (8, 4), (4, 2)).unwrap();
        assert_eq!(fitted.len(), 4 * 2 * 4);
        assert!(fitted.iter().all(|&b| b == 255));

        let exact = fit_texels(&data, (8, 4), (8, 4)).unwrap();
        assert!(matches!(exact, Cow::Borrowed(_)));
        assert!(fit_texels(&data[..10], (8, 4), (8, 4)).is_none());
        assert!(fit_texels(&data[..10], (8, 4), (4, 2)).is_none());
    }
}
