//! Scene pass: draws the bound scene into the render target
//!
//! The pass always runs first and replaces the target contents. GPU copies
//! of meshes, textures and per-node uniforms are built lazily and rebuilt
//! whenever the scene revision changes.

use std::collections::HashMap;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::pipeline::pass::*;
use crate::pipeline::target::{DEPTH_FORMAT, TARGET_FORMAT};
use crate::resources::{GpuMesh, GpuTexture, MaterialDescriptor, TextureData, TextureKey, Vertex};
use crate::scene::{CameraUniformData, Scene, TransformUniformData};

/// One node ready to draw
struct GpuDraw {
    mesh: usize,
    double_sided: bool,
    bind_group: BindGroupHandle,
}

/// GPU copy of one scene revision
#[derive(Default)]
struct GpuScene {
    revision: u64,
    meshes: Vec<GpuMesh>,
    textures: HashMap<TextureKey, GpuTexture>,
    buffers: Vec<BufferHandle>,
    draws: Vec<GpuDraw>,
}

impl GpuScene {
    fn destroy(self, backend: &mut dyn GraphicsBackend) {
        for mesh in self.meshes {
            mesh.destroy(backend);
        }
        for (_, texture) in self.textures {
            texture.destroy(backend);
        }
        for buffer in self.buffers {
            backend.destroy_buffer(buffer);
        }
        for draw in self.draws {
            backend.destroy_bind_group(draw.bind_group);
        }
    }
}

struct Pipelines {
    single_sided: RenderPipelineHandle,
    double_sided: RenderPipelineHandle,
    object_layout: BindGroupLayoutHandle,
    camera_buffer: BufferHandle,
    camera_bind_group: BindGroupHandle,
    sampler: SamplerHandle,
    fallback: GpuTexture,
}

/// Pass 0 of every frame
#[derive(Default)]
pub struct ScenePass {
    pipelines: Option<Pipelines>,
    gpu: Option<GpuScene>,
}

impl ScenePass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes drawn per frame for the uploaded revision
    pub fn draw_count(&self) -> usize {
        self.gpu.as_ref().map_or(0, |gpu| gpu.draws.len())
    }

    fn create_pipelines(
        backend: &mut dyn GraphicsBackend,
        sample_count: u32,
    ) -> BackendResult<Pipelines> {
        let camera_layout = backend.create_bind_group_layout(&[BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStageFlags::VERTEX_FRAGMENT,
            ty: BindingType::UniformBuffer,
        }])?;

        let object_layout = backend.create_bind_group_layout(&[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStageFlags::VERTEX,
                ty: BindingType::UniformBuffer,
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStageFlags::FRAGMENT,
                ty: BindingType::UniformBuffer,
            },
            BindGroupLayoutEntry {
                binding: 2,
                visibility: ShaderStageFlags::FRAGMENT,
                ty: BindingType::Texture,
            },
            BindGroupLayoutEntry {
                binding: 3,
                visibility: ShaderStageFlags::FRAGMENT,
                ty: BindingType::Sampler,
            },
        ])?;

        let mut pipeline = |label: &str, cull_mode: CullMode| {
            backend.create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(label.to_string()),
                shader: SCENE_SHADER.to_string(),
                vertex_layouts: vec![Vertex::layout()],
                bind_group_layouts: vec![camera_layout, object_layout],
                cull_mode,
                depth: Some(DepthState {
                    format: DEPTH_FORMAT,
                    write_enabled: true,
                }),
                color_targets: vec![ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: BlendMode::Replace,
                }],
                sample_count,
            })
        };
        let single_sided = pipeline("Scene Single-Sided", CullMode::Back)?;
        let double_sided = pipeline("Scene Double-Sided", CullMode::None)?;

        let camera_buffer = backend.create_buffer(&BufferDescriptor {
            label: Some("Camera Uniforms".into()),
            size: std::mem::size_of::<CameraUniformData>() as u64,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        })?;
        let camera_bind_group = backend.create_bind_group(
            camera_layout,
            &[(
                0,
                BindGroupEntry::Buffer {
                    buffer: camera_buffer,
                    offset: 0,
                    size: None,
                },
            )],
        )?;

        let sampler = backend.create_sampler(&SamplerDescriptor {
            label: Some("Baked Sampler".into()),
            ..Default::default()
        })?;
        let fallback = GpuTexture::create(backend, &TextureData::white())?;

        Ok(Pipelines {
            single_sided,
            double_sided,
            object_layout,
            camera_buffer,
            camera_bind_group,
            sampler,
            fallback,
        })
    }

    /// Upload the current scene revision if it is not on the GPU yet.
    fn sync(&mut self, backend: &mut dyn GraphicsBackend, scene: &Scene) -> BackendResult<()> {
        if self
            .gpu
            .as_ref()
            .is_some_and(|gpu| gpu.revision == scene.revision())
        {
            return Ok(());
        }
        let Some(pipelines) = self.pipelines.as_ref() else {
            return Ok(());
        };

        if let Some(old) = self.gpu.take() {
            old.destroy(backend);
        }

        let mut gpu = GpuScene {
            revision: scene.revision(),
            ..Default::default()
        };

        // Keep a partial upload so its resources are still released.
        let result = upload(backend, scene, pipelines, &mut gpu);
        self.gpu = Some(gpu);
        result
    }
}

fn upload(
    backend: &mut dyn GraphicsBackend,
    scene: &Scene,
    pipelines: &Pipelines,
    gpu: &mut GpuScene,
) -> BackendResult<()> {
    let Some(graph) = scene.graph() else {
        return Ok(());
    };

    for (key, data) in scene.textures() {
        gpu.textures
            .insert(key.clone(), GpuTexture::create(backend, data)?);
    }
    for mesh in graph.meshes() {
        gpu.meshes.push(GpuMesh::upload(backend, mesh)?);
    }

    for item in graph.draw_items() {
        let Some(material) = item.material.as_deref() else {
            log::warn!(
                "Node '{}' has no material and will not be drawn",
                graph.node(item.node).name
            );
            continue;
        };

        let texture_view = texture_view_for(material, &gpu.textures, &pipelines.fallback);

        let object_buffer = backend.create_buffer_init(
            &BufferDescriptor {
                label: Some(format!("{} Transform", graph.node(item.node).name)),
                size: std::mem::size_of::<TransformUniformData>() as u64,
                usage: BufferUsage::UNIFORM,
            },
            bytemuck::bytes_of(&TransformUniformData::from_world(item.world)),
        )?;
        gpu.buffers.push(object_buffer);

        let material_buffer = backend.create_buffer_init(
            &BufferDescriptor {
                label: Some(format!("{} Material", material.role)),
                size: std::mem::size_of::<crate::resources::MaterialUniformData>() as u64,
                usage: BufferUsage::UNIFORM,
            },
            bytemuck::bytes_of(&material.uniform_data()),
        )?;
        gpu.buffers.push(material_buffer);

        let bind_group = backend.create_bind_group(
            pipelines.object_layout,
            &[
                (
                    0,
                    BindGroupEntry::Buffer {
                        buffer: object_buffer,
                        offset: 0,
                        size: None,
                    },
                ),
                (
                    1,
                    BindGroupEntry::Buffer {
                        buffer: material_buffer,
                        offset: 0,
                        size: None,
                    },
                ),
                (2, BindGroupEntry::Texture(texture_view)),
                (3, BindGroupEntry::Sampler(pipelines.sampler)),
            ],
        )?;

        gpu.draws.push(GpuDraw {
            mesh: item.mesh.0,
            double_sided: material.double_sided,
            bind_group,
        });
    }

    log::info!(
        "Uploaded scene revision {} ({} draws, {} textures)",
        gpu.revision,
        gpu.draws.len(),
        gpu.textures.len()
    );
    Ok(())
}

fn texture_view_for(
    material: &MaterialDescriptor,
    textures: &HashMap<TextureKey, GpuTexture>,
    fallback: &GpuTexture,
) -> TextureViewHandle {
    match material.texture() {
        Some(key) => match textures.get(key) {
            Some(texture) => texture.view,
            None => {
                log::warn!("Texture '{}' not loaded for material {}", key.as_str(), material.role);
                fallback.view
            }
        },
        None => fallback.view,
    }
}

impl RenderPass for ScenePass {
    fn name(&self) -> &'static str {
        "Scene Pass"
    }

    fn setup(&mut self, ctx: &mut PassSetupContext) -> BackendResult<()> {
        // Only the sample count matters here and it never changes after
        // construction.
        if self.pipelines.is_none() {
            self.pipelines = Some(Self::create_pipelines(&mut *ctx.backend, ctx.target.sample_count())?);
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &mut PassExecuteContext) -> BackendResult<()> {
        self.sync(&mut *ctx.backend, ctx.scene)?;

        let backend = &mut *ctx.backend;
        let (width, height) = ctx.target.size();

        if let Some(pipelines) = &self.pipelines {
            backend.write_buffer(
                pipelines.camera_buffer,
                0,
                bytemuck::bytes_of(&ctx.camera.uniform_data()),
            );
        }

        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("Scene Pass".into()),
            color_attachments: vec![ctx
                .target
                .color_attachment(LoadOp::Clear(ctx.params.clear_color.to_clear()))],
            depth_stencil_attachment: Some(ctx.target.depth_attachment()),
        });
        backend.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);

        if let (Some(pipelines), Some(gpu)) = (&self.pipelines, &self.gpu) {
            if ctx.scene.is_loaded() {
                backend.set_bind_group(0, pipelines.camera_bind_group);
                for draw in &gpu.draws {
                    let Some(mesh) = gpu.meshes.get(draw.mesh) else {
                        continue;
                    };
                    backend.set_render_pipeline(if draw.double_sided {
                        pipelines.double_sided
                    } else {
                        pipelines.single_sided
                    });
                    backend.set_bind_group(1, draw.bind_group);
                    backend.set_vertex_buffer(0, mesh.vertex_buffer, 0);
                    backend.set_index_buffer(mesh.index_buffer, 0);
                    backend.draw_indexed(0..mesh.index_count, 0, 0..1);
                }
            }
        }

        backend.end_render_pass();
        Ok(())
    }

    fn release(&mut self, backend: &mut dyn GraphicsBackend) {
        if let Some(gpu) = self.gpu.take() {
            gpu.destroy(backend);
        }
        if let Some(pipelines) = self.pipelines.take() {
            backend.destroy_bind_group(pipelines.camera_bind_group);
            backend.destroy_buffer(pipelines.camera_buffer);
            pipelines.fallback.destroy(backend);
        }
    }
}

pub const SCENE_SHADER: &str = r#"
struct CameraUniforms {
    view_proj: mat4x4<f32>,
    position: vec4<f32>,
    near_far: vec4<f32>,
}

struct ObjectUniforms {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
}

struct MaterialUniforms {
    color: vec4<f32>,
    // x: sample the baked texture
    params: vec4<f32>,
}

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@group(0) @binding(0) var<uniform> camera: CameraUniforms;
@group(1) @binding(0) var<uniform> object: ObjectUniforms;
@group(1) @binding(1) var<uniform> material: MaterialUniforms;
@group(1) @binding(2) var baked_texture: texture_2d<f32>;
@group(1) @binding(3) var baked_sampler: sampler;

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var output: VertexOutput;
    output.clip_position = camera.view_proj * object.model * vec4<f32>(input.position, 1.0);
    output.uv = input.uv;
    return output;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(baked_texture, baked_sampler, input.uv);
    let color = mix(material.color, texel, material.params.x);
    return vec4<f32>(color.rgb, 1.0);
}
"#;
