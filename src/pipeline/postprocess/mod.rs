//! Post-processing effects

mod bloom;
mod output;

pub use bloom::{BloomPass, BloomUniformData};
pub use output::OutputPass;

use crate::backend::traits::*;
use crate::backend::types::*;

/// Common fullscreen quad shader
pub const FULLSCREEN_VERTEX_SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    var output: VertexOutput;

    // Generate fullscreen triangle
    let x = f32((vertex_index << 1u) & 2u);
    let y = f32(vertex_index & 2u);

    output.position = vec4<f32>(x * 2.0 - 1.0, y * 2.0 - 1.0, 0.0, 1.0);
    output.uv = vec2<f32>(x, 1.0 - y);

    return output;
}
"#;

/// Layout shared by every fullscreen effect: source texture, sampler and
/// one uniform block.
pub(crate) fn fullscreen_layout(
    backend: &mut dyn GraphicsBackend,
) -> BackendResult<BindGroupLayoutHandle> {
    backend.create_bind_group_layout(&[
        BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStageFlags::FRAGMENT,
            ty: BindingType::Texture,
        },
        BindGroupLayoutEntry {
            binding: 1,
            visibility: ShaderStageFlags::FRAGMENT,
            ty: BindingType::Sampler,
        },
        BindGroupLayoutEntry {
            binding: 2,
            visibility: ShaderStageFlags::FRAGMENT,
            ty: BindingType::UniformBuffer,
        },
    ])
}

pub(crate) fn fullscreen_bind_group(
    backend: &mut dyn GraphicsBackend,
    layout: BindGroupLayoutHandle,
    source: TextureViewHandle,
    sampler: SamplerHandle,
    uniforms: BufferHandle,
) -> BackendResult<BindGroupHandle> {
    backend.create_bind_group(
        layout,
        &[
            (0, BindGroupEntry::Texture(source)),
            (1, BindGroupEntry::Sampler(sampler)),
            (
                2,
                BindGroupEntry::Buffer {
                    buffer: uniforms,
                    offset: 0,
                    size: None,
                },
            ),
        ],
    )
}

/// Pipeline drawing one fullscreen triangle with `fragment` (which must
/// define `fs_main`).
pub(crate) fn fullscreen_pipeline(
    backend: &mut dyn GraphicsBackend,
    label: &str,
    fragment: &str,
    layout: BindGroupLayoutHandle,
    format: TextureFormat,
    blend: BlendMode,
) -> BackendResult<RenderPipelineHandle> {
    backend.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(label.to_string()),
        shader: format!("{}{}", FULLSCREEN_VERTEX_SHADER, fragment),
        vertex_layouts: Vec::new(),
        bind_group_layouts: vec![layout],
        cull_mode: CullMode::None,
        depth: None,
        color_targets: vec![ColorTargetState { format, blend }],
        sample_count: 1,
    })
}

/// Record one fullscreen draw as its own render pass.
pub(crate) fn draw_fullscreen(
    backend: &mut dyn GraphicsBackend,
    label: &str,
    attachment: ColorAttachment,
    pipeline: RenderPipelineHandle,
    bind_group: BindGroupHandle,
    (width, height): (u32, u32),
) {
    backend.begin_render_pass(&RenderPassDescriptor {
        label: Some(label.to_string()),
        color_attachments: vec![attachment],
        depth_stencil_attachment: None,
    });
    backend.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
    backend.set_render_pipeline(pipeline);
    backend.set_bind_group(0, bind_group);
    backend.draw(0..3, 0..1);
    backend.end_render_pass();
}

pub(crate) fn linear_sampler(
    backend: &mut dyn GraphicsBackend,
    label: &str,
) -> BackendResult<SamplerHandle> {
    backend.create_sampler(&SamplerDescriptor {
        label: Some(label.to_string()),
        ..Default::default()
    })
}
