//! Output pass: presents the render target on the swapchain
//!
//! Always the last pass. Encodes to sRGB in the shader when the swapchain
//! format does not do it in hardware.

use bytemuck::{Pod, Zeroable};

use super::{draw_fullscreen, fullscreen_bind_group, fullscreen_layout, fullscreen_pipeline, linear_sampler};
use crate::backend::traits::*;
use crate::backend::types::*;
use crate::pipeline::pass::*;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct OutputUniformData {
    /// x: apply sRGB encoding in the shader
    params: [f32; 4],
}

struct OutputResources {
    layout: BindGroupLayoutHandle,
    sampler: SamplerHandle,
    pipeline: RenderPipelineHandle,
    uniforms: BufferHandle,
}

#[derive(Default)]
pub struct OutputPass {
    resources: Option<OutputResources>,
    bind_group: Option<BindGroupHandle>,
}

impl OutputPass {
    pub fn new() -> Self {
        Self::default()
    }

    fn create_resources(backend: &mut dyn GraphicsBackend) -> BackendResult<OutputResources> {
        let format = backend.swapchain_format();
        let layout = fullscreen_layout(backend)?;
        let sampler = linear_sampler(backend, "Output Sampler")?;
        let pipeline = fullscreen_pipeline(backend, "Output", OUTPUT_SHADER, layout, format, BlendMode::Replace)?;

        let encode = if format.is_srgb() { 0.0 } else { 1.0 };
        let uniforms = backend.create_buffer_init(
            &BufferDescriptor {
                label: Some("Output Uniforms".into()),
                size: std::mem::size_of::<OutputUniformData>() as u64,
                usage: BufferUsage::UNIFORM,
            },
            bytemuck::bytes_of(&OutputUniformData {
                params: [encode, 0.0, 0.0, 0.0],
            }),
        )?;

        Ok(OutputResources {
            layout,
            sampler,
            pipeline,
            uniforms,
        })
    }
}

impl RenderPass for OutputPass {
    fn name(&self) -> &'static str {
        "Output"
    }

    fn setup(&mut self, ctx: &mut PassSetupContext) -> BackendResult<()> {
        if self.resources.is_none() {
            self.resources = Some(Self::create_resources(&mut *ctx.backend)?);
        }
        if let Some(old) = self.bind_group.take() {
            ctx.backend.destroy_bind_group(old);
        }
        if let Some(res) = &self.resources {
            self.bind_group = Some(fullscreen_bind_group(
                &mut *ctx.backend,
                res.layout,
                ctx.target.sampled_view(),
                res.sampler,
                res.uniforms,
            )?);
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &mut PassExecuteContext) -> BackendResult<()> {
        let (Some(res), Some(bind_group)) = (&self.resources, self.bind_group) else {
            return Ok(());
        };
        let size = ctx.backend.surface_size();
        draw_fullscreen(
            &mut *ctx.backend,
            "Output Pass",
            ColorAttachment {
                view: ctx.swapchain_view,
                resolve_target: None,
                load_op: LoadOp::Clear([0.0, 0.0, 0.0, 1.0]),
                store_op: StoreOp::Store,
            },
            res.pipeline,
            bind_group,
            size,
        );
        Ok(())
    }

    fn release(&mut self, backend: &mut dyn GraphicsBackend) {
        if let Some(bind_group) = self.bind_group.take() {
            backend.destroy_bind_group(bind_group);
        }
        if let Some(res) = self.resources.take() {
            backend.destroy_buffer(res.uniforms);
        }
    }
}

const OUTPUT_SHADER: &str = r#"
struct OutputParams {
    params: vec4<f32>,
}

@group(0) @binding(0) var target_texture: texture_2d<f32>;
@group(0) @binding(1) var target_sampler: sampler;
@group(0) @binding(2) var<uniform> output_params: OutputParams;

fn linear_to_srgb(c: vec3<f32>) -> vec3<f32> {
    let low = c * 12.92;
    let high = 1.055 * pow(c, vec3<f32>(1.0 / 2.4)) - 0.055;
    return select(high, low, c <= vec3<f32>(0.0031308));
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let color = clamp(textureSample(target_texture, target_sampler, input.uv).rgb, vec3<f32>(0.0), vec3<f32>(1.0));
    let encoded = select(color, linear_to_srgb(color), output_params.params.x > 0.5);
    return vec4<f32>(encoded, 1.0);
}
"#;
