//! Bloom post-processing effect
//!
//! Four stages at half resolution: bright-pass extraction at `threshold`,
//! a separable blur whose tap spacing scales with `radius`, then an
//! additive composite of the blurred light back into the target, scaled by
//! `strength`.

use bytemuck::{Pod, Zeroable};

use super::{
    draw_fullscreen, fullscreen_bind_group, fullscreen_layout, fullscreen_pipeline, linear_sampler,
};
use crate::backend::traits::*;
use crate::backend::types::*;
use crate::pipeline::pass::*;
use crate::pipeline::target::TARGET_FORMAT;
use crate::pipeline::PipelineParameters;

pub const EXTRACT_STAGE: &str = "Bloom Extract";
pub const BLUR_H_STAGE: &str = "Bloom Blur H";
pub const BLUR_V_STAGE: &str = "Bloom Blur V";
pub const COMPOSITE_STAGE: &str = "Bloom Composite";

const BLOOM_SCALE: f32 = 0.5;

/// Uniforms shared by every bloom stage
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct BloomUniformData {
    pub texel_size: [f32; 2],
    pub direction: [f32; 2],
    pub threshold: f32,
    pub strength: f32,
    pub radius: f32,
    pub _padding: f32,
}

impl BloomUniformData {
    pub fn new(params: &PipelineParameters, (width, height): (u32, u32), direction: [f32; 2]) -> Self {
        Self {
            texel_size: [1.0 / width.max(1) as f32, 1.0 / height.max(1) as f32],
            direction,
            threshold: params.bloom_threshold,
            strength: params.bloom_strength,
            radius: params.bloom_radius,
            _padding: 0.0,
        }
    }
}

struct Stage {
    pipeline: RenderPipelineHandle,
    uniforms: BufferHandle,
    bind_group: Option<BindGroupHandle>,
}

struct BloomResources {
    layout: BindGroupLayoutHandle,
    sampler: SamplerHandle,
    extract: Stage,
    blur_h: Stage,
    blur_v: Stage,
    composite: Stage,
}

/// Bloom post-processing pass
#[derive(Default)]
pub struct BloomPass {
    resources: Option<BloomResources>,
    /// Ping-pong pair at half resolution
    ping: Option<PassTexture>,
    pong: Option<PassTexture>,
}

impl BloomPass {
    pub fn new() -> Self {
        Self::default()
    }

    fn create_resources(backend: &mut dyn GraphicsBackend) -> BackendResult<BloomResources> {
        let layout = fullscreen_layout(backend)?;
        let sampler = linear_sampler(backend, "Bloom Sampler")?;

        let mut stage = |label: &str,
                         fragment: &str,
                         format: TextureFormat,
                         blend: BlendMode|
         -> BackendResult<Stage> {
            let pipeline = fullscreen_pipeline(backend, label, fragment, layout, format, blend)?;
            let uniforms = backend.create_buffer(&BufferDescriptor {
                label: Some(format!("{} Uniforms", label)),
                size: std::mem::size_of::<BloomUniformData>() as u64,
                usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
            })?;
            Ok(Stage {
                pipeline,
                uniforms,
                bind_group: None,
            })
        };

        let hdr = TextureFormat::Rgba16Float;
        Ok(BloomResources {
            extract: stage(EXTRACT_STAGE, BLOOM_EXTRACT_SHADER, hdr, BlendMode::Replace)?,
            blur_h: stage(BLUR_H_STAGE, BLOOM_BLUR_SHADER, hdr, BlendMode::Replace)?,
            blur_v: stage(BLUR_V_STAGE, BLOOM_BLUR_SHADER, hdr, BlendMode::Replace)?,
            composite: stage(
                COMPOSITE_STAGE,
                BLOOM_COMPOSITE_SHADER,
                TARGET_FORMAT,
                BlendMode::Additive,
            )?,
            layout,
            sampler,
        })
    }

    fn release_bind_groups(&mut self, backend: &mut dyn GraphicsBackend) {
        let Some(res) = self.resources.as_mut() else {
            return;
        };
        for stage in [&mut res.extract, &mut res.blur_h, &mut res.blur_v, &mut res.composite] {
            if let Some(bind_group) = stage.bind_group.take() {
                backend.destroy_bind_group(bind_group);
            }
        }
    }

    fn release_textures(&mut self, backend: &mut dyn GraphicsBackend) {
        for texture in [self.ping.take(), self.pong.take()].into_iter().flatten() {
            texture.destroy(backend);
        }
    }
}

impl RenderPass for BloomPass {
    fn name(&self) -> &'static str {
        "Bloom"
    }

    fn setup(&mut self, ctx: &mut PassSetupContext) -> BackendResult<()> {
        if self.resources.is_none() {
            self.resources = Some(Self::create_resources(&mut *ctx.backend)?);
        }
        self.release_bind_groups(&mut *ctx.backend);
        self.release_textures(&mut *ctx.backend);

        let half = TextureSize::Relative {
            width_scale: BLOOM_SCALE,
            height_scale: BLOOM_SCALE,
        };
        let usage = TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING;
        let ping = ctx.create_texture_relative("Bloom Ping", half, TextureFormat::Rgba16Float, usage)?;
        let pong = ctx.create_texture_relative("Bloom Pong", half, TextureFormat::Rgba16Float, usage)?;
        self.ping = Some(ping);
        self.pong = Some(pong);

        let Some(res) = self.resources.as_mut() else {
            return Ok(());
        };
        let backend = &mut *ctx.backend;
        let source = ctx.target.sampled_view();

        // Bind groups reference size-dependent views, so rebuild them here.
        res.extract.bind_group = Some(fullscreen_bind_group(
            backend, res.layout, source, res.sampler, res.extract.uniforms,
        )?);
        res.blur_h.bind_group = Some(fullscreen_bind_group(
            backend, res.layout, ping.view, res.sampler, res.blur_h.uniforms,
        )?);
        res.blur_v.bind_group = Some(fullscreen_bind_group(
            backend, res.layout, pong.view, res.sampler, res.blur_v.uniforms,
        )?);
        res.composite.bind_group = Some(fullscreen_bind_group(
            backend, res.layout, ping.view, res.sampler, res.composite.uniforms,
        )?);

        log::debug!("Bloom buffers {}x{}", ping.width, ping.height);
        Ok(())
    }

    fn is_enabled(&self, params: &PipelineParameters) -> bool {
        params.bloom_enabled
    }

    fn execute(&mut self, ctx: &mut PassExecuteContext) -> BackendResult<()> {
        let (Some(res), Some(ping), Some(pong)) = (&self.resources, self.ping, self.pong) else {
            return Ok(());
        };
        let backend = &mut *ctx.backend;
        let half = (ping.width, ping.height);
        let params = ctx.params;

        let stages = [
            (&res.extract, [0.0, 0.0], ping, EXTRACT_STAGE),
            (&res.blur_h, [1.0, 0.0], pong, BLUR_H_STAGE),
            (&res.blur_v, [0.0, 1.0], ping, BLUR_V_STAGE),
        ];

        for (stage, direction, output, label) in stages {
            let Some(bind_group) = stage.bind_group else {
                continue;
            };
            let uniforms = BloomUniformData::new(params, half, direction);
            backend.write_buffer(stage.uniforms, 0, bytemuck::bytes_of(&uniforms));
            draw_fullscreen(
                backend,
                label,
                ColorAttachment {
                    view: output.view,
                    resolve_target: None,
                    load_op: LoadOp::Clear([0.0, 0.0, 0.0, 0.0]),
                    store_op: StoreOp::Store,
                },
                stage.pipeline,
                bind_group,
                half,
            );
        }

        if let Some(bind_group) = res.composite.bind_group {
            let uniforms = BloomUniformData::new(params, half, [0.0, 0.0]);
            backend.write_buffer(res.composite.uniforms, 0, bytemuck::bytes_of(&uniforms));
            draw_fullscreen(
                backend,
                COMPOSITE_STAGE,
                ctx.target.composite_attachment(),
                res.composite.pipeline,
                bind_group,
                ctx.target.size(),
            );
        }

        Ok(())
    }

    fn release(&mut self, backend: &mut dyn GraphicsBackend) {
        self.release_bind_groups(backend);
        self.release_textures(backend);
        if let Some(res) = self.resources.take() {
            for stage in [res.extract, res.blur_h, res.blur_v, res.composite] {
                backend.destroy_buffer(stage.uniforms);
            }
        }
    }
}

pub const BLOOM_EXTRACT_SHADER: &str = r#"
struct BloomParams {
    texel_size: vec2<f32>,
    direction: vec2<f32>,
    threshold: f32,
    strength: f32,
    radius: f32,
    _padding: f32,
}

@group(0) @binding(0) var source_texture: texture_2d<f32>;
@group(0) @binding(1) var source_sampler: sampler;
@group(0) @binding(2) var<uniform> params: BloomParams;

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(source_texture, source_sampler, input.uv);
    let luminance = dot(color.rgb, vec3<f32>(0.2126, 0.7152, 0.0722));
    let weight = smoothstep(params.threshold, params.threshold + 0.01, luminance);
    return vec4<f32>(color.rgb * weight, 1.0);
}
"#;

pub const BLOOM_BLUR_SHADER: &str = r#"
struct BloomParams {
    texel_size: vec2<f32>,
    direction: vec2<f32>,
    threshold: f32,
    strength: f32,
    radius: f32,
    _padding: f32,
}

@group(0) @binding(0) var source_texture: texture_2d<f32>;
@group(0) @binding(1) var source_sampler: sampler;
@group(0) @binding(2) var<uniform> params: BloomParams;

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    var weights = array<f32, 5>(0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216);
    let tap = params.direction * params.texel_size * max(params.radius, 0.0) * 2.0;
    var result = textureSample(source_texture, source_sampler, input.uv).rgb * weights[0];
    for (var i = 1; i < 5; i++) {
        let offset = tap * f32(i);
        result += textureSample(source_texture, source_sampler, input.uv + offset).rgb * weights[i];
        result += textureSample(source_texture, source_sampler, input.uv - offset).rgb * weights[i];
    }
    return vec4<f32>(result, 1.0);
}
"#;

pub const BLOOM_COMPOSITE_SHADER: &str = r#"
struct BloomParams {
    texel_size: vec2<f32>,
    direction: vec2<f32>,
    threshold: f32,
    strength: f32,
    radius: f32,
    _padding: f32,
}

@group(0) @binding(0) var bloom_texture: texture_2d<f32>;
@group(0) @binding(1) var bloom_sampler: sampler;
@group(0) @binding(2) var<uniform> params: BloomParams;

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let bloom = textureSample(bloom_texture, bloom_sampler, input.uv).rgb;
    return vec4<f32>(bloom * params.strength, 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniforms_follow_parameters() {
        let params = PipelineParameters {
            bloom_strength: 0.8,
            bloom_radius: 0.5,
            bloom_threshold: 0.2,
            ..Default::default()
        };
        let data = BloomUniformData::new(&params, (400, 200), [1.0, 0.0]);
        assert_eq!(data.texel_size, [1.0 / 400.0, 1.0 / 200.0]);
        assert_eq!(data.strength, 0.8);
        assert_eq!(data.radius, 0.5);
        assert_eq!(data.threshold, 0.2);
        assert_eq!(std::mem::size_of::<BloomUniformData>(), 32);
    }

    #[test]
    fn test_enabled_only_with_bloom_flag() {
        let pass = BloomPass::new();
        assert!(!pass.is_enabled(&PipelineParameters::default()));
        assert!(pass.is_enabled(&PipelineParameters {
            bloom_enabled: true,
            ..Default::default()
        }));
    }

    #[test]
    fn test_setup_replaces_previous_bind_groups() {
        use crate::backend::dummy::DummyBackend;
        use crate::pipeline::target::{RenderTarget, TargetKind};

        let mut backend = DummyBackend::new(64, 64);
        let mut pass = BloomPass::new();
        for size in [64, 96, 128] {
            let target = RenderTarget::new(&mut backend, TargetKind::Standard, size, size).unwrap();
            let mut ctx = PassSetupContext {
                backend: &mut backend,
                target: &target,
            };
            pass.setup(&mut ctx).unwrap();
            assert_eq!(backend.live_bind_group_count(), 4);
            target.destroy(&mut backend);
        }
        pass.release(&mut backend);
        assert_eq!(backend.live_bind_group_count(), 0);
    }
}
