//! Descriptor conversions into wgpu types

use crate::backend::traits::*;
use crate::backend::types::*;

pub(super) fn texture_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        TextureFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        TextureFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
        TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        TextureFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
    }
}

/// Surface formats outside our set report as sRGB BGRA, the common default.
pub(super) fn surface_format(format: wgpu::TextureFormat) -> TextureFormat {
    match format {
        wgpu::TextureFormat::Rgba8Unorm => TextureFormat::Rgba8Unorm,
        wgpu::TextureFormat::Rgba8UnormSrgb => TextureFormat::Rgba8UnormSrgb,
        wgpu::TextureFormat::Bgra8Unorm => TextureFormat::Bgra8Unorm,
        wgpu::TextureFormat::Rgba16Float => TextureFormat::Rgba16Float,
        _ => TextureFormat::Bgra8UnormSrgb,
    }
}

pub(super) fn buffer_usage(usage: BufferUsage) -> wgpu::BufferUsages {
    [
        (BufferUsage::COPY_DST, wgpu::BufferUsages::COPY_DST),
        (BufferUsage::INDEX, wgpu::BufferUsages::INDEX),
        (BufferUsage::VERTEX, wgpu::BufferUsages::VERTEX),
        (BufferUsage::UNIFORM, wgpu::BufferUsages::UNIFORM),
    ]
    .into_iter()
    .filter(|(ours, _)| usage.contains(*ours))
    .fold(wgpu::BufferUsages::empty(), |acc, (_, theirs)| acc | theirs)
}

pub(super) fn texture_usage(usage: TextureUsage) -> wgpu::TextureUsages {
    [
        (TextureUsage::COPY_DST, wgpu::TextureUsages::COPY_DST),
        (TextureUsage::TEXTURE_BINDING, wgpu::TextureUsages::TEXTURE_BINDING),
        (TextureUsage::RENDER_ATTACHMENT, wgpu::TextureUsages::RENDER_ATTACHMENT),
    ]
    .into_iter()
    .filter(|(ours, _)| usage.contains(*ours))
    .fold(wgpu::TextureUsages::empty(), |acc, (_, theirs)| acc | theirs)
}

pub(super) fn shader_stages(stages: ShaderStageFlags) -> wgpu::ShaderStages {
    let mut result = wgpu::ShaderStages::empty();
    if stages.contains(ShaderStageFlags::VERTEX) {
        result |= wgpu::ShaderStages::VERTEX;
    }
    if stages.contains(ShaderStageFlags::FRAGMENT) {
        result |= wgpu::ShaderStages::FRAGMENT;
    }
    result
}

pub(super) fn binding_type(ty: BindingType) -> wgpu::BindingType {
    match ty {
        BindingType::UniformBuffer => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        BindingType::Texture => wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        BindingType::Sampler => wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
    }
}

pub(super) fn vertex_format(format: VertexFormat) -> wgpu::VertexFormat {
    match format {
        VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
    }
}

pub(super) fn blend(mode: BlendMode) -> Option<wgpu::BlendState> {
    match mode {
        BlendMode::Replace => None,
        BlendMode::Additive => Some(wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent::REPLACE,
        }),
    }
}

pub(super) fn cull_mode(mode: CullMode) -> Option<wgpu::Face> {
    match mode {
        CullMode::None => None,
        CullMode::Back => Some(wgpu::Face::Back),
    }
}

pub(super) fn color_load(op: &LoadOp) -> wgpu::LoadOp<wgpu::Color> {
    match op {
        LoadOp::Clear([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
            r: *r as f64,
            g: *g as f64,
            b: *b as f64,
            a: *a as f64,
        }),
        LoadOp::Load => wgpu::LoadOp::Load,
    }
}

pub(super) fn depth_load(op: &LoadOp, clear_value: f32) -> wgpu::LoadOp<f32> {
    match op {
        LoadOp::Clear(_) => wgpu::LoadOp::Clear(clear_value),
        LoadOp::Load => wgpu::LoadOp::Load,
    }
}

pub(super) fn store(op: StoreOp) -> wgpu::StoreOp {
    match op {
        StoreOp::Store => wgpu::StoreOp::Store,
        StoreOp::Discard => wgpu::StoreOp::Discard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_flags_map_one_to_one() {
        let usage = buffer_usage(BufferUsage::UNIFORM | BufferUsage::COPY_DST);
        assert_eq!(usage, wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST);

        let usage = texture_usage(TextureUsage::RENDER_ATTACHMENT);
        assert_eq!(usage, wgpu::TextureUsages::RENDER_ATTACHMENT);
    }

    #[test]
    fn test_unknown_surface_format_falls_back_to_srgb() {
        assert_eq!(
            surface_format(wgpu::TextureFormat::Rgba8UnormSrgb),
            TextureFormat::Rgba8UnormSrgb
        );
        assert_eq!(
            surface_format(wgpu::TextureFormat::Rgb10a2Unorm),
            TextureFormat::Bgra8UnormSrgb
        );
    }

    #[test]
    fn test_replace_blend_disables_blending() {
        assert!(blend(BlendMode::Replace).is_none());
        assert!(blend(BlendMode::Additive).is_some());
    }
}
