//! Plain descriptor types passed across [`GraphicsBackend`](super::GraphicsBackend)

/// Pixel formats the viewer renders to or samples from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    /// HDR scene color
    Rgba16Float,
    Depth32Float,
}

impl TextureFormat {
    /// Whether writes are encoded to sRGB by the hardware
    pub fn is_srgb(&self) -> bool {
        matches!(self, Self::Rgba8UnormSrgb | Self::Bgra8UnormSrgb)
    }

    pub fn is_depth(&self) -> bool {
        matches!(self, Self::Depth32Float)
    }
}

macro_rules! usage_flags {
    ($(#[$meta:meta])* $name:ident { $($flag:ident = $bit:expr),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name(u32);

        impl $name {
            $(pub const $flag: Self = Self(1 << $bit);)+

            pub fn contains(&self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }
    };
}

usage_flags! {
    /// How a texture will be used
    TextureUsage {
        COPY_DST = 0,
        TEXTURE_BINDING = 1,
        RENDER_ATTACHMENT = 2,
    }
}

usage_flags! {
    /// How a buffer will be used
    BufferUsage {
        COPY_DST = 0,
        INDEX = 1,
        VERTEX = 2,
        UNIFORM = 3,
    }
}

usage_flags! {
    /// Shader stages a binding is visible to
    ShaderStageFlags {
        VERTEX = 0,
        FRAGMENT = 1,
    }
}

impl ShaderStageFlags {
    pub const VERTEX_FRAGMENT: Self = Self(0b11);
}

/// A 2D texture. Always a single mip level.
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            width: 1,
            height: 1,
            sample_count: 1,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    pub size: u64,
    pub usage: BufferUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    /// Size in bytes
    pub fn size(&self) -> u64 {
        match self {
            Self::Float32x2 => 8,
            Self::Float32x3 => 12,
            Self::Float32x4 => 16,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u64,
}

/// Per-vertex buffer layout. Instanced layouts are not needed.
#[derive(Debug, Clone)]
pub struct VertexBufferLayout {
    pub array_stride: u64,
    pub attributes: Vec<VertexAttribute>,
}

/// Face culling. Triangles are counter-clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    /// Draw both sides
    None,
    Back,
}

/// How a color target combines fragment output with its contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Overwrite
    #[default]
    Replace,
    /// `dst + src` on color, alpha replaced
    Additive,
}

/// Linear filtering, clamped to edge
#[derive(Debug, Clone, Default)]
pub struct SamplerDescriptor {
    pub label: Option<String>,
}
