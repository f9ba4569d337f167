//! Texture loading and management

use crate::backend::traits::*;
use crate::backend::types::*;
use image::{DynamicImage, GenericImageView};
use std::path::Path;

/// How the texel values are encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// Display-referred color (baked lightmaps, albedo)
    Srgb,
    Linear,
}

/// Loaded texture data
#[derive(Debug, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    /// Whether rows were flipped on load. glTF UVs have their origin at the
    /// top-left, so baked textures for glTF meshes are never flipped.
    pub flip_y: bool,
    pub data: Vec<u8>,
    pub name: String,
}

impl TextureData {
    /// Load an sRGB texture from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, image::ImageError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let img = image::open(path)?;
        Ok(Self::from_image(img, &name))
    }

    /// Load an sRGB texture from encoded bytes
    pub fn from_bytes(bytes: &[u8], name: &str) -> Result<Self, image::ImageError> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_image(img, name))
    }

    fn from_image(img: DynamicImage, name: &str) -> Self {
        let (width, height) = img.dimensions();
        let data = img.to_rgba8().into_raw();

        Self {
            width,
            height,
            color_space: ColorSpace::Srgb,
            flip_y: false,
            data,
            name: name.to_string(),
        }
    }

    /// Create a solid color texture
    pub fn solid_color(color: [u8; 4], name: &str) -> Self {
        Self {
            width: 1,
            height: 1,
            color_space: ColorSpace::Srgb,
            flip_y: false,
            data: color.to_vec(),
            name: name.to_string(),
        }
    }

    /// Fallback bound when a material's texture is missing
    pub fn white() -> Self {
        Self::solid_color([255, 255, 255, 255], "white")
    }

    pub fn format(&self) -> TextureFormat {
        match self.color_space {
            ColorSpace::Srgb => TextureFormat::Rgba8UnormSrgb,
            ColorSpace::Linear => TextureFormat::Rgba8Unorm,
        }
    }
}

/// GPU texture with associated view
#[derive(Debug)]
pub struct GpuTexture {
    pub handle: TextureHandle,
    pub view: TextureViewHandle,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub name: String,
}

impl GpuTexture {
    /// Create and upload texture to GPU
    pub fn create(backend: &mut dyn GraphicsBackend, data: &TextureData) -> BackendResult<Self> {
        let format = data.format();
        let handle = backend.create_texture(&TextureDescriptor {
            label: Some(data.name.clone()),
            width: data.width,
            height: data.height,
            format,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
            ..Default::default()
        })?;

        let view = backend.create_texture_view(handle)?;
        backend.write_texture(handle, &data.data, data.width, data.height);

        Ok(Self {
            handle,
            view,
            width: data.width,
            height: data.height,
            format,
            name: data.name.clone(),
        })
    }

    pub fn destroy(self, backend: &mut dyn GraphicsBackend) {
        backend.destroy_texture(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoded_textures_are_srgb_and_unflipped() {
        let mut png = Vec::new();
        image::RgbaImage::from_pixel(2, 1, image::Rgba([10, 20, 30, 255]))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageOutputFormat::Png)
            .unwrap();

        let tex = TextureData::from_bytes(&png, "baked").unwrap();
        assert_eq!((tex.width, tex.height), (2, 1));
        assert_eq!(tex.color_space, ColorSpace::Srgb);
        assert!(!tex.flip_y);
        assert_eq!(tex.format(), TextureFormat::Rgba8UnormSrgb);
        assert_eq!(&tex.data[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_garbage_bytes_fail() {
        assert!(TextureData::from_bytes(b"not an image", "x").is_err());
    }
}
