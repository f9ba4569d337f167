//! Display colors
//!
//! Colors authored as hex (`0x04AAC0`, `"#333333"`) are sRGB-encoded.
//! [`Color`] stores them linearized, which is what shaders and clear values
//! expect when the output surface applies the sRGB transfer on write.

use glam::Vec3;
use std::fmt;

/// Linear RGB color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(pub Vec3);

impl Color {
    pub const BLACK: Self = Self(Vec3::ZERO);
    pub const WHITE: Self = Self(Vec3::ONE);

    pub fn linear(r: f32, g: f32, b: f32) -> Self {
        Self(Vec3::new(r, g, b))
    }

    /// From a packed `0xRRGGBB` sRGB value.
    pub fn from_hex(hex: u32) -> Self {
        Self::from_srgb8([
            ((hex >> 16) & 0xFF) as u8,
            ((hex >> 8) & 0xFF) as u8,
            (hex & 0xFF) as u8,
        ])
    }

    pub fn from_srgb8(rgb: [u8; 3]) -> Self {
        Self(Vec3::new(
            srgb_to_linear(rgb[0] as f32 / 255.0),
            srgb_to_linear(rgb[1] as f32 / 255.0),
            srgb_to_linear(rgb[2] as f32 / 255.0),
        ))
    }

    /// Parse `#rrggbb` or `rrggbb`.
    pub fn parse(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        if digits.len() != 6 {
            return None;
        }
        u32::from_str_radix(digits, 16).ok().map(Self::from_hex)
    }

    pub fn to_srgb8(self) -> [u8; 3] {
        let encode = |c: f32| (linear_to_srgb(c.clamp(0.0, 1.0)) * 255.0).round() as u8;
        [encode(self.0.x), encode(self.0.y), encode(self.0.z)]
    }

    pub fn to_hex(self) -> u32 {
        let [r, g, b] = self.to_srgb8();
        ((r as u32) << 16) | ((g as u32) << 8) | b as u32
    }

    /// Opaque clear value for a render pass.
    pub fn to_clear(self) -> [f32; 4] {
        [self.0.x, self.0.y, self.0.z, 1.0]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.to_hex())
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_string() {
        let c = Color::parse("#333333").unwrap();
        assert_eq!(c.to_srgb8(), [0x33, 0x33, 0x33]);
        // 0x33 is 0.2 in sRGB, about 0.033 linear
        assert!((c.0.x - 0.0331).abs() < 1e-3);
        assert_eq!(Color::parse("04AAC0"), Some(Color::from_hex(0x04AAC0)));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(Color::parse("#333"), None);
        assert_eq!(Color::parse("#zzzzzz"), None);
        assert_eq!(Color::parse(""), None);
    }

    #[test]
    fn test_srgb_round_trip_is_exact_for_bytes() {
        for hex in [0xFFFFFF, 0x04AAC0, 0xFF4E4B, 0xFF6848, 0x000000] {
            assert_eq!(Color::from_hex(hex).to_hex(), hex);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Color::from_hex(0xFF6848).to_string(), "#ff6848");
    }
}
