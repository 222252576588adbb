//! Color parsing for stroke and background color strings

use serde::{Deserialize, Serialize};

/// Straight-alpha RGBA color with channels in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba8(px: [u8; 4]) -> Self {
        Self {
            r: px[0] as f32 / 255.0,
            g: px[1] as f32 / 255.0,
            b: px[2] as f32 / 255.0,
            a: px[3] as f32 / 255.0,
        }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        [
            channel_to_u8(self.r),
            channel_to_u8(self.g),
            channel_to_u8(self.b),
            channel_to_u8(self.a),
        ]
    }

    /// Parse any CSS color string (`#rgb`, `#rrggbbaa`, `rgb()`, named colors...)
    pub fn parse(value: &str) -> Option<Self> {
        csscolorparser::parse(value.trim())
            .ok()
            .map(|c| Self::from_rgba8(c.to_rgba8()))
    }

    /// Parse a color, falling back to opaque black like a 2D canvas does
    /// when handed an unparseable fill style.
    pub fn parse_or_black(value: &str) -> Self {
        Self::parse(value).unwrap_or_else(|| {
            tracing::warn!("Unrecognized color '{}', using black", value);
            Self::BLACK
        })
    }
}

#[inline]
pub(crate) fn channel_to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!(Rgba::parse("#ff0000").map(Rgba::to_rgba8), Some([255, 0, 0, 255]));
        assert_eq!(Rgba::parse("#00f").map(Rgba::to_rgba8), Some([0, 0, 255, 255]));
        assert_eq!(
            Rgba::parse("#1C1B18").map(Rgba::to_rgba8),
            Some([0x1c, 0x1b, 0x18, 255])
        );
    }

    #[test]
    fn parses_functional_and_named() {
        assert_eq!(
            Rgba::parse("rgb(128, 128, 128)").map(Rgba::to_rgba8),
            Some([128, 128, 128, 255])
        );
        assert_eq!(Rgba::parse("white").map(Rgba::to_rgba8), Some([255, 255, 255, 255]));
    }

    #[test]
    fn invalid_color_falls_back_to_black() {
        assert_eq!(Rgba::parse("not-a-color"), None);
        assert_eq!(Rgba::parse_or_black("not-a-color"), Rgba::BLACK);
    }
}
