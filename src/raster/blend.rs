//! Blend modes and per-pixel compositing
//!
//! The sixteen modes follow the W3C Compositing and Blending definitions used
//! by 2D canvas APIs: a blend function `B(Cb, Cs)` mixes the colors, and the
//! result is composited source-over with straight alpha:
//!
//! ```text
//! Cs' = (1 - ab) * Cs + ab * B(Cb, Cs)
//! ao  = as + ab * (1 - as)
//! Co  = (as * Cs' + ab * Cb * (1 - as)) / ao
//! ```

use super::color::Rgba;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Layer blend modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    pub const ALL: [BlendMode; 16] = [
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::Darken,
        BlendMode::Lighten,
        BlendMode::ColorDodge,
        BlendMode::ColorBurn,
        BlendMode::HardLight,
        BlendMode::SoftLight,
        BlendMode::Difference,
        BlendMode::Exclusion,
        BlendMode::Hue,
        BlendMode::Saturation,
        BlendMode::Color,
        BlendMode::Luminosity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Overlay => "overlay",
            BlendMode::Darken => "darken",
            BlendMode::Lighten => "lighten",
            BlendMode::ColorDodge => "color-dodge",
            BlendMode::ColorBurn => "color-burn",
            BlendMode::HardLight => "hard-light",
            BlendMode::SoftLight => "soft-light",
            BlendMode::Difference => "difference",
            BlendMode::Exclusion => "exclusion",
            BlendMode::Hue => "hue",
            BlendMode::Saturation => "saturation",
            BlendMode::Color => "color",
            BlendMode::Luminosity => "luminosity",
        }
    }

    /// Parse a stored blend mode name, treating unknown names as `normal`
    pub fn parse_lenient(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown blend mode '{}', using normal", name);
            BlendMode::Normal
        })
    }

    /// Mix backdrop and source colors (RGB, straight, in [0, 1])
    pub fn blend(&self, cb: [f32; 3], cs: [f32; 3]) -> [f32; 3] {
        match self {
            BlendMode::Normal => cs,
            BlendMode::Multiply => separable(cb, cs, |b, s| b * s),
            BlendMode::Screen => separable(cb, cs, screen),
            BlendMode::Overlay => separable(cb, cs, |b, s| hard_light(s, b)),
            BlendMode::Darken => separable(cb, cs, f32::min),
            BlendMode::Lighten => separable(cb, cs, f32::max),
            BlendMode::ColorDodge => separable(cb, cs, color_dodge),
            BlendMode::ColorBurn => separable(cb, cs, color_burn),
            BlendMode::HardLight => separable(cb, cs, hard_light),
            BlendMode::SoftLight => separable(cb, cs, soft_light),
            BlendMode::Difference => separable(cb, cs, |b, s| (b - s).abs()),
            BlendMode::Exclusion => separable(cb, cs, |b, s| b + s - 2.0 * b * s),
            BlendMode::Hue => set_lum(set_sat(cs, sat(cb)), lum(cb)),
            BlendMode::Saturation => set_lum(set_sat(cb, sat(cs)), lum(cb)),
            BlendMode::Color => set_lum(cs, lum(cb)),
            BlendMode::Luminosity => set_lum(cb, lum(cs)),
        }
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlendMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Canvas-style "source-over" is what older projects persist for normal
        if s == "source-over" {
            return Ok(BlendMode::Normal);
        }
        BlendMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| format!("unknown blend mode: {}", s))
    }
}

impl Serialize for BlendMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BlendMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(BlendMode::parse_lenient(&name))
    }
}

#[inline]
fn separable(cb: [f32; 3], cs: [f32; 3], f: impl Fn(f32, f32) -> f32) -> [f32; 3] {
    [f(cb[0], cs[0]), f(cb[1], cs[1]), f(cb[2], cs[2])]
}

fn screen(b: f32, s: f32) -> f32 {
    b + s - b * s
}

fn hard_light(b: f32, s: f32) -> f32 {
    if s <= 0.5 {
        b * 2.0 * s
    } else {
        screen(b, 2.0 * s - 1.0)
    }
}

fn color_dodge(b: f32, s: f32) -> f32 {
    if b <= 0.0 {
        0.0
    } else if s >= 1.0 {
        1.0
    } else {
        (b / (1.0 - s)).min(1.0)
    }
}

fn color_burn(b: f32, s: f32) -> f32 {
    if b >= 1.0 {
        1.0
    } else if s <= 0.0 {
        0.0
    } else {
        1.0 - ((1.0 - b) / s).min(1.0)
    }
}

fn soft_light(b: f32, s: f32) -> f32 {
    if s <= 0.5 {
        b - (1.0 - 2.0 * s) * b * (1.0 - b)
    } else {
        let d = if b <= 0.25 {
            ((16.0 * b - 12.0) * b + 4.0) * b
        } else {
            b.sqrt()
        };
        b + (2.0 * s - 1.0) * (d - b)
    }
}

fn lum(c: [f32; 3]) -> f32 {
    0.3 * c[0] + 0.59 * c[1] + 0.11 * c[2]
}

fn clip_color(c: [f32; 3]) -> [f32; 3] {
    let l = lum(c);
    let n = c[0].min(c[1]).min(c[2]);
    let x = c[0].max(c[1]).max(c[2]);
    let mut out = c;
    if n < 0.0 {
        let denom = l - n;
        for v in out.iter_mut() {
            *v = if denom > 0.0 { l + (*v - l) * l / denom } else { l };
        }
    }
    if x > 1.0 {
        let denom = x - l;
        for v in out.iter_mut() {
            *v = if denom > 0.0 {
                l + (*v - l) * (1.0 - l) / denom
            } else {
                l
            };
        }
    }
    out
}

fn set_lum(c: [f32; 3], l: f32) -> [f32; 3] {
    let d = l - lum(c);
    clip_color([c[0] + d, c[1] + d, c[2] + d])
}

fn sat(c: [f32; 3]) -> f32 {
    c[0].max(c[1]).max(c[2]) - c[0].min(c[1]).min(c[2])
}

fn set_sat(c: [f32; 3], s: f32) -> [f32; 3] {
    let max = c[0].max(c[1]).max(c[2]);
    let min = c[0].min(c[1]).min(c[2]);
    let range = max - min;
    if range <= 0.0 {
        return [0.0; 3];
    }
    let scale = |v: f32| {
        if v == max {
            s
        } else if v == min {
            0.0
        } else {
            (v - min) * s / range
        }
    };
    [scale(c[0]), scale(c[1]), scale(c[2])]
}

/// Composite `src` over `dst` through `mode`.
///
/// `src.a` is the effective source alpha (color alpha, paint alpha and
/// coverage already multiplied together).
pub fn source_over(dst: Rgba, src: Rgba, mode: BlendMode) -> Rgba {
    let a_s = src.a.clamp(0.0, 1.0);
    if a_s <= 0.0 {
        return dst;
    }
    let a_b = dst.a.clamp(0.0, 1.0);
    let cb = [dst.r, dst.g, dst.b];
    let cs = [src.r, src.g, src.b];

    let mixed = if a_b > 0.0 {
        let blended = mode.blend(cb, cs);
        [
            (1.0 - a_b) * cs[0] + a_b * blended[0],
            (1.0 - a_b) * cs[1] + a_b * blended[1],
            (1.0 - a_b) * cs[2] + a_b * blended[2],
        ]
    } else {
        cs
    };

    let a_o = a_s + a_b * (1.0 - a_s);
    if a_o <= 0.0 {
        return Rgba::TRANSPARENT;
    }
    let out = |s: f32, b: f32| ((a_s * s + a_b * b * (1.0 - a_s)) / a_o).clamp(0.0, 1.0);
    Rgba::new(
        out(mixed[0], cb[0]),
        out(mixed[1], cb[1]),
        out(mixed[2], cb[2]),
        a_o,
    )
}

/// Remove `alpha` worth of coverage from `dst` (canvas `destination-out`)
pub fn destination_out(dst: Rgba, alpha: f32) -> Rgba {
    let remaining = dst.a * (1.0 - alpha.clamp(0.0, 1.0));
    if remaining <= 0.0 {
        Rgba::TRANSPARENT
    } else {
        Rgba { a: remaining, ..dst }
    }
}
