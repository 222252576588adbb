//! Raster surface abstraction
//!
//! The brush rasterizer and the layer compositor only talk to a
//! [`RasterSurface`]; [`PixelBuffer`] is the software implementation used for
//! export and tests. Other backends (GPU textures, headless doubles) plug in by
//! implementing the trait.

pub mod blend;
pub mod color;
mod pixmap;

pub use blend::BlendMode;
pub use color::Rgba;
pub use pixmap::PixelBuffer;

use crate::core::errors::CoreError;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

/// How a draw call combines with existing pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeOp {
    /// Paint over existing content through a blend mode
    Blend(BlendMode),
    /// Remove coverage from existing content (`destination-out`)
    Erase,
}

impl Default for CompositeOp {
    fn default() -> Self {
        CompositeOp::Blend(BlendMode::Normal)
    }
}

/// Per-draw paint state (fill color, global alpha, composite op)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    pub color: Rgba,
    /// Global alpha multiplier (0.0 - 1.0)
    pub alpha: f32,
    pub composite: CompositeOp,
}

impl Paint {
    pub fn new(color: Rgba) -> Self {
        Self {
            color,
            alpha: 1.0,
            composite: CompositeOp::default(),
        }
    }

    /// Paint for drawing images, where only alpha and composite matter
    pub fn for_image(alpha: f32, composite: CompositeOp) -> Self {
        Self {
            color: Rgba::WHITE,
            alpha,
            composite,
        }
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    pub fn with_composite(mut self, composite: CompositeOp) -> Self {
        self.composite = composite;
        self
    }
}

impl Default for Paint {
    fn default() -> Self {
        Self::new(Rgba::BLACK)
    }
}

/// Axis-aligned rectangle in surface pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Filled ellipse, rotated about its center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    pub cx: f32,
    pub cy: f32,
    /// Half-width before rotation
    pub rx: f32,
    /// Half-height before rotation
    pub ry: f32,
    /// Rotation in radians
    pub rotation: f32,
}

impl Ellipse {
    pub fn circle(cx: f32, cy: f32, radius: f32) -> Self {
        Self {
            cx,
            cy,
            rx: radius,
            ry: radius,
            rotation: 0.0,
        }
    }
}

/// Line end shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    Butt,
    #[default]
    Round,
}

/// Stroke parameters for line segments
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub width: f32,
    pub cap: LineCap,
}

impl LineStyle {
    pub fn round(width: f32) -> Self {
        Self {
            width,
            cap: LineCap::Round,
        }
    }
}

/// Immediate-mode 2D raster canvas
pub trait RasterSurface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Reset every pixel to transparent
    fn clear(&mut self);

    fn fill_rect(&mut self, rect: Rect, paint: &Paint);

    fn fill_ellipse(&mut self, ellipse: &Ellipse, paint: &Paint);

    /// Stroke a single segment
    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), style: &LineStyle, paint: &Paint);

    /// Stroke connected segments as one shape (round joins, single coverage pass)
    fn stroke_polyline(&mut self, points: &[(f32, f32)], style: &LineStyle, paint: &Paint);

    /// Draw an image stretched over the whole surface
    fn draw_image(&mut self, image: &RgbaImage, paint: &Paint);

    /// Read back the current pixels (straight alpha)
    fn to_image(&self) -> RgbaImage;

    /// Read back and encode as PNG
    fn encode_png(&self) -> Result<Vec<u8>, CoreError> {
        let mut cursor = Cursor::new(Vec::new());
        self.to_image().write_to(&mut cursor, ImageFormat::Png)?;
        Ok(cursor.into_inner())
    }
}
