//! Software pixel buffer
//!
//! Straight-alpha RGBA8 storage backed by [`image::RgbaImage`]. Shapes are
//! anti-aliased analytically: each pixel center gets an approximate signed
//! distance to the shape edge and coverage is `clamp(0.5 - d, 0, 1)`. The
//! math is plain `f32` with no randomness, so identical inputs always give
//! identical pixels.

use super::blend::{destination_out, source_over};
use super::color::Rgba;
use super::{CompositeOp, Ellipse, LineCap, LineStyle, Paint, RasterSurface, Rect};
use image::imageops::FilterType;
use image::RgbaImage;
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

/// Clipped pixel-index bounds (inclusive start, exclusive end)
struct Span {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

#[inline]
fn coverage(distance: f32) -> f32 {
    (0.5 - distance).clamp(0.0, 1.0)
}

/// Coverage of pixel center `p` by a thick segment `a -> b`
fn segment_coverage(
    p: (f32, f32),
    a: (f32, f32),
    b: (f32, f32),
    half: f32,
    start: LineCap,
    end: LineCap,
) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len = dx.hypot(dy);
    let (rx, ry) = (p.0 - a.0, p.1 - a.1);

    if len <= f32::EPSILON {
        // Degenerate segment: round caps still leave a dot
        return if start == LineCap::Round || end == LineCap::Round {
            coverage(rx.hypot(ry) - half)
        } else {
            0.0
        };
    }

    let (ux, uy) = (dx / len, dy / len);
    let along = rx * ux + ry * uy;
    let perp = (rx * uy - ry * ux).abs();

    let mut cov = if along < 0.0 && start == LineCap::Round {
        coverage(rx.hypot(ry) - half)
    } else if along > len && end == LineCap::Round {
        coverage((p.0 - b.0).hypot(p.1 - b.1) - half)
    } else {
        coverage(perp - half)
    };

    if start == LineCap::Butt {
        cov *= (along + 0.5).clamp(0.0, 1.0);
    }
    if end == LineCap::Butt {
        cov *= (len - along + 0.5).clamp(0.0, 1.0);
    }
    cov
}

impl PixelBuffer {
    /// Create a transparent buffer
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    /// Create a buffer filled with a solid color
    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, image::Rgba(color.to_rgba8())),
        }
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// RGBA8 value at `(x, y)`, transparent when out of bounds
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image
            .get_pixel_checked(x, y)
            .map(|p| p.0)
            .unwrap_or([0, 0, 0, 0])
    }

    fn span(&self, min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Option<Span> {
        if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
            return None;
        }
        let w = self.image.width() as f32;
        let h = self.image.height() as f32;
        let x0 = min_x.floor().clamp(0.0, w) as u32;
        let y0 = min_y.floor().clamp(0.0, h) as u32;
        let x1 = max_x.ceil().clamp(0.0, w) as u32;
        let y1 = max_y.ceil().clamp(0.0, h) as u32;
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some(Span { x0, y0, x1, y1 })
    }

    /// Composite one source sample into the pixel at `(x, y)`
    #[inline]
    fn apply(&mut self, x: u32, y: u32, src: Rgba, composite: CompositeOp) {
        if src.a <= 0.0 {
            return;
        }
        let pixel = self.image.get_pixel_mut(x, y);
        let dst = Rgba::from_rgba8(pixel.0);
        let out = match composite {
            CompositeOp::Blend(mode) => source_over(dst, src, mode),
            CompositeOp::Erase => destination_out(dst, src.a),
        };
        let encoded = out.to_rgba8();
        pixel.0 = if encoded[3] == 0 { [0, 0, 0, 0] } else { encoded };
    }

    /// Visit every pixel center in `span`, painting `paint` at the coverage
    /// returned by `cover`.
    fn paint_span(&mut self, span: Span, paint: &Paint, cover: impl Fn(f32, f32) -> f32) {
        let base_alpha = paint.color.a * paint.alpha.clamp(0.0, 1.0);
        if base_alpha <= 0.0 {
            return;
        }
        for y in span.y0..span.y1 {
            let py = y as f32 + 0.5;
            for x in span.x0..span.x1 {
                let px = x as f32 + 0.5;
                let cov = cover(px, py);
                if cov <= 0.0 {
                    continue;
                }
                let src = Rgba {
                    a: base_alpha * cov,
                    ..paint.color
                };
                self.apply(x, y, src, paint.composite);
            }
        }
    }
}

impl RasterSurface for PixelBuffer {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            pixel.0 = [0, 0, 0, 0];
        }
    }

    fn fill_rect(&mut self, rect: Rect, paint: &Paint) {
        if !(rect.width > 0.0 && rect.height > 0.0) {
            return;
        }
        let (left, top) = (rect.x, rect.y);
        let (right, bottom) = (rect.x + rect.width, rect.y + rect.height);
        let Some(span) = self.span(left, top, right, bottom) else {
            return;
        };
        self.paint_span(span, paint, |px, py| {
            let ox = ((px + 0.5).min(right) - (px - 0.5).max(left)).max(0.0);
            let oy = ((py + 0.5).min(bottom) - (py - 0.5).max(top)).max(0.0);
            ox * oy
        });
    }

    fn fill_ellipse(&mut self, ellipse: &Ellipse, paint: &Paint) {
        let Ellipse {
            cx,
            cy,
            rx,
            ry,
            rotation,
        } = *ellipse;
        if !(rx > 0.0 && ry > 0.0) {
            return;
        }
        let extent = rx.max(ry) + 1.0;
        let Some(span) = self.span(cx - extent, cy - extent, cx + extent, cy + extent) else {
            return;
        };
        let (sin, cos) = rotation.sin_cos();
        let (inv_rx2, inv_ry2) = (1.0 / (rx * rx), 1.0 / (ry * ry));

        self.paint_span(span, paint, |px, py| {
            let (dx, dy) = (px - cx, py - cy);
            // Into the ellipse's local frame
            let lx = dx * cos + dy * sin;
            let ly = -dx * sin + dy * cos;
            let f = lx * lx * inv_rx2 + ly * ly * inv_ry2 - 1.0;
            let gx = 2.0 * lx * inv_rx2;
            let gy = 2.0 * ly * inv_ry2;
            let grad = gx.hypot(gy);
            if grad <= f32::EPSILON {
                return if f < 0.0 { 1.0 } else { 0.0 };
            }
            coverage(f / grad)
        });
    }

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), style: &LineStyle, paint: &Paint) {
        let half = style.width / 2.0;
        if !(half > 0.0) {
            return;
        }
        let pad = half + 1.0;
        let Some(span) = self.span(
            from.0.min(to.0) - pad,
            from.1.min(to.1) - pad,
            from.0.max(to.0) + pad,
            from.1.max(to.1) + pad,
        ) else {
            return;
        };
        let cap = style.cap;
        self.paint_span(span, paint, |px, py| {
            segment_coverage((px, py), from, to, half, cap, cap)
        });
    }

    fn stroke_polyline(&mut self, points: &[(f32, f32)], style: &LineStyle, paint: &Paint) {
        let half = style.width / 2.0;
        if points.len() < 2 || !(half > 0.0) {
            return;
        }
        let pad = half + 1.0;
        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for &(x, y) in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let Some(span) = self.span(min_x - pad, min_y - pad, max_x + pad, max_y + pad) else {
            return;
        };
        let last = points.len() - 2;
        let cap = style.cap;
        self.paint_span(span, paint, |px, py| {
            points
                .windows(2)
                .enumerate()
                .map(|(i, w)| {
                    let start = if i == 0 { cap } else { LineCap::Round };
                    let end = if i == last { cap } else { LineCap::Round };
                    segment_coverage((px, py), w[0], w[1], half, start, end)
                })
                .fold(0.0, f32::max)
        });
    }

    fn draw_image(&mut self, image: &RgbaImage, paint: &Paint) {
        let (w, h) = (self.image.width(), self.image.height());
        if w == 0 || h == 0 || image.width() == 0 || image.height() == 0 {
            return;
        }
        let source: Cow<'_, RgbaImage> = if image.dimensions() == (w, h) {
            Cow::Borrowed(image)
        } else {
            Cow::Owned(image::imageops::resize(image, w, h, FilterType::Triangle))
        };
        let alpha = paint.alpha.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        for (x, y, px) in source.enumerate_pixels() {
            let mut src = Rgba::from_rgba8(px.0);
            src.a *= alpha;
            self.apply(x, y, src, paint.composite);
        }
    }

    fn to_image(&self) -> RgbaImage {
        self.image.clone()
    }
}
