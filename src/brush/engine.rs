//! Brush rasterizer - paints one stroke onto a raster surface
//!
//! Two rendering paths, chosen by nib roundness:
//! - calligraphy: a fixed-angle elliptical nib stamped at every point, with
//!   synthetic stamps filling gaps between points
//! - round pen: round-capped line segments whose width follows the pressure
//!   at each segment's trailing point; a lone point becomes a dot
//!
//! Brush opacity is the only alpha applied here. Layer opacity belongs to the
//! compositor.

use super::interpolation::calligraphy_stamps;
use super::{Brush, BrushSettings};
use crate::config::RasterConfig;
use crate::core::errors::CoreError;
use crate::input::Point;
use crate::project::Stroke;
use crate::raster::{
    CompositeOp, Ellipse, LineCap, LineStyle, Paint, PixelBuffer, RasterSurface, Rect, Rgba,
};

/// Number of segments in the brush preview curve
const PREVIEW_STEPS: usize = 40;

/// Stroke rasterizer configured with the raster constants
#[derive(Debug, Clone, Default)]
pub struct BrushRasterizer {
    config: RasterConfig,
}

impl BrushRasterizer {
    pub fn new(config: RasterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    /// Paint `stroke` onto `surface`.
    ///
    /// A stroke without points is a no-op. A stroke with any non-finite
    /// coordinate is rejected before anything is drawn.
    pub fn render<S: RasterSurface + ?Sized>(
        &self,
        surface: &mut S,
        stroke: &Stroke,
    ) -> Result<(), CoreError> {
        if stroke.is_empty() {
            tracing::debug!("Skipping stroke {} with no points", stroke.id);
            return Ok(());
        }
        if let Some(index) = stroke.first_invalid_point() {
            tracing::error!(
                "Refusing to draw stroke {}: non-finite point at index {}",
                stroke.id,
                index
            );
            return Err(CoreError::InvalidGeometry(format!(
                "stroke {} has a non-finite point at index {}",
                stroke.id, index
            )));
        }

        let paint = self.paint_for(stroke);
        let settings = &stroke.brush_settings;
        if settings.is_calligraphy() {
            self.render_calligraphy(surface, &stroke.points, settings, &paint);
        } else {
            self.render_round(surface, &stroke.points, settings, &paint);
        }
        Ok(())
    }

    fn paint_for(&self, stroke: &Stroke) -> Paint {
        let alpha = stroke.brush_settings.opacity;
        let alpha = if alpha.is_finite() { alpha } else { 1.0 };
        let composite = if stroke.is_eraser() {
            CompositeOp::Erase
        } else {
            CompositeOp::default()
        };
        Paint::new(Rgba::parse_or_black(&stroke.color))
            .with_alpha(alpha)
            .with_composite(composite)
    }

    fn render_calligraphy<S: RasterSurface + ?Sized>(
        &self,
        surface: &mut S,
        points: &[Point],
        settings: &BrushSettings,
        paint: &Paint,
    ) {
        let rotation = settings.angle_radians();
        let height_ratio = settings.roundness / 100.0;
        let clip = Rect::new(0.0, 0.0, surface.width() as f32, surface.height() as f32);
        for stamp in calligraphy_stamps(points, settings, &self.config, Some(&clip)) {
            let ellipse = Ellipse {
                cx: stamp.x,
                cy: stamp.y,
                rx: stamp.size / 2.0,
                ry: (stamp.size * height_ratio / 2.0).max(self.config.min_stamp_half_height),
                rotation,
            };
            surface.fill_ellipse(&ellipse, paint);
        }
    }

    fn render_round<S: RasterSurface + ?Sized>(
        &self,
        surface: &mut S,
        points: &[Point],
        settings: &BrushSettings,
        paint: &Paint,
    ) {
        let min_width = self.config.min_line_width;

        if let [only] = points {
            let radius = (settings.dynamic_size(only.pressure) / 2.0).max(min_width);
            surface.fill_ellipse(&Ellipse::circle(only.x, only.y, radius), paint);
            return;
        }

        // Constant width strokes are one shape: a translucent stroke keeps a
        // uniform alpha through its joins. Pressure-varying strokes below are
        // painted segment by segment, so with opacity < 1 the overlap at each
        // join is composited twice and comes out denser.
        if !settings.pressure_sensitivity {
            let style = LineStyle::round(settings.size.max(min_width));
            let path: Vec<(f32, f32)> = points.iter().map(|p| (p.x, p.y)).collect();
            surface.stroke_polyline(&path, &style, paint);
            return;
        }

        for pair in points.windows(2) {
            let (prev, p) = (&pair[0], &pair[1]);
            let style = LineStyle {
                width: settings.dynamic_size(p.pressure).max(min_width),
                cap: LineCap::Round,
            };
            surface.stroke_line((prev.x, prev.y), (p.x, p.y), &style, paint);
        }
    }
}

/// Render with the default raster constants
pub fn render_stroke<S: RasterSurface + ?Sized>(
    surface: &mut S,
    stroke: &Stroke,
) -> Result<(), CoreError> {
    BrushRasterizer::default().render(surface, stroke)
}

/// Sample stroke used for brush thumbnails: a gentle S-curve whose pressure
/// swells in the middle
pub fn preview_stroke(brush: &Brush, color: &str, width: u32, height: u32) -> Stroke {
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let points = (0..=PREVIEW_STEPS)
        .map(|i| {
            let t = i as f32 / PREVIEW_STEPS as f32;
            Point::new(
                cx - 40.0 + t * 80.0,
                cy + (t * std::f32::consts::PI * 1.5).sin() * 15.0,
                0.2 + (t * std::f32::consts::PI).sin() * 0.8,
                0,
            )
        })
        .collect();

    Stroke::new("preview", brush.id.clone(), brush.settings.clone(), color, "preview")
        .with_points(points)
}

/// Render a brush thumbnail on a transparent surface
pub fn render_brush_preview(
    brush: &Brush,
    color: &str,
    width: u32,
    height: u32,
) -> Result<PixelBuffer, CoreError> {
    if width == 0 || height == 0 {
        return Err(CoreError::InvalidInput(
            "Preview size must be greater than zero".to_string(),
        ));
    }
    let mut surface = PixelBuffer::new(width, height);
    render_stroke(&mut surface, &preview_stroke(brush, color, width, height))?;
    Ok(surface)
}
