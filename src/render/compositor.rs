//! Layer compositor - flattens a project into one raster
//!
//! Each visible layer is rasterized alone onto a transparent scratch surface
//! (strokes for drawing layers, a stretched image for image layers), then the
//! scratch is merged onto the result with the layer's opacity and blend mode.
//! Layers merge strictly bottom to top. In parallel mode every worker owns
//! its scratch surface and merging waits until all layers are rasterized.

use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

use super::layer_cache::{layer_content_hash, LayerRasterCache};
use crate::brush::BrushRasterizer;
use crate::config::EngineConfig;
use crate::core::assets::{AssetResolver, ImageResolver};
use crate::core::errors::CoreError;
use crate::project::{validate_dimensions, Layer, LayerType, Project};
use crate::raster::{CompositeOp, Paint, PixelBuffer, RasterSurface, Rect, Rgba};

static DEFAULT_RESOLVER: AssetResolver = AssetResolver::new();

pub struct Compositor<'a> {
    rasterizer: BrushRasterizer,
    resolver: &'a dyn ImageResolver,
    cache: Option<&'a LayerRasterCache>,
    default_background: String,
    parallel: bool,
}

impl<'a> Compositor<'a> {
    pub fn new(config: &EngineConfig, resolver: &'a dyn ImageResolver) -> Self {
        Self {
            rasterizer: BrushRasterizer::new(config.raster.clone()),
            resolver,
            cache: None,
            default_background: config.compose.default_background.clone(),
            parallel: config.compose.parallel,
        }
    }

    /// Reuse layer rasters whose content has not changed
    pub fn with_cache(mut self, cache: &'a LayerRasterCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn rasterizer(&self) -> &BrushRasterizer {
        &self.rasterizer
    }

    /// Isolated raster of one layer, or `None` when the layer contributes
    /// nothing (its image failed to load)
    pub fn rasterize_layer(&self, project: &Project, layer: &Layer) -> Option<Arc<PixelBuffer>> {
        let hash = self.cache.map(|cache| {
            let hash = layer_content_hash(project, layer, self.rasterizer.config(), self.resolver);
            (cache, hash)
        });
        if let Some((cache, hash)) = &hash {
            if let Some(raster) = cache.get(project, layer, hash) {
                return Some(raster);
            }
        }

        let raster = Arc::new(match layer.layer_type {
            LayerType::Drawing => self.rasterize_strokes(project, layer),
            LayerType::Image => self.rasterize_image(project, layer)?,
        });

        if let Some((cache, hash)) = hash {
            cache.store(project, layer, hash, Arc::clone(&raster));
        }
        Some(raster)
    }

    fn rasterize_strokes(&self, project: &Project, layer: &Layer) -> PixelBuffer {
        let mut scratch = PixelBuffer::new(project.width, project.height);
        for stroke in project.strokes_for_layer(&layer.id) {
            // Bad strokes are logged by the rasterizer and skipped
            let _ = self.rasterizer.render(&mut scratch, stroke);
        }
        scratch
    }

    fn rasterize_image(&self, project: &Project, layer: &Layer) -> Option<PixelBuffer> {
        let Some(url) = layer.image_url.as_deref() else {
            tracing::warn!("Image layer {} has no image source; skipped", layer.id);
            return None;
        };
        match self.resolver.resolve(url) {
            Ok(image) => {
                let mut scratch = PixelBuffer::new(project.width, project.height);
                scratch.draw_image(&image, &Paint::for_image(1.0, CompositeOp::default()));
                Some(scratch)
            }
            Err(err) => {
                tracing::warn!("Failed to load image for layer {}: {}; skipped", layer.id, err);
                None
            }
        }
    }

    fn background(&self, project: &Project) -> Rgba {
        Rgba::parse_or_black(project.background().unwrap_or(&self.default_background))
    }

    /// Flatten `project` at its native size
    pub fn compose(&self, project: &Project) -> Result<PixelBuffer, CoreError> {
        validate_dimensions(project.width, project.height)?;
        let started = Instant::now();

        let mut result = PixelBuffer::new(project.width, project.height);
        result.fill_rect(
            Rect::new(0.0, 0.0, project.width as f32, project.height as f32),
            &Paint::new(self.background(project)),
        );

        let visible: Vec<&Layer> = project.layers.iter().filter(|l| l.is_visible).collect();
        let rasters: Vec<Option<Arc<PixelBuffer>>> = if self.parallel {
            visible
                .par_iter()
                .map(|layer| self.rasterize_layer(project, layer))
                .collect()
        } else {
            visible
                .iter()
                .map(|layer| self.rasterize_layer(project, layer))
                .collect()
        };

        for (layer, raster) in visible.iter().zip(rasters) {
            let Some(raster) = raster else {
                continue;
            };
            let paint = Paint::for_image(
                sanitize_opacity(layer.opacity),
                CompositeOp::Blend(layer.blend_mode),
            );
            result.draw_image(raster.as_image(), &paint);
        }

        tracing::debug!(
            "Composed {} ({}x{}, {}/{} layers) in {:?}",
            project.id,
            project.width,
            project.height,
            visible.len(),
            project.layers.len(),
            started.elapsed()
        );
        Ok(result)
    }
}

fn sanitize_opacity(opacity: f32) -> f32 {
    if opacity.is_finite() {
        opacity.clamp(0.0, 1.0)
    } else {
        1.0
    }
}

/// Flatten with default settings, resolving data URLs and local files
pub fn compose(project: &Project) -> Result<PixelBuffer, CoreError> {
    Compositor::new(&EngineConfig::default(), &DEFAULT_RESOLVER).compose(project)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::brush::BrushSettings;
    use crate::input::Point;
    use crate::project::Stroke;

    fn dot(layer: &str, color: &str, x: f32) -> Stroke {
        let settings = BrushSettings {
            pressure_sensitivity: false,
            size: 6.0,
            ..BrushSettings::default()
        };
        Stroke::new(format!("s-{}", x), "b-ink", settings, color, layer)
            .with_points(vec![Point::new(x, 8.0, 0.5, 0)])
    }

    #[test]
    fn background_fills_everything() {
        let mut project = Project::new("bg", 8, 8).unwrap();
        project.background_color = Some("#336699".to_string());
        let out = compose(&project).unwrap();
        assert_eq!(out.pixel(0, 0), [0x33, 0x66, 0x99, 255]);
        assert_eq!(out.pixel(7, 7), [0x33, 0x66, 0x99, 255]);
    }

    #[test]
    fn missing_background_uses_default() {
        let mut project = Project::new("bg", 4, 4).unwrap();
        project.background_color = None;
        assert_eq!(compose(&project).unwrap().pixel(1, 1), [255, 255, 255, 255]);
    }

    #[test]
    fn layer_opacity_applies_at_composite() {
        let mut project = Project::new("op", 16, 16).unwrap();
        project.background_color = Some("#ffffff".to_string());
        let id = project.layers[0].id.clone();
        project.layers[0].opacity = 0.5;
        project.commit_stroke(dot(&id, "#000000", 8.0)).unwrap();
        let out = compose(&project).unwrap();
        assert_eq!(out.pixel(8, 8), [128, 128, 128, 255]);
    }

    #[test]
    fn bad_stroke_does_not_stop_layer() {
        let mut project = Project::new("bad", 16, 16).unwrap();
        let id = project.layers[0].id.clone();
        project.commit_stroke(dot(&id, "#ff0000", 8.0)).unwrap();
        // Inject a corrupt stroke directly, bypassing commit validation
        let mut bad = dot(&id, "#00ff00", 3.0);
        bad.points.push(Point::new(f32::INFINITY, 0.0, 0.5, 1));
        project.strokes.push(bad);

        let out = compose(&project).unwrap();
        assert_eq!(out.pixel(8, 8), [255, 0, 0, 255]);
        assert_eq!(out.pixel(3, 8), [255, 255, 255, 255]);
    }

    #[test]
    fn rejects_bad_dimensions() {
        let mut project = Project::new("dims", 4, 4).unwrap();
        project.width = 0;
        assert!(compose(&project).is_err());
    }
}
