//! PNG export of composed projects

use image::imageops::FilterType;
use std::path::Path;
use std::time::Instant;

use super::compositor::Compositor;
use crate::core::assets::encode_png_bytes_as_data_url;
use crate::core::errors::CoreError;
use crate::project::Project;
use crate::raster::{PixelBuffer, RasterSurface};

/// Flatten `project` and encode it as PNG at native size
pub fn export_png(compositor: &Compositor<'_>, project: &Project) -> Result<Vec<u8>, CoreError> {
    let started = Instant::now();
    let composed = compositor.compose(project)?;
    let bytes = composed.encode_png()?;
    tracing::info!(
        "Exported {} as PNG: {}x{}, {} bytes in {:?}",
        project.id,
        project.width,
        project.height,
        bytes.len(),
        started.elapsed()
    );
    Ok(bytes)
}

/// Size that fits `width`x`height` inside a `max_edge` square, never upscaling
pub fn thumbnail_size(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_edge || longest == 0 {
        return (width, height);
    }
    let scale = max_edge as f64 / longest as f64;
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// Composed project scaled down to fit `max_edge`, as PNG bytes
pub fn export_thumbnail(
    compositor: &Compositor<'_>,
    project: &Project,
    max_edge: u32,
) -> Result<Vec<u8>, CoreError> {
    if max_edge == 0 {
        return Err(CoreError::InvalidInput(
            "Thumbnail edge must be greater than zero".to_string(),
        ));
    }
    let composed = compositor.compose(project)?.into_image();
    let (w, h) = thumbnail_size(composed.width(), composed.height(), max_edge);
    let thumb = if (w, h) == composed.dimensions() {
        composed
    } else {
        image::imageops::resize(&composed, w, h, FilterType::Triangle)
    };
    tracing::debug!("Thumbnail for {}: {}x{}", project.id, w, h);
    PixelBuffer::from_image(thumb).encode_png()
}

/// Thumbnail as a `data:image/png;base64,...` URL, the form stored in
/// `Project::thumbnail`
pub fn export_thumbnail_data_url(
    compositor: &Compositor<'_>,
    project: &Project,
    max_edge: u32,
) -> Result<String, CoreError> {
    let bytes = export_thumbnail(compositor, project, max_edge)?;
    Ok(encode_png_bytes_as_data_url(&bytes))
}

/// Flatten and write a PNG file
pub fn export_to_path(
    compositor: &Compositor<'_>,
    project: &Project,
    path: &Path,
) -> Result<(), CoreError> {
    let bytes = export_png(compositor, project)?;
    std::fs::write(path, &bytes)?;
    tracing::info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::assets::{decode_base64_or_data_url_to_bytes, decode_image_bytes, AssetResolver};

    #[test]
    fn thumbnail_size_keeps_aspect() {
        assert_eq!(thumbnail_size(1000, 500, 256), (256, 128));
        assert_eq!(thumbnail_size(300, 900, 300), (100, 300));
        assert_eq!(thumbnail_size(100, 50, 256), (100, 50));
        assert_eq!(thumbnail_size(10000, 1, 100), (100, 1));
    }

    #[test]
    fn png_has_project_size() {
        let resolver = AssetResolver::new();
        let compositor = Compositor::new(&EngineConfig::default(), &resolver);
        let mut project = Project::new("export", 40, 30).unwrap();
        project.background_color = Some("#00ff00".to_string());

        let png = export_png(&compositor, &project).unwrap();
        let decoded = decode_image_bytes(&png).unwrap();
        assert_eq!(decoded.dimensions(), (40, 30));
        assert_eq!(decoded.get_pixel(20, 15).0, [0, 255, 0, 255]);
    }

    #[test]
    fn thumbnail_data_url_decodes() {
        let resolver = AssetResolver::new();
        let compositor = Compositor::new(&EngineConfig::default(), &resolver);
        let project = Project::new("thumb", 400, 200).unwrap();

        let url = export_thumbnail_data_url(&compositor, &project, 100).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        let bytes = decode_base64_or_data_url_to_bytes(&url).unwrap();
        assert_eq!(decode_image_bytes(&bytes).unwrap().dimensions(), (100, 50));

        assert!(export_thumbnail(&compositor, &project, 0).is_err());
    }

    #[test]
    fn unscaled_thumbnail_matches_full_export() {
        let resolver = AssetResolver::new();
        let compositor = Compositor::new(&EngineConfig::default(), &resolver);
        let mut project = Project::new("small", 20, 10).unwrap();
        project.background_color = Some("#336699".to_string());

        let thumb = export_thumbnail(&compositor, &project, 64).unwrap();
        assert_eq!(thumb, export_png(&compositor, &project).unwrap());
    }

    #[test]
    fn writes_file() {
        let resolver = AssetResolver::new();
        let compositor = Compositor::new(&EngineConfig::default(), &resolver);
        let project = Project::new("file", 8, 8).unwrap();
        let path = std::env::temp_dir().join(format!("mihbara-export-{}.png", project.id));

        export_to_path(&compositor, &project, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(decode_image_bytes(&bytes).unwrap().dimensions(), (8, 8));
        let _ = std::fs::remove_file(&path);
    }
}
