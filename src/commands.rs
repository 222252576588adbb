//! Command facade - the interface handed to the surrounding application
//!
//! Every command returns `Result<T, String>` so errors cross the boundary as
//! plain messages.

use serde::Serialize;

use crate::brush::{
    builtin_brushes, decode_brush_link, encode_brush_link, export_brush_file, import_brush_file,
    library_brushes, render_brush_preview, Brush,
};
use crate::config::EngineConfig;
use crate::core::assets::{encode_png_bytes_as_data_url, AssetResolver};
use crate::input::ViewTransform;
use crate::project::{Layer, Project, Stroke};
use crate::raster::RasterSurface;
use crate::render::{export_png, export_thumbnail_data_url, shared_cache, Compositor};

/// Project summary returned after creation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub id: String,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub layer_count: usize,
}

impl From<&Project> for ProjectInfo {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            width: project.width,
            height: project.height,
            layer_count: project.layers.len(),
        }
    }
}

/// Create a new project with one empty drawing layer
pub fn create_project(name: &str, width: u32, height: u32) -> Result<Project, String> {
    tracing::info!("Creating project '{}': {}x{}", name, width, height);
    Ok(Project::new(name, width, height)?)
}

/// Summary of an existing project
pub fn project_info(project: &Project) -> ProjectInfo {
    ProjectInfo::from(project)
}

/// Append a finished stroke; the project is untouched on error
pub fn commit_stroke(project: &mut Project, stroke: Stroke) -> Result<(), String> {
    let id = stroke.id.clone();
    project.commit_stroke(stroke).map_err(|err| {
        tracing::error!("Rejected stroke {}: {}", id, err);
        String::from(err)
    })
}

/// Add an empty drawing layer above the active one; returns the new layer id
pub fn add_drawing_layer(project: &mut Project, active_layer_id: Option<&str>) -> String {
    let id = format!("layer-{}", crate::core::now_millis());
    let name = format!("Layer {}", project.layers.len() + 1);
    project.add_layer_above(active_layer_id, Layer::drawing(id.clone(), name));
    id
}

/// Flattened PNG of the project, reusing cached layer rasters
pub fn export_project_png(project: &Project, config: &EngineConfig) -> Result<Vec<u8>, String> {
    let resolver = AssetResolver::new();
    let compositor = Compositor::new(config, &resolver).with_cache(shared_cache());
    Ok(export_png(&compositor, project)?)
}

/// Thumbnail data URL, ready to store in `Project::thumbnail`
pub fn export_project_thumbnail(project: &Project, config: &EngineConfig) -> Result<String, String> {
    let resolver = AssetResolver::new();
    let compositor = Compositor::new(config, &resolver).with_cache(shared_cache());
    Ok(export_thumbnail_data_url(
        &compositor,
        project,
        config.compose.thumbnail_edge,
    )?)
}

/// Drop cached layer rasters, e.g. when a project is closed
pub fn clear_render_cache() {
    shared_cache().clear();
}

/// Built-in and library presets, in display order
pub fn list_preset_brushes() -> Vec<Brush> {
    builtin_brushes().into_iter().chain(library_brushes()).collect()
}

/// Brush thumbnail as a PNG data URL
pub fn brush_preview(brush: &Brush, color: &str, width: u32, height: u32) -> Result<String, String> {
    let surface = render_brush_preview(brush, color, width, height)?;
    Ok(encode_png_bytes_as_data_url(&surface.encode_png()?))
}

pub fn share_brush(brush: &Brush) -> Result<String, String> {
    Ok(encode_brush_link(brush)?)
}

pub fn receive_shared_brush(code: &str) -> Result<Brush, String> {
    decode_brush_link(code).map_err(|err| {
        tracing::warn!("Failed to decode shared brush: {}", err);
        String::from(err)
    })
}

pub fn export_brush(brush: &Brush) -> Result<String, String> {
    Ok(export_brush_file(brush)?)
}

pub fn import_brush(json: &str) -> Result<Brush, String> {
    import_brush_file(json).map_err(|err| {
        tracing::warn!("Brush import failed: {}", err);
        String::from(err)
    })
}

/// Pan/zoom that fits the whole project in the viewport
pub fn fit_to_view(viewport_width: f32, viewport_height: f32, project: &Project) -> ViewTransform {
    ViewTransform::fit(viewport_width, viewport_height, project.width, project.height)
}
