//! Project model - strokes, layers, and the flat stroke list
//!
//! Drawing-layer pixels are never stored. A drawing layer's content is the
//! rasterization of every stroke whose `layer_id` matches, in stroke-list
//! order.

use crate::brush::{BrushSettings, ERASER_BRUSH_ID};
use crate::config::MAX_PROJECT_EDGE;
use crate::core::errors::CoreError;
use crate::core::now_millis;
use crate::input::Point;
use crate::raster::BlendMode;
use serde::{Deserialize, Serialize};

/// Background used by new projects
pub const DEFAULT_BACKGROUND: &str = "#ffffff";

/// One pen gesture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub id: String,
    pub brush_id: String,
    /// Snapshot of the brush at stroke start
    pub brush_settings: BrushSettings,
    /// CSS color string
    pub color: String,
    pub points: Vec<Point>,
    pub layer_id: String,
}

impl Stroke {
    pub fn new(
        id: impl Into<String>,
        brush_id: impl Into<String>,
        brush_settings: BrushSettings,
        color: impl Into<String>,
        layer_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            brush_id: brush_id.into(),
            brush_settings,
            color: color.into(),
            points: Vec::new(),
            layer_id: layer_id.into(),
        }
    }

    pub fn with_points(mut self, points: Vec<Point>) -> Self {
        self.points = points;
        self
    }

    /// Eraser strokes remove coverage instead of painting
    pub fn is_eraser(&self) -> bool {
        self.brush_id == ERASER_BRUSH_ID
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of the first point with non-finite coordinates
    pub fn first_invalid_point(&self) -> Option<usize> {
        self.points
            .iter()
            .position(|p| !(p.x.is_finite() && p.y.is_finite()))
    }
}

/// Where a layer's pixels come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    /// Rasterized from the project's strokes
    #[default]
    Drawing,
    /// External image stretched to the project size
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: String,
    pub name: String,
    pub is_visible: bool,
    pub is_locked: bool,
    pub opacity: f32,
    #[serde(default)]
    pub blend_mode: BlendMode,
    #[serde(rename = "type", default)]
    pub layer_type: LayerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Layer {
    pub fn drawing(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_visible: true,
            is_locked: false,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            layer_type: LayerType::Drawing,
            image_url: None,
        }
    }

    pub fn image(
        id: impl Into<String>,
        name: impl Into<String>,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            layer_type: LayerType::Image,
            image_url: Some(image_url.into()),
            ..Self::drawing(id, name)
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_visibility(mut self, is_visible: bool) -> Self {
        self.is_visible = is_visible;
        self
    }

    pub fn with_locked(mut self, is_locked: bool) -> Self {
        self.is_locked = is_locked;
        self
    }

    /// Layers that refuse new strokes (locked or image layers)
    pub fn accepts_strokes(&self) -> bool {
        !self.is_locked && self.layer_type == LayerType::Drawing
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_texture_url: Option<String>,
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub strokes: Vec<Stroke>,
    #[serde(default)]
    pub last_modified: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

/// Reject project sizes outside 1..=MAX_PROJECT_EDGE
pub fn validate_dimensions(width: u32, height: u32) -> Result<(), CoreError> {
    if width == 0 || height == 0 {
        return Err(CoreError::InvalidInput(
            "Width and height must be greater than zero".to_string(),
        ));
    }
    if width > MAX_PROJECT_EDGE || height > MAX_PROJECT_EDGE {
        return Err(CoreError::InvalidInput(format!(
            "Project size exceeds maximum ({}x{})",
            MAX_PROJECT_EDGE, MAX_PROJECT_EDGE
        )));
    }
    Ok(())
}

impl Project {
    /// New project with a single empty drawing layer and a white background
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Result<Self, CoreError> {
        validate_dimensions(width, height)?;
        let now = now_millis();
        Ok(Self {
            id: format!("proj-{}", now),
            name: name.into(),
            width,
            height,
            background_color: Some(DEFAULT_BACKGROUND.to_string()),
            background_texture_url: None,
            layers: vec![Layer::drawing(format!("layer-{}", now), "Layer 1")],
            strokes: Vec::new(),
            last_modified: now,
            thumbnail: None,
            owner_id: None,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let project: Self = serde_json::from_str(json)?;
        validate_dimensions(project.width, project.height)?;
        Ok(project)
    }

    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: &str) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    /// Strokes that make up a drawing layer, oldest first
    pub fn strokes_for_layer<'a>(&'a self, layer_id: &'a str) -> impl Iterator<Item = &'a Stroke> + 'a {
        self.strokes.iter().filter(move |s| s.layer_id == layer_id)
    }

    /// Strokes whose layer has been deleted; they render nowhere
    pub fn orphaned_strokes(&self) -> impl Iterator<Item = &Stroke> + '_ {
        self.strokes
            .iter()
            .filter(move |s| self.layer(&s.layer_id).is_none())
    }

    /// Append a finished stroke to the stroke list
    pub fn commit_stroke(&mut self, stroke: Stroke) -> Result<(), CoreError> {
        if stroke.is_empty() {
            return Err(CoreError::InvalidGeometry(format!(
                "stroke {} has no points",
                stroke.id
            )));
        }
        if let Some(index) = stroke.first_invalid_point() {
            return Err(CoreError::InvalidGeometry(format!(
                "stroke {} has a non-finite point at index {}",
                stroke.id, index
            )));
        }
        self.strokes.push(stroke);
        self.touch();
        Ok(())
    }

    /// Insert a layer directly above `active_id`, or on top when not found
    pub fn add_layer_above(&mut self, active_id: Option<&str>, layer: Layer) {
        let index = active_id
            .and_then(|id| self.layers.iter().position(|l| l.id == id))
            .map(|i| i + 1)
            .unwrap_or(self.layers.len());
        self.layers.insert(index, layer);
        self.touch();
    }

    /// Remove a layer; its strokes stay in the stroke list as orphans
    pub fn remove_layer(&mut self, id: &str) -> Option<Layer> {
        let index = self.layers.iter().position(|l| l.id == id)?;
        let removed = self.layers.remove(index);
        self.touch();
        Some(removed)
    }

    pub fn background(&self) -> Option<&str> {
        self.background_color.as_deref()
    }

    fn touch(&mut self) {
        self.last_modified = now_millis().max(self.last_modified);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn stroke(id: &str, layer: &str, points: Vec<Point>) -> Stroke {
        Stroke::new(id, "b-ink", BrushSettings::default(), "#000000", layer).with_points(points)
    }

    #[test]
    fn test_new_project_defaults() {
        let project = Project::new("Sketch", 800, 600).unwrap();
        assert_eq!(project.layers.len(), 1);
        assert_eq!(project.background(), Some("#ffffff"));
        assert_eq!(project.layers[0].blend_mode, BlendMode::Normal);
        assert!(project.layers[0].accepts_strokes());
        assert!(project.strokes.is_empty());
    }

    #[test]
    fn test_project_size_limits() {
        assert!(Project::new("a", 0, 10).is_err());
        assert!(Project::new("a", 10, 0).is_err());
        assert!(Project::new("a", MAX_PROJECT_EDGE + 1, 10).is_err());
        assert!(Project::new("a", MAX_PROJECT_EDGE, MAX_PROJECT_EDGE).is_ok());
    }

    #[test]
    fn test_commit_rejects_empty_and_non_finite() {
        let mut project = Project::new("a", 100, 100).unwrap();
        let layer = project.layers[0].id.clone();

        assert!(project.commit_stroke(stroke("s0", &layer, vec![])).is_err());
        let bad = vec![Point::new(1.0, 1.0, 0.5, 0), Point::new(f32::NAN, 2.0, 0.5, 1)];
        assert!(matches!(
            project.commit_stroke(stroke("s1", &layer, bad)),
            Err(CoreError::InvalidGeometry(_))
        ));
        assert!(project.strokes.is_empty());

        let good = vec![Point::new(1.0, 1.0, 0.5, 0)];
        project.commit_stroke(stroke("s2", &layer, good)).unwrap();
        assert_eq!(project.strokes.len(), 1);
    }

    #[test]
    fn test_strokes_filtered_by_layer_in_order() {
        let mut project = Project::new("a", 100, 100).unwrap();
        project.add_layer_above(None, Layer::drawing("top", "Top"));
        let bottom = project.layers[0].id.clone();
        let p = vec![Point::new(1.0, 1.0, 0.5, 0)];
        project.commit_stroke(stroke("a", &bottom, p.clone())).unwrap();
        project.commit_stroke(stroke("b", "top", p.clone())).unwrap();
        project.commit_stroke(stroke("c", &bottom, p)).unwrap();

        let ids: Vec<&str> = project
            .strokes_for_layer(&bottom)
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_removed_layer_orphans_strokes() {
        let mut project = Project::new("a", 100, 100).unwrap();
        project.add_layer_above(None, Layer::drawing("gone", "Gone"));
        let p = vec![Point::new(1.0, 1.0, 0.5, 0)];
        project.commit_stroke(stroke("x", "gone", p)).unwrap();

        assert_eq!(project.orphaned_strokes().count(), 0);
        assert!(project.remove_layer("gone").is_some());
        assert_eq!(project.strokes.len(), 1);
        let orphans: Vec<&str> = project.orphaned_strokes().map(|s| s.id.as_str()).collect();
        assert_eq!(orphans, vec!["x"]);
    }

    #[test]
    fn test_add_layer_above_active() {
        let mut project = Project::new("a", 10, 10).unwrap();
        let base = project.layers[0].id.clone();
        project.add_layer_above(None, Layer::drawing("top", "Top"));
        project.add_layer_above(Some(&base), Layer::drawing("mid", "Mid"));
        let order: Vec<&str> = project.layers.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(order, vec![base.as_str(), "mid", "top"]);

        project.add_layer_above(Some("missing"), Layer::drawing("end", "End"));
        assert_eq!(project.layers.last().unwrap().id, "end");
    }

    #[test]
    fn test_eraser_tag() {
        let s = Stroke::new("s", ERASER_BRUSH_ID, BrushSettings::default(), "#000", "l");
        assert!(s.is_eraser());
        assert!(!stroke("t", "l", vec![]).is_eraser());
    }

    #[test]
    fn test_project_json_shape() {
        let json = r##"{
            "id": "proj-1", "name": "Demo", "width": 64, "height": 32,
            "backgroundColor": "#ffffff",
            "layers": [
                {"id": "l1", "name": "Ink", "isVisible": true, "isLocked": false,
                 "opacity": 1, "blendMode": "source-over", "type": "drawing"},
                {"id": "l2", "name": "Photo", "isVisible": false, "isLocked": true,
                 "opacity": 0.5, "blendMode": "multiply", "type": "image",
                 "imageUrl": "data:image/png;base64,AAAA"}
            ],
            "strokes": [
                {"id": "stroke-1", "brushId": "b-ink", "color": "#1C1B18", "layerId": "l1",
                 "brushSettings": {"size": 8, "angle": 0, "roundness": 100, "opacity": 1,
                    "pressureSensitivity": true, "stabilization": 0.02, "hardness": 1,
                    "minSize": 2, "maxSize": 15},
                 "points": [{"x": 1, "y": 2, "pressure": 0.5, "timestamp": 10}]}
            ],
            "lastModified": 123
        }"##;
        let project = Project::from_json(json).unwrap();
        assert_eq!(project.layers[0].blend_mode, BlendMode::Normal);
        assert_eq!(project.layers[1].blend_mode, BlendMode::Multiply);
        assert_eq!(project.layers[1].layer_type, LayerType::Image);
        assert_eq!(project.strokes[0].points[0].timestamp, 10);
        assert!(!project.layers[0].is_locked);

        let out = serde_json::to_value(&project).unwrap();
        assert_eq!(out["layers"][0]["isVisible"], true);
        assert_eq!(out["strokes"][0]["brushSettings"]["maxSize"], 15.0);
        assert!(out.get("thumbnail").is_none());
    }

    #[test]
    fn test_project_json_rejects_bad_size() {
        let json = r#"{"id": "p", "width": 0, "height": 10, "layers": []}"#;
        assert!(Project::from_json(json).is_err());
    }
}
