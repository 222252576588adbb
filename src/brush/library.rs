//! Brush presets and the custom brush library.

use indexmap::IndexMap;
use std::path::{Path, PathBuf};

use super::{Brush, BrushCategory, BrushSettings, BrushType};
use crate::core::errors::CoreError;
use crate::core::now_millis;

const PAPER_TEXTURE: &str = "https://www.transparenttextures.com/patterns/handmade-paper.png";
const CHARCOAL_TEXTURE: &str = "https://www.transparenttextures.com/patterns/asfalt-dark.png";

#[allow(clippy::too_many_arguments)]
fn settings(
    size: f32,
    angle: f32,
    roundness: f32,
    opacity: f32,
    stabilization: f32,
    hardness: f32,
    min_size: f32,
    max_size: f32,
) -> BrushSettings {
    BrushSettings {
        size,
        angle,
        roundness,
        opacity,
        pressure_sensitivity: true,
        stabilization,
        hardness,
        min_size,
        max_size,
        texture_url: None,
        texture_scale: None,
    }
}

fn textured(settings: BrushSettings, url: &str) -> BrushSettings {
    BrushSettings {
        texture_url: Some(url.to_string()),
        texture_scale: Some(1.0),
        ..settings
    }
}

fn preset(
    id: &str,
    name: &str,
    brush_type: BrushType,
    category: BrushCategory,
    settings: BrushSettings,
) -> Brush {
    Brush {
        id: id.to_string(),
        name: name.to_string(),
        brush_type,
        settings,
        is_default: category != BrushCategory::Library,
        category,
    }
}

/// Brushes shipped in the sketch and calligraphy palettes
pub fn builtin_brushes() -> Vec<Brush> {
    use BrushCategory::{Calligraphy, Sketch};
    use BrushType::{Raster, VectorCalligraphy};

    vec![
        preset(
            "b-pencil",
            "Pencil",
            Raster,
            Sketch,
            textured(settings(5.0, 0.0, 100.0, 0.8, 0.0, 0.8, 1.0, 10.0), PAPER_TEXTURE),
        ),
        preset(
            "b-charcoal",
            "Charcoal Pencil",
            Raster,
            Sketch,
            textured(
                settings(15.0, 0.0, 90.0, 0.7, 0.05, 0.5, 3.0, 30.0),
                CHARCOAL_TEXTURE,
            ),
        ),
        preset(
            "b-soft-sketch",
            "Soft Sketch",
            Raster,
            Sketch,
            settings(20.0, 0.0, 100.0, 0.4, 0.0, 0.2, 5.0, 40.0),
        ),
        preset(
            "b-ink",
            "Ink",
            Raster,
            Sketch,
            settings(8.0, 0.0, 100.0, 1.0, 0.02, 1.0, 2.0, 15.0),
        ),
        preset(
            "b-reed-pen",
            "Reed Pen",
            VectorCalligraphy,
            Calligraphy,
            settings(30.0, 60.0, 15.0, 1.0, 0.1, 1.0, 5.0, 80.0),
        ),
        preset(
            "b-cal-thin",
            "Calligraphy Thin",
            VectorCalligraphy,
            Calligraphy,
            settings(15.0, 45.0, 20.0, 1.0, 0.05, 1.0, 10.0, 25.0),
        ),
        preset(
            "b-cal-med",
            "Calligraphy Med",
            VectorCalligraphy,
            Calligraphy,
            settings(30.0, 45.0, 15.0, 1.0, 0.08, 1.0, 20.0, 50.0),
        ),
        preset(
            "b-cal-bold",
            "Calligraphy Bold",
            VectorCalligraphy,
            Calligraphy,
            settings(60.0, 45.0, 10.0, 1.0, 0.1, 1.0, 40.0, 100.0),
        ),
    ]
}

/// Extra calligraphy nibs offered from the brush library
pub fn library_brushes() -> Vec<Brush> {
    use BrushCategory::Library;
    use BrushType::VectorCalligraphy;

    vec![
        preset(
            "lib-diwani",
            "Diwani Pen",
            VectorCalligraphy,
            Library,
            settings(40.0, 30.0, 12.0, 1.0, 0.1, 1.0, 20.0, 70.0),
        ),
        preset(
            "lib-thuluth",
            "Thuluth Pen",
            VectorCalligraphy,
            Library,
            settings(55.0, 75.0, 8.0, 1.0, 0.15, 1.0, 30.0, 120.0),
        ),
    ]
}

/// Look up a built-in or library preset by id
pub fn find_builtin(id: &str) -> Option<Brush> {
    builtin_brushes()
        .into_iter()
        .chain(library_brushes())
        .find(|b| b.id == id)
}

/// Presets plus user brushes, in palette order.
///
/// Only custom brushes are persisted; presets are rebuilt on every load.
#[derive(Debug)]
pub struct BrushLibrary {
    brushes: IndexMap<String, Brush>,
    path: Option<PathBuf>,
    dirty: bool,
}

impl Default for BrushLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl BrushLibrary {
    pub fn new() -> Self {
        let brushes = builtin_brushes()
            .into_iter()
            .chain(library_brushes())
            .map(|b| (b.id.clone(), b))
            .collect();
        Self {
            brushes,
            path: None,
            dirty: false,
        }
    }

    /// Load custom brushes from a JSON file; a missing or unreadable file
    /// yields just the presets
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut library = Self::new();

        if path.exists() {
            let custom = std::fs::read_to_string(&path)
                .map_err(CoreError::from)
                .and_then(|json| Ok(serde_json::from_str::<Vec<Brush>>(&json)?));
            match custom {
                Ok(brushes) => {
                    for brush in brushes {
                        if let Err(err) = brush.validate() {
                            tracing::warn!("Skipping invalid custom brush {}: {}", brush.id, err);
                            continue;
                        }
                        library.insert_custom(brush);
                    }
                }
                Err(err) => tracing::warn!("Failed to load custom brushes: {}", err),
            }
        }

        tracing::info!(
            "Loaded brush library: {} brushes ({} custom)",
            library.brushes.len(),
            library.custom().count()
        );
        library.path = Some(path);
        library.dirty = false;
        library
    }

    /// Write custom brushes back to the file they were loaded from
    pub fn save(&mut self) -> Result<(), CoreError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let custom: Vec<&Brush> = self.custom().collect();
        std::fs::write(path, serde_json::to_string_pretty(&custom)?)?;
        self.dirty = false;
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&Brush> {
        self.brushes.get(id)
    }

    pub fn len(&self) -> usize {
        self.brushes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brushes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Brush> {
        self.brushes.values()
    }

    pub fn by_category(&self, category: BrushCategory) -> impl Iterator<Item = &Brush> {
        self.brushes.values().filter(move |b| b.category == category)
    }

    pub fn custom(&self) -> impl Iterator<Item = &Brush> {
        self.by_category(BrushCategory::Custom)
    }

    /// Save a copy of `brush` as a new custom brush; returns the new id
    pub fn save_custom(&mut self, brush: &Brush) -> String {
        let copy = Brush {
            id: format!("c-{}", now_millis()),
            ..brush.clone()
        };
        self.insert_custom(copy)
    }

    /// Add an imported brush after validating it; returns the stored id
    pub fn import(&mut self, brush: Brush) -> Result<String, CoreError> {
        brush
            .validate()
            .map_err(|err| CoreError::BrushImport(err.to_string()))?;
        Ok(self.insert_custom(brush))
    }

    pub fn rename(&mut self, id: &str, new_name: &str) -> Result<(), CoreError> {
        let name = new_name.trim();
        if name.is_empty() {
            return Err(CoreError::InvalidInput(
                "Brush name cannot be empty".to_string(),
            ));
        }
        let brush = self.custom_mut(id)?;
        brush.name = name.to_string();
        self.dirty = true;
        Ok(())
    }

    /// Replace the settings of a custom brush
    pub fn update_settings(&mut self, id: &str, settings: BrushSettings) -> Result<(), CoreError> {
        settings.validate()?;
        self.custom_mut(id)?.settings = settings;
        self.dirty = true;
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<Brush, CoreError> {
        self.custom_mut(id)?;
        let removed = self
            .brushes
            .shift_remove(id)
            .ok_or_else(|| CoreError::InvalidInput(format!("Brush not found: {}", id)))?;
        self.dirty = true;
        Ok(removed)
    }

    fn custom_mut(&mut self, id: &str) -> Result<&mut Brush, CoreError> {
        let brush = self
            .brushes
            .get_mut(id)
            .ok_or_else(|| CoreError::InvalidInput(format!("Brush not found: {}", id)))?;
        if brush.category != BrushCategory::Custom {
            return Err(CoreError::InvalidInput(format!(
                "Preset brushes cannot be modified: {}",
                id
            )));
        }
        Ok(brush)
    }

    fn insert_custom(&mut self, mut brush: Brush) -> String {
        brush.id = self.ensure_unique_id(&brush.id);
        brush.category = BrushCategory::Custom;
        brush.is_default = false;
        let id = brush.id.clone();
        self.brushes.insert(id.clone(), brush);
        self.dirty = true;
        id
    }

    fn ensure_unique_id(&self, base: &str) -> String {
        if !self.brushes.contains_key(base) {
            return base.to_string();
        }
        let mut suffix = 2usize;
        loop {
            let candidate = format!("{}-{}", base, suffix);
            if !self.brushes.contains_key(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }
}
