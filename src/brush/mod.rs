//! Brush module - brush settings, presets, and stroke rasterization

mod engine;
mod interpolation;
mod library;
mod share;

pub use engine::{preview_stroke, render_brush_preview, render_stroke, BrushRasterizer};
pub use interpolation::{calligraphy_stamps, Stamp};
pub use library::{builtin_brushes, find_builtin, library_brushes, BrushLibrary};
pub use share::{
    decode_brush_link, encode_brush_link, export_brush_file, import_brush_file,
    import_brush_from_path, suggested_file_name, BRUSH_FILE_EXTENSION,
};

use crate::core::errors::CoreError;
use serde::{Deserialize, Serialize};

/// Roundness at or above which the nib is a circle (round-pen mode)
pub const FULL_ROUNDNESS: f32 = 100.0;

/// Brush id that tags a stroke as an eraser stroke
pub const ERASER_BRUSH_ID: &str = "eraser";

/// Brush dynamics and appearance, snapshotted into every stroke
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrushSettings {
    /// Base brush size in pixels
    pub size: f32,
    /// Nib angle in degrees (0 - 180)
    pub angle: f32,
    /// Nib height as a percentage of its width (1 - 100)
    pub roundness: f32,
    /// Draw opacity (0.0 - 1.0)
    pub opacity: f32,
    /// Pressure drives size between `min_size` and `max_size`
    pub pressure_sensitivity: bool,
    /// Stabilizer strength (0.0 - 1.0)
    pub stabilization: f32,
    /// Hardness (0.0 - 1.0)
    pub hardness: f32,
    pub min_size: f32,
    pub max_size: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture_scale: Option<f32>,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            size: 10.0,
            angle: 0.0,
            roundness: FULL_ROUNDNESS,
            opacity: 1.0,
            pressure_sensitivity: true,
            stabilization: 0.0,
            hardness: 1.0,
            min_size: 2.0,
            max_size: 20.0,
            texture_url: None,
            texture_scale: None,
        }
    }
}

impl BrushSettings {
    /// Per-sample size for a perceptual pressure
    pub fn dynamic_size(&self, pressure: f32) -> f32 {
        if self.pressure_sensitivity {
            self.min_size + (self.max_size - self.min_size) * pressure
        } else {
            self.size
        }
    }

    /// Elliptical nib (stamped calligraphy) instead of a round pen
    pub fn is_calligraphy(&self) -> bool {
        self.roundness < FULL_ROUNDNESS
    }

    /// Nib rotation in radians
    pub fn angle_radians(&self) -> f32 {
        self.angle.to_radians()
    }

    /// Change `size`, rescaling `min_size`/`max_size` by the same ratio
    pub fn with_size(&self, size: f32) -> Self {
        let old = if self.size == 0.0 { 1.0 } else { self.size };
        let ratio = size / old;
        Self {
            size,
            min_size: self.min_size * ratio,
            max_size: self.max_size * ratio,
            ..self.clone()
        }
    }

    /// Check every field against its documented range
    pub fn validate(&self) -> Result<(), CoreError> {
        let check = |ok: bool, what: &str| {
            if ok {
                Ok(())
            } else {
                Err(CoreError::InvalidInput(format!("brush settings: {}", what)))
            }
        };
        let unit = |v: f32| (0.0..=1.0).contains(&v);

        check(self.size.is_finite() && self.size > 0.0, "size must be > 0")?;
        check((0.0..=180.0).contains(&self.angle), "angle must be in 0..=180")?;
        check(
            (1.0..=FULL_ROUNDNESS).contains(&self.roundness),
            "roundness must be in 1..=100",
        )?;
        check(unit(self.opacity), "opacity must be in 0..=1")?;
        check(unit(self.stabilization), "stabilization must be in 0..=1")?;
        check(unit(self.hardness), "hardness must be in 0..=1")?;
        check(
            self.min_size.is_finite() && self.min_size >= 0.0,
            "minSize must be >= 0",
        )?;
        check(
            self.max_size.is_finite() && self.max_size >= self.min_size,
            "maxSize must be >= minSize",
        )?;
        if let Some(scale) = self.texture_scale {
            check(scale.is_finite() && scale > 0.0, "textureScale must be > 0")?;
        }
        Ok(())
    }
}

/// Rendering family of a brush preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BrushType {
    #[default]
    Raster,
    VectorCalligraphy,
}

/// Palette section a brush is listed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrushCategory {
    Sketch,
    Calligraphy,
    #[default]
    Custom,
    Library,
}

/// A named brush preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brush {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub brush_type: BrushType,
    pub settings: BrushSettings,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub category: BrushCategory,
}

impl Brush {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidInput("brush name is empty".to_string()));
        }
        self.settings.validate()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dynamic_size() {
        let s = BrushSettings {
            min_size: 4.0,
            max_size: 20.0,
            size: 9.0,
            ..BrushSettings::default()
        };
        assert_eq!(s.dynamic_size(0.0), 4.0);
        assert_eq!(s.dynamic_size(0.5), 12.0);
        assert_eq!(s.dynamic_size(1.0), 20.0);

        let fixed = BrushSettings {
            pressure_sensitivity: false,
            ..s
        };
        assert_eq!(fixed.dynamic_size(0.1), 9.0);
    }

    #[test]
    fn test_with_size_keeps_ratio() {
        let s = BrushSettings {
            size: 10.0,
            min_size: 2.0,
            max_size: 20.0,
            ..BrushSettings::default()
        };
        let r = s.with_size(25.0);
        assert_eq!(r.size, 25.0);
        assert_eq!(r.min_size, 5.0);
        assert_eq!(r.max_size, 50.0);
        assert!(r.validate().is_ok());
    }

    #[test]
    fn test_with_size_from_zero() {
        let s = BrushSettings {
            size: 0.0,
            min_size: 1.0,
            max_size: 3.0,
            ..BrushSettings::default()
        };
        let r = s.with_size(2.0);
        assert_eq!((r.min_size, r.max_size), (2.0, 6.0));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let ok = BrushSettings::default();
        assert!(ok.validate().is_ok());

        let bad = [
            BrushSettings { size: 0.0, ..ok.clone() },
            BrushSettings { angle: 200.0, ..ok.clone() },
            BrushSettings { roundness: 0.0, ..ok.clone() },
            BrushSettings { opacity: 1.5, ..ok.clone() },
            BrushSettings { stabilization: -0.1, ..ok.clone() },
            BrushSettings { min_size: 30.0, max_size: 20.0, ..ok.clone() },
            BrushSettings { size: f32::NAN, ..ok.clone() },
            BrushSettings { texture_scale: Some(0.0), ..ok.clone() },
        ];
        for settings in bad {
            assert!(settings.validate().is_err(), "{:?}", settings);
        }
    }

    #[test]
    fn test_mode_selection() {
        let round = BrushSettings::default();
        assert!(!round.is_calligraphy());
        let nib = BrushSettings {
            roundness: 99.0,
            ..round
        };
        assert!(nib.is_calligraphy());
    }

    #[test]
    fn test_brush_json_shape() {
        let json = r#"{
            "id": "b-x", "name": "X", "type": "VECTOR_CALLIGRAPHY", "category": "calligraphy",
            "settings": {"size": 30, "angle": 45, "roundness": 15, "opacity": 1,
                "pressureSensitivity": true, "stabilization": 0.1, "hardness": 1,
                "minSize": 5, "maxSize": 80, "textureScale": 1}
        }"#;
        let brush: Brush = serde_json::from_str(json).unwrap();
        assert_eq!(brush.brush_type, BrushType::VectorCalligraphy);
        assert_eq!(brush.category, BrushCategory::Calligraphy);
        assert!(!brush.is_default);
        assert_eq!(brush.settings.texture_scale, Some(1.0));
        assert_eq!(brush.settings.texture_url, None);

        let out = serde_json::to_value(&brush).unwrap();
        assert_eq!(out["settings"]["pressureSensitivity"], true);
        assert_eq!(out["type"], "VECTOR_CALLIGRAPHY");
        assert!(out["settings"].get("textureUrl").is_none());
    }
}
