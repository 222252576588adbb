//! Engine configuration
//!
//! Every numeric policy the capture and rendering pipeline depends on lives
//! here so hosts can tune it from a single JSON file. Missing fields fall back
//! to the defaults below.

use crate::core::errors::CoreError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pressure reported when the device has no usable pressure channel
pub const DEFAULT_FALLBACK_PRESSURE: f32 = 0.5;

/// Exponent of the concave pressure curve
pub const DEFAULT_PRESSURE_EXPONENT: f32 = 0.7;

/// Largest accepted project edge in pixels
pub const MAX_PROJECT_EDGE: u32 = 16384;

/// Pressure normalization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PressureConfig {
    /// Exponent applied to genuine pressure readings
    pub exponent: f32,
    /// Value used for mice and devices without pressure
    pub fallback: f32,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            exponent: DEFAULT_PRESSURE_EXPONENT,
            fallback: DEFAULT_FALLBACK_PRESSURE,
        }
    }
}

/// Input stabilizer tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StabilizerConfig {
    /// Multiplier turning stabilization strength into damping
    pub damping_scale: f32,
    /// Upper bound on damping; keeps the lerp factor above zero
    pub max_damping: f32,
    /// Extra lerp factor per missing sample at stroke start
    pub start_boost_step: f32,
    /// Number of leading samples that receive the start boost
    pub start_boost_window: usize,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            damping_scale: 0.9,
            max_damping: 0.98,
            start_boost_step: 0.1,
            start_boost_window: 5,
        }
    }
}

/// Brush rasterization constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RasterConfig {
    /// Stamp spacing as a fraction of the nib size (calligraphy mode)
    pub stamp_spacing_ratio: f32,
    /// Smallest stamp spacing in pixels
    pub min_stamp_spacing: f32,
    /// Smallest half-height of a calligraphy stamp
    pub min_stamp_half_height: f32,
    /// Smallest line width / dot radius in round-pen mode
    pub min_line_width: f32,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            stamp_spacing_ratio: 0.02,
            min_stamp_spacing: 0.3,
            min_stamp_half_height: 0.4,
            min_line_width: 0.1,
        }
    }
}

/// Compositing and export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComposeConfig {
    /// Background used when a project has none
    pub default_background: String,
    /// Rasterize layers on worker threads
    pub parallel: bool,
    /// Longest edge of exported thumbnails
    pub thumbnail_edge: u32,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            default_background: "#ffffff".to_string(),
            parallel: false,
            thumbnail_edge: 256,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub pressure: PressureConfig,
    pub stabilizer: StabilizerConfig,
    pub raster: RasterConfig,
    pub compose: ComposeConfig,
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        tracing::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from JSON text
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), CoreError> {
        let p = &self.pressure;
        if !(p.exponent.is_finite() && p.exponent > 0.0) {
            return Err(CoreError::InvalidInput(
                "pressure.exponent must be a positive number".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&p.fallback) {
            return Err(CoreError::InvalidInput(
                "pressure.fallback must be in [0, 1]".to_string(),
            ));
        }
        let s = &self.stabilizer;
        if !(0.0..1.0).contains(&s.max_damping) {
            return Err(CoreError::InvalidInput(
                "stabilizer.maxDamping must be in [0, 1)".to_string(),
            ));
        }
        if !(s.damping_scale.is_finite() && s.damping_scale >= 0.0) {
            return Err(CoreError::InvalidInput(
                "stabilizer.dampingScale must be a non-negative number".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&s.start_boost_step) {
            return Err(CoreError::InvalidInput(
                "stabilizer.startBoostStep must be in [0, 1]".to_string(),
            ));
        }
        let r = &self.raster;
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !(positive(r.min_stamp_spacing) && positive(r.min_line_width)) {
            return Err(CoreError::InvalidInput(
                "raster minimums must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
