//! Pressure normalization - raw device pressure to perceptual pressure

use super::{PointerSample, PointerType};
use crate::config::PressureConfig;

/// Pressure response curves
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PressureCurve {
    /// Linear mapping (1:1)
    Linear,
    /// `p^exponent`; exponents below 1 register light touches sooner
    Power(f32),
}

impl Default for PressureCurve {
    fn default() -> Self {
        PressureCurve::Power(crate::config::DEFAULT_PRESSURE_EXPONENT)
    }
}

impl PressureCurve {
    /// Apply the pressure curve to a raw pressure value
    pub fn apply(&self, pressure: f32) -> f32 {
        let p = pressure.clamp(0.0, 1.0);

        match self {
            PressureCurve::Linear => p,
            PressureCurve::Power(exponent) => p.powf(*exponent),
        }
    }
}

/// Maps pointer samples to perceptual pressure in [0, 1]
#[derive(Debug, Clone, Copy)]
pub struct PressureNormalizer {
    curve: PressureCurve,
    fallback: f32,
}

impl PressureNormalizer {
    pub fn new(config: &PressureConfig) -> Self {
        let curve = if config.exponent == 1.0 {
            PressureCurve::Linear
        } else {
            PressureCurve::Power(config.exponent)
        };
        Self {
            curve,
            fallback: config.fallback.clamp(0.0, 1.0),
        }
    }

    /// Perceptual pressure for one sample.
    ///
    /// Mice, and devices whose pressure and force channels are absent or
    /// zero, get the fixed midpoint so pressure-sensitive brushes still draw
    /// at a usable width.
    pub fn normalize(&self, sample: &PointerSample) -> f32 {
        if sample.pointer_type == PointerType::Mouse {
            return self.fallback;
        }
        let reading = [sample.pressure, sample.force]
            .into_iter()
            .flatten()
            .find(|v| v.is_finite() && *v > 0.0);
        match reading {
            Some(raw) => self.curve.apply(raw),
            None => self.fallback,
        }
    }
}

impl Default for PressureNormalizer {
    fn default() -> Self {
        Self::new(&PressureConfig::default())
    }
}

/// Normalize with the default curve
pub fn normalize_pressure(sample: &PointerSample) -> f32 {
    PressureNormalizer::default().normalize(sample)
}
