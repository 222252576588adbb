//! Input stabilizer - streaming jitter reduction for live strokes
//!
//! Each new raw point is pulled toward the previous stabilized point by a
//! single lerp factor:
//! 1. Damping grows with stabilization strength but is capped, so the factor
//!    never reaches zero and the stroke never freezes
//! 2. Start boost: the first few samples of a stroke get a larger factor,
//!    fading linearly to zero, so a fresh stroke does not trail the pointer
//!
//! Only the previous stabilized point and the sample count are needed, so
//! memory is O(1) regardless of stroke length.

use super::Point;
use crate::config::StabilizerConfig;

/// Lerp factor for a stroke that already has `prior_count` points
fn lerp_factor(config: &StabilizerConfig, prior_count: usize, strength: f32) -> f32 {
    let damping = (strength * config.damping_scale).min(config.max_damping);
    let base = 1.0 - damping;
    let boost = if prior_count < config.start_boost_window {
        (config.start_boost_window - prior_count) as f32 * config.start_boost_step
    } else {
        0.0
    };
    (base + boost).clamp(0.0, 1.0)
}

fn stabilize_step(
    config: &StabilizerConfig,
    last: Option<&Point>,
    prior_count: usize,
    raw: Point,
    strength: f32,
) -> Point {
    let Some(last) = last else {
        return raw;
    };
    if !(strength.is_finite() && strength > 0.0) {
        return raw;
    }
    let t = lerp_factor(config, prior_count, strength);
    Point {
        timestamp: raw.timestamp,
        ..last.lerp(&raw, t)
    }
}

/// Stabilize `raw` against the already-stabilized points of the stroke.
///
/// Only the last prior point and the number of prior points are consulted.
pub fn stabilize(prior: &[Point], raw: Point, strength: f32) -> Point {
    stabilize_step(
        &StabilizerConfig::default(),
        prior.last(),
        prior.len(),
        raw,
        strength,
    )
}

/// Streaming stabilizer holding only the last stabilized point
#[derive(Debug, Clone)]
pub struct InputStabilizer {
    config: StabilizerConfig,
    strength: f32,
    last: Option<Point>,
    count: usize,
}

impl InputStabilizer {
    pub fn new(strength: f32) -> Self {
        Self::with_config(StabilizerConfig::default(), strength)
    }

    pub fn with_config(config: StabilizerConfig, strength: f32) -> Self {
        Self {
            config,
            strength,
            last: None,
            count: 0,
        }
    }

    /// Stabilize the next raw point and remember the result
    pub fn push(&mut self, raw: Point) -> Point {
        let out = stabilize_step(
            &self.config,
            self.last.as_ref(),
            self.count,
            raw,
            self.strength,
        );
        self.last = Some(out);
        self.count += 1;
        out
    }

    /// Number of points seen in the current stroke
    pub fn count(&self) -> usize {
        self.count
    }

    /// Reset the stabilizer state (call when stroke ends)
    pub fn reset(&mut self) {
        self.last = None;
        self.count = 0;
    }
}
