//! Input module - turns pointer events into project-space stroke points

mod coordinate_mapper;
mod pressure;
mod session;
mod stabilizer;

pub use coordinate_mapper::{fit_zoom, CoordinateMapper, ScreenRect, ViewTransform};
pub use pressure::{normalize_pressure, PressureCurve, PressureNormalizer};
pub use session::{
    ActiveCapture, CaptureContext, CaptureOutcome, CaptureSession, PanGesture, SessionState,
    SessionUpdate,
};
pub use stabilizer::{stabilize, InputStabilizer};

use serde::{Deserialize, Serialize};

/// Pointer button index of the primary (left / pen tip) button
pub const PRIMARY_BUTTON: u16 = 0;

/// Pointer button index of the middle (wheel) button
pub const MIDDLE_BUTTON: u16 = 1;

/// A stroke sample in project space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Point {
    /// X coordinate in project pixels
    pub x: f32,
    /// Y coordinate in project pixels
    pub y: f32,
    /// Perceptual pressure (0.0 - 1.0)
    pub pressure: f32,
    /// Event timestamp in milliseconds
    pub timestamp: u64,
}

impl Point {
    pub fn new(x: f32, y: f32, pressure: f32, timestamp: u64) -> Self {
        Self {
            x,
            y,
            pressure,
            timestamp,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.pressure.is_finite()
    }

    /// Linear interpolation of position and pressure; keeps `self`'s timestamp
    pub fn lerp(&self, other: &Point, t: f32) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            pressure: self.pressure + (other.pressure - self.pressure) * t,
            timestamp: self.timestamp,
        }
    }

    pub fn distance_to(&self, other: &Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Kind of device that produced a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PointerType {
    #[default]
    Mouse,
    Pen,
    Touch,
}

/// Raw pointer event as delivered by the host toolkit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerSample {
    /// X in screen (client) pixels
    pub client_x: f32,
    /// Y in screen (client) pixels
    pub client_y: f32,
    /// Reported pressure, if the device has a pressure channel
    #[serde(default)]
    pub pressure: Option<f32>,
    /// Reported force (touch devices), if any
    #[serde(default)]
    pub force: Option<f32>,
    #[serde(default)]
    pub pointer_type: PointerType,
    /// Button index (0 = primary, 1 = middle)
    #[serde(default)]
    pub button: u16,
    /// Timestamp in milliseconds
    pub timestamp: u64,
}

impl PointerSample {
    /// Primary-button mouse sample without pressure
    pub fn mouse(client_x: f32, client_y: f32, timestamp: u64) -> Self {
        Self {
            client_x,
            client_y,
            pressure: None,
            force: None,
            pointer_type: PointerType::Mouse,
            button: PRIMARY_BUTTON,
            timestamp,
        }
    }

    /// Pen sample with a pressure reading
    pub fn pen(client_x: f32, client_y: f32, pressure: f32, timestamp: u64) -> Self {
        Self {
            client_x,
            client_y,
            pressure: Some(pressure),
            force: None,
            pointer_type: PointerType::Pen,
            button: PRIMARY_BUTTON,
            timestamp,
        }
    }

    pub fn with_button(mut self, button: u16) -> Self {
        self.button = button;
        self
    }
}

/// Active tool mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ToolType {
    #[default]
    Pen,
    Eraser,
    Hand,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_lerp_keeps_timestamp() {
        let a = Point::new(0.0, 0.0, 0.0, 10);
        let b = Point::new(10.0, 20.0, 1.0, 20);
        let mid = a.lerp(&b, 0.5);
        assert_eq!(mid.x, 5.0);
        assert_eq!(mid.y, 10.0);
        assert_eq!(mid.pressure, 0.5);
        assert_eq!(mid.timestamp, 10);
    }

    #[test]
    fn test_point_finite_check() {
        assert!(Point::new(1.0, 2.0, 0.5, 0).is_finite());
        assert!(!Point::new(f32::NAN, 2.0, 0.5, 0).is_finite());
        assert!(!Point::new(1.0, f32::INFINITY, 0.5, 0).is_finite());
    }

    #[test]
    fn test_pointer_sample_json_shape() {
        let json = r#"{"clientX": 12.0, "clientY": 8.0, "pressure": 0.4, "pointerType": "pen", "timestamp": 5}"#;
        let sample: PointerSample = serde_json::from_str(json).unwrap_or(PointerSample::mouse(0.0, 0.0, 0));
        assert_eq!(sample.pointer_type, PointerType::Pen);
        assert_eq!(sample.pressure, Some(0.4));
        assert_eq!(sample.button, PRIMARY_BUTTON);
    }
}
