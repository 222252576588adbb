//! Coordinate mapper - screen (client) pixels to project pixels and back
//!
//! The canvas element is positioned on screen by the pan offset and scaled by
//! the zoom factor; it never rotates. Its on-screen bounding rect therefore
//! already contains the pan, and mapping is a subtraction followed by a
//! division by zoom.

use super::{Point, PointerSample};
use serde::{Deserialize, Serialize};

/// Margin (in screen pixels) kept around the canvas when fitting to view
pub const FIT_MARGIN_PX: f32 = 120.0;

/// Lowest zoom `fit_zoom` will return
pub const MIN_FIT_ZOOM: f32 = 0.1;

/// Zoom used by "reset view"
pub const RESET_ZOOM: f32 = 0.8;

/// On-screen bounding rect of the rendered canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Pan/zoom state of the viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewTransform {
    pub pan_x: f32,
    pub pan_y: f32,
    pub zoom: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            zoom: 1.0,
        }
    }
}

impl ViewTransform {
    /// "Reset view": centered, slightly zoomed out
    pub fn reset() -> Self {
        Self {
            zoom: RESET_ZOOM,
            ..Self::default()
        }
    }

    /// Centered view that fits the project inside the viewport
    pub fn fit(viewport_width: f32, viewport_height: f32, project_width: u32, project_height: u32) -> Self {
        Self {
            zoom: fit_zoom(viewport_width, viewport_height, project_width, project_height),
            ..Self::default()
        }
    }

    pub fn with_pan(mut self, pan_x: f32, pan_y: f32) -> Self {
        self.pan_x = pan_x;
        self.pan_y = pan_y;
        self
    }
}

/// Zoom that fits a project into a viewport, never enlarging past 1:1
pub fn fit_zoom(viewport_width: f32, viewport_height: f32, project_width: u32, project_height: u32) -> f32 {
    let scale_x = (viewport_width - FIT_MARGIN_PX) / project_width.max(1) as f32;
    let scale_y = (viewport_height - FIT_MARGIN_PX) / project_height.max(1) as f32;
    let zoom = scale_x.min(scale_y).min(1.0);
    if zoom.is_finite() {
        zoom.max(MIN_FIT_ZOOM)
    } else {
        MIN_FIT_ZOOM
    }
}

/// Maps pointer positions between screen space and project space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CoordinateMapper {
    /// Canvas bounds on screen; `None` until the canvas is mounted
    rect: Option<ScreenRect>,
    view: ViewTransform,
}

impl CoordinateMapper {
    pub fn new(rect: ScreenRect, view: ViewTransform) -> Self {
        Self {
            rect: Some(rect),
            view,
        }
    }

    /// Mapper for a canvas that is not laid out yet; every mapping is invalid
    pub fn unmounted(view: ViewTransform) -> Self {
        Self { rect: None, view }
    }

    pub fn set_rect(&mut self, rect: Option<ScreenRect>) {
        self.rect = rect;
    }

    pub fn set_view(&mut self, view: ViewTransform) {
        self.view = view;
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    pub fn rect(&self) -> Option<ScreenRect> {
        self.rect
    }

    /// Map a pointer sample into project space.
    ///
    /// Returns `None` when the canvas is unmounted or the result is not
    /// finite; callers drop the sample.
    pub fn to_project_space(&self, sample: &PointerSample, pressure: f32) -> Option<Point> {
        let rect = self.rect?;
        let x = (sample.client_x - rect.left) / self.view.zoom;
        let y = (sample.client_y - rect.top) / self.view.zoom;
        let point = Point::new(x, y, pressure, sample.timestamp);
        point.is_finite().then_some(point)
    }

    /// Inverse of [`to_project_space`](Self::to_project_space)
    pub fn to_screen_space(&self, point: &Point) -> Option<(f32, f32)> {
        let rect = self.rect?;
        let x = rect.left + point.x * self.view.zoom;
        let y = rect.top + point.y * self.view.zoom;
        (x.is_finite() && y.is_finite()).then_some((x, y))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn mapper(zoom: f32) -> CoordinateMapper {
        CoordinateMapper::new(
            ScreenRect::new(100.0, 50.0, 800.0, 600.0),
            ViewTransform {
                zoom,
                ..ViewTransform::default()
            },
        )
    }

    #[test]
    fn test_maps_origin_and_scale() {
        let m = mapper(2.0);
        let p = m
            .to_project_space(&PointerSample::mouse(100.0, 50.0, 7), 0.5)
            .unwrap();
        assert_eq!((p.x, p.y), (0.0, 0.0));
        assert_eq!(p.timestamp, 7);

        let p = m
            .to_project_space(&PointerSample::mouse(300.0, 250.0, 8), 0.5)
            .unwrap();
        assert_eq!((p.x, p.y), (100.0, 100.0));
        assert_eq!(p.pressure, 0.5);
    }

    #[test]
    fn test_unmounted_is_invalid() {
        let m = CoordinateMapper::unmounted(ViewTransform::default());
        assert!(m
            .to_project_space(&PointerSample::mouse(10.0, 10.0, 0), 0.5)
            .is_none());
        assert!(m.to_screen_space(&Point::new(1.0, 1.0, 0.5, 0)).is_none());
    }

    #[test]
    fn test_non_finite_is_invalid() {
        assert!(mapper(0.0)
            .to_project_space(&PointerSample::mouse(150.0, 60.0, 0), 0.5)
            .is_none());
        assert!(mapper(1.0)
            .to_project_space(&PointerSample::mouse(f32::NAN, 60.0, 0), 0.5)
            .is_none());
    }

    #[test]
    fn test_screen_space_inverts_project_space() {
        let m = mapper(0.5);
        let sample = PointerSample::mouse(412.0, 333.0, 0);
        let p = m.to_project_space(&sample, 0.5).unwrap();
        let (sx, sy) = m.to_screen_space(&p).unwrap();
        assert!((sx - 412.0).abs() < 1e-3);
        assert!((sy - 333.0).abs() < 1e-3);
    }

    #[test]
    fn test_fit_zoom() {
        // Large viewport never enlarges past 1:1
        assert_eq!(fit_zoom(4000.0, 3000.0, 800, 600), 1.0);
        // (1120 - 120) / 2000 = 0.5, (1320 - 120) / 1000 = 1.2
        assert!((fit_zoom(1120.0, 1320.0, 2000, 1000) - 0.5).abs() < 1e-6);
        // Tiny viewport clamps to the floor
        assert_eq!(fit_zoom(130.0, 130.0, 4000, 4000), MIN_FIT_ZOOM);
        assert_eq!(fit_zoom(50.0, 50.0, 100, 100), MIN_FIT_ZOOM);
    }

    #[test]
    fn test_view_presets() {
        let v = ViewTransform::reset();
        assert_eq!((v.pan_x, v.pan_y, v.zoom), (0.0, 0.0, RESET_ZOOM));
        let v = ViewTransform::fit(1120.0, 1320.0, 2000, 1000).with_pan(5.0, 6.0);
        assert_eq!((v.pan_x, v.pan_y), (5.0, 6.0));
        assert!((v.zoom - 0.5).abs() < 1e-6);
    }
}
