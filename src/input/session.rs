//! Pointer capture session
//!
//! Explicit state machine for one pointer gesture:
//!
//! ```text
//! Idle --down(primary)--> Capturing --up/leave/cancel--> Idle (commit or discard)
//! Idle --down(middle|hand)--> Panning --up/leave/cancel--> Idle
//! ```
//!
//! The in-progress stroke is owned by the session until it is handed out on
//! release. Every release path returns the session to `Idle`.

use super::{
    CoordinateMapper, InputStabilizer, Point, PointerSample, PressureNormalizer, ToolType,
    MIDDLE_BUTTON, PRIMARY_BUTTON,
};
use crate::brush::{Brush, BrushRasterizer, ERASER_BRUSH_ID};
use crate::config::{EngineConfig, StabilizerConfig};
use crate::core::errors::CoreError;
use crate::project::{Project, Stroke};
use crate::raster::RasterSurface;

/// Everything a pointer-down needs to start a stroke
#[derive(Debug, Clone, Copy)]
pub struct CaptureContext<'a> {
    pub project: &'a Project,
    pub active_layer_id: &'a str,
    pub brush: &'a Brush,
    /// CSS color string of the active color
    pub color: &'a str,
    pub tool: ToolType,
    pub mapper: &'a CoordinateMapper,
}

/// Hand-tool or middle-button drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanGesture {
    pub start_pointer: (f32, f32),
    pub start_pan: (f32, f32),
}

impl PanGesture {
    /// Pan offset for the current pointer position
    pub fn pan_for(&self, sample: &PointerSample) -> (f32, f32) {
        (
            self.start_pan.0 + (sample.client_x - self.start_pointer.0),
            self.start_pan.1 + (sample.client_y - self.start_pointer.1),
        )
    }
}

/// Stroke being drawn plus its stabilizer state
#[derive(Debug, Clone)]
pub struct ActiveCapture {
    stroke: Stroke,
    stabilizer: InputStabilizer,
}

impl ActiveCapture {
    pub fn stroke(&self) -> &Stroke {
        &self.stroke
    }
}

#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Capturing(ActiveCapture),
    Panning(PanGesture),
}

/// Result of a pointer-down or pointer-move
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// Sample had no effect
    Ignored,
    PanStarted,
    /// New pan offset for the viewport
    Pan { pan_x: f32, pan_y: f32 },
    StrokeStarted,
    /// A stabilized point was appended to the live stroke
    PointAdded(Point),
}

/// Result of releasing the pointer
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// Finished stroke, ready for `Project::commit_stroke`
    Committed(Stroke),
    /// Capture ended without a usable stroke
    Discarded,
    /// Nothing was being captured (or a pan ended)
    Idle,
}

#[derive(Debug, Clone, Default)]
pub struct CaptureSession {
    state: SessionState,
    normalizer: PressureNormalizer,
    stabilizer_config: StabilizerConfig,
}

impl CaptureSession {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: SessionState::Idle,
            normalizer: PressureNormalizer::new(&config.pressure),
            stabilizer_config: config.stabilizer.clone(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, SessionState::Idle)
    }

    /// Stroke currently being drawn, if any
    pub fn active_stroke(&self) -> Option<&Stroke> {
        match &self.state {
            SessionState::Capturing(capture) => Some(capture.stroke()),
            _ => None,
        }
    }

    pub fn pointer_down(&mut self, sample: &PointerSample, ctx: &CaptureContext<'_>) -> SessionUpdate {
        if !self.is_idle() {
            tracing::debug!("Pointer down while a gesture is active; ignored");
            return SessionUpdate::Ignored;
        }

        if sample.button == MIDDLE_BUTTON || ctx.tool == ToolType::Hand {
            let view = ctx.mapper.view();
            self.state = SessionState::Panning(PanGesture {
                start_pointer: (sample.client_x, sample.client_y),
                start_pan: (view.pan_x, view.pan_y),
            });
            tracing::debug!("Pan started");
            return SessionUpdate::PanStarted;
        }

        if sample.button != PRIMARY_BUTTON {
            return SessionUpdate::Ignored;
        }

        match ctx.project.layer(ctx.active_layer_id) {
            Some(layer) if !layer.accepts_strokes() => {
                tracing::debug!("Layer {} is locked or not drawable", layer.id);
                return SessionUpdate::Ignored;
            }
            None => {
                tracing::debug!("Active layer {} does not exist", ctx.active_layer_id);
                return SessionUpdate::Ignored;
            }
            Some(_) => {}
        }

        let pressure = self.normalizer.normalize(sample);
        let Some(first) = ctx.mapper.to_project_space(sample, pressure) else {
            tracing::debug!("Pointer down outside a mounted canvas; ignored");
            return SessionUpdate::Ignored;
        };

        let (brush_id, settings) = if ctx.tool == ToolType::Eraser {
            let mut settings = ctx.brush.settings.clone();
            settings.opacity = 1.0;
            (ERASER_BRUSH_ID.to_string(), settings)
        } else {
            (ctx.brush.id.clone(), ctx.brush.settings.clone())
        };

        let mut stabilizer =
            InputStabilizer::with_config(self.stabilizer_config.clone(), settings.stabilization);
        let first = stabilizer.push(first);
        let stroke = Stroke::new(
            format!("stroke-{}", sample.timestamp),
            brush_id,
            settings,
            ctx.color,
            ctx.active_layer_id,
        )
        .with_points(vec![first]);

        tracing::debug!("Capture started: {} on {}", stroke.id, stroke.layer_id);
        self.state = SessionState::Capturing(ActiveCapture { stroke, stabilizer });
        SessionUpdate::StrokeStarted
    }

    pub fn pointer_move(&mut self, sample: &PointerSample, mapper: &CoordinateMapper) -> SessionUpdate {
        match &mut self.state {
            SessionState::Idle => SessionUpdate::Ignored,
            SessionState::Panning(gesture) => {
                let (pan_x, pan_y) = gesture.pan_for(sample);
                SessionUpdate::Pan { pan_x, pan_y }
            }
            SessionState::Capturing(capture) => {
                let pressure = self.normalizer.normalize(sample);
                let Some(raw) = mapper.to_project_space(sample, pressure) else {
                    return SessionUpdate::Ignored;
                };
                let point = capture.stabilizer.push(raw);
                capture.stroke.points.push(point);
                SessionUpdate::PointAdded(point)
            }
        }
    }

    pub fn pointer_up(&mut self) -> CaptureOutcome {
        self.finish()
    }

    /// Pointer left the canvas; finalizes exactly like pointer-up
    pub fn pointer_leave(&mut self) -> CaptureOutcome {
        self.finish()
    }

    /// Abnormal end of the gesture (pointercancel); finalizes like pointer-up
    pub fn cancel(&mut self) -> CaptureOutcome {
        self.finish()
    }

    fn finish(&mut self) -> CaptureOutcome {
        match std::mem::take(&mut self.state) {
            SessionState::Idle => CaptureOutcome::Idle,
            SessionState::Panning(_) => {
                tracing::debug!("Pan ended");
                CaptureOutcome::Idle
            }
            SessionState::Capturing(capture) => {
                let stroke = capture.stroke;
                if stroke.is_empty() {
                    tracing::debug!("Discarding empty stroke {}", stroke.id);
                    CaptureOutcome::Discarded
                } else {
                    tracing::debug!("Capture finished: {} ({} points)", stroke.id, stroke.points.len());
                    CaptureOutcome::Committed(stroke)
                }
            }
        }
    }

    /// Redraw the live overlay: clears `surface`, then rasterizes only the
    /// in-progress stroke
    pub fn render_preview<S: RasterSurface + ?Sized>(
        &self,
        surface: &mut S,
        rasterizer: &BrushRasterizer,
    ) -> Result<(), CoreError> {
        surface.clear();
        match self.active_stroke() {
            Some(stroke) => rasterizer.render(surface, stroke),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::brush::find_builtin;
    use crate::input::{ScreenRect, ViewTransform};
    use crate::project::Layer;
    use crate::raster::PixelBuffer;

    struct Fixture {
        project: Project,
        brush: Brush,
        mapper: CoordinateMapper,
    }

    impl Fixture {
        fn new() -> Self {
            let mut project = Project::new("t", 200, 200).unwrap();
            project.layers[0].id = "ink".to_string();
            project.add_layer_above(Some("ink"), Layer::drawing("locked", "L").with_locked(true));
            project.add_layer_above(Some("locked"), Layer::image("photo", "P", "a.png"));
            Self {
                project,
                brush: find_builtin("b-ink").unwrap(),
                mapper: CoordinateMapper::new(
                    ScreenRect::new(10.0, 20.0, 200.0, 200.0),
                    ViewTransform::default().with_pan(3.0, 4.0),
                ),
            }
        }

        fn ctx(&self, layer: &'static str, tool: ToolType) -> CaptureContext<'_> {
            CaptureContext {
                project: &self.project,
                active_layer_id: layer,
                brush: &self.brush,
                color: "#1C1B18",
                tool,
                mapper: &self.mapper,
            }
        }
    }

    #[test]
    fn down_move_up_commits_stroke() {
        let fx = Fixture::new();
        let mut session = CaptureSession::default();

        let update = session.pointer_down(&PointerSample::mouse(60.0, 70.0, 100), &fx.ctx("ink", ToolType::Pen));
        assert_eq!(update, SessionUpdate::StrokeStarted);
        let first = session.active_stroke().unwrap().points[0];
        assert_eq!((first.x, first.y, first.pressure), (50.0, 50.0, 0.5));

        for i in 1..=3 {
            let update = session.pointer_move(&PointerSample::mouse(60.0 + i as f32 * 10.0, 70.0, 100 + i), &fx.mapper);
            assert!(matches!(update, SessionUpdate::PointAdded(_)));
        }

        match session.pointer_up() {
            CaptureOutcome::Committed(stroke) => {
                assert_eq!(stroke.id, "stroke-100");
                assert_eq!(stroke.brush_id, "b-ink");
                assert_eq!(stroke.layer_id, "ink");
                assert_eq!(stroke.color, "#1C1B18");
                assert_eq!(stroke.points.len(), 4);
                assert_eq!(stroke.points[3].timestamp, 103);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(session.is_idle());
    }

    #[test]
    fn moves_are_stabilized_with_snapshot_strength() {
        let mut fx = Fixture::new();
        fx.brush.settings.stabilization = 1.0;
        let mut session = CaptureSession::default();
        session.pointer_down(&PointerSample::mouse(10.0, 20.0, 0), &fx.ctx("ink", ToolType::Pen));

        // Later brush edits must not affect the live stroke
        fx.brush.settings.stabilization = 0.0;

        let update = session.pointer_move(&PointerSample::mouse(110.0, 20.0, 1), &fx.mapper);
        // strength 1 -> base 0.1, one prior point -> boost 0.4
        match update {
            SessionUpdate::PointAdded(p) => assert!((p.x - 50.0).abs() < 1e-3),
            other => panic!("unexpected update {:?}", other),
        }
        assert_eq!(session.active_stroke().unwrap().brush_settings.stabilization, 1.0);
    }

    #[test]
    fn eraser_tags_stroke_and_forces_opacity() {
        let mut fx = Fixture::new();
        fx.brush.settings.opacity = 0.3;
        let mut session = CaptureSession::default();
        session.pointer_down(&PointerSample::mouse(50.0, 50.0, 7), &fx.ctx("ink", ToolType::Eraser));
        let stroke = session.active_stroke().unwrap();
        assert!(stroke.is_eraser());
        assert_eq!(stroke.brush_settings.opacity, 1.0);
    }

    #[test]
    fn locked_image_and_missing_layers_refuse_capture() {
        let fx = Fixture::new();
        let mut session = CaptureSession::default();
        for layer in ["locked", "photo", "nope"] {
            let update = session.pointer_down(&PointerSample::mouse(50.0, 50.0, 0), &fx.ctx(layer, ToolType::Pen));
            assert_eq!(update, SessionUpdate::Ignored, "{}", layer);
            assert!(session.is_idle());
        }
    }

    #[test]
    fn secondary_button_is_ignored() {
        let fx = Fixture::new();
        let mut session = CaptureSession::default();
        let right = PointerSample::mouse(50.0, 50.0, 0).with_button(2);
        assert_eq!(session.pointer_down(&right, &fx.ctx("ink", ToolType::Pen)), SessionUpdate::Ignored);
        assert!(session.is_idle());
    }

    #[test]
    fn unmounted_canvas_ignores_samples() {
        let mut fx = Fixture::new();
        fx.mapper = CoordinateMapper::unmounted(ViewTransform::default());
        let mut session = CaptureSession::default();
        let update = session.pointer_down(&PointerSample::mouse(50.0, 50.0, 0), &fx.ctx("ink", ToolType::Pen));
        assert_eq!(update, SessionUpdate::Ignored);
        assert_eq!(session.pointer_up(), CaptureOutcome::Idle);
    }

    #[test]
    fn invalid_moves_are_dropped() {
        let fx = Fixture::new();
        let mut session = CaptureSession::default();
        session.pointer_down(&PointerSample::mouse(50.0, 50.0, 0), &fx.ctx("ink", ToolType::Pen));
        let unmounted = CoordinateMapper::unmounted(ViewTransform::default());
        assert_eq!(
            session.pointer_move(&PointerSample::mouse(60.0, 60.0, 1), &unmounted),
            SessionUpdate::Ignored
        );
        assert_eq!(session.active_stroke().unwrap().points.len(), 1);
    }

    #[test]
    fn middle_button_and_hand_tool_pan() {
        let fx = Fixture::new();
        for (sample, tool) in [
            (PointerSample::mouse(100.0, 100.0, 0).with_button(MIDDLE_BUTTON), ToolType::Pen),
            (PointerSample::mouse(100.0, 100.0, 0), ToolType::Hand),
        ] {
            let mut session = CaptureSession::default();
            assert_eq!(session.pointer_down(&sample, &fx.ctx("ink", tool)), SessionUpdate::PanStarted);
            let update = session.pointer_move(&PointerSample::mouse(130.0, 90.0, 1), &fx.mapper);
            assert_eq!(update, SessionUpdate::Pan { pan_x: 33.0, pan_y: -6.0 });
            assert!(session.active_stroke().is_none());
            assert_eq!(session.pointer_leave(), CaptureOutcome::Idle);
            assert!(session.is_idle());
        }
    }

    #[test]
    fn leave_and_cancel_finalize_like_up() {
        let fx = Fixture::new();
        let mut session = CaptureSession::default();
        session.pointer_down(&PointerSample::mouse(50.0, 50.0, 0), &fx.ctx("ink", ToolType::Pen));
        assert!(matches!(session.pointer_leave(), CaptureOutcome::Committed(_)));
        assert!(session.is_idle());

        session.pointer_down(&PointerSample::mouse(50.0, 50.0, 1), &fx.ctx("ink", ToolType::Pen));
        assert!(matches!(session.cancel(), CaptureOutcome::Committed(_)));
        assert!(session.is_idle());
        assert_eq!(session.cancel(), CaptureOutcome::Idle);
    }

    #[test]
    fn moves_when_idle_are_ignored() {
        let fx = Fixture::new();
        let mut session = CaptureSession::default();
        assert_eq!(
            session.pointer_move(&PointerSample::mouse(1.0, 1.0, 0), &fx.mapper),
            SessionUpdate::Ignored
        );
    }

    #[test]
    fn preview_draws_only_live_stroke() {
        let fx = Fixture::new();
        let mut session = CaptureSession::default();
        let mut overlay = PixelBuffer::new(200, 200);
        let rasterizer = BrushRasterizer::default();

        session.render_preview(&mut overlay, &rasterizer).unwrap();
        assert!(overlay.as_image().pixels().all(|p| p.0[3] == 0));

        session.pointer_down(&PointerSample::mouse(60.0, 70.0, 0), &fx.ctx("ink", ToolType::Pen));
        session.pointer_move(&PointerSample::mouse(90.0, 70.0, 1), &fx.mapper);
        session.render_preview(&mut overlay, &rasterizer).unwrap();
        assert!(overlay.pixel(50, 50)[3] > 0);

        session.pointer_up();
        session.render_preview(&mut overlay, &rasterizer).unwrap();
        assert!(overlay.as_image().pixels().all(|p| p.0[3] == 0));
    }
}
