//! Touch gesture classification.
//!
//! A swipe is measured from the touch-start point to the touch-end point.
//! Dragging left (content moves toward the spine) turns forward, matching a
//! physical page turn.

/// Page-turn direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Next,
    Prev,
}

/// Swipe and drag-feedback thresholds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureConfig {
    /// Minimum horizontal travel, in px, for a swipe.
    pub swipe_threshold_px: f32,
    /// Vertical travel at or beyond which a swipe is treated as a scroll.
    pub max_vertical_drift_px: f32,
    /// Horizontal travel before drag feedback starts.
    pub drag_activation_px: f32,
    /// Cap on drag progress as a fraction of the viewport width.
    pub max_drag_ratio: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            swipe_threshold_px: 50.0,
            max_vertical_drift_px: 100.0,
            drag_activation_px: 10.0,
            max_drag_ratio: 0.3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchPoint {
    pub x: f32,
    pub y: f32,
}

impl TouchPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// What a finished gesture asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureOutcome {
    Navigate(Direction),
    /// No navigation; clear any drag feedback.
    Reset,
}

/// Visual feedback for an in-progress drag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragFeedback {
    pub translate_x_px: f32,
    pub scale: f32,
    pub opacity: f32,
}

impl DragFeedback {
    /// Untransformed page.
    pub const REST: Self = Self {
        translate_x_px: 0.0,
        scale: 1.0,
        opacity: 1.0,
    };
}

/// Classify a completed touch from `start` to `end`.
pub fn classify(cfg: &GestureConfig, start: TouchPoint, end: TouchPoint) -> GestureOutcome {
    let delta = start.x - end.x;
    let dy = (end.y - start.y).abs();
    if delta.abs() > cfg.swipe_threshold_px && dy < cfg.max_vertical_drift_px {
        if delta > 0.0 {
            GestureOutcome::Navigate(Direction::Next)
        } else {
            GestureOutcome::Navigate(Direction::Prev)
        }
    } else {
        GestureOutcome::Reset
    }
}

/// Tracks one touch from start to end.
#[derive(Clone, Debug, Default)]
pub struct GestureTracker {
    cfg: GestureConfig,
    start: Option<TouchPoint>,
}

impl GestureTracker {
    pub fn new(cfg: GestureConfig) -> Self {
        Self { cfg, start: None }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.cfg
    }

    pub fn begin(&mut self, point: TouchPoint) {
        self.start = Some(point);
    }

    pub fn is_tracking(&self) -> bool {
        self.start.is_some()
    }

    /// Feedback for the finger at `point`; `None` until the drag is clearly
    /// horizontal.
    pub fn drag(&self, point: TouchPoint, viewport_width: f32) -> Option<DragFeedback> {
        let start = self.start?;
        let dx = point.x - start.x;
        let dy = point.y - start.y;
        if dx.abs() <= self.cfg.drag_activation_px || dx.abs() <= dy.abs() {
            return None;
        }
        let limit = self.cfg.max_drag_ratio;
        let progress = if viewport_width > 0.0 {
            (dx / viewport_width).clamp(-limit, limit)
        } else {
            limit.copysign(dx)
        };
        Some(DragFeedback {
            translate_x_px: dx * 0.3,
            scale: 1.0 - progress.abs() * 0.05,
            opacity: 1.0 - progress.abs() * 1.5,
        })
    }

    /// Finish the touch. Ending without a start is a reset.
    pub fn end(&mut self, point: TouchPoint) -> GestureOutcome {
        match self.start.take() {
            Some(start) => classify(&self.cfg, start, point),
            None => GestureOutcome::Reset,
        }
    }

    pub fn cancel(&mut self) -> GestureOutcome {
        self.start = None;
        GestureOutcome::Reset
    }
}
