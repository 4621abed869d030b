//! Input cells written by event handlers and read by the next frame.

use glam::Vec2;

/// Latest pointer and seek-drag state
#[derive(Debug, Clone, Default)]
pub struct InputCells {
    /// Pointer position on the scene canvas (device px), `None` when outside
    pub pointer: Option<Vec2>,

    /// Seek drag in progress
    pub seek_held: bool,

    /// Pending seek target (track seconds), consumed by the frame loop
    seek_target: Option<f64>,

    /// Normalized seek velocity in [-1, 1]
    pub seek_pull: f32,

    /// Last (track time, wall time) of the drag, for the velocity estimate
    last_drag: Option<(f64, f64)>,

    /// Track seconds per wall second mapped to full pull
    velocity_span: f32,
}

impl InputCells {
    pub fn new(velocity_span: f32) -> Self {
        Self {
            velocity_span: velocity_span.max(1e-3),
            ..Default::default()
        }
    }

    pub fn pointer_moved(&mut self, pos: Vec2) {
        self.pointer = pos.is_finite().then_some(pos);
    }

    pub fn pointer_left(&mut self) {
        self.pointer = None;
    }

    pub fn seek_start(&mut self, track_s: f64, wall_s: f64) {
        self.seek_held = true;
        self.seek_pull = 0.0;
        self.seek_target = Some(track_s);
        self.last_drag = Some((track_s, wall_s));
    }

    /// Drag to a new track position; updates the pull from the drag speed
    pub fn seek_drag(&mut self, track_s: f64, wall_s: f64) {
        if !self.seek_held {
            return;
        }
        if let Some((t0, w0)) = self.last_drag {
            let dw = wall_s - w0;
            if dw > 1e-4 {
                let speed = (track_s - t0) / dw;
                self.seek_pull = (speed as f32 / self.velocity_span).clamp(-1.0, 1.0);
            }
        }
        self.seek_target = Some(track_s);
        self.last_drag = Some((track_s, wall_s));
    }

    pub fn seek_end(&mut self) {
        self.seek_held = false;
        self.seek_pull = 0.0;
        self.last_drag = None;
    }

    /// Take the pending seek, if any
    pub fn take_seek(&mut self) -> Option<f64> {
        self.seek_target.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seek_pull_from_drag_speed() {
        let mut cells = InputCells::new(12.0);
        cells.seek_start(10.0, 0.0);
        assert_eq!(cells.take_seek(), Some(10.0));

        // 6 track seconds in half a wall second = 12 s/s = full pull
        cells.seek_drag(16.0, 0.5);
        assert!((cells.seek_pull - 1.0).abs() < 1e-6);

        // Dragging backward at 3 s/s
        cells.seek_drag(13.0, 1.5);
        assert!((cells.seek_pull + 0.25).abs() < 1e-6);
        assert_eq!(cells.take_seek(), Some(13.0));
        assert_eq!(cells.take_seek(), None);

        cells.seek_end();
        assert!(!cells.seek_held);
        assert_eq!(cells.seek_pull, 0.0);
    }

    #[test]
    fn test_drag_without_start_is_ignored() {
        let mut cells = InputCells::new(12.0);
        cells.seek_drag(5.0, 1.0);
        assert_eq!(cells.take_seek(), None);
    }

    #[test]
    fn test_pointer_rejects_nan() {
        let mut cells = InputCells::new(12.0);
        cells.pointer_moved(Vec2::new(f32::NAN, 3.0));
        assert!(cells.pointer.is_none());
        cells.pointer_moved(Vec2::new(4.0, 3.0));
        assert_eq!(cells.pointer, Some(Vec2::new(4.0, 3.0)));
        cells.pointer_left();
        assert!(cells.pointer.is_none());
    }
}
