use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nalgebra::Vector2;
use opencv::{
    core::{Mat, Point, Scalar},
    highgui::{EVENT_FLAG_LBUTTON, EVENT_LBUTTONDOWN},
    imgproc::{rectangle_points, LINE_8},
};
use plane_tracker::TargetRect;

pub type SharedSelector = Arc<Mutex<RectSelector>>;

/// Mouse driven rectangle selection. A finished drag is parked until the
/// main loop picks it up with [`RectSelector::take_completed`].
#[derive(Debug, Default)]
pub struct RectSelector {
    drag_start: Option<Vector2<i32>>,
    drag_rect: Option<TargetRect>,
    completed: Option<TargetRect>,
}

impl RectSelector {
    pub fn shared() -> SharedSelector {
        Arc::new(Mutex::new(RectSelector::default()))
    }

    pub fn on_mouse(&mut self, event: i32, x: i32, y: i32, flags: i32) {
        let pos = Vector2::new(x, y);
        if event == EVENT_LBUTTONDOWN {
            self.drag_start = Some(pos);
            return;
        }

        let Some(start) = self.drag_start else {
            return;
        };
        if flags & EVENT_FLAG_LBUTTON != 0 {
            self.drag_rect = TargetRect::from_corners(start, pos);
        } else {
            self.drag_start = None;
            if let Some(rect) = self.drag_rect.take() {
                log::debug!(
                    "Selected ({}, {})-({}, {})",
                    rect.min.x,
                    rect.min.y,
                    rect.max.x,
                    rect.max.y
                );
                self.completed = Some(rect);
            }
        }
    }

    pub fn dragging(&self) -> bool {
        self.drag_rect.is_some()
    }

    pub fn take_completed(&mut self) -> Option<TargetRect> {
        self.completed.take()
    }

    /// Outlines the in-progress selection. Returns whether anything was drawn.
    pub fn draw(&self, vis: &mut Mat) -> anyhow::Result<bool> {
        let Some(rect) = self.drag_rect else {
            return Ok(false);
        };
        rectangle_points(
            vis,
            Point::new(rect.min.x, rect.min.y),
            Point::new(rect.max.x, rect.max.y),
            Scalar::new(0.0, 255.0, 0.0, 0.0),
            2,
            LINE_8,
            0,
        )?;

        Ok(true)
    }
}

// The mouse callback never panics while holding the lock, so a poisoned
// selector still holds consistent state.
pub fn lock(selector: &SharedSelector) -> MutexGuard<'_, RectSelector> {
    selector.lock().unwrap_or_else(PoisonError::into_inner)
}
