//! Pixel-space bounding rectangles
//!
//! Maps a detector's normalized polygon onto the canvas. The rectangle is
//! the per-axis min/max of the scaled vertices, which equals the polygon
//! only when the polygon is an axis-aligned box. A rotated quadrilateral
//! gets its enclosing box instead.

use hatbot_core::Vertex;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in canvas pixels. `min_* <= max_*` always holds;
/// zero width or height is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl PixelRect {
    /// Create a rectangle, swapping bounds given in the wrong order
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    /// Scale a normalized polygon to a `canvas_width` x `canvas_height` canvas.
    ///
    /// Each vertex maps to `floor(v * size)` per axis. An empty polygon gives
    /// the zero rectangle at the origin.
    pub fn from_polygon(vertices: &[Vertex], canvas_width: u32, canvas_height: u32) -> Self {
        let mut points = vertices.iter().map(|v| {
            (
                scale(v.x, canvas_width),
                scale(v.y, canvas_height),
            )
        });

        let Some((x, y)) = points.next() else {
            return Self::default();
        };

        points.fold(Self::new(x, y, x, y), |rect, (x, y)| Self {
            min_x: rect.min_x.min(x),
            min_y: rect.min_y.min(y),
            max_x: rect.max_x.max(x),
            max_y: rect.max_y.max(y),
        })
    }

    /// Computed in `i64` so saturated extremes cannot overflow.
    pub fn width(&self) -> i64 {
        i64::from(self.max_x) - i64::from(self.min_x)
    }

    pub fn height(&self) -> i64 {
        i64::from(self.max_y) - i64::from(self.min_y)
    }

    /// Check if the rectangle covers no area
    pub fn is_degenerate(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

fn scale(normalized: f32, size: u32) -> i32 {
    // `as` saturates out-of-range values and maps NaN to 0
    (normalized as f64 * size as f64).floor() as i32
}
