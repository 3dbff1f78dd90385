//! Head region heuristic
//!
//! Not a learned model. The aspect ratio of the detection box decides
//! between an upright animal, whose head spans the full box width, and a
//! horizontal one, whose head is a fraction of the body length. The
//! constants below are the calibration the hat placement was tuned with.

use crate::bbox::PixelRect;
use serde::Serialize;

/// Share of a horizontal body removed from the head width (`width / 2.5`).
const BODY_DIVISOR: f64 = 2.5;
/// Second, smaller share removed for the tail end (`width / 20`).
const TAIL_DIVISOR: i64 = 20;

const UPRIGHT_VERTICAL_DIVISOR: u32 = 6;
const HORIZONTAL_VERTICAL_DIVISOR: u32 = 4;

/// Pose guessed from the detection box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Posture {
    /// Taller than wide, e.g. sitting.
    Upright,
    /// Wider than tall, or square.
    Horizontal,
}

impl Posture {
    /// Fraction (1/n) of the hat height that overlaps the top of the box.
    pub fn vertical_divisor(&self) -> u32 {
        match self {
            Posture::Upright => UPRIGHT_VERTICAL_DIVISOR,
            Posture::Horizontal => HORIZONTAL_VERTICAL_DIVISOR,
        }
    }
}

/// Estimated head size for one detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeadEstimate {
    pub width_px: u32,
    pub posture: Posture,
}

impl HeadEstimate {
    pub fn from_rect(rect: &PixelRect) -> Self {
        let total_x = rect.width();
        let total_y = rect.height();

        let (posture, width) = if total_y > total_x {
            (Posture::Upright, total_x)
        } else {
            let body = (total_x as f64 / BODY_DIVISOR).floor() as i64;
            let tail = total_x.div_euclid(TAIL_DIVISOR);
            (Posture::Horizontal, total_x - body - tail)
        };

        Self {
            width_px: width.clamp(0, i64::from(u32::MAX)) as u32,
            posture,
        }
    }

    pub fn vertical_divisor(&self) -> u32 {
        self.posture.vertical_divisor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_square_box_takes_horizontal_branch() {
        let estimate = HeadEstimate::from_rect(&PixelRect::new(100, 100, 300, 300));
        assert_eq!(estimate.posture, Posture::Horizontal);
        assert_eq!(estimate.vertical_divisor(), 4);
        assert_eq!(estimate.width_px, 110);
    }

    #[test]
    fn test_tall_box_uses_full_width() {
        let estimate = HeadEstimate::from_rect(&PixelRect::new(0, 0, 120, 400));
        assert_eq!(estimate.posture, Posture::Upright);
        assert_eq!(estimate.vertical_divisor(), 6);
        assert_eq!(estimate.width_px, 120);
    }

    #[test]
    fn test_wide_box_floors_both_shares() {
        // 333 - floor(133.2) - floor(16.65) = 333 - 133 - 16
        let estimate = HeadEstimate::from_rect(&PixelRect::new(0, 0, 333, 50));
        assert_eq!(estimate.width_px, 184);
    }

    #[test]
    fn test_degenerate_box_has_zero_width() {
        let estimate = HeadEstimate::from_rect(&PixelRect::new(50, 50, 50, 50));
        assert_eq!(estimate.width_px, 0);
        assert_eq!(estimate.posture, Posture::Horizontal);

        let line = HeadEstimate::from_rect(&PixelRect::new(50, 10, 50, 90));
        assert_eq!(line.width_px, 0);
        assert_eq!(line.posture, Posture::Upright);
    }

    #[test]
    fn test_divisor_follows_aspect_ratio() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let rect = PixelRect::new(0, 0, rng.gen_range(0..2000), rng.gen_range(0..2000));
            let estimate = HeadEstimate::from_rect(&rect);
            let expected = if rect.height() > rect.width() { 6 } else { 4 };
            assert_eq!(estimate.vertical_divisor(), expected, "{rect:?}");
            assert!(i64::from(estimate.width_px) <= rect.width());
        }
    }
}
