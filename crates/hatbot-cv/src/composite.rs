//! Hat compositing
//!
//! Scales a hat to the estimated head width and draws it with source-over
//! blending so the hat's transparent pixels leave the photo untouched.

use crate::bbox::PixelRect;
use crate::hat::HatAsset;
use crate::head::HeadEstimate;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use log::{debug, warn};
use serde::Serialize;

/// Mutable pixel buffer a request draws hats onto.
pub type Canvas = RgbaImage;

/// Largest resized hat, as a multiple of the canvas size on each axis.
const MAX_CANVAS_MULTIPLE: u64 = 4;

/// Where a hat ended up on the canvas. The origin may be negative or past
/// the canvas edge; drawing clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    /// Top-left corner for a `width` x `height` hat on `rect`.
    ///
    /// The hat's right edge is flush with the box's right edge and
    /// `height / divisor` of it hangs below the top of the box.
    pub fn anchored(rect: &PixelRect, estimate: &HeadEstimate, width: u32, height: u32) -> Self {
        let h = i64::from(height);
        let overlap = h / i64::from(estimate.vertical_divisor());
        Self {
            x: i64::from(rect.max_x) - i64::from(width),
            y: i64::from(rect.min_y) - (h - overlap),
            width,
            height,
        }
    }
}

/// Resizes and blends hats onto canvases
#[derive(Debug, Clone)]
pub struct Compositor {
    filter: FilterType,
}

impl Default for Compositor {
    fn default() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }
}

impl Compositor {
    pub fn new(filter: FilterType) -> Self {
        Self { filter }
    }

    /// Height that keeps `(width, height)` proportional at `target_width`, at least 1.
    pub fn proportional_height(dimensions: (u32, u32), target_width: u32) -> u32 {
        let (width, height) = dimensions;
        let scaled = f64::from(target_width) * f64::from(height) / f64::from(width);
        (scaled + 0.5).floor().max(1.0) as u32
    }

    /// Scale a hat to `width`, deriving the height from its aspect ratio.
    /// `None` when there is nothing to draw.
    pub fn resize_hat(&self, hat: &RgbaImage, width: u32) -> Option<RgbaImage> {
        if width == 0 || hat.width() == 0 || hat.height() == 0 {
            return None;
        }
        let height = Self::proportional_height(hat.dimensions(), width);
        Some(imageops::resize(hat, width, height, self.filter))
    }

    /// Draw `hat` over the head of the detection in `rect`.
    ///
    /// Returns `None` without touching the canvas when the head estimate is
    /// zero pixels wide, or when the scaled hat would dwarf the canvas.
    pub fn draw(
        &self,
        canvas: &mut Canvas,
        rect: &PixelRect,
        estimate: &HeadEstimate,
        hat: &HatAsset,
    ) -> Option<Placement> {
        if estimate.width_px > 0 {
            let height = Self::proportional_height(hat.dimensions(), estimate.width_px);
            if !fits_canvas(canvas, estimate.width_px, height) {
                warn!(
                    "Skipping {}x{} hat on a {}x{} canvas",
                    estimate.width_px,
                    height,
                    canvas.width(),
                    canvas.height()
                );
                return None;
            }
        }

        let Some(resized) = self.resize_hat(&hat.image, estimate.width_px) else {
            debug!("Skipping hat for degenerate box {:?}", rect);
            return None;
        };

        let placement = Placement::anchored(rect, estimate, resized.width(), resized.height());
        debug!(
            "Drawing {}x{} hat at ({}, {}) for box {:?}",
            placement.width, placement.height, placement.x, placement.y, rect
        );

        imageops::overlay(canvas, &resized, placement.x, placement.y);
        Some(placement)
    }
}

fn fits_canvas(canvas: &Canvas, width: u32, height: u32) -> bool {
    u64::from(width) <= u64::from(canvas.width()) * MAX_CANVAS_MULTIPLE
        && u64::from(height) <= u64::from(canvas.height()) * MAX_CANVAS_MULTIPLE
}
