//! Quadrant tile planning for high-resolution damage detection.
//!
//! Running the detector on the full photograph loses small damages to
//! downscaling, so the image is split into four quadrant crops that each
//! extend 10% of the half-dimension past the center lines. The overlap
//! guarantees a damage straddling a quadrant boundary appears whole in at
//! least one tile; the resulting double detections are removed later by
//! duplicate suppression in global coordinates.

use image::{RgbImage, imageops};

/// A rectangular sub-region of the image in global pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
    /// Position in the fixed tile order (0 = top-left, 1 = top-right,
    /// 2 = bottom-left, 3 = bottom-right).
    pub index: usize,
}

impl Tile {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Extracts this tile's pixels from the full image.
    pub fn crop(&self, image: &RgbImage) -> RgbImage {
        imageops::crop_imm(image, self.x1, self.y1, self.width(), self.height()).to_image()
    }
}

/// Plans the four overlapping quadrant tiles for an image of the given
/// dimensions.
///
/// With `mx = width / 2`, `my = height / 2` (integer truncation, applied
/// identically to all four tiles) and margins `ox = mx * overlap`,
/// `oy = my * overlap` (truncated), the tiles are:
/// top-left `(0, 0)-(mx+ox, my+oy)`, top-right `(mx-ox, 0)-(W, my+oy)`,
/// bottom-left `(0, my-oy)-(mx+ox, H)`, bottom-right
/// `(mx-ox, my-oy)-(W, H)`. Their union always covers the full image and
/// each tile is at least one quadrant.
pub fn plan_tiles(width: u32, height: u32, overlap: f32) -> [Tile; 4] {
    let overlap = overlap.clamp(0.0, 1.0);
    let mx = width / 2;
    let my = height / 2;
    let ox = (mx as f32 * overlap) as u32;
    let oy = (my as f32 * overlap) as u32;

    [
        Tile {
            x1: 0,
            y1: 0,
            x2: mx + ox,
            y2: my + oy,
            index: 0,
        },
        Tile {
            x1: mx - ox,
            y1: 0,
            x2: width,
            y2: my + oy,
            index: 1,
        },
        Tile {
            x1: 0,
            y1: my - oy,
            x2: mx + ox,
            y2: height,
            index: 2,
        },
        Tile {
            x1: mx - ox,
            y1: my - oy,
            x2: width,
            y2: height,
            index: 3,
        },
    ]
}
