//! Pure processing stages: geometry, tile planning, duplicate suppression.

pub mod geometry;
pub mod suppression;
pub mod tiling;

pub use geometry::{BoundingBox, Point, polygon_contains, polygon_from_contour};
pub use suppression::greedy_nms;
pub use tiling::{Tile, plan_tiles};
