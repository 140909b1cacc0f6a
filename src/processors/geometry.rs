//! Geometric primitives shared across the pipeline.
//!
//! Axis-aligned bounding boxes with IoU, integer centroids for part
//! matching, and a boundary-inclusive point-in-polygon test used to decide
//! which vehicle part a damage detection sits on.

use imageproc::contours::Contour;
use serde::{Deserialize, Serialize};

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned bounding box given by its corner coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Smallest axis-aligned box enclosing a polygon. Returns a zero box
    /// for an empty polygon.
    pub fn from_polygon(points: &[Point]) -> Self {
        let mut bbox = BoundingBox::new(f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);
        for p in points {
            bbox.x1 = bbox.x1.min(p.x);
            bbox.y1 = bbox.y1.min(p.y);
            bbox.x2 = bbox.x2.max(p.x);
            bbox.y2 = bbox.y2.max(p.y);
        }
        if points.is_empty() {
            BoundingBox::new(0.0, 0.0, 0.0, 0.0)
        } else {
            bbox
        }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Integer centroid, midpoint rounded toward zero. This is the anchor
    /// point used for part matching.
    pub fn center(&self) -> (i32, i32) {
        (
            ((self.x1 + self.x2) / 2.0) as i32,
            ((self.y1 + self.y2) / 2.0) as i32,
        )
    }

    /// Translates the box by the given offset.
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }

    /// Clamps the box to the given image dimensions.
    pub fn clamp_to(&self, width: f32, height: f32) -> Self {
        Self::new(
            self.x1.clamp(0.0, width),
            self.y1.clamp(0.0, height),
            self.x2.clamp(0.0, width),
            self.y2.clamp(0.0, height),
        )
    }

    /// Intersection over union with another box. Zero when the boxes do
    /// not overlap or the union area degenerates.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x_min = self.x1.max(other.x1);
        let y_min = self.y1.max(other.y1);
        let x_max = self.x2.min(other.x2);
        let y_max = self.y2.min(other.y2);

        if x_max <= x_min || y_max <= y_min {
            return 0.0;
        }

        let intersection = (x_max - x_min) * (y_max - y_min);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 { intersection / union } else { 0.0 }
    }
}

/// Converts an imageproc contour into a polygon.
pub fn polygon_from_contour(contour: &Contour<u32>) -> Vec<Point> {
    contour
        .points
        .iter()
        .map(|p| Point::new(p.x as f32, p.y as f32))
        .collect()
}

/// Boundary-inclusive point-in-polygon test (even-odd ray casting).
///
/// A point lying exactly on an edge or vertex counts as inside, matching
/// the `>= 0` convention of the containment test the pipeline was built
/// against. Degenerate polygons (fewer than 3 vertices) contain nothing.
pub fn polygon_contains(polygon: &[Point], x: f32, y: f32) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = polygon.len();
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];

        if point_on_segment(a, b, x, y) {
            return true;
        }

        if (a.y > y) != (b.y > y) {
            let t = (y - a.y) / (b.y - a.y);
            let cross_x = a.x + t * (b.x - a.x);
            if x < cross_x {
                inside = !inside;
            }
        }
    }
    inside
}

/// Whether (x, y) lies on the closed segment a-b, within a small epsilon.
fn point_on_segment(a: Point, b: Point, x: f32, y: f32) -> bool {
    const EPS: f32 = 1e-6;
    let cross = (b.x - a.x) * (y - a.y) - (b.y - a.y) * (x - a.x);
    if cross.abs() > EPS * (1.0 + (b.x - a.x).abs() + (b.y - a.y).abs()) {
        return false;
    }
    x >= a.x.min(b.x) - EPS
        && x <= a.x.max(b.x) + EPS
        && y >= a.y.min(b.y) - EPS
        && y <= a.y.max(b.y) + EPS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x1: f32, y1: f32, x2: f32, y2: f32) -> Vec<Point> {
        vec![
            Point::new(x1, y1),
            Point::new(x2, y1),
            Point::new(x2, y2),
            Point::new(x1, y2),
        ]
    }

    #[test]
    fn iou_identical_boxes() {
        let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn iou_disjoint_boxes() {
        let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let b = BoundingBox::new(200.0, 200.0, 300.0, 300.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn iou_half_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let b = BoundingBox::new(50.0, 0.0, 150.0, 100.0);
        // intersection 5000, union 15000
        let iou = a.iou(&b);
        assert!((iou - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn center_rounds_toward_zero() {
        let b = BoundingBox::new(0.0, 0.0, 5.0, 3.0);
        assert_eq!(b.center(), (2, 1));
    }

    #[test]
    fn polygon_contains_interior_point() {
        let poly = square(0.0, 0.0, 10.0, 10.0);
        assert!(polygon_contains(&poly, 5.0, 5.0));
        assert!(!polygon_contains(&poly, 15.0, 5.0));
    }

    #[test]
    fn polygon_contains_is_boundary_inclusive() {
        let poly = square(0.0, 0.0, 10.0, 10.0);
        // Edge midpoints and a vertex.
        assert!(polygon_contains(&poly, 0.0, 5.0));
        assert!(polygon_contains(&poly, 5.0, 10.0));
        assert!(polygon_contains(&poly, 10.0, 10.0));
    }

    #[test]
    fn polygon_contains_concave_shape() {
        // L-shaped polygon; the notch is outside.
        let poly = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 4.0),
            Point::new(4.0, 4.0),
            Point::new(4.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        assert!(polygon_contains(&poly, 2.0, 8.0));
        assert!(!polygon_contains(&poly, 8.0, 8.0));
    }

    #[test]
    fn degenerate_polygon_contains_nothing() {
        assert!(!polygon_contains(&[], 0.0, 0.0));
        assert!(!polygon_contains(
            &[Point::new(0.0, 0.0), Point::new(1.0, 1.0)],
            0.5,
            0.5
        ));
    }

    #[test]
    fn bbox_from_polygon() {
        let poly = vec![
            Point::new(3.0, 7.0),
            Point::new(1.0, 2.0),
            Point::new(9.0, 4.0),
        ];
        let bbox = BoundingBox::from_polygon(&poly);
        assert_eq!(bbox, BoundingBox::new(1.0, 2.0, 9.0, 7.0));
    }
}
