//! Planar geometry used by the occupancy engine.
//!
//! - `Point`: a 2D point in pixel coordinates.
//! - `Polygon`: an open ring (the closing point is implicit).
//! - `BoundingBox`: an axis-aligned box as produced by detectors.
//!
//! Everything here is `f64` and allocation-light. Containment is strict:
//! a point on a polygon edge is not contained, which keeps a detection whose
//! centroid sits exactly on the line between two slots from claiming either.

use serde::{Deserialize, Serialize};

const EDGE_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for Point {
    fn from(p: [f64; 2]) -> Self {
        Self::new(p[0], p[1])
    }
}

/// Simple polygon stored as an open ring.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Build a polygon from its ring. A repeated closing point is dropped.
    pub fn new(mut points: Vec<Point>) -> Self {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Shoelace area, positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        ring_signed_area(&self.points)
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Map every vertex through `f`, keeping vertex order.
    pub fn map_points(&self, f: impl Fn(Point) -> Point) -> Self {
        Self {
            points: self.points.iter().copied().map(f).collect(),
        }
    }

    /// Describe why this polygon cannot be used as slot geometry, if it can't.
    pub fn degeneracy(&self) -> Option<String> {
        if self.points.len() < 3 {
            return Some(format!(
                "polygon needs at least 3 points, got {}",
                self.points.len()
            ));
        }
        if self.points.iter().any(|p| !p.is_finite()) {
            return Some("polygon has non-finite coordinates".to_string());
        }
        let area = self.area();
        if area.is_nan() || area <= 0.0 {
            return Some(format!("polygon area must be positive, got {}", area));
        }
        if !self.is_simple() {
            return Some("polygon is self-intersecting".to_string());
        }
        None
    }

    /// True when no two non-adjacent edges touch.
    pub fn is_simple(&self) -> bool {
        let n = self.points.len();
        if n < 4 {
            return n == 3;
        }
        for i in 0..n {
            let a1 = self.points[i];
            let a2 = self.points[(i + 1) % n];
            for j in (i + 1)..n {
                let adjacent = j == i + 1 || (i == 0 && j == n - 1);
                if adjacent {
                    continue;
                }
                let b1 = self.points[j];
                let b2 = self.points[(j + 1) % n];
                if segments_intersect(a1, a2, b1, b2) {
                    return false;
                }
            }
        }
        true
    }

    /// Strict point-in-polygon: boundary points are outside.
    pub fn contains(&self, p: Point) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[j];
            if on_segment(a, b, p) {
                return false;
            }
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Smallest axis-aligned box enclosing the polygon.
    pub fn bounds(&self) -> Option<BoundingBox> {
        let first = self.points.first()?;
        let mut bb = BoundingBox {
            x1: first.x,
            y1: first.y,
            x2: first.x,
            y2: first.y,
        };
        for p in &self.points[1..] {
            bb.x1 = bb.x1.min(p.x);
            bb.y1 = bb.y1.min(p.y);
            bb.x2 = bb.x2.max(p.x);
            bb.y2 = bb.y2.max(p.y);
        }
        Some(bb)
    }

    /// Area of the intersection between this polygon and an axis-aligned box.
    ///
    /// Clips the ring against the four box half-planes (Sutherland-Hodgman).
    /// The clip window is convex, so the result is exact for concave slots too.
    pub fn intersection_area(&self, bbox: &BoundingBox) -> f64 {
        if self.points.len() < 3 || bbox.area() <= 0.0 {
            return 0.0;
        }
        let mut ring = self.points.clone();
        ring = clip_ring(&ring, |p| p.x >= bbox.x1, |a, b| lerp_at_x(a, b, bbox.x1));
        ring = clip_ring(&ring, |p| p.x <= bbox.x2, |a, b| lerp_at_x(a, b, bbox.x2));
        ring = clip_ring(&ring, |p| p.y >= bbox.y1, |a, b| lerp_at_y(a, b, bbox.y1));
        ring = clip_ring(&ring, |p| p.y <= bbox.y2, |a, b| lerp_at_y(a, b, bbox.y2));
        if ring.len() < 3 {
            return 0.0;
        }
        ring_signed_area(&ring).abs()
    }
}

/// Axis-aligned box in pixel coordinates, `x1 <= x2` and `y1 <= y2`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    /// Corners may be given in any order.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn centroid(&self) -> Point {
        Point::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn is_finite(&self) -> bool {
        self.x1.is_finite() && self.y1.is_finite() && self.x2.is_finite() && self.y2.is_finite()
    }

    pub fn to_polygon(&self) -> Polygon {
        Polygon::new(vec![
            Point::new(self.x1, self.y1),
            Point::new(self.x2, self.y1),
            Point::new(self.x2, self.y2),
            Point::new(self.x1, self.y2),
        ])
    }
}

fn ring_signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        twice += a.x * b.y - b.x * a.y;
    }
    twice / 2.0
}

fn clip_ring(
    ring: &[Point],
    inside: impl Fn(Point) -> bool,
    intersect: impl Fn(Point, Point) -> Point,
) -> Vec<Point> {
    let Some(&last) = ring.last() else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(ring.len() + 4);
    let mut prev = last;
    for &cur in ring {
        let cur_in = inside(cur);
        let prev_in = inside(prev);
        if cur_in {
            if !prev_in {
                out.push(intersect(prev, cur));
            }
            out.push(cur);
        } else if prev_in {
            out.push(intersect(prev, cur));
        }
        prev = cur;
    }
    out
}

fn lerp_at_x(a: Point, b: Point, x: f64) -> Point {
    let t = (x - a.x) / (b.x - a.x);
    Point::new(x, a.y + t * (b.y - a.y))
}

fn lerp_at_y(a: Point, b: Point, y: f64) -> Point {
    let t = (y - a.y) / (b.y - a.y);
    Point::new(a.x + t * (b.x - a.x), y)
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    let scale = (b.x - a.x).abs().max((b.y - a.y).abs()).max(1.0);
    if cross(a, b, p).abs() > EDGE_EPSILON * scale {
        return false;
    }
    p.x >= a.x.min(b.x) - EDGE_EPSILON
        && p.x <= a.x.max(b.x) + EDGE_EPSILON
        && p.y >= a.y.min(b.y) - EDGE_EPSILON
        && p.y <= a.y.max(b.y) + EDGE_EPSILON
}

fn segments_intersect(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let d1 = cross(b1, b2, a1);
    let d2 = cross(b1, b2, a2);
    let d3 = cross(a1, a2, b1);
    let d4 = cross(a1, a2, b2);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    on_segment(b1, b2, a1) || on_segment(b1, b2, a2) || on_segment(a1, a2, b1) || on_segment(a1, a2, b2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, side: f64) -> Polygon {
        Polygon::new(vec![
            Point::new(x0, y0),
            Point::new(x0 + side, y0),
            Point::new(x0 + side, y0 + side),
            Point::new(x0, y0 + side),
        ])
    }

    #[test]
    fn shoelace_area_ignores_orientation() {
        let ccw = square(0.0, 0.0, 10.0);
        let cw = Polygon::new(ccw.points().iter().rev().copied().collect());
        assert_eq!(ccw.area(), 100.0);
        assert_eq!(cw.area(), 100.0);
        assert!(ccw.signed_area() > 0.0);
        assert!(cw.signed_area() < 0.0);
    }

    #[test]
    fn closing_point_is_dropped() {
        let poly = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 0.0),
        ]);
        assert_eq!(poly.len(), 3);
        assert_eq!(poly.area(), 8.0);
    }

    #[test]
    fn containment_is_strict() {
        let poly = square(0.0, 0.0, 10.0);
        assert!(poly.contains(Point::new(5.0, 5.0)));
        assert!(!poly.contains(Point::new(10.0, 5.0)));
        assert!(!poly.contains(Point::new(0.0, 0.0)));
        assert!(!poly.contains(Point::new(12.0, 5.0)));
    }

    #[test]
    fn concave_containment() {
        // U shape opening upwards; the notch is outside.
        let u = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(30.0, 0.0),
            Point::new(30.0, 30.0),
            Point::new(20.0, 30.0),
            Point::new(20.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 30.0),
            Point::new(0.0, 30.0),
        ]);
        assert!(u.contains(Point::new(5.0, 20.0)));
        assert!(!u.contains(Point::new(15.0, 20.0)));
        assert!(u.contains(Point::new(15.0, 5.0)));
    }

    #[test]
    fn intersection_with_box() {
        let poly = square(0.0, 0.0, 10.0);
        let straddling = BoundingBox::new(9.0, 2.0, 15.0, 8.0);
        assert!((poly.intersection_area(&straddling) - 6.0).abs() < 1e-9);

        let inside = BoundingBox::new(2.0, 2.0, 8.0, 8.0);
        assert!((poly.intersection_area(&inside) - 36.0).abs() < 1e-9);

        let covering = BoundingBox::new(-5.0, -5.0, 50.0, 50.0);
        assert!((poly.intersection_area(&covering) - 100.0).abs() < 1e-9);

        let disjoint = BoundingBox::new(20.0, 0.0, 30.0, 10.0);
        assert_eq!(poly.intersection_area(&disjoint), 0.0);
    }

    #[test]
    fn intersection_with_concave_slot() {
        let u = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(30.0, 0.0),
            Point::new(30.0, 30.0),
            Point::new(20.0, 30.0),
            Point::new(20.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 30.0),
            Point::new(0.0, 30.0),
        ]);
        // Box spans the notch: only the two arms and the base strip overlap.
        let bbox = BoundingBox::new(5.0, 5.0, 25.0, 25.0);
        // base strip 20x5 + two arms 5x15 each
        assert!((u.intersection_area(&bbox) - 250.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_polygons_are_reported() {
        let line = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 5.0),
            Point::new(10.0, 10.0),
        ]);
        assert!(line.degeneracy().is_some());

        let bowtie = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ]);
        assert!(!bowtie.is_simple());
        assert!(bowtie.degeneracy().is_some());

        assert!(square(0.0, 0.0, 3.0).degeneracy().is_none());
    }

    #[test]
    fn box_normalizes_corners() {
        let bbox = BoundingBox::new(8.0, 8.0, 2.0, 2.0);
        assert_eq!(bbox, BoundingBox::new(2.0, 2.0, 8.0, 8.0));
        assert_eq!(bbox.centroid(), Point::new(5.0, 5.0));
        assert_eq!(bbox.to_polygon().area(), 36.0);
    }
}
