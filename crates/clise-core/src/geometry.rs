//! Bounding-box math and point-in-shape tests.
//!
//! All bounds are axis-aligned and normalized (non-negative width/height),
//! even when the element itself is flipped (`w < 0` or `h < 0`).

use crate::model::{Element, ElementKind, PathPoint, ShadowKind, StrokePosition};
use serde::{Deserialize, Serialize};

/// Pixel tolerance for hitting a line, divided by zoom at test time.
pub const LINE_HIT_TOLERANCE: f64 = 6.0;

// ─── Point ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point::new(0.0, 0.0);

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Rotate around `center` by `angle` radians.
    pub fn rotate_about(self, center: Point, angle: f64) -> Point {
        if angle == 0.0 {
            return self;
        }
        let (sin, cos) = angle.sin_cos();
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        Point::new(
            center.x + dx * cos - dy * sin,
            center.y + dx * sin + dy * cos,
        )
    }
}

// ─── Bounds ──────────────────────────────────────────────────────────────

/// Axis-aligned rectangle in scene units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalized rectangle spanning two arbitrary corners.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self::new(x, y, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    /// Smallest rectangle containing every point. `None` for an empty input.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in iter {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x, self.y),
            Point::new(self.max_x(), self.y),
            Point::new(self.max_x(), self.max_y()),
            Point::new(self.x, self.max_y()),
        ]
    }

    /// Inclusive containment.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.max_x() && p.y >= self.y && p.y <= self.max_y()
    }

    /// `other` lies entirely inside (edges may coincide).
    pub fn contains_bounds(&self, other: &Bounds) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.max_x() <= self.max_x()
            && other.max_y() <= self.max_y()
    }

    /// Overlap test where touching edges count (box selection, culling).
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x <= other.max_x()
            && self.max_x() >= other.x
            && self.y <= other.max_y()
            && self.max_y() >= other.y
    }

    /// Overlap test where touching edges do not count (island edges).
    pub fn overlaps_strict(&self, other: &Bounds) -> bool {
        self.x < other.max_x()
            && self.max_x() > other.x
            && self.y < other.max_y()
            && self.max_y() > other.y
    }

    pub fn intersection(&self, other: &Bounds) -> Option<Bounds> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let max_x = self.max_x().min(other.max_x());
        let max_y = self.max_y().min(other.max_y());
        (max_x > x && max_y > y).then(|| Bounds::new(x, y, max_x - x, max_y - y))
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let max_x = self.max_x().max(other.max_x());
        let max_y = self.max_y().max(other.max_y());
        Bounds::new(x, y, max_x - x, max_y - y)
    }

    pub fn union_all<'a>(bounds: impl IntoIterator<Item = &'a Bounds>) -> Option<Bounds> {
        bounds.into_iter().fold(None, |acc, b| match acc {
            None => Some(*b),
            Some(u) => Some(u.union(b)),
        })
    }

    /// Grow by `d` on every side.
    pub fn inflate(&self, d: f64) -> Bounds {
        Bounds::new(
            self.x - d,
            self.y - d,
            self.width + d * 2.0,
            self.height + d * 2.0,
        )
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Bounds {
        Bounds::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

// ─── Element bounds ──────────────────────────────────────────────────────

/// The element box with negative sizes folded back to a positive rectangle.
pub fn normalized_box(el: &Element) -> Bounds {
    Bounds::from_corners(
        Point::new(el.x, el.y),
        Point::new(el.x + el.w, el.y + el.h),
    )
}

/// Bounds of a path's points and curve handles in its local space.
pub fn path_local_bounds(points: &[PathPoint]) -> Option<Bounds> {
    Bounds::from_points(points.iter().flat_map(|p| {
        let handles = p.curve.map(|c| c.handles()).unwrap_or_default();
        std::iter::once(Point::new(p.x, p.y))
            .chain(handles.into_iter().map(|(x, y)| Point::new(x, y)))
    }))
}

/// Axis-aligned bounds of an element in scene space, after rotation.
///
/// Lines use both endpoints; paths include every point and control handle.
pub fn element_bounds(el: &Element) -> Bounds {
    let unrotated = match &el.kind {
        ElementKind::Line { x2, y2 } => {
            Bounds::from_corners(Point::new(el.x, el.y), Point::new(*x2, *y2))
        }
        ElementKind::Path { points, .. } => path_local_bounds(points)
            .map(|b| b.translate(el.x, el.y))
            .unwrap_or_else(|| normalized_box(el)),
        _ => normalized_box(el),
    };

    if el.rotation == 0.0 {
        return unrotated;
    }
    let (cx, cy) = el.center();
    let pivot = Point::new(cx, cy);
    let rotated = unrotated
        .corners()
        .map(|c| c.rotate_about(pivot, el.rotation));
    Bounds::from_points(rotated).unwrap_or(unrotated)
}

/// Bounds including stroke and drop-shadow extents. Used for export
/// framing and render culling.
pub fn export_bounds(el: &Element) -> Bounds {
    let mut bounds = element_bounds(el);

    if let Some(stroke) = &el.stroke {
        let grow = match (&el.kind, stroke.position) {
            // Open strokes have no inside; they always straddle the outline.
            (ElementKind::Line { .. }, _) => stroke.width / 2.0,
            (_, StrokePosition::Outside) => stroke.width,
            (_, StrokePosition::Center) => stroke.width / 2.0,
            (_, StrokePosition::Inside) => 0.0,
        };
        bounds = bounds.inflate(grow);
    }

    if let Some(shadow) = &el.shadow
        && shadow.kind == ShadowKind::Drop
    {
        let spill = shadow.blur + shadow.spread.max(0.0);
        let cast = bounds
            .inflate(spill)
            .translate(shadow.offset_x, shadow.offset_y);
        bounds = bounds.union(&cast);
    }

    bounds
}

// ─── Point-in-element ────────────────────────────────────────────────────

/// Distance from `p` to the segment `a`–`b`.
pub fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

/// Whether scene point `p` is on the element, at the given zoom.
pub fn point_in_element(el: &Element, p: Point, zoom: f64) -> bool {
    point_in_element_with_tolerance(el, p, zoom, LINE_HIT_TOLERANCE)
}

pub fn point_in_element_with_tolerance(el: &Element, p: Point, zoom: f64, tolerance: f64) -> bool {
    let (cx, cy) = el.center();
    // Undo the element's rotation so the test runs in its own frame.
    let local = p.rotate_about(Point::new(cx, cy), -el.rotation);

    match &el.kind {
        ElementKind::Rect { .. } | ElementKind::Frame { .. } => normalized_box(el).contains(local),
        ElementKind::Ellipse { .. } => {
            let rx = el.w.abs() / 2.0;
            let ry = el.h.abs() / 2.0;
            if rx == 0.0 || ry == 0.0 {
                return false;
            }
            let nx = (local.x - cx) / rx;
            let ny = (local.y - cy) / ry;
            nx * nx + ny * ny <= 1.0
        }
        ElementKind::Line { x2, y2 } => {
            let zoom = if zoom > 0.0 { zoom } else { 1.0 };
            let start = Point::new(el.x, el.y).rotate_about(Point::new(cx, cy), el.rotation);
            let end = Point::new(*x2, *y2).rotate_about(Point::new(cx, cy), el.rotation);
            segment_distance(p, start, end) <= tolerance / zoom
        }
        ElementKind::Path { points, .. } => path_local_bounds(points)
            .map(|b| b.translate(el.x, el.y).contains(local))
            .unwrap_or(false),
        ElementKind::Text(_) | ElementKind::Image(_) => normalized_box(el).contains(local),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ElementId;
    use crate::model::{Curve, Shadow, Stroke};

    fn ellipse(x: f64, y: f64, w: f64, h: f64) -> Element {
        Element::new(ElementId::intern("geo_ell"), ElementKind::ellipse(), x, y, w, h)
    }

    #[test]
    fn flipped_box_normalizes() {
        let el = Element::rect("geo_flip", 100.0, 100.0, -40.0, -20.0);
        assert_eq!(element_bounds(&el), Bounds::new(60.0, 80.0, 40.0, 20.0));
    }

    #[test]
    fn rotated_rect_bounds_grow() {
        let mut el = Element::rect("geo_rot", 0.0, 0.0, 100.0, 100.0);
        el.rotation = std::f64::consts::FRAC_PI_4;
        let b = element_bounds(&el);
        let diag = 100.0 * std::f64::consts::SQRT_2;
        assert!((b.width - diag).abs() < 1e-9);
        assert!((b.center().x - 50.0).abs() < 1e-9);
    }

    #[test]
    fn rotated_rect_hit_uses_inverse_rotation() {
        let mut el = Element::rect("geo_rot_hit", 0.0, 0.0, 100.0, 10.0);
        el.rotation = std::f64::consts::FRAC_PI_2;
        // After a quarter turn the bar is vertical through (50, 5).
        assert!(point_in_element(&el, Point::new(50.0, 40.0), 1.0));
        assert!(!point_in_element(&el, Point::new(95.0, 5.0), 1.0));
    }

    #[test]
    fn ellipse_excludes_corners() {
        let el = ellipse(0.0, 0.0, 100.0, 50.0);
        assert!(point_in_element(&el, Point::new(50.0, 25.0), 1.0));
        assert!(!point_in_element(&el, Point::new(2.0, 2.0), 1.0));
    }

    #[test]
    fn line_tolerance_scales_with_zoom() {
        let el = Element::new(
            ElementId::intern("geo_line"),
            ElementKind::Line { x2: 100.0, y2: 0.0 },
            0.0,
            0.0,
            0.0,
            0.0,
        );
        assert!(point_in_element(&el, Point::new(50.0, 5.0), 1.0));
        // At 2× zoom the tolerance is 3 scene units.
        assert!(!point_in_element(&el, Point::new(50.0, 5.0), 2.0));
        assert!(!point_in_element(&el, Point::new(120.0, 0.0), 1.0));
    }

    #[test]
    fn path_bounds_include_handles() {
        let mut points = vec![PathPoint::new(0.0, 0.0), PathPoint::new(100.0, 0.0)];
        points[0].curve = Some(Curve::Quadratic { cx: 50.0, cy: -30.0 });
        let el = Element::new(
            ElementId::intern("geo_path"),
            ElementKind::Path {
                points,
                closed: false,
            },
            10.0,
            10.0,
            100.0,
            30.0,
        );
        let b = element_bounds(&el);
        assert_eq!(b, Bounds::new(10.0, -20.0, 100.0, 30.0));
        assert!(point_in_element(&el, Point::new(60.0, -10.0), 1.0));
    }

    #[test]
    fn export_bounds_include_stroke_and_shadow() {
        let mut el = Element::rect("geo_export", 0.0, 0.0, 10.0, 10.0);
        el.stroke = Some(Stroke {
            width: 4.0,
            position: StrokePosition::Outside,
            ..Stroke::default()
        });
        assert_eq!(export_bounds(&el), Bounds::new(-4.0, -4.0, 18.0, 18.0));

        el.stroke = None;
        el.shadow = Some(Shadow {
            offset_x: 10.0,
            offset_y: 0.0,
            blur: 0.0,
            spread: 0.0,
            color: "#000".into(),
            opacity: 0.5,
            kind: ShadowKind::Drop,
        });
        assert_eq!(export_bounds(&el), Bounds::new(0.0, 0.0, 20.0, 10.0));
    }

    #[test]
    fn touching_vs_strict_overlap() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::new(10.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&b));
        assert!(!a.overlaps_strict(&b));
        assert_eq!(a.intersection(&b), None);
    }
}
