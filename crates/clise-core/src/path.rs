//! Path editing engine.
//!
//! Path points are stored relative to the element's `x, y`. A point's curve
//! descriptor shapes the segment *leaving* that point. Every edit returns a
//! new element and leaves the input untouched; the `*_mutation` helpers wrap
//! edits into [`SceneMutation`]s for the command layer.
//!
//! Boolean operations are bounding-box approximations:
//! union merges both point sets, intersection yields the overlap rectangle,
//! difference returns the first path unchanged, exclusion behaves like union.

use crate::error::{EditError, Result};
use crate::geometry::{Bounds, Point, element_bounds};
use crate::id::ElementId;
use crate::model::{Curve, Element, ElementKind, PathPoint};
use crate::scene::{Scene, SceneMutation};
use serde::{Deserialize, Serialize};

/// Offset of a freshly appended point from the previous last point.
pub const INSERT_OFFSET: (f64, f64) = (20.0, 20.0);

/// Largest handle offset produced by segment conversion.
pub const CURVE_OFFSET_CAP: f64 = 40.0;

/// Handle offset as a fraction of the segment length.
pub const CURVE_OFFSET_RATIO: f64 = 0.25;

/// Target for [`convert_segment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveKind {
    Quadratic,
    Cubic,
    Smooth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanOp {
    Union,
    Intersection,
    Difference,
    Exclusion,
}

/// A resolved drawing segment, in the path's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Line { to: Point },
    Quad { ctrl: Point, to: Point },
    Cubic { c1: Point, c2: Point, to: Point },
}

fn points_of(el: &Element) -> Result<(&[PathPoint], bool)> {
    match &el.kind {
        ElementKind::Path { points, closed } => Ok((points, *closed)),
        _ => Err(EditError::NotAPath(el.id)),
    }
}

fn with_points(el: &Element, points: Vec<PathPoint>, closed: bool) -> Element {
    let mut out = el.clone();
    out.kind = ElementKind::Path { points, closed };
    normalize_path(&mut out);
    out
}

/// Shift points so the local origin is the points' minimum corner and set
/// `w/h` to their extent (at least 1 so the element stays valid).
pub fn normalize_path(el: &mut Element) {
    let ElementKind::Path { points, .. } = &mut el.kind else {
        return;
    };
    let Some(b) = Bounds::from_points(points.iter().map(|p| Point::new(p.x, p.y))) else {
        return;
    };
    if b.x != 0.0 || b.y != 0.0 {
        for p in points.iter_mut() {
            p.x -= b.x;
            p.y -= b.y;
            p.curve = p.curve.map(|c| c.map_points(|x, y| (x - b.x, y - b.y)));
        }
        el.x += b.x;
        el.y += b.y;
    }
    el.w = b.width.max(1.0);
    el.h = b.height.max(1.0);
}

/// Index of the point that segment `index` ends at.
fn segment_end(len: usize, closed: bool, index: usize) -> Option<usize> {
    if index + 1 < len {
        Some(index + 1)
    } else if closed && index + 1 == len && len > 2 {
        Some(0)
    } else {
        None
    }
}

/// Resolve curve descriptors into drawable segments. `Smooth` mirrors the
/// previous segment's last handle about the shared point.
pub fn segments(points: &[PathPoint], closed: bool) -> Vec<Segment> {
    let mut out = Vec::with_capacity(points.len());
    let mut last_ctrl: Option<Point> = None;
    let count = if closed && points.len() > 2 {
        points.len()
    } else {
        points.len().saturating_sub(1)
    };

    for i in 0..count {
        let from = &points[i];
        let to_pt = &points[(i + 1) % points.len()];
        let start = Point::new(from.x, from.y);
        let to = Point::new(to_pt.x, to_pt.y);
        let seg = match from.curve {
            None => Segment::Line { to },
            Some(Curve::Quadratic { cx, cy }) => Segment::Quad {
                ctrl: Point::new(cx, cy),
                to,
            },
            Some(Curve::Cubic {
                cp1x,
                cp1y,
                cp2x,
                cp2y,
            }) => Segment::Cubic {
                c1: Point::new(cp1x, cp1y),
                c2: Point::new(cp2x, cp2y),
                to,
            },
            Some(Curve::Smooth { cx, cy }) => {
                let c1 = last_ctrl
                    .map(|c| Point::new(2.0 * start.x - c.x, 2.0 * start.y - c.y))
                    .unwrap_or(start);
                Segment::Cubic {
                    c1,
                    c2: Point::new(cx, cy),
                    to,
                }
            }
        };
        last_ctrl = match seg {
            Segment::Line { .. } => None,
            Segment::Quad { ctrl, .. } => Some(ctrl),
            Segment::Cubic { c2, .. } => Some(c2),
        };
        out.push(seg);
    }
    out
}

// ─── Point edits ─────────────────────────────────────────────────────────

/// Append a point after the last one, offset by [`INSERT_OFFSET`].
pub fn insert_point(el: &Element) -> Result<Element> {
    let (points, closed) = points_of(el)?;
    let mut next = points.to_vec();
    let anchor = next.last().map(|p| (p.x, p.y)).unwrap_or((0.0, 0.0));
    next.push(PathPoint::new(anchor.0 + INSERT_OFFSET.0, anchor.1 + INSERT_OFFSET.1));
    Ok(with_points(el, next, closed))
}

/// Insert a point in the middle of segment `index`, splitting its curve.
pub fn insert_point_in_segment(el: &Element, index: usize) -> Result<Element> {
    let (points, closed) = points_of(el)?;
    let end = segment_end(points.len(), closed, index).ok_or(EditError::PointOutOfRange {
        id: el.id,
        index,
    })?;
    let seg = segments(points, closed)[index];
    let p0 = Point::new(points[index].x, points[index].y);

    let mut next = points.to_vec();
    let (head, mid) = match seg {
        Segment::Line { to } => (None, PathPoint::new((p0.x + to.x) / 2.0, (p0.y + to.y) / 2.0)),
        Segment::Quad { ctrl, to } => {
            let q0 = lerp(p0, ctrl, 0.5);
            let q1 = lerp(ctrl, to, 0.5);
            let m = lerp(q0, q1, 0.5);
            (
                Some(Curve::Quadratic { cx: q0.x, cy: q0.y }),
                PathPoint {
                    x: m.x,
                    y: m.y,
                    curve: Some(Curve::Quadratic { cx: q1.x, cy: q1.y }),
                },
            )
        }
        Segment::Cubic { c1, c2, to } => {
            let a = lerp(p0, c1, 0.5);
            let b = lerp(c1, c2, 0.5);
            let c = lerp(c2, to, 0.5);
            let d = lerp(a, b, 0.5);
            let e = lerp(b, c, 0.5);
            let m = lerp(d, e, 0.5);
            (
                Some(Curve::Cubic {
                    cp1x: a.x,
                    cp1y: a.y,
                    cp2x: d.x,
                    cp2y: d.y,
                }),
                PathPoint {
                    x: m.x,
                    y: m.y,
                    curve: Some(Curve::Cubic {
                        cp1x: e.x,
                        cp1y: e.y,
                        cp2x: c.x,
                        cp2y: c.y,
                    }),
                },
            )
        }
    };
    next[index].curve = head;
    // Closing segment: the new point goes after the last point.
    let at = if end == 0 { next.len() } else { end };
    next.insert(at, mid);
    Ok(with_points(el, next, closed))
}

/// Remove point `index`. A path keeps at least 2 points.
pub fn remove_point(el: &Element, index: usize) -> Result<Element> {
    let (points, closed) = points_of(el)?;
    if index >= points.len() {
        return Err(EditError::PointOutOfRange { id: el.id, index });
    }
    if points.len() <= 2 {
        return Err(EditError::PointFloor);
    }
    let mut next = points.to_vec();
    next.remove(index);
    // Closing a 2-point path makes no sense.
    let closed = closed && next.len() > 2;
    if !closed && let Some(last) = next.last_mut() {
        last.curve = None;
    }
    Ok(with_points(el, next, closed))
}

/// Move point `index` by `(dx, dy)`; its outgoing handles move with it.
pub fn move_point(el: &Element, index: usize, dx: f64, dy: f64) -> Result<Element> {
    let (points, closed) = points_of(el)?;
    let mut next = points.to_vec();
    let p = next
        .get_mut(index)
        .ok_or(EditError::PointOutOfRange { id: el.id, index })?;
    p.x += dx;
    p.y += dy;
    p.curve = p.curve.map(|c| c.map_points(|x, y| (x + dx, y + dy)));
    Ok(with_points(el, next, closed))
}

/// Set handle `handle` (0 or 1) of the curve leaving point `index` to a
/// local position.
pub fn move_handle(el: &Element, index: usize, handle: usize, x: f64, y: f64) -> Result<Element> {
    let (points, closed) = points_of(el)?;
    let mut next = points.to_vec();
    let out_of_range = EditError::PointOutOfRange { id: el.id, index };
    let p = next.get_mut(index).ok_or(out_of_range.clone())?;
    p.curve = match (p.curve, handle) {
        (Some(Curve::Quadratic { .. }), 0) => Some(Curve::Quadratic { cx: x, cy: y }),
        (Some(Curve::Smooth { .. }), 0) => Some(Curve::Smooth { cx: x, cy: y }),
        (Some(Curve::Cubic { cp2x, cp2y, .. }), 0) => Some(Curve::Cubic {
            cp1x: x,
            cp1y: y,
            cp2x,
            cp2y,
        }),
        (Some(Curve::Cubic { cp1x, cp1y, .. }), 1) => Some(Curve::Cubic {
            cp1x,
            cp1y,
            cp2x: x,
            cp2y: y,
        }),
        _ => return Err(out_of_range),
    };
    Ok(with_points(el, next, closed))
}

/// Turn segment `index` into a curve. Handles sit perpendicular to the
/// segment, offset by `min(40, length × 0.25)`.
pub fn convert_segment(el: &Element, index: usize, kind: CurveKind) -> Result<Element> {
    let (points, closed) = points_of(el)?;
    let end = segment_end(points.len(), closed, index).ok_or(EditError::PointOutOfRange {
        id: el.id,
        index,
    })?;
    let a = Point::new(points[index].x, points[index].y);
    let b = Point::new(points[end].x, points[end].y);
    let len = a.distance(b);
    if len == 0.0 {
        return Err(EditError::DegeneratePath(el.id));
    }
    let offset = CURVE_OFFSET_CAP.min(len * CURVE_OFFSET_RATIO);
    // Unit normal; for a left-to-right segment it points up (−y).
    let nx = (b.y - a.y) / len;
    let ny = -(b.x - a.x) / len;
    let bulge = |t: f64| {
        let p = lerp(a, b, t);
        Point::new(p.x + nx * offset, p.y + ny * offset)
    };

    let curve = match kind {
        CurveKind::Quadratic => {
            let c = bulge(0.5);
            Curve::Quadratic { cx: c.x, cy: c.y }
        }
        CurveKind::Smooth => {
            let c = bulge(0.5);
            Curve::Smooth { cx: c.x, cy: c.y }
        }
        CurveKind::Cubic => {
            let c1 = bulge(1.0 / 3.0);
            let c2 = bulge(2.0 / 3.0);
            Curve::Cubic {
                cp1x: c1.x,
                cp1y: c1.y,
                cp2x: c2.x,
                cp2y: c2.y,
            }
        }
    };
    let mut next = points.to_vec();
    next[index].curve = Some(curve);
    Ok(with_points(el, next, closed))
}

/// Drop the curve on segment `index`.
pub fn convert_to_straight(el: &Element, index: usize) -> Result<Element> {
    let (points, closed) = points_of(el)?;
    if index >= points.len() {
        return Err(EditError::PointOutOfRange { id: el.id, index });
    }
    let mut next = points.to_vec();
    next[index].curve = None;
    Ok(with_points(el, next, closed))
}

pub fn toggle_closed(el: &Element) -> Result<Element> {
    let (points, closed) = points_of(el)?;
    if points.len() < 2 {
        return Err(EditError::DegeneratePath(el.id));
    }
    let mut next = points.to_vec();
    if closed && let Some(last) = next.last_mut() {
        last.curve = None;
    }
    Ok(with_points(el, next, !closed))
}

/// Width and height spanned by the points themselves. Unlike the element's
/// `w/h` this is zero along an axis the path doesn't extend in.
pub fn point_extent(points: &[PathPoint]) -> (f64, f64) {
    Bounds::from_points(points.iter().map(|p| Point::new(p.x, p.y)))
        .map_or((0.0, 0.0), |b| (b.width, b.height))
}

/// Scale every point and handle around the local origin. Used by resize.
pub fn scale_points(points: &[PathPoint], sx: f64, sy: f64) -> Vec<PathPoint> {
    points
        .iter()
        .map(|p| PathPoint {
            x: p.x * sx,
            y: p.y * sy,
            curve: p.curve.map(|c| c.map_points(|x, y| (x * sx, y * sy))),
        })
        .collect()
}

// ─── Split / join ────────────────────────────────────────────────────────

/// Split at point `index` into two open paths sharing that point. The first
/// keeps the original id; the second gets `new_id`.
pub fn split_path(el: &Element, index: usize, new_id: ElementId) -> Result<(Element, Element)> {
    let (points, _) = points_of(el)?;
    if points.len() < 3 || index == 0 || index + 1 >= points.len() {
        return Err(EditError::InvalidSplit { id: el.id, index });
    }
    let mut head = points[..=index].to_vec();
    if let Some(last) = head.last_mut() {
        last.curve = None;
    }
    let mut tail_points = points[index..].to_vec();
    if let Some(last) = tail_points.last_mut() {
        last.curve = None;
    }

    let first = with_points(el, head, false);
    let mut second = with_points(el, tail_points, false);
    second.id = new_id;
    Ok((first, second))
}

/// Append `b`'s points to `a`, translated into `a`'s local space. The result
/// is open and keeps `a`'s id.
pub fn join_paths(a: &Element, b: &Element) -> Result<Element> {
    let (pa, _) = points_of(a)?;
    let (pb, _) = points_of(b)?;
    if pa.is_empty() || pb.is_empty() {
        return Err(EditError::DegeneratePath(if pa.is_empty() { a.id } else { b.id }));
    }
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let mut next = pa.to_vec();
    next.extend(pb.iter().map(|p| PathPoint {
        x: p.x + dx,
        y: p.y + dy,
        curve: p.curve.map(|c| c.map_points(|x, y| (x + dx, y + dy))),
    }));
    if let Some(last) = next.last_mut() {
        last.curve = None;
    }
    Ok(with_points(a, next, false))
}

// ─── Boolean (approximate) ───────────────────────────────────────────────

/// Combine two paths. `Ok(None)` when an intersection is empty.
pub fn boolean_op(a: &Element, b: &Element, op: BooleanOp) -> Result<Option<Element>> {
    let (pa, _) = points_of(a)?;
    let (pb, _) = points_of(b)?;
    if pa.len() < 2 {
        return Err(EditError::DegeneratePath(a.id));
    }
    if pb.len() < 2 {
        return Err(EditError::DegeneratePath(b.id));
    }

    match op {
        BooleanOp::Union | BooleanOp::Exclusion => {
            let (dx, dy) = (b.x - a.x, b.y - a.y);
            let mut merged: Vec<PathPoint> = pa.to_vec();
            merged.extend(pb.iter().map(|p| PathPoint {
                x: p.x + dx,
                y: p.y + dy,
                curve: p.curve.map(|c| c.map_points(|x, y| (x + dx, y + dy))),
            }));
            Ok(Some(with_points(a, merged, true)))
        }
        BooleanOp::Intersection => {
            let Some(overlap) = element_bounds(a).intersection(&element_bounds(b)) else {
                return Ok(None);
            };
            let mut out = a.clone();
            out.x = overlap.x;
            out.y = overlap.y;
            out.rotation = 0.0;
            let corners = [
                PathPoint::new(0.0, 0.0),
                PathPoint::new(overlap.width, 0.0),
                PathPoint::new(overlap.width, overlap.height),
                PathPoint::new(0.0, overlap.height),
            ];
            Ok(Some(with_points(&out, corners.to_vec(), true)))
        }
        BooleanOp::Difference => Ok(Some(a.clone())),
    }
}

// ─── Scene mutations ─────────────────────────────────────────────────────

fn path_in<'a>(scene: &'a Scene, id: ElementId) -> Result<&'a Element> {
    let el = scene.get(id).ok_or(EditError::UnknownElement(id))?;
    if !el.is_path() {
        return Err(EditError::NotAPath(id));
    }
    if el.locked {
        return Err(EditError::Locked(id));
    }
    Ok(el)
}

/// Apply a single-path edit as an update mutation.
pub fn edit_mutation(
    scene: &Scene,
    id: ElementId,
    edit: impl FnOnce(&Element) -> Result<Element>,
) -> Result<SceneMutation> {
    let el = path_in(scene, id)?;
    Ok(SceneMutation::Update {
        element: Box::new(edit(el)?),
    })
}

/// Split: update the original, insert the second half right above it.
pub fn split_mutation(scene: &Scene, id: ElementId, index: usize) -> Result<SceneMutation> {
    let el = path_in(scene, id)?;
    let (first, second) = split_path(el, index, ElementId::with_prefix("path"))?;
    let z = scene.index_of(id).unwrap_or(scene.len());
    let second_id = second.id;
    Ok(SceneMutation::Batch(vec![
        SceneMutation::Update {
            element: Box::new(first),
        },
        SceneMutation::Insert {
            element: Box::new(second),
            index: Some(z + 1),
        },
        SceneMutation::Select {
            ids: vec![id, second_id],
        },
    ]))
}

/// Join `b` onto `a`; `b` is deleted.
pub fn join_mutation(scene: &Scene, a: ElementId, b: ElementId) -> Result<SceneMutation> {
    if a == b {
        return Err(EditError::Empty("cannot join a path with itself"));
    }
    let joined = join_paths(path_in(scene, a)?, path_in(scene, b)?)?;
    Ok(SceneMutation::Batch(vec![
        SceneMutation::Update {
            element: Box::new(joined),
        },
        SceneMutation::Remove { ids: vec![b] },
        SceneMutation::Select { ids: vec![a] },
    ]))
}

/// Boolean-combine `a` and `b` into `a`. `b` is consumed except for
/// difference, which changes nothing.
pub fn boolean_mutation(
    scene: &Scene,
    a: ElementId,
    b: ElementId,
    op: BooleanOp,
) -> Result<SceneMutation> {
    let ea = path_in(scene, a)?;
    let eb = path_in(scene, b)?;
    let result = boolean_op(ea, eb, op)?.ok_or(EditError::Empty("paths do not overlap"))?;
    if op == BooleanOp::Difference {
        return Ok(SceneMutation::Batch(Vec::new()));
    }
    Ok(SceneMutation::Batch(vec![
        SceneMutation::Update {
            element: Box::new(result),
        },
        SceneMutation::Remove { ids: vec![b] },
        SceneMutation::Select { ids: vec![a] },
    ]))
}

fn lerp(a: Point, b: Point, t: f64) -> Point {
    Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}
