//! Resize math for the 8 selection handles.
//!
//! Boxes here are *raw*: `x, y` is the element origin and `width, height`
//! are signed, so dragging a handle across the opposite edge flips the
//! element instead of clamping it.

use clise_core::geometry::normalized_box;
use clise_core::model::ElementKind;
use clise_core::path::{normalize_path, point_extent, scale_points};
use clise_core::{Bounds, Element, Point, element_bounds};
use clise_render::Handle;

/// Text never shrinks below this font size through a resize.
pub const MIN_FONT_SIZE: f64 = 8.0;

/// Drag `handle` of the normalized box `start` by `(dx, dy)`.
///
/// With `keep_aspect`, the axis with the larger relative change decides the
/// scale and the other follows; edge handles drive their own axis.
pub fn resize_box(start: &Bounds, handle: Handle, dx: f64, dy: f64, keep_aspect: bool) -> Bounds {
    let (mut x, mut y, mut w, mut h) = (start.x, start.y, start.width, start.height);
    if handle.affects_width() {
        if handle.moves_left() {
            x += dx;
            w -= dx;
        } else {
            w += dx;
        }
    }
    if handle.affects_height() {
        if handle.moves_top() {
            y += dy;
            h -= dy;
        } else {
            h += dy;
        }
    }

    if keep_aspect && start.width != 0.0 && start.height != 0.0 {
        let sx = w / start.width;
        let sy = h / start.height;
        let s = if !handle.affects_height() {
            sx
        } else if !handle.affects_width() {
            sy
        } else if (sx - 1.0).abs() >= (sy - 1.0).abs() {
            sx
        } else {
            sy
        };
        w = start.width * s;
        h = start.height * s;
        x = if handle.moves_left() {
            start.x + start.width - w
        } else {
            start.x
        };
        y = if handle.moves_top() {
            start.y + start.height - h
        } else {
            start.y
        };
    }
    Bounds::new(x, y, w, h)
}

/// Give `el` the raw box `to`, adapting variant data: paths scale every
/// point and handle, text derives its font size from the scale ratio, and
/// lines move both endpoints.
pub fn resize_element(el: &Element, to: &Bounds, handle: Handle) -> Element {
    let sx = if el.w != 0.0 { to.width / el.w } else { 1.0 };
    let sy = if el.h != 0.0 { to.height / el.h } else { 1.0 };

    let mut next = el.clone();
    next.x = to.x;
    next.y = to.y;
    next.w = to.width;
    next.h = to.height;

    match &mut next.kind {
        ElementKind::Line { x2, y2 } => {
            *x2 = to.x + to.width;
            *y2 = to.y + to.height;
        }
        ElementKind::Path { points, .. } => {
            // `w/h` are floored to 1, so ratios come from the points. An axis
            // the points don't span has nothing to scale.
            let (pw, ph) = point_extent(points);
            let sx = if pw != 0.0 { to.width / pw } else { 1.0 };
            let sy = if ph != 0.0 { to.height / ph } else { 1.0 };
            *points = scale_points(points, sx, sy);
            normalize_path(&mut next);
        }
        ElementKind::Text(props) => {
            let ratio = if handle.affects_height() { sy.abs() } else { sx.abs() };
            props.font_size = (props.font_size * ratio).max(MIN_FONT_SIZE);
        }
        ElementKind::Rect { .. }
        | ElementKind::Ellipse { .. }
        | ElementKind::Frame { .. }
        | ElementKind::Image(_) => {}
    }
    next
}

/// An in-progress handle drag over one element or a whole group.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeGesture {
    pub handle: Handle,
    start: Point,
    /// Normalized box the handle belongs to.
    frame: Bounds,
    originals: Vec<Element>,
    flip_x: bool,
    flip_y: bool,
}

impl ResizeGesture {
    /// Resize a single element.
    pub fn single(el: &Element, handle: Handle, start: Point) -> Self {
        Self {
            handle,
            start,
            frame: normalized_box(el),
            originals: vec![el.clone()],
            flip_x: el.w < 0.0,
            flip_y: el.h < 0.0,
        }
    }

    /// Resize several elements together inside their union box.
    pub fn multi(elements: Vec<Element>, handle: Handle, start: Point) -> Option<Self> {
        let boxes: Vec<Bounds> = elements.iter().map(element_bounds).collect();
        let frame = Bounds::union_all(&boxes)?;
        Some(Self {
            handle,
            start,
            frame,
            originals: elements,
            flip_x: false,
            flip_y: false,
        })
    }

    pub fn originals(&self) -> &[Element] {
        &self.originals
    }

    /// Updated elements for pointer position `p` (scene units).
    /// `shift` keeps the aspect ratio on corner handles; images always do.
    pub fn update(&self, p: Point, shift: bool) -> Vec<Element> {
        let (dx, dy) = (p.x - self.start.x, p.y - self.start.y);
        match self.originals.as_slice() {
            [el] => {
                let keep_aspect = matches!(el.kind, ElementKind::Image(_))
                    || (shift && self.handle.is_corner());
                let mut b = resize_box(&self.frame, self.handle, dx, dy, keep_aspect);
                // Back to raw coordinates for flipped originals.
                if self.flip_x {
                    b.x += b.width;
                    b.width = -b.width;
                }
                if self.flip_y {
                    b.y += b.height;
                    b.height = -b.height;
                }
                vec![resize_element(el, &b, self.handle)]
            }
            _ => {
                let keep_aspect = shift && self.handle.is_corner();
                let to = resize_box(&self.frame, self.handle, dx, dy, keep_aspect);
                map_into(&self.originals, &self.frame, &to, self.handle)
            }
        }
    }
}

/// Map each element's raw box from `from` into `to` (possibly flipped).
fn map_into(elements: &[Element], from: &Bounds, to: &Bounds, handle: Handle) -> Vec<Element> {
    let sx = if from.width != 0.0 { to.width / from.width } else { 1.0 };
    let sy = if from.height != 0.0 { to.height / from.height } else { 1.0 };
    elements
        .iter()
        .map(|el| {
            let b = Bounds::new(
                to.x + (el.x - from.x) * sx,
                to.y + (el.y - from.y) * sy,
                el.w * sx,
                el.h * sy,
            );
            resize_element(el, &b, handle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clise_core::model::{ImageProps, PathPoint, TextProps};
    use clise_core::ElementId;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> ElementId {
        ElementId::intern(s)
    }

    #[test]
    fn right_handle_past_left_edge_flips() {
        let b = resize_box(&Bounds::new(0.0, 0.0, 100.0, 50.0), Handle::Right, -150.0, 0.0, false);
        assert_eq!(b, Bounds::new(0.0, 0.0, -50.0, 50.0));
    }

    #[test]
    fn top_left_moves_origin() {
        let b = resize_box(
            &Bounds::new(10.0, 10.0, 100.0, 100.0),
            Handle::TopLeft,
            20.0,
            -10.0,
            false,
        );
        assert_eq!(b, Bounds::new(30.0, 0.0, 80.0, 110.0));
    }

    #[test]
    fn edge_handles_touch_one_axis() {
        let b = resize_box(&Bounds::new(0.0, 0.0, 100.0, 50.0), Handle::Bottom, 30.0, 25.0, false);
        assert_eq!(b, Bounds::new(0.0, 0.0, 100.0, 75.0));
    }

    #[test]
    fn aspect_follows_dominant_axis() {
        // Width grows 50%, height 10%: width wins.
        let b = resize_box(
            &Bounds::new(0.0, 0.0, 200.0, 100.0),
            Handle::BottomRight,
            100.0,
            10.0,
            true,
        );
        assert_eq!(b, Bounds::new(0.0, 0.0, 300.0, 150.0));

        let b = resize_box(
            &Bounds::new(0.0, 0.0, 200.0, 100.0),
            Handle::TopLeft,
            -100.0,
            0.0,
            true,
        );
        assert_eq!(b, Bounds::new(-100.0, -50.0, 300.0, 150.0));
    }

    #[test]
    fn images_keep_aspect() {
        let img = Element::new(
            id("rs_img"),
            ElementKind::Image(ImageProps::new("a.png", 200.0, 100.0)),
            0.0,
            0.0,
            200.0,
            100.0,
        );
        let g = ResizeGesture::single(&img, Handle::Right, Point::new(200.0, 50.0));
        let out = g.update(Point::new(400.0, 50.0), false);
        assert_eq!((out[0].w, out[0].h), (400.0, 200.0));
    }

    #[test]
    fn text_font_scales_with_floor() {
        let text = Element::new(
            id("rs_text"),
            ElementKind::Text(TextProps {
                font_size: 20.0,
                ..TextProps::default()
            }),
            0.0,
            0.0,
            100.0,
            40.0,
        );
        let grown = resize_element(&text, &Bounds::new(0.0, 0.0, 100.0, 80.0), Handle::Bottom);
        let ElementKind::Text(props) = &grown.kind else {
            panic!("not text");
        };
        assert_eq!(props.font_size, 40.0);

        let tiny = resize_element(&text, &Bounds::new(0.0, 0.0, 100.0, 4.0), Handle::Bottom);
        let ElementKind::Text(props) = &tiny.kind else {
            panic!("not text");
        };
        assert_eq!(props.font_size, MIN_FONT_SIZE);
    }

    #[test]
    fn path_points_scale_per_axis() {
        let path = Element::path(
            "rs_path",
            0.0,
            0.0,
            vec![PathPoint::new(0.0, 0.0), PathPoint::new(100.0, 50.0)],
            false,
        );
        let out = resize_element(&path, &Bounds::new(0.0, 0.0, 200.0, 25.0), Handle::BottomRight);
        let ElementKind::Path { points, .. } = &out.kind else {
            panic!("not a path");
        };
        assert_eq!((points[1].x, points[1].y), (200.0, 25.0));
        assert_eq!((out.w, out.h), (200.0, 25.0));
    }

    #[test]
    fn flat_path_keeps_its_zero_axis_when_resized() {
        let path = Element::path(
            "rs_flat",
            0.0,
            10.0,
            vec![PathPoint::new(0.0, 0.0), PathPoint::new(80.0, 0.0)],
            false,
        );
        assert_eq!((path.w, path.h), (80.0, 1.0));
        let out = resize_element(&path, &Bounds::new(0.0, 10.0, 160.0, 30.0), Handle::BottomRight);
        let ElementKind::Path { points, .. } = &out.kind else {
            panic!("not a path");
        };
        assert_eq!((points[1].x, points[1].y), (160.0, 0.0));
        assert_eq!(points[0].y, 0.0);
        assert_eq!((out.y, out.w, out.h), (10.0, 160.0, 1.0));
    }

    #[test]
    fn line_endpoints_follow_box() {
        let line = Element::new(
            id("rs_line"),
            ElementKind::Line { x2: 100.0, y2: 100.0 },
            0.0,
            0.0,
            0.0,
            0.0,
        );
        let out = resize_element(&line, &Bounds::new(0.0, 0.0, 50.0, 100.0), Handle::Right);
        assert_eq!(out.kind, ElementKind::Line { x2: 50.0, y2: 100.0 });
    }

    #[test]
    fn flipped_element_resizes_from_visual_edges() {
        // Raw x=200, w=-100 covers 100..200 on screen.
        let el = Element::rect("rs_flip", 200.0, 0.0, -100.0, 50.0);
        let g = ResizeGesture::single(&el, Handle::Right, Point::new(200.0, 25.0));
        let out = g.update(Point::new(250.0, 25.0), false);
        assert_eq!(element_bounds(&out[0]), Bounds::new(100.0, 0.0, 150.0, 50.0));
        assert!(out[0].w < 0.0);
    }

    #[test]
    fn group_members_scale_together() {
        let els = vec![
            Element::rect("rs_g1", 0.0, 0.0, 50.0, 50.0),
            Element::rect("rs_g2", 50.0, 50.0, 50.0, 50.0),
        ];
        let g = ResizeGesture::multi(els, Handle::BottomRight, Point::new(100.0, 100.0)).unwrap();
        let out = g.update(Point::new(200.0, 200.0), false);
        assert_eq!((out[1].x, out[1].y, out[1].w, out[1].h), (100.0, 100.0, 100.0, 100.0));
        assert_eq!((out[0].w, out[0].h), (100.0, 100.0));
    }
}
