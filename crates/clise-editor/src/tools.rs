//! Tools and the elements they draw.
//!
//! ## Modifier behaviors
//!
//! | Modifier | Select | Box tools (rect, ellipse, frame) | Line |
//! |----------|--------|----------------------------------|------|
//! | **Shift** | Axis-constrain drag | Square | Snap to 45° |
//! | **Alt** | Duplicate on drag start | — | — |
//!
//! Interactive drawing never produces a dimension below [`MIN_DRAW_SIZE`];
//! resizing afterwards may flip an element to negative size.

use crate::input::Modifiers;
use clise_core::model::{ElementKind, Fill, PathPoint, Stroke, TextProps};
use clise_core::{Bounds, Element, ElementId, Point};
use clise_render::surface::APPROX_ADVANCE;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_4;

pub const MIN_DRAW_SIZE: f64 = 1.0;

/// The active tool determines how pointer input is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Select,
    /// Drag to pan.
    Hand,
    Rect,
    Ellipse,
    Frame,
    Line,
    /// Point-by-point path construction.
    Path,
    Text,
}

impl ToolKind {
    pub const ALL: [ToolKind; 8] = [
        ToolKind::Select,
        ToolKind::Hand,
        ToolKind::Rect,
        ToolKind::Ellipse,
        ToolKind::Frame,
        ToolKind::Line,
        ToolKind::Path,
        ToolKind::Text,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Select => "select",
            ToolKind::Hand => "hand",
            ToolKind::Rect => "rect",
            ToolKind::Ellipse => "ellipse",
            ToolKind::Frame => "frame",
            ToolKind::Line => "line",
            ToolKind::Path => "path",
            ToolKind::Text => "text",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Pointer-down with this tool creates an element.
    pub fn is_drawing(self) -> bool {
        !matches!(self, ToolKind::Select | ToolKind::Hand)
    }

    /// A fresh element at scene point `at`, or `None` for non-drawing tools.
    pub fn create(self, at: Point) -> Option<Element> {
        let fresh = || ElementId::with_prefix(self.name());
        let el = match self {
            ToolKind::Select | ToolKind::Hand => return None,
            ToolKind::Rect => Element::new(
                fresh(),
                ElementKind::rect(),
                at.x,
                at.y,
                MIN_DRAW_SIZE,
                MIN_DRAW_SIZE,
            ),
            ToolKind::Ellipse => Element::new(
                fresh(),
                ElementKind::ellipse(),
                at.x,
                at.y,
                MIN_DRAW_SIZE,
                MIN_DRAW_SIZE,
            ),
            ToolKind::Frame => {
                let mut frame = Element::new(
                    fresh(),
                    ElementKind::frame(),
                    at.x,
                    at.y,
                    MIN_DRAW_SIZE,
                    MIN_DRAW_SIZE,
                );
                frame.fill = Fill::solid("#FFFFFF");
                frame
            }
            // Starts as a zero-length segment.
            ToolKind::Line => {
                let mut line = Element::new(
                    fresh(),
                    ElementKind::Line { x2: at.x, y2: at.y },
                    at.x,
                    at.y,
                    0.0,
                    0.0,
                );
                line.fill = Fill::solid("transparent");
                line.stroke = Some(Stroke::default());
                line
            }
            ToolKind::Path => {
                let mut path = Element::new(
                    fresh(),
                    ElementKind::Path {
                        points: vec![PathPoint::new(0.0, 0.0)],
                        closed: false,
                    },
                    at.x,
                    at.y,
                    MIN_DRAW_SIZE,
                    MIN_DRAW_SIZE,
                );
                path.fill = Fill::solid("transparent");
                path.stroke = Some(Stroke::default());
                path
            }
            ToolKind::Text => {
                let props = TextProps::default();
                let (w, h) = text_extent(&props);
                let mut text =
                    Element::new(fresh(), ElementKind::Text(props), at.x, at.y, w, h);
                text.fill = Fill::solid("#000000");
                text
            }
        };
        Some(el)
    }

    /// Update a shape being drawn from `start` to `current`.
    pub fn drag(self, el: &Element, start: Point, current: Point, modifiers: Modifiers) -> Element {
        let mut next = el.clone();
        match self {
            ToolKind::Line => {
                let end = if modifiers.shift {
                    snap_angle(start, current)
                } else {
                    current
                };
                next.kind = ElementKind::Line { x2: end.x, y2: end.y };
                next.sync_line_extent();
            }
            ToolKind::Rect | ToolKind::Ellipse | ToolKind::Frame => {
                let b = drawn_box(start, current, modifiers.shift);
                next.x = b.x;
                next.y = b.y;
                next.w = b.width;
                next.h = b.height;
            }
            ToolKind::Select | ToolKind::Hand | ToolKind::Path | ToolKind::Text => {}
        }
        next
    }
}

/// The box spanned by a draw drag, each side at least [`MIN_DRAW_SIZE`].
/// `square` uses the longer side for both.
pub fn drawn_box(start: Point, current: Point, square: bool) -> Bounds {
    let mut dx = current.x - start.x;
    let mut dy = current.y - start.y;
    if square {
        let side = dx.abs().max(dy.abs());
        dx = side.copysign(dx);
        dy = side.copysign(dy);
    }
    Bounds::new(
        start.x.min(start.x + dx),
        start.y.min(start.y + dy),
        dx.abs().max(MIN_DRAW_SIZE),
        dy.abs().max(MIN_DRAW_SIZE),
    )
}

/// `current` rotated about `start` onto the nearest multiple of 45°.
pub fn snap_angle(start: Point, current: Point) -> Point {
    let (dx, dy) = (current.x - start.x, current.y - start.y);
    let len = dx.hypot(dy);
    if len == 0.0 {
        return current;
    }
    let angle = (dy.atan2(dx) / FRAC_PI_4).round() * FRAC_PI_4;
    Point::new(start.x + len * angle.cos(), start.y + len * angle.sin())
}

/// `el` with new text content, resized to fit it. `None` for non-text.
pub fn with_text(el: &Element, content: &str) -> Option<Element> {
    let ElementKind::Text(props) = &el.kind else {
        return None;
    };
    let mut props = props.clone();
    props.content = content.to_string();
    let (w, h) = text_extent(&props);
    let mut next = el.clone();
    next.w = w;
    next.h = h;
    next.kind = ElementKind::Text(props);
    Some(next)
}

/// Approximate box of a text element's content.
pub fn text_extent(props: &TextProps) -> (f64, f64) {
    let content = props.transform.apply(&props.content);
    let lines: Vec<&str> = content.split('\n').collect();
    let widest = lines
        .iter()
        .map(|line| {
            let chars = line.chars().count() as f64;
            chars * props.font_size * APPROX_ADVANCE
                + (chars - 1.0).max(0.0) * props.letter_spacing
        })
        .fold(0.0, f64::max);
    let height = lines.len() as f64 * props.font_size * props.line_height;
    (widest.max(MIN_DRAW_SIZE), height.max(MIN_DRAW_SIZE))
}
