//! Hit testing and selection resolution.
//!
//! Point hits walk the element sequence front to back (last drawn is hit
//! first). Box selection takes every visible element whose bounds touch the
//! drag rectangle. Group members are reported as their group.

use clise_core::geometry::{LINE_HIT_TOLERANCE, point_in_element_with_tolerance};
use clise_core::{Bounds, Element, ElementId, Group, Point, element_bounds};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Topmost visible element under scene point `p`.
pub fn hit_test(elements: &[Element], p: Point, zoom: f64) -> Option<ElementId> {
    hit_test_with_tolerance(elements, p, zoom, LINE_HIT_TOLERANCE)
}

pub fn hit_test_with_tolerance(
    elements: &[Element],
    p: Point,
    zoom: f64,
    tolerance: f64,
) -> Option<ElementId> {
    elements
        .iter()
        .rev()
        .filter(|el| el.visible)
        .find(|el| point_in_element_with_tolerance(el, p, zoom, tolerance))
        .map(|el| el.id)
}

/// Every visible element whose bounds overlap `rect`, in z-order.
/// Touching edges count as overlap.
pub fn box_select(elements: &[Element], rect: &Bounds) -> Vec<ElementId> {
    elements
        .iter()
        .filter(|el| el.visible && element_bounds(el).intersects(rect))
        .map(|el| el.id)
        .collect()
}

/// Replace group members with their group id, listing each group once.
pub fn promote_groups(ids: &[ElementId], groups: &[Group]) -> Vec<ElementId> {
    let mut out: Vec<ElementId> = Vec::with_capacity(ids.len());
    for id in ids {
        let resolved = groups
            .iter()
            .find(|g| g.contains(*id))
            .map(|g| g.id)
            .unwrap_or(*id);
        if !out.contains(&resolved) {
            out.push(resolved);
        }
    }
    out
}

/// Resolve group ids in a selection back to member element ids.
pub fn expand_selection(selection: &[ElementId], groups: &[Group]) -> Vec<ElementId> {
    let mut out: Vec<ElementId> = Vec::with_capacity(selection.len());
    for id in selection {
        let members: SmallVec<[ElementId; 4]> = match groups.iter().find(|g| g.id == *id) {
            Some(group) => group.element_ids.clone(),
            None => smallvec::smallvec![*id],
        };
        for m in members {
            if !out.contains(&m) {
                out.push(m);
            }
        }
    }
    out
}

// ─── Click resolution ────────────────────────────────────────────────────

/// How a click combines with the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickMode {
    Replace,
    /// Ctrl/Cmd: add if absent, remove if present.
    Toggle,
    /// Shift: add, never remove.
    Add,
}

impl ClickMode {
    pub fn from_modifiers(shift: bool, ctrl_or_meta: bool) -> Self {
        if ctrl_or_meta {
            ClickMode::Toggle
        } else if shift {
            ClickMode::Add
        } else {
            ClickMode::Replace
        }
    }
}

/// New selection after clicking `hit` (already group-promoted).
pub fn apply_click(selection: &[ElementId], hit: Option<ElementId>, mode: ClickMode) -> Vec<ElementId> {
    let Some(hit) = hit else {
        return match mode {
            ClickMode::Replace => Vec::new(),
            ClickMode::Toggle | ClickMode::Add => selection.to_vec(),
        };
    };
    match mode {
        ClickMode::Replace => vec![hit],
        ClickMode::Toggle => {
            if selection.contains(&hit) {
                selection.iter().copied().filter(|id| *id != hit).collect()
            } else {
                let mut out = selection.to_vec();
                out.push(hit);
                out
            }
        }
        // Shift on an empty selection is a plain click.
        ClickMode::Add if selection.is_empty() => vec![hit],
        ClickMode::Add => {
            let mut out = selection.to_vec();
            if !out.contains(&hit) {
                out.push(hit);
            }
            out
        }
    }
}

// ─── Resize handles ──────────────────────────────────────────────────────

/// The 8 resize handles, clockwise from top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Handle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl Handle {
    pub const ALL: [Handle; 8] = [
        Handle::TopLeft,
        Handle::Top,
        Handle::TopRight,
        Handle::Right,
        Handle::BottomRight,
        Handle::Bottom,
        Handle::BottomLeft,
        Handle::Left,
    ];

    /// Position on `b` in unit coordinates.
    pub fn anchor(self) -> (f64, f64) {
        match self {
            Handle::TopLeft => (0.0, 0.0),
            Handle::Top => (0.5, 0.0),
            Handle::TopRight => (1.0, 0.0),
            Handle::Right => (1.0, 0.5),
            Handle::BottomRight => (1.0, 1.0),
            Handle::Bottom => (0.5, 1.0),
            Handle::BottomLeft => (0.0, 1.0),
            Handle::Left => (0.0, 0.5),
        }
    }

    pub fn position(self, b: &Bounds) -> Point {
        let (u, v) = self.anchor();
        Point::new(b.x + b.width * u, b.y + b.height * v)
    }

    pub fn is_corner(self) -> bool {
        matches!(
            self,
            Handle::TopLeft | Handle::TopRight | Handle::BottomRight | Handle::BottomLeft
        )
    }

    /// Dragging this handle moves the left edge.
    pub fn moves_left(self) -> bool {
        matches!(self, Handle::TopLeft | Handle::Left | Handle::BottomLeft)
    }

    pub fn moves_top(self) -> bool {
        matches!(self, Handle::TopLeft | Handle::Top | Handle::TopRight)
    }

    pub fn affects_width(self) -> bool {
        !matches!(self, Handle::Top | Handle::Bottom)
    }

    pub fn affects_height(self) -> bool {
        !matches!(self, Handle::Left | Handle::Right)
    }
}

/// Square hit area of a handle, `size` screen pixels across.
pub fn handle_rect(handle: Handle, b: &Bounds, size: f64, zoom: f64) -> Bounds {
    let zoom = if zoom > 0.0 { zoom } else { 1.0 };
    let half = size / zoom / 2.0;
    let p = handle.position(b);
    Bounds::new(p.x - half, p.y - half, half * 2.0, half * 2.0)
}

/// The handle of `b` under scene point `p`, corners first.
pub fn hit_handle(b: &Bounds, p: Point, size: f64, zoom: f64) -> Option<Handle> {
    let (corners, edges): (Vec<Handle>, Vec<Handle>) =
        Handle::ALL.iter().copied().partition(|h| h.is_corner());
    corners
        .into_iter()
        .chain(edges)
        .find(|h| handle_rect(*h, b, size, zoom).contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> ElementId {
        ElementId::intern(s)
    }

    fn stack() -> Vec<Element> {
        vec![
            Element::rect("hit_a", 0.0, 0.0, 100.0, 100.0),
            Element::rect("hit_b", 50.0, 50.0, 100.0, 100.0),
        ]
    }

    #[test]
    fn topmost_element_wins() {
        assert_eq!(hit_test(&stack(), Point::new(75.0, 75.0), 1.0), Some(id("hit_b")));
        assert_eq!(hit_test(&stack(), Point::new(10.0, 10.0), 1.0), Some(id("hit_a")));
        assert_eq!(hit_test(&stack(), Point::new(500.0, 500.0), 1.0), None);
    }

    #[test]
    fn invisible_elements_are_skipped() {
        let mut els = stack();
        els[1].visible = false;
        assert_eq!(hit_test(&els, Point::new(75.0, 75.0), 1.0), Some(id("hit_a")));
    }

    #[test]
    fn box_select_counts_touching_edges() {
        let els = stack();
        let touching = Bounds::new(150.0, 150.0, 10.0, 10.0);
        assert_eq!(box_select(&els, &touching), vec![id("hit_b")]);
    }

    #[test]
    fn group_members_promote_once() {
        let groups = vec![Group::new(id("hit_g"), [id("hit_a"), id("hit_b")])];
        let promoted = promote_groups(&[id("hit_a"), id("hit_b"), id("hit_c")], &groups);
        assert_eq!(promoted, vec![id("hit_g"), id("hit_c")]);
        assert_eq!(
            expand_selection(&promoted, &groups),
            vec![id("hit_a"), id("hit_b"), id("hit_c")]
        );
    }

    #[test]
    fn click_modes() {
        let sel = vec![id("hit_a")];
        assert_eq!(apply_click(&sel, Some(id("hit_b")), ClickMode::Replace), vec![id("hit_b")]);
        assert_eq!(apply_click(&sel, Some(id("hit_a")), ClickMode::Toggle), Vec::<ElementId>::new());
        assert_eq!(
            apply_click(&sel, Some(id("hit_b")), ClickMode::Toggle),
            vec![id("hit_a"), id("hit_b")]
        );
        assert_eq!(apply_click(&sel, Some(id("hit_a")), ClickMode::Add), vec![id("hit_a")]);
        assert_eq!(apply_click(&sel, None, ClickMode::Replace), Vec::<ElementId>::new());
        assert_eq!(apply_click(&sel, None, ClickMode::Add), sel);
    }

    #[test]
    fn handles_scale_with_zoom() {
        let b = Bounds::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(hit_handle(&b, Point::new(103.0, 103.0), 8.0, 1.0), Some(Handle::BottomRight));
        assert_eq!(hit_handle(&b, Point::new(103.0, 103.0), 8.0, 4.0), None);
        assert_eq!(hit_handle(&b, Point::new(50.0, 0.0), 8.0, 1.0), Some(Handle::Top));
    }
}
