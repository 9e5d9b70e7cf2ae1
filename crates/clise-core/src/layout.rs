//! Frame containment and auto layout.
//!
//! Parent links are derived bottom-up from geometry: an element's parent is
//! the innermost frame whose bounds contain it. Frames are ranked by
//! `(area, z position)`; a frame may only contain elements ranked strictly
//! below it, so parent links can never form a cycle.

use crate::geometry::{Bounds, element_bounds};
use crate::id::ElementId;
use crate::model::{ElementKind, FrameLayout, LayoutAlign, LayoutDirection};
use crate::scene::{Scene, SceneMutation};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Rank used to order frames: bigger area first, then lower z.
fn outranks(a: (f64, usize), b: (f64, usize)) -> bool {
    match a.0.partial_cmp(&b.0) {
        Some(Ordering::Greater) => true,
        Some(Ordering::Equal) => a.1 < b.1,
        _ => false,
    }
}

/// Recompute every `parent_id` from containment. Returns how many links
/// changed; the scene version is bumped when any did.
pub fn recompute_parents(scene: &mut Scene) -> usize {
    let frames: Vec<(ElementId, Bounds, usize)> = scene
        .elements()
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_frame() && e.is_spatially_valid())
        .map(|(i, e)| (e.id, element_bounds(e), i))
        .collect();

    let parents: Vec<Option<ElementId>> = scene
        .elements()
        .iter()
        .enumerate()
        .map(|(i, el)| {
            if !el.is_spatially_valid() {
                return None;
            }
            let bounds = element_bounds(el);
            let rank = (bounds.area(), i);
            frames
                .iter()
                .filter(|(id, fb, fi)| {
                    *id != el.id && outranks((fb.area(), *fi), rank) && fb.contains_bounds(&bounds)
                })
                // Innermost: the lowest-ranked frame that still contains us.
                .min_by(|a, b| {
                    if outranks((a.1.area(), a.2), (b.1.area(), b.2)) {
                        Ordering::Greater
                    } else {
                        Ordering::Less
                    }
                })
                .map(|(id, _, _)| *id)
        })
        .collect();

    let mut changed = 0;
    for (el, parent) in scene.elements_mut().iter_mut().zip(parents) {
        if el.parent_id != parent {
            el.parent_id = parent;
            changed += 1;
        }
    }
    if changed > 0 {
        log::debug!("containment: {changed} parent links updated");
        scene.bump_version();
    }
    changed
}

/// All elements nested under `frame`, at any depth.
pub fn descendants(scene: &Scene, frame: ElementId) -> Vec<ElementId> {
    let mut children: HashMap<ElementId, Vec<ElementId>> = HashMap::new();
    for el in scene.elements() {
        if let Some(parent) = el.parent_id {
            children.entry(parent).or_default().push(el.id);
        }
    }

    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![frame];
    while let Some(current) = stack.pop() {
        for &child in children.get(&current).map(Vec::as_slice).unwrap_or_default() {
            if seen.insert(child) {
                out.push(child);
                stack.push(child);
            }
        }
    }
    out
}

/// Moves that place a frame's direct children according to its layout.
/// `None` when the frame has no active layout or nothing would move.
pub fn layout_frame(scene: &Scene, frame_id: ElementId) -> Option<SceneMutation> {
    let frame = scene.get(frame_id)?;
    let ElementKind::Frame { layout, .. } = &frame.kind else {
        return None;
    };
    if layout.direction == LayoutDirection::None {
        return None;
    }
    let frame_box = element_bounds(frame);
    let children: Vec<_> = scene.children_of(frame_id).collect();

    let mut moves = Vec::new();
    let mut cursor = 0.0;
    for child in children {
        let b = element_bounds(child);
        let (tx, ty) = slot(layout, &frame_box, &b, cursor);
        cursor += match layout.direction {
            LayoutDirection::Row => b.width + layout.gap,
            _ => b.height + layout.gap,
        };

        let (dx, dy) = (tx - b.x, ty - b.y);
        if dx.abs() < f64::EPSILON && dy.abs() < f64::EPSILON {
            continue;
        }
        let mut ids = vec![child.id];
        if child.is_frame() {
            ids.extend(descendants(scene, child.id));
        }
        moves.push(SceneMutation::Move { ids, dx, dy });
    }

    (!moves.is_empty()).then_some(SceneMutation::Batch(moves))
}

/// Target top-left corner for a child at `cursor` along the main axis.
fn slot(layout: &FrameLayout, frame: &Bounds, child: &Bounds, cursor: f64) -> (f64, f64) {
    let pad = layout.padding;
    let cross = |start: f64, extent: f64, size: f64| match layout.align {
        LayoutAlign::Start => start + pad,
        LayoutAlign::Center => start + (extent - size) / 2.0,
        LayoutAlign::End => start + extent - pad - size,
    };
    match layout.direction {
        LayoutDirection::Row => (
            frame.x + pad + cursor,
            cross(frame.y, frame.height, child.height),
        ),
        _ => (
            cross(frame.x, frame.width, child.width),
            frame.y + pad + cursor,
        ),
    }
}

/// Layout moves for every frame with an active layout, outermost first.
pub fn layout_all(scene: &Scene) -> Option<SceneMutation> {
    let mut staged = scene.clone();
    let mut steps = Vec::new();

    let mut frames: Vec<(ElementId, f64)> = scene
        .elements()
        .iter()
        .filter(|e| e.is_frame())
        .map(|e| (e.id, element_bounds(e).area()))
        .collect();
    frames.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    for (id, _) in frames {
        if let Some(step) = layout_frame(&staged, id)
            && staged.apply(step.clone()).is_ok()
        {
            steps.push(step);
        }
    }
    (!steps.is_empty()).then_some(SceneMutation::Batch(steps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Element;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> ElementId {
        ElementId::intern(s)
    }

    #[test]
    fn innermost_frame_wins() {
        let mut scene = Scene::from_parts(
            vec![
                Element::frame("lay_outer", 0.0, 0.0, 500.0, 500.0),
                Element::frame("lay_inner", 50.0, 50.0, 200.0, 200.0),
                Element::rect("lay_leaf", 60.0, 60.0, 20.0, 20.0),
                Element::rect("lay_free", 600.0, 600.0, 20.0, 20.0),
            ],
            vec![],
            vec![],
        )
        .unwrap();

        assert_eq!(recompute_parents(&mut scene), 2);
        assert_eq!(scene.get(id("lay_inner")).unwrap().parent_id, Some(id("lay_outer")));
        assert_eq!(scene.get(id("lay_leaf")).unwrap().parent_id, Some(id("lay_inner")));
        assert_eq!(scene.get(id("lay_free")).unwrap().parent_id, None);
        assert!(scene.integrity_issues().is_empty());

        // Nothing moved: a second pass changes nothing.
        assert_eq!(recompute_parents(&mut scene), 0);
    }

    #[test]
    fn identical_frames_never_cycle() {
        let mut scene = Scene::from_parts(
            vec![
                Element::frame("lay_twin_a", 0.0, 0.0, 100.0, 100.0),
                Element::frame("lay_twin_b", 0.0, 0.0, 100.0, 100.0),
            ],
            vec![],
            vec![],
        )
        .unwrap();
        recompute_parents(&mut scene);
        assert_eq!(scene.get(id("lay_twin_a")).unwrap().parent_id, None);
        assert_eq!(scene.get(id("lay_twin_b")).unwrap().parent_id, Some(id("lay_twin_a")));
        assert!(scene.integrity_issues().is_empty());
    }

    #[test]
    fn column_layout_stacks_children() {
        let mut frame = Element::frame("lay_col", 0.0, 0.0, 300.0, 400.0);
        frame.kind = ElementKind::Frame {
            clip_content: true,
            layout: FrameLayout {
                direction: LayoutDirection::Column,
                gap: 10.0,
                padding: 20.0,
                align: LayoutAlign::Start,
            },
        };
        let mut scene = Scene::from_parts(
            vec![
                frame,
                Element::rect("lay_c1", 100.0, 100.0, 100.0, 40.0),
                Element::rect("lay_c2", 50.0, 250.0, 100.0, 30.0),
            ],
            vec![],
            vec![],
        )
        .unwrap();
        recompute_parents(&mut scene);

        let step = layout_frame(&scene, id("lay_col")).unwrap();
        scene.apply(step).unwrap();

        let c1 = scene.get(id("lay_c1")).unwrap();
        let c2 = scene.get(id("lay_c2")).unwrap();
        assert_eq!((c1.x, c1.y), (20.0, 20.0));
        assert_eq!((c2.x, c2.y), (20.0, 70.0));

        // Already laid out.
        assert!(layout_frame(&scene, id("lay_col")).is_none());
    }

    #[test]
    fn descendants_walks_nested_frames() {
        let mut scene = Scene::from_parts(
            vec![
                Element::frame("lay_d_outer", 0.0, 0.0, 500.0, 500.0),
                Element::frame("lay_d_inner", 10.0, 10.0, 100.0, 100.0),
                Element::rect("lay_d_leaf", 20.0, 20.0, 10.0, 10.0),
            ],
            vec![],
            vec![],
        )
        .unwrap();
        recompute_parents(&mut scene);
        let mut found = descendants(&scene, id("lay_d_outer"));
        found.sort_by_key(|i| i.as_str().to_string());
        assert_eq!(found, vec![id("lay_d_inner"), id("lay_d_leaf")]);
    }
}
