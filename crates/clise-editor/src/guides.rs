//! Smart guides shown while dragging.
//!
//! A guide appears when an edge or center line of the moving selection lines
//! up with one of another visible element. Guides are visual only; nothing
//! snaps.

use clise_core::{Bounds, ElementId, Point, Scene, element_bounds};
use clise_render::Guide;

/// Alignment guides between the union box of `moving` and every other
/// visible element. `tolerance` is in scene units.
pub fn smart_guides(scene: &Scene, moving: &[ElementId], tolerance: f64) -> Vec<Guide> {
    let boxes: Vec<Bounds> = moving
        .iter()
        .filter_map(|id| scene.get(*id))
        .map(element_bounds)
        .collect();
    let Some(m) = Bounds::union_all(&boxes) else {
        return Vec::new();
    };
    let mx = [m.x, m.center().x, m.max_x()];
    let my = [m.y, m.center().y, m.max_y()];

    let mut guides: Vec<Guide> = Vec::new();
    let mut push = |guide: Guide| {
        if !guides.contains(&guide) {
            guides.push(guide);
        }
    };
    for el in scene
        .elements()
        .iter()
        .filter(|el| el.visible && !moving.contains(&el.id))
    {
        let b = element_bounds(el);
        for x in [b.x, b.center().x, b.max_x()] {
            if mx.iter().any(|v| (v - x).abs() <= tolerance) {
                push(Guide {
                    from: Point::new(x, m.y.min(b.y)),
                    to: Point::new(x, m.max_y().max(b.max_y())),
                });
            }
        }
        for y in [b.y, b.center().y, b.max_y()] {
            if my.iter().any(|v| (v - y).abs() <= tolerance) {
                push(Guide {
                    from: Point::new(m.x.min(b.x), y),
                    to: Point::new(m.max_x().max(b.max_x()), y),
                });
            }
        }
    }
    guides
}
