//! The editable document: scene, camera and history.
//!
//! User edits go through [`Document::execute`] so they land on the undo
//! stack. Selection changes and containment maintenance bypass history.

use crate::commands::CommandStack;
use clise_core::{EditError, Element, ElementId, Group, Point, Scene, SceneMutation, Viewport};
use clise_render::hit::expand_selection;
use std::collections::HashMap;

pub struct Document {
    pub scene: Scene,
    pub viewport: Viewport,
    pub history: CommandStack,
}

impl Document {
    pub fn new(viewport: Viewport, undo_depth: usize) -> Self {
        Self {
            scene: Scene::new(),
            viewport,
            history: CommandStack::new(undo_depth),
        }
    }

    /// Canvas-local screen point to scene coordinates.
    pub fn to_scene(&self, screen: Point) -> Point {
        self.viewport.to_scene(screen, Point::ZERO)
    }

    pub fn execute(&mut self, mutation: SceneMutation, description: &str) -> Result<(), EditError> {
        self.history.execute(&mut self.scene, mutation, description)
    }

    /// Replace the selection without recording history. Returns whether it
    /// changed.
    pub fn select(&mut self, ids: Vec<ElementId>) -> bool {
        if ids.as_slice() == self.scene.selection() {
            return false;
        }
        let before = self.scene.selection().to_vec();
        if let Err(err) = self.scene.apply(SceneMutation::Select { ids }) {
            log::warn!("document: selection rejected: {err}");
            return false;
        }
        before.as_slice() != self.scene.selection()
    }

    pub fn undo(&mut self) -> Option<String> {
        self.history.undo(&mut self.scene)
    }

    pub fn redo(&mut self) -> Option<String> {
        self.history.redo(&mut self.scene)
    }

    /// Selected element ids with groups resolved to their members.
    pub fn selected_elements(&self) -> Vec<ElementId> {
        expand_selection(self.scene.selection(), self.scene.groups())
    }

    /// The members of `selection` that may be moved or resized.
    pub fn unlocked(&self, selection: &[ElementId]) -> Vec<ElementId> {
        expand_selection(selection, self.scene.groups())
            .into_iter()
            .filter(|id| self.scene.get(*id).is_some_and(|el| !el.locked))
            .collect()
    }
}

// ─── Clipboard ───────────────────────────────────────────────────────────

/// Elements and groups captured for paste or duplicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clipboard {
    /// Captured records in z-order.
    elements: Vec<Element>,
    groups: Vec<Group>,
    selection: Vec<ElementId>,
}

impl Clipboard {
    /// Copy the selected items (groups included) out of `scene`.
    pub fn capture(scene: &Scene, selection: &[ElementId]) -> Self {
        let ids = expand_selection(selection, scene.groups());
        Self {
            elements: scene
                .elements()
                .iter()
                .filter(|el| ids.contains(&el.id))
                .cloned()
                .collect(),
            groups: scene
                .groups()
                .iter()
                .filter(|g| selection.contains(&g.id))
                .cloned()
                .collect(),
            selection: selection.to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Fresh copies offset by `(dx, dy)`, stacked on top in their captured
    /// order, with captured groups re-created around them. Also returns the
    /// selection naming the copies.
    pub fn instantiate(&self, dx: f64, dy: f64) -> Option<(SceneMutation, Vec<ElementId>)> {
        if self.is_empty() {
            return None;
        }
        let remap: HashMap<ElementId, ElementId> = self
            .elements
            .iter()
            .map(|el| (el.id, ElementId::with_prefix(el.kind.name())))
            .chain(
                self.groups
                    .iter()
                    .map(|g| (g.id, ElementId::with_prefix("group"))),
            )
            .collect();

        let mut steps: Vec<SceneMutation> = Vec::with_capacity(self.elements.len() + 1);
        for el in &self.elements {
            let mut copy = el.clone();
            copy.id = remap[&el.id];
            copy.parent_id = el.parent_id.and_then(|p| remap.get(&p).copied());
            copy.translate(dx, dy);
            steps.push(SceneMutation::Insert {
                element: Box::new(copy),
                index: None,
            });
        }
        for group in &self.groups {
            let members: Vec<ElementId> = group
                .element_ids
                .iter()
                .filter_map(|m| remap.get(m).copied())
                .collect();
            if members.len() >= 2 {
                steps.push(SceneMutation::Group {
                    group: Group::new(remap[&group.id], members),
                });
            }
        }

        let selection: Vec<ElementId> = self
            .selection
            .iter()
            .filter_map(|id| remap.get(id).copied())
            .collect();
        steps.push(SceneMutation::Select {
            ids: selection.clone(),
        });
        Some((SceneMutation::Batch(steps), selection))
    }
}
