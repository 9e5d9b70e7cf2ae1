//! The scene: ordered elements, groups and the current selection.
//!
//! The element sequence *is* the z-order: later entries draw on top and are
//! hit first. Every change goes through [`Scene::apply`] with a
//! [`SceneMutation`]; a mutation either applies completely or returns an
//! [`EditError`] and leaves the scene untouched.

use crate::error::{EditError, Result};
use crate::id::ElementId;
use crate::model::{Element, Group};
use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Z-order operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReorderOp {
    BringToFront,
    SendToBack,
    BringForward,
    SendBackward,
}

/// An atomic scene operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneMutation {
    /// Add an element at `index` (top of the stack when `None`).
    Insert {
        element: Box<Element>,
        index: Option<usize>,
    },
    /// Delete elements. Prunes them from groups and the selection; groups
    /// left with fewer than 2 members are dissolved.
    Remove { ids: Vec<ElementId> },
    /// Replace an element's record, keeping its z position.
    Update { element: Box<Element> },
    Move {
        ids: Vec<ElementId>,
        dx: f64,
        dy: f64,
    },
    Reorder { ids: Vec<ElementId>, op: ReorderOp },
    /// Set the complete element order. Must be a permutation of the
    /// current ids.
    SetOrder { order: Vec<ElementId> },
    /// Create or replace a group. Members leave any other group.
    Group { group: Group },
    /// Dissolve a group; member geometry is untouched.
    Ungroup { id: ElementId },
    /// Replace the selection. Unknown ids are dropped.
    Select { ids: Vec<ElementId> },
    /// Several mutations applied as one.
    Batch(Vec<SceneMutation>),
}

impl SceneMutation {
    /// Pure form for history replay: the scene after this mutation.
    pub fn run(&self, scene: &Scene) -> Result<Scene> {
        scene.run(self.clone())
    }

    pub fn name(&self) -> &'static str {
        mutation_name(self)
    }
}

/// A broken scene invariant, reported by [`Scene::integrity_issues`].
#[derive(Debug, Clone, PartialEq)]
pub enum IntegrityIssue {
    DanglingParent { id: ElementId, parent: ElementId },
    ParentNotFrame { id: ElementId, parent: ElementId },
    ParentCycle,
    GroupTooSmall(ElementId),
    GroupMissingMember { group: ElementId, member: ElementId },
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    elements: Vec<Element>,
    index: HashMap<ElementId, usize>,
    groups: Vec<Group>,
    selection: Vec<ElementId>,
    version: u64,
}

impl PartialEq for Scene {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
            && self.groups == other.groups
            && self.selection == other.selection
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scene from loaded parts. Duplicate ids are rejected;
    /// invalid groups and unknown selection entries are dropped.
    pub fn from_parts(
        elements: Vec<Element>,
        groups: Vec<Group>,
        selection: Vec<ElementId>,
    ) -> Result<Self> {
        let mut scene = Scene::new();
        for el in elements {
            if scene.index.contains_key(&el.id) {
                return Err(EditError::DuplicateId(el.id));
            }
            scene.index.insert(el.id, scene.elements.len());
            scene.elements.push(el);
        }
        for group in groups {
            if let Err(err) = scene.put_group(group) {
                log::warn!("dropping group on load: {err}");
            }
        }
        scene.selection = selection
            .into_iter()
            .filter(|id| scene.contains(*id) || scene.group(*id).is_some())
            .collect();
        scene.sanitize_parents();
        Ok(scene)
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// Elements in z-order, bottom first.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.index.get(&id).map(|&i| &self.elements[i])
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.index.contains_key(&id)
    }

    /// Z position of an element.
    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn order(&self) -> Vec<ElementId> {
        self.elements.iter().map(|e| e.id).collect()
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, id: ElementId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// The group an element belongs to, if any.
    pub fn group_of(&self, element: ElementId) -> Option<&Group> {
        self.groups.iter().find(|g| g.contains(element))
    }

    /// Selected ids; may contain group ids.
    pub fn selection(&self) -> &[ElementId] {
        &self.selection
    }

    /// Bumped by every successful mutation and by derived-state refreshes.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Children of a frame, in z-order.
    pub fn children_of(&self, frame: ElementId) -> impl Iterator<Item = &Element> {
        self.elements
            .iter()
            .filter(move |e| e.parent_id == Some(frame))
    }

    pub(crate) fn elements_mut(&mut self) -> &mut [Element] {
        &mut self.elements
    }

    pub(crate) fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    // ─── Mutation ────────────────────────────────────────────────────────

    /// Apply a mutation in place. On error the scene is unchanged.
    pub fn apply(&mut self, mutation: SceneMutation) -> Result<()> {
        match mutation {
            SceneMutation::Batch(steps) => {
                // Stage on a copy so a failing step can't leave a partial edit.
                let mut staged = self.clone();
                for step in steps {
                    staged.apply_one(step)?;
                }
                *self = staged;
            }
            other => self.apply_one(other)?,
        }
        self.sanitize_parents();
        self.bump_version();
        Ok(())
    }

    /// Pure form of [`Scene::apply`]: returns the next scene.
    pub fn run(&self, mutation: SceneMutation) -> Result<Scene> {
        let mut next = self.clone();
        next.apply(mutation)?;
        Ok(next)
    }

    /// Take over another scene's content. The version keeps counting up,
    /// so caches keyed on it never see an old number again.
    pub fn replace_with(&mut self, other: Scene) {
        let version = self.version.max(other.version);
        *self = other;
        self.version = version;
        self.bump_version();
    }

    fn apply_one(&mut self, mutation: SceneMutation) -> Result<()> {
        log::debug!("scene: {}", mutation_name(&mutation));
        match mutation {
            SceneMutation::Insert { element, index } => self.insert(*element, index),
            SceneMutation::Remove { ids } => self.remove(&ids),
            SceneMutation::Update { element } => {
                let &i = self
                    .index
                    .get(&element.id)
                    .ok_or(EditError::UnknownElement(element.id))?;
                self.elements[i] = *element;
                Ok(())
            }
            SceneMutation::Move { ids, dx, dy } => {
                let mut slots = self.resolve_all(&ids)?;
                slots.sort_unstable();
                slots.dedup();
                for i in slots {
                    self.elements[i].translate(dx, dy);
                }
                Ok(())
            }
            SceneMutation::Reorder { ids, op } => {
                self.resolve_all(&ids)?;
                let order = reordered(&self.order(), &ids, op);
                self.set_order(&order)
            }
            SceneMutation::SetOrder { order } => self.set_order(&order),
            SceneMutation::Group { group } => self.put_group(group),
            SceneMutation::Ungroup { id } => {
                let pos = self
                    .groups
                    .iter()
                    .position(|g| g.id == id)
                    .ok_or(EditError::NotAGroup(id))?;
                self.groups.remove(pos);
                self.selection.retain(|s| *s != id);
                Ok(())
            }
            SceneMutation::Select { ids } => {
                let mut seen = HashSet::new();
                self.selection = ids
                    .into_iter()
                    .filter(|id| self.contains(*id) || self.group(*id).is_some())
                    .filter(|id| seen.insert(*id))
                    .collect();
                Ok(())
            }
            SceneMutation::Batch(steps) => {
                for step in steps {
                    self.apply_one(step)?;
                }
                Ok(())
            }
        }
    }

    fn resolve_all(&self, ids: &[ElementId]) -> Result<Vec<usize>> {
        ids.iter()
            .map(|id| self.index_of(*id).ok_or(EditError::UnknownElement(*id)))
            .collect()
    }

    fn insert(&mut self, element: Element, index: Option<usize>) -> Result<()> {
        if self.index.contains_key(&element.id) || self.group(element.id).is_some() {
            return Err(EditError::DuplicateId(element.id));
        }
        let at = index.unwrap_or(self.elements.len()).min(self.elements.len());
        self.elements.insert(at, element);
        self.reindex();
        Ok(())
    }

    fn remove(&mut self, ids: &[ElementId]) -> Result<()> {
        self.resolve_all(ids)?;
        let doomed: HashSet<ElementId> = ids.iter().copied().collect();
        self.elements.retain(|e| !doomed.contains(&e.id));
        self.reindex();

        for group in &mut self.groups {
            group.element_ids.retain(|m| !doomed.contains(m));
        }
        let dissolved: Vec<ElementId> = self
            .groups
            .iter()
            .filter(|g| g.element_ids.len() < 2)
            .map(|g| g.id)
            .collect();
        self.groups.retain(|g| g.element_ids.len() >= 2);
        self.selection
            .retain(|s| !doomed.contains(s) && !dissolved.contains(s));
        Ok(())
    }

    fn set_order(&mut self, order: &[ElementId]) -> Result<()> {
        if order.len() != self.elements.len() {
            return Err(EditError::InvalidOrder);
        }
        let mut slots = Vec::with_capacity(order.len());
        let mut seen = HashSet::with_capacity(order.len());
        for id in order {
            let i = self.index_of(*id).ok_or(EditError::UnknownElement(*id))?;
            if !seen.insert(*id) {
                return Err(EditError::DuplicateId(*id));
            }
            slots.push(i);
        }
        let mut old: Vec<Option<Element>> = std::mem::take(&mut self.elements)
            .into_iter()
            .map(Some)
            .collect();
        self.elements = slots.into_iter().filter_map(|i| old[i].take()).collect();
        self.reindex();
        Ok(())
    }

    fn put_group(&mut self, group: Group) -> Result<()> {
        let mut members: Vec<ElementId> = Vec::with_capacity(group.element_ids.len());
        for id in &group.element_ids {
            if !self.contains(*id) {
                return Err(EditError::UnknownElement(*id));
            }
            if !members.contains(id) {
                members.push(*id);
            }
        }
        if members.len() < 2 {
            return Err(EditError::GroupTooSmall(members.len()));
        }
        if self.contains(group.id) {
            return Err(EditError::DuplicateId(group.id));
        }

        // An element belongs to at most one group.
        for other in self.groups.iter_mut().filter(|g| g.id != group.id) {
            other.element_ids.retain(|m| !members.contains(m));
        }
        self.groups
            .retain(|g| g.id == group.id || g.element_ids.len() >= 2);

        let group = Group {
            element_ids: members.into_iter().collect(),
            ..group
        };
        match self.groups.iter_mut().find(|g| g.id == group.id) {
            Some(slot) => *slot = group,
            None => self.groups.push(group),
        }
        Ok(())
    }

    fn reindex(&mut self) {
        self.index = self
            .elements
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id, i))
            .collect();
    }

    /// Clear parent links that no longer point at an existing frame.
    fn sanitize_parents(&mut self) {
        let frames: HashSet<ElementId> = self
            .elements
            .iter()
            .filter(|e| e.is_frame())
            .map(|e| e.id)
            .collect();
        for el in &mut self.elements {
            if let Some(parent) = el.parent_id
                && (!frames.contains(&parent) || parent == el.id)
            {
                el.parent_id = None;
            }
        }
    }

    // ─── Integrity ───────────────────────────────────────────────────────

    /// Every broken invariant in the scene. Empty for a consistent scene.
    pub fn integrity_issues(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();
        let mut parents: DiGraphMap<ElementId, ()> = DiGraphMap::new();

        for el in &self.elements {
            let Some(parent) = el.parent_id else { continue };
            match self.get(parent) {
                None => issues.push(IntegrityIssue::DanglingParent { id: el.id, parent }),
                Some(p) if !p.is_frame() => {
                    issues.push(IntegrityIssue::ParentNotFrame { id: el.id, parent })
                }
                Some(_) => {
                    parents.add_edge(el.id, parent, ());
                }
            }
        }
        if is_cyclic_directed(&parents) {
            issues.push(IntegrityIssue::ParentCycle);
        }

        for group in &self.groups {
            if group.element_ids.len() < 2 {
                issues.push(IntegrityIssue::GroupTooSmall(group.id));
            }
            for member in &group.element_ids {
                if !self.contains(*member) {
                    issues.push(IntegrityIssue::GroupMissingMember {
                        group: group.id,
                        member: *member,
                    });
                }
            }
        }
        issues
    }
}

/// New order after applying a reorder op to `targets`.
pub fn reordered(order: &[ElementId], targets: &[ElementId], op: ReorderOp) -> Vec<ElementId> {
    let picked: HashSet<ElementId> = targets.iter().copied().collect();
    match op {
        ReorderOp::BringToFront => {
            let (moving, mut rest): (Vec<_>, Vec<_>) =
                order.iter().copied().partition(|id| picked.contains(id));
            rest.extend(moving);
            rest
        }
        ReorderOp::SendToBack => {
            let (mut moving, rest): (Vec<_>, Vec<_>) =
                order.iter().copied().partition(|id| picked.contains(id));
            moving.extend(rest);
            moving
        }
        ReorderOp::BringForward => {
            let mut out = order.to_vec();
            // Walk top-down so a run of selected ids moves together.
            for i in (0..out.len().saturating_sub(1)).rev() {
                if picked.contains(&out[i]) && !picked.contains(&out[i + 1]) {
                    out.swap(i, i + 1);
                }
            }
            out
        }
        ReorderOp::SendBackward => {
            let mut out = order.to_vec();
            for i in 1..out.len() {
                if picked.contains(&out[i]) && !picked.contains(&out[i - 1]) {
                    out.swap(i, i - 1);
                }
            }
            out
        }
    }
}

fn mutation_name(m: &SceneMutation) -> &'static str {
    match m {
        SceneMutation::Insert { .. } => "insert",
        SceneMutation::Remove { .. } => "remove",
        SceneMutation::Update { .. } => "update",
        SceneMutation::Move { .. } => "move",
        SceneMutation::Reorder { .. } => "reorder",
        SceneMutation::SetOrder { .. } => "set-order",
        SceneMutation::Group { .. } => "group",
        SceneMutation::Ungroup { .. } => "ungroup",
        SceneMutation::Select { .. } => "select",
        SceneMutation::Batch(_) => "batch",
    }
}
