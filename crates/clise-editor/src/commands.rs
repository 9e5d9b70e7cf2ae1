//! Undo/Redo command stack.
//!
//! Every scene edit is recorded as a reversible `Command`. Single edits store
//! the forward mutation plus an inverse computed from the pre-edit scene, so
//! undo is a pure function of recorded data.
//!
//! Pointer gestures use **scene-snapshot batching**: the scene is captured at
//! the start and end of the gesture, and undo/redo replays the difference
//! between the two captures in a single step no matter how many intermediate
//! moves were applied. Only the elements, groups and z slots the gesture
//! touched are rewritten, so edits made outside history in the meantime
//! (generated content, containment passes) survive.

use clise_core::{EditError, Element, ElementId, Scene, SceneMutation};
use std::collections::HashSet;

/// A command that captures both a forward mutation and its inverse.
#[derive(Debug, Clone)]
pub enum Command {
    Single {
        forward: Box<SceneMutation>,
        inverse: Box<SceneMutation>,
        description: String,
    },
    /// Captured scene before and after a gesture.
    Snapshot {
        before: Box<Scene>,
        after: Box<Scene>,
        description: String,
    },
}

impl Command {
    pub fn description(&self) -> &str {
        match self {
            Command::Single { description, .. } | Command::Snapshot { description, .. } => {
                description.as_str()
            }
        }
    }
}

/// Manages undo/redo stacks with batch grouping for gestures.
#[derive(Debug)]
pub struct CommandStack {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    max_depth: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    /// Scene captured at the start of the outermost batch.
    batch_snapshot: Option<Box<Scene>>,
    batch_description: String,
    /// Whether any mutation was applied during the current batch.
    batch_dirty: bool,
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new(200)
    }
}

impl CommandStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth.min(256)),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
            batch_depth: 0,
            batch_snapshot: None,
            batch_description: String::new(),
            batch_dirty: false,
        }
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth.max(1);
        self.trim();
    }

    /// Start a batch group. All mutations until the matching `end_batch()`
    /// are applied live and recorded as one undo step.
    pub fn begin_batch(&mut self, scene: &Scene, description: &str) {
        if self.batch_depth == 0 {
            self.batch_snapshot = Some(Box::new(scene.clone()));
            self.batch_description = description.to_string();
            self.batch_dirty = false;
        }
        self.batch_depth += 1;
    }

    /// End a batch group. When the outermost batch closes and the scene
    /// actually changed, one snapshot command is pushed. Returns whether it
    /// was.
    pub fn end_batch(&mut self, scene: &Scene) -> bool {
        if self.batch_depth == 0 {
            return false;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return false;
        }

        let before = self.batch_snapshot.take();
        let dirty = std::mem::take(&mut self.batch_dirty);
        let description = std::mem::take(&mut self.batch_description);
        match before {
            Some(before) if dirty && *before != *scene => {
                log::debug!("commands: {description}");
                self.push(Command::Snapshot {
                    before,
                    after: Box::new(scene.clone()),
                    description,
                });
                true
            }
            _ => false,
        }
    }

    /// Abandon the open batch and put the scene back the way it started.
    pub fn cancel_batch(&mut self, scene: &mut Scene) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth = 0;
        self.batch_dirty = false;
        self.batch_description.clear();
        if let Some(before) = self.batch_snapshot.take() {
            let current = scene.clone();
            restore(scene, &current, &before);
        }
    }

    pub fn in_batch(&self) -> bool {
        self.batch_depth > 0
    }

    /// Apply a mutation to the scene and record it. A rejected mutation
    /// leaves both the scene and the history untouched.
    pub fn execute(
        &mut self,
        scene: &mut Scene,
        mutation: SceneMutation,
        description: &str,
    ) -> Result<(), EditError> {
        if self.batch_depth > 0 {
            // The snapshot at end_batch() captures the cumulative effect.
            scene.apply(mutation)?;
            self.batch_dirty = true;
            return Ok(());
        }

        let inverse = compute_inverse(scene, &mutation);
        scene.apply(mutation.clone())?;
        log::debug!("commands: {description}");
        self.push(Command::Single {
            forward: Box::new(mutation),
            inverse: Box::new(inverse),
            description: description.to_string(),
        });
        Ok(())
    }

    fn push(&mut self, cmd: Command) {
        self.undo_stack.push(cmd);
        self.trim();
        // Clear redo stack on new action
        self.redo_stack.clear();
    }

    fn trim(&mut self) {
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
    }

    /// Undo the last command. Returns its description.
    pub fn undo(&mut self, scene: &mut Scene) -> Option<String> {
        if self.in_batch() {
            return None;
        }
        let cmd = self.undo_stack.pop()?;
        match &cmd {
            Command::Single { inverse, .. } => {
                if let Err(err) = scene.apply(*inverse.clone()) {
                    log::warn!("commands: undo of {:?} failed: {err}", cmd.description());
                    return None;
                }
            }
            Command::Snapshot { before, after, .. } => restore(scene, after, before),
        }
        let desc = cmd.description().to_string();
        self.redo_stack.push(cmd);
        Some(desc)
    }

    /// Redo the last undone command. Returns its description.
    pub fn redo(&mut self, scene: &mut Scene) -> Option<String> {
        if self.in_batch() {
            return None;
        }
        let cmd = self.redo_stack.pop()?;
        match &cmd {
            Command::Single { forward, .. } => {
                if let Err(err) = scene.apply(*forward.clone()) {
                    log::warn!("commands: redo of {:?} failed: {err}", cmd.description());
                    return None;
                }
            }
            Command::Snapshot { before, after, .. } => restore(scene, before, after),
        }
        let desc = cmd.description().to_string();
        self.undo_stack.push(cmd);
        Some(desc)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch_depth = 0;
        self.batch_snapshot = None;
        self.batch_dirty = false;
    }
}

/// Compute the mutation that undoes `mutation` when applied to the scene
/// `mutation` produces from `scene`.
pub fn compute_inverse(scene: &Scene, mutation: &SceneMutation) -> SceneMutation {
    match mutation {
        SceneMutation::Insert { element, .. } => SceneMutation::Remove {
            ids: vec![element.id],
        },
        SceneMutation::Remove { ids } => restore_removed(scene, ids),
        SceneMutation::Update { element } => match scene.get(element.id) {
            Some(old) => SceneMutation::Update {
                element: Box::new(old.clone()),
            },
            None => SceneMutation::Batch(Vec::new()),
        },
        SceneMutation::Move { ids, dx, dy } => SceneMutation::Move {
            ids: ids.clone(),
            dx: -dx,
            dy: -dy,
        },
        SceneMutation::Reorder { .. } | SceneMutation::SetOrder { .. } => {
            SceneMutation::SetOrder {
                order: scene.order(),
            }
        }
        // Grouping may shrink or dissolve other groups, so restore them all.
        SceneMutation::Group { group } => {
            let mut steps = Vec::new();
            if scene.group(group.id).is_none() {
                steps.push(SceneMutation::Ungroup { id: group.id });
            }
            steps.extend(
                scene
                    .groups()
                    .iter()
                    .filter(|g| g.id == group.id || g.element_ids.iter().any(|m| group.contains(*m)))
                    .map(|g| SceneMutation::Group { group: g.clone() }),
            );
            steps.push(SceneMutation::Select {
                ids: scene.selection().to_vec(),
            });
            SceneMutation::Batch(steps)
        }
        SceneMutation::Ungroup { id } => match scene.group(*id) {
            Some(group) => SceneMutation::Batch(vec![
                SceneMutation::Group {
                    group: group.clone(),
                },
                SceneMutation::Select {
                    ids: scene.selection().to_vec(),
                },
            ]),
            None => SceneMutation::Batch(Vec::new()),
        },
        SceneMutation::Select { .. } => SceneMutation::Select {
            ids: scene.selection().to_vec(),
        },
        // Walk the steps on a scratch copy so each inverse sees the scene
        // its step ran against, then undo them in reverse.
        SceneMutation::Batch(steps) => {
            let mut staged = scene.clone();
            let mut inverses = Vec::with_capacity(steps.len());
            for step in steps {
                inverses.push(compute_inverse(&staged, step));
                if staged.apply(step.clone()).is_err() {
                    break;
                }
            }
            inverses.reverse();
            SceneMutation::Batch(inverses)
        }
    }
}

// ─── Gesture replay ──────────────────────────────────────────────────────

/// Rewrite `scene` so everything that differs between `from` and `to` looks
/// like `to`. Elements and groups equal in both captures are left alone.
fn restore(scene: &mut Scene, from: &Scene, to: &Scene) {
    let delta = scene_delta(scene, from, to);
    if let Err(err) = scene.apply(delta) {
        log::warn!("commands: gesture replay rejected: {err}");
    }
}

/// The mutation taking `current` from the `from` capture to the `to`
/// capture. Steps are staged one at a time; a step the current scene
/// can't take is skipped.
pub fn scene_delta(current: &Scene, from: &Scene, to: &Scene) -> SceneMutation {
    let mut staged = current.clone();
    let mut steps = Vec::new();
    let mut stage = |staged: &mut Scene, step: SceneMutation| match staged.apply(step.clone()) {
        Ok(()) => steps.push(step),
        Err(err) => log::warn!("commands: skipped {} during replay: {err}", step.name()),
    };

    for group in from.groups() {
        if to.group(group.id).is_none() && staged.group(group.id).is_some() {
            stage(&mut staged, SceneMutation::Ungroup { id: group.id });
        }
    }

    let gone: Vec<ElementId> = from
        .elements()
        .iter()
        .map(|e| e.id)
        .filter(|id| !to.contains(*id) && staged.contains(*id))
        .collect();
    if !gone.is_empty() {
        stage(&mut staged, SceneMutation::Remove { ids: gone });
    }

    // Relative order among the elements both captures share. Their slots in
    // the current order are kept and refilled in the target sequence.
    let shared = |scene: &Scene| -> Vec<ElementId> {
        scene
            .elements()
            .iter()
            .map(|e| e.id)
            .filter(|id| from.contains(*id) && to.contains(*id) && staged.contains(*id))
            .collect()
    };
    let (was, wanted) = (shared(from), shared(to));
    if was != wanted {
        let keep: HashSet<ElementId> = wanted.iter().copied().collect();
        let mut refill = wanted.into_iter();
        let order: Vec<ElementId> = staged
            .order()
            .into_iter()
            .map(|id| {
                if keep.contains(&id) {
                    refill.next().unwrap_or(id)
                } else {
                    id
                }
            })
            .collect();
        stage(&mut staged, SceneMutation::SetOrder { order });
    }

    // New elements go just above their nearest lower neighbour in `to`.
    let mut anchor: Option<ElementId> = None;
    for el in to.elements() {
        if !from.contains(el.id) && !staged.contains(el.id) {
            let index = anchor.and_then(|a| staged.index_of(a)).map_or(0, |i| i + 1);
            stage(
                &mut staged,
                SceneMutation::Insert {
                    element: Box::new(el.clone()),
                    index: Some(index),
                },
            );
        }
        if staged.contains(el.id) {
            anchor = Some(el.id);
        }
    }

    for el in to.elements() {
        if from.get(el.id).is_some_and(|old| old != el) && staged.get(el.id) != Some(el) {
            stage(
                &mut staged,
                SceneMutation::Update {
                    element: Box::new(el.clone()),
                },
            );
        }
    }

    for group in to.groups() {
        if from.group(group.id) != Some(group) {
            stage(&mut staged, SceneMutation::Group { group: group.clone() });
        }
    }

    if from.selection() != to.selection() {
        stage(
            &mut staged,
            SceneMutation::Select {
                ids: to.selection().to_vec(),
            },
        );
    }
    SceneMutation::Batch(steps)
}

/// Re-insert removed elements at their old z positions, re-link children
/// that lost their parent, and bring back groups and the selection.
fn restore_removed(scene: &Scene, ids: &[ElementId]) -> SceneMutation {
    let doomed: HashSet<ElementId> = ids.iter().copied().collect();
    let mut steps: Vec<SceneMutation> = scene
        .elements()
        .iter()
        .enumerate()
        .filter(|(_, el)| doomed.contains(&el.id))
        .map(|(i, el)| SceneMutation::Insert {
            element: Box::new(el.clone()),
            index: Some(i),
        })
        .collect();

    let orphans: Vec<&Element> = scene
        .elements()
        .iter()
        .filter(|el| !doomed.contains(&el.id))
        .filter(|el| el.parent_id.is_some_and(|p| doomed.contains(&p)))
        .collect();
    steps.extend(orphans.into_iter().map(|el| SceneMutation::Update {
        element: Box::new(el.clone()),
    }));

    steps.extend(
        scene
            .groups()
            .iter()
            .filter(|g| g.element_ids.iter().any(|m| doomed.contains(m)))
            .map(|g| SceneMutation::Group { group: g.clone() }),
    );
    steps.push(SceneMutation::Select {
        ids: scene.selection().to_vec(),
    });
    SceneMutation::Batch(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clise_core::{Group, ReorderOp};
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> ElementId {
        ElementId::intern(s)
    }

    fn scene(ids: &[&str]) -> Scene {
        let elements = ids
            .iter()
            .enumerate()
            .map(|(i, s)| Element::rect(s, i as f64 * 100.0, 0.0, 50.0, 50.0))
            .collect();
        Scene::from_parts(elements, vec![], vec![]).unwrap()
    }

    #[test]
    fn undo_redo_move() {
        let mut s = scene(&["cmd_box"]);
        let mut stack = CommandStack::new(100);

        stack
            .execute(
                &mut s,
                SceneMutation::Move {
                    ids: vec![id("cmd_box")],
                    dx: 50.0,
                    dy: 30.0,
                },
                "Move box",
            )
            .unwrap();
        assert_eq!(s.get(id("cmd_box")).unwrap().x, 50.0);

        assert_eq!(stack.undo(&mut s), Some("Move box".to_string()));
        assert_eq!(s.get(id("cmd_box")).unwrap().x, 0.0);

        assert_eq!(stack.redo(&mut s), Some("Move box".to_string()));
        assert_eq!(s.get(id("cmd_box")).unwrap().x, 50.0);
    }

    #[test]
    fn redo_clears_on_new_action() {
        let mut s = scene(&["cmd_a"]);
        let mut stack = CommandStack::new(100);
        let nudge = |dx| SceneMutation::Move {
            ids: vec![id("cmd_a")],
            dx,
            dy: 0.0,
        };

        stack.execute(&mut s, nudge(5.0), "move").unwrap();
        stack.undo(&mut s);
        assert!(stack.can_redo());

        stack.execute(&mut s, nudge(1.0), "move2").unwrap();
        assert!(!stack.can_redo());
    }

    #[test]
    fn max_depth_trims_oldest() {
        let mut s = scene(&["cmd_t"]);
        let mut stack = CommandStack::new(3);
        for i in 0..5 {
            let m = SceneMutation::Move {
                ids: vec![id("cmd_t")],
                dx: 1.0,
                dy: 0.0,
            };
            stack.execute(&mut s, m, &format!("move {i}")).unwrap();
        }
        assert_eq!(stack.undo_len(), 3);
        assert_eq!(stack.undo(&mut s), Some("move 4".to_string()));
        stack.undo(&mut s);
        stack.undo(&mut s);
        assert!(!stack.can_undo());
        assert_eq!(s.get(id("cmd_t")).unwrap().x, 2.0);
    }

    #[test]
    fn rejected_mutation_records_nothing() {
        let mut s = scene(&["cmd_r"]);
        let mut stack = CommandStack::new(10);
        let err = stack.execute(
            &mut s,
            SceneMutation::Remove {
                ids: vec![id("cmd_missing")],
            },
            "remove",
        );
        assert!(err.is_err());
        assert!(!stack.can_undo());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn remove_undo_restores_order_groups_and_selection() {
        let mut s = scene(&["cmd_x", "cmd_y", "cmd_z"]);
        s.apply(SceneMutation::Group {
            group: Group::new(id("cmd_grp"), [id("cmd_x"), id("cmd_y")]),
        })
        .unwrap();
        s.apply(SceneMutation::Select {
            ids: vec![id("cmd_grp")],
        })
        .unwrap();
        let before = s.clone();

        let mut stack = CommandStack::new(10);
        stack
            .execute(
                &mut s,
                SceneMutation::Remove {
                    ids: vec![id("cmd_x")],
                },
                "delete",
            )
            .unwrap();
        // The group fell below two members and dissolved.
        assert!(s.groups().is_empty());

        stack.undo(&mut s);
        assert_eq!(s, before);
    }

    #[test]
    fn reorder_undo_restores_sequence() {
        let mut s = scene(&["cmd_o1", "cmd_o2", "cmd_o3"]);
        let mut stack = CommandStack::new(10);
        stack
            .execute(
                &mut s,
                SceneMutation::Reorder {
                    ids: vec![id("cmd_o1")],
                    op: ReorderOp::BringToFront,
                },
                "bring to front",
            )
            .unwrap();
        assert_eq!(s.order(), vec![id("cmd_o2"), id("cmd_o3"), id("cmd_o1")]);
        stack.undo(&mut s);
        assert_eq!(s.order(), vec![id("cmd_o1"), id("cmd_o2"), id("cmd_o3")]);
    }

    #[test]
    fn batch_inverse_replays_backwards() {
        let mut s = scene(&["cmd_b"]);
        let before = s.clone();
        let mut stack = CommandStack::new(10);
        let batch = SceneMutation::Batch(vec![
            SceneMutation::Insert {
                element: Box::new(Element::rect("cmd_new", 0.0, 0.0, 5.0, 5.0)),
                index: Some(0),
            },
            SceneMutation::Move {
                ids: vec![id("cmd_new"), id("cmd_b")],
                dx: 10.0,
                dy: 0.0,
            },
            SceneMutation::Select {
                ids: vec![id("cmd_new")],
            },
        ]);
        stack.execute(&mut s, batch, "paste").unwrap();
        assert_eq!(s.len(), 2);
        stack.undo(&mut s);
        assert_eq!(s, before);
    }

    #[test]
    fn batch_gesture_is_one_undo_step() {
        let mut s = scene(&["cmd_drag"]);
        let mut stack = CommandStack::new(10);

        stack.begin_batch(&s, "drag");
        for _ in 0..10 {
            let m = SceneMutation::Move {
                ids: vec![id("cmd_drag")],
                dx: 1.0,
                dy: 1.0,
            };
            stack.execute(&mut s, m, "move").unwrap();
        }
        assert!(stack.end_batch(&s));
        assert_eq!(stack.undo_len(), 1);

        let version = s.version();
        assert_eq!(stack.undo(&mut s), Some("drag".to_string()));
        assert_eq!(s.get(id("cmd_drag")).unwrap().x, 0.0);
        assert!(s.version() > version);

        stack.redo(&mut s);
        assert_eq!(s.get(id("cmd_drag")).unwrap().x, 10.0);
    }

    #[test]
    fn empty_batch_pushes_nothing() {
        let mut s = scene(&["cmd_e"]);
        let mut stack = CommandStack::new(10);
        stack.begin_batch(&s, "noop");
        let out = SceneMutation::Move {
            ids: vec![id("cmd_e")],
            dx: 5.0,
            dy: 0.0,
        };
        let back = SceneMutation::Move {
            ids: vec![id("cmd_e")],
            dx: -5.0,
            dy: 0.0,
        };
        stack.execute(&mut s, out, "out").unwrap();
        stack.execute(&mut s, back, "back").unwrap();
        assert!(!stack.end_batch(&s));
        assert!(!stack.can_undo());
    }

    #[test]
    fn cancel_batch_restores_scene() {
        let mut s = scene(&["cmd_c"]);
        let before = s.clone();
        let mut stack = CommandStack::new(10);
        stack.begin_batch(&s, "drag");
        stack
            .execute(
                &mut s,
                SceneMutation::Move {
                    ids: vec![id("cmd_c")],
                    dx: 40.0,
                    dy: 0.0,
                },
                "move",
            )
            .unwrap();
        stack.cancel_batch(&mut s);
        assert_eq!(s, before);
        assert!(!stack.in_batch());
        assert!(!stack.can_undo());
    }

    #[test]
    fn gesture_undo_keeps_edits_made_outside_history() {
        let mut s = scene(&["cmd_g"]);
        let mut stack = CommandStack::new(10);
        stack.begin_batch(&s, "drag");
        let m = SceneMutation::Move {
            ids: vec![id("cmd_g")],
            dx: 25.0,
            dy: 0.0,
        };
        stack.execute(&mut s, m, "move").unwrap();
        assert!(stack.end_batch(&s));

        // Content streamed in after the gesture, outside history.
        for i in 0..3 {
            let el = Element::rect(&format!("cmd_gen{i}"), 500.0, i as f64 * 60.0, 40.0, 40.0);
            s.apply(SceneMutation::Insert {
                element: Box::new(el),
                index: None,
            })
            .unwrap();
        }

        stack.undo(&mut s);
        assert_eq!(s.len(), 4);
        assert_eq!(s.get(id("cmd_g")).unwrap().x, 0.0);

        stack.redo(&mut s);
        assert_eq!(s.len(), 4);
        assert_eq!(s.get(id("cmd_g")).unwrap().x, 25.0);
        assert_eq!(s.order()[0], id("cmd_g"));
    }

    #[test]
    fn gesture_redo_puts_drawn_element_below_later_content() {
        let mut s = scene(&["cmd_base"]);
        let mut stack = CommandStack::new(10);
        stack.begin_batch(&s, "draw");
        let drawn = Element::rect("cmd_drawn", 10.0, 10.0, 30.0, 30.0);
        stack
            .execute(
                &mut s,
                SceneMutation::Insert {
                    element: Box::new(drawn),
                    index: None,
                },
                "insert",
            )
            .unwrap();
        assert!(stack.end_batch(&s));
        s.apply(SceneMutation::Insert {
            element: Box::new(Element::rect("cmd_later", 0.0, 0.0, 5.0, 5.0)),
            index: None,
        })
        .unwrap();

        stack.undo(&mut s);
        assert_eq!(s.order(), vec![id("cmd_base"), id("cmd_later")]);
        stack.redo(&mut s);
        assert_eq!(
            s.order(),
            vec![id("cmd_base"), id("cmd_drawn"), id("cmd_later")]
        );
    }
}
