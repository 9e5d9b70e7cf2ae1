//! Interaction state machine.
//!
//! Turns normalized input events into scene mutations. Exactly one state is
//! active at a time:
//!
//! | state | entered by | left by |
//! |-------|------------|---------|
//! | `idle` | | |
//! | `drawing` | pointer-down with a drawing tool | pointer-up (path: Enter, double-click, close click, Escape) |
//! | `dragging` | pointer-down on a selected body | pointer-up, Escape cancels |
//! | `resizing` | pointer-down on a handle | pointer-up, Escape cancels |
//! | `boxSelecting` | pointer-down on empty canvas | pointer-up, Escape restores |
//! | `panning` | middle button, space + drag, hand tool; from any state | pointer-up |
//! | `editingText` | text tool click, double-click on text | Escape, click elsewhere |
//!
//! Pointer gestures open a history batch on pointer-down and close it on
//! pointer-up, so each one is a single undo step.
//! A pan started mid-gesture commits the gesture first; path drawing and
//! text editing resume once the pan ends.

use crate::config::EditorConfig;
use crate::document::{Clipboard, Document};
use crate::error::EngineError;
use crate::input::{InputEvent, Modifiers, PointerButton};
use crate::resize::ResizeGesture;
use crate::scheduler::Activity;
use crate::tools::ToolKind;
use clise_core::model::{ElementKind, PathPoint};
use clise_core::path::normalize_path;
use clise_core::{Bounds, Element, ElementId, Point, SceneMutation, element_bounds};
use clise_render::hit::{
    ClickMode, apply_click, box_select, hit_handle, hit_test_with_tolerance, promote_groups,
};

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    Idle,
    /// A new element is being drawn. The path tool stays here across clicks.
    Drawing {
        id: ElementId,
        tool: ToolKind,
        start: Point,
    },
    Dragging {
        ids: Vec<ElementId>,
        start: Point,
        /// Offset already applied to the scene.
        offset: (f64, f64),
        /// Alt-drag copies: dropped again if the pointer never moves.
        duplicated: bool,
        /// Clicking one item of a multi-selection narrows to it on release
        /// if nothing moved.
        narrow_to: Option<ElementId>,
    },
    Resizing {
        gesture: ResizeGesture,
    },
    BoxSelecting {
        start: Point,
        current: Point,
        /// Selection the box adds to (empty for a plain drag).
        base: Vec<ElementId>,
    },
    Panning {
        last: Point,
        /// State to return to on release.
        resume: Box<InteractionState>,
    },
    EditingText {
        id: ElementId,
        /// The element was created by this edit session.
        created: bool,
    },
}

impl InteractionState {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::Drawing { .. } => "drawing",
            InteractionState::Dragging { .. } => "dragging",
            InteractionState::Resizing { .. } => "resizing",
            InteractionState::BoxSelecting { .. } => "boxSelecting",
            InteractionState::Panning { .. } => "panning",
            InteractionState::EditingText { .. } => "editingText",
        }
    }
}

/// What an event did, for the host's redraw and persistence decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Response {
    /// The machine consumed the event; shortcuts must not see it.
    pub handled: bool,
    pub redraw: bool,
    /// An undo step was recorded.
    pub committed: bool,
    /// Frame containment should be recomputed once things settle.
    pub relayout: bool,
    pub tool_changed: bool,
}

impl Response {
    pub fn handled() -> Self {
        Self {
            handled: true,
            ..Self::default()
        }
    }

    pub fn redraw() -> Self {
        Self {
            handled: true,
            redraw: true,
            ..Self::default()
        }
    }

    fn committed(committed: bool) -> Self {
        Self {
            committed,
            relayout: committed,
            ..Self::redraw()
        }
    }

    pub fn merge(self, other: Response) -> Response {
        Response {
            handled: self.handled || other.handled,
            redraw: self.redraw || other.redraw,
            committed: self.committed || other.committed,
            relayout: self.relayout || other.relayout,
            tool_changed: self.tool_changed || other.tool_changed,
        }
    }
}

pub struct Interaction {
    state: InteractionState,
    tool: ToolKind,
    previous_tool: ToolKind,
    space_held: bool,
    pan_activity: Activity,
}

impl Interaction {
    pub fn new(pan_decay_ms: f64) -> Self {
        Self {
            state: InteractionState::Idle,
            tool: ToolKind::Select,
            previous_tool: ToolKind::Select,
            space_held: false,
            pan_activity: Activity::new(pan_decay_ms),
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == InteractionState::Idle
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn previous_tool(&self) -> ToolKind {
        self.previous_tool
    }

    pub fn set_pan_decay(&mut self, decay_ms: f64) {
        self.pan_activity.set_decay(decay_ms);
    }

    /// True while panning and for the decay window after the last pan delta.
    pub fn is_panning(&self, now: f64) -> bool {
        matches!(self.state, InteractionState::Panning { .. }) || self.pan_activity.is_active(now)
    }

    /// Text element being edited, including while a pan interrupts it.
    pub fn editing(&self) -> Option<ElementId> {
        match &self.state {
            InteractionState::EditingText { id, .. } => Some(*id),
            InteractionState::Panning { resume, .. } => match resume.as_ref() {
                InteractionState::EditingText { id, .. } => Some(*id),
                _ => None,
            },
            _ => None,
        }
    }

    /// Elements moving under an active drag.
    pub fn dragging(&self) -> Option<&[ElementId]> {
        match &self.state {
            InteractionState::Dragging { ids, .. } => Some(ids),
            _ => None,
        }
    }

    /// The live box-selection rectangle in scene units.
    pub fn box_selection(&self) -> Option<Bounds> {
        match &self.state {
            InteractionState::BoxSelecting { start, current, .. } => {
                Some(Bounds::from_corners(*start, *current))
            }
            _ => None,
        }
    }

    /// Switch tools. An unfinished path is committed first; other gestures
    /// and text editing refuse the switch.
    pub fn set_tool(&mut self, doc: &mut Document, tool: ToolKind) -> Result<Response, EngineError> {
        let mut response = Response::default();
        match &self.state {
            InteractionState::Idle => {}
            InteractionState::Drawing {
                id,
                tool: ToolKind::Path,
                ..
            } => {
                let id = *id;
                response = self.finish_path(doc, id, None);
            }
            other => return Err(EngineError::Busy(other.name())),
        }
        Ok(response.merge(self.switch_tool(tool)))
    }

    pub fn toggle_last_tool(&mut self, doc: &mut Document) -> Result<Response, EngineError> {
        self.set_tool(doc, self.previous_tool)
    }

    /// Abandon any gesture in flight, rolling back its uncommitted edits.
    pub fn reset(&mut self, doc: &mut Document) {
        if doc.history.in_batch() {
            doc.history.cancel_batch(&mut doc.scene);
        }
        self.space_held = false;
        self.transition(InteractionState::Idle);
    }

    /// Enter text editing on an existing text element.
    pub fn edit_text(&mut self, doc: &mut Document, id: ElementId) -> Result<Response, EngineError> {
        if !self.is_idle() {
            return Err(EngineError::Busy(self.state.name()));
        }
        match doc.scene.get(id) {
            Some(el) if matches!(el.kind, ElementKind::Text(_)) => {}
            _ => return Err(clise_core::EditError::UnknownElement(id).into()),
        }
        doc.history.begin_batch(&doc.scene, "edit text");
        doc.select(vec![id]);
        self.transition(InteractionState::EditingText { id, created: false });
        Ok(Response::redraw())
    }

    pub fn handle(
        &mut self,
        doc: &mut Document,
        config: &EditorConfig,
        event: &InputEvent,
        now: f64,
    ) -> Response {
        match event {
            InputEvent::PointerDown {
                x,
                y,
                button,
                modifiers,
            } => self.pointer_down(doc, config, Point::new(*x, *y), *button, *modifiers),
            InputEvent::PointerMove { x, y, modifiers } => {
                self.pointer_move(doc, Point::new(*x, *y), *modifiers, now)
            }
            InputEvent::PointerUp { .. } => self.pointer_up(doc),
            InputEvent::DoubleClick { x, y, .. } => self.double_click(doc, config, Point::new(*x, *y)),
            InputEvent::Wheel {
                x,
                y,
                dx,
                dy,
                modifiers,
            } => self.wheel(doc, config, Point::new(*x, *y), *dx, *dy, *modifiers, now),
            InputEvent::KeyDown { key, .. } => self.key_down(doc, key),
            InputEvent::KeyUp { key, .. } => {
                if key == " " && self.space_held {
                    self.space_held = false;
                    return Response::handled();
                }
                Response::default()
            }
        }
    }

    fn transition(&mut self, next: InteractionState) {
        if self.state.name() != next.name() {
            log::debug!("interaction: {} -> {}", self.state.name(), next.name());
        }
        self.state = next;
    }

    fn switch_tool(&mut self, tool: ToolKind) -> Response {
        if tool == self.tool {
            return Response::default();
        }
        log::debug!("interaction: tool {} -> {}", self.tool.name(), tool.name());
        self.previous_tool = self.tool;
        self.tool = tool;
        Response {
            tool_changed: true,
            ..Response::redraw()
        }
    }

    // ─── Pointer down ────────────────────────────────────────────────────

    fn pointer_down(
        &mut self,
        doc: &mut Document,
        config: &EditorConfig,
        screen: Point,
        button: PointerButton,
        modifiers: Modifiers,
    ) -> Response {
        let pans = button == PointerButton::Middle
            || (button == PointerButton::Primary
                && (self.space_held || self.tool == ToolKind::Hand));
        if pans {
            let (settled, resume) = match &self.state {
                InteractionState::Panning { .. } => return Response::handled(),
                InteractionState::Idle => (Response::default(), InteractionState::Idle),
                InteractionState::EditingText { .. }
                | InteractionState::Drawing {
                    tool: ToolKind::Path,
                    ..
                } => (Response::default(), self.state.clone()),
                // Any other gesture ends the way a release would end it.
                _ => (self.pointer_up(doc), InteractionState::Idle),
            };
            self.transition(InteractionState::Panning {
                last: screen,
                resume: Box::new(resume),
            });
            return settled.merge(Response::handled());
        }
        if button != PointerButton::Primary {
            return Response::default();
        }

        let p = doc.to_scene(screen);
        match &self.state {
            InteractionState::Idle => self.begin(doc, config, p, modifiers),
            InteractionState::Drawing {
                id,
                tool: ToolKind::Path,
                ..
            } => {
                let id = *id;
                self.extend_path(doc, config, id, p)
            }
            InteractionState::EditingText { id, .. } => {
                // Clicks inside the text keep editing it.
                if doc
                    .scene
                    .get(*id)
                    .is_some_and(|el| element_bounds(el).contains(p))
                {
                    return Response::handled();
                }
                let finished = self.finish_text(doc);
                finished.merge(self.begin(doc, config, p, modifiers))
            }
            _ => Response::handled(),
        }
    }

    fn begin(&mut self, doc: &mut Document, config: &EditorConfig, p: Point, modifiers: Modifiers) -> Response {
        if self.tool.is_drawing() {
            self.begin_drawing(doc, p)
        } else {
            self.begin_select(doc, config, p, modifiers)
        }
    }

    fn begin_drawing(&mut self, doc: &mut Document, p: Point) -> Response {
        let tool = self.tool;
        let Some(el) = tool.create(p) else {
            return Response::default();
        };
        let id = el.id;
        let description = format!("draw {}", tool.name());
        doc.history.begin_batch(&doc.scene, &description);
        let insert = SceneMutation::Insert {
            element: Box::new(el),
            index: None,
        };
        if let Err(err) = doc.execute(insert, &description) {
            log::warn!("interaction: {description} rejected: {err}");
            doc.history.cancel_batch(&mut doc.scene);
            return Response::handled();
        }
        doc.select(vec![id]);
        let next = match tool {
            ToolKind::Text => InteractionState::EditingText { id, created: true },
            tool => InteractionState::Drawing { id, tool, start: p },
        };
        self.transition(next);
        Response::redraw()
    }

    fn begin_select(
        &mut self,
        doc: &mut Document,
        config: &EditorConfig,
        p: Point,
        modifiers: Modifiers,
    ) -> Response {
        if let Some(gesture) = handle_under(doc, config, p) {
            doc.history.begin_batch(&doc.scene, "resize");
            self.transition(InteractionState::Resizing { gesture });
            return Response::redraw();
        }

        let mode = ClickMode::from_modifiers(modifiers.shift, modifiers.command());
        let current = doc.scene.selection().to_vec();
        let hit = hit_test_with_tolerance(doc.scene.elements(), p, doc.viewport.zoom, config.hit_tolerance)
            .and_then(|id| promote_groups(&[id], doc.scene.groups()).first().copied());

        let Some(hit) = hit else {
            let base = match mode {
                ClickMode::Replace => Vec::new(),
                ClickMode::Toggle | ClickMode::Add => current,
            };
            doc.select(base.clone());
            self.transition(InteractionState::BoxSelecting {
                start: p,
                current: p,
                base,
            });
            return Response::redraw();
        };

        let already = current.contains(&hit);
        let selection = if mode == ClickMode::Replace && already {
            current.clone()
        } else {
            apply_click(&current, Some(hit), mode)
        };
        doc.select(selection.clone());
        if !selection.contains(&hit) {
            return Response::redraw();
        }

        let movable = doc.unlocked(&selection);
        if movable.is_empty() {
            return Response::redraw();
        }
        doc.history.begin_batch(&doc.scene, if modifiers.alt { "duplicate" } else { "move" });
        let (ids, duplicated) = if modifiers.alt {
            match duplicate_in_place(doc, &selection) {
                Some(copies) => (copies, true),
                None => (movable, false),
            }
        } else {
            (movable, false)
        };
        let narrow_to = (mode == ClickMode::Replace && already && selection.len() > 1).then_some(hit);
        self.transition(InteractionState::Dragging {
            ids,
            start: p,
            offset: (0.0, 0.0),
            duplicated,
            narrow_to,
        });
        Response::redraw()
    }

    // ─── Pointer move ────────────────────────────────────────────────────

    fn pointer_move(&mut self, doc: &mut Document, screen: Point, modifiers: Modifiers, now: f64) -> Response {
        let p = doc.to_scene(screen);
        match &mut self.state {
            InteractionState::Panning { last, .. } => {
                let (dx, dy) = (screen.x - last.x, screen.y - last.y);
                *last = screen;
                if dx == 0.0 && dy == 0.0 {
                    return Response::handled();
                }
                doc.viewport.pan_by(dx, dy);
                self.pan_activity.bump(now);
                Response::redraw()
            }
            InteractionState::Drawing { id, tool, start } if *tool != ToolKind::Path => {
                let Some(el) = doc.scene.get(*id) else {
                    return Response::handled();
                };
                let next = tool.drag(el, *start, p, modifiers);
                update_all(doc, vec![next], "draw")
            }
            InteractionState::Dragging {
                ids, start, offset, ..
            } => {
                let (mut dx, mut dy) = (p.x - start.x, p.y - start.y);
                if modifiers.shift {
                    if dx.abs() >= dy.abs() {
                        dy = 0.0;
                    } else {
                        dx = 0.0;
                    }
                }
                let (step_x, step_y) = (dx - offset.0, dy - offset.1);
                if step_x == 0.0 && step_y == 0.0 {
                    return Response::handled();
                }
                let mutation = SceneMutation::Move {
                    ids: ids.clone(),
                    dx: step_x,
                    dy: step_y,
                };
                match doc.execute(mutation, "move") {
                    Ok(()) => {
                        *offset = (dx, dy);
                        Response::redraw()
                    }
                    Err(err) => {
                        log::warn!("interaction: move rejected: {err}");
                        Response::handled()
                    }
                }
            }
            InteractionState::Resizing { gesture } => {
                let next = gesture.update(p, modifiers.shift);
                update_all(doc, next, "resize")
            }
            InteractionState::BoxSelecting {
                start,
                current,
                base,
            } => {
                *current = p;
                let rect = Bounds::from_corners(*start, p);
                let hits = promote_groups(&box_select(doc.scene.elements(), &rect), doc.scene.groups());
                let mut selection = base.clone();
                for id in hits {
                    if !selection.contains(&id) {
                        selection.push(id);
                    }
                }
                doc.select(selection);
                Response::redraw()
            }
            _ => Response::default(),
        }
    }

    // ─── Pointer up ──────────────────────────────────────────────────────

    fn pointer_up(&mut self, doc: &mut Document) -> Response {
        match self.state.clone() {
            InteractionState::Panning { resume, .. } => {
                self.transition(*resume);
                Response::handled()
            }
            InteractionState::Drawing { id, tool, .. } if tool != ToolKind::Path => {
                // A line that never left its start point is dropped.
                let degenerate = tool == ToolKind::Line
                    && doc.scene.get(id).is_some_and(|el| el.w == 0.0 && el.h == 0.0);
                self.transition(InteractionState::Idle);
                if degenerate {
                    doc.history.cancel_batch(&mut doc.scene);
                    return Response::redraw().merge(self.switch_tool(ToolKind::Select));
                }
                let committed = doc.history.end_batch(&doc.scene);
                Response::committed(committed).merge(self.switch_tool(ToolKind::Select))
            }
            InteractionState::Dragging {
                offset,
                duplicated,
                narrow_to,
                ..
            } => {
                self.transition(InteractionState::Idle);
                let moved = offset != (0.0, 0.0);
                if duplicated && !moved {
                    doc.history.cancel_batch(&mut doc.scene);
                    return Response::redraw();
                }
                let committed = doc.history.end_batch(&doc.scene);
                if !moved && let Some(id) = narrow_to {
                    doc.select(vec![id]);
                }
                Response::committed(committed)
            }
            InteractionState::Resizing { .. } => {
                self.transition(InteractionState::Idle);
                Response::committed(doc.history.end_batch(&doc.scene))
            }
            InteractionState::BoxSelecting { .. } => {
                self.transition(InteractionState::Idle);
                Response::redraw()
            }
            InteractionState::Drawing { .. } | InteractionState::EditingText { .. } => {
                Response::handled()
            }
            InteractionState::Idle => Response::default(),
        }
    }

    // ─── Double click, wheel, keys ───────────────────────────────────────

    fn double_click(&mut self, doc: &mut Document, config: &EditorConfig, screen: Point) -> Response {
        match &self.state {
            InteractionState::Drawing {
                id,
                tool: ToolKind::Path,
                ..
            } => {
                let id = *id;
                let tolerance = config.path_close_tolerance / doc.viewport.zoom;
                self.finish_path(doc, id, Some(tolerance))
            }
            InteractionState::Idle if self.tool == ToolKind::Select => {
                let p = doc.to_scene(screen);
                let text = hit_test_with_tolerance(doc.scene.elements(), p, doc.viewport.zoom, config.hit_tolerance)
                    .filter(|id| {
                        doc.scene
                            .get(*id)
                            .is_some_and(|el| !el.locked && matches!(el.kind, ElementKind::Text(_)))
                    });
                match text {
                    Some(id) => self.edit_text(doc, id).unwrap_or_default(),
                    None => Response::default(),
                }
            }
            _ => Response::default(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn wheel(
        &mut self,
        doc: &mut Document,
        config: &EditorConfig,
        pivot: Point,
        dx: f64,
        dy: f64,
        modifiers: Modifiers,
        now: f64,
    ) -> Response {
        if modifiers.command() {
            if dy == 0.0 {
                return Response::handled();
            }
            let factor = if dy < 0.0 {
                config.zoom_step
            } else {
                1.0 / config.zoom_step
            };
            doc.viewport.zoom_by(factor, pivot);
        } else {
            if dx == 0.0 && dy == 0.0 {
                return Response::handled();
            }
            doc.viewport.pan_by(-dx, -dy);
            self.pan_activity.bump(now);
        }
        Response::redraw()
    }

    fn key_down(&mut self, doc: &mut Document, key: &str) -> Response {
        match (&self.state, key) {
            (InteractionState::EditingText { .. }, "Escape") => self.finish_text(doc),
            // Typing belongs to the text editor.
            (InteractionState::EditingText { .. }, _) => Response::handled(),
            (_, " ") => {
                self.space_held = true;
                Response::handled()
            }
            (
                InteractionState::Drawing {
                    id,
                    tool: ToolKind::Path,
                    ..
                },
                "Enter" | "Escape",
            ) => {
                let id = *id;
                self.finish_path(doc, id, None)
            }
            (
                InteractionState::Drawing { .. }
                | InteractionState::Dragging { .. }
                | InteractionState::Resizing { .. },
                "Escape",
            ) => {
                doc.history.cancel_batch(&mut doc.scene);
                self.transition(InteractionState::Idle);
                Response::redraw()
            }
            (InteractionState::BoxSelecting { base, .. }, "Escape") => {
                let base = base.clone();
                doc.select(base);
                self.transition(InteractionState::Idle);
                Response::redraw()
            }
            (InteractionState::Idle, _) => Response::default(),
            _ => Response::handled(),
        }
    }

    // ─── Paths and text ──────────────────────────────────────────────────

    fn extend_path(&mut self, doc: &mut Document, config: &EditorConfig, id: ElementId, p: Point) -> Response {
        let Some(el) = doc.scene.get(id).cloned() else {
            doc.history.cancel_batch(&mut doc.scene);
            self.transition(InteractionState::Idle);
            return Response::redraw();
        };
        let ElementKind::Path { points, .. } = &el.kind else {
            return Response::handled();
        };

        let tolerance = config.path_close_tolerance / doc.viewport.zoom;
        let near_first = points
            .first()
            .is_some_and(|first| Point::new(el.x + first.x, el.y + first.y).distance(p) <= tolerance);
        if points.len() >= 3 && near_first {
            let mut closed = el.clone();
            if let ElementKind::Path { closed: flag, .. } = &mut closed.kind {
                *flag = true;
            }
            update_all(doc, vec![closed], "close path");
            return self.finish_path(doc, id, None);
        }

        let mut next = el.clone();
        if let ElementKind::Path { points, .. } = &mut next.kind {
            points.push(PathPoint::new(p.x - el.x, p.y - el.y));
        }
        normalize_path(&mut next);
        update_all(doc, vec![next], "add path point")
    }

    /// End path construction. `dedupe` drops trailing points within that
    /// distance of their predecessor (a double-click lands twice). Paths
    /// with fewer than 2 points are discarded.
    fn finish_path(&mut self, doc: &mut Document, id: ElementId, dedupe: Option<f64>) -> Response {
        self.transition(InteractionState::Idle);
        let mut count = 0;
        if let Some(el) = doc.scene.get(id).cloned()
            && let ElementKind::Path { points, .. } = &el.kind
        {
            let mut kept: Vec<PathPoint> = points.clone();
            if let Some(tolerance) = dedupe {
                while let [.., a, b] = kept.as_slice()
                    && Point::new(a.x, a.y).distance(Point::new(b.x, b.y)) <= tolerance
                {
                    kept.pop();
                }
            }
            count = kept.len();
            if count != points.len() && count >= 2 {
                let mut next = el.clone();
                next.kind = ElementKind::Path {
                    points: kept,
                    closed: matches!(el.kind, ElementKind::Path { closed: true, .. }),
                };
                normalize_path(&mut next);
                update_all(doc, vec![next], "finish path");
            }
        }

        if count < 2 {
            log::debug!("interaction: discarding path with {count} point(s)");
            doc.history.cancel_batch(&mut doc.scene);
            return Response::redraw().merge(self.switch_tool(ToolKind::Select));
        }
        let committed = doc.history.end_batch(&doc.scene);
        Response::committed(committed).merge(self.switch_tool(ToolKind::Select))
    }

    /// Leave text editing. Emptied text is removed; a text box created by
    /// this session and left empty disappears without an undo step.
    fn finish_text(&mut self, doc: &mut Document) -> Response {
        let InteractionState::EditingText { id, created } = self.state else {
            return Response::default();
        };
        self.transition(InteractionState::Idle);
        let empty = doc.scene.get(id).is_some_and(
            |el| matches!(&el.kind, ElementKind::Text(props) if props.content.trim().is_empty()),
        );
        let response = match (empty, created) {
            (true, true) => {
                doc.history.cancel_batch(&mut doc.scene);
                Response::redraw()
            }
            (true, false) => {
                if let Err(err) = doc.execute(SceneMutation::Remove { ids: vec![id] }, "delete text") {
                    log::warn!("interaction: empty text not removed: {err}");
                }
                Response::committed(doc.history.end_batch(&doc.scene))
            }
            (false, _) => Response::committed(doc.history.end_batch(&doc.scene)),
        };
        response.merge(self.switch_tool(ToolKind::Select))
    }
}

/// The resize handle under `p` among the selected, unlocked items.
fn handle_under(doc: &Document, config: &EditorConfig, p: Point) -> Option<ResizeGesture> {
    let zoom = doc.viewport.zoom;
    for id in doc.scene.selection() {
        if let Some(group) = doc.scene.group(*id) {
            let members: Vec<Element> = group
                .element_ids
                .iter()
                .filter_map(|m| doc.scene.get(*m))
                .cloned()
                .collect();
            if members.iter().any(|m| m.locked) {
                continue;
            }
            let boxes: Vec<Bounds> = members.iter().map(element_bounds).collect();
            let Some(b) = Bounds::union_all(&boxes) else {
                continue;
            };
            if let Some(handle) = hit_handle(&b, p, config.handle_size, zoom) {
                return ResizeGesture::multi(members, handle, p);
            }
        } else if let Some(el) = doc.scene.get(*id)
            && !el.locked
            && let Some(handle) = hit_handle(&element_bounds(el), p, config.handle_size, zoom)
        {
            return Some(ResizeGesture::single(el, handle, p));
        }
    }
    None
}

/// Copy the selection in place and select the copies. Returns the ids the
/// drag should move.
fn duplicate_in_place(doc: &mut Document, selection: &[ElementId]) -> Option<Vec<ElementId>> {
    let (mutation, copies) = Clipboard::capture(&doc.scene, selection).instantiate(0.0, 0.0)?;
    if let Err(err) = doc.execute(mutation, "duplicate") {
        log::warn!("interaction: duplicate rejected: {err}");
        return None;
    }
    Some(doc.unlocked(&copies))
}

fn update_all(doc: &mut Document, elements: Vec<Element>, description: &str) -> Response {
    let steps = elements
        .into_iter()
        .map(|el| SceneMutation::Update {
            element: Box::new(el),
        })
        .collect();
    match doc.execute(SceneMutation::Batch(steps), description) {
        Ok(()) => Response::redraw(),
        Err(err) => {
            log::warn!("interaction: {description} rejected: {err}");
            Response::handled()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clise_core::Viewport;
    use pretty_assertions::assert_eq;

    fn setup(elements: Vec<Element>) -> (Interaction, Document, EditorConfig) {
        let mut doc = Document::new(Viewport::default(), 50);
        for el in elements {
            doc.scene
                .apply(SceneMutation::Insert {
                    element: Box::new(el),
                    index: None,
                })
                .unwrap();
        }
        (Interaction::new(150.0), doc, EditorConfig::default())
    }

    fn send(ix: &mut Interaction, doc: &mut Document, config: &EditorConfig, event: InputEvent) -> Response {
        ix.handle(doc, config, &event, 0.0)
    }

    fn id(s: &str) -> ElementId {
        ElementId::intern(s)
    }

    #[test]
    fn click_selects_and_drag_moves() {
        let (mut ix, mut doc, config) = setup(vec![Element::rect("ix_a", 0.0, 0.0, 50.0, 50.0)]);
        send(&mut ix, &mut doc, &config, InputEvent::pointer_down(25.0, 25.0, Modifiers::NONE));
        assert_eq!(ix.state().name(), "dragging");
        assert_eq!(doc.scene.selection(), &[id("ix_a")]);

        send(&mut ix, &mut doc, &config, InputEvent::pointer_move(35.0, 30.0, Modifiers::NONE));
        send(&mut ix, &mut doc, &config, InputEvent::pointer_move(45.0, 40.0, Modifiers::NONE));
        let up = send(&mut ix, &mut doc, &config, InputEvent::pointer_up(45.0, 40.0, Modifiers::NONE));

        assert!(up.committed && up.relayout);
        let a = doc.scene.get(id("ix_a")).unwrap();
        assert_eq!((a.x, a.y), (20.0, 15.0));
        assert_eq!(doc.history.undo_len(), 1);
        assert!(ix.is_idle());
    }

    #[test]
    fn shift_drag_locks_to_dominant_axis() {
        let (mut ix, mut doc, config) = setup(vec![Element::rect("ix_axis", 0.0, 0.0, 50.0, 50.0)]);
        send(&mut ix, &mut doc, &config, InputEvent::pointer_down(10.0, 10.0, Modifiers::NONE));
        send(&mut ix, &mut doc, &config, InputEvent::pointer_move(40.0, 18.0, Modifiers::SHIFT));
        send(&mut ix, &mut doc, &config, InputEvent::pointer_up(40.0, 18.0, Modifiers::SHIFT));
        let el = doc.scene.get(id("ix_axis")).unwrap();
        assert_eq!((el.x, el.y), (30.0, 0.0));
    }

    #[test]
    fn locked_elements_select_but_do_not_drag() {
        let mut locked = Element::rect("ix_locked", 0.0, 0.0, 50.0, 50.0);
        locked.locked = true;
        let (mut ix, mut doc, config) = setup(vec![locked]);
        send(&mut ix, &mut doc, &config, InputEvent::pointer_down(10.0, 10.0, Modifiers::NONE));
        assert!(ix.is_idle());
        assert_eq!(doc.scene.selection(), &[id("ix_locked")]);
    }

    #[test]
    fn escape_cancels_a_drag() {
        let (mut ix, mut doc, config) = setup(vec![Element::rect("ix_esc", 0.0, 0.0, 50.0, 50.0)]);
        send(&mut ix, &mut doc, &config, InputEvent::pointer_down(10.0, 10.0, Modifiers::NONE));
        send(&mut ix, &mut doc, &config, InputEvent::pointer_move(60.0, 60.0, Modifiers::NONE));
        send(&mut ix, &mut doc, &config, InputEvent::key_down("Escape", Modifiers::NONE));
        let el = doc.scene.get(id("ix_esc")).unwrap();
        assert_eq!((el.x, el.y), (0.0, 0.0));
        assert!(!doc.history.can_undo());
        assert!(ix.is_idle());
    }

    #[test]
    fn alt_drag_moves_a_copy() {
        let (mut ix, mut doc, config) = setup(vec![Element::rect("ix_orig", 0.0, 0.0, 50.0, 50.0)]);
        send(&mut ix, &mut doc, &config, InputEvent::pointer_down(10.0, 10.0, Modifiers::ALT));
        send(&mut ix, &mut doc, &config, InputEvent::pointer_move(110.0, 10.0, Modifiers::ALT));
        send(&mut ix, &mut doc, &config, InputEvent::pointer_up(110.0, 10.0, Modifiers::ALT));

        assert_eq!(doc.scene.len(), 2);
        let orig = doc.scene.get(id("ix_orig")).unwrap();
        assert_eq!(orig.x, 0.0);
        let copy = &doc.scene.elements()[1];
        assert_eq!(copy.x, 100.0);
        assert_eq!(doc.scene.selection(), &[copy.id]);
        assert_eq!(doc.history.undo_len(), 1);
    }

    #[test]
    fn alt_click_without_motion_leaves_no_copy() {
        let (mut ix, mut doc, config) = setup(vec![Element::rect("ix_still", 0.0, 0.0, 50.0, 50.0)]);
        send(&mut ix, &mut doc, &config, InputEvent::pointer_down(10.0, 10.0, Modifiers::ALT));
        send(&mut ix, &mut doc, &config, InputEvent::pointer_up(10.0, 10.0, Modifiers::ALT));
        assert_eq!(doc.scene.len(), 1);
        assert!(!doc.history.can_undo());
    }

    #[test]
    fn drawing_a_rect_switches_back_to_select() {
        let (mut ix, mut doc, config) = setup(vec![]);
        ix.set_tool(&mut doc, ToolKind::Rect).unwrap();
        send(&mut ix, &mut doc, &config, InputEvent::pointer_down(100.0, 100.0, Modifiers::NONE));
        send(&mut ix, &mut doc, &config, InputEvent::pointer_move(40.0, 160.0, Modifiers::NONE));
        let up = send(&mut ix, &mut doc, &config, InputEvent::pointer_up(40.0, 160.0, Modifiers::NONE));

        assert!(up.committed && up.tool_changed);
        assert_eq!(ix.tool(), ToolKind::Select);
        assert_eq!(ix.previous_tool(), ToolKind::Rect);
        let el = &doc.scene.elements()[0];
        assert_eq!((el.x, el.y, el.w, el.h), (40.0, 100.0, 60.0, 60.0));
        assert_eq!(doc.scene.selection(), &[el.id]);
    }

    #[test]
    fn click_without_drag_line_is_discarded() {
        let (mut ix, mut doc, config) = setup(vec![]);
        ix.set_tool(&mut doc, ToolKind::Line).unwrap();
        send(&mut ix, &mut doc, &config, InputEvent::pointer_down(10.0, 10.0, Modifiers::NONE));
        send(&mut ix, &mut doc, &config, InputEvent::pointer_up(10.0, 10.0, Modifiers::NONE));
        assert!(doc.scene.is_empty());
        assert!(!doc.history.can_undo());
    }

    #[test]
    fn tool_switch_refused_while_editing_text() {
        let (mut ix, mut doc, config) = setup(vec![]);
        ix.set_tool(&mut doc, ToolKind::Text).unwrap();
        send(&mut ix, &mut doc, &config, InputEvent::pointer_down(10.0, 10.0, Modifiers::NONE));
        assert!(ix.editing().is_some());
        assert!(matches!(
            ix.set_tool(&mut doc, ToolKind::Rect),
            Err(EngineError::Busy("editingText"))
        ));
        // Shortcut keys are swallowed while typing.
        assert!(send(&mut ix, &mut doc, &config, InputEvent::key_down("r", Modifiers::NONE)).handled);

        // Left empty, the new text vanishes without an undo step.
        send(&mut ix, &mut doc, &config, InputEvent::key_down("Escape", Modifiers::NONE));
        assert!(ix.is_idle());
        assert!(doc.scene.is_empty());
        assert!(!doc.history.can_undo());
    }

    #[test]
    fn resize_handle_drag_is_one_step() {
        let (mut ix, mut doc, config) = setup(vec![Element::rect("ix_rs", 0.0, 0.0, 100.0, 100.0)]);
        doc.select(vec![id("ix_rs")]);
        send(&mut ix, &mut doc, &config, InputEvent::pointer_down(100.0, 100.0, Modifiers::NONE));
        assert_eq!(ix.state().name(), "resizing");
        send(&mut ix, &mut doc, &config, InputEvent::pointer_move(150.0, 120.0, Modifiers::NONE));
        send(&mut ix, &mut doc, &config, InputEvent::pointer_move(200.0, 150.0, Modifiers::NONE));
        send(&mut ix, &mut doc, &config, InputEvent::pointer_up(200.0, 150.0, Modifiers::NONE));
        let el = doc.scene.get(id("ix_rs")).unwrap();
        assert_eq!((el.w, el.h), (200.0, 150.0));
        assert_eq!(doc.history.undo_len(), 1);
    }

    #[test]
    fn space_drag_pans_and_resumes() {
        let (mut ix, mut doc, config) = setup(vec![]);
        send(&mut ix, &mut doc, &config, InputEvent::key_down(" ", Modifiers::NONE));
        send(&mut ix, &mut doc, &config, InputEvent::pointer_down(10.0, 10.0, Modifiers::NONE));
        assert_eq!(ix.state().name(), "panning");
        ix.handle(&mut doc, &config, &InputEvent::pointer_move(30.0, 5.0, Modifiers::NONE), 1000.0);
        assert_eq!((doc.viewport.pan.x, doc.viewport.pan.y), (20.0, -5.0));
        send(&mut ix, &mut doc, &config, InputEvent::pointer_up(30.0, 5.0, Modifiers::NONE));
        assert!(ix.is_idle());
        assert!(ix.is_panning(1100.0));
        assert!(!ix.is_panning(1151.0));
    }

    #[test]
    fn middle_button_takes_over_a_drag() {
        let (mut ix, mut doc, config) = setup(vec![Element::rect("ix_pan", 0.0, 0.0, 50.0, 50.0)]);
        send(&mut ix, &mut doc, &config, InputEvent::pointer_down(25.0, 25.0, Modifiers::NONE));
        send(&mut ix, &mut doc, &config, InputEvent::pointer_move(35.0, 25.0, Modifiers::NONE));
        let middle = InputEvent::PointerDown {
            x: 35.0,
            y: 25.0,
            button: PointerButton::Middle,
            modifiers: Modifiers::NONE,
        };
        let down = send(&mut ix, &mut doc, &config, middle);
        assert!(down.committed);
        assert_eq!(ix.state().name(), "panning");
        assert_eq!(doc.history.undo_len(), 1);
        assert!(!doc.history.in_batch());

        send(&mut ix, &mut doc, &config, InputEvent::pointer_move(135.0, 25.0, Modifiers::NONE));
        assert_eq!(doc.viewport.pan.x, 100.0);
        assert_eq!(doc.scene.get(id("ix_pan")).unwrap().x, 10.0);
        send(&mut ix, &mut doc, &config, InputEvent::pointer_up(135.0, 25.0, Modifiers::NONE));
        assert!(ix.is_idle());
    }

    #[test]
    fn space_press_drops_a_box_selection_and_pans() {
        let (mut ix, mut doc, config) = setup(vec![Element::rect("ix_boxpan", 200.0, 200.0, 50.0, 50.0)]);
        send(&mut ix, &mut doc, &config, InputEvent::pointer_down(10.0, 10.0, Modifiers::NONE));
        send(&mut ix, &mut doc, &config, InputEvent::pointer_move(60.0, 60.0, Modifiers::NONE));
        assert_eq!(ix.state().name(), "boxSelecting");
        send(&mut ix, &mut doc, &config, InputEvent::key_down(" ", Modifiers::NONE));
        send(&mut ix, &mut doc, &config, InputEvent::pointer_down(60.0, 60.0, Modifiers::NONE));
        assert_eq!(ix.state().name(), "panning");
        assert_eq!(ix.box_selection(), None);
    }

    #[test]
    fn wheel_with_command_zooms_at_pivot() {
        let (mut ix, mut doc, config) = setup(vec![]);
        let before = doc.to_scene(Point::new(50.0, 50.0));
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        };
        let wheel = InputEvent::Wheel {
            x: 50.0,
            y: 50.0,
            dx: 0.0,
            dy: -100.0,
            modifiers: ctrl,
        };
        send(&mut ix, &mut doc, &config, wheel);
        assert!(doc.viewport.zoom > 1.0);
        let after = doc.to_scene(Point::new(50.0, 50.0));
        assert!((after.x - before.x).abs() < 1e-9 && (after.y - before.y).abs() < 1e-9);
    }
}
