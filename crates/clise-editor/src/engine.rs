//! The canvas engine: one object a host drives.
//!
//! - **Input**: events go to the interaction machine first; key presses it
//!   leaves alone are resolved through the shortcut map.
//! - **Edits**: every operation records an undo step and schedules a
//!   debounced containment pass (frame parents and auto-layout).
//! - **Frames**: the host calls [`CanvasEngine::tick`] once per animation
//!   frame with the current time, then [`CanvasEngine::render`] when a
//!   redraw is due.
//! - **Persistence**: [`CanvasEngine::take_dirty`] reports finished edits
//!   so the host can save a snapshot.

use crate::config::EditorConfig;
use crate::document::{Clipboard, Document};
use crate::error::EngineError;
use crate::generate::{BulkGenerator, GeneratorOptions};
use crate::guides::smart_guides;
use crate::input::InputEvent;
use crate::interaction::{Interaction, Response};
use crate::scheduler::Debouncer;
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::tools::{ToolKind, with_text};
use clise_core::layout::{layout_all, recompute_parents};
use clise_core::path::{self, BooleanOp, CurveKind};
use clise_core::{
    Bounds, EditError, Element, ElementId, Group, Island, IslandDetector, Point, ReorderOp, Scene,
    SceneMutation, Size, Snapshot, Viewport, element_bounds, export_document, import_document,
};
use clise_render::hit::{expand_selection, hit_test_with_tolerance, promote_groups};
use clise_render::{FrameInput, FrameStats, Renderer, Surface};

/// Offset applied to pasted and duplicated copies, per paste.
pub const PASTE_OFFSET: f64 = 10.0;

pub struct CanvasEngine {
    config: EditorConfig,
    doc: Document,
    interaction: Interaction,
    renderer: Renderer,
    islands: IslandDetector,
    containment: Debouncer,
    clipboard: Clipboard,
    pastes: u32,
    generator: Option<BulkGenerator>,
    document_name: String,
    /// Canvas size in CSS pixels.
    width: f64,
    height: f64,
    canvas_size: Size,
    /// Latest host time seen, in milliseconds.
    clock: f64,
    dirty: bool,
}

impl CanvasEngine {
    pub fn new(width: f64, height: f64) -> Self {
        Self::with_config(EditorConfig::default(), width, height)
    }

    pub fn with_config(config: EditorConfig, width: f64, height: f64) -> Self {
        let viewport = Viewport::default().with_limits(config.zoom_limits);
        Self {
            doc: Document::new(viewport, config.undo_depth),
            interaction: Interaction::new(config.pan_decay_ms),
            renderer: Renderer::new(config.render.clone()),
            islands: IslandDetector::new(config.islands),
            containment: Debouncer::new(config.debounce_ms),
            clipboard: Clipboard::default(),
            pastes: 0,
            generator: None,
            document_name: String::from("Untitled"),
            width,
            height,
            canvas_size: Size::new(width, height),
            clock: 0.0,
            dirty: false,
            config,
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EditorConfig) {
        self.doc.viewport = self.doc.viewport.with_limits(config.zoom_limits);
        self.doc.history.set_max_depth(config.undo_depth);
        self.interaction.set_pan_decay(config.pan_decay_ms);
        self.renderer.set_options(config.render.clone());
        self.islands.set_options(config.islands);
        self.containment.set_window(config.debounce_ms);
        self.config = config;
    }

    pub fn scene(&self) -> &Scene {
        &self.doc.scene
    }

    pub fn viewport(&self) -> &Viewport {
        &self.doc.viewport
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    /// Font and image caches live here; hosts report load results through it.
    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    pub fn set_document_name(&mut self, name: &str) {
        self.document_name = name.to_string();
        self.dirty = true;
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn set_canvas_size(&mut self, size: Size) {
        self.canvas_size = size;
    }

    pub fn tool(&self) -> ToolKind {
        self.interaction.tool()
    }

    pub fn set_tool(&mut self, tool: ToolKind) -> Result<Response, EngineError> {
        let response = self.interaction.set_tool(&mut self.doc, tool)?;
        Ok(self.settle(response))
    }

    pub fn is_panning(&self, now: f64) -> bool {
        self.interaction.is_panning(now)
    }

    pub fn can_undo(&self) -> bool {
        self.doc.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.doc.history.can_redo()
    }

    /// Topmost element under a canvas-local screen point.
    pub fn element_at(&self, x: f64, y: f64) -> Option<ElementId> {
        let p = self.doc.to_scene(Point::new(x, y));
        hit_test_with_tolerance(
            self.doc.scene.elements(),
            p,
            self.doc.viewport.zoom,
            self.config.hit_tolerance,
        )
    }

    // ─── Input and frames ────────────────────────────────────────────────

    pub fn handle_event(&mut self, event: &InputEvent, now: f64) -> Response {
        self.clock = now;
        let mut response = self
            .interaction
            .handle(&mut self.doc, &self.config, event, now);
        if !response.handled
            && let InputEvent::KeyDown { key, modifiers } = event
            && let Some(action) = ShortcutMap::resolve(key, *modifiers)
        {
            response = response.merge(self.dispatch(action));
        }
        self.settle(response)
    }

    fn settle(&mut self, response: Response) -> Response {
        if response.relayout {
            self.containment.trigger(self.clock);
        }
        if response.committed {
            self.dirty = true;
        }
        response
    }

    /// Per-frame maintenance. Returns whether a redraw is due.
    pub fn tick(&mut self, now: f64) -> bool {
        self.clock = now;
        let mut redraw = self.renderer.take_redraw_request();

        if self.containment.poll(now) {
            if self.interaction.is_idle() {
                redraw |= self.recompute_containment();
            } else {
                // Wait for the gesture to end.
                self.containment.trigger(now);
            }
        }

        // A chunk landing mid-gesture would be folded into the gesture's undo
        // step, so generation waits for it to end.
        if let Some(generator) = self.generator.as_mut()
            && !self.doc.history.in_batch()
        {
            match generator.next() {
                Some(chunk) => {
                    if let Err(err) = self.doc.scene.apply(chunk) {
                        log::warn!("engine: generated chunk rejected: {err}");
                    }
                    self.dirty = true;
                    redraw = true;
                }
                None => {
                    log::debug!("engine: generation finished");
                    self.generator = None;
                    self.containment.trigger(now);
                }
            }
        }
        redraw
    }

    /// Recompute frame parents and apply auto-layout. Maintenance only; not
    /// an undo step.
    pub fn recompute_containment(&mut self) -> bool {
        let mut changed = recompute_parents(&mut self.doc.scene);
        if let Some(layout) = layout_all(&self.doc.scene) {
            match self.doc.scene.apply(layout) {
                Ok(()) => changed += recompute_parents(&mut self.doc.scene) + 1,
                Err(err) => log::warn!("engine: auto-layout rejected: {err}"),
            }
        }
        log::debug!("engine: containment pass, {changed} change(s)");
        if changed > 0 {
            self.dirty = true;
        }
        changed > 0
    }

    pub fn render(&mut self, surface: &mut dyn Surface, dpr: f64) -> FrameStats {
        let guides = match self.interaction.dragging() {
            Some(ids) => smart_guides(&self.doc.scene, ids, 0.5 / self.doc.viewport.zoom),
            None => Vec::new(),
        };
        let frame = FrameInput {
            scene: &self.doc.scene,
            viewport: &self.doc.viewport,
            width: self.width,
            height: self.height,
            dpr,
            box_select: self.interaction.box_selection(),
            guides: &guides,
            editing: self.interaction.editing(),
        };
        self.renderer.render(surface, &frame)
    }

    /// Whether edits finished since the last call. Stays false mid-gesture
    /// so hosts persist only settled documents.
    pub fn take_dirty(&mut self) -> bool {
        if !self.interaction.is_idle() {
            return false;
        }
        std::mem::take(&mut self.dirty)
    }

    // ─── Shortcuts ───────────────────────────────────────────────────────

    fn dispatch(&mut self, action: ShortcutAction) -> Response {
        log::debug!("engine: shortcut {action:?}");
        let result = match action {
            ShortcutAction::Tool(tool) => self.interaction.set_tool(&mut self.doc, tool),
            ShortcutAction::ToggleLastTool => self.interaction.toggle_last_tool(&mut self.doc),
            ShortcutAction::Undo => Ok(self.undo().into()),
            ShortcutAction::Redo => Ok(self.redo().into()),
            ShortcutAction::Delete => self.delete_selection().map(Response::from),
            ShortcutAction::SelectAll => Ok(self.select_all().into()),
            ShortcutAction::Duplicate => self.duplicate_selection().map(Response::from),
            ShortcutAction::Copy => Ok(self.copy().into()),
            ShortcutAction::Cut => self.cut().map(Response::from),
            ShortcutAction::Paste => self.paste().map(Response::from),
            ShortcutAction::Group => self.group_selection().map(|_| Response::from(true)),
            ShortcutAction::Ungroup => self.ungroup_selection().map(Response::from),
            ShortcutAction::Nudge { dx, dy } => self.nudge(dx, dy).map(Response::from),
            ShortcutAction::ZoomIn => Ok(self.zoom_in().into()),
            ShortcutAction::ZoomOut => Ok(self.zoom_out().into()),
            ShortcutAction::ZoomToFit => Ok(self.zoom_to_fit().into()),
            ShortcutAction::ZoomReset => Ok(self.zoom_reset().into()),
            ShortcutAction::NextIsland => Ok(self.next_island().is_some().into()),
            ShortcutAction::PreviousIsland => Ok(self.previous_island().is_some().into()),
            ShortcutAction::SendBackward => self.reorder_selection(ReorderOp::SendBackward).map(Response::from),
            ShortcutAction::BringForward => self.reorder_selection(ReorderOp::BringForward).map(Response::from),
            ShortcutAction::SendToBack => self.reorder_selection(ReorderOp::SendToBack).map(Response::from),
            ShortcutAction::BringToFront => self.reorder_selection(ReorderOp::BringToFront).map(Response::from),
            ShortcutAction::Deselect => Ok(self.doc.select(Vec::new()).into()),
        };
        match result {
            Ok(response) => Response {
                handled: true,
                ..response
            },
            Err(err) => {
                log::debug!("engine: {action:?} not applied: {err}");
                Response::handled()
            }
        }
    }

    // ─── Edits ───────────────────────────────────────────────────────────

    fn ensure_idle(&self) -> Result<(), EngineError> {
        if self.interaction.is_idle() {
            Ok(())
        } else {
            Err(EngineError::Busy(self.interaction.state().name()))
        }
    }

    /// Execute one undoable edit. Empty batches record nothing.
    fn edit(&mut self, mutation: SceneMutation, description: &str) -> Result<(), EngineError> {
        self.ensure_idle()?;
        if matches!(&mutation, SceneMutation::Batch(steps) if steps.is_empty()) {
            return Ok(());
        }
        self.doc.execute(mutation, description)?;
        self.after_edit();
        Ok(())
    }

    fn after_edit(&mut self) {
        self.dirty = true;
        self.containment.trigger(self.clock);
    }

    pub fn undo(&mut self) -> bool {
        match self.doc.undo() {
            Some(description) => {
                log::debug!("engine: undo {description}");
                self.after_edit();
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.doc.redo() {
            Some(description) => {
                log::debug!("engine: redo {description}");
                self.after_edit();
                true
            }
            None => false,
        }
    }

    /// Replace the selection. Group members are promoted to their group.
    pub fn select(&mut self, ids: &[ElementId]) -> bool {
        let ids = promote_groups(ids, self.doc.scene.groups());
        self.doc.select(ids)
    }

    pub fn select_all(&mut self) -> bool {
        let visible: Vec<ElementId> = self
            .doc
            .scene
            .elements()
            .iter()
            .filter(|el| el.visible)
            .map(|el| el.id)
            .collect();
        self.select(&visible)
    }

    pub fn insert_element(&mut self, element: Element) -> Result<(), EngineError> {
        let id = element.id;
        let mutation = SceneMutation::Batch(vec![
            SceneMutation::Insert {
                element: Box::new(element),
                index: None,
            },
            SceneMutation::Select { ids: vec![id] },
        ]);
        self.edit(mutation, "insert")
    }

    /// Replace an element's record, e.g. from a property panel.
    pub fn update_element(&mut self, element: Element) -> Result<(), EngineError> {
        self.edit(
            SceneMutation::Update {
                element: Box::new(element),
            },
            "update",
        )
    }

    /// Delete the unlocked members of the selection. Returns whether
    /// anything was removed.
    pub fn delete_selection(&mut self) -> Result<bool, EngineError> {
        let ids = self.doc.unlocked(self.doc.scene.selection());
        if ids.is_empty() {
            return Ok(false);
        }
        self.edit(SceneMutation::Remove { ids }, "delete")?;
        Ok(true)
    }

    pub fn nudge(&mut self, dx: f64, dy: f64) -> Result<bool, EngineError> {
        let ids = self.doc.unlocked(self.doc.scene.selection());
        if ids.is_empty() {
            return Ok(false);
        }
        self.edit(SceneMutation::Move { ids, dx, dy }, "nudge")?;
        Ok(true)
    }

    pub fn reorder_selection(&mut self, op: ReorderOp) -> Result<bool, EngineError> {
        let ids = self.doc.selected_elements();
        if ids.is_empty() {
            return Ok(false);
        }
        let before = self.doc.scene.order();
        self.edit(SceneMutation::Reorder { ids, op }, "reorder")?;
        Ok(before != self.doc.scene.order())
    }

    /// Group the selected items into a new group and select it.
    pub fn group_selection(&mut self) -> Result<ElementId, EngineError> {
        let members = self.doc.selected_elements();
        if members.len() < 2 {
            return Err(EditError::GroupTooSmall(members.len()).into());
        }
        let id = ElementId::with_prefix("group");
        let mutation = SceneMutation::Batch(vec![
            SceneMutation::Group {
                group: Group::new(id, members),
            },
            SceneMutation::Select { ids: vec![id] },
        ]);
        self.edit(mutation, "group")?;
        Ok(id)
    }

    /// Dissolve every selected group, selecting its former members.
    pub fn ungroup_selection(&mut self) -> Result<bool, EngineError> {
        let selection = self.doc.scene.selection().to_vec();
        let groups: Vec<ElementId> = selection
            .iter()
            .copied()
            .filter(|id| self.doc.scene.group(*id).is_some())
            .collect();
        if groups.is_empty() {
            return Ok(false);
        }
        let mut steps: Vec<SceneMutation> = groups
            .iter()
            .map(|id| SceneMutation::Ungroup { id: *id })
            .collect();
        steps.push(SceneMutation::Select {
            ids: expand_selection(&selection, self.doc.scene.groups()),
        });
        self.edit(SceneMutation::Batch(steps), "ungroup")?;
        Ok(true)
    }

    // ─── Clipboard ───────────────────────────────────────────────────────

    pub fn copy(&mut self) -> bool {
        let clip = Clipboard::capture(&self.doc.scene, self.doc.scene.selection());
        if clip.is_empty() {
            return false;
        }
        log::debug!("engine: copied {} element(s)", clip.len());
        self.clipboard = clip;
        self.pastes = 0;
        true
    }

    pub fn cut(&mut self) -> Result<bool, EngineError> {
        if !self.copy() {
            return Ok(false);
        }
        // Pasting after a cut lands where the originals were.
        self.pastes = u32::MAX;
        self.delete_selection()
    }

    /// Paste the clipboard, each paste offset a little further.
    pub fn paste(&mut self) -> Result<bool, EngineError> {
        self.pastes = self.pastes.wrapping_add(1);
        let offset = f64::from(self.pastes) * PASTE_OFFSET;
        let Some((mutation, _)) = self.clipboard.instantiate(offset, offset) else {
            return Ok(false);
        };
        self.edit(mutation, "paste")?;
        Ok(true)
    }

    pub fn duplicate_selection(&mut self) -> Result<bool, EngineError> {
        let clip = Clipboard::capture(&self.doc.scene, self.doc.scene.selection());
        let Some((mutation, _)) = clip.instantiate(PASTE_OFFSET, PASTE_OFFSET) else {
            return Ok(false);
        };
        self.edit(mutation, "duplicate")?;
        Ok(true)
    }

    // ─── Text ────────────────────────────────────────────────────────────

    /// Replace a text element's content and refit its box. While that
    /// element is being edited the change joins the editing session's undo
    /// step.
    pub fn set_text_content(&mut self, id: ElementId, content: &str) -> Result<(), EngineError> {
        let el = self
            .doc
            .scene
            .get(id)
            .ok_or(EditError::UnknownElement(id))?;
        let next = with_text(el, content).ok_or(EditError::Empty("not a text element"))?;
        let mutation = SceneMutation::Update {
            element: Box::new(next),
        };
        if self.interaction.editing() == Some(id) {
            self.doc.execute(mutation, "edit text")?;
            return Ok(());
        }
        self.edit(mutation, "edit text")
    }

    pub fn edit_text(&mut self, id: ElementId) -> Result<Response, EngineError> {
        let response = self.interaction.edit_text(&mut self.doc, id)?;
        Ok(self.settle(response))
    }

    // ─── Path editing ────────────────────────────────────────────────────

    pub fn insert_path_point(&mut self, id: ElementId) -> Result<(), EngineError> {
        let mutation = path::edit_mutation(&self.doc.scene, id, path::insert_point)?;
        self.edit(mutation, "insert point")
    }

    pub fn insert_point_in_segment(&mut self, id: ElementId, index: usize) -> Result<(), EngineError> {
        let mutation = path::edit_mutation(&self.doc.scene, id, |el| {
            path::insert_point_in_segment(el, index)
        })?;
        self.edit(mutation, "insert point")
    }

    pub fn remove_path_point(&mut self, id: ElementId, index: usize) -> Result<(), EngineError> {
        let mutation =
            path::edit_mutation(&self.doc.scene, id, |el| path::remove_point(el, index))?;
        self.edit(mutation, "remove point")
    }

    pub fn move_path_point(
        &mut self,
        id: ElementId,
        index: usize,
        dx: f64,
        dy: f64,
    ) -> Result<(), EngineError> {
        let mutation =
            path::edit_mutation(&self.doc.scene, id, |el| path::move_point(el, index, dx, dy))?;
        self.edit(mutation, "move point")
    }

    /// Place control handle `handle` (0 or 1) of point `index` at local
    /// `(x, y)`.
    pub fn move_path_handle(
        &mut self,
        id: ElementId,
        index: usize,
        handle: usize,
        x: f64,
        y: f64,
    ) -> Result<(), EngineError> {
        let mutation = path::edit_mutation(&self.doc.scene, id, |el| {
            path::move_handle(el, index, handle, x, y)
        })?;
        self.edit(mutation, "move handle")
    }

    pub fn convert_segment(&mut self, id: ElementId, index: usize, kind: CurveKind) -> Result<(), EngineError> {
        let mutation =
            path::edit_mutation(&self.doc.scene, id, |el| path::convert_segment(el, index, kind))?;
        self.edit(mutation, "convert segment")
    }

    pub fn convert_to_straight(&mut self, id: ElementId, index: usize) -> Result<(), EngineError> {
        let mutation =
            path::edit_mutation(&self.doc.scene, id, |el| path::convert_to_straight(el, index))?;
        self.edit(mutation, "straighten segment")
    }

    pub fn toggle_path_closed(&mut self, id: ElementId) -> Result<(), EngineError> {
        let mutation = path::edit_mutation(&self.doc.scene, id, path::toggle_closed)?;
        self.edit(mutation, "toggle closed")
    }

    pub fn split_path(&mut self, id: ElementId, index: usize) -> Result<(), EngineError> {
        let mutation = path::split_mutation(&self.doc.scene, id, index)?;
        self.edit(mutation, "split path")
    }

    pub fn join_paths(&mut self, a: ElementId, b: ElementId) -> Result<(), EngineError> {
        let mutation = path::join_mutation(&self.doc.scene, a, b)?;
        self.edit(mutation, "join paths")
    }

    pub fn boolean(&mut self, a: ElementId, b: ElementId, op: BooleanOp) -> Result<(), EngineError> {
        let mutation = path::boolean_mutation(&self.doc.scene, a, b, op)?;
        self.edit(mutation, "boolean")
    }

    // ─── Camera and islands ──────────────────────────────────────────────

    fn view_center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn zoom_in(&mut self) -> bool {
        let before = self.doc.viewport.zoom;
        self.doc.viewport.zoom_by(self.config.zoom_step, self.view_center());
        self.doc.viewport.zoom != before
    }

    pub fn zoom_out(&mut self) -> bool {
        let before = self.doc.viewport.zoom;
        self.doc
            .viewport
            .zoom_by(1.0 / self.config.zoom_step, self.view_center());
        self.doc.viewport.zoom != before
    }

    pub fn zoom_reset(&mut self) -> bool {
        self.doc.viewport.zoom_at(self.view_center(), 1.0);
        true
    }

    /// Zoom at a canvas-local pivot, keeping the scene point under it fixed.
    pub fn zoom_at(&mut self, x: f64, y: f64, zoom: f64) {
        self.doc.viewport.zoom_at(Point::new(x, y), zoom);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.doc.viewport.pan_by(dx, dy);
    }

    /// Frame every visible element.
    pub fn zoom_to_fit(&mut self) -> bool {
        let boxes: Vec<Bounds> = self
            .doc
            .scene
            .elements()
            .iter()
            .filter(|el| el.visible)
            .map(element_bounds)
            .collect();
        let Some(content) = Bounds::union_all(&boxes) else {
            return self.zoom_reset();
        };
        self.doc
            .viewport
            .fit_bounds(&content, self.width, self.height, self.config.fit_padding);
        true
    }

    pub fn islands(&mut self) -> Vec<Island> {
        self.islands.islands(&self.doc.scene).to_vec()
    }

    pub fn island_containing(&mut self, id: ElementId) -> Option<Island> {
        self.islands.island_containing(&self.doc.scene, id).cloned()
    }

    /// Move the camera to the next island and select its content.
    pub fn next_island(&mut self) -> Option<Island> {
        let island = self.islands.next(&self.doc.scene).cloned()?;
        self.focus(&island);
        Some(island)
    }

    pub fn previous_island(&mut self) -> Option<Island> {
        let island = self.islands.previous(&self.doc.scene).cloned()?;
        self.focus(&island);
        Some(island)
    }

    fn focus(&mut self, island: &Island) {
        let frame = island.framing_bounds(self.config.islands.cluster_threshold);
        self.doc
            .viewport
            .fit_bounds(&frame, self.width, self.height, self.config.fit_padding);
        let ids = promote_groups(&island.elements, self.doc.scene.groups());
        self.doc.select(ids);
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    /// Export the document as `.clise` JSON.
    pub fn export(&self) -> Result<String, EngineError> {
        Ok(export_document(&self.doc.scene, &self.doc.viewport)?)
    }

    /// Merge a `.clise` document into the scene as one undo step. Into an
    /// empty scene the file's camera is adopted too. Returns how many
    /// elements were added.
    pub fn import(&mut self, json: &str) -> Result<usize, EngineError> {
        self.ensure_idle()?;
        let imported = import_document(json)?;
        if imported.skipped > 0 {
            log::warn!("engine: import skipped {} malformed entries", imported.skipped);
        }
        let count = imported.elements.len();
        let camera = imported.viewport;
        let adopt_camera = self.doc.scene.is_empty();
        self.edit(imported.into_mutation(), "import")?;
        if adopt_camera {
            self.doc.viewport = Viewport::new(camera.pan, camera.zoom).with_limits(self.config.zoom_limits);
        }
        log::debug!("engine: imported {count} element(s)");
        Ok(count)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(
            &self.document_name,
            &self.doc.scene,
            &self.doc.viewport,
            self.interaction.tool().name(),
            self.size(),
            self.canvas_size,
        )
    }

    /// Replace the whole document. History starts over.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), EngineError> {
        let (scene, viewport) = snapshot.restore()?;
        self.interaction.reset(&mut self.doc);
        self.doc.scene.replace_with(scene);
        self.doc.viewport = viewport.with_limits(self.config.zoom_limits);
        self.doc.history.clear();
        self.islands.reset();
        self.generator = None;
        self.containment.cancel();
        self.document_name = snapshot.document_name.clone();
        self.canvas_size = snapshot.canvas_size;
        let tool = ToolKind::from_name(&snapshot.tool).unwrap_or_default();
        if let Err(err) = self.interaction.set_tool(&mut self.doc, tool) {
            log::warn!("engine: restored tool not applied: {err}");
        }
        self.dirty = false;
        log::debug!(
            "engine: restored {:?} with {} element(s)",
            self.document_name,
            self.doc.scene.len()
        );
        Ok(())
    }

    pub fn save_json(&self) -> Result<String, EngineError> {
        Ok(self.snapshot().to_json()?)
    }

    pub fn load_json(&mut self, json: &str) -> Result<(), EngineError> {
        let snapshot = Snapshot::from_json(json)?;
        self.restore(&snapshot)
    }

    pub fn save_bytes(&self) -> Result<Vec<u8>, EngineError> {
        Ok(self.snapshot().to_bytes()?)
    }

    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        let snapshot = Snapshot::from_bytes(bytes)?;
        self.restore(&snapshot)
    }

    // ─── Bulk generation ─────────────────────────────────────────────────

    /// Queue synthetic elements; one chunk lands per [`CanvasEngine::tick`].
    /// Generated content is not an undo step.
    pub fn start_generation(&mut self, options: GeneratorOptions) {
        log::debug!("engine: generating {} element(s)", options.count);
        self.generator = Some(BulkGenerator::new(options));
    }

    pub fn is_generating(&self) -> bool {
        self.generator.is_some()
    }
}

impl From<bool> for Response {
    /// `true` when the action changed something visible.
    fn from(changed: bool) -> Self {
        if changed {
            Response::redraw()
        } else {
            Response::handled()
        }
    }
}
