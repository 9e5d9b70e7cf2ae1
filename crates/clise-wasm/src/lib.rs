//! WASM bridge for Clise: exposes the canvas engine to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. The host forwards DOM events
//! with a timestamp, calls [`CliseCanvas::tick`] once per animation frame
//! and [`CliseCanvas::render`] whenever a redraw was requested. Fallible
//! calls answer with JSON: `{"ok":true,...}` or `{"ok":false,"error":"..."}`.

mod render2d;

pub use render2d::{Canvas2dSurface, UploadCache, image_filter};

use clise_core::path::{BooleanOp, CurveKind};
use clise_core::{Element, ElementId, Island, ReorderOp};
use clise_editor::{
    CanvasEngine, EditorConfig, EngineError, GeneratorOptions, InputEvent, Modifiers, PointerButton,
    Response, ToolKind,
};
use clise_render::{Bitmap, FrameStats};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

/// The WASM-facing canvas controller.
///
/// Owns the engine plus the Canvas2D upload cache. All interaction from the
/// page goes through this struct.
#[wasm_bindgen]
pub struct CliseCanvas {
    engine: CanvasEngine,
    uploads: UploadCache,
    last_frame: FrameStats,
}

#[wasm_bindgen]
impl CliseCanvas {
    /// Create a controller for a canvas of `width` x `height` CSS pixels.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> Self {
        console_error_panic_hook_setup();
        init_logging();
        Self {
            engine: CanvasEngine::new(width, height),
            uploads: UploadCache::new(),
            last_frame: FrameStats::default(),
        }
    }

    /// Replace the editor tuning from a (possibly partial) JSON object.
    pub fn set_config(&mut self, json: &str) -> String {
        outcome(EditorConfig::from_json(json).map(|config| self.engine.set_config(config)))
    }

    pub fn get_config(&self) -> String {
        outcome(self.engine.config().to_json())
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.engine.resize(width, height);
    }

    /// Draw one frame. Returns `{"drawn":n,"culled":n,"batches":n}`.
    pub fn render(&mut self, ctx: &CanvasRenderingContext2d, dpr: f64) -> String {
        let mut surface = Canvas2dSurface::new(ctx, &mut self.uploads);
        self.last_frame = self.engine.render(&mut surface, dpr);
        drop(surface);
        json!({
            "drawn": self.last_frame.drawn,
            "culled": self.last_frame.culled,
            "batches": self.last_frame.batches,
        })
        .to_string()
    }

    /// Advance timers: debounced containment and bulk generation. Returns
    /// whether a redraw is needed.
    pub fn tick(&mut self, now: f64) -> bool {
        self.engine.tick(now)
    }

    /// Whether settled edits happened since the last call.
    pub fn take_dirty(&mut self) -> bool {
        self.engine.take_dirty()
    }

    pub fn is_panning(&self, now: f64) -> bool {
        self.engine.is_panning(now)
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// `button` is the DOM `MouseEvent.button` value.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_down(
        &mut self,
        x: f64,
        y: f64,
        button: i16,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        now: f64,
    ) -> String {
        let event = InputEvent::PointerDown {
            x,
            y,
            button: PointerButton::from_dom(button),
            modifiers: modifiers(shift, ctrl, alt, meta),
        };
        self.dispatch(&event, now)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_move(
        &mut self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        now: f64,
    ) -> String {
        let event = InputEvent::pointer_move(x, y, modifiers(shift, ctrl, alt, meta));
        self.dispatch(&event, now)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_up(
        &mut self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        now: f64,
    ) -> String {
        let event = InputEvent::pointer_up(x, y, modifiers(shift, ctrl, alt, meta));
        self.dispatch(&event, now)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_double_click(
        &mut self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        now: f64,
    ) -> String {
        let event = InputEvent::DoubleClick {
            x,
            y,
            modifiers: modifiers(shift, ctrl, alt, meta),
        };
        self.dispatch(&event, now)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_wheel(
        &mut self,
        x: f64,
        y: f64,
        dx: f64,
        dy: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        now: f64,
    ) -> String {
        let event = InputEvent::Wheel {
            x,
            y,
            dx,
            dy,
            modifiers: modifiers(shift, ctrl, alt, meta),
        };
        self.dispatch(&event, now)
    }

    /// `key` is the DOM `KeyboardEvent.key` value.
    pub fn handle_key_down(
        &mut self,
        key: &str,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        now: f64,
    ) -> String {
        let event = InputEvent::key_down(key, modifiers(shift, ctrl, alt, meta));
        self.dispatch(&event, now)
    }

    pub fn handle_key_up(
        &mut self,
        key: &str,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        now: f64,
    ) -> String {
        let event = InputEvent::KeyUp {
            key: key.to_string(),
            modifiers: modifiers(shift, ctrl, alt, meta),
        };
        self.dispatch(&event, now)
    }

    // ─── Tools ───────────────────────────────────────────────────────────

    pub fn get_tool(&self) -> String {
        self.engine.tool().name().to_string()
    }

    /// Switch tools by name (`select`, `rect`, `ellipse`, ...).
    pub fn set_tool(&mut self, name: &str) -> String {
        let Some(tool) = ToolKind::from_name(name) else {
            return failure(format!("unknown tool: {name}"));
        };
        let tool_name = tool.name();
        outcome(
            self.engine
                .set_tool(tool)
                .map(|r| response_value(r, tool_name)),
        )
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        self.engine.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.engine.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.engine.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.engine.can_redo()
    }

    // ─── Elements and selection ──────────────────────────────────────────

    /// Topmost element id under a canvas-local point.
    pub fn element_at(&self, x: f64, y: f64) -> Option<String> {
        self.engine.element_at(x, y).map(|id| id.as_str().to_string())
    }

    /// One element as JSON, or `null` when unknown.
    pub fn get_element(&self, id: &str) -> String {
        self.engine
            .scene()
            .get(ElementId::intern(id))
            .and_then(|el| serde_json::to_string(el).ok())
            .unwrap_or_else(|| "null".to_string())
    }

    /// Element ids in z-order, bottom first, as a JSON array.
    pub fn element_ids(&self) -> String {
        ids_json(&self.engine.scene().order())
    }

    pub fn element_count(&self) -> usize {
        self.engine.scene().len()
    }

    pub fn get_selection(&self) -> String {
        ids_json(self.engine.scene().selection())
    }

    /// Select ids from a JSON array of strings.
    pub fn select(&mut self, ids_json: &str) -> String {
        let ids: Vec<String> = match serde_json::from_str(ids_json) {
            Ok(ids) => ids,
            Err(err) => return failure(format!("expected an array of ids: {err}")),
        };
        let ids: Vec<ElementId> = ids.iter().map(|id| ElementId::intern(id)).collect();
        let changed = self.engine.select(&ids);
        success(json!({ "changed": changed }))
    }

    pub fn select_all(&mut self) -> bool {
        self.engine.select_all()
    }

    pub fn insert_element(&mut self, json: &str) -> String {
        match serde_json::from_str::<Element>(json) {
            Ok(element) => outcome(self.engine.insert_element(element)),
            Err(err) => failure(format!("invalid element: {err}")),
        }
    }

    pub fn update_element(&mut self, json: &str) -> String {
        match serde_json::from_str::<Element>(json) {
            Ok(element) => outcome(self.engine.update_element(element)),
            Err(err) => failure(format!("invalid element: {err}")),
        }
    }

    pub fn delete_selection(&mut self) -> String {
        outcome(self.engine.delete_selection())
    }

    pub fn nudge(&mut self, dx: f64, dy: f64) -> String {
        outcome(self.engine.nudge(dx, dy))
    }

    /// `op` is one of `bring-to-front`, `send-to-back`, `bring-forward`,
    /// `send-backward`.
    pub fn reorder_selection(&mut self, op: &str) -> String {
        match parse_name::<ReorderOp>(op) {
            Some(op) => outcome(self.engine.reorder_selection(op)),
            None => failure(format!("unknown reorder op: {op}")),
        }
    }

    /// Group the selection. Answers with the new group id.
    pub fn group_selection(&mut self) -> String {
        outcome(
            self.engine
                .group_selection()
                .map(|id| id.as_str().to_string()),
        )
    }

    pub fn ungroup_selection(&mut self) -> String {
        outcome(self.engine.ungroup_selection())
    }

    pub fn copy(&mut self) -> bool {
        self.engine.copy()
    }

    pub fn cut(&mut self) -> String {
        outcome(self.engine.cut())
    }

    pub fn paste(&mut self) -> String {
        outcome(self.engine.paste())
    }

    pub fn duplicate_selection(&mut self) -> String {
        outcome(self.engine.duplicate_selection())
    }

    // ─── Text ────────────────────────────────────────────────────────────

    pub fn set_text_content(&mut self, id: &str, content: &str) -> String {
        outcome(self.engine.set_text_content(ElementId::intern(id), content))
    }

    /// Enter text editing on `id`; the host shows its text overlay.
    pub fn edit_text(&mut self, id: &str) -> String {
        let tool = self.engine.tool().name();
        outcome(
            self.engine
                .edit_text(ElementId::intern(id))
                .map(|r| response_value(r, tool)),
        )
    }

    /// Id of the text element being edited, if any.
    pub fn editing_text(&self) -> Option<String> {
        self.engine
            .interaction()
            .editing()
            .map(|id| id.as_str().to_string())
    }

    // ─── Paths ───────────────────────────────────────────────────────────

    pub fn insert_path_point(&mut self, id: &str) -> String {
        outcome(self.engine.insert_path_point(ElementId::intern(id)))
    }

    pub fn insert_point_in_segment(&mut self, id: &str, index: usize) -> String {
        outcome(
            self.engine
                .insert_point_in_segment(ElementId::intern(id), index),
        )
    }

    pub fn remove_path_point(&mut self, id: &str, index: usize) -> String {
        outcome(self.engine.remove_path_point(ElementId::intern(id), index))
    }

    pub fn move_path_point(&mut self, id: &str, index: usize, dx: f64, dy: f64) -> String {
        outcome(
            self.engine
                .move_path_point(ElementId::intern(id), index, dx, dy),
        )
    }

    pub fn move_path_handle(&mut self, id: &str, index: usize, handle: usize, x: f64, y: f64) -> String {
        outcome(
            self.engine
                .move_path_handle(ElementId::intern(id), index, handle, x, y),
        )
    }

    /// `kind` is `quadratic`, `cubic` or `smooth`.
    pub fn convert_segment(&mut self, id: &str, index: usize, kind: &str) -> String {
        match parse_name::<CurveKind>(kind) {
            Some(kind) => outcome(
                self.engine
                    .convert_segment(ElementId::intern(id), index, kind),
            ),
            None => failure(format!("unknown curve kind: {kind}")),
        }
    }

    pub fn convert_to_straight(&mut self, id: &str, index: usize) -> String {
        outcome(self.engine.convert_to_straight(ElementId::intern(id), index))
    }

    pub fn toggle_path_closed(&mut self, id: &str) -> String {
        outcome(self.engine.toggle_path_closed(ElementId::intern(id)))
    }

    pub fn split_path(&mut self, id: &str, index: usize) -> String {
        outcome(self.engine.split_path(ElementId::intern(id), index))
    }

    pub fn join_paths(&mut self, a: &str, b: &str) -> String {
        outcome(
            self.engine
                .join_paths(ElementId::intern(a), ElementId::intern(b)),
        )
    }

    /// `op` is `union`, `intersection`, `difference` or `exclusion`.
    pub fn boolean(&mut self, a: &str, b: &str, op: &str) -> String {
        match parse_name::<BooleanOp>(op) {
            Some(op) => outcome(
                self.engine
                    .boolean(ElementId::intern(a), ElementId::intern(b), op),
            ),
            None => failure(format!("unknown boolean op: {op}")),
        }
    }

    // ─── Camera ──────────────────────────────────────────────────────────

    pub fn get_zoom(&self) -> f64 {
        self.engine.viewport().zoom
    }

    /// `{"x":..,"y":..}` screen offset of the scene origin.
    pub fn get_pan(&self) -> String {
        let pan = self.engine.viewport().pan;
        json!({ "x": pan.x, "y": pan.y }).to_string()
    }

    pub fn zoom_in(&mut self) -> bool {
        self.engine.zoom_in()
    }

    pub fn zoom_out(&mut self) -> bool {
        self.engine.zoom_out()
    }

    pub fn zoom_reset(&mut self) -> bool {
        self.engine.zoom_reset()
    }

    pub fn zoom_to_fit(&mut self) -> bool {
        self.engine.zoom_to_fit()
    }

    pub fn zoom_at(&mut self, x: f64, y: f64, zoom: f64) {
        self.engine.zoom_at(x, y, zoom);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.engine.pan_by(dx, dy);
    }

    // ─── Islands ─────────────────────────────────────────────────────────

    pub fn get_islands(&mut self) -> String {
        let islands: Vec<serde_json::Value> = self.engine.islands().iter().map(island_value).collect();
        serde_json::Value::Array(islands).to_string()
    }

    /// Frame the next island. Answers with the island or `null`.
    pub fn next_island(&mut self) -> String {
        self.engine
            .next_island()
            .map_or_else(|| "null".to_string(), |island| island_value(&island).to_string())
    }

    pub fn previous_island(&mut self) -> String {
        self.engine
            .previous_island()
            .map_or_else(|| "null".to_string(), |island| island_value(&island).to_string())
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    pub fn get_document_name(&self) -> String {
        self.engine.document_name().to_string()
    }

    pub fn set_document_name(&mut self, name: &str) {
        self.engine.set_document_name(name);
    }

    /// The document as `.clise` JSON.
    pub fn export_document(&self) -> String {
        outcome(self.engine.export())
    }

    /// Merge a `.clise` file. Answers with the number of elements added.
    pub fn import_document(&mut self, json: &str) -> String {
        outcome(self.engine.import(json))
    }

    /// Full session snapshot as JSON.
    pub fn save_json(&self) -> String {
        outcome(self.engine.save_json())
    }

    pub fn load_json(&mut self, json: &str) -> String {
        outcome(self.engine.load_json(json))
    }

    /// Compact MessagePack snapshot; empty on failure.
    pub fn save_bytes(&self) -> Vec<u8> {
        self.engine.save_bytes().unwrap_or_else(|err| {
            log::warn!("wasm: snapshot encode failed: {err}");
            Vec::new()
        })
    }

    pub fn load_bytes(&mut self, bytes: &[u8]) -> String {
        outcome(self.engine.load_bytes(bytes))
    }

    // ─── Bulk generation ─────────────────────────────────────────────────

    /// Start streaming synthetic elements in; see `GeneratorOptions` for
    /// the accepted fields. An empty string uses the defaults.
    pub fn start_generation(&mut self, options_json: &str) -> String {
        let options = if options_json.trim().is_empty() {
            Ok(GeneratorOptions::default())
        } else {
            serde_json::from_str::<GeneratorOptions>(options_json)
        };
        match options {
            Ok(options) => {
                self.engine.start_generation(options);
                success(json!(null))
            }
            Err(err) => failure(format!("invalid generator options: {err}")),
        }
    }

    pub fn is_generating(&self) -> bool {
        self.engine.is_generating()
    }

    // ─── Assets ──────────────────────────────────────────────────────────

    /// Image sources the renderer wants, as a JSON array. The host fetches
    /// and decodes each, then calls `image_loaded` or `image_failed`.
    pub fn take_image_requests(&mut self) -> String {
        let keys = self.engine.renderer_mut().images().take_requests();
        serde_json::Value::from(keys).to_string()
    }

    /// Hand over decoded RGBA8 pixels for `key`.
    pub fn image_loaded(&mut self, key: &str, width: u32, height: u32, rgba: Vec<u8>) -> bool {
        let Some(bitmap) = Bitmap::new(width, height, rgba) else {
            log::warn!("wasm: bitmap for {key} has the wrong size");
            self.engine
                .renderer_mut()
                .images()
                .fail(key, "pixel buffer does not match dimensions");
            return false;
        };
        self.engine.renderer_mut().images().complete(key, bitmap)
    }

    pub fn image_failed(&mut self, key: &str, reason: &str) {
        self.engine.renderer_mut().images().fail(key, reason);
    }

    /// Font families that still need loading, as a JSON array.
    pub fn take_font_requests(&mut self) -> String {
        let families = self.engine.renderer_mut().fonts().take_pending();
        serde_json::Value::from(families).to_string()
    }

    pub fn font_loaded(&mut self, family: &str) {
        self.engine.renderer_mut().fonts().mark_loaded(family);
    }

    pub fn font_failed(&mut self, family: &str) {
        self.engine.renderer_mut().fonts().mark_failed(family);
    }

    /// Whether a finished asset load needs a frame.
    pub fn take_redraw_request(&mut self) -> bool {
        self.engine.renderer_mut().take_redraw_request()
    }
}

impl CliseCanvas {
    fn dispatch(&mut self, event: &InputEvent, now: f64) -> String {
        let response = self.engine.handle_event(event, now);
        response_value(response, self.engine.tool().name()).to_string()
    }
}

// ─── JSON helpers ────────────────────────────────────────────────────────

fn modifiers(shift: bool, ctrl: bool, alt: bool, meta: bool) -> Modifiers {
    Modifiers {
        shift,
        ctrl,
        alt,
        meta,
    }
}

fn response_value(response: Response, tool: &str) -> serde_json::Value {
    json!({
        "handled": response.handled,
        "redraw": response.redraw,
        "committed": response.committed,
        "toolChanged": response.tool_changed,
        "tool": tool,
    })
}

fn island_value(island: &Island) -> serde_json::Value {
    json!({
        "id": island.id,
        "elements": island.elements,
        "bounds": island.bounds,
        "center": island.center,
        "elementCount": island.element_count,
    })
}

fn ids_json(ids: &[ElementId]) -> String {
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}

/// Parse a kebab/lowercase enum name through its serde representation.
fn parse_name<T: DeserializeOwned>(name: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::from(name)).ok()
}

fn success(value: serde_json::Value) -> String {
    json!({ "ok": true, "value": value }).to_string()
}

fn failure(error: String) -> String {
    log::warn!("wasm: {error}");
    json!({ "ok": false, "error": error }).to_string()
}

fn outcome<T: Serialize>(result: Result<T, EngineError>) -> String {
    match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(value) => success(value),
            Err(err) => failure(format!("serialization error: {err}")),
        },
        Err(err) => failure(err.to_string()),
    }
}

// ─── Logging and panics ──────────────────────────────────────────────────

/// Routes `log` records to the browser console.
struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        #[cfg(target_arch = "wasm32")]
        {
            let msg = format!("[clise {}] {}", record.level(), record.args());
            match record.level() {
                log::Level::Error => web_sys::console::error_1(&msg.into()),
                log::Level::Warn => web_sys::console::warn_1(&msg.into()),
                _ => web_sys::console::log_1(&msg.into()),
            }
        }
    }

    fn flush(&self) {}
}

fn init_logging() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Warn);
    }
}

/// Change console verbosity: `error`, `warn`, `info`, `debug`, `trace` or
/// `off`.
#[wasm_bindgen]
pub fn set_log_level(level: &str) -> bool {
    match level.parse::<log::LevelFilter>() {
        Ok(filter) => {
            log::set_max_level(filter);
            true
        }
        Err(_) => false,
    }
}

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Clise WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone functions (no canvas needed) ─────────────────────────────

/// Check a `.clise` file without loading it. Answers with
/// `{"ok":true,"value":{"elements":n,"groups":n,"skipped":n}}`.
#[wasm_bindgen]
pub fn validate_document(json: &str) -> String {
    match clise_core::import_document(json) {
        Ok(doc) => success(json!({
            "elements": doc.elements.len(),
            "groups": doc.groups.len(),
            "skipped": doc.skipped,
        })),
        Err(err) => failure(err.to_string()),
    }
}

/// Names of every tool, in toolbar order, as a JSON array.
#[wasm_bindgen]
pub fn tool_names() -> String {
    let names: Vec<&str> = ToolKind::ALL.iter().map(|t| t.name()).collect();
    serde_json::Value::from(names).to_string()
}
