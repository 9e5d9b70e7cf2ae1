//! Integration tests: the canvas engine driven through its public API and
//! normalized input events.

use clise_core::model::ElementKind;
use clise_core::{Element, ElementId, Point, ReorderOp};
use clise_editor::{CanvasEngine, GeneratorOptions, InputEvent, Modifiers, ToolKind};
use pretty_assertions::assert_eq;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn id(s: &str) -> ElementId {
    ElementId::intern(s)
}

fn engine_with(elements: Vec<Element>) -> CanvasEngine {
    let mut engine = CanvasEngine::new(800.0, 600.0);
    for el in elements {
        engine.insert_element(el).unwrap();
    }
    engine
}

fn click(engine: &mut CanvasEngine, x: f64, y: f64, now: f64) {
    engine.handle_event(&InputEvent::pointer_down(x, y, Modifiers::NONE), now);
    engine.handle_event(&InputEvent::pointer_up(x, y, Modifiers::NONE), now);
}

fn drag(engine: &mut CanvasEngine, from: (f64, f64), to: (f64, f64), now: f64) {
    engine.handle_event(&InputEvent::pointer_down(from.0, from.1, Modifiers::NONE), now);
    let mid = ((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0);
    engine.handle_event(&InputEvent::pointer_move(mid.0, mid.1, Modifiers::NONE), now);
    engine.handle_event(&InputEvent::pointer_move(to.0, to.1, Modifiers::NONE), now);
    engine.handle_event(&InputEvent::pointer_up(to.0, to.1, Modifiers::NONE), now);
}

// ─── Undo / redo ─────────────────────────────────────────────────────────

#[test]
fn bring_to_front_then_undo_restores_order() {
    init_logger();
    let mut engine = engine_with(vec![
        Element::rect("en_a", 0.0, 0.0, 10.0, 10.0),
        Element::rect("en_b", 20.0, 0.0, 10.0, 10.0),
        Element::rect("en_c", 40.0, 0.0, 10.0, 10.0),
    ]);
    engine.select(&[id("en_a")]);
    assert!(engine.reorder_selection(ReorderOp::BringToFront).unwrap());
    assert_eq!(engine.scene().order(), vec![id("en_b"), id("en_c"), id("en_a")]);

    assert!(engine.undo());
    assert_eq!(engine.scene().order(), vec![id("en_a"), id("en_b"), id("en_c")]);
    assert!(engine.redo());
    assert_eq!(engine.scene().order(), vec![id("en_b"), id("en_c"), id("en_a")]);
}

#[test]
fn a_drag_is_one_undo_step() {
    init_logger();
    let mut engine = engine_with(vec![Element::rect("en_drag", 0.0, 0.0, 100.0, 100.0)]);
    let steps = engine.document().history.undo_len();
    drag(&mut engine, (50.0, 50.0), (150.0, 90.0), 0.0);

    let el = engine.scene().get(id("en_drag")).unwrap();
    assert_eq!((el.x, el.y), (100.0, 40.0));
    assert_eq!(engine.document().history.undo_len(), steps + 1);

    engine.undo();
    let el = engine.scene().get(id("en_drag")).unwrap();
    assert_eq!((el.x, el.y), (0.0, 0.0));
}

#[test]
fn undoing_a_drag_keeps_content_generated_afterwards() {
    init_logger();
    let mut engine = engine_with(vec![Element::rect("en_kept", 0.0, 0.0, 100.0, 100.0)]);
    drag(&mut engine, (50.0, 50.0), (150.0, 90.0), 0.0);
    engine.start_generation(GeneratorOptions {
        count: 20,
        ..GeneratorOptions::default()
    });
    let mut now = 16.0;
    while engine.is_generating() {
        engine.tick(now);
        now += 16.0;
    }
    // Let the containment pass that follows generation run too.
    engine.tick(now + 200.0);
    assert_eq!(engine.scene().len(), 21);

    assert!(engine.undo());
    assert_eq!(engine.scene().len(), 21);
    let el = engine.scene().get(id("en_kept")).unwrap();
    assert_eq!((el.x, el.y), (0.0, 0.0));

    assert!(engine.redo());
    assert_eq!(engine.scene().len(), 21);
    let el = engine.scene().get(id("en_kept")).unwrap();
    assert_eq!((el.x, el.y), (100.0, 40.0));
}

#[test]
fn undoing_a_drag_keeps_containment_of_other_elements() {
    init_logger();
    let mut engine = engine_with(vec![
        Element::frame("en_host", 0.0, 0.0, 300.0, 300.0),
        Element::rect("en_guest", 100.0, 100.0, 50.0, 50.0),
        Element::rect("en_moved", 600.0, 0.0, 50.0, 50.0),
    ]);
    assert_eq!(engine.scene().get(id("en_guest")).unwrap().parent_id, None);
    drag(&mut engine, (625.0, 25.0), (675.0, 25.0), 0.0);
    engine.tick(200.0);
    assert_eq!(
        engine.scene().get(id("en_guest")).unwrap().parent_id,
        Some(id("en_host"))
    );

    assert!(engine.undo());
    assert_eq!(engine.scene().get(id("en_moved")).unwrap().x, 600.0);
    assert_eq!(
        engine.scene().get(id("en_guest")).unwrap().parent_id,
        Some(id("en_host"))
    );
}

#[test]
fn generation_waits_for_an_open_gesture() {
    init_logger();
    let mut engine = engine_with(vec![Element::rect("en_hold", 0.0, 0.0, 100.0, 100.0)]);
    engine.start_generation(GeneratorOptions {
        count: 10,
        chunk_size: 10,
        ..GeneratorOptions::default()
    });
    engine.handle_event(&InputEvent::pointer_down(50.0, 50.0, Modifiers::NONE), 0.0);
    engine.handle_event(&InputEvent::pointer_move(80.0, 50.0, Modifiers::NONE), 0.0);
    engine.tick(16.0);
    assert_eq!(engine.scene().len(), 1);

    engine.handle_event(&InputEvent::pointer_up(80.0, 50.0, Modifiers::NONE), 20.0);
    engine.tick(32.0);
    assert_eq!(engine.scene().len(), 11);
    assert!(engine.undo());
    assert_eq!(engine.scene().len(), 11);
}

#[test]
fn delete_then_undo_restores_group() {
    init_logger();
    let mut engine = engine_with(vec![
        Element::rect("en_g1", 0.0, 0.0, 10.0, 10.0),
        Element::rect("en_g2", 20.0, 0.0, 10.0, 10.0),
    ]);
    engine.select(&[id("en_g1"), id("en_g2")]);
    let group = engine.group_selection().unwrap();
    assert_eq!(engine.scene().selection(), &[group]);

    assert!(engine.delete_selection().unwrap());
    assert!(engine.scene().is_empty());
    assert!(engine.scene().groups().is_empty());

    engine.undo();
    assert_eq!(engine.scene().len(), 2);
    assert_eq!(engine.scene().groups().len(), 1);
    assert!(engine.scene().group_of(id("en_g1")).is_some());
}

#[test]
fn keyboard_shortcuts_reach_the_engine() {
    init_logger();
    let mut engine = engine_with(vec![Element::rect("en_key", 0.0, 0.0, 10.0, 10.0)]);
    let cmd = Modifiers {
        meta: true,
        ..Modifiers::NONE
    };

    engine.handle_event(&InputEvent::key_down("ArrowRight", Modifiers::SHIFT), 0.0);
    assert_eq!(engine.scene().get(id("en_key")).unwrap().x, 10.0);

    engine.handle_event(&InputEvent::key_down("z", cmd), 0.0);
    assert_eq!(engine.scene().get(id("en_key")).unwrap().x, 0.0);

    engine.handle_event(&InputEvent::key_down("Delete", Modifiers::NONE), 0.0);
    assert!(engine.scene().is_empty());

    engine.handle_event(&InputEvent::key_down("r", Modifiers::NONE), 0.0);
    assert_eq!(engine.tool(), ToolKind::Rect);
}

// ─── Drawing and resizing ────────────────────────────────────────────────

#[test]
fn zero_drag_draw_is_floored_but_resize_can_flip() {
    init_logger();
    let mut engine = CanvasEngine::new(800.0, 600.0);
    engine.set_tool(ToolKind::Rect).unwrap();
    click(&mut engine, 300.0, 300.0, 0.0);
    let drawn = &engine.scene().elements()[0];
    assert_eq!((drawn.w, drawn.h), (1.0, 1.0));
    assert_eq!(engine.tool(), ToolKind::Select);

    engine
        .insert_element(Element::rect("en_flip", 0.0, 0.0, 100.0, 50.0))
        .unwrap();
    drag(&mut engine, (100.0, 25.0), (-50.0, 25.0), 0.0);
    let el = engine.scene().get(id("en_flip")).unwrap();
    assert_eq!((el.x, el.w, el.h), (0.0, -50.0, 50.0));
}

#[test]
fn box_select_picks_only_overlapping_elements() {
    init_logger();
    let mut engine = engine_with(vec![
        Element::rect("en_box_a", 10.0, 10.0, 50.0, 50.0),
        Element::rect("en_box_b", 200.0, 200.0, 50.0, 50.0),
    ]);
    engine.select(&[]);
    engine.handle_event(&InputEvent::pointer_down(0.0, 0.0, Modifiers::NONE), 0.0);
    engine.handle_event(&InputEvent::pointer_move(120.0, 120.0, Modifiers::NONE), 0.0);
    assert_eq!(engine.interaction().state().name(), "boxSelecting");
    assert_eq!(engine.scene().selection(), &[id("en_box_a")]);
    engine.handle_event(&InputEvent::pointer_up(120.0, 120.0, Modifiers::NONE), 0.0);
    assert_eq!(engine.scene().selection(), &[id("en_box_a")]);
}

// ─── Paths ───────────────────────────────────────────────────────────────

#[test]
fn clicking_near_the_first_point_closes_the_path() {
    init_logger();
    let mut engine = CanvasEngine::new(800.0, 600.0);
    engine.set_tool(ToolKind::Path).unwrap();
    click(&mut engine, 10.0, 10.0, 0.0);
    click(&mut engine, 110.0, 10.0, 0.0);
    click(&mut engine, 110.0, 110.0, 0.0);
    assert_eq!(engine.interaction().state().name(), "drawing");
    click(&mut engine, 12.0, 11.0, 0.0);

    assert!(engine.interaction().is_idle());
    assert_eq!(engine.tool(), ToolKind::Select);
    let path = &engine.scene().elements()[0];
    let ElementKind::Path { points, closed } = &path.kind else {
        panic!("not a path");
    };
    assert_eq!(points.len(), 3);
    assert!(*closed);
    assert_eq!((path.x, path.y), (10.0, 10.0));

    assert!(engine.undo());
    assert!(engine.scene().is_empty());
}

#[test]
fn double_click_finishes_an_open_path() {
    init_logger();
    let mut engine = CanvasEngine::new(800.0, 600.0);
    engine.set_tool(ToolKind::Path).unwrap();
    click(&mut engine, 0.0, 0.0, 0.0);
    click(&mut engine, 50.0, 50.0, 0.0);
    click(&mut engine, 50.0, 50.0, 0.0);
    engine.handle_event(
        &InputEvent::DoubleClick {
            x: 50.0,
            y: 50.0,
            modifiers: Modifiers::NONE,
        },
        0.0,
    );
    let ElementKind::Path { points, closed } = &engine.scene().elements()[0].kind else {
        panic!("not a path");
    };
    assert_eq!(points.len(), 2);
    assert!(!*closed);
}

#[test]
fn escape_discards_a_single_point_path() {
    init_logger();
    let mut engine = CanvasEngine::new(800.0, 600.0);
    engine.set_tool(ToolKind::Path).unwrap();
    click(&mut engine, 10.0, 10.0, 0.0);
    engine.handle_event(&InputEvent::key_down("Escape", Modifiers::NONE), 0.0);
    assert!(engine.scene().is_empty());
    assert!(!engine.can_undo());
    assert!(engine.interaction().is_idle());
}

// ─── Camera ──────────────────────────────────────────────────────────────

#[test]
fn zoom_at_keeps_pivot_fixed() {
    init_logger();
    let mut engine = CanvasEngine::new(800.0, 600.0);
    let before = engine.viewport().to_scene(Point::new(50.0, 50.0), Point::ZERO);
    engine.zoom_at(50.0, 50.0, 2.0);
    assert_eq!(engine.viewport().zoom, 2.0);
    let after = engine.viewport().to_scene(Point::new(50.0, 50.0), Point::ZERO);
    assert!((after.x - before.x).abs() < 1e-9);
    assert!((after.y - before.y).abs() < 1e-9);
}

#[test]
fn panning_indicator_decays() {
    init_logger();
    let mut engine = CanvasEngine::new(800.0, 600.0);
    engine.handle_event(
        &InputEvent::PointerDown {
            x: 100.0,
            y: 100.0,
            button: clise_editor::PointerButton::Middle,
            modifiers: Modifiers::NONE,
        },
        0.0,
    );
    assert!(engine.is_panning(0.0));
    engine.handle_event(&InputEvent::pointer_move(130.0, 120.0, Modifiers::NONE), 500.0);
    engine.handle_event(&InputEvent::pointer_up(130.0, 120.0, Modifiers::NONE), 510.0);
    assert_eq!(engine.viewport().pan, Point::new(30.0, 20.0));
    assert!(engine.is_panning(640.0));
    assert!(!engine.is_panning(651.0));
}

#[test]
fn middle_button_pans_out_of_a_drag() {
    init_logger();
    let mut engine = engine_with(vec![Element::rect("en_grab", 0.0, 0.0, 100.0, 100.0)]);
    engine.handle_event(&InputEvent::pointer_down(50.0, 50.0, Modifiers::NONE), 0.0);
    engine.handle_event(&InputEvent::pointer_move(70.0, 50.0, Modifiers::NONE), 10.0);
    let middle = InputEvent::PointerDown {
        x: 70.0,
        y: 50.0,
        button: clise_editor::PointerButton::Middle,
        modifiers: Modifiers::NONE,
    };
    engine.handle_event(&middle, 20.0);
    assert!(engine.is_panning(20.0));

    engine.handle_event(&InputEvent::pointer_move(170.0, 50.0, Modifiers::NONE), 30.0);
    assert_eq!(engine.viewport().pan, Point::new(100.0, 0.0));
    assert_eq!(engine.scene().get(id("en_grab")).unwrap().x, 20.0);

    engine.handle_event(&InputEvent::pointer_up(170.0, 50.0, Modifiers::NONE), 40.0);
    assert!(engine.undo());
    assert_eq!(engine.scene().get(id("en_grab")).unwrap().x, 0.0);
}

#[test]
fn islands_are_visited_in_reading_order() {
    init_logger();
    let mut engine = engine_with(vec![
        Element::rect("en_far", 2000.0, 2000.0, 50.0, 50.0),
        Element::rect("en_near", 0.0, 0.0, 50.0, 50.0),
    ]);
    assert_eq!(engine.islands().len(), 2);
    let first = engine.next_island().unwrap();
    assert_eq!(first.elements, vec![id("en_near")]);
    assert_eq!(engine.scene().selection(), &[id("en_near")]);
    let second = engine.next_island().unwrap();
    assert_eq!(second.elements, vec![id("en_far")]);
}

// ─── Maintenance and persistence ─────────────────────────────────────────

#[test]
fn containment_recomputes_after_the_debounce_window() {
    init_logger();
    let mut engine = engine_with(vec![
        Element::frame("en_frame", 0.0, 0.0, 300.0, 300.0),
        Element::rect("en_child", 400.0, 400.0, 50.0, 50.0),
    ]);
    drag(&mut engine, (425.0, 425.0), (125.0, 125.0), 1000.0);
    assert_eq!(engine.scene().get(id("en_child")).unwrap().parent_id, None);

    engine.tick(1050.0);
    assert_eq!(engine.scene().get(id("en_child")).unwrap().parent_id, None);

    engine.tick(1101.0);
    assert_eq!(
        engine.scene().get(id("en_child")).unwrap().parent_id,
        Some(id("en_frame"))
    );
}

#[test]
fn dirty_waits_for_the_gesture_to_end() {
    init_logger();
    let mut engine = engine_with(vec![Element::rect("en_dirty", 0.0, 0.0, 100.0, 100.0)]);
    assert!(engine.take_dirty());
    engine.handle_event(&InputEvent::pointer_down(50.0, 50.0, Modifiers::NONE), 0.0);
    engine.handle_event(&InputEvent::pointer_move(80.0, 50.0, Modifiers::NONE), 0.0);
    assert!(!engine.take_dirty());
    engine.handle_event(&InputEvent::pointer_up(80.0, 50.0, Modifiers::NONE), 0.0);
    assert!(engine.take_dirty());
    assert!(!engine.take_dirty());
}

#[test]
fn snapshot_round_trips_through_json_and_bytes() {
    init_logger();
    let mut engine = engine_with(vec![
        Element::rect("en_s1", 0.0, 0.0, 10.0, 10.0),
        Element::rect("en_s2", 20.0, 0.0, 10.0, 10.0),
    ]);
    engine.set_document_name("Board");
    engine.zoom_at(0.0, 0.0, 1.5);

    let json = engine.save_json().unwrap();
    let mut restored = CanvasEngine::new(800.0, 600.0);
    restored.load_json(&json).unwrap();
    assert_eq!(restored.scene(), engine.scene());
    assert_eq!(restored.viewport().zoom, 1.5);
    assert_eq!(restored.document_name(), "Board");
    assert!(!restored.can_undo());

    let bytes = engine.save_bytes().unwrap();
    let mut from_bytes = CanvasEngine::new(800.0, 600.0);
    from_bytes.load_bytes(&bytes).unwrap();
    assert_eq!(from_bytes.scene(), engine.scene());
}

#[test]
fn export_then_import_preserves_content() {
    init_logger();
    let mut engine = engine_with(vec![
        Element::rect("en_x1", 0.0, 0.0, 10.0, 10.0),
        Element::rect("en_x2", 20.0, 0.0, 10.0, 10.0),
    ]);
    engine.select(&[id("en_x1"), id("en_x2")]);
    engine.group_selection().unwrap();
    let json = engine.export().unwrap();

    let mut other = CanvasEngine::new(800.0, 600.0);
    assert_eq!(other.import(&json).unwrap(), 2);
    assert_eq!(other.scene().len(), 2);
    assert_eq!(other.scene().groups().len(), 1);
    let geometry = |e: &CanvasEngine| -> Vec<(f64, f64, f64, f64)> {
        e.scene()
            .elements()
            .iter()
            .map(|el| (el.x, el.y, el.w, el.h))
            .collect()
    };
    assert_eq!(geometry(&other), geometry(&engine));
    assert!(other.undo());
    assert!(other.scene().is_empty());
}

#[test]
fn bulk_generation_lands_one_chunk_per_tick() {
    init_logger();
    let mut engine = CanvasEngine::new(800.0, 600.0);
    engine.start_generation(GeneratorOptions {
        count: 30,
        chunk_size: 10,
        ..GeneratorOptions::default()
    });
    assert!(engine.tick(0.0));
    assert_eq!(engine.scene().len(), 10);
    engine.tick(16.0);
    engine.tick(32.0);
    assert_eq!(engine.scene().len(), 30);
    assert!(engine.is_generating());
    engine.tick(48.0);
    assert!(!engine.is_generating());
    assert!(!engine.can_undo());
}
