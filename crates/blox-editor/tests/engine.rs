//! Integration tests: sync engine (blox-editor ↔ blox-core ↔ blox-render).
//!
//! Mutations, renderer swaps, and the variable/procedure bridge, checked
//! through the engine's public surface.

use blox_core::{
    Block, BlockId, ConnectionRef, Field, IconKind, Icon, Input, Position, ProcedureModel,
    Slot, Workspace,
};
use blox_editor::{BlockMutation, EngineError, SyncEngine};
use blox_render::RendererRegistry;
use pretty_assertions::assert_eq;

fn engine() -> SyncEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    SyncEngine::new(Workspace::new(), RendererRegistry::with_builtins(), "geras").unwrap()
}

fn add(engine: &mut SyncEngine, block: Block) -> BlockId {
    let id = block.id;
    engine.apply_mutation(BlockMutation::AddBlock(block)).unwrap();
    id
}

fn repeat(name: &str) -> Block {
    Block::statement(BlockId::intern(name), "controls_repeat")
        .with_input(Input::dummy("").with_field(Field::label("repeat")))
        .and_then(|b| b.with_input(Input::value("TIMES").with_check(["Number"])))
        .and_then(|b| b.with_input(Input::statement("DO")))
        .unwrap()
}

fn number(name: &str, value: f64) -> Block {
    Block::value(BlockId::intern(name), "math_number", ["Number"])
        .with_input(Input::dummy("").with_field(Field::number("NUM", value)))
        .unwrap()
}

fn connect(engine: &mut SyncEngine, a: ConnectionRef, b: ConnectionRef) -> Result<(), EngineError> {
    engine.apply_mutation(BlockMutation::Connect { a, b })
}

// ─── Renderer swap ───────────────────────────────────────────────────────

#[test]
fn renderer_swap_changes_geometry_not_model() {
    let mut engine = engine();
    let loop_id = add(&mut engine, repeat("swap_repeat"));
    let num = add(&mut engine, number("swap_num", 3.0));
    connect(
        &mut engine,
        ConnectionRef::new(num, Slot::Output),
        ConnectionRef::new(loop_id, Slot::Input(1)),
    )
    .unwrap();

    let model_before = engine.workspace.snapshot().unwrap();
    let element = engine.path_object(loop_id).unwrap().element;
    let geras = engine.drawing(loop_id).unwrap().clone();

    engine.set_renderer("zelos").unwrap();

    assert_eq!(engine.workspace.snapshot().unwrap(), model_before);
    assert_eq!(engine.renderer().name(), "zelos");
    let zelos = engine.drawing(loop_id).unwrap();
    assert_ne!(zelos.outline, geras.outline);
    let path = engine.path_object(loop_id).unwrap();
    assert_eq!(path.element, element);
    assert!(path.has_class("blox-zelos-renderer"));
    assert!(!path.has_class("blox-geras-renderer"));
}

#[test]
fn unknown_renderer_leaves_engine_alone() {
    let mut engine = engine();
    add(&mut engine, repeat("swap_unknown"));
    assert!(matches!(
        engine.set_renderer("thrasos"),
        Err(EngineError::Render(_))
    ));
    assert_eq!(engine.renderer().name(), "geras");
}

// ─── Connections ─────────────────────────────────────────────────────────

#[test]
fn refused_connection_changes_nothing() {
    let mut engine = engine();
    let loop_id = add(&mut engine, repeat("refuse_repeat"));
    let num = add(&mut engine, number("refuse_num", 1.0));
    let before = engine.workspace.snapshot().unwrap();
    let drawing = engine.drawing(loop_id).unwrap().clone();

    let result = connect(
        &mut engine,
        ConnectionRef::new(num, Slot::Output),
        ConnectionRef::new(loop_id, Slot::Input(2)),
    );
    assert!(matches!(result, Err(EngineError::Connect(_))));
    assert_eq!(engine.workspace.snapshot().unwrap(), before);
    assert_eq!(engine.drawing(loop_id).unwrap(), &drawing);
}

#[test]
fn plugging_a_child_rerenders_the_parent() {
    let mut engine = engine();
    let loop_id = add(&mut engine, repeat("plug_repeat"));
    let body = add(
        &mut engine,
        Block::statement(BlockId::intern("plug_body"), "beep")
            .with_input(Input::dummy("").with_field(Field::label("beep")))
            .unwrap(),
    );
    let empty_height = engine.drawing(loop_id).unwrap().height;
    connect(
        &mut engine,
        ConnectionRef::new(loop_id, Slot::Input(2)),
        ConnectionRef::new(body, Slot::Previous),
    )
    .unwrap();
    assert!(engine.drawing(loop_id).unwrap().height > empty_height);

    engine
        .apply_mutation(BlockMutation::Disconnect { child: body })
        .unwrap();
    assert_eq!(engine.drawing(loop_id).unwrap().height, empty_height);
}

#[test]
fn child_is_placed_on_parent_connection() {
    let mut engine = engine();
    let top = add(&mut engine, Block::statement(BlockId::intern("place_top"), "a"));
    let below = add(&mut engine, Block::statement(BlockId::intern("place_below"), "b"));
    engine
        .apply_mutation(BlockMutation::Move {
            id: top,
            position: Position { x: 10.0, y: 20.0 },
        })
        .unwrap();
    connect(
        &mut engine,
        ConnectionRef::new(top, Slot::Next),
        ConnectionRef::new(below, Slot::Previous),
    )
    .unwrap();

    let next = engine.render_info(top).unwrap().connection(Slot::Next).unwrap();
    let origin = engine.block_origin(below).unwrap();
    assert_eq!(origin.x, 10.0);
    assert!((origin.y - (20.0 + next.y)).abs() < 0.01);

    let svg = engine.render_svg();
    assert!(svg.contains(r#"data-type="a" transform="translate(10,20)""#));
    assert_eq!(svg.matches("class=\"blox-block\"").count(), 2);
}

#[test]
fn displaced_shadow_leaves_no_render_state() {
    let mut engine = engine();
    let loop_id = add(&mut engine, repeat("shadow_repeat"));
    let mut default_count = number("shadow_count", 10.0);
    default_count.shadow = true;
    let shadow = add(&mut engine, default_count);
    connect(
        &mut engine,
        ConnectionRef::new(loop_id, Slot::Input(1)),
        ConnectionRef::new(shadow, Slot::Output),
    )
    .unwrap();
    assert!(engine.path_object(shadow).is_some());

    let real = add(&mut engine, number("shadow_replacement", 3.0));
    connect(
        &mut engine,
        ConnectionRef::new(loop_id, Slot::Input(1)),
        ConnectionRef::new(real, Slot::Output),
    )
    .unwrap();

    assert!(!engine.workspace.contains(shadow));
    assert!(engine.path_object(shadow).is_none());
    assert!(engine.drawing(shadow).is_none());
    assert!(engine.render_info(shadow).is_none());
    assert!(!engine.render_svg().contains(r#"data-block="shadow_count""#));
    assert_eq!(engine.workspace.target_block(ConnectionRef::new(loop_id, Slot::Input(1))), Some(real));
}

// ─── Block state ─────────────────────────────────────────────────────────

#[test]
fn insertion_markers_carry_their_class() {
    let mut engine = engine();
    let mut preview = Block::statement(BlockId::intern("marker_preview"), "beep");
    preview.insertion_marker = true;
    let id = add(&mut engine, preview);
    assert!(engine.path_object(id).unwrap().has_class("blox-insertion-marker"));
}

#[test]
fn collapsing_hides_inputs_but_not_next() {
    let mut engine = engine();
    let loop_id = add(&mut engine, repeat("fold_repeat"));
    let num = add(&mut engine, number("fold_num", 5.0));
    let after = add(&mut engine, Block::statement(BlockId::intern("fold_after"), "after"));
    connect(
        &mut engine,
        ConnectionRef::new(num, Slot::Output),
        ConnectionRef::new(loop_id, Slot::Input(1)),
    )
    .unwrap();
    connect(
        &mut engine,
        ConnectionRef::new(loop_id, Slot::Next),
        ConnectionRef::new(after, Slot::Previous),
    )
    .unwrap();

    engine
        .apply_mutation(BlockMutation::SetCollapsed {
            id: loop_id,
            collapsed: true,
        })
        .unwrap();
    assert_eq!(engine.render_info(loop_id).unwrap().input_rows().count(), 1);
    assert!(engine.path_object(loop_id).unwrap().has_class("blox-collapsed"));
    let svg = engine.render_svg();
    assert!(!svg.contains("data-type=\"math_number\""));
    assert!(svg.contains("data-type=\"after\""));
    assert!(svg.contains("repeat 5 ?"));
}

#[test]
fn disabling_a_parent_disables_children() {
    let mut engine = engine();
    let loop_id = add(&mut engine, repeat("off_repeat"));
    let num = add(&mut engine, number("off_num", 2.0));
    connect(
        &mut engine,
        ConnectionRef::new(num, Slot::Output),
        ConnectionRef::new(loop_id, Slot::Input(1)),
    )
    .unwrap();
    engine
        .apply_mutation(BlockMutation::SetEnabled {
            id: loop_id,
            enabled: false,
        })
        .unwrap();
    assert!(engine.path_object(num).unwrap().has_class("blox-disabled"));
}

#[test]
fn duplicate_icon_is_reported() {
    let mut engine = engine();
    let id = add(&mut engine, repeat("icon_repeat"));
    let width = engine.drawing(id).unwrap().width;
    engine
        .apply_mutation(BlockMutation::AddIcon {
            id,
            icon: Icon::new(IconKind::Comment),
        })
        .unwrap();
    assert!(engine.drawing(id).unwrap().width > width);
    let err = engine
        .apply_mutation(BlockMutation::AddIcon {
            id,
            icon: Icon::new(IconKind::Comment),
        })
        .unwrap_err();
    assert!(matches!(err, EngineError::Block(_)));
}

#[test]
fn error_state_and_debug_overlay() {
    let mut engine = engine();
    let id = add(&mut engine, repeat("debug_repeat"));
    engine.set_error(id, true);
    assert!(engine.path_object(id).unwrap().has_class("blox-error"));
    engine.set_error(id, false);
    assert!(!engine.path_object(id).unwrap().has_class("blox-error"));
    let overlay = engine.debug_svg(id).unwrap();
    assert!(overlay.contains("blox-debug-row"));
}

// ─── Variable & procedure bridge ─────────────────────────────────────────

#[test]
fn renaming_a_variable_rerenders_its_users() {
    let mut engine = engine();
    let var = engine.add_variable("i", "").unwrap();
    let id = add(
        &mut engine,
        Block::value(BlockId::intern("var_get"), "variables_get", Vec::<String>::new())
            .with_input(Input::dummy("").with_field(Field::variable("VAR", var, "?")))
            .unwrap(),
    );
    assert_eq!(
        engine.workspace.get(id).unwrap().get_field("VAR").unwrap().display_text(),
        "i"
    );
    let narrow = engine.drawing(id).unwrap().width;

    assert!(engine.rename_variable(var, "a_much_longer_counter").unwrap());
    let field = engine.workspace.get(id).unwrap().get_field("VAR").unwrap();
    assert_eq!(field.display_text(), "a_much_longer_counter");
    assert!(engine.drawing(id).unwrap().width > narrow);
}

#[test]
fn deleting_a_variable_disposes_its_users() {
    let mut engine = engine();
    let var = engine.add_variable("item", "").unwrap();
    let id = add(
        &mut engine,
        Block::value(BlockId::intern("var_doomed"), "variables_get", Vec::<String>::new())
            .with_input(Input::dummy("").with_field(Field::variable("VAR", var, "item")))
            .unwrap(),
    );
    assert!(engine.delete_variable(var).unwrap());
    assert!(!engine.workspace.contains(id));
    assert!(engine.path_object(id).is_none());
    assert!(engine.variables().get(var).is_none());
    assert!(!engine.delete_variable(var).unwrap());
}

#[test]
fn renaming_a_procedure_updates_callers() {
    let mut engine = engine();
    let proc_id = blox_core::ModelId::intern("proc_draw");
    engine
        .add_procedure(ProcedureModel::new(proc_id, "draw"))
        .unwrap();
    let call = add(
        &mut engine,
        Block::statement(BlockId::intern("proc_call"), "procedures_call")
            .with_input(Input::dummy("").with_field(Field::procedure("NAME", proc_id, "draw")))
            .unwrap(),
    );
    engine.rename_procedure(proc_id, "draw_square").unwrap();
    assert_eq!(
        engine
            .workspace
            .get(call)
            .unwrap()
            .get_field("NAME")
            .unwrap()
            .display_text(),
        "draw_square"
    );
    assert_eq!(engine.procedures().get_procedures().len(), 1);
}
