//! Integration tests: connection compatibility across the workspace.
//!
//! Every pair of connection types is tried in both argument orders, with
//! and without type checks and shadow flags.

use blox_core::{
    Block, BlockId, ConnectError, ConnectionRef, ConnectionType, Input, Slot, Workspace,
};
use pretty_assertions::assert_eq;

/// Build a block exposing a connection of `kind` and return its ref.
fn block_with(ws: &mut Workspace, name: &str, kind: ConnectionType, check: Option<&str>, shadow: bool) -> ConnectionRef {
    let id = BlockId::intern(name);
    let checks: Vec<&str> = check.into_iter().collect();
    let (mut block, slot) = match kind {
        ConnectionType::OutputValue => (Block::value(id, "value", checks), Slot::Output),
        ConnectionType::InputValue => {
            let input = match check {
                Some(c) => Input::value("IN").with_check([c]),
                None => Input::value("IN"),
            };
            (Block::new(id, "host").with_input(input).unwrap(), Slot::Input(0))
        }
        ConnectionType::NextStatement => (Block::statement(id, "stmt"), Slot::Next),
        ConnectionType::PreviousStatement => (Block::statement(id, "stmt"), Slot::Previous),
    };
    block.shadow = shadow;
    ws.add_block(block).unwrap();
    ConnectionRef::new(id, slot)
}

// ─── Symmetry ────────────────────────────────────────────────────────────

#[test]
fn can_connect_is_symmetric_for_all_type_pairs() {
    let checks = [None, Some("Number"), Some("String")];
    let shadows = [false, true];
    let mut ws = Workspace::new();
    let mut n = 0;
    for ka in ConnectionType::ALL {
        for kb in ConnectionType::ALL {
            for ca in checks {
                for cb in checks {
                    for sa in shadows {
                        for sb in shadows {
                            n += 1;
                            let a = block_with(&mut ws, &format!("sym_a_{n}"), ka, ca, sa);
                            let b = block_with(&mut ws, &format!("sym_b_{n}"), kb, cb, sb);
                            let ab = ws.can_connect(a, b);
                            let ba = ws.can_connect(b, a);
                            assert_eq!(
                                ab.is_ok(),
                                ba.is_ok(),
                                "asymmetric for {ka:?}/{ca:?}/{sa} vs {kb:?}/{cb:?}/{sb}: {ab:?} vs {ba:?}"
                            );
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn output_never_accepts_statement() {
    let mut ws = Workspace::new();
    let out = block_with(&mut ws, "rule_out", ConnectionType::OutputValue, None, false);
    for (i, kind) in [ConnectionType::NextStatement, ConnectionType::PreviousStatement]
        .into_iter()
        .enumerate()
    {
        let stmt = block_with(&mut ws, &format!("rule_stmt_{i}"), kind, None, false);
        assert!(matches!(
            ws.can_connect(out, stmt),
            Err(ConnectError::WrongType { .. })
        ));
        assert!(ws.connect(stmt, out).is_err());
    }
    assert_eq!(ws.top_blocks().len(), 3);
}

// ─── Linking ─────────────────────────────────────────────────────────────

#[test]
fn rejected_connect_leaves_workspace_untouched() {
    let mut ws = Workspace::new();
    let input = block_with(&mut ws, "rule_num_in", ConnectionType::InputValue, Some("Number"), false);
    let text = block_with(&mut ws, "rule_str_out", ConnectionType::OutputValue, Some("String"), false);
    let before = ws.snapshot().unwrap();
    assert_eq!(ws.connect(input, text), Err(ConnectError::ChecksFailed));
    assert_eq!(ws.snapshot().unwrap(), before);
}

#[test]
fn value_link_is_symmetric() {
    let mut ws = Workspace::new();
    let input = block_with(&mut ws, "link_in", ConnectionType::InputValue, Some("Number"), false);
    let num = block_with(&mut ws, "link_out", ConnectionType::OutputValue, Some("Number"), false);
    ws.connect(num, input).unwrap();
    assert_eq!(ws.target_block(input), Some(num.block));
    assert_eq!(ws.target_block(num), Some(input.block));
    assert_eq!(ws.get_input_target_block(input.block, "IN"), Some(num.block));

    // Moving the child to a new parent removes the old link.
    let other = block_with(&mut ws, "link_in_2", ConnectionType::InputValue, None, false);
    ws.connect(other, num).unwrap();
    assert_eq!(ws.target_block(input), None);
    assert_eq!(ws.target_block(num), Some(other.block));
}

#[test]
fn displaced_shadow_is_disposed() {
    let mut ws = Workspace::new();
    let input = block_with(&mut ws, "shadow_host", ConnectionType::InputValue, None, false);
    let shadow = block_with(&mut ws, "shadow_val", ConnectionType::OutputValue, None, true);
    ws.connect(input, shadow).unwrap();
    let real = block_with(&mut ws, "shadow_real", ConnectionType::OutputValue, None, false);
    ws.connect(input, real).unwrap();
    assert!(!ws.contains(shadow.block));
    assert_eq!(ws.target_block(input), Some(real.block));
}

#[test]
fn displaced_shadow_is_disposed_even_with_an_open_input() {
    let mut ws = Workspace::new();
    let input = block_with(&mut ws, "shadow_open_host", ConnectionType::InputValue, None, false);
    let shadow = block_with(&mut ws, "shadow_open_val", ConnectionType::OutputValue, None, true);
    ws.connect(input, shadow).unwrap();

    // The incoming block has one empty input the shadow would fit.
    let join = ws
        .add_block(
            Block::value(BlockId::intern("shadow_open_join"), "join", Vec::<String>::new())
                .with_input(Input::value("A"))
                .unwrap(),
        )
        .unwrap();
    let removed = ws
        .connect(input, ConnectionRef::new(join, Slot::Output))
        .unwrap();

    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].id, shadow.block);
    assert!(!ws.contains(shadow.block));
    assert_eq!(ws.target_block(input), Some(join));
    assert_eq!(ws.get_input_target_block(join, "A"), None);
}

#[test]
fn displaced_real_block_moves_into_the_open_input() {
    let mut ws = Workspace::new();
    let input = block_with(&mut ws, "orphan_open_host", ConnectionType::InputValue, None, false);
    let old = block_with(&mut ws, "orphan_open_val", ConnectionType::OutputValue, None, false);
    ws.connect(input, old).unwrap();

    let join = ws
        .add_block(
            Block::value(BlockId::intern("orphan_open_join"), "join", Vec::<String>::new())
                .with_input(Input::value("A"))
                .unwrap(),
        )
        .unwrap();
    let removed = ws
        .connect(input, ConnectionRef::new(join, Slot::Output))
        .unwrap();

    assert!(removed.is_empty());
    assert_eq!(ws.get_input_target_block(join, "A"), Some(old.block));
}
