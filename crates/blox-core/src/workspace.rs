//! The workspace: every block plus the links between them.
//!
//! Links are graph edges from parent to child, weighted by the parent's
//! slot (`Next` or `Input(i)`). A child has at most one incoming edge, so
//! each link is stored once and reads the same from both ends.

use crate::connection::{ConnectionChecker, ConnectionRef, ConnectionType, Endpoint, Slot};
use crate::error::{BlockError, ConnectError};
use crate::id::{BlockId, ModelId};
use crate::model::{Block, Input, Position};
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::HashMap;

/// Maximum length of a collapsed block's summary text.
pub const COLLAPSE_CHARS: usize = 30;

#[derive(Debug, Clone, Default)]
pub struct Workspace {
    pub graph: StableDiGraph<Block, Slot>,
    pub id_index: HashMap<BlockId, NodeIndex>,
    /// Right-to-left layout for every block in this workspace.
    pub rtl: bool,
    checker: ConnectionChecker,
}

impl Workspace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rtl(rtl: bool) -> Self {
        Self {
            rtl,
            ..Self::default()
        }
    }

    // ─── Blocks ──────────────────────────────────────────────────────────

    pub fn add_block(&mut self, block: Block) -> Result<BlockId, BlockError> {
        let id = block.id;
        if self.id_index.contains_key(&id) {
            return Err(BlockError::DuplicateBlockId(id));
        }
        let idx = self.graph.add_node(block);
        self.id_index.insert(id, idx);
        log::trace!("added block {id:?}");
        Ok(id)
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.id_index
            .get(&id)
            .copied()
            .map(move |idx| &mut self.graph[idx])
    }

    pub fn require(&self, id: BlockId) -> Result<&Block, BlockError> {
        self.get(id).ok_or(BlockError::UnknownBlock(id))
    }

    pub fn require_mut(&mut self, id: BlockId) -> Result<&mut Block, BlockError> {
        self.get_mut(id).ok_or(BlockError::UnknownBlock(id))
    }

    pub fn index_of(&self, id: BlockId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.id_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_index.is_empty()
    }

    /// All blocks in insertion order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.graph.node_indices().map(|idx| &self.graph[idx])
    }

    pub fn move_block(&mut self, id: BlockId, position: Position) -> Result<(), BlockError> {
        self.require_mut(id)?.position = position;
        Ok(())
    }

    /// Dispose a block and everything nested in it.
    ///
    /// With `heal_stack`, the block's next block takes its place in the
    /// statement stack instead of being disposed with it.
    pub fn dispose_block(&mut self, id: BlockId, heal_stack: bool) -> Result<Vec<Block>, BlockError> {
        self.require(id)?;
        if heal_stack {
            self.heal_around(id);
        }
        let doomed = self.descendants(id);
        let mut removed = Vec::with_capacity(doomed.len());
        for block_id in doomed {
            if let Some(idx) = self.id_index.remove(&block_id)
                && let Some(block) = self.graph.remove_node(idx)
            {
                removed.push(block);
            }
        }
        log::debug!("disposed {id:?} ({} blocks)", removed.len());
        Ok(removed)
    }

    fn heal_around(&mut self, id: BlockId) {
        let Some(next) = self.get_next_block(id) else {
            return;
        };
        let parent = self.parent_link(id);
        self.disconnect(next);
        if let Some((parent_id, slot)) = parent
            && matches!(self.slot_kind(parent_id, slot), Some(ConnectionType::NextStatement))
        {
            self.disconnect(id);
            let target = ConnectionRef::new(parent_id, slot);
            if self
                .connect(target, ConnectionRef::new(next, Slot::Previous))
                .is_err()
            {
                log::debug!("could not heal stack around {id:?}");
            }
        }
    }

    // ─── Inputs ──────────────────────────────────────────────────────────

    pub fn append_input(&mut self, id: BlockId, input: Input) -> Result<usize, BlockError> {
        self.require_mut(id)?.append_input(input)
    }

    /// Remove an input by name. A block plugged into it is unplugged and
    /// becomes top-level; links on later inputs are renumbered.
    pub fn remove_input(&mut self, id: BlockId, name: &str) -> Result<Input, BlockError> {
        let idx = self.index_of(id).ok_or(BlockError::UnknownBlock(id))?;
        let index = self.graph[idx]
            .input_index(name)
            .ok_or_else(|| BlockError::UnknownInput {
                block: id,
                name: name.to_string(),
            })?;
        if let Some(child) = self.target_block(ConnectionRef::new(id, Slot::Input(index))) {
            self.disconnect(child);
        }
        let shifted: Vec<EdgeIndex> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| matches!(e.weight(), Slot::Input(j) if *j > index))
            .map(|e| e.id())
            .collect();
        for edge in shifted {
            if let Some(Slot::Input(j)) = self.graph.edge_weight_mut(edge) {
                *j -= 1;
            }
        }
        let (_, input) = self.graph[idx]
            .remove_input(name)
            .ok_or_else(|| BlockError::UnknownInput {
                block: id,
                name: name.to_string(),
            })?;
        Ok(input)
    }

    // ─── Links ───────────────────────────────────────────────────────────

    /// The block this one is plugged into, and the parent's slot.
    pub fn parent_link(&self, id: BlockId) -> Option<(BlockId, Slot)> {
        let idx = self.index_of(id)?;
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .next()
            .map(|e| (self.graph[e.source()].id, *e.weight()))
    }

    pub fn parent(&self, id: BlockId) -> Option<BlockId> {
        self.parent_link(id).map(|(p, _)| p)
    }

    /// The block connected at a given connection, from either end.
    pub fn target_block(&self, conn: ConnectionRef) -> Option<BlockId> {
        let idx = self.index_of(conn.block)?;
        match conn.slot {
            Slot::Next | Slot::Input(_) => self
                .graph
                .edges_directed(idx, Direction::Outgoing)
                .find(|e| *e.weight() == conn.slot)
                .map(|e| self.graph[e.target()].id),
            Slot::Output | Slot::Previous => {
                let own = self.graph[idx].connection(conn.slot)?.kind;
                let (parent, slot) = self.parent_link(conn.block)?;
                (self.slot_kind(parent, slot)? == own.opposite()).then_some(parent)
            }
        }
    }

    pub fn get_input_target_block(&self, id: BlockId, input: &str) -> Option<BlockId> {
        let index = self.get(id)?.input_index(input)?;
        self.target_block(ConnectionRef::new(id, Slot::Input(index)))
    }

    pub fn get_next_block(&self, id: BlockId) -> Option<BlockId> {
        self.target_block(ConnectionRef::new(id, Slot::Next))
    }

    /// The block whose next connection this one hangs from.
    pub fn get_previous_block(&self, id: BlockId) -> Option<BlockId> {
        match self.parent_link(id)? {
            (parent, Slot::Next) => Some(parent),
            _ => None,
        }
    }

    /// The nearest ancestor that wraps this block in one of its inputs.
    pub fn get_surround_parent(&self, id: BlockId) -> Option<BlockId> {
        let mut current = id;
        while let Some((parent, slot)) = self.parent_link(current) {
            if slot != Slot::Next {
                return Some(parent);
            }
            current = parent;
        }
        None
    }

    /// Direct children: input targets in input order, then the next block.
    pub fn children(&self, id: BlockId) -> Vec<BlockId> {
        let Some(idx) = self.index_of(id) else {
            return Vec::new();
        };
        let mut edges: Vec<(Slot, BlockId)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (*e.weight(), self.graph[e.target()].id))
            .collect();
        edges.sort_by_key(|(slot, _)| match slot {
            Slot::Input(i) => *i,
            _ => usize::MAX,
        });
        edges.into_iter().map(|(_, child)| child).collect()
    }

    /// This block and everything below it, depth-first.
    pub fn descendants(&self, id: BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            let children = self.children(current);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    pub fn root_block(&self, id: BlockId) -> BlockId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Blocks with no parent, in insertion order.
    pub fn top_blocks(&self) -> Vec<BlockId> {
        self.graph
            .node_indices()
            .filter(|idx| {
                self.graph
                    .edges_directed(*idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx].id)
            .collect()
    }

    pub fn is_ancestor_or_self(&self, ancestor: BlockId, of: BlockId) -> bool {
        let mut current = Some(of);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Blocks with a field referring to the given variable or procedure.
    pub fn blocks_using_model(&self, model: ModelId) -> Vec<BlockId> {
        self.blocks()
            .filter(|b| b.fields().any(|f| f.model_ref() == Some(model)))
            .map(|b| b.id)
            .collect()
    }

    fn slot_kind(&self, id: BlockId, slot: Slot) -> Option<ConnectionType> {
        self.get(id)?.connection(slot).map(|c| c.kind)
    }

    // ─── Connecting ──────────────────────────────────────────────────────

    fn endpoint(&self, conn: ConnectionRef) -> Result<Endpoint<'_>, ConnectError> {
        let block = self
            .get(conn.block)
            .ok_or(ConnectError::UnknownBlock(conn.block))?;
        let connection = block
            .connection(conn.slot)
            .ok_or(ConnectError::MissingConnection(conn))?;
        Ok(Endpoint { block, connection })
    }

    pub fn checker(&self) -> &ConnectionChecker {
        &self.checker
    }

    /// Whether `a` and `b` could be joined. Order does not matter.
    pub fn can_connect(&self, a: ConnectionRef, b: ConnectionRef) -> Result<(), ConnectError> {
        let ea = self.endpoint(a)?;
        let eb = self.endpoint(b)?;
        self.checker.can_connect(ea, eb)?;
        let (parent, child) = if ea.connection.kind.is_parent_side() {
            (a.block, b.block)
        } else {
            (b.block, a.block)
        };
        if self.is_ancestor_or_self(child, parent) {
            return Err(ConnectError::Cycle);
        }
        Ok(())
    }

    /// Join two connections and return any blocks disposed on the way.
    ///
    /// The child is unplugged from wherever it was. A shadow already sitting
    /// in the parent's slot is disposed. Any other occupant is re-attached to
    /// the end of the incoming stack (or to its single compatible empty
    /// input) when possible, and otherwise left top-level.
    pub fn connect(&mut self, a: ConnectionRef, b: ConnectionRef) -> Result<Vec<Block>, ConnectError> {
        self.can_connect(a, b)?;
        let (parent, child) = if self.endpoint(a)?.connection.kind.is_parent_side() {
            (a, b)
        } else {
            (b, a)
        };
        self.disconnect(child.block);
        let mut removed = Vec::new();
        let mut orphan = self.target_block(parent);
        if let Some(occupant) = orphan {
            self.disconnect(occupant);
            if self.get(occupant).is_some_and(|blk| blk.shadow) {
                removed = self
                    .dispose_block(occupant, false)
                    .map_err(|_| ConnectError::UnknownBlock(occupant))?;
                orphan = None;
            }
        }
        let (Some(p), Some(c)) = (self.index_of(parent.block), self.index_of(child.block)) else {
            return Err(ConnectError::UnknownBlock(parent.block));
        };
        self.graph.add_edge(p, c, parent.slot);
        log::debug!("connected {:?}{:?} -> {:?}", parent.block, parent.slot, child.block);

        if let Some(orphan) = orphan {
            removed.extend(self.reattach_orphan(orphan, child.block));
        }
        Ok(removed)
    }

    fn reattach_orphan(&mut self, orphan: BlockId, new_child: BlockId) -> Vec<Block> {
        let Some(block) = self.get(orphan) else {
            return Vec::new();
        };
        let candidate = if block.previous.is_some() {
            let mut last = new_child;
            while let Some(next) = self.get_next_block(last) {
                last = next;
            }
            self.get(last)
                .and_then(|b| b.next.as_ref())
                .map(|_| ConnectionRef::new(last, Slot::Next))
                .filter(|target| {
                    self.can_connect(*target, ConnectionRef::new(orphan, Slot::Previous))
                        .is_ok()
                })
        } else if block.output.is_some() {
            self.single_open_input_for(orphan, new_child)
        } else {
            None
        };
        let own_slot = if block.previous.is_some() {
            Slot::Previous
        } else {
            Slot::Output
        };
        let Some(target) = candidate else {
            log::debug!("orphan {orphan:?} left top-level");
            return Vec::new();
        };
        match self.connect(target, ConnectionRef::new(orphan, own_slot)) {
            Ok(removed) => {
                log::debug!("re-attached orphan {orphan:?}");
                removed
            }
            Err(e) => {
                log::warn!("could not re-attach orphan {orphan:?}: {e}");
                Vec::new()
            }
        }
    }

    fn single_open_input_for(&self, orphan: BlockId, host: BlockId) -> Option<ConnectionRef> {
        let block = self.get(host)?;
        let mut found = None;
        for slot in block.connection_slots() {
            let Slot::Input(_) = slot else { continue };
            let target = ConnectionRef::new(host, slot);
            if self.target_block(target).is_some() {
                continue;
            }
            if self
                .can_connect(target, ConnectionRef::new(orphan, Slot::Output))
                .is_ok()
            {
                if found.is_some() {
                    return None;
                }
                found = Some(target);
            }
        }
        found
    }

    /// Unplug a block from its parent. Returns the old parent link.
    pub fn disconnect(&mut self, child: BlockId) -> Option<(BlockId, Slot)> {
        let idx = self.index_of(child)?;
        let edge = self.graph.edges_directed(idx, Direction::Incoming).next()?;
        let (edge_id, parent, slot) = (edge.id(), self.graph[edge.source()].id, *edge.weight());
        self.graph.remove_edge(edge_id);
        log::debug!("disconnected {child:?} from {parent:?}{slot:?}");
        Some((parent, slot))
    }

    // ─── Text & snapshots ────────────────────────────────────────────────

    /// Human-readable summary used as a collapsed block's label.
    /// Empty inputs show as `?`.
    pub fn summary_text(&self, id: BlockId) -> String {
        let mut tokens = Vec::new();
        self.collect_tokens(id, &mut tokens);
        let text = tokens
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if text.chars().count() > COLLAPSE_CHARS {
            let mut cut: String = text.chars().take(COLLAPSE_CHARS - 1).collect();
            cut.push('\u{2026}');
            cut
        } else {
            text
        }
    }

    fn collect_tokens(&self, id: BlockId, tokens: &mut Vec<String>) {
        let Some(block) = self.get(id) else {
            return;
        };
        for (i, input) in block.inputs.iter().enumerate() {
            if !input.visible {
                continue;
            }
            tokens.extend(
                input
                    .fields
                    .iter()
                    .filter(|f| f.visible)
                    .map(|f| f.display_text()),
            );
            if input.connection.is_some() {
                match self.target_block(ConnectionRef::new(id, Slot::Input(i))) {
                    Some(child) => self.collect_tokens(child, tokens),
                    None => tokens.push("?".to_string()),
                }
            }
        }
    }

    /// Deterministic MessagePack encoding of every block and link.
    pub fn snapshot(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        #[derive(Serialize)]
        struct Record<'a> {
            block: &'a Block,
            parent: Option<(BlockId, Slot)>,
        }
        let mut records: Vec<Record<'_>> = self
            .blocks()
            .map(|block| Record {
                block,
                parent: self.parent_link(block.id),
            })
            .collect();
        records.sort_by(|a, b| a.block.id.as_str().cmp(b.block.id.as_str()));
        rmp_serde::to_vec_named(&(self.rtl, records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Field, Input};

    fn stmt(ws: &mut Workspace, id: &str) -> BlockId {
        ws.add_block(Block::statement(BlockId::intern(id), "stmt"))
            .unwrap()
    }

    fn prev(id: BlockId) -> ConnectionRef {
        ConnectionRef::new(id, Slot::Previous)
    }

    fn next(id: BlockId) -> ConnectionRef {
        ConnectionRef::new(id, Slot::Next)
    }

    #[test]
    fn link_reads_from_both_ends() {
        let mut ws = Workspace::new();
        let a = stmt(&mut ws, "ws_link_a");
        let b = stmt(&mut ws, "ws_link_b");
        ws.connect(next(a), prev(b)).unwrap();
        assert_eq!(ws.target_block(next(a)), Some(b));
        assert_eq!(ws.target_block(prev(b)), Some(a));
        assert_eq!(ws.get_previous_block(b), Some(a));
        assert_eq!(ws.top_blocks(), vec![a]);
    }

    #[test]
    fn duplicate_block_id_rejected() {
        let mut ws = Workspace::new();
        stmt(&mut ws, "ws_dup");
        let err = ws
            .add_block(Block::statement(BlockId::intern("ws_dup"), "stmt"))
            .unwrap_err();
        assert_eq!(err, BlockError::DuplicateBlockId(BlockId::intern("ws_dup")));
    }

    #[test]
    fn cycle_rejected() {
        let mut ws = Workspace::new();
        let a = stmt(&mut ws, "ws_cycle_a");
        let b = stmt(&mut ws, "ws_cycle_b");
        ws.connect(next(a), prev(b)).unwrap();
        assert_eq!(ws.connect(next(b), prev(a)), Err(ConnectError::Cycle));
    }

    #[test]
    fn displaced_statement_moves_to_end_of_stack() {
        let mut ws = Workspace::new();
        let a = stmt(&mut ws, "ws_orphan_a");
        let b = stmt(&mut ws, "ws_orphan_b");
        let c = stmt(&mut ws, "ws_orphan_c");
        ws.connect(next(a), prev(b)).unwrap();
        ws.connect(next(a), prev(c)).unwrap();
        assert_eq!(ws.get_next_block(a), Some(c));
        assert_eq!(ws.get_next_block(c), Some(b));
    }

    #[test]
    fn displaced_shadow_statement_is_disposed_not_stacked() {
        let mut ws = Workspace::new();
        let a = stmt(&mut ws, "ws_shadow_stmt_a");
        let mut shadow = Block::statement(BlockId::intern("ws_shadow_stmt_s"), "stmt");
        shadow.shadow = true;
        let shadow = ws.add_block(shadow).unwrap();
        let c = stmt(&mut ws, "ws_shadow_stmt_c");
        ws.connect(next(a), prev(shadow)).unwrap();

        let removed = ws.connect(next(a), prev(c)).unwrap();
        assert_eq!(removed.iter().map(|b| b.id).collect::<Vec<_>>(), vec![shadow]);
        assert!(!ws.contains(shadow));
        assert_eq!(ws.get_next_block(c), None);
    }

    #[test]
    fn dispose_cascades_or_heals() {
        let mut ws = Workspace::new();
        let a = stmt(&mut ws, "ws_heal_a");
        let b = stmt(&mut ws, "ws_heal_b");
        let c = stmt(&mut ws, "ws_heal_c");
        ws.connect(next(a), prev(b)).unwrap();
        ws.connect(next(b), prev(c)).unwrap();

        let removed = ws.dispose_block(b, true).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(ws.get_next_block(a), Some(c));

        let removed = ws.dispose_block(a, false).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(ws.is_empty());
    }

    #[test]
    fn remove_input_renumbers_later_links() {
        let mut ws = Workspace::new();
        let host = Block::new(BlockId::intern("ws_renum_host"), "host")
            .with_input(Input::value("A"))
            .and_then(|b| b.with_input(Input::value("B")))
            .unwrap();
        let host = ws.add_block(host).unwrap();
        let val = ws
            .add_block(Block::value(BlockId::intern("ws_renum_val"), "v", ["Number"]))
            .unwrap();
        ws.connect(
            ConnectionRef::new(host, Slot::Input(1)),
            ConnectionRef::new(val, Slot::Output),
        )
        .unwrap();
        ws.remove_input(host, "A").unwrap();
        assert_eq!(ws.get_input_target_block(host, "B"), Some(val));
        assert_eq!(ws.parent_link(val), Some((host, Slot::Input(0))));
    }

    #[test]
    fn summary_text_marks_empty_inputs() {
        let mut ws = Workspace::new();
        let block = Block::statement(BlockId::intern("ws_summary"), "controls_repeat")
            .with_input(Input::dummy("").with_field(Field::label("repeat")))
            .and_then(|b| b.with_input(Input::value("TIMES")))
            .and_then(|b| b.with_input(Input::dummy("").with_field(Field::label("times"))))
            .unwrap();
        let id = ws.add_block(block).unwrap();
        assert_eq!(ws.summary_text(id), "repeat ? times");
    }
}
