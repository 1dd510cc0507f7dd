//! Synchronous sync engine: block mutations → geometry → path objects.
//!
//! Every mutation is applied to the workspace and the affected block trees
//! are measured, drawn, and pushed into their path objects before the call
//! returns. There is no deferred render queue.
//!
//! Fields that reference a variable or procedure subscribe to the owning
//! map. Map notifications land in a queue that the engine drains at the end
//! of every model operation, refreshing field text and re-rendering the
//! owning blocks.

use crate::error::EngineError;
use blox_core::{
    Block, BlockId, ConnectionRef, FieldKind, Icon, IconKind, Input, MapEvent, ModelId,
    Position, ProcedureMap, ProcedureModel, Slot, Subscription, VariableMap, Workspace,
};
use blox_render::{
    BlockState, DebugConfig, Drawing, PathObject, PlacementTarget, RenderInfo, Rendered,
    Renderer, RendererRegistry, StackSizes,
};
use kurbo::Point;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt::Write;
use std::rc::Rc;
use std::sync::Arc;

/// A change to the block model.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockMutation {
    AddBlock(Block),
    DisposeBlock {
        id: BlockId,
        heal_stack: bool,
    },
    SetFieldValue {
        id: BlockId,
        field: String,
        value: String,
    },
    Connect {
        a: ConnectionRef,
        b: ConnectionRef,
    },
    Disconnect {
        child: BlockId,
    },
    SetCollapsed {
        id: BlockId,
        collapsed: bool,
    },
    SetInputsInline {
        id: BlockId,
        inline: bool,
    },
    SetEnabled {
        id: BlockId,
        enabled: bool,
    },
    AddIcon {
        id: BlockId,
        icon: Icon,
    },
    RemoveIcon {
        id: BlockId,
        kind: IconKind,
    },
    AppendInput {
        id: BlockId,
        input: Input,
    },
    RemoveInput {
        id: BlockId,
        name: String,
    },
    Move {
        id: BlockId,
        position: Position,
    },
}

type PendingQueue = Rc<RefCell<Vec<(BlockId, ModelId)>>>;

/// Holds the authoritative workspace and keeps every block's path object
/// in step with it.
pub struct SyncEngine {
    pub workspace: Workspace,
    variables: VariableMap,
    procedures: ProcedureMap,
    registry: RendererRegistry,
    renderer: Arc<Renderer>,
    rendered: HashMap<BlockId, Rendered>,
    path_objects: HashMap<BlockId, PathObject>,
    selected: Option<BlockId>,
    errors: HashSet<BlockId>,
    subscriptions: HashMap<BlockId, Vec<Subscription>>,
    pending: PendingQueue,
}

impl SyncEngine {
    /// Build an engine around `workspace`, rendering through the renderer
    /// registered as `renderer`. Every block already in the workspace is
    /// rendered.
    pub fn new(
        workspace: Workspace,
        registry: RendererRegistry,
        renderer: &str,
    ) -> Result<Self, EngineError> {
        let renderer = registry.get(renderer)?;
        let mut engine = Self {
            workspace,
            variables: VariableMap::new(),
            procedures: ProcedureMap::new(),
            registry,
            renderer,
            rendered: HashMap::new(),
            path_objects: HashMap::new(),
            selected: None,
            errors: HashSet::new(),
            subscriptions: HashMap::new(),
            pending: Rc::new(RefCell::new(Vec::new())),
        };
        let ids: Vec<BlockId> = engine.workspace.blocks().map(|b| b.id).collect();
        for id in ids {
            engine.subscribe_fields(id);
        }
        engine.render_all()?;
        Ok(engine)
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn variables(&self) -> &VariableMap {
        &self.variables
    }

    pub fn procedures(&self) -> &ProcedureMap {
        &self.procedures
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Apply one mutation and re-render what it touched.
    ///
    /// On error the workspace is unchanged for refused connections and
    /// invalid field values; render errors propagate after the model change.
    pub fn apply_mutation(&mut self, mutation: BlockMutation) -> Result<(), EngineError> {
        log::debug!("apply {mutation:?}");
        match mutation {
            BlockMutation::AddBlock(block) => {
                let id = self.workspace.add_block(block)?;
                self.subscribe_fields(id);
                self.refresh_model_displays(id);
                self.render_tree(id)?;
            }
            BlockMutation::DisposeBlock { id, heal_stack } => {
                let removed = self.workspace.dispose_block(id, heal_stack)?;
                for block in &removed {
                    self.forget(block.id);
                }
                self.render_all()?;
            }
            BlockMutation::SetFieldValue { id, field, value } => {
                self.workspace.require_mut(id)?.set_field_value(&field, &value)?;
                self.subscribe_fields(id);
                self.refresh_model_displays(id);
                self.render_tree(id)?;
            }
            BlockMutation::Connect { a, b } => {
                let removed = match self.workspace.connect(a, b) {
                    Ok(removed) => removed,
                    Err(e) => {
                        log::debug!("refused connection {a:?} ↔ {b:?}: {e}");
                        return Err(e.into());
                    }
                };
                for block in &removed {
                    self.forget(block.id);
                }
                self.render_all()?;
            }
            BlockMutation::Disconnect { child } => {
                self.workspace.require(child)?;
                if self.workspace.disconnect(child).is_some() {
                    self.render_all()?;
                }
            }
            BlockMutation::SetCollapsed { id, collapsed } => {
                self.workspace.require_mut(id)?.collapsed = collapsed;
                self.render_tree(id)?;
            }
            BlockMutation::SetInputsInline { id, inline } => {
                self.workspace.require_mut(id)?.inputs_inline = inline;
                self.render_tree(id)?;
            }
            BlockMutation::SetEnabled { id, enabled } => {
                self.workspace.require_mut(id)?.enabled = enabled;
                self.render_tree(id)?;
            }
            BlockMutation::AddIcon { id, icon } => {
                self.workspace.require_mut(id)?.add_icon(icon)?;
                self.render_tree(id)?;
            }
            BlockMutation::RemoveIcon { id, kind } => {
                if self.workspace.require_mut(id)?.remove_icon(&kind).is_some() {
                    self.render_tree(id)?;
                }
            }
            BlockMutation::AppendInput { id, input } => {
                self.workspace.append_input(id, input)?;
                self.subscribe_fields(id);
                self.refresh_model_displays(id);
                self.render_tree(id)?;
            }
            BlockMutation::RemoveInput { id, name } => {
                self.workspace.remove_input(id, &name)?;
                self.subscribe_fields(id);
                self.render_all()?;
            }
            BlockMutation::Move { id, position } => {
                self.workspace.move_block(id, position)?;
            }
        }
        Ok(())
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Re-render every block in the workspace.
    pub fn render_all(&mut self) -> Result<(), EngineError> {
        let mut sizes = StackSizes::new();
        for root in self.workspace.top_blocks() {
            self.render_subtree(root, &mut sizes)?;
        }
        Ok(())
    }

    /// Re-render the whole tree containing `id`, children before parents.
    fn render_tree(&mut self, id: BlockId) -> Result<(), EngineError> {
        let root = self.workspace.root_block(id);
        self.render_subtree(root, &mut StackSizes::new())
    }

    fn render_subtree(&mut self, root: BlockId, sizes: &mut StackSizes) -> Result<(), EngineError> {
        let order = self.workspace.descendants(root);
        for &id in order.iter().rev() {
            let rendered = match self.renderer.render(&self.workspace, id, sizes) {
                Ok(rendered) => rendered,
                Err(e) => {
                    log::warn!("render of {id:?} failed: {e}");
                    return Err(e.into());
                }
            };
            let state = self.state_of(id);
            let renderer = &self.renderer;
            let path = self
                .path_objects
                .entry(id)
                .or_insert_with(|| renderer.make_path_object(id));
            path.set_path(&rendered.drawing);
            path.update_state(state);
            self.rendered.insert(id, rendered);
        }
        Ok(())
    }

    fn state_of(&self, id: BlockId) -> BlockState {
        let Some(block) = self.workspace.get(id) else {
            return BlockState::default();
        };
        // Disabled if the block or any ancestor is disabled.
        let disabled = std::iter::successors(Some(id), |b| self.workspace.parent(*b))
            .any(|b| self.workspace.get(b).is_some_and(|blk| !blk.enabled));
        BlockState {
            selected: self.selected == Some(id),
            disabled,
            collapsed: block.collapsed,
            error: self.errors.contains(&id),
            insertion_marker: block.insertion_marker,
        }
    }

    fn refresh_state(&mut self, id: BlockId) {
        let state = self.state_of(id);
        if let Some(path) = self.path_objects.get_mut(&id) {
            path.update_state(state);
        }
    }

    fn forget(&mut self, id: BlockId) {
        if let Some(mut path) = self.path_objects.remove(&id) {
            path.dispose();
        }
        self.rendered.remove(&id);
        self.subscriptions.remove(&id);
        self.errors.remove(&id);
        if self.selected == Some(id) {
            self.selected = None;
        }
    }

    /// Switch to another registered renderer and re-render everything.
    /// Path objects keep their element ids; the block model is untouched.
    pub fn set_renderer(&mut self, name: &str) -> Result<(), EngineError> {
        let renderer = self.registry.get(name)?;
        log::debug!("renderer {} → {}", self.renderer.name(), renderer.name());
        let (old, new) = (self.renderer.style_class(), renderer.style_class());
        for path in self.path_objects.values_mut() {
            path.set_style_class(&old, &new);
        }
        self.renderer = renderer;
        self.render_all()
    }

    pub fn select(&mut self, id: Option<BlockId>) {
        let previous = std::mem::replace(&mut self.selected, id);
        for block in previous.into_iter().chain(id) {
            self.refresh_state(block);
        }
    }

    pub fn selected(&self) -> Option<BlockId> {
        self.selected
    }

    pub fn set_error(&mut self, id: BlockId, error: bool) {
        if error {
            self.errors.insert(id);
        } else {
            self.errors.remove(&id);
        }
        self.refresh_state(id);
    }

    pub fn path_object(&self, id: BlockId) -> Option<&PathObject> {
        self.path_objects.get(&id)
    }

    pub fn path_object_mut(&mut self, id: BlockId) -> Option<&mut PathObject> {
        self.path_objects.get_mut(&id)
    }

    pub fn drawing(&self, id: BlockId) -> Option<&Drawing> {
        self.rendered.get(&id).map(|r| &r.drawing)
    }

    /// Geometry from the last render of `id`.
    pub fn render_info(&self, id: BlockId) -> Option<&RenderInfo> {
        self.rendered.get(&id).map(|r| &r.info)
    }

    /// Measure `id` afresh, without touching any path object.
    pub fn measure(&self, id: BlockId) -> Result<RenderInfo, EngineError> {
        Ok(self
            .renderer
            .measure(&self.workspace, id, &mut StackSizes::new())?)
    }

    /// Highlight a connection on a rendered block.
    pub fn highlight_connection(&mut self, conn: ConnectionRef, on: bool) -> bool {
        let (Some(path), Some(rendered)) = (
            self.path_objects.get_mut(&conn.block),
            self.rendered.get(&conn.block),
        ) else {
            return false;
        };
        if on {
            path.set_connection_highlight(conn.slot, &rendered.drawing)
        } else {
            path.remove_connection_highlight(conn.slot)
        }
    }

    // ─── Export ──────────────────────────────────────────────────────────

    /// Absolute position of a block's origin in workspace coordinates.
    ///
    /// A child is placed so that its output or previous connection sits on
    /// the parent's matching connection point.
    pub fn block_origin(&self, id: BlockId) -> Option<Point> {
        let Some((parent, slot)) = self.workspace.parent_link(id) else {
            let pos = self.workspace.get(id)?.position;
            return Some(Point::new(pos.x, pos.y));
        };
        let parent_origin = self.block_origin(parent)?;
        let parent_point = self.rendered.get(&parent)?.info.connection(slot)?;
        let child = &self.rendered.get(&id)?.info;
        let own = child
            .connection(Slot::Output)
            .or_else(|| child.connection(Slot::Previous))
            .unwrap_or(Point::ORIGIN);
        Some(parent_origin + parent_point.to_vec2() - own.to_vec2())
    }

    /// The whole workspace as an SVG document.
    pub fn render_svg(&self) -> String {
        let mut out = String::from(r#"<svg xmlns="http://www.w3.org/2000/svg" class="blox-svg">"#);
        for root in self.workspace.top_blocks() {
            self.write_block_svg(root, &mut out);
        }
        out.push_str("</svg>");
        out
    }

    fn write_block_svg(&self, id: BlockId, out: &mut String) {
        let (Some(block), Some(path), Some(rendered)) = (
            self.workspace.get(id),
            self.path_objects.get(&id),
            self.rendered.get(&id),
        ) else {
            return;
        };
        let origin = self.block_origin(id).unwrap_or(Point::ORIGIN);
        let _ = write!(
            out,
            r#"<g class="blox-block" data-type="{}" transform="translate({},{})">"#,
            escape(&block.type_name),
            origin.x,
            origin.y
        );
        out.push_str(&path.to_svg());
        for placement in &rendered.drawing.placements {
            let text = match &placement.target {
                PlacementTarget::Field { input, field } => block
                    .inputs
                    .get(*input)
                    .and_then(|i| i.fields.get(*field))
                    .filter(|f| !matches!(f.kind, FieldKind::Image { .. }))
                    .map(|f| f.display_text()),
                PlacementTarget::SummaryLabel(text) => Some(text.clone()),
                PlacementTarget::Icon(_) => None,
            };
            match text {
                Some(text) => {
                    let _ = write!(
                        out,
                        r#"<text class="blox-text" transform="{}" y="{}">{}</text>"#,
                        placement.transform(),
                        placement.height / 2.0,
                        escape(&text)
                    );
                }
                None => {
                    let _ = write!(
                        out,
                        r#"<rect class="blox-placeholder" transform="{}" width="{}" height="{}"/>"#,
                        placement.transform(),
                        placement.width,
                        placement.height
                    );
                }
            }
        }
        out.push_str("</g>");

        // Children of a collapsed block stay hidden; its next block does not.
        for child in self.workspace.children(id) {
            let is_next = self
                .workspace
                .parent_link(child)
                .is_some_and(|(_, slot)| slot == Slot::Next);
            if !block.collapsed || is_next {
                self.write_block_svg(child, out);
            }
        }
    }

    /// Debug overlay for one block, positioned at its origin.
    pub fn debug_svg(&self, id: BlockId) -> Result<String, EngineError> {
        let info = self.measure(id)?;
        let mut debug = self.renderer.make_debugger(DebugConfig::default());
        debug.draw(&info);
        let origin = self.block_origin(id).unwrap_or(Point::ORIGIN);
        Ok(format!(
            r#"<g transform="translate({},{})">{}</g>"#,
            origin.x,
            origin.y,
            debug.to_svg()
        ))
    }

    // ─── Variable & procedure bridge ─────────────────────────────────────

    /// Create a variable, or return the id of an existing one with the
    /// same name and type.
    pub fn add_variable(&mut self, name: &str, var_type: &str) -> Result<ModelId, EngineError> {
        let id = self.variables.create_variable(name, var_type, None)?;
        self.flush_model_events()?;
        Ok(id)
    }

    pub fn rename_variable(&mut self, id: ModelId, name: &str) -> Result<bool, EngineError> {
        let changed = self.variables.rename(id, name);
        self.flush_model_events()?;
        Ok(changed)
    }

    /// Delete a variable and every block that uses it.
    pub fn delete_variable(&mut self, id: ModelId) -> Result<bool, EngineError> {
        if !self.variables.contains(id) {
            return Ok(false);
        }
        self.dispose_users(id)?;
        self.variables.delete(id);
        self.flush_model_events()?;
        Ok(true)
    }

    pub fn add_procedure(&mut self, procedure: ProcedureModel) -> Result<(), EngineError> {
        self.procedures.add(procedure);
        self.flush_model_events()
    }

    pub fn rename_procedure(&mut self, id: ModelId, name: &str) -> Result<bool, EngineError> {
        let changed = self.procedures.rename(id, name);
        self.flush_model_events()?;
        Ok(changed)
    }

    /// Delete a procedure and every block that calls or defines it.
    pub fn delete_procedure(&mut self, id: ModelId) -> Result<bool, EngineError> {
        if !self.procedures.contains(id) {
            return Ok(false);
        }
        self.dispose_users(id)?;
        self.procedures.delete(id);
        self.flush_model_events()?;
        Ok(true)
    }

    /// Run an arbitrary change against the procedure map, then re-render
    /// whatever it affected.
    pub fn update_procedures<R>(
        &mut self,
        f: impl FnOnce(&mut ProcedureMap) -> R,
    ) -> Result<R, EngineError> {
        let result = f(&mut self.procedures);
        self.flush_model_events()?;
        Ok(result)
    }

    pub fn update_variables<R>(
        &mut self,
        f: impl FnOnce(&mut VariableMap) -> R,
    ) -> Result<R, EngineError> {
        let result = f(&mut self.variables);
        self.flush_model_events()?;
        Ok(result)
    }

    fn dispose_users(&mut self, model: ModelId) -> Result<(), EngineError> {
        for id in self.workspace.blocks_using_model(model) {
            if !self.workspace.contains(id) {
                continue;
            }
            for block in self.workspace.dispose_block(id, true)? {
                self.forget(block.id);
            }
        }
        self.render_all()
    }

    /// Subscribe each model-referencing field of `id` to its map,
    /// replacing any earlier subscriptions.
    fn subscribe_fields(&mut self, id: BlockId) {
        let Some(block) = self.workspace.get(id) else {
            return;
        };
        let mut subs = Vec::new();
        for field in block.fields() {
            let (model, is_variable) = match &field.kind {
                FieldKind::Variable { variable, .. } => (*variable, true),
                FieldKind::Procedure { procedure, .. } => (*procedure, false),
                _ => continue,
            };
            let sink = Rc::clone(&self.pending);
            let listener = move |event: &MapEvent| {
                if event.id() == model {
                    sink.borrow_mut().push((id, model));
                }
            };
            subs.push(if is_variable {
                self.variables.subscribe(listener)
            } else {
                self.procedures.subscribe(listener)
            });
        }
        if subs.is_empty() {
            self.subscriptions.remove(&id);
        } else {
            self.subscriptions.insert(id, subs);
        }
    }

    /// Copy current model names into the fields of `id` that reference
    /// them. Returns whether any text changed.
    fn refresh_model_displays(&mut self, id: BlockId) -> bool {
        let Some(block) = self.workspace.get_mut(id) else {
            return false;
        };
        let mut changed = false;
        for input in &mut block.inputs {
            for field in &mut input.fields {
                let name = match &field.kind {
                    FieldKind::Variable { variable, .. } => {
                        self.variables.get(*variable).map(|v| v.name.clone())
                    }
                    FieldKind::Procedure { procedure, .. } => {
                        self.procedures.get(*procedure).map(|p| p.name.clone())
                    }
                    _ => None,
                };
                if let Some(name) = name {
                    changed |= field.set_model_display(&name);
                }
            }
        }
        changed
    }

    /// Drain queued map notifications: refresh field text and re-render
    /// each affected tree once.
    fn flush_model_events(&mut self) -> Result<(), EngineError> {
        let events: Vec<(BlockId, ModelId)> = self.pending.borrow_mut().drain(..).collect();
        let mut roots = Vec::new();
        for (block, _) in events {
            if !self.workspace.contains(block) {
                continue;
            }
            self.refresh_model_displays(block);
            let root = self.workspace.root_block(block);
            if !roots.contains(&root) {
                roots.push(root);
            }
        }
        for root in roots {
            self.render_tree(root)?;
        }
        Ok(())
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
