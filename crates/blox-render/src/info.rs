//! The measurement pass.
//!
//! `RenderInfo::measure` turns a block's inputs and fields into rows of
//! positioned elements. It reads the workspace and never writes to it, so
//! measuring the same tree with the same constants always yields the same
//! geometry.

use crate::constants::{ConstantProvider, ShapeKind, SpacingPolicy};
use crate::error::RenderError;
use crate::measurables::{Element, ElementKind, InputMeasure, Row, RowKind, in_row_spacing};
use crate::renderer::Renderer;
use blox_core::{Align, Block, BlockId, ConnectionRef, Input, InputKind, Slot, Workspace};
use kurbo::Point;
use std::collections::HashMap;

// ─── Stack sizes ─────────────────────────────────────────────────────────

/// Rendered size of a block, including anything plugged into it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockSize {
    pub width: f64,
    pub height: f64,
}

/// Per-pass memo of child block sizes.
///
/// Measuring a parent needs the size of every block plugged into it; one
/// `StackSizes` shared across a render pass measures each block once.
#[derive(Debug, Default)]
pub struct StackSizes {
    blocks: HashMap<BlockId, BlockSize>,
}

impl StackSizes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: BlockId) -> Option<BlockSize> {
        self.blocks.get(&id).copied()
    }

    pub fn record(&mut self, id: BlockId, size: BlockSize) {
        self.blocks.insert(id, size);
    }

    pub fn block_size(
        &mut self,
        ws: &Workspace,
        id: BlockId,
        renderer: &Renderer,
    ) -> Result<BlockSize, RenderError> {
        if let Some(size) = self.get(id) {
            return Ok(size);
        }
        let size = renderer.measure(ws, id, self)?.size();
        self.record(id, size);
        Ok(size)
    }

    /// Size of a block and every block hanging below it. Each next block
    /// overlaps the one above by the notch height.
    pub fn stack_size(
        &mut self,
        ws: &Workspace,
        id: BlockId,
        renderer: &Renderer,
    ) -> Result<BlockSize, RenderError> {
        let mut total = self.block_size(ws, id, renderer)?;
        let overlap = renderer.constants().notch_height;
        let mut current = ws.get_next_block(id);
        while let Some(next) = current {
            let size = self.block_size(ws, next, renderer)?;
            total.height += size.height - overlap;
            total.width = total.width.max(size.width);
            current = ws.get_next_block(next);
        }
        Ok(total)
    }
}

// ─── Render info ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct OutputMeasure {
    pub shape: ShapeKind,
    pub width: f64,
    pub height: f64,
    pub connection_offset_x: f64,
    pub connection_offset_y: f64,
}

/// Where a connection sits, relative to the block origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionPoint {
    pub slot: Slot,
    pub offset: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderInfo {
    pub block: BlockId,
    pub rtl: bool,
    pub is_inline: bool,
    pub is_collapsed: bool,
    pub has_statement_input: bool,
    pub output: Option<OutputMeasure>,
    pub rows: Vec<Row>,
    pub width: f64,
    pub height: f64,
    pub width_with_children: f64,
    pub statement_edge: f64,
    pub start_x: f64,
    pub start_y: f64,
    pub connections: Vec<ConnectionPoint>,
}

impl RenderInfo {
    /// Measure one block. Blocks plugged into it are measured through
    /// `sizes` with the same renderer.
    pub fn measure(
        ws: &Workspace,
        id: BlockId,
        renderer: &Renderer,
        sizes: &mut StackSizes,
    ) -> Result<RenderInfo, RenderError> {
        let block = ws.get(id).ok_or(RenderError::UnknownBlock(id))?;
        let c = renderer.constants();
        let mut pass = Pass {
            ws,
            block,
            renderer,
            c,
            sizes,
            info: RenderInfo::empty(block, ws.rtl, c),
        };
        pass.create_rows()?;
        pass.add_elem_spacing();
        pass.add_row_spacing();
        pass.compute_bounds();
        pass.align_row_elements()?;
        pass.finalize()?;
        log::trace!(
            "measured {id:?}: {} rows, {}x{}",
            pass.info.rows.len(),
            pass.info.width,
            pass.info.height
        );
        Ok(pass.info)
    }

    fn empty(block: &Block, rtl: bool, c: &ConstantProvider) -> Self {
        let output = block.output.as_ref().map(|conn| {
            let shape = c.shape_for(conn.kind, conn.check(), block.output_shape);
            if shape.is_dynamic() {
                // Sized once the block height is known.
                OutputMeasure {
                    shape,
                    width: 0.0,
                    height: 0.0,
                    connection_offset_x: 0.0,
                    connection_offset_y: 0.0,
                }
            } else {
                OutputMeasure {
                    shape,
                    width: c.shape_width(shape, 0.0),
                    height: c.shape_height(shape, 0.0),
                    connection_offset_x: 0.0,
                    connection_offset_y: c.tab_offset_from_top,
                }
            }
        });
        Self {
            block: block.id,
            rtl,
            is_inline: block.inputs_inline && !block.collapsed,
            is_collapsed: block.collapsed,
            has_statement_input: block.statement_input_count() > 0,
            output,
            rows: Vec::new(),
            width: 0.0,
            height: 0.0,
            width_with_children: 0.0,
            statement_edge: 0.0,
            start_x: 0.0,
            start_y: 0.0,
            connections: Vec::new(),
        }
    }

    /// Rows that hold inputs, fields, or icons.
    pub fn input_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(|r| r.kind == RowKind::Input)
    }

    pub fn top_row(&self) -> Option<&Row> {
        self.rows.first().filter(|r| r.kind == RowKind::Top)
    }

    pub fn bottom_row(&self) -> Option<&Row> {
        self.rows.last().filter(|r| r.kind == RowKind::Bottom)
    }

    /// Size as seen by a parent block.
    pub fn size(&self) -> BlockSize {
        BlockSize {
            width: self.width_with_children,
            height: self.height,
        }
    }

    pub fn connection(&self, slot: Slot) -> Option<Point> {
        self.connections
            .iter()
            .find(|p| p.slot == slot)
            .map(|p| p.offset)
    }

    /// A dynamic output shape caps both the left and right edges.
    pub fn is_full_dynamic(&self) -> bool {
        self.output.as_ref().is_some_and(|o| o.shape.is_dynamic())
            && !self.has_statement_input
            && !self.bottom_row().is_some_and(|r| r.has_next_connection)
    }
}

// ─── The pass ────────────────────────────────────────────────────────────

struct Pass<'a, 's> {
    ws: &'a Workspace,
    block: &'a Block,
    renderer: &'a Renderer,
    c: &'a ConstantProvider,
    sizes: &'s mut StackSizes,
    info: RenderInfo,
}

impl Pass<'_, '_> {
    fn create_rows(&mut self) -> Result<(), RenderError> {
        let block = self.block;
        let c = self.c;
        let mut top = Row::new(RowKind::Top);
        self.populate_top_row(&mut top);
        self.info.rows.push(top);

        let mut active = Row::input_row(c.min_row_height);
        // Most icons hide while collapsed; warnings stay visible.
        for (i, icon) in block.icons.iter().enumerate() {
            if !(block.collapsed && icon.collapse_hidden) {
                active
                    .elements
                    .push(Element::new(ElementKind::Icon(i), icon.width, icon.height));
            }
        }

        if block.collapsed {
            let text = self.ws.summary_text(block.id);
            let width = c.text_width(&text);
            active.elements.push(Element::new(
                ElementKind::SummaryLabel(text),
                width,
                c.field_text_height,
            ));
            active.elements.push(Element::new(
                ElementKind::JaggedEdge,
                c.shapes.jagged_teeth.width,
                c.shapes.jagged_teeth.height,
            ));
            active.has_jagged_edge = true;
            self.info.rows.push(active);
        } else {
            let mut last: Option<&Input> = None;
            for (i, input) in block.inputs.iter().enumerate() {
                if !input.visible {
                    continue;
                }
                if self.should_start_new_row(input, last) {
                    let done = std::mem::replace(&mut active, Row::input_row(c.min_row_height));
                    self.info.rows.push(done);
                }
                for (j, field) in input.fields.iter().enumerate() {
                    if !field.visible {
                        continue;
                    }
                    let size = c.field_size(field);
                    active.elements.push(Element::new(
                        ElementKind::Field { input: i, field: j },
                        size.width,
                        size.height,
                    ));
                }
                self.add_input(i, input, &mut active)?;
                last = Some(input);
            }
            if !active.elements.is_empty() || active.has_dummy_input {
                self.info.rows.push(active);
            }
        }

        if self.info.rows.len() == 1 {
            let mut empty = Row::input_row(c.empty_block_spacer_height);
            empty.min_width = c.min_block_width;
            self.info.rows.push(empty);
        }

        let mut bottom = Row::new(RowKind::Bottom);
        self.populate_bottom_row(&mut bottom);
        self.info.rows.push(bottom);
        Ok(())
    }

    fn should_start_new_row(&self, input: &Input, last: Option<&Input>) -> bool {
        let Some(last) = last else {
            return false;
        };
        if input.kind == InputKind::Statement
            || last.kind == InputKind::Statement
            || last.kind == InputKind::EndRow
        {
            return true;
        }
        !self.info.is_inline
    }

    fn right_corner_is_square(&self) -> bool {
        let block = self.block;
        !self.c.right_corners_round
            || (block.output.is_some() && block.statement_input_count() == 0 && block.next.is_none())
    }

    fn populate_top_row(&self, row: &mut Row) {
        let block = self.block;
        let c = self.c;
        let has_hat =
            (block.hat || c.add_start_hats) && block.previous.is_none() && block.output.is_none();
        let left_square = block.output.is_some()
            || has_hat
            || self.ws.get_previous_block(block.id).is_some();

        row.elements.push(if left_square {
            Element::new(ElementKind::LeftSquareCorner, c.no_padding, c.no_padding)
        } else {
            Element::new(ElementKind::LeftRoundCorner, c.corner_radius, c.corner_radius / 2.0)
        });

        if has_hat {
            row.elements.push(Element::new(
                ElementKind::Hat,
                c.shapes.start_hat.width,
                c.shapes.start_hat.height,
            ));
        } else if block.previous.is_some() {
            row.has_previous_connection = true;
            row.elements.push(Element::new(
                ElementKind::PreviousConnection {
                    notch_offset: c.notch_offset_left,
                },
                c.shapes.notch.width,
                c.shapes.notch.height,
            ));
        }

        let precedes_statement = !block.collapsed
            && block
                .first_visible_input()
                .is_some_and(|i| i.kind == InputKind::Statement);
        row.min_height = if precedes_statement {
            c.top_row_precedes_statement_min_height
        } else {
            c.top_row_min_height
        };

        row.elements.push(if self.right_corner_is_square() {
            Element::new(ElementKind::RightSquareCorner, c.no_padding, c.no_padding)
        } else {
            Element::new(ElementKind::RightRoundCorner, c.corner_radius, c.corner_radius)
        });
    }

    fn populate_bottom_row(&self, row: &mut Row) {
        let block = self.block;
        let c = self.c;
        let follows_statement = !block.collapsed
            && block
                .last_visible_input()
                .is_some_and(|i| i.kind == InputKind::Statement);
        row.min_height = if follows_statement {
            c.bottom_row_after_statement_min_height
        } else {
            c.bottom_row_min_height
        };

        let left_square = block.output.is_some() || self.ws.get_next_block(block.id).is_some();
        row.elements.push(if left_square {
            Element::new(ElementKind::LeftSquareCorner, c.no_padding, c.no_padding)
        } else {
            Element::new(ElementKind::LeftRoundCorner, c.corner_radius, c.corner_radius / 2.0)
        });

        if block.next.is_some() {
            row.has_next_connection = true;
            row.elements.push(Element::new(
                ElementKind::NextConnection {
                    notch_offset: c.notch_offset_left,
                },
                c.shapes.notch.width,
                c.shapes.notch.height,
            ));
        }

        row.elements.push(if self.right_corner_is_square() {
            Element::new(ElementKind::RightSquareCorner, c.no_padding, c.no_padding)
        } else {
            Element::new(ElementKind::RightRoundCorner, c.corner_radius, c.corner_radius)
        });
    }

    fn add_input(&mut self, index: usize, input: &Input, row: &mut Row) -> Result<(), RenderError> {
        let c = self.c;
        let kind = match (input.kind, input.connection.is_some()) {
            (InputKind::Value, true) | (InputKind::Statement, true) => input.kind,
            _ => InputKind::Dummy,
        };
        match kind {
            InputKind::Value if self.info.is_inline => {
                let (m, width, height) = self.measure_inline_input(index, input)?;
                row.elements
                    .push(Element::new(ElementKind::InlineInput(m), width, height));
                row.has_inline_input = true;
            }
            InputKind::Value => {
                let (m, width, height) = self.measure_external_input(index, input)?;
                row.elements
                    .push(Element::new(ElementKind::ExternalValueInput(m), width, height));
                row.has_external_input = true;
            }
            InputKind::Statement => {
                let (m, width, height) = self.measure_statement_input(index, input)?;
                row.elements
                    .push(Element::new(ElementKind::StatementInput(m), width, height));
                row.has_statement = true;
            }
            InputKind::Dummy | InputKind::EndRow => {
                let min = if self.block.shadow {
                    c.dummy_input_shadow_min_height
                } else {
                    c.dummy_input_min_height
                };
                row.min_height = row.min_height.max(min);
                row.has_dummy_input = true;
            }
        }
        if row.align.is_none() {
            row.align = Some(input.align);
        }
        Ok(())
    }

    /// Connected block, its stack size, and the connection shape.
    fn connected(&mut self, index: usize, input: &Input) -> Result<(Option<BlockId>, BlockSize, ShapeKind), RenderError> {
        let target = self
            .ws
            .target_block(ConnectionRef::new(self.block.id, Slot::Input(index)));
        let size = match target {
            Some(child) => self.sizes.stack_size(self.ws, child, self.renderer)?,
            None => BlockSize {
                width: 0.0,
                height: 0.0,
            },
        };
        let child = target.and_then(|t| self.ws.get(t));
        let shape = match &input.connection {
            Some(conn) => {
                let check = conn
                    .check()
                    .or_else(|| child.and_then(|b| b.output.as_ref()).and_then(|o| o.check()));
                self.c
                    .shape_for(conn.kind, check, child.and_then(|b| b.output_shape))
            }
            None => ShapeKind::PuzzleTab,
        };
        Ok((target, size, shape))
    }

    fn measure_inline_input(&mut self, index: usize, input: &Input) -> Result<(InputMeasure, f64, f64), RenderError> {
        let c = self.c;
        let (target, size, shape) = self.connected(index, input)?;
        let (mut width, height) = match target {
            Some(_) => (size.width, size.height),
            None => (c.empty_inline_input_padding, c.empty_inline_input_height),
        };
        let connection_height = c.shape_height(shape, height);
        let connection_width = c.shape_width(shape, height);
        if target.is_none() {
            width += connection_width * if shape.is_dynamic() { 2.0 } else { 1.0 };
        }
        let m = InputMeasure {
            input: index,
            shape,
            connected_block: target,
            connected_block_width: size.width,
            connected_block_height: size.height,
            connection_width,
            connection_height,
            connection_offset_x: if shape.is_dynamic() { -connection_width } else { 0.0 },
            connection_offset_y: if shape.is_dynamic() {
                connection_height / 2.0
            } else {
                c.tab_offset_from_top
            },
            notch_offset: 0.0,
        };
        Ok((m, width, height))
    }

    fn measure_external_input(&mut self, index: usize, input: &Input) -> Result<(InputMeasure, f64, f64), RenderError> {
        let c = self.c;
        let (target, size, shape) = self.connected(index, input)?;
        let reference = match target {
            Some(_) => size.height,
            None => c.empty_inline_input_height,
        };
        let connection_height = c.shape_height(shape, reference);
        let connection_width = c.shape_width(shape, reference);
        let height = match target {
            None => connection_height,
            Some(_) if shape.is_dynamic() => size.height,
            Some(_) => size.height - c.tab_offset_from_top - c.medium_padding,
        };
        let m = InputMeasure {
            input: index,
            shape,
            connected_block: target,
            connected_block_width: size.width,
            connected_block_height: size.height,
            connection_width,
            connection_height,
            connection_offset_x: 0.0,
            connection_offset_y: if shape.is_dynamic() {
                connection_height / 2.0
            } else {
                c.tab_offset_from_top
            },
            notch_offset: 0.0,
        };
        Ok((m, connection_width + c.external_value_input_padding, height))
    }

    fn measure_statement_input(&mut self, index: usize, input: &Input) -> Result<(InputMeasure, f64, f64), RenderError> {
        let c = self.c;
        let (target, size, shape) = self.connected(index, input)?;
        let height = match target {
            Some(_) => size.height + c.statement_bottom_spacer,
            None => c.empty_statement_input_height,
        };
        let notch = &c.shapes.notch;
        let m = InputMeasure {
            input: index,
            shape,
            connected_block: target,
            connected_block_width: size.width,
            connected_block_height: size.height,
            connection_width: notch.width,
            connection_height: notch.height,
            connection_offset_x: 0.0,
            connection_offset_y: 0.0,
            notch_offset: c.statement_input_notch_offset,
        };
        Ok((m, c.statement_input_notch_offset + notch.width, height))
    }

    fn add_elem_spacing(&mut self) {
        let c = self.c;
        for row in &mut self.info.rows {
            let old = std::mem::take(&mut row.elements);
            if row.starts_with_elem_spacer() {
                row.elements
                    .push(Element::spacer(in_row_spacing(c, None, old.first())));
            }
            let Some(last) = old.last().cloned() else {
                continue;
            };
            let mut iter = old.into_iter().peekable();
            while let Some(elem) = iter.next() {
                let gap = iter.peek().map(|next| in_row_spacing(c, Some(&elem), Some(next)));
                row.elements.push(elem);
                if let Some(gap) = gap {
                    row.elements.push(Element::spacer(gap));
                }
            }
            if row.ends_with_elem_spacer() {
                row.elements
                    .push(Element::spacer(in_row_spacing(c, Some(&last), None)));
            }
        }
    }

    fn add_row_spacing(&mut self) {
        let old = std::mem::take(&mut self.info.rows);
        let top_min_height = old.first().map_or(0.0, |r| r.min_height);
        let width = self.info.width - self.info.start_x;
        let mut rows = Vec::with_capacity(old.len() * 2);
        let mut iter = old.into_iter().peekable();
        while let Some(row) = iter.next() {
            let spacer = iter.peek().map(|next| {
                let mut spacer =
                    Row::spacer_row(self.spacer_row_height(&row, next, top_min_height), width);
                spacer.follows_statement = row.kind == RowKind::Input && row.has_statement;
                spacer.precedes_statement = next.kind == RowKind::Input && next.has_statement;
                spacer
            });
            rows.push(row);
            rows.extend(spacer);
        }
        self.info.rows = rows;
    }

    fn spacer_row_height(&self, prev: &Row, next: &Row, top_min_height: f64) -> f64 {
        let c = self.c;
        if c.spacing_policy == SpacingPolicy::Uniform {
            return c.between_row_spacing;
        }
        let follows = prev.kind == RowKind::Input && prev.has_statement;
        let precedes = next.kind == RowKind::Input && next.has_statement;
        if follows || precedes {
            let height = c.notch_height.max(c.shapes.inside_corners.height);
            return if follows && precedes {
                height.max(c.dummy_input_min_height)
            } else {
                height
            };
        }
        let has_output = self.info.output.is_some();
        if prev.kind == RowKind::Top {
            return if !prev.has_previous_connection && (!has_output || self.info.has_statement_input) {
                (c.notch_height - c.corner_radius).abs()
            } else {
                c.no_padding
            };
        }
        if next.kind == RowKind::Bottom {
            if !has_output {
                return top_min_height.max(c.notch_height.max(c.corner_radius)) - c.corner_radius;
            }
            if !next.has_next_connection && self.info.has_statement_input {
                return (c.notch_height - c.corner_radius).abs();
            }
            return c.no_padding;
        }
        c.between_row_spacing
    }

    fn compute_bounds(&mut self) {
        let mut widest_statement_row_fields = 0.0_f64;
        let mut block_width = 0.0_f64;
        let mut widest_row_with_connected_blocks = 0.0_f64;
        for row in &mut self.info.rows {
            row.measure();
            block_width = block_width.max(row.width);
            if row.has_statement
                && let Some(statement) = row.statement_input()
            {
                widest_statement_row_fields =
                    widest_statement_row_fields.max(row.width - statement.width);
            }
            widest_row_with_connected_blocks =
                widest_row_with_connected_blocks.max(row.width_with_connected_blocks);
        }
        block_width = block_width.max(self.c.min_block_width);

        self.info.statement_edge = widest_statement_row_fields;
        self.info.width = block_width;
        for row in &mut self.info.rows {
            if row.has_statement {
                row.statement_edge = widest_statement_row_fields;
            }
        }
        self.info.width_with_children = block_width.max(widest_row_with_connected_blocks);
        if let Some(output) = &self.info.output {
            self.info.start_x = output.width;
            self.info.width += output.width;
            self.info.width_with_children += output.width;
        }
    }

    fn align_row_elements(&mut self) -> Result<(), RenderError> {
        let block = self.block.id;
        let desired = self.info.width - self.info.start_x;
        let statement_edge = self.info.statement_edge;
        for (index, row) in self.info.rows.iter_mut().enumerate() {
            if row.has_statement {
                align_statement_row(row, statement_edge, desired)
                    .map_err(|()| RenderError::MissingSpacer { block, row: index })?;
            } else {
                let missing = desired - row.width;
                if missing > 0.0 {
                    add_alignment_padding(row, missing)
                        .map_err(|()| RenderError::MissingSpacer { block, row: index })?;
                }
                if matches!(row.kind, RowKind::Top | RowKind::Bottom) {
                    row.width_with_connected_blocks = row.width;
                }
            }
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), RenderError> {
        let c = self.c;
        let full_dynamic = self.info.is_full_dynamic();
        let total_height: f64 = self.info.rows.iter().map(|r| r.height).sum();
        let mut right_cap = 0.0;
        if let Some(output) = &mut self.info.output
            && output.shape.is_dynamic()
        {
            output.height = c.shape_height(output.shape, total_height);
            output.width = c.shape_width(output.shape, total_height);
            output.connection_offset_x = -output.width;
            output.connection_offset_y = output.height / 2.0;
            self.info.start_x = output.width;
            self.info.width += output.width;
            if full_dynamic {
                right_cap = output.width;
                self.info.width += right_cap;
            }
        }

        let start_x = self.info.start_x;
        let mut y = 0.0;
        let mut widest = 0.0_f64;
        for row in &mut self.info.rows {
            row.y = y;
            row.x = start_x;
            y += row.height;
            widest = widest.max(row.width_with_connected_blocks);
            record_elem_positions(row);
        }

        if self.info.output.is_some()
            && let Some(next) = self.ws.get_next_block(self.block.id)
        {
            let below = self.sizes.stack_size(self.ws, next, self.renderer)?;
            widest = widest.max(below.width);
        }

        self.info.width_with_children = widest + start_x + right_cap;
        self.info.height = y;
        self.info.start_y = self.info.rows.first().map_or(0.0, |r| r.capline);
        if let Some(bottom) = self.info.rows.last_mut()
            && bottom.kind == RowKind::Bottom
        {
            bottom.baseline = y - bottom.descender_height;
        }
        self.info.connections = connection_points(&self.info);
        Ok(())
    }
}

// ─── Alignment ───────────────────────────────────────────────────────────

/// Widen spacers so the row fills `missing` more pixels. Centre alignment
/// gives the trailing spacer `floor(missing / 2)` and the leading spacer
/// the rest.
fn add_alignment_padding(row: &mut Row, missing: f64) -> Result<(), ()> {
    if row.has_external_input || row.has_statement {
        row.width_with_connected_blocks += missing;
    }
    match row.align.unwrap_or(Align::Left) {
        Align::Left => row.last_spacer_mut().ok_or(())?.width += missing,
        Align::Right => row.first_spacer_mut().ok_or(())?.width += missing,
        Align::Centre => {
            let trailing = (missing / 2.0).floor();
            row.first_spacer_mut().ok_or(())?.width += missing - trailing;
            row.last_spacer_mut().ok_or(())?.width += trailing;
        }
    }
    row.width += missing;
    Ok(())
}

/// Line the statement input up with the block's statement edge, then
/// stretch it to the full block width.
fn align_statement_row(row: &mut Row, statement_edge: f64, desired: f64) -> Result<(), ()> {
    let statement_width = row.statement_input().map_or(0.0, |e| e.width);
    let missing = statement_edge - (row.width - statement_width);
    if missing > 0.0 {
        add_alignment_padding(row, missing)?;
    }
    let extra = desired - row.width;
    let row_height = row.height;
    if let Some(statement) = row.last_input_mut() {
        statement.width += extra;
        statement.height = statement.height.max(row_height);
    }
    row.width += extra;
    row.width_with_connected_blocks = row
        .width
        .max(statement_edge + row.connected_block_widths);
    Ok(())
}

fn record_elem_positions(row: &mut Row) {
    let mut x = row.x;
    for i in 0..row.elements.len() {
        if row.elements[i].is_spacer() {
            row.elements[i].height = row.height;
        }
        row.elements[i].x = x;
        let centerline = row.elem_centerline(&row.elements[i]);
        let elem = &mut row.elements[i];
        elem.centerline = centerline;
        x += elem.width;
    }
}

fn connection_points(info: &RenderInfo) -> Vec<ConnectionPoint> {
    let flip = |x: f64| if info.rtl { -x } else { x };
    let mut points = Vec::new();
    if let Some(output) = &info.output {
        points.push(ConnectionPoint {
            slot: Slot::Output,
            offset: Point::new(
                flip(info.start_x + output.connection_offset_x),
                output.connection_offset_y,
            ),
        });
    }
    for row in &info.rows {
        for elem in &row.elements {
            let (slot, x, y) = match &elem.kind {
                ElementKind::PreviousConnection { .. } => (Slot::Previous, elem.x, row.y),
                ElementKind::NextConnection { .. } => (Slot::Next, elem.x, row.baseline),
                ElementKind::ExternalValueInput(m) => {
                    let dy = if m.shape.is_dynamic() {
                        m.connection_offset_y
                    } else {
                        0.0
                    };
                    (Slot::Input(m.input), row.x + row.width, row.y + dy)
                }
                ElementKind::InlineInput(m) => (
                    Slot::Input(m.input),
                    elem.x + m.connection_width + m.connection_offset_x,
                    elem.centerline - elem.height / 2.0 + m.connection_offset_y,
                ),
                ElementKind::StatementInput(m) => (
                    Slot::Input(m.input),
                    row.x + row.statement_edge + m.notch_offset,
                    row.y,
                ),
                _ => continue,
            };
            points.push(ConnectionPoint {
                slot,
                offset: Point::new(flip(x), y),
            });
        }
    }
    points
}
