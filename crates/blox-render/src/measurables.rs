//! Rows and elements produced by a measurement pass.
//!
//! These exist only between measuring and drawing a block; nothing here
//! is stored on the block model.

use crate::constants::{ConstantProvider, ShapeKind};
use blox_core::{Align, BlockId};

/// Geometry of an input that can hold a block.
#[derive(Debug, Clone, PartialEq)]
pub struct InputMeasure {
    /// Index into the block's inputs.
    pub input: usize,
    pub shape: ShapeKind,
    pub connected_block: Option<BlockId>,
    pub connected_block_width: f64,
    pub connected_block_height: f64,
    pub connection_width: f64,
    pub connection_height: f64,
    pub connection_offset_x: f64,
    pub connection_offset_y: f64,
    pub notch_offset: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    LeftSquareCorner,
    LeftRoundCorner,
    RightSquareCorner,
    RightRoundCorner,
    Hat,
    PreviousConnection { notch_offset: f64 },
    NextConnection { notch_offset: f64 },
    /// A field, addressed by input and field index.
    Field { input: usize, field: usize },
    /// The text shown in place of a collapsed block's inputs.
    SummaryLabel(String),
    Icon(usize),
    InRowSpacer,
    ExternalValueInput(InputMeasure),
    InlineInput(InputMeasure),
    StatementInput(InputMeasure),
    JaggedEdge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub kind: ElementKind,
    pub width: f64,
    pub height: f64,
    /// Left edge, relative to the block origin.
    pub x: f64,
    /// Vertical centre, relative to the block origin.
    pub centerline: f64,
}

impl Element {
    pub fn new(kind: ElementKind, width: f64, height: f64) -> Self {
        Self {
            kind,
            width,
            height,
            x: 0.0,
            centerline: 0.0,
        }
    }

    pub fn spacer(width: f64) -> Self {
        Self::new(ElementKind::InRowSpacer, width, 0.0)
    }

    pub fn is_spacer(&self) -> bool {
        matches!(self.kind, ElementKind::InRowSpacer)
    }

    pub fn input(&self) -> Option<&InputMeasure> {
        match &self.kind {
            ElementKind::ExternalValueInput(m)
            | ElementKind::InlineInput(m)
            | ElementKind::StatementInput(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_statement_input(&self) -> bool {
        matches!(self.kind, ElementKind::StatementInput(_))
    }

    pub fn is_external_input(&self) -> bool {
        matches!(self.kind, ElementKind::ExternalValueInput(_))
    }

    pub fn is_previous_or_next(&self) -> bool {
        matches!(
            self.kind,
            ElementKind::PreviousConnection { .. } | ElementKind::NextConnection { .. }
        )
    }

    fn notch_offset(&self) -> f64 {
        match self.kind {
            ElementKind::PreviousConnection { notch_offset }
            | ElementKind::NextConnection { notch_offset } => notch_offset,
            _ => 0.0,
        }
    }
}

/// Horizontal gap between two neighbouring elements of a row.
pub fn in_row_spacing(c: &ConstantProvider, prev: Option<&Element>, next: Option<&Element>) -> f64 {
    match (prev, next) {
        (None, Some(n)) if n.is_statement_input() => c.statement_input_padding_left,
        (Some(p), None) => match p.kind {
            ElementKind::ExternalValueInput(_) | ElementKind::StatementInput(_) => c.no_padding,
            ElementKind::InlineInput(_) => c.large_padding,
            _ => c.medium_padding,
        },
        (Some(p), Some(n)) if n.is_previous_or_next() => match p.kind {
            ElementKind::LeftSquareCorner => n.notch_offset(),
            ElementKind::LeftRoundCorner => n.notch_offset() - c.corner_radius,
            _ => c.medium_padding,
        },
        _ => c.medium_padding,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Top,
    Bottom,
    Input,
    Spacer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub kind: RowKind,
    pub elements: Vec<Element>,
    pub width: f64,
    pub height: f64,
    pub min_width: f64,
    pub min_height: f64,
    pub width_with_connected_blocks: f64,
    pub x: f64,
    pub y: f64,
    pub align: Option<Align>,
    pub has_external_input: bool,
    pub has_statement: bool,
    pub has_inline_input: bool,
    pub has_dummy_input: bool,
    pub has_jagged_edge: bool,
    /// Input rows: summed widths of blocks plugged into this row.
    pub connected_block_widths: f64,
    /// Statement rows: x of the C-shape's inner edge.
    pub statement_edge: f64,
    /// Top rows: height of a hat above the block body.
    pub capline: f64,
    pub has_previous_connection: bool,
    /// Bottom rows: height of the next-connection notch below the body.
    pub descender_height: f64,
    pub baseline: f64,
    pub has_next_connection: bool,
    /// Spacer rows: neighbours' statement flags.
    pub follows_statement: bool,
    pub precedes_statement: bool,
}

impl Row {
    pub fn new(kind: RowKind) -> Self {
        Self {
            kind,
            elements: Vec::new(),
            width: 0.0,
            height: 0.0,
            min_width: 0.0,
            min_height: 0.0,
            width_with_connected_blocks: 0.0,
            x: 0.0,
            y: 0.0,
            align: None,
            has_external_input: false,
            has_statement: false,
            has_inline_input: false,
            has_dummy_input: false,
            has_jagged_edge: false,
            connected_block_widths: 0.0,
            statement_edge: 0.0,
            capline: 0.0,
            has_previous_connection: false,
            descender_height: 0.0,
            baseline: 0.0,
            has_next_connection: false,
            follows_statement: false,
            precedes_statement: false,
        }
    }

    pub fn input_row(min_height: f64) -> Self {
        let mut row = Self::new(RowKind::Input);
        row.min_height = min_height;
        row
    }

    pub fn spacer_row(height: f64, width: f64) -> Self {
        let mut row = Self::new(RowKind::Spacer);
        row.height = height;
        row.width = width;
        row.elements.push(Element::spacer(width));
        row
    }

    /// Only input rows get edge spacers; top and bottom rows start and end
    /// with corners.
    pub fn starts_with_elem_spacer(&self) -> bool {
        self.kind == RowKind::Input
    }

    pub fn ends_with_elem_spacer(&self) -> bool {
        self.kind == RowKind::Input && !self.has_external_input && !self.has_statement
    }

    pub fn first_spacer_mut(&mut self) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.is_spacer())
    }

    pub fn last_spacer_mut(&mut self) -> Option<&mut Element> {
        self.elements.iter_mut().rev().find(|e| e.is_spacer())
    }

    pub fn last_input_mut(&mut self) -> Option<&mut Element> {
        self.elements.iter_mut().rev().find(|e| e.input().is_some())
    }

    pub fn statement_input(&self) -> Option<&Element> {
        self.elements.iter().rev().find(|e| e.is_statement_input())
    }

    /// Compute width and height from the elements.
    pub fn measure(&mut self) {
        match self.kind {
            RowKind::Top => {
                let (mut width, mut height, mut ascender) = (0.0_f64, 0.0_f64, 0.0_f64);
                for e in &self.elements {
                    width += e.width;
                    if e.is_spacer() {
                        continue;
                    }
                    if matches!(e.kind, ElementKind::Hat) {
                        ascender = ascender.max(e.height);
                    } else {
                        height = height.max(e.height);
                    }
                }
                self.width = self.min_width.max(width);
                self.height = self.min_height.max(height) + ascender;
                self.capline = ascender;
                self.width_with_connected_blocks = self.width;
            }
            RowKind::Bottom => {
                let (mut width, mut height, mut descender) = (0.0_f64, 0.0_f64, 0.0_f64);
                for e in &self.elements {
                    width += e.width;
                    if e.is_spacer() {
                        continue;
                    }
                    if matches!(e.kind, ElementKind::NextConnection { .. }) {
                        descender = descender.max(e.height);
                    } else {
                        height = height.max(e.height);
                    }
                }
                self.width = self.min_width.max(width);
                self.height = self.min_height.max(height) + descender;
                self.descender_height = descender;
                self.width_with_connected_blocks = self.width;
            }
            RowKind::Input => {
                self.width = self.min_width;
                self.height = self.min_height;
                let mut connected = 0.0;
                for e in &self.elements {
                    self.width += e.width;
                    match &e.kind {
                        ElementKind::StatementInput(m) => connected += m.connected_block_width,
                        ElementKind::ExternalValueInput(m) if m.connected_block_width != 0.0 => {
                            connected += m.connected_block_width - m.connection_width;
                        }
                        _ => {}
                    }
                    if !e.is_spacer() {
                        self.height = self.height.max(e.height);
                    }
                }
                self.connected_block_widths = connected;
                self.width_with_connected_blocks = self.width + connected;
            }
            RowKind::Spacer => {}
        }
    }

    /// Vertical centre of an element once the row is positioned.
    pub fn elem_centerline(&self, elem: &Element) -> f64 {
        if elem.is_spacer() {
            return self.y + elem.height / 2.0;
        }
        match self.kind {
            RowKind::Top => {
                if matches!(elem.kind, ElementKind::Hat) {
                    self.capline - elem.height / 2.0
                } else {
                    self.capline + elem.height / 2.0
                }
            }
            RowKind::Bottom => {
                let baseline = self.y + self.height - self.descender_height;
                if matches!(elem.kind, ElementKind::NextConnection { .. }) {
                    baseline + elem.height / 2.0
                } else {
                    baseline - elem.height / 2.0
                }
            }
            _ => self.y + self.height / 2.0,
        }
    }
}
