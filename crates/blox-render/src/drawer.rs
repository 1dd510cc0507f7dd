//! Measured rows → SVG path data.
//!
//! The outline is traced clockwise from the top-left corner in
//! left-to-right coordinates. Right-to-left blocks keep the same outline
//! and are mirrored by their path object; only field and icon placements
//! are emitted in mirrored coordinates.

use crate::constants::{ConstantProvider, ShapeKind};
use crate::error::RenderError;
use crate::info::{OutputMeasure, RenderInfo};
use crate::measurables::{Element, ElementKind, InputMeasure, Row, RowKind};
use crate::svg_paths;
use blox_core::Slot;
use kurbo::Rect;

/// What a placement positions inside the block group.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementTarget {
    Field { input: usize, field: usize },
    Icon(usize),
    SummaryLabel(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub target: PlacementTarget,
    /// Top-left corner, already mirrored for right-to-left blocks.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Placement {
    pub fn transform(&self) -> String {
        format!("translate({},{})", self.x, self.y)
    }
}

/// Outline of one connection, drawn when it is highlighted.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionHighlight {
    pub slot: Slot,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
    pub outline: String,
    /// Cutouts for empty or filled inline inputs.
    pub inline: String,
    pub highlights: Vec<ConnectionHighlight>,
    pub placements: Vec<Placement>,
    pub width: f64,
    pub height: f64,
    pub width_with_children: f64,
    pub rtl: bool,
}

impl Drawing {
    /// Full path data: the outline followed by the inline cutouts.
    pub fn path_data(&self) -> String {
        if self.inline.is_empty() {
            self.outline.clone()
        } else {
            format!("{}\n{}", self.outline, self.inline)
        }
    }

    /// Block bounds in workspace direction.
    pub fn bounds(&self) -> Rect {
        if self.rtl {
            Rect::new(-self.width, 0.0, 0.0, self.height)
        } else {
            Rect::new(0.0, 0.0, self.width, self.height)
        }
    }

    pub fn highlight(&self, slot: Slot) -> Option<&str> {
        self.highlights
            .iter()
            .find(|h| h.slot == slot)
            .map(|h| h.path.as_str())
    }
}

/// Draw a measured block.
pub fn draw(info: &RenderInfo, c: &ConstantProvider) -> Result<Drawing, RenderError> {
    let mut drawer = Drawer {
        info,
        c,
        outline: String::new(),
        inline: String::new(),
    };
    drawer.draw_outline()?;
    drawer.draw_internals();
    Ok(Drawing {
        outline: drawer.outline,
        inline: drawer.inline,
        highlights: connection_highlights(info, c),
        placements: placements(info),
        width: info.width,
        height: info.height,
        width_with_children: info.width_with_children,
        rtl: info.rtl,
    })
}

struct Drawer<'a> {
    info: &'a RenderInfo,
    c: &'a ConstantProvider,
    outline: String,
    inline: String,
}

impl Drawer<'_> {
    fn draw_outline(&mut self) -> Result<(), RenderError> {
        let info = self.info;
        let (Some(top), Some(bottom)) = (info.top_row(), info.bottom_row()) else {
            return Err(RenderError::MalformedRows { block: info.block });
        };
        if info.is_full_dynamic()
            && let Some(output) = &info.output
        {
            self.draw_full_dynamic(top, bottom, output);
            return Ok(());
        }

        self.draw_top(top);
        for row in &info.rows[1..info.rows.len() - 1] {
            if row.has_jagged_edge {
                self.draw_jagged_edge(row);
            } else if row.has_statement {
                self.draw_statement_input(row)?;
            } else if row.has_external_input {
                self.draw_value_input(row);
            } else {
                self.draw_right_side(row);
            }
        }
        self.draw_bottom(bottom);
        self.draw_left();
        Ok(())
    }

    fn draw_top(&mut self, top: &Row) {
        let corners = &self.c.shapes.outside_corners;
        self.outline += &svg_paths::move_by(top.x, self.info.start_y);
        for elem in &top.elements {
            match &elem.kind {
                ElementKind::LeftRoundCorner => self.outline += &corners.top_left,
                ElementKind::RightRoundCorner => self.outline += &corners.top_right,
                ElementKind::PreviousConnection { .. } => {
                    self.outline += &self.c.shapes.notch.path_forward;
                }
                ElementKind::Hat => self.outline += &self.c.shapes.start_hat.path,
                ElementKind::InRowSpacer => {
                    self.outline += &svg_paths::line_on_axis("h", elem.width);
                }
                _ => {}
            }
        }
        self.outline += &svg_paths::line_on_axis("V", top.y + top.height);
    }

    fn draw_right_side(&mut self, row: &Row) {
        if row.height > 0.0 {
            self.outline += &svg_paths::line_on_axis("V", row.y + row.height);
        }
    }

    fn draw_jagged_edge(&mut self, row: &Row) {
        self.outline += &self.c.shapes.jagged_teeth.path;
        self.draw_right_side(row);
    }

    fn draw_value_input(&mut self, row: &Row) {
        let Some((elem, m)) = last_input(row) else {
            self.draw_right_side(row);
            return;
        };
        self.outline += &svg_paths::line_on_axis("H", elem.x + elem.width);
        self.outline += &self
            .c
            .value_shape_path(m.shape, m.connection_height, -1.0, 1.0);
        self.draw_right_side(row);
    }

    fn draw_statement_input(&mut self, row: &Row) -> Result<(), RenderError> {
        let Some((_, m)) = last_input(row) else {
            self.draw_right_side(row);
            return Ok(());
        };
        if m.shape != ShapeKind::Notch {
            return Err(RenderError::ShapeMismatch {
                block: self.info.block,
            });
        }
        let corners = &self.c.shapes.inside_corners;
        let notch = &self.c.shapes.notch;
        let inner_x = row.x + row.statement_edge;
        self.outline += &svg_paths::line_on_axis("H", inner_x + m.notch_offset + notch.width);
        self.outline += &notch.path_back;
        self.outline += &svg_paths::line_on_axis("H", inner_x + corners.width);
        self.outline += &corners.path_top;
        self.outline += &svg_paths::line_on_axis("v", row.height - 2.0 * corners.height);
        self.outline += &corners.path_bottom;
        self.outline += &svg_paths::line_on_axis("H", row.x + row.width);
        Ok(())
    }

    fn draw_bottom(&mut self, bottom: &Row) {
        let corners = &self.c.shapes.outside_corners;
        let mut right_corner_offset = 0.0;
        let mut path = String::new();
        for elem in bottom.elements.iter().rev() {
            match &elem.kind {
                ElementKind::NextConnection { .. } => path += &self.c.shapes.notch.path_back,
                ElementKind::LeftSquareCorner => {
                    path += &svg_paths::line_on_axis("H", bottom.x);
                }
                ElementKind::LeftRoundCorner => path += &corners.bottom_left,
                ElementKind::RightRoundCorner => {
                    path += &corners.bottom_right;
                    right_corner_offset = self.c.corner_radius;
                }
                ElementKind::InRowSpacer => path += &svg_paths::line_on_axis("h", -elem.width),
                _ => {}
            }
        }
        self.outline += &svg_paths::line_on_axis("V", bottom.baseline - right_corner_offset);
        self.outline += &path;
    }

    fn draw_left(&mut self) {
        if let Some(output) = &self.info.output {
            if output.shape.is_dynamic() {
                self.outline += &self
                    .c
                    .value_shape_path(output.shape, output.height, -1.0, -1.0);
            } else {
                let tab_bottom = output.connection_offset_y + output.height;
                self.outline += &svg_paths::line_on_axis("V", tab_bottom);
                self.outline += &self.c.shapes.puzzle_tab.path_up;
            }
        }
        self.outline += "z";
    }

    /// A value block with no statements and no next connection: flat top
    /// and bottom with the output shape capping both ends.
    fn draw_full_dynamic(&mut self, top: &Row, bottom: &Row, output: &OutputMeasure) {
        let c = self.c;
        self.outline += &svg_paths::move_by(top.x, self.info.start_y);
        self.outline += &svg_paths::line_on_axis("h", top.width);
        self.outline += &c.value_shape_path(output.shape, output.height, 1.0, 1.0);
        self.outline += &svg_paths::line_on_axis("V", bottom.baseline);
        self.outline += &svg_paths::line_on_axis("h", -bottom.width);
        self.outline += &c.value_shape_path(output.shape, output.height, -1.0, -1.0);
        self.outline += "z";
    }

    fn draw_internals(&mut self) {
        for row in &self.info.rows {
            for elem in &row.elements {
                if let ElementKind::InlineInput(m) = &elem.kind {
                    self.draw_inline_input(elem, m);
                }
            }
        }
    }

    fn draw_inline_input(&mut self, elem: &Element, m: &InputMeasure) {
        let c = self.c;
        let y = elem.centerline - elem.height / 2.0;
        if m.shape.is_dynamic() {
            let flat = elem.width - 2.0 * m.connection_width;
            self.inline += &svg_paths::move_to(elem.x + m.connection_width, y);
            self.inline += &svg_paths::line_on_axis("h", flat);
            self.inline += &c.value_shape_path(m.shape, elem.height, 1.0, 1.0);
            self.inline += &svg_paths::line_on_axis("h", -flat);
            self.inline += &c.value_shape_path(m.shape, elem.height, -1.0, -1.0);
        } else {
            let connection_bottom = m.connection_offset_y + m.connection_height;
            self.inline += &svg_paths::move_to(elem.x + m.connection_width, y);
            self.inline += &svg_paths::line_on_axis("v", m.connection_offset_y);
            self.inline += &c.shapes.puzzle_tab.path_down;
            self.inline += &svg_paths::line_on_axis("v", elem.height - connection_bottom);
            self.inline += &svg_paths::line_on_axis("h", elem.width - m.connection_width);
            self.inline += &svg_paths::line_on_axis("v", -elem.height);
        }
        self.inline += "z";
    }
}

fn last_input(row: &Row) -> Option<(&Element, &InputMeasure)> {
    row.elements
        .iter()
        .rev()
        .find_map(|e| e.input().map(|m| (e, m)))
}

fn placements(info: &RenderInfo) -> Vec<Placement> {
    let mut out = Vec::new();
    for row in &info.rows {
        if row.kind != RowKind::Input {
            continue;
        }
        for elem in &row.elements {
            let target = match &elem.kind {
                ElementKind::Field { input, field } => PlacementTarget::Field {
                    input: *input,
                    field: *field,
                },
                ElementKind::Icon(i) => PlacementTarget::Icon(*i),
                ElementKind::SummaryLabel(text) => PlacementTarget::SummaryLabel(text.clone()),
                _ => continue,
            };
            let x = if info.rtl {
                -(elem.x + elem.width)
            } else {
                elem.x
            };
            out.push(Placement {
                target,
                x,
                y: elem.centerline - elem.height / 2.0,
                width: elem.width,
                height: elem.height,
            });
        }
    }
    out
}

fn connection_highlights(info: &RenderInfo, c: &ConstantProvider) -> Vec<ConnectionHighlight> {
    let unflip = |x: f64| if info.rtl { -x } else { x };
    info.connections
        .iter()
        .map(|point| {
            let x = unflip(point.offset.x);
            let y = point.offset.y;
            let path = match point.slot {
                Slot::Previous | Slot::Next => {
                    svg_paths::move_to(x, y) + &c.shapes.notch.path_forward
                }
                Slot::Output => {
                    let (shape, height) = info
                        .output
                        .as_ref()
                        .map_or((ShapeKind::PuzzleTab, 0.0), |o| (o.shape, o.height));
                    if shape.is_dynamic() {
                        svg_paths::move_to(x + c.shape_width(shape, height), y - height / 2.0)
                            + &c.value_shape_path(shape, height, -1.0, 1.0)
                    } else {
                        svg_paths::move_to(x, y) + &c.shapes.puzzle_tab.path_down
                    }
                }
                Slot::Input(index) => input_highlight(info, c, index, x, y),
            };
            ConnectionHighlight {
                slot: point.slot,
                path,
            }
        })
        .collect()
}

fn input_highlight(info: &RenderInfo, c: &ConstantProvider, index: usize, x: f64, y: f64) -> String {
    let measure = info
        .rows
        .iter()
        .flat_map(|r| r.elements.iter())
        .filter_map(Element::input)
        .find(|m| m.input == index);
    match measure {
        Some(m) if m.shape == ShapeKind::Notch => {
            svg_paths::move_to(x, y) + &c.shapes.notch.path_forward
        }
        Some(m) if m.shape.is_dynamic() => {
            svg_paths::move_to(x + m.connection_width, y - m.connection_height / 2.0)
                + &c.value_shape_path(m.shape, m.connection_height, -1.0, 1.0)
        }
        _ => svg_paths::move_to(x, y) + &c.shapes.puzzle_tab.path_down,
    }
}
