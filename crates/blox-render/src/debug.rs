//! Debug overlay: outlines of rows, elements, and connection points.

use crate::info::RenderInfo;
use crate::measurables::RowKind;
use kurbo::{Circle, Point, Rect};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugConfig {
    pub row_spacers: bool,
    pub elem_spacers: bool,
    pub rows: bool,
    pub elems: bool,
    pub connections: bool,
    pub block_bounds: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            row_spacers: true,
            elem_spacers: true,
            rows: true,
            elems: true,
            connections: true,
            block_bounds: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DebugShape {
    Rect { rect: Rect, class: &'static str },
    Circle { circle: Circle, class: &'static str },
}

impl DebugShape {
    fn to_svg(&self) -> String {
        match self {
            DebugShape::Rect { rect, class } => format!(
                r#"<rect class="{class}" x="{}" y="{}" width="{}" height="{}"/>"#,
                rect.x0,
                rect.y0,
                rect.width(),
                rect.height()
            ),
            DebugShape::Circle { circle, class } => format!(
                r#"<circle class="{class}" cx="{}" cy="{}" r="{}"/>"#,
                circle.center.x, circle.center.y, circle.radius
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Debug {
    pub config: DebugConfig,
    shapes: Vec<DebugShape>,
}

impl Debug {
    pub fn new(config: DebugConfig) -> Self {
        Self {
            config,
            shapes: Vec::new(),
        }
    }

    pub fn shapes(&self) -> &[DebugShape] {
        &self.shapes
    }

    /// Replace the overlay with one for `info`.
    pub fn draw(&mut self, info: &RenderInfo) -> &[DebugShape] {
        self.shapes.clear();
        let mirror = |rect: Rect| {
            if info.rtl {
                Rect::new(-rect.x1, rect.y0, -rect.x0, rect.y1)
            } else {
                rect
            }
        };
        for row in &info.rows {
            let is_spacer = row.kind == RowKind::Spacer;
            if (is_spacer && self.config.row_spacers) || (!is_spacer && self.config.rows) {
                let rect = Rect::new(row.x, row.y, row.x + row.width, row.y + row.height);
                self.shapes.push(DebugShape::Rect {
                    rect: mirror(rect),
                    class: if is_spacer {
                        "blox-debug-row-spacer"
                    } else {
                        "blox-debug-row"
                    },
                });
            }
            if is_spacer {
                continue;
            }
            for elem in &row.elements {
                let spacer = elem.is_spacer();
                if (spacer && !self.config.elem_spacers) || (!spacer && !self.config.elems) {
                    continue;
                }
                let top = elem.centerline - elem.height / 2.0;
                let rect = Rect::new(elem.x, top, elem.x + elem.width, top + elem.height);
                self.shapes.push(DebugShape::Rect {
                    rect: mirror(rect),
                    class: if spacer {
                        "blox-debug-elem-spacer"
                    } else {
                        "blox-debug-elem"
                    },
                });
            }
        }
        if self.config.connections {
            for point in &info.connections {
                self.shapes.push(DebugShape::Circle {
                    circle: Circle::new(point.offset, 3.0),
                    class: "blox-debug-connection",
                });
            }
        }
        if self.config.block_bounds {
            let rect = Rect::from_origin_size(Point::ZERO, (info.width, info.height));
            self.shapes.push(DebugShape::Rect {
                rect: mirror(rect),
                class: "blox-debug-block",
            });
        }
        &self.shapes
    }

    pub fn to_svg(&self) -> String {
        let mut out = String::from(r#"<g class="blox-debug">"#);
        for shape in &self.shapes {
            let _ = write!(out, "{}", shape.to_svg());
        }
        out.push_str("</g>");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::StackSizes;
    use crate::renderer::Renderer;
    use blox_core::{Block, BlockId, Workspace};

    #[test]
    fn config_filters_shape_kinds() {
        let renderer = Renderer::geras().unwrap();
        let mut ws = Workspace::new();
        let id = ws
            .add_block(Block::statement(BlockId::intern("debug_block"), "noop"))
            .unwrap();
        let info = renderer.measure(&ws, id, &mut StackSizes::new()).unwrap();

        let mut all = Debug::new(DebugConfig::default());
        let n_all = all.draw(&info).len();
        let circles = all
            .shapes()
            .iter()
            .filter(|s| matches!(s, DebugShape::Circle { .. }))
            .count();
        assert_eq!(circles, 2);

        let mut only_bounds = Debug::new(DebugConfig {
            row_spacers: false,
            elem_spacers: false,
            rows: false,
            elems: false,
            connections: false,
            block_bounds: true,
        });
        assert_eq!(only_bounds.draw(&info).len(), 1);
        assert!(n_all > 1);
        assert!(only_bounds.to_svg().contains("blox-debug-block"));
    }
}
