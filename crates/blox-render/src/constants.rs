//! Geometric constants and connection shapes for a visual style.
//!
//! Styles differ only in this table: the measurement and drawing passes
//! are shared. Override fields on a built-in table, call [`init`] to
//! rebuild the derived shapes, then hand it to a renderer, after which it
//! is shared read-only.
//!
//! [`init`]: ConstantProvider::init

use crate::error::RenderError;
use crate::svg_paths;
use blox_core::{ConnectionType, Field, FieldKind, OutputShape};
use kurbo::{Size, Vec2};

/// How spacer rows between measured rows are sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpacingPolicy {
    /// Every spacer row is `between_row_spacing` tall.
    Uniform,
    /// Spacers tighten around statement inputs and top/bottom rows.
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotchStyle {
    Straight,
    Curved,
}

/// Value connection shapes whose size follows the block's height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicShape {
    Hexagonal,
    Rounded,
    Squared,
}

/// The shape drawn at a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Notch,
    PuzzleTab,
    Dynamic(DynamicShape),
}

impl ShapeKind {
    pub fn is_dynamic(self) -> bool {
        matches!(self, ShapeKind::Dynamic(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notch {
    pub width: f64,
    pub height: f64,
    /// Traversed left to right (top edges).
    pub path_forward: String,
    /// Traversed right to left (bottom edges).
    pub path_back: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PuzzleTab {
    pub width: f64,
    pub height: f64,
    pub path_down: String,
    pub path_up: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartHat {
    pub width: f64,
    pub height: f64,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JaggedTeeth {
    pub width: f64,
    pub height: f64,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsideCorners {
    pub width: f64,
    pub height: f64,
    pub path_top: String,
    pub path_bottom: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutsideCorners {
    pub top_left: String,
    pub top_right: String,
    pub bottom_right: String,
    pub bottom_left: String,
}

/// Derived path fragments, rebuilt by [`ConstantProvider::init`].
#[derive(Debug, Clone, PartialEq)]
pub struct Shapes {
    pub notch: Notch,
    pub puzzle_tab: PuzzleTab,
    pub start_hat: StartHat,
    pub jagged_teeth: JaggedTeeth,
    pub inside_corners: InsideCorners,
    pub outside_corners: OutsideCorners,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantProvider {
    pub no_padding: f64,
    pub small_padding: f64,
    pub medium_padding: f64,
    pub medium_large_padding: f64,
    pub large_padding: f64,

    pub tab_width: f64,
    pub tab_height: f64,
    pub tab_offset_from_top: f64,
    pub notch_width: f64,
    pub notch_height: f64,
    pub notch_offset_left: f64,
    pub notch_style: NotchStyle,
    pub corner_radius: f64,
    /// Round the right-hand corners of statement blocks.
    pub right_corners_round: bool,

    pub min_block_width: f64,
    pub min_block_height: f64,
    /// Height of the single row of a block with no inputs.
    pub empty_block_spacer_height: f64,
    pub min_row_height: f64,
    pub dummy_input_min_height: f64,
    pub dummy_input_shadow_min_height: f64,
    pub between_row_spacing: f64,
    pub spacing_policy: SpacingPolicy,

    pub top_row_min_height: f64,
    pub top_row_precedes_statement_min_height: f64,
    pub bottom_row_min_height: f64,
    pub bottom_row_after_statement_min_height: f64,

    /// Indent of a statement input from the block's left edge.
    pub statement_input_padding_left: f64,
    pub statement_input_notch_offset: f64,
    /// Added below a connected statement stack; may be negative.
    pub statement_bottom_spacer: f64,
    pub between_statement_padding_y: f64,
    pub empty_statement_input_height: f64,

    pub empty_inline_input_padding: f64,
    pub empty_inline_input_height: f64,
    pub external_value_input_padding: f64,

    pub add_start_hats: bool,
    pub start_hat_width: f64,
    pub start_hat_height: f64,
    pub jagged_teeth_width: f64,
    pub jagged_teeth_height: f64,

    pub field_text_height: f64,
    /// Average glyph advance used to estimate text width.
    pub field_char_width: f64,
    pub field_border_rect_height: f64,
    pub field_border_rect_x_padding: f64,
    pub field_border_rect_y_padding: f64,
    pub field_dropdown_arrow_width: f64,
    pub field_checkbox_size: f64,

    /// Value connections use height-dependent shapes.
    pub dynamic_shapes: bool,
    pub max_dynamic_connection_shape_width: f64,

    pub shapes: Shapes,
}

impl ConstantProvider {
    /// The classic style: puzzle tabs and straight notches.
    pub fn geras() -> Self {
        let medium = 5.0;
        let large = 10.0;
        let tab_height = 15.0;
        let min_block_height = 24.0;
        let mut c = Self {
            no_padding: 0.0,
            small_padding: 3.0,
            medium_padding: medium,
            medium_large_padding: 8.0,
            large_padding: large,
            tab_width: 8.0,
            tab_height,
            tab_offset_from_top: 5.0,
            notch_width: 15.0,
            notch_height: 4.0,
            notch_offset_left: 15.0,
            notch_style: NotchStyle::Straight,
            corner_radius: 8.0,
            right_corners_round: false,
            min_block_width: 12.0,
            min_block_height,
            empty_block_spacer_height: 16.0,
            min_row_height: tab_height,
            dummy_input_min_height: tab_height,
            dummy_input_shadow_min_height: tab_height,
            between_row_spacing: medium,
            spacing_policy: SpacingPolicy::Uniform,
            top_row_min_height: medium,
            top_row_precedes_statement_min_height: large,
            bottom_row_min_height: medium,
            bottom_row_after_statement_min_height: large,
            statement_input_padding_left: 20.0,
            statement_input_notch_offset: 15.0,
            statement_bottom_spacer: 0.0,
            between_statement_padding_y: 4.0,
            empty_statement_input_height: min_block_height,
            empty_inline_input_padding: 14.5,
            empty_inline_input_height: tab_height + 11.0,
            external_value_input_padding: 2.0,
            add_start_hats: false,
            start_hat_width: 100.0,
            start_hat_height: 15.0,
            jagged_teeth_width: 6.0,
            jagged_teeth_height: 12.0,
            field_text_height: 13.0,
            field_char_width: 6.5,
            field_border_rect_height: 16.0,
            field_border_rect_x_padding: 5.0,
            field_border_rect_y_padding: 3.0,
            field_dropdown_arrow_width: 12.0,
            field_checkbox_size: 15.0,
            dynamic_shapes: false,
            max_dynamic_connection_shape_width: 0.0,
            shapes: placeholder_shapes(),
        };
        c.init();
        c
    }

    /// The rounded style: dynamic value shapes, curved notches, grid units.
    pub fn zelos() -> Self {
        const GRID_UNIT: f64 = 4.0;
        let gu = GRID_UNIT;
        let mut c = Self::geras();
        c.small_padding = gu;
        c.medium_padding = 2.0 * gu;
        c.medium_large_padding = 3.0 * gu;
        c.large_padding = 4.0 * gu;
        c.corner_radius = gu;
        c.right_corners_round = true;
        c.notch_width = 9.0 * gu;
        c.notch_height = 2.0 * gu;
        c.notch_offset_left = 3.0 * gu;
        c.notch_style = NotchStyle::Curved;
        c.min_block_width = 2.0 * gu;
        c.min_block_height = 12.0 * gu;
        c.empty_block_spacer_height = 12.0 * gu;
        c.min_row_height = 8.0 * gu;
        c.dummy_input_min_height = 8.0 * gu;
        c.dummy_input_shadow_min_height = 6.0 * gu;
        c.between_row_spacing = 2.0 * gu;
        c.spacing_policy = SpacingPolicy::Compact;
        c.top_row_min_height = c.corner_radius;
        c.top_row_precedes_statement_min_height = 4.0 * gu;
        c.bottom_row_min_height = c.corner_radius;
        c.bottom_row_after_statement_min_height = 6.0 * gu;
        c.statement_input_padding_left = 4.0 * gu;
        c.statement_input_notch_offset = c.notch_offset_left + c.corner_radius;
        c.statement_bottom_spacer = -c.notch_height;
        c.empty_statement_input_height = 6.0 * gu;
        c.empty_inline_input_padding = 4.0 * gu;
        c.empty_inline_input_height = 8.0 * gu;
        c.start_hat_height = 22.0;
        c.field_text_height = 16.0;
        c.field_char_width = 7.0;
        c.field_border_rect_x_padding = 2.0 * gu;
        c.field_border_rect_y_padding = 1.625 * gu;
        c.field_border_rect_height = c.field_text_height + 2.0 * c.field_border_rect_y_padding;
        c.field_dropdown_arrow_width = 3.0 * gu;
        c.field_checkbox_size = 6.0 * gu;
        c.dynamic_shapes = true;
        c.max_dynamic_connection_shape_width = 12.0 * gu;
        c.init();
        c
    }

    /// Rebuild derived shapes after changing fields.
    pub fn init(&mut self) {
        self.shapes = Shapes {
            notch: self.make_notch(),
            puzzle_tab: self.make_puzzle_tab(),
            start_hat: self.make_start_hat(),
            jagged_teeth: self.make_jagged_teeth(),
            inside_corners: self.make_inside_corners(),
            outside_corners: self.make_outside_corners(),
        };
    }

    /// Reject non-finite values and negative dimensions.
    pub fn validate(&self) -> Result<(), RenderError> {
        let dimensions = [
            ("small_padding", self.small_padding),
            ("medium_padding", self.medium_padding),
            ("large_padding", self.large_padding),
            ("tab_width", self.tab_width),
            ("tab_height", self.tab_height),
            ("notch_width", self.notch_width),
            ("notch_height", self.notch_height),
            ("notch_offset_left", self.notch_offset_left),
            ("corner_radius", self.corner_radius),
            ("min_block_width", self.min_block_width),
            ("empty_block_spacer_height", self.empty_block_spacer_height),
            ("min_row_height", self.min_row_height),
            ("dummy_input_min_height", self.dummy_input_min_height),
            ("between_row_spacing", self.between_row_spacing),
            ("statement_input_padding_left", self.statement_input_padding_left),
            ("statement_input_notch_offset", self.statement_input_notch_offset),
            ("empty_statement_input_height", self.empty_statement_input_height),
            ("empty_inline_input_height", self.empty_inline_input_height),
            ("field_text_height", self.field_text_height),
            ("field_char_width", self.field_char_width),
            ("jagged_teeth_height", self.jagged_teeth_height),
        ];
        for (name, value) in dimensions {
            if !value.is_finite() || value < 0.0 {
                return Err(RenderError::InvalidConstant { name, value });
            }
        }
        if !self.statement_bottom_spacer.is_finite() {
            return Err(RenderError::InvalidConstant {
                name: "statement_bottom_spacer",
                value: self.statement_bottom_spacer,
            });
        }
        Ok(())
    }

    // ─── Shape selection ─────────────────────────────────────────────────

    /// Pick the shape for a connection. `check` and `output_shape` come
    /// from the connection itself or the value block plugged into it.
    pub fn shape_for(
        &self,
        kind: ConnectionType,
        check: Option<&[String]>,
        output_shape: Option<OutputShape>,
    ) -> ShapeKind {
        if kind.is_statement() {
            return ShapeKind::Notch;
        }
        if !self.dynamic_shapes {
            return ShapeKind::PuzzleTab;
        }
        let dynamic = match output_shape {
            Some(OutputShape::Hexagonal) => DynamicShape::Hexagonal,
            Some(OutputShape::Round) => DynamicShape::Rounded,
            Some(OutputShape::Square) => DynamicShape::Squared,
            None if check.is_some_and(|c| c.iter().any(|t| t == "Boolean")) => {
                DynamicShape::Hexagonal
            }
            None => DynamicShape::Rounded,
        };
        ShapeKind::Dynamic(dynamic)
    }

    /// Width of a shape at a given connection height.
    pub fn shape_width(&self, shape: ShapeKind, height: f64) -> f64 {
        match shape {
            ShapeKind::Notch => self.shapes.notch.width,
            ShapeKind::PuzzleTab => self.shapes.puzzle_tab.width,
            ShapeKind::Dynamic(DynamicShape::Squared) => self.corner_radius,
            ShapeKind::Dynamic(_) => (height / 2.0).min(self.max_dynamic_connection_shape_width),
        }
    }

    pub fn shape_height(&self, shape: ShapeKind, height: f64) -> f64 {
        match shape {
            ShapeKind::Notch => self.shapes.notch.height,
            ShapeKind::PuzzleTab => self.shapes.puzzle_tab.height,
            ShapeKind::Dynamic(_) => height,
        }
    }

    /// Vertical path for a value shape spanning `height`.
    ///
    /// `outward` is the x direction the shape bulges (-1 left, 1 right);
    /// `dy` is the direction of travel (1 down, -1 up).
    pub fn value_shape_path(&self, shape: ShapeKind, height: f64, outward: f64, dy: f64) -> String {
        match shape {
            ShapeKind::PuzzleTab | ShapeKind::Notch => {
                if dy > 0.0 {
                    self.shapes.puzzle_tab.path_down.clone()
                } else {
                    self.shapes.puzzle_tab.path_up.clone()
                }
            }
            ShapeKind::Dynamic(DynamicShape::Hexagonal) => {
                let w = self.shape_width(shape, height);
                svg_paths::line(&[
                    Vec2::new(outward * w, dy * height / 2.0),
                    Vec2::new(-outward * w, dy * height / 2.0),
                ])
            }
            ShapeKind::Dynamic(kind) => {
                let (radius, straight) = match kind {
                    DynamicShape::Squared => {
                        let r = self.corner_radius.min(height / 2.0);
                        (r, height - 2.0 * r)
                    }
                    _ => {
                        let max_height = self.max_dynamic_connection_shape_width * 2.0;
                        (height.min(max_height) / 2.0, (height - max_height).max(0.0))
                    }
                };
                let flags = if outward * dy > 0.0 { "0 0,1" } else { "0 0,0" };
                let mut path = svg_paths::arc("a", flags, radius, outward * radius, dy * radius);
                if straight > 0.0 {
                    path.push_str(&svg_paths::line_on_axis("v", dy * straight));
                }
                path.push_str(&svg_paths::arc("a", flags, radius, -outward * radius, dy * radius));
                path
            }
        }
    }

    // ─── Field measurement ───────────────────────────────────────────────

    /// Estimated width of a run of text.
    pub fn text_width(&self, text: &str) -> f64 {
        text.chars().count() as f64 * self.field_char_width
    }

    pub fn field_size(&self, field: &Field) -> Size {
        let bordered_height = self.field_border_rect_height.max(self.field_text_height);
        let bordered = |text: String| {
            Size::new(
                self.text_width(&text) + 2.0 * self.field_border_rect_x_padding,
                bordered_height,
            )
        };
        match &field.kind {
            FieldKind::Label(text) => Size::new(self.text_width(text), self.field_text_height),
            FieldKind::Image { width, height, .. } => Size::new(*width, *height),
            FieldKind::Checkbox(_) => Size::new(
                self.field_checkbox_size,
                bordered_height.max(self.field_checkbox_size),
            ),
            FieldKind::Dropdown { .. } => {
                let mut size = bordered(field.display_text());
                size.width += self.field_dropdown_arrow_width;
                size
            }
            _ => bordered(field.display_text()),
        }
    }

    // ─── Shape builders ──────────────────────────────────────────────────

    fn make_notch(&self) -> Notch {
        let width = self.notch_width;
        let height = self.notch_height;
        let make = |dir: f64| match self.notch_style {
            NotchStyle::Straight => {
                let inner = 3.0;
                let outer = (width - inner) / 2.0;
                svg_paths::line(&[
                    Vec2::new(dir * outer, height),
                    Vec2::new(dir * inner, 0.0),
                    Vec2::new(dir * outer, -height),
                ])
            }
            NotchStyle::Curved => {
                let inner = width / 3.0;
                let cw = (width - inner) / 6.0;
                let half = height / 2.0;
                let quarter = half / 2.0;
                let ease_in = |sign: f64| {
                    svg_paths::curve(
                        "c",
                        &[
                            Vec2::new(dir * cw / 2.0, 0.0),
                            Vec2::new(dir * cw * 0.75, sign * quarter / 2.0),
                            Vec2::new(dir * cw, sign * quarter),
                        ],
                    )
                };
                let ease_out = |sign: f64| {
                    svg_paths::curve(
                        "c",
                        &[
                            Vec2::new(dir * cw / 4.0, sign * quarter / 2.0),
                            Vec2::new(dir * cw / 2.0, sign * quarter),
                            Vec2::new(dir * cw, sign * quarter),
                        ],
                    )
                };
                [
                    ease_in(1.0),
                    svg_paths::line(&[Vec2::new(dir * cw, half)]),
                    ease_out(1.0),
                    svg_paths::line_on_axis("h", dir * inner),
                    ease_in(-1.0),
                    svg_paths::line(&[Vec2::new(dir * cw, -half)]),
                    ease_out(-1.0),
                ]
                .concat()
            }
        };
        Notch {
            width,
            height,
            path_forward: make(1.0),
            path_back: make(-1.0),
        }
    }

    fn make_puzzle_tab(&self) -> PuzzleTab {
        let width = self.tab_width;
        let height = self.tab_height;
        let make = |up: bool| {
            let forward = if up { -1.0 } else { 1.0 };
            let back = -forward;
            let overlap = 2.5;
            let half = height / 2.0;
            let c1 = half + overlap;
            let c2 = half + 0.5;
            svg_paths::curve(
                "c",
                &[
                    Vec2::new(0.0, forward * c1),
                    Vec2::new(-width, back * c2),
                    Vec2::new(-width, forward * half),
                ],
            ) + &svg_paths::curve(
                "s",
                &[
                    Vec2::new(width, back * overlap),
                    Vec2::new(width, forward * half),
                ],
            )
        };
        PuzzleTab {
            width,
            height,
            path_down: make(false),
            path_up: make(true),
        }
    }

    fn make_start_hat(&self) -> StartHat {
        let (width, height) = (self.start_hat_width, self.start_hat_height);
        let (c1, c2) = match self.notch_style {
            NotchStyle::Straight => (30.0, 70.0),
            NotchStyle::Curved => (25.0, 71.0),
        };
        StartHat {
            width,
            height,
            path: svg_paths::curve(
                "c",
                &[
                    Vec2::new(c1, -height),
                    Vec2::new(c2, -height),
                    Vec2::new(width, 0.0),
                ],
            ),
        }
    }

    fn make_jagged_teeth(&self) -> JaggedTeeth {
        let (width, height) = (self.jagged_teeth_width, self.jagged_teeth_height);
        JaggedTeeth {
            width,
            height,
            path: svg_paths::line(&[
                Vec2::new(width, height / 4.0),
                Vec2::new(-width * 2.0, height / 2.0),
                Vec2::new(width, height / 4.0),
            ]),
        }
    }

    fn make_inside_corners(&self) -> InsideCorners {
        let r = self.corner_radius;
        InsideCorners {
            width: r,
            height: r,
            path_top: svg_paths::arc("a", "0 0,0", r, -r, r),
            path_bottom: svg_paths::arc("a", "0 0,0", r, r, r),
        }
    }

    fn make_outside_corners(&self) -> OutsideCorners {
        let r = self.corner_radius;
        OutsideCorners {
            top_left: svg_paths::move_by(0.0, r) + &svg_paths::arc("a", "0 0,1", r, r, -r),
            top_right: svg_paths::arc("a", "0 0,1", r, r, r),
            bottom_right: svg_paths::arc("a", "0 0,1", r, -r, r),
            bottom_left: svg_paths::arc("a", "0 0,1", r, -r, -r),
        }
    }
}

fn placeholder_shapes() -> Shapes {
    let empty = String::new;
    Shapes {
        notch: Notch {
            width: 0.0,
            height: 0.0,
            path_forward: empty(),
            path_back: empty(),
        },
        puzzle_tab: PuzzleTab {
            width: 0.0,
            height: 0.0,
            path_down: empty(),
            path_up: empty(),
        },
        start_hat: StartHat {
            width: 0.0,
            height: 0.0,
            path: empty(),
        },
        jagged_teeth: JaggedTeeth {
            width: 0.0,
            height: 0.0,
            path: empty(),
        },
        inside_corners: InsideCorners {
            width: 0.0,
            height: 0.0,
            path_top: empty(),
            path_bottom: empty(),
        },
        outside_corners: OutsideCorners {
            top_left: empty(),
            top_right: empty(),
            bottom_right: empty(),
            bottom_left: empty(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn geras_puzzle_tab_path() {
        let c = ConstantProvider::geras();
        assert_eq!(
            c.shapes.puzzle_tab.path_down,
            " c 0,10  -8,-8  -8,7.5  s 8,-2.5  8,7.5 "
        );
        assert_eq!(c.shapes.notch.path_forward, " l 6,4  3,0  6,-4 ");
        assert_eq!(c.shapes.notch.path_back, " l -6,4  -3,0  -6,-4 ");
    }

    #[test]
    fn shape_selection() {
        let geras = ConstantProvider::geras();
        let zelos = ConstantProvider::zelos();
        let boolean = vec!["Boolean".to_string()];
        assert_eq!(
            geras.shape_for(ConnectionType::InputValue, Some(&boolean), None),
            ShapeKind::PuzzleTab
        );
        assert_eq!(
            zelos.shape_for(ConnectionType::OutputValue, Some(&boolean), None),
            ShapeKind::Dynamic(DynamicShape::Hexagonal)
        );
        assert_eq!(
            zelos.shape_for(ConnectionType::OutputValue, None, None),
            ShapeKind::Dynamic(DynamicShape::Rounded)
        );
        assert_eq!(
            zelos.shape_for(ConnectionType::OutputValue, Some(&boolean), Some(OutputShape::Square)),
            ShapeKind::Dynamic(DynamicShape::Squared)
        );
        assert_eq!(
            zelos.shape_for(ConnectionType::NextStatement, None, None),
            ShapeKind::Notch
        );
    }

    #[test]
    fn dynamic_width_is_capped() {
        let zelos = ConstantProvider::zelos();
        let rounded = ShapeKind::Dynamic(DynamicShape::Rounded);
        assert_eq!(zelos.shape_width(rounded, 32.0), 16.0);
        assert_eq!(zelos.shape_width(rounded, 400.0), 48.0);
    }

    #[test]
    fn curved_notch_spans_its_width() {
        let zelos = ConstantProvider::zelos();
        assert_eq!(zelos.shapes.notch.width, 36.0);
        assert!(zelos.shapes.notch.path_forward.contains(" h 12 "));
    }

    #[test]
    fn validate_rejects_negative_dimensions() {
        let mut c = ConstantProvider::geras();
        assert!(c.validate().is_ok());
        assert!(ConstantProvider::zelos().validate().is_ok());
        c.notch_width = -1.0;
        assert_eq!(
            c.validate(),
            Err(RenderError::InvalidConstant {
                name: "notch_width",
                value: -1.0
            })
        );
    }

    #[test]
    fn field_sizes() {
        let c = ConstantProvider::geras();
        let label = c.field_size(&Field::label("abcd"));
        assert_eq!(label, Size::new(26.0, 13.0));
        let number = c.field_size(&Field::number("N", 10.0));
        assert_eq!(number, Size::new(23.0, 16.0));
    }
}
