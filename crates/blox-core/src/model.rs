//! Block data model.
//!
//! A `Block` owns an ordered list of `Input`s; each input owns its `Field`s
//! and at most one nested `Connection`. Blocks never know how they are
//! drawn. Renderers read this model, never the other way around.

use crate::connection::{Connection, ConnectionType, Slot};
use crate::error::BlockError;
use crate::id::{BlockId, ModelId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

// ─── Inputs ──────────────────────────────────────────────────────────────

/// Horizontal alignment of an input's fields within its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Align {
    #[default]
    Left,
    Centre,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    /// Fields only, no connection.
    Dummy,
    Value,
    Statement,
    /// Fields only; the next input always starts a new row.
    EndRow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Input {
    pub name: String,
    pub kind: InputKind,
    pub align: Align,
    pub fields: Vec<Field>,
    pub connection: Option<Connection>,
    pub visible: bool,
}

impl Input {
    fn new(name: &str, kind: InputKind) -> Self {
        let connection = match kind {
            InputKind::Value => Some(Connection::new(ConnectionType::InputValue)),
            InputKind::Statement => Some(Connection::new(ConnectionType::NextStatement)),
            InputKind::Dummy | InputKind::EndRow => None,
        };
        Self {
            name: name.to_string(),
            kind,
            align: Align::Left,
            fields: Vec::new(),
            connection,
            visible: true,
        }
    }

    pub fn dummy(name: &str) -> Self {
        Self::new(name, InputKind::Dummy)
    }

    pub fn value(name: &str) -> Self {
        Self::new(name, InputKind::Value)
    }

    pub fn statement(name: &str) -> Self {
        Self::new(name, InputKind::Statement)
    }

    pub fn end_row(name: &str) -> Self {
        Self::new(name, InputKind::EndRow)
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Restrict the accepted types. No-op on inputs without a connection.
    pub fn with_check<I, S>(mut self, check: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(conn) = &mut self.connection {
            *conn = Connection::with_check(conn.kind, check);
        }
        self
    }

    pub fn with_align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name.as_deref() == Some(name))
    }
}

// ─── Fields ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropdownOption {
    pub text: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    Label(String),
    Text(String),
    Number(f64),
    Dropdown {
        options: Vec<DropdownOption>,
        selected: usize,
    },
    Checkbox(bool),
    Image {
        width: f64,
        height: f64,
        alt: String,
    },
    /// Reference to a variable; `display` caches the model's current name.
    Variable { variable: ModelId, display: String },
    /// Reference to a procedure; `display` caches the model's current name.
    Procedure { procedure: ModelId, display: String },
}

/// A leaf render unit inside an input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: Option<String>,
    pub kind: FieldKind,
    pub visible: bool,
}

impl Field {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            name: None,
            kind,
            visible: true,
        }
    }

    pub fn label(text: &str) -> Self {
        Self::new(FieldKind::Label(text.to_string()))
    }

    pub fn text(name: &str, value: &str) -> Self {
        Self::new(FieldKind::Text(value.to_string())).named(name)
    }

    pub fn number(name: &str, value: f64) -> Self {
        Self::new(FieldKind::Number(value)).named(name)
    }

    pub fn checkbox(name: &str, checked: bool) -> Self {
        Self::new(FieldKind::Checkbox(checked)).named(name)
    }

    /// `options` are `(display text, value)` pairs; the first is selected.
    pub fn dropdown(name: &str, options: &[(&str, &str)]) -> Self {
        let options = options
            .iter()
            .map(|(text, value)| DropdownOption {
                text: text.to_string(),
                value: value.to_string(),
            })
            .collect();
        Self::new(FieldKind::Dropdown {
            options,
            selected: 0,
        })
        .named(name)
    }

    pub fn image(width: f64, height: f64, alt: &str) -> Self {
        Self::new(FieldKind::Image {
            width,
            height,
            alt: alt.to_string(),
        })
    }

    pub fn variable(name: &str, variable: ModelId, display: &str) -> Self {
        Self::new(FieldKind::Variable {
            variable,
            display: display.to_string(),
        })
        .named(name)
    }

    pub fn procedure(name: &str, procedure: ModelId, display: &str) -> Self {
        Self::new(FieldKind::Procedure {
            procedure,
            display: display.to_string(),
        })
        .named(name)
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Text shown on the block.
    pub fn display_text(&self) -> String {
        match &self.kind {
            FieldKind::Label(s) | FieldKind::Text(s) => s.clone(),
            FieldKind::Number(n) => n.to_string(),
            FieldKind::Dropdown { options, selected } => options
                .get(*selected)
                .map(|o| o.text.clone())
                .unwrap_or_default(),
            FieldKind::Checkbox(true) => "\u{2713}".to_string(),
            FieldKind::Checkbox(false) => String::new(),
            FieldKind::Image { alt, .. } => alt.clone(),
            FieldKind::Variable { display, .. } | FieldKind::Procedure { display, .. } => {
                display.clone()
            }
        }
    }

    /// Serialized value, as read by code generators and save/load.
    pub fn value(&self) -> String {
        match &self.kind {
            FieldKind::Checkbox(checked) => if *checked { "TRUE" } else { "FALSE" }.to_string(),
            FieldKind::Dropdown { options, selected } => options
                .get(*selected)
                .map(|o| o.value.clone())
                .unwrap_or_default(),
            FieldKind::Variable { variable, .. } => variable.as_str().to_string(),
            FieldKind::Procedure { procedure, .. } => procedure.as_str().to_string(),
            _ => self.display_text(),
        }
    }

    pub fn set_value(&mut self, value: &str) -> Result<(), BlockError> {
        let field_name = self.name.clone().unwrap_or_default();
        let invalid = |reason: &str| BlockError::InvalidFieldValue {
            field: field_name.clone(),
            value: value.to_string(),
            reason: reason.to_string(),
        };
        match &mut self.kind {
            FieldKind::Label(s) | FieldKind::Text(s) => *s = value.to_string(),
            FieldKind::Number(n) => {
                *n = value
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| invalid("not a finite number"))?;
            }
            FieldKind::Dropdown { options, selected } => {
                *selected = options
                    .iter()
                    .position(|o| o.value == value)
                    .ok_or_else(|| invalid("not one of the dropdown options"))?;
            }
            FieldKind::Checkbox(checked) => {
                *checked = match value {
                    "TRUE" => true,
                    "FALSE" => false,
                    _ => return Err(invalid("expected TRUE or FALSE")),
                };
            }
            FieldKind::Image { .. } => return Err(invalid("image fields have no value")),
            FieldKind::Variable { variable, .. } => *variable = ModelId::intern(value),
            FieldKind::Procedure { procedure, .. } => *procedure = ModelId::intern(value),
        }
        Ok(())
    }

    /// Labels and images cannot be edited in place.
    pub fn is_editable(&self) -> bool {
        !matches!(self.kind, FieldKind::Label(_) | FieldKind::Image { .. })
    }

    /// The variable or procedure this field refers to, if any.
    pub fn model_ref(&self) -> Option<ModelId> {
        match &self.kind {
            FieldKind::Variable { variable, .. } => Some(*variable),
            FieldKind::Procedure { procedure, .. } => Some(*procedure),
            _ => None,
        }
    }

    /// Update the cached display name of a model reference.
    pub fn set_model_display(&mut self, name: &str) -> bool {
        match &mut self.kind {
            FieldKind::Variable { display, .. } | FieldKind::Procedure { display, .. } => {
                if display != name {
                    *display = name.to_string();
                    return true;
                }
                false
            }
            _ => false,
        }
    }
}

// ─── Icons ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IconKind {
    Mutator,
    Warning,
    Comment,
    Custom(String),
}

impl fmt::Display for IconKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IconKind::Mutator => f.write_str("mutator"),
            IconKind::Warning => f.write_str("warning"),
            IconKind::Comment => f.write_str("comment"),
            IconKind::Custom(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Icon {
    pub kind: IconKind,
    /// Lower weights sit closer to the block's leading edge.
    pub weight: i32,
    pub width: f64,
    pub height: f64,
    /// Hidden while the block is collapsed.
    pub collapse_hidden: bool,
}

impl Icon {
    pub const DEFAULT_SIZE: f64 = 17.0;

    pub fn new(kind: IconKind) -> Self {
        let weight = match kind {
            IconKind::Mutator => 1,
            IconKind::Warning => 2,
            IconKind::Comment => 3,
            IconKind::Custom(_) => 10,
        };
        let collapse_hidden = kind != IconKind::Warning;
        Self {
            kind,
            weight,
            width: Self::DEFAULT_SIZE,
            height: Self::DEFAULT_SIZE,
            collapse_hidden,
        }
    }
}

// ─── Blocks ──────────────────────────────────────────────────────────────

/// Shape of a value block's output, for renderers with dynamic shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputShape {
    Hexagonal,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub type_name: String,
    pub inputs: Vec<Input>,
    pub icons: SmallVec<[Icon; 2]>,
    pub previous: Option<Connection>,
    pub next: Option<Connection>,
    pub output: Option<Connection>,
    pub collapsed: bool,
    pub enabled: bool,
    pub shadow: bool,
    pub inputs_inline: bool,
    pub insertion_marker: bool,
    /// Draw a hat on top (only when there is no previous/output connection).
    pub hat: bool,
    pub output_shape: Option<OutputShape>,
    /// Workspace position; meaningful for top-level blocks only.
    pub position: Position,
}

impl Block {
    pub fn new(id: BlockId, type_name: &str) -> Self {
        Self {
            id,
            type_name: type_name.to_string(),
            inputs: Vec::new(),
            icons: SmallVec::new(),
            previous: None,
            next: None,
            output: None,
            collapsed: false,
            enabled: true,
            shadow: false,
            inputs_inline: false,
            insertion_marker: false,
            hat: false,
            output_shape: None,
            position: Position::default(),
        }
    }

    /// Statement block with previous and next connections.
    pub fn statement(id: BlockId, type_name: &str) -> Self {
        let mut block = Self::new(id, type_name);
        block.previous = Some(Connection::new(ConnectionType::PreviousStatement));
        block.next = Some(Connection::new(ConnectionType::NextStatement));
        block
    }

    /// Value block with an output connection.
    pub fn value<I, S>(id: BlockId, type_name: &str, check: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut block = Self::new(id, type_name);
        let check: Vec<String> = check.into_iter().map(Into::into).collect();
        block.output = Some(if check.is_empty() {
            Connection::new(ConnectionType::OutputValue)
        } else {
            Connection::with_check(ConnectionType::OutputValue, check)
        });
        block
    }

    pub fn with_input(mut self, input: Input) -> Result<Self, BlockError> {
        self.append_input(input)?;
        Ok(self)
    }

    pub fn append_input(&mut self, input: Input) -> Result<usize, BlockError> {
        if !input.name.is_empty() && self.get_input(&input.name).is_some() {
            return Err(BlockError::DuplicateInputName {
                block: self.id,
                name: input.name,
            });
        }
        self.inputs.push(input);
        Ok(self.inputs.len() - 1)
    }

    /// Remove an input by name. Links at later slots are renumbered by the
    /// workspace, which owns them.
    pub fn remove_input(&mut self, name: &str) -> Option<(usize, Input)> {
        let index = self.input_index(name)?;
        Some((index, self.inputs.remove(index)))
    }

    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|i| i.name == name)
    }

    pub fn get_input(&self, name: &str) -> Option<&Input> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.inputs.iter().find_map(|i| i.field(name))
    }

    pub fn get_field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.inputs
            .iter_mut()
            .flat_map(|i| i.fields.iter_mut())
            .find(|f| f.name.as_deref() == Some(name))
    }

    pub fn get_field_value(&self, name: &str) -> Option<String> {
        self.get_field(name).map(Field::value)
    }

    pub fn set_field_value(&mut self, name: &str, value: &str) -> Result<(), BlockError> {
        let id = self.id;
        let field = self
            .get_field_mut(name)
            .ok_or_else(|| BlockError::UnknownField {
                block: id,
                name: name.to_string(),
            })?;
        field.set_value(value)
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.inputs.iter().flat_map(|i| i.fields.iter())
    }

    /// Attach an icon. Icons stay ordered by weight.
    pub fn add_icon(&mut self, icon: Icon) -> Result<(), BlockError> {
        if self.has_icon(&icon.kind) {
            return Err(BlockError::DuplicateIconType {
                block: self.id,
                icon,
            });
        }
        let at = self
            .icons
            .iter()
            .position(|i| i.weight > icon.weight)
            .unwrap_or(self.icons.len());
        self.icons.insert(at, icon);
        Ok(())
    }

    pub fn remove_icon(&mut self, kind: &IconKind) -> Option<Icon> {
        let index = self.icons.iter().position(|i| &i.kind == kind)?;
        Some(self.icons.remove(index))
    }

    pub fn has_icon(&self, kind: &IconKind) -> bool {
        self.icons.iter().any(|i| &i.kind == kind)
    }

    pub fn connection(&self, slot: Slot) -> Option<&Connection> {
        match slot {
            Slot::Output => self.output.as_ref(),
            Slot::Previous => self.previous.as_ref(),
            Slot::Next => self.next.as_ref(),
            Slot::Input(i) => self.inputs.get(i)?.connection.as_ref(),
        }
    }

    /// Every slot on this block that carries a connection.
    pub fn connection_slots(&self) -> SmallVec<[Slot; 8]> {
        let mut slots = SmallVec::new();
        if self.output.is_some() {
            slots.push(Slot::Output);
        }
        if self.previous.is_some() {
            slots.push(Slot::Previous);
        }
        for (i, input) in self.inputs.iter().enumerate() {
            if input.connection.is_some() {
                slots.push(Slot::Input(i));
            }
        }
        if self.next.is_some() {
            slots.push(Slot::Next);
        }
        slots
    }

    pub fn statement_input_count(&self) -> usize {
        self.inputs
            .iter()
            .filter(|i| i.kind == InputKind::Statement)
            .count()
    }

    pub fn last_visible_input(&self) -> Option<&Input> {
        self.inputs.iter().rev().find(|i| i.visible)
    }

    pub fn first_visible_input(&self) -> Option<&Input> {
        self.inputs.iter().find(|i| i.visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repeat_block() -> Block {
        Block::statement(BlockId::intern("model_repeat"), "controls_repeat")
            .with_input(Input::dummy("").with_field(Field::label("repeat")))
            .and_then(|b| {
                b.with_input(
                    Input::value("TIMES")
                        .with_check(["Number"])
                        .with_field(Field::number("N", 10.0)),
                )
            })
            .and_then(|b| b.with_input(Input::statement("DO")))
            .unwrap()
    }

    #[test]
    fn duplicate_input_name_rejected() {
        let mut block = repeat_block();
        let err = block.append_input(Input::value("TIMES")).unwrap_err();
        assert!(matches!(err, BlockError::DuplicateInputName { ref name, .. } if name == "TIMES"));
        // Unnamed inputs never collide.
        assert!(block.append_input(Input::dummy("")).is_ok());
    }

    #[test]
    fn duplicate_icon_type_carries_icon() {
        let mut block = repeat_block();
        block.add_icon(Icon::new(IconKind::Comment)).unwrap();
        let mut second = Icon::new(IconKind::Comment);
        second.width = 30.0;
        let err = block.add_icon(second.clone()).unwrap_err();
        assert_eq!(
            err,
            BlockError::DuplicateIconType {
                block: block.id,
                icon: second
            }
        );
        assert_eq!(block.icons.len(), 1);
    }

    #[test]
    fn icons_sorted_by_weight() {
        let mut block = repeat_block();
        block.add_icon(Icon::new(IconKind::Comment)).unwrap();
        block.add_icon(Icon::new(IconKind::Mutator)).unwrap();
        block.add_icon(Icon::new(IconKind::Warning)).unwrap();
        let kinds: Vec<_> = block.icons.iter().map(|i| i.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![IconKind::Mutator, IconKind::Warning, IconKind::Comment]
        );
    }

    #[test]
    fn field_values() {
        let mut block = repeat_block();
        assert_eq!(block.get_field_value("N").as_deref(), Some("10"));
        block.set_field_value("N", "2.5").unwrap();
        assert_eq!(block.get_field_value("N").as_deref(), Some("2.5"));
        assert!(block.set_field_value("N", "ten").is_err());
        assert!(matches!(
            block.set_field_value("MISSING", "1"),
            Err(BlockError::UnknownField { .. })
        ));
    }

    #[test]
    fn dropdown_and_checkbox_values() {
        let mut dd = Field::dropdown("OP", &[("+", "ADD"), ("-", "MINUS")]);
        assert_eq!(dd.value(), "ADD");
        dd.set_value("MINUS").unwrap();
        assert_eq!(dd.display_text(), "-");
        assert!(dd.set_value("TIMES").is_err());

        let mut cb = Field::checkbox("ON", false);
        cb.set_value("TRUE").unwrap();
        assert_eq!(cb.value(), "TRUE");
        assert!(cb.set_value("yes").is_err());
    }

    #[test]
    fn connection_slots_in_order() {
        let block = repeat_block();
        assert_eq!(
            block.connection_slots().as_slice(),
            &[Slot::Previous, Slot::Input(1), Slot::Input(2), Slot::Next]
        );
    }
}
