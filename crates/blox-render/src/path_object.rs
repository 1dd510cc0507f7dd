//! The persistent visual element of one block.
//!
//! A path object outlives any single render: re-rendering replaces its path
//! data, but its element id and state classes stay put. Swapping renderers
//! therefore keeps the same element.

use crate::drawer::Drawing;
use blox_core::{BlockId, Slot};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ELEMENT: AtomicU64 = AtomicU64::new(1);

/// Identity of a visual element, stable across re-renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    pub fn next() -> Self {
        Self(NEXT_ELEMENT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockState {
    pub selected: bool,
    pub disabled: bool,
    pub collapsed: bool,
    pub error: bool,
    /// Drag preview of where a block would land.
    pub insertion_marker: bool,
}

const STATE_CLASSES: [&str; 5] = [
    "blox-selected",
    "blox-disabled",
    "blox-collapsed",
    "blox-error",
    "blox-insertion-marker",
];

#[derive(Debug, Clone, PartialEq)]
pub struct PathObject {
    pub element: ElementId,
    pub block: BlockId,
    d: String,
    classes: Vec<String>,
    transform: Option<String>,
    highlights: BTreeMap<Slot, String>,
    disposed: bool,
}

impl PathObject {
    pub fn new(block: BlockId, style_class: &str) -> Self {
        log::trace!("path object for {block:?}");
        Self {
            element: ElementId::next(),
            block,
            d: String::new(),
            classes: vec![style_class.to_string()],
            transform: None,
            highlights: BTreeMap::new(),
            disposed: false,
        }
    }

    pub fn d(&self) -> &str {
        &self.d
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn transform(&self) -> Option<&str> {
        self.transform.as_deref()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Replace the path data with a fresh drawing. Highlights drawn against
    /// the old geometry are redrawn from the new one.
    pub fn set_path(&mut self, drawing: &Drawing) {
        if self.disposed {
            return;
        }
        self.d = drawing.path_data();
        self.flip_rtl(drawing.rtl);
        let slots: Vec<Slot> = self.highlights.keys().copied().collect();
        self.highlights.clear();
        for slot in slots {
            self.set_connection_highlight(slot, drawing);
        }
    }

    /// Mirror the element horizontally for right-to-left workspaces.
    pub fn flip_rtl(&mut self, rtl: bool) {
        self.transform = rtl.then(|| "scale(-1 1)".to_string());
    }

    pub fn update_state(&mut self, state: BlockState) {
        let flags = [
            state.selected,
            state.disabled,
            state.collapsed,
            state.error,
            state.insertion_marker,
        ];
        for (class, on) in STATE_CLASSES.into_iter().zip(flags) {
            self.set_class(class, on);
        }
    }

    pub fn set_style_class(&mut self, old: &str, new: &str) {
        self.set_class(old, false);
        self.set_class(new, true);
    }

    fn set_class(&mut self, class: &str, on: bool) {
        let present = self.has_class(class);
        if on && !present {
            self.classes.push(class.to_string());
        } else if !on && present {
            self.classes.retain(|c| c != class);
        }
    }

    /// Highlight one connection. Returns `false` when the drawing has no
    /// such connection.
    pub fn set_connection_highlight(&mut self, slot: Slot, drawing: &Drawing) -> bool {
        match drawing.highlight(slot) {
            Some(path) if !self.disposed => {
                self.highlights.insert(slot, path.to_string());
                true
            }
            _ => false,
        }
    }

    pub fn remove_connection_highlight(&mut self, slot: Slot) -> bool {
        self.highlights.remove(&slot).is_some()
    }

    pub fn highlight(&self, slot: Slot) -> Option<&str> {
        self.highlights.get(&slot).map(String::as_str)
    }

    /// Drop all visual state. A disposed object ignores further updates.
    pub fn dispose(&mut self) {
        self.d.clear();
        self.highlights.clear();
        self.transform = None;
        self.disposed = true;
    }

    /// SVG `<path>` markup, with connection highlights after it.
    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            r#"<path id="blox-{}" data-block="{}" class="{}" d="{}""#,
            self.element.0,
            self.block,
            self.classes.join(" "),
            self.d.trim()
        );
        if let Some(t) = &self.transform {
            let _ = write!(out, r#" transform="{t}""#);
        }
        out.push_str("/>");
        for path in self.highlights.values() {
            let _ = write!(
                out,
                r#"<path class="blox-connection-highlight" d="{}"/>"#,
                path.trim()
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawer::ConnectionHighlight;
    use pretty_assertions::assert_eq;

    fn drawing(rtl: bool) -> Drawing {
        Drawing {
            outline: " m 0,0  H 40  V 20 z".to_string(),
            inline: String::new(),
            highlights: vec![ConnectionHighlight {
                slot: Slot::Next,
                path: " M 15,20  l 6,4 ".to_string(),
            }],
            placements: Vec::new(),
            width: 40.0,
            height: 20.0,
            width_with_children: 40.0,
            rtl,
        }
    }

    #[test]
    fn state_classes_follow_flags() {
        let mut path = PathObject::new(BlockId::intern("po_state"), "blox-style-default");
        path.update_state(BlockState {
            selected: true,
            error: true,
            ..Default::default()
        });
        assert!(path.has_class("blox-selected"));
        assert!(path.has_class("blox-error"));
        assert!(!path.has_class("blox-disabled"));

        path.update_state(BlockState {
            insertion_marker: true,
            ..Default::default()
        });
        assert!(path.has_class("blox-insertion-marker"));
        assert!(!path.has_class("blox-selected"));

        path.update_state(BlockState::default());
        assert_eq!(path.classes(), &["blox-style-default".to_string()]);
    }

    #[test]
    fn element_id_survives_new_paths() {
        let mut path = PathObject::new(BlockId::intern("po_keep"), "s");
        let element = path.element;
        path.set_path(&drawing(false));
        path.set_path(&drawing(true));
        assert_eq!(path.element, element);
        assert_eq!(path.transform(), Some("scale(-1 1)"));
    }

    #[test]
    fn highlights_need_a_matching_connection() {
        let mut path = PathObject::new(BlockId::intern("po_hl"), "s");
        let d = drawing(false);
        path.set_path(&d);
        assert!(!path.set_connection_highlight(Slot::Previous, &d));
        assert!(path.set_connection_highlight(Slot::Next, &d));
        assert!(path.to_svg().contains("blox-connection-highlight"));
        assert!(path.remove_connection_highlight(Slot::Next));
        assert!(!path.remove_connection_highlight(Slot::Next));
    }

    #[test]
    fn disposed_object_ignores_updates() {
        let mut path = PathObject::new(BlockId::intern("po_gone"), "s");
        path.dispose();
        path.set_path(&drawing(false));
        assert_eq!(path.d(), "");
        assert!(path.is_disposed());
    }
}
