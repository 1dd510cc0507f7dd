//! Named registries (renderers, field types, icon types).
//!
//! A registry is built at startup and injected where it is needed. Lookups
//! are case-insensitive, but each name must keep the case it was first
//! registered with.

use crate::error::RegistryError;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Registry<T> {
    kind: &'static str,
    /// Keyed by lowercase name; holds the registered spelling and the item.
    items: HashMap<String, (String, T)>,
}

impl<T> Registry<T> {
    /// `kind` names what is registered, for error messages.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            items: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, item: T, allow_override: bool) -> Result<(), RegistryError> {
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName { kind: self.kind });
        }
        let key = name.to_lowercase();
        if let Some((existing, _)) = self.items.get(&key) {
            if existing != name {
                return Err(RegistryError::InconsistentCase {
                    kind: self.kind,
                    name: name.to_string(),
                    existing: existing.clone(),
                });
            }
            if !allow_override {
                return Err(RegistryError::DuplicateName {
                    kind: self.kind,
                    name: name.to_string(),
                });
            }
        }
        log::debug!("registered {} `{name}`", self.kind);
        self.items.insert(key, (name.to_string(), item));
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Option<T> {
        let removed = self.items.remove(&name.to_lowercase()).map(|(_, item)| item);
        if removed.is_none() {
            log::warn!("unable to unregister {} `{name}`: not registered", self.kind);
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.items.get(&name.to_lowercase()).map(|(_, item)| item)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(&name.to_lowercase())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.items.values().map(|(n, _)| n.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_rejected_unless_override() {
        let mut reg = Registry::new("renderer");
        reg.register("geras", 1, false).unwrap();
        assert!(matches!(
            reg.register("geras", 2, false),
            Err(RegistryError::DuplicateName { .. })
        ));
        reg.register("geras", 3, true).unwrap();
        assert_eq!(reg.get("geras"), Some(&3));
    }

    #[test]
    fn case_must_be_consistent() {
        let mut reg = Registry::new("renderer");
        reg.register("Zelos", 1, false).unwrap();
        assert_eq!(reg.get("zelos"), Some(&1));
        let err = reg.register("zelos", 2, true).unwrap_err();
        assert_eq!(
            err,
            RegistryError::InconsistentCase {
                kind: "renderer",
                name: "zelos".into(),
                existing: "Zelos".into(),
            }
        );
    }

    #[test]
    fn unregister_and_names() {
        let mut reg = Registry::new("field");
        reg.register("b", (), false).unwrap();
        reg.register("a", (), false).unwrap();
        assert_eq!(reg.names(), vec!["a", "b"]);
        assert!(reg.unregister("B").is_some());
        assert!(reg.unregister("b").is_none());
        assert!(matches!(reg.register(" ", (), false), Err(RegistryError::EmptyName { .. })));
    }
}
