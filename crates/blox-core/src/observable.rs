//! Observable maps of procedure and variable models.
//!
//! Fields that reference a procedure or variable subscribe to the owning
//! map. Every mutation notifies subscribers synchronously, in subscription
//! order, before the mutating call returns.

use crate::error::ModelError;
use crate::id::ModelId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// A record that can live in an [`ObservableMap`].
pub trait ObservableModel: Clone + PartialEq {
    fn id(&self) -> ModelId;
    fn name(&self) -> &str;
    /// Called when the model enters a map.
    fn start_publishing(&mut self);
    /// Called before the model leaves a map.
    fn stop_publishing(&mut self);
    fn is_publishing(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapEvent {
    Published(ModelId),
    Unpublished(ModelId),
    Changed(ModelId),
}

impl MapEvent {
    pub fn id(&self) -> ModelId {
        match self {
            MapEvent::Published(id) | MapEvent::Unpublished(id) | MapEvent::Changed(id) => *id,
        }
    }
}

type Listener = Rc<dyn Fn(&MapEvent)>;

#[derive(Default)]
struct Listeners {
    next_key: u64,
    entries: Vec<(u64, Listener)>,
}

/// Handle returned by [`ObservableMap::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    listeners: Weak<RefCell<Listeners>>,
    key: u64,
}

impl Subscription {
    /// Unsubscribe explicitly.
    pub fn dispose(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.borrow_mut().entries.retain(|(k, _)| *k != self.key);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("key", &self.key).finish()
    }
}

pub struct ObservableMap<M> {
    models: HashMap<ModelId, M>,
    order: Vec<ModelId>,
    listeners: Rc<RefCell<Listeners>>,
}

impl<M> Default for ObservableMap<M> {
    fn default() -> Self {
        Self {
            models: HashMap::new(),
            order: Vec::new(),
            listeners: Rc::default(),
        }
    }
}

impl<M: fmt::Debug> fmt::Debug for ObservableMap<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableMap")
            .field("models", &self.order)
            .field("subscribers", &self.listeners.borrow().entries.len())
            .finish()
    }
}

impl<M: ObservableModel> ObservableMap<M> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&MapEvent) + 'static,
    {
        let mut listeners = self.listeners.borrow_mut();
        let key = listeners.next_key;
        listeners.next_key += 1;
        listeners.entries.push((key, Rc::new(listener)));
        Subscription {
            listeners: Rc::downgrade(&self.listeners),
            key,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }

    fn notify(&self, event: MapEvent) {
        // Snapshot so listeners may drop their subscription mid-dispatch.
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .entries
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in snapshot {
            listener(&event);
        }
    }

    /// Insert or replace a model.
    ///
    /// Re-adding an equal model is a no-op. Replacing a different model
    /// under the same id unpublishes the old one before publishing the new.
    pub fn add(&mut self, mut model: M) {
        let id = model.id();
        model.start_publishing();
        if let Some(existing) = self.models.get(&id) {
            if *existing == model {
                return;
            }
            self.unpublish(id);
        } else {
            self.order.push(id);
        }
        self.models.insert(id, model);
        log::trace!("published {id:?}");
        self.notify(MapEvent::Published(id));
    }

    fn unpublish(&mut self, id: ModelId) {
        if let Some(model) = self.models.get_mut(&id) {
            model.stop_publishing();
            self.notify(MapEvent::Unpublished(id));
        }
    }

    /// Remove a model. Unknown ids return `false`.
    pub fn delete(&mut self, id: ModelId) -> bool {
        if !self.models.contains_key(&id) {
            return false;
        }
        self.unpublish(id);
        self.models.remove(&id);
        self.order.retain(|o| *o != id);
        true
    }

    /// Unpublish every model, then empty the map.
    pub fn clear(&mut self) {
        let ids = self.order.clone();
        for id in &ids {
            self.unpublish(*id);
        }
        self.models.clear();
        self.order.clear();
    }

    pub fn get(&self, id: ModelId) -> Option<&M> {
        self.models.get(&id)
    }

    pub fn contains(&self, id: ModelId) -> bool {
        self.models.contains_key(&id)
    }

    /// Live models in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &M> {
        self.order.iter().filter_map(|id| self.models.get(id))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Mutate a model in place. Fires `Changed` only if it actually changed.
    pub fn update(&mut self, id: ModelId, f: impl FnOnce(&mut M)) -> bool {
        let Some(model) = self.models.get_mut(&id) else {
            return false;
        };
        let before = model.clone();
        f(model);
        if *model == before {
            return false;
        }
        self.notify(MapEvent::Changed(id));
        true
    }
}

// ─── Procedures ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterModel {
    pub id: ModelId,
    pub name: String,
    pub types: Vec<String>,
}

impl ParameterModel {
    pub fn new(name: &str) -> Self {
        Self {
            id: ModelId::generate(),
            name: name.to_string(),
            types: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureModel {
    pub id: ModelId,
    pub name: String,
    pub parameters: Vec<ParameterModel>,
    /// `None` for procedures without a return value.
    pub return_types: Option<Vec<String>>,
    pub enabled: bool,
    publishing: bool,
}

impl ProcedureModel {
    pub fn new(id: ModelId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            parameters: Vec::new(),
            return_types: None,
            enabled: true,
            publishing: false,
        }
    }

    pub fn with_parameter(mut self, param: ParameterModel) -> Self {
        self.parameters.push(param);
        self
    }

    /// `name(a, b)` style signature.
    pub fn signature(&self) -> String {
        let params: Vec<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

impl ObservableModel for ProcedureModel {
    fn id(&self) -> ModelId {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn start_publishing(&mut self) {
        self.publishing = true;
    }
    fn stop_publishing(&mut self) {
        self.publishing = false;
    }
    fn is_publishing(&self) -> bool {
        self.publishing
    }
}

pub type ProcedureMap = ObservableMap<ProcedureModel>;

impl ObservableMap<ProcedureModel> {
    pub fn get_procedures(&self) -> Vec<&ProcedureModel> {
        self.values().collect()
    }

    pub fn rename(&mut self, id: ModelId, name: &str) -> bool {
        self.update(id, |p| p.name = name.to_string())
    }

    /// Insert a parameter at `index`, clamped to the parameter count.
    pub fn add_parameter(&mut self, id: ModelId, param: ParameterModel, index: usize) -> bool {
        self.update(id, |p| {
            let at = index.min(p.parameters.len());
            p.parameters.insert(at, param);
        })
    }

    pub fn delete_parameter(&mut self, id: ModelId, index: usize) -> bool {
        self.update(id, |p| {
            if index < p.parameters.len() {
                p.parameters.remove(index);
            }
        })
    }

    pub fn set_return_types(&mut self, id: ModelId, types: Option<Vec<String>>) -> bool {
        self.update(id, |p| p.return_types = types)
    }

    pub fn set_enabled(&mut self, id: ModelId, enabled: bool) -> bool {
        self.update(id, |p| p.enabled = enabled)
    }
}

// ─── Variables ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct VariableModel {
    pub id: ModelId,
    pub name: String,
    /// Empty string for untyped variables.
    pub var_type: String,
    publishing: bool,
}

impl VariableModel {
    pub fn new(id: ModelId, name: &str, var_type: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            var_type: var_type.to_string(),
            publishing: false,
        }
    }
}

impl ObservableModel for VariableModel {
    fn id(&self) -> ModelId {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn start_publishing(&mut self) {
        self.publishing = true;
    }
    fn stop_publishing(&mut self) {
        self.publishing = false;
    }
    fn is_publishing(&self) -> bool {
        self.publishing
    }
}

pub type VariableMap = ObservableMap<VariableModel>;

impl ObservableMap<VariableModel> {
    pub fn get_variables(&self) -> Vec<&VariableModel> {
        self.values().collect()
    }

    /// Case-insensitive lookup. `None` type matches any type.
    pub fn get_by_name(&self, name: &str, var_type: Option<&str>) -> Option<&VariableModel> {
        let lower = name.to_lowercase();
        self.values().find(|v| {
            v.name.to_lowercase() == lower && var_type.is_none_or(|t| v.var_type == t)
        })
    }

    /// Create a variable, or return the existing one with the same name
    /// and type.
    pub fn create_variable(
        &mut self,
        name: &str,
        var_type: &str,
        id: Option<ModelId>,
    ) -> Result<ModelId, ModelError> {
        if let Some(existing) = self.get_by_name(name, Some(var_type)) {
            return match id {
                Some(id) if id != existing.id => Err(ModelError::NameConflict {
                    name: name.to_string(),
                    existing: existing.id,
                }),
                _ => Ok(existing.id),
            };
        }
        let id = id.unwrap_or_else(ModelId::generate);
        if self.contains(id) {
            return Err(ModelError::IdInUse(id));
        }
        self.add(VariableModel::new(id, name, var_type));
        Ok(id)
    }

    pub fn variables_of_type(&self, var_type: &str) -> Vec<&VariableModel> {
        self.values().filter(|v| v.var_type == var_type).collect()
    }

    /// Distinct variable types in first-seen order.
    pub fn variable_types(&self) -> Vec<String> {
        let mut types: Vec<String> = Vec::new();
        for v in self.values() {
            if !types.contains(&v.var_type) {
                types.push(v.var_type.clone());
            }
        }
        types
    }

    pub fn rename(&mut self, id: ModelId, name: &str) -> bool {
        self.update(id, |v| v.name = name.to_string())
    }
}
