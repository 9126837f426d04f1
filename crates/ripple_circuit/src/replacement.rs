//! Replacement maps describe how a transaction renamed components.

use crate::ids::ComponentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The component renaming performed by one transaction on one circuit.
///
/// Simulation states consume the map after a transaction commits:
/// per-component state migrates from each removed ID to its
/// replacements when the component types match, and state for IDs with
/// no replacement is dropped.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReplacementMap {
    map: BTreeMap<ComponentId, Vec<ComponentId>>,
    added: Vec<ComponentId>,
}

impl ReplacementMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `old` was replaced by `new`.
    pub fn record_replace(&mut self, old: ComponentId, new: ComponentId) {
        self.map.entry(old).or_default().push(new);
    }

    /// Records that `old` was removed with no replacement.
    pub fn record_remove(&mut self, old: ComponentId) {
        self.map.entry(old).or_default();
    }

    /// Records a freshly added component.
    pub fn record_add(&mut self, new: ComponentId) {
        self.added.push(new);
    }

    /// The IDs that replaced `old`. Empty for a plain removal, `None`
    /// when the transaction never touched `old`.
    pub fn replacements_of(&self, old: ComponentId) -> Option<&[ComponentId]> {
        self.map.get(&old).map(Vec::as_slice)
    }

    /// Every ID the transaction removed or replaced.
    pub fn removed(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.map.keys().copied()
    }

    /// Every ID the transaction added without replacing anything.
    pub fn added(&self) -> &[ComponentId] {
        &self.added
    }

    /// `true` when the transaction renamed nothing.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty() && self.added.is_empty()
    }
}
