//! Knowledge-state store and persistence boundary.

use crate::types::KnowledgeState;
use std::collections::HashMap;

/// Keyed mapping from question id to its knowledge state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeStore {
    states: HashMap<String, KnowledgeState>,
}

impl KnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(states: HashMap<String, KnowledgeState>) -> Self {
        Self { states }
    }

    pub fn get(&self, id: &str) -> Option<&KnowledgeState> {
        self.states.get(id)
    }

    /// Stored state, or a fresh one for questions never answered.
    pub fn state_or_default(&self, id: &str) -> KnowledgeState {
        self.states.get(id).cloned().unwrap_or_default()
    }

    /// Mutable state, created lazily with defaults.
    pub fn entry(&mut self, id: &str) -> &mut KnowledgeState {
        self.states.entry(id.to_string()).or_default()
    }

    pub fn set(&mut self, id: impl Into<String>, state: KnowledgeState) {
        self.states.insert(id.into(), state);
    }

    /// Copy every record of `other` over this store.
    pub fn merge(&mut self, other: KnowledgeStore) {
        self.states.extend(other.states);
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.states.clear();
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &KnowledgeState)> {
        self.states.iter()
    }

    pub fn as_map(&self) -> &HashMap<String, KnowledgeState> {
        &self.states
    }

    pub fn into_map(self) -> HashMap<String, KnowledgeState> {
        self.states
    }
}

/// Load/save boundary implemented by the storage layer.
///
/// Callers load before engine calls and save after each mutation; the
/// last write wins.
pub trait StatePersistence {
    type Error;

    fn load(&self) -> Result<KnowledgeStore, Self::Error>;

    fn save(&self, store: &KnowledgeStore) -> Result<(), Self::Error>;
}
