use std::collections::BTreeMap;
use std::sync::Arc;

use crate::model::{KeyTuple, ModelSchema};
use crate::state::{Instance, Record};

/// Lookup key of the identity map: model name plus key tuple
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub model: String,
    pub key: KeyTuple,
}

impl IdentityKey {
    pub fn new(model: impl Into<String>, key: KeyTuple) -> Self {
        Self {
            model: model.into(),
            key,
        }
    }
}

/// Session-scoped registry guaranteeing one instance per (model, key)
///
/// Ordered so that iteration (and therefore save order) is deterministic.
#[derive(Debug, Default)]
pub struct IdentityMap {
    entries: BTreeMap<IdentityKey, Record>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, model: &str, key: &KeyTuple) -> Option<Record> {
        self.entries
            .get(&IdentityKey::new(model, key.clone()))
            .cloned()
    }

    /// Return the registered instance, or build and register one
    ///
    /// The boolean is `true` when `factory` ran. The factory receives the
    /// schema and key so every instance is born with its key slots filled.
    pub fn lookup_or_create<F>(
        &mut self,
        schema: &Arc<ModelSchema>,
        key: KeyTuple,
        factory: F,
    ) -> (Record, bool)
    where
        F: FnOnce(Arc<ModelSchema>, KeyTuple) -> Instance,
    {
        let identity = IdentityKey::new(schema.name(), key);
        if let Some(record) = self.entries.get(&identity) {
            return (record.clone(), false);
        }

        tracing::debug!(
            model = %identity.model,
            key = %identity.key,
            "identity map miss, registering instance"
        );
        let record = Record::new(factory(schema.clone(), identity.key.clone()));
        self.entries.insert(identity, record.clone());
        (record, true)
    }

    pub fn contains(&self, model: &str, key: &KeyTuple) -> bool {
        self.entries
            .contains_key(&IdentityKey::new(model, key.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every instance with a dirty slot or pending counter delta, in (model, key) order
    pub fn dirty_records(&self) -> Vec<Record> {
        self.entries
            .values()
            .filter(|record| record.is_dirty())
            .cloned()
            .collect()
    }
}
