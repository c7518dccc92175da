//! Model instances and the shared handles returned to callers

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::slot::{AttributeSlot, CounterSlot, Slot, SlotState};
use crate::adapter::Row;
use crate::errors::{Result, SessionError};
use crate::model::{ColumnType, KeyTuple, ModelSchema, Value};

/// One object identified by (model, key tuple) inside a session
#[derive(Debug, Clone)]
pub struct Instance {
    schema: Arc<ModelSchema>,
    key: KeyTuple,
    slots: Vec<Slot>,
}

/// Everything a save must send for one instance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingWrite {
    /// Dirty non-key values, sent alongside the key tuple
    pub row: Row,
    /// Every dirty value slot (key slots included) and the value being written
    pub committed: Vec<(usize, Value)>,
    /// Counter column index, column name and pending delta
    pub counters: Vec<(usize, String, i64)>,
}

impl PendingWrite {
    pub fn needs_row_write(&self) -> bool {
        !self.committed.is_empty()
    }
}

impl Instance {
    /// Instance whose key came from storage or the caller: key slots `Loaded`
    pub fn blind(schema: Arc<ModelSchema>, key: KeyTuple) -> Self {
        Self::with_key(schema, key, false)
    }

    /// Instance allocated by `create`: key slots `Dirty` until the first save
    pub fn fresh(schema: Arc<ModelSchema>, key: KeyTuple) -> Self {
        Self::with_key(schema, key, true)
    }

    fn with_key(schema: Arc<ModelSchema>, key: KeyTuple, dirty: bool) -> Self {
        let mut slots: Vec<Slot> = schema
            .columns()
            .iter()
            .map(|c| match c.column_type() {
                ColumnType::Counter => Slot::Counter(CounterSlot::default()),
                _ => Slot::Value(AttributeSlot::Unavailable),
            })
            .collect();

        for (position, &index) in schema.primary_key_indexes().iter().enumerate() {
            let value = key.get(position).cloned().unwrap_or_default();
            slots[index] = Slot::Value(if dirty {
                AttributeSlot::Dirty(value)
            } else {
                AttributeSlot::Loaded(value)
            });
        }

        Self { schema, key, slots }
    }

    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    pub fn key(&self) -> &KeyTuple {
        &self.key
    }

    fn index_of(&self, column: &str) -> Result<usize> {
        self.schema
            .column_index(column)
            .ok_or_else(|| SessionError::UnknownColumn {
                model: self.schema.name().to_string(),
                column: column.to_string(),
            })
    }

    fn unavailable(&self, column: &str) -> SessionError {
        SessionError::AttributeUnavailable {
            model: self.schema.name().to_string(),
            column: column.to_string(),
        }
    }

    fn overflow(&self, column: &str) -> SessionError {
        SessionError::CounterOverflow {
            model: self.schema.name().to_string(),
            column: column.to_string(),
        }
    }

    pub fn read(&self, column: &str) -> Result<Value> {
        let index = self.index_of(column)?;
        match &self.slots[index] {
            Slot::Value(slot) => slot.value().cloned().ok_or_else(|| self.unavailable(column)),
            Slot::Counter(slot) if !slot.is_known() => Err(self.unavailable(column)),
            Slot::Counter(slot) => slot
                .value()
                .map(Value::Int)
                .ok_or_else(|| self.overflow(column)),
        }
    }

    pub fn assign(&mut self, column: &str, value: Value) -> Result<()> {
        let index = self.index_of(column)?;
        let descriptor = &self.schema.columns()[index];
        let model = || self.schema.name().to_string();

        if descriptor.is_primary_key() {
            return Err(SessionError::KeyImmutable {
                model: model(),
                column: column.to_string(),
            });
        }
        if descriptor.is_counter() {
            return Err(SessionError::CounterNotSettable {
                model: model(),
                column: column.to_string(),
            });
        }
        if !descriptor.column_type().accepts(&value) {
            return Err(SessionError::TypeMismatch {
                model: model(),
                column: column.to_string(),
                expected: descriptor.column_type().name(),
                actual: value.type_name(),
            });
        }

        if let Slot::Value(slot) = &mut self.slots[index] {
            slot.assign(value);
        }
        Ok(())
    }

    pub fn increment(&mut self, column: &str, by: i64) -> Result<()> {
        let index = self.index_of(column)?;
        match &mut self.slots[index] {
            Slot::Counter(slot) => match slot.increment(by) {
                Some(_) => Ok(()),
                None => Err(self.overflow(column)),
            },
            Slot::Value(_) => Err(SessionError::NotACounter {
                model: self.schema.name().to_string(),
                column: column.to_string(),
            }),
        }
    }

    pub fn state(&self, column: &str) -> Result<SlotState> {
        let index = self.index_of(column)?;
        Ok(self.slots[index].state())
    }

    pub fn is_dirty(&self) -> bool {
        self.slots.iter().any(Slot::is_dirty)
    }

    /// Apply a fetched row; dirty slots and absent columns are left alone
    pub fn merge_row(&mut self, row: &Row) {
        for (column, value) in row {
            match self.schema.column_index(column) {
                Some(index) => self.slots[index].merge_loaded(value.clone()),
                None => tracing::trace!(
                    model = %self.schema.name(),
                    column = %column,
                    "ignoring column not declared by the model"
                ),
            }
        }
    }

    /// Snapshot of what a save has to send for this instance
    pub fn pending_write(&self) -> PendingWrite {
        let mut pending = PendingWrite::default();
        for (index, (slot, descriptor)) in self.slots.iter().zip(self.schema.columns()).enumerate() {
            match slot {
                Slot::Value(AttributeSlot::Dirty(value)) => {
                    if !descriptor.is_primary_key() {
                        pending.row.insert(descriptor.name().to_string(), value.clone());
                    }
                    pending.committed.push((index, value.clone()));
                }
                Slot::Counter(counter) if counter.pending() != 0 => {
                    pending
                        .counters
                        .push((index, descriptor.name().to_string(), counter.pending()));
                }
                _ => {}
            }
        }
        pending
    }

    /// Mark the written values as persisted
    pub fn commit(&mut self, committed: &[(usize, Value)]) {
        for (index, value) in committed {
            if let Some(Slot::Value(slot)) = self.slots.get_mut(*index) {
                slot.commit_if(value);
            }
        }
    }

    pub fn commit_counter(&mut self, index: usize, delta: i64) {
        if let Some(Slot::Counter(slot)) = self.slots.get_mut(index) {
            slot.commit(delta);
        }
    }
}

/// Shared handle to a session-resident instance
///
/// Cloning is cheap and yields the same instance. Equality and hashing
/// are by identity, so two handles compare equal exactly when they refer
/// to the same object.
#[derive(Clone)]
pub struct Record {
    inner: Arc<RwLock<Instance>>,
}

impl Record {
    pub(crate) fn new(instance: Instance) -> Self {
        Self {
            inner: Arc::new(RwLock::new(instance)),
        }
    }

    pub(crate) fn read_instance(&self) -> RwLockReadGuard<'_, Instance> {
        self.inner.read()
    }

    pub(crate) fn write_instance(&self) -> RwLockWriteGuard<'_, Instance> {
        self.inner.write()
    }

    /// Read an attribute
    ///
    /// # Errors
    ///
    /// `AttributeUnavailable` for a non-key column never loaded nor assigned,
    /// `UnknownColumn` for a name the model does not declare.
    pub fn get(&self, column: &str) -> Result<Value> {
        self.inner.read().read(column)
    }

    /// Assign an attribute locally; nothing is written until save
    ///
    /// # Errors
    ///
    /// `KeyImmutable`, `CounterNotSettable`, `TypeMismatch` or `UnknownColumn`.
    pub fn set(&self, column: &str, value: impl Into<Value>) -> Result<()> {
        self.inner.write().assign(column, value.into())
    }

    /// Add to a counter column's pending delta
    ///
    /// # Errors
    ///
    /// `NotACounter`, `UnknownColumn`, or `CounterOverflow` when the pending
    /// delta would leave the `i64` range (the delta is then unchanged).
    pub fn increment(&self, column: &str, by: i64) -> Result<()> {
        self.inner.write().increment(column, by)
    }

    /// # Errors
    ///
    /// `UnknownColumn`.
    pub fn state(&self, column: &str) -> Result<SlotState> {
        self.inner.read().state(column)
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.read().is_dirty()
    }

    pub fn key(&self) -> KeyTuple {
        self.inner.read().key().clone()
    }

    pub fn schema(&self) -> Arc<ModelSchema> {
        self.inner.read().schema().clone()
    }

    pub fn model(&self) -> String {
        self.inner.read().schema().name().to_string()
    }

    /// Whether both handles refer to the same instance
    pub fn same(a: &Record, b: &Record) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Record::same(self, other)
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.inner), state);
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let instance = self.inner.read();
        f.debug_struct("Record")
            .field("model", &instance.schema().name())
            .field("key", instance.key())
            .field("dirty", &instance.is_dirty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnDescriptor;

    fn todo() -> Arc<ModelSchema> {
        ModelSchema::builder("todo")
            .column(ColumnDescriptor::int("id").primary_key())
            .column(ColumnDescriptor::text("title"))
            .column(ColumnDescriptor::boolean("done"))
            .build()
            .unwrap()
    }

    fn hits() -> Arc<ModelSchema> {
        ModelSchema::builder("hits")
            .column(ColumnDescriptor::int("page").primary_key())
            .column(ColumnDescriptor::counter("views"))
            .build()
            .unwrap()
    }

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_blind_instance_knows_only_its_key() {
        let instance = Instance::blind(todo(), KeyTuple::from(Value::Int(1)));
        assert_eq!(instance.read("id").unwrap(), Value::Int(1));
        assert_eq!(instance.state("id").unwrap(), SlotState::Loaded);
        assert!(matches!(
            instance.read("title"),
            Err(SessionError::AttributeUnavailable { .. })
        ));
        assert!(!instance.is_dirty());
    }

    #[test]
    fn test_fresh_instance_key_is_dirty() {
        let instance = Instance::fresh(todo(), KeyTuple::from(Value::Int(1)));
        assert_eq!(instance.state("id").unwrap(), SlotState::Dirty);
        let pending = instance.pending_write();
        assert!(pending.needs_row_write());
        assert!(pending.row.is_empty());
        assert_eq!(pending.committed, vec![(0, Value::Int(1))]);
    }

    #[test]
    fn test_assign_rules() {
        let mut instance = Instance::blind(todo(), KeyTuple::from(Value::Int(1)));
        assert!(matches!(
            instance.assign("id", Value::Int(2)),
            Err(SessionError::KeyImmutable { .. })
        ));
        assert!(matches!(
            instance.assign("done", Value::from("yes")),
            Err(SessionError::TypeMismatch { expected: "boolean", actual: "text", .. })
        ));
        assert!(matches!(
            instance.assign("nope", Value::Null),
            Err(SessionError::UnknownColumn { .. })
        ));
        instance.assign("done", Value::Null).unwrap();
        assert_eq!(instance.state("done").unwrap(), SlotState::Dirty);
    }

    #[test]
    fn test_merge_preserves_dirty_and_absent_columns() {
        let mut instance = Instance::blind(todo(), KeyTuple::from(Value::Int(1)));
        instance.assign("title", Value::from("local")).unwrap();
        instance.merge_row(&row(&[
            ("id", Value::Int(1)),
            ("title", Value::from("stored")),
        ]));
        assert_eq!(instance.read("title").unwrap(), Value::from("local"));
        assert_eq!(instance.state("done").unwrap(), SlotState::Unavailable);
    }

    #[test]
    fn test_commit_after_write() {
        let mut instance = Instance::blind(todo(), KeyTuple::from(Value::Int(1)));
        instance.assign("title", Value::from("a")).unwrap();
        let pending = instance.pending_write();
        assert_eq!(pending.row.get("title"), Some(&Value::from("a")));

        instance.commit(&pending.committed);
        assert_eq!(instance.state("title").unwrap(), SlotState::Loaded);
        assert!(!instance.is_dirty());
    }

    #[test]
    fn test_counter_slot_behaviour() {
        let mut instance = Instance::blind(hits(), KeyTuple::from(Value::Int(1)));
        assert!(matches!(
            instance.assign("views", Value::Int(3)),
            Err(SessionError::CounterNotSettable { .. })
        ));
        instance.increment("views", 2).unwrap();
        assert!(instance.is_dirty());
        assert!(matches!(
            instance.read("views"),
            Err(SessionError::AttributeUnavailable { .. })
        ));

        instance.merge_row(&row(&[("views", Value::Int(5))]));
        assert_eq!(instance.read("views").unwrap(), Value::Int(7));

        let pending = instance.pending_write();
        assert!(!pending.needs_row_write());
        assert_eq!(pending.counters, vec![(1, "views".to_string(), 2)]);

        instance.commit_counter(1, 2);
        assert_eq!(instance.read("views").unwrap(), Value::Int(7));
        assert!(!instance.is_dirty());
    }

    #[test]
    fn test_counter_overflow_is_an_error() {
        let mut instance = Instance::blind(hits(), KeyTuple::from(Value::Int(1)));
        instance.increment("views", i64::MAX).unwrap();
        assert!(matches!(
            instance.increment("views", 1),
            Err(SessionError::CounterOverflow { .. })
        ));

        instance.merge_row(&row(&[("views", Value::Int(1))]));
        let err = instance.read("views").unwrap_err();
        assert_eq!(err.kind(), crate::errors::ExErrorKind::CounterOverflow);
    }

    #[test]
    fn test_increment_non_counter() {
        let mut instance = Instance::blind(todo(), KeyTuple::from(Value::Int(1)));
        assert!(matches!(
            instance.increment("title", 1),
            Err(SessionError::NotACounter { .. })
        ));
    }

    #[test]
    fn test_record_identity() {
        let a = Record::new(Instance::blind(todo(), KeyTuple::from(Value::Int(1))));
        let b = a.clone();
        let c = Record::new(Instance::blind(todo(), KeyTuple::from(Value::Int(1))));
        assert!(Record::same(&a, &b));
        assert_eq!(a, b);
        assert_ne!(a, c);

        b.set("title", "shared").unwrap();
        assert_eq!(a.get("title").unwrap(), Value::from("shared"));
    }
}
