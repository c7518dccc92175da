use parking_lot::Mutex;
use std::collections::BTreeMap;

use super::{counter_overflow, key_row, AdapterResult, PersistenceAdapter, Row};
use crate::errors::{ExError, ExErrorKind};
use crate::model::{KeyTuple, ModelSchema, Value};
use crate::query::Filter;

#[derive(Debug, Default)]
struct MemoryState {
    /// Model name to rows ordered by key
    tables: BTreeMap<String, BTreeMap<KeyTuple, Row>>,
    /// Writes still allowed to succeed before injected failures start
    grace: usize,
    /// Remaining writes to fail
    failures: usize,
}

/// In-process adapter backed by ordered maps
///
/// Rows come back in key order. Writes can be made to fail on demand so
/// callers can exercise partial-save behaviour.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    state: Mutex<MemoryState>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` writes (rows or counters) fail with a persistence error
    pub fn fail_next_writes(&self, count: usize) {
        self.fail_writes_after(0, count);
    }

    /// Let `after` writes succeed, then fail the following `count`
    pub fn fail_writes_after(&self, after: usize, count: usize) {
        let mut state = self.state.lock();
        state.grace = after;
        state.failures = count;
    }

    pub fn row_count(&self, model: &str) -> usize {
        self.state.lock().tables.get(model).map_or(0, BTreeMap::len)
    }

    /// Snapshot of every stored row of `model`, in key order
    pub fn rows(&self, model: &str) -> Vec<Row> {
        self.state
            .lock()
            .tables
            .get(model)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default()
    }

    fn take_failure(state: &mut MemoryState, schema: &ModelSchema, key: &KeyTuple) -> AdapterResult<()> {
        if state.failures == 0 {
            return Ok(());
        }
        if state.grace > 0 {
            state.grace -= 1;
            return Ok(());
        }
        state.failures -= 1;
        Err(ExError::new(ExErrorKind::Persistence)
            .with_model(schema.name())
            .with_key(key.to_string())
            .with_message("injected write failure"))
    }
}

impl PersistenceAdapter for MemoryAdapter {
    fn fetch_one(&self, schema: &ModelSchema, key: &KeyTuple) -> AdapterResult<Option<Row>> {
        let state = self.state.lock();
        Ok(state
            .tables
            .get(schema.name())
            .and_then(|table| table.get(key))
            .cloned())
    }

    fn fetch_many(&self, schema: &ModelSchema, filter: &Filter) -> AdapterResult<Vec<Row>> {
        let state = self.state.lock();
        Ok(state
            .tables
            .get(schema.name())
            .map(|table| {
                table
                    .values()
                    .filter(|row| filter.matches(row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn write_row(&self, schema: &ModelSchema, key: &KeyTuple, values: &Row) -> AdapterResult<()> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state, schema, key)?;

        let row = state
            .tables
            .entry(schema.name().to_string())
            .or_default()
            .entry(key.clone())
            .or_insert_with(|| key_row(schema, key));
        for (column, value) in values {
            row.insert(column.clone(), value.clone());
        }

        tracing::trace!(model = %schema.name(), key = %key, columns = values.len(), "row written");
        Ok(())
    }

    fn increment_counter(
        &self,
        schema: &ModelSchema,
        key: &KeyTuple,
        column: &str,
        delta: i64,
    ) -> AdapterResult<()> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state, schema, key)?;

        let row = state
            .tables
            .entry(schema.name().to_string())
            .or_default()
            .entry(key.clone())
            .or_insert_with(|| key_row(schema, key));
        let current = row.get(column).and_then(Value::as_int).unwrap_or(0);
        let total = current
            .checked_add(delta)
            .ok_or_else(|| counter_overflow(schema, key, column, delta))?;
        row.insert(column.to_string(), Value::Int(total));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnDescriptor;
    use std::sync::Arc;

    fn todo() -> Arc<ModelSchema> {
        ModelSchema::builder("todo")
            .column(ColumnDescriptor::int("id").primary_key())
            .column(ColumnDescriptor::text("title"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_write_upserts_columns() {
        let adapter = MemoryAdapter::new();
        let schema = todo();
        let key = KeyTuple::from(Value::Int(1));

        adapter.write_row(&schema, &key, &Row::new()).unwrap();
        let row = adapter.fetch_one(&schema, &key).unwrap().unwrap();
        assert_eq!(row.get("id"), Some(&Value::Int(1)));
        assert!(row.get("title").is_none());

        let mut values = Row::new();
        values.insert("title".to_string(), Value::from("t"));
        adapter.write_row(&schema, &key, &values).unwrap();
        let row = adapter.fetch_one(&schema, &key).unwrap().unwrap();
        assert_eq!(row.get("title"), Some(&Value::from("t")));
        assert_eq!(adapter.row_count("todo"), 1);
    }

    #[test]
    fn test_fetch_many_filters_rows() {
        let adapter = MemoryAdapter::new();
        let schema = todo();
        for (id, title) in [(1i64, "a"), (2, "b"), (3, "a")] {
            let mut values = Row::new();
            values.insert("title".to_string(), Value::from(title));
            adapter
                .write_row(&schema, &KeyTuple::from(Value::Int(id)), &values)
                .unwrap();
        }
        let filter = Filter::new().with("title", Value::from("a"));
        let rows = adapter.fetch_many(&schema, &filter).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("id"), Some(&Value::Int(1)));
        assert_eq!(rows[1].get("id"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_injected_failures_are_consumed() {
        let adapter = MemoryAdapter::new();
        let schema = todo();
        let key = KeyTuple::from(Value::Int(1));
        adapter.fail_next_writes(1);

        let err = adapter.write_row(&schema, &key, &Row::new()).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Persistence);
        assert_eq!(adapter.row_count("todo"), 0);

        adapter.write_row(&schema, &key, &Row::new()).unwrap();
        assert_eq!(adapter.row_count("todo"), 1);
    }

    #[test]
    fn test_increment_starts_from_zero() {
        let adapter = MemoryAdapter::new();
        let schema = ModelSchema::builder("hits")
            .column(ColumnDescriptor::int("page").primary_key())
            .column(ColumnDescriptor::counter("views"))
            .build()
            .unwrap();
        let key = KeyTuple::from(Value::Int(9));
        adapter.increment_counter(&schema, &key, "views", 2).unwrap();
        adapter.increment_counter(&schema, &key, "views", 3).unwrap();
        let row = adapter.fetch_one(&schema, &key).unwrap().unwrap();
        assert_eq!(row.get("views"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_increment_overflow_is_rejected() {
        let adapter = MemoryAdapter::new();
        let schema = ModelSchema::builder("hits")
            .column(ColumnDescriptor::int("page").primary_key())
            .column(ColumnDescriptor::counter("views"))
            .build()
            .unwrap();
        let key = KeyTuple::from(Value::Int(9));
        adapter.increment_counter(&schema, &key, "views", i64::MAX).unwrap();

        let err = adapter
            .increment_counter(&schema, &key, "views", 1)
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::CounterOverflow);
        let row = adapter.fetch_one(&schema, &key).unwrap().unwrap();
        assert_eq!(row.get("views"), Some(&Value::Int(i64::MAX)));
    }
}
