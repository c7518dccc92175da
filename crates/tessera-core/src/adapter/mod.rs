//! Persistence adapter seam
//!
//! The session never talks to storage directly. Everything it needs from
//! a backing store goes through [`PersistenceAdapter`]; failures come back
//! as the canonical [`ExError`] and are surfaced unchanged.

pub mod memory;

use std::collections::BTreeMap;

use crate::errors::{ExError, ExErrorKind};
use crate::model::{KeyTuple, ModelSchema, Value};
use crate::query::Filter;

pub use memory::MemoryAdapter;

/// Column name to raw value, as exchanged with adapters
pub type Row = BTreeMap<String, Value>;

pub type AdapterResult<T> = std::result::Result<T, ExError>;

/// Row-level operations a backing store must provide
///
/// Implementations must be safe to share between sessions. Rows returned
/// must carry every primary-key column of the model.
pub trait PersistenceAdapter: Send + Sync {
    /// Fetch the row stored under `key`; `Ok(None)` when there is none
    ///
    /// # Errors
    ///
    /// Any storage failure.
    fn fetch_one(&self, schema: &ModelSchema, key: &KeyTuple) -> AdapterResult<Option<Row>>;

    /// Fetch every row matching `filter`, in a stable order
    ///
    /// # Errors
    ///
    /// Any storage failure.
    fn fetch_many(&self, schema: &ModelSchema, filter: &Filter) -> AdapterResult<Vec<Row>>;

    /// Upsert `values` into the row identified by `key`
    ///
    /// An empty `values` still creates the row.
    ///
    /// # Errors
    ///
    /// Any storage failure; nothing is assumed written on error.
    fn write_row(&self, schema: &ModelSchema, key: &KeyTuple, values: &Row) -> AdapterResult<()>;

    /// Add `delta` to a counter column, treating a missing value as zero
    ///
    /// # Errors
    ///
    /// Any storage failure; `CounterOverflow` when the stored total would
    /// leave the `i64` range (nothing is written).
    fn increment_counter(
        &self,
        schema: &ModelSchema,
        key: &KeyTuple,
        column: &str,
        delta: i64,
    ) -> AdapterResult<()>;
}

/// Key columns of `key` as a row fragment
pub fn key_row(schema: &ModelSchema, key: &KeyTuple) -> Row {
    schema
        .primary_keys()
        .zip(key.values())
        .map(|(column, value)| (column.name().to_string(), value.clone()))
        .collect()
}

/// Error for a stored counter that cannot absorb `delta`
pub fn counter_overflow(schema: &ModelSchema, key: &KeyTuple, column: &str, delta: i64) -> ExError {
    ExError::new(ExErrorKind::CounterOverflow)
        .with_op("increment_counter")
        .with_model(schema.name())
        .with_key(key.to_string())
        .with_column(column)
        .with_message(format!("adding {} overflows the stored counter", delta))
}

/// Extract the key tuple of a fetched row
///
/// # Errors
///
/// `Persistence` when the row lacks one of the primary-key columns.
pub fn row_key(schema: &ModelSchema, row: &Row) -> AdapterResult<KeyTuple> {
    schema
        .primary_keys()
        .map(|column| {
            row.get(column.name()).cloned().ok_or_else(|| {
                ExError::new(ExErrorKind::Persistence)
                    .with_model(schema.name())
                    .with_column(column.name())
                    .with_message("row returned without a primary-key column")
            })
        })
        .collect::<AdapterResult<Vec<Value>>>()
        .map(KeyTuple::new)
}
