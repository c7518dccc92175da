//! Equality filters and the query builder over one model

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::adapter::Row;
use crate::errors::{Result, SessionError};
use crate::model::{KeyTuple, ModelSchema, Value};
use crate::session::Session;
use crate::state::Record;

/// Conjunction of `column = value` conditions
///
/// A column missing from a row compares as `Null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: BTreeMap<String, Value>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition without schema validation (adapters and tests)
    pub fn with(mut self, column: impl Into<String>, value: Value) -> Self {
        self.conditions.insert(column.into(), value);
        self
    }

    pub fn conditions(&self) -> &BTreeMap<String, Value> {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.conditions
            .iter()
            .all(|(column, expected)| row.get(column).unwrap_or(&Value::Null) == expected)
    }

    /// The key tuple when the filter pins exactly every primary-key column
    pub fn as_key(&self, schema: &ModelSchema) -> Option<KeyTuple> {
        if self.conditions.len() != schema.key_arity() {
            return None;
        }
        schema
            .primary_keys()
            .map(|column| self.conditions.get(column.name()).cloned())
            .collect::<Option<Vec<Value>>>()
            .map(KeyTuple::new)
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.conditions.is_empty() {
            return write!(f, "*");
        }
        for (i, (column, value)) in self.conditions.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{} = {}", column, value)?;
        }
        Ok(())
    }
}

/// Lazily evaluated query over one model in one session
///
/// Nothing touches storage until `get`, `all` or `count` runs. Every
/// returned row resolves through the session's identity map and is merged
/// without disturbing dirty slots.
#[derive(Clone)]
pub struct Query<'s> {
    session: &'s Session,
    schema: Arc<ModelSchema>,
    filter: Filter,
}

impl<'s> Query<'s> {
    pub(crate) fn new(session: &'s Session, schema: Arc<ModelSchema>) -> Self {
        Self {
            session,
            schema,
            filter: Filter::new(),
        }
    }

    pub fn filter_conditions(&self) -> &Filter {
        &self.filter
    }

    /// Narrow the query with an equality condition
    ///
    /// # Errors
    ///
    /// `UnknownColumn` or `TypeMismatch` when the condition cannot match
    /// anything the model can store.
    pub fn filter(mut self, column: &str, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        let descriptor =
            self.schema
                .column(column)
                .ok_or_else(|| SessionError::UnknownColumn {
                    model: self.schema.name().to_string(),
                    column: column.to_string(),
                })?;
        if !descriptor.column_type().accepts(&value) {
            return Err(SessionError::TypeMismatch {
                model: self.schema.name().to_string(),
                column: column.to_string(),
                expected: descriptor.column_type().name(),
                actual: value.type_name(),
            });
        }
        self.filter = self.filter.with(column, value);
        Ok(self)
    }

    /// The single matching instance
    ///
    /// # Errors
    ///
    /// `NotFound` for no row, `MultipleObjectsReturned` for more than one,
    /// `Adapter` for storage failures.
    pub fn get(&self) -> Result<Record> {
        self.session
            .observe("query_get", Some(self.schema.name()), || self.get_impl())
    }

    fn get_impl(&self) -> Result<Record> {
        let adapter = self.session.adapter();

        if let Some(key) = self.filter.as_key(&self.schema) {
            return match adapter.fetch_one(&self.schema, &key)? {
                Some(row) => self.session.merge_row(&self.schema, row),
                None => Err(SessionError::NotFound {
                    model: self.schema.name().to_string(),
                    key: key.to_string(),
                }),
            };
        }

        let mut rows = adapter.fetch_many(&self.schema, &self.filter)?;
        match rows.len() {
            0 => Err(SessionError::NotFound {
                model: self.schema.name().to_string(),
                key: self.filter.to_string(),
            }),
            1 => match rows.pop() {
                Some(row) => self.session.merge_row(&self.schema, row),
                None => Err(SessionError::NotFound {
                    model: self.schema.name().to_string(),
                    key: self.filter.to_string(),
                }),
            },
            count => Err(SessionError::MultipleObjectsReturned {
                model: self.schema.name().to_string(),
                count,
            }),
        }
    }

    /// Every matching instance, in adapter order
    ///
    /// # Errors
    ///
    /// `Adapter` for storage failures or rows missing a key column.
    pub fn all(&self) -> Result<Vec<Record>> {
        self.session
            .observe("query_all", Some(self.schema.name()), || {
                let rows = self
                    .session
                    .adapter()
                    .fetch_many(&self.schema, &self.filter)?;
                rows.into_iter()
                    .map(|row| self.session.merge_row(&self.schema, row))
                    .collect()
            })
    }

    /// Number of matching rows; nothing is merged into the session
    ///
    /// # Errors
    ///
    /// `Adapter` for storage failures.
    pub fn count(&self) -> Result<usize> {
        self.session
            .observe("query_count", Some(self.schema.name()), || {
                Ok(self
                    .session
                    .adapter()
                    .fetch_many(&self.schema, &self.filter)?
                    .len())
            })
    }
}

impl std::fmt::Debug for Query<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("model", &self.schema.name())
            .field("filter", &self.filter)
            .finish()
    }
}
