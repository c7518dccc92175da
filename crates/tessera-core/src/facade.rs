//! Per-model entry points bound to a session

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::{Result, SessionError};
use crate::model::{ColumnDescriptor, KeyTuple, ModelSchema, Value};
use crate::query::Query;
use crate::session::Session;
use crate::state::{Instance, Record, SlotState};

/// A model schema paired with the session it resolves instances in
///
/// Obtained from [`Session::model`].
#[derive(Clone)]
pub struct ModelRef<'s> {
    session: &'s Session,
    schema: Arc<ModelSchema>,
}

impl<'s> ModelRef<'s> {
    pub(crate) fn new(session: &'s Session, schema: Arc<ModelSchema>) -> Self {
        Self { session, schema }
    }

    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    /// Build (or re-resolve) an instance from column values
    ///
    /// Primary-key columns not supplied are generated from their defaults.
    /// Every regular column ends up dirty with the supplied value, its
    /// default, or `Null`. Nothing is written before [`Session::save`].
    ///
    /// # Errors
    ///
    /// `UnresolvableKey` when a key column has neither value nor default
    /// (no instance is registered), `UnknownColumn`, `CounterNotSettable`
    /// or `TypeMismatch` for bad input, including a default generator that
    /// yields the wrong type. On any error the session is left untouched.
    pub fn create<I, K, V>(&self, values: I) -> Result<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let supplied: BTreeMap<String, Value> = values
            .into_iter()
            .map(|(column, value)| (column.into(), value.into()))
            .collect();

        self.session
            .observe("create", Some(self.schema.name()), || self.create_impl(supplied))
    }

    fn create_impl(&self, supplied: BTreeMap<String, Value>) -> Result<Record> {
        let schema = &self.schema;
        let model = || schema.name().to_string();

        for column in supplied.keys() {
            let descriptor = schema
                .column(column)
                .ok_or_else(|| SessionError::UnknownColumn {
                    model: model(),
                    column: column.clone(),
                })?;
            if descriptor.is_counter() {
                return Err(SessionError::CounterNotSettable {
                    model: model(),
                    column: column.clone(),
                });
            }
        }

        // a supplied Null key value counts as not supplied
        let key = schema
            .primary_keys()
            .map(|column| {
                let value = match supplied.get(column.name()) {
                    Some(value) if !value.is_null() => value.clone(),
                    _ => column
                        .generate_default()
                        .ok_or_else(|| SessionError::UnresolvableKey {
                            model: model(),
                            column: column.name().to_string(),
                        })?,
                };
                check_type(schema, column, &value)?;
                Ok(value)
            })
            .collect::<Result<Vec<Value>>>()?;

        // every value is checked before the instance is registered
        let mut plan: Vec<(&str, bool, Value)> = Vec::new();
        for descriptor in schema.columns() {
            if descriptor.is_primary_key() || descriptor.is_counter() {
                continue;
            }
            let (was_supplied, value) = match supplied.get(descriptor.name()) {
                Some(value) => (true, value.clone()),
                None => (false, descriptor.generate_default().unwrap_or_default()),
            };
            check_type(schema, descriptor, &value)?;
            plan.push((descriptor.name(), was_supplied, value));
        }

        let (record, created) = self
            .session
            .resolve(schema, KeyTuple::new(key), Instance::fresh);

        let mut instance = record.write_instance();
        for (name, was_supplied, value) in plan {
            // an existing instance keeps its own pending edits
            if !was_supplied && !created && instance.state(name)? == SlotState::Dirty {
                continue;
            }
            instance.assign(name, value)?;
        }
        drop(instance);

        Ok(record)
    }

    /// Resolve the instance for a full key without touching storage
    ///
    /// Key values are taken positionally in primary-key order. Non-key
    /// attributes of a new instance stay unavailable until loaded.
    ///
    /// # Errors
    ///
    /// `KeyArity` when the number of values differs from the key width,
    /// `TypeMismatch` when a value does not fit its key column.
    pub fn blind(&self, key: impl Into<KeyTuple>) -> Result<Record> {
        let key = key.into();
        self.session.observe("blind", Some(self.schema.name()), || {
            if key.len() != self.schema.key_arity() {
                return Err(SessionError::KeyArity {
                    model: self.schema.name().to_string(),
                    expected: self.schema.key_arity(),
                    actual: key.len(),
                });
            }
            for (column, value) in self.schema.primary_keys().zip(key.values()) {
                check_type(&self.schema, column, value)?;
            }
            let (record, _) = self
                .session
                .resolve(&self.schema, key.clone(), Instance::blind);
            Ok(record)
        })
    }

    pub fn objects(&self) -> Query<'s> {
        Query::new(self.session, self.schema.clone())
    }

    /// Every stored instance of the model
    ///
    /// # Errors
    ///
    /// `Adapter` for storage failures.
    pub fn all(&self) -> Result<Vec<Record>> {
        self.objects().all()
    }

    /// The sole stored instance of the model
    ///
    /// # Errors
    ///
    /// `NotFound` or `MultipleObjectsReturned`.
    pub fn get(&self) -> Result<Record> {
        self.objects().get()
    }
}

fn check_type(schema: &ModelSchema, column: &ColumnDescriptor, value: &Value) -> Result<()> {
    if column.column_type().accepts(value) {
        return Ok(());
    }
    Err(SessionError::TypeMismatch {
        model: schema.name().to_string(),
        column: column.name().to_string(),
        expected: column.column_type().name(),
        actual: value.type_name(),
    })
}

impl std::fmt::Debug for ModelRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRef")
            .field("model", &self.schema.name())
            .field("session_id", &self.session.id())
            .finish()
    }
}
