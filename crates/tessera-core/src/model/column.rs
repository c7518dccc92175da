use chrono::{SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::value::Value;

/// Generator invoked when a column has no supplied value at creation
pub type DefaultFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// Logical column type
///
/// Only used to reject values of the wrong variant; coercion and
/// length rules belong to the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Uuid,
    Text,
    Boolean,
    Int,
    Timestamp,
    /// Increment-only 64-bit counter
    Counter,
}

impl ColumnType {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Uuid => "uuid",
            ColumnType::Text => "text",
            ColumnType::Boolean => "boolean",
            ColumnType::Int => "int",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Counter => "counter",
        }
    }

    /// Whether `value` may be stored in a column of this type (`Null` always may)
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (ColumnType::Uuid, Value::Uuid(_))
                | (ColumnType::Text, Value::Text(_))
                | (ColumnType::Boolean, Value::Boolean(_))
                | (ColumnType::Int | ColumnType::Counter, Value::Int(_))
                | (ColumnType::Timestamp, Value::Timestamp(_))
        )
    }
}

/// Declaration of one model attribute
///
/// Built with the typed constructors and refined with the builder methods:
///
/// ```
/// use tessera_core::model::{uuid4_default, ColumnDescriptor};
///
/// let id = ColumnDescriptor::uuid("id").primary_key().default_with(uuid4_default());
/// assert!(id.is_primary_key());
/// assert!(id.has_default());
/// ```
#[derive(Clone)]
pub struct ColumnDescriptor {
    name: String,
    column_type: ColumnType,
    primary_key: bool,
    primary_key_order: Option<u32>,
    default: Option<DefaultFn>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            primary_key: false,
            primary_key_order: None,
            default: None,
        }
    }

    pub fn uuid(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Uuid)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Boolean)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Int)
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Timestamp)
    }

    pub fn counter(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Counter)
    }

    /// Mark as primary-key column, ordered by declaration among key columns
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark as primary-key column at an explicit position in the key tuple
    pub fn primary_key_at(mut self, order: u32) -> Self {
        self.primary_key = true;
        self.primary_key_order = Some(order);
        self
    }

    pub fn default_with(mut self, default: DefaultFn) -> Self {
        self.default = Some(default);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// Explicit key position, if one was declared
    pub fn primary_key_order(&self) -> Option<u32> {
        self.primary_key_order
    }

    pub fn is_counter(&self) -> bool {
        self.column_type == ColumnType::Counter
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Run the default generator, if any
    pub fn generate_default(&self) -> Option<Value> {
        self.default.as_ref().map(|f| f())
    }
}

impl std::fmt::Debug for ColumnDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnDescriptor")
            .field("name", &self.name)
            .field("column_type", &self.column_type)
            .field("primary_key", &self.primary_key)
            .field("primary_key_order", &self.primary_key_order)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

/// Abstract, reusable list of columns
///
/// Has no storage of its own; its columns are merged into every model
/// schema that extends it.
#[derive(Debug, Clone)]
pub struct ColumnSet {
    name: String,
    columns: Vec<ColumnDescriptor>,
}

impl ColumnSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }
}

/// Default generator producing a random (v4) UUID
pub fn uuid4_default() -> DefaultFn {
    Arc::new(|| Value::Uuid(Uuid::new_v4()))
}

/// Default generator producing the current time truncated to whole seconds
pub fn now_default() -> DefaultFn {
    Arc::new(|| Value::Timestamp(Utc::now().trunc_subsecs(0)))
}
