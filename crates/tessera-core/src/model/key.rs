use serde::{Deserialize, Serialize};

use super::value::Value;

/// Ordered primary-key tuple
///
/// Positions follow the model's primary-key order. Equality, hashing and
/// ordering are by value across every position, so composite keys of any
/// arity identify instances.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyTuple(Vec<Value>);

impl KeyTuple {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Value> {
        self.0.get(position)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for KeyTuple {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl From<Value> for KeyTuple {
    fn from(value: Value) -> Self {
        Self(vec![value])
    }
}

impl std::fmt::Display for KeyTuple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}

/// Build a [`KeyTuple`] from heterogeneous values, in primary-key order
///
/// ```
/// use tessera_core::key;
///
/// let k = key![7i64, "north"];
/// assert_eq!(k.len(), 2);
/// ```
#[macro_export]
macro_rules! key {
    ($($value:expr),* $(,)?) => {
        $crate::model::KeyTuple::new(vec![$($crate::model::Value::from($value)),*])
    };
}

/// Build a column/value list for `create`, `filter`-style calls
///
/// ```
/// use tessera_core::values;
///
/// let v = values! { "title" => "first", "done" => false };
/// assert_eq!(v.len(), 2);
/// ```
#[macro_export]
macro_rules! values {
    ($($column:expr => $value:expr),* $(,)?) => {
        ::std::vec::Vec::<(::std::string::String, $crate::model::Value)>::from([
            $(($column.to_string(), $crate::model::Value::from($value))),*
        ])
    };
}
