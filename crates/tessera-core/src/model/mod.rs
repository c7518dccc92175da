//! Model declaration: values, column descriptors, schemas and key tuples

pub mod column;
pub mod key;
pub mod schema;
pub mod value;

pub use column::{now_default, uuid4_default, ColumnDescriptor, ColumnSet, ColumnType, DefaultFn};
pub use key::KeyTuple;
pub use schema::{ModelSchema, ModelSchemaBuilder};
pub use value::Value;
