//! Repository layer persisting session rows to SQLite

pub mod codec;
pub mod sqlite_adapter;

pub use sqlite_adapter::SqliteAdapter;
