//! Tessera Store - SQLite persistence adapter
//!
//! Provides:
//! - SQLite schema with an embedded, checksummed migrations framework
//! - `SqliteAdapter`, a `PersistenceAdapter` storing every model in generic
//!   row/cell tables so no per-model DDL is needed
//! - Read-only inspection helpers used by the operator CLI

pub mod db;
pub mod errors;
pub mod inspect;
pub mod migrations;
pub mod repo;

// Re-export key types
pub use errors::Result;
pub use repo::SqliteAdapter;
