//! Tessera Core - session-scoped identity map and unit of work
//!
//! This crate provides the object/row mapping layer of Tessera:
//! - Model schemas built from column descriptors and reusable column sets
//! - Per-attribute load state (unavailable / loaded / dirty) with merge rules
//!   that never let a load overwrite a local edit
//! - An identity map guaranteeing one instance per (model, key) per session
//! - Deferred writes flushed by `save`, discarded by `clear`
//! - A persistence adapter seam with an in-memory implementation
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tessera_core::adapter::MemoryAdapter;
//! use tessera_core::model::{uuid4_default, ColumnDescriptor, ModelSchema};
//! use tessera_core::{values, Session};
//!
//! let todo = ModelSchema::builder("todo")
//!     .column(ColumnDescriptor::uuid("uuid").primary_key().default_with(uuid4_default()))
//!     .column(ColumnDescriptor::text("title"))
//!     .build()
//!     .unwrap();
//!
//! let session = Session::new(Arc::new(MemoryAdapter::new()));
//! let record = session.model(&todo).create(values! { "title" => "first" }).unwrap();
//! session.save().unwrap();
//! assert!(!record.is_dirty());
//! ```

pub use tessera_core_types as core_types;

pub mod adapter;
pub mod errors;
pub mod facade;
pub mod identity;
pub mod logging_facility;
pub mod model;
pub mod query;
pub mod session;
pub mod state;

// Re-export commonly used types
pub use adapter::{MemoryAdapter, PersistenceAdapter, Row};
pub use errors::{ExError, ExErrorKind, Result, SessionError};
pub use facade::ModelRef;
pub use model::{ColumnDescriptor, ColumnSet, ColumnType, KeyTuple, ModelSchema, Value};
pub use query::{Filter, Query};
pub use session::{
    clear, default_session, install_default, save, uninstall_default, SaveReport, Session,
    SessionConfig,
};
pub use state::{Record, SlotState};
