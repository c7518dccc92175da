//! Core types shared across Tessera crates
//!
//! This crate provides foundational types used by the session kernel,
//! its logging facility and the persistence adapters:
//!
//! - **Correlation types**: SessionId
//! - **Schema constants**: Capture field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::SessionId;
