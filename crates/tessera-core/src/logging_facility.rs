//! Structured logging facility for Tessera
//!
//! - Single initialization point via `init(profile)`
//! - Structured logging macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Boundary ownership: session operations own start/end events, the
//!   identity map and adapters only emit `debug`/`trace` detail
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use tessera_core::logging_facility::{init, Profile};
//!
//! // Initialize once at application startup
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
