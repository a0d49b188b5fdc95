//! # grove-common
//!
//! Common types, errors, and configuration for GroveDB.
//!
//! This crate provides the foundational types and abstractions used across
//! all GroveDB components. It includes:
//!
//! - **Types**: The `TableOrdinal` identifier and the byte-level `Key` and
//!   `Value` wrappers used at the KV-engine boundary
//! - **Errors**: Unified error handling with `GroveError`
//! - **Config**: Cost-model coefficients and scan configuration
//! - **Constants**: System-wide constants and limits
//!
//! ## Example
//!
//! ```rust
//! use grove_common::types::{Key, TableOrdinal, Value};
//! use grove_common::error::GroveResult;
//!
//! fn example() -> GroveResult<()> {
//!     let ordinal = TableOrdinal::new(1);
//!     let key = Key::from_bytes(b"hello");
//!     let value = Value::from_bytes(b"world");
//!     assert!(ordinal.is_valid());
//!     assert_eq!(key.len() + value.len(), 10);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use error::{ErrorCode, GroveError, GroveResult};
pub use types::{Key, TableOrdinal, Value};
