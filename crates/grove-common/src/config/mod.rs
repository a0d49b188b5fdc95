//! Configuration for GroveDB.
//!
//! This module provides configuration structures for the storage layer.

mod store;

pub use store::{CostCoefficients, ScanConfig};
