//! # grove-store
//!
//! Hierarchical group keyspace layout for GroveDB.
//!
//! A *group* is a root table and its descendant tables linked by foreign
//! keys (e.g. Customer→Order→Item), stored together in one ordered
//! keyspace so that a parent row and all of its descendants occupy a
//! contiguous key range. This crate provides:
//!
//! - **Schema**: `TableDef`/`GroupDef` metadata with construction-time
//!   validation of the group tree invariant
//! - **HKey**: hierarchical key construction, encoding, and decoding
//! - **Layout**: `GroupLayout` with scan-range planning, column/table
//!   bitmaps, the row write path, and subtree deletion
//! - **Collection**: `RowCollector`, a pull-based cursor that turns a
//!   physical key range back into logical rows
//! - **Costing**: `CostModel`, a pure estimator over `TreeStatistics`
//!   that prices candidate access paths for the planner
//! - **Engine boundary**: the `KvEngine` traits the layer requires from
//!   its transactional KV engine, plus an in-memory engine for tests

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitmap;
pub mod collector;
pub mod cost;
pub mod engine;
pub mod hkey;
pub mod layout;
pub mod row;
pub mod schema;

pub use bitmap::{ColumnBitmap, TableBitmap};
pub use collector::{CollectorState, RowBuffer, RowCollector};
pub use cost::{CostModel, StatisticsCache, TreeStatistics};
pub use engine::{KeyRange, KvEngine, KvIterator, KvTransaction, MemoryEngine};
pub use hkey::HKey;
pub use layout::{GroupLayout, PartialRow, ScanStrategy};
pub use row::RowData;
pub use schema::{ColumnDef, GroupDef, TableDef};
