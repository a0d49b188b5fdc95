//! Materialized rows.

use std::fmt;
use std::sync::Arc;

use grove_codec::{Tuple, Value};

use crate::schema::TableDef;

/// A materialized row: a table reference plus one value per column.
///
/// Rows are transient: a collector creates one per scanned entry and the
/// caller discards it after use. Nullable columns may hold `Value::Null`;
/// the write path rejects NULL in non-nullable columns before anything
/// reaches the codec.
#[derive(Debug, Clone)]
pub struct RowData {
    table: Arc<TableDef>,
    values: Tuple,
}

impl RowData {
    /// Creates a row. Shape is validated by the write path, not here.
    #[must_use]
    pub fn new(table: Arc<TableDef>, values: Tuple) -> Self {
        Self { table, values }
    }

    /// Returns the owning table.
    #[must_use]
    pub fn table(&self) -> &Arc<TableDef> {
        &self.table
    }

    /// Returns the column values.
    #[must_use]
    pub fn values(&self) -> &Tuple {
        &self.values
    }

    /// Returns the value at the given column position.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&Value> {
        self.values.get(position)
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.values.len()
    }

    /// Returns the primary key values as a tuple.
    #[must_use]
    pub fn key_tuple(&self) -> Tuple {
        self.values.project(self.table.primary_key())
    }

    /// Consumes the row and returns its values.
    #[must_use]
    pub fn into_values(self) -> Tuple {
        self.values
    }
}

impl fmt::Display for RowData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.table.name(), self.values)
    }
}
