//! Group keyspace layout.
//!
//! [`GroupLayout`] translates logical requests against a group into
//! physical key ranges and bitmaps, owns the row write path, and performs
//! subtree deletion. It is the only part of the core that mutates the
//! keyspace in bulk; isolation against concurrent scans is the
//! transaction layer's job, the layout only guarantees validation before
//! mutation.

use std::sync::Arc;

use tracing::{debug, trace};

use grove_codec::{encoding, Tuple, Value};
use grove_common::config::ScanConfig;
use grove_common::error::{GroveError, GroveResult};
use grove_common::types::{Key, TableOrdinal, Value as StorageValue};

use crate::bitmap::{ColumnBitmap, TableBitmap};
use crate::collector::RowCollector;
use crate::engine::{KeyRange, KvEngine};
use crate::hkey::HKey;
use crate::row::RowData;
use crate::schema::{GroupDef, TableDef};

/// A row pattern supplying only some key columns, used to bound a scan.
///
/// Unset positions mean "unbounded at that depth": the bound encoding is
/// truncated at the first unset key column and finished with the minimal
/// or maximal edge sentinel, never by plain omission, so bounds stay
/// totally ordered against real keys.
#[derive(Debug, Clone)]
pub struct PartialRow {
    table: Arc<TableDef>,
    values: Vec<Option<Value>>,
}

impl PartialRow {
    /// Creates a pattern for a table with every column unset.
    #[must_use]
    pub fn new(table: Arc<TableDef>) -> Self {
        let values = vec![None; table.column_count()];
        Self { table, values }
    }

    /// Creates a pattern with the table's primary key columns set from
    /// `key_values`, in key order. Extra values are ignored.
    #[must_use]
    pub fn from_key_values(table: Arc<TableDef>, key_values: &[Value]) -> Self {
        let mut partial = Self::new(table);
        let key_positions: Vec<usize> = partial.table.primary_key().to_vec();
        for (i, &position) in key_positions.iter().enumerate() {
            if let Some(value) = key_values.get(i) {
                partial.values[position] = Some(value.clone());
            }
        }
        partial
    }

    /// Returns a copy with the column at `position` set. Out-of-range
    /// positions are ignored.
    #[must_use]
    pub fn with_value(mut self, position: usize, value: Value) -> Self {
        if position < self.values.len() {
            self.values[position] = Some(value);
        }
        self
    }

    /// Returns the pattern's table.
    #[must_use]
    pub fn table(&self) -> &Arc<TableDef> {
        &self.table
    }

    /// Returns the value at a column position, if set.
    #[must_use]
    pub fn value(&self, position: usize) -> Option<&Value> {
        self.values.get(position).and_then(Option::as_ref)
    }
}

/// How a scan's physical range is derived.
///
/// One collector type serves every access pattern; the strategy picks
/// the range source.
#[derive(Debug, Clone)]
pub enum ScanStrategy {
    /// The whole group.
    FullGroup,
    /// One row and its entire descendant subtree.
    Branch {
        /// The row whose subtree is scanned.
        row: RowData,
    },
    /// A range bounded by two partial-row patterns.
    TableRange {
        /// Lower bound pattern.
        start: PartialRow,
        /// Upper bound pattern (subtree-inclusive).
        end: PartialRow,
    },
}

/// Maps one group of hierarchical tables onto its physical keyspace.
#[derive(Debug, Clone)]
pub struct GroupLayout {
    group: Arc<GroupDef>,
}

impl GroupLayout {
    /// Creates a layout over a validated group.
    #[must_use]
    pub fn new(group: Arc<GroupDef>) -> Self {
        Self { group }
    }

    /// Returns the group definition.
    #[must_use]
    pub fn group(&self) -> &Arc<GroupDef> {
        &self.group
    }

    // =========================================================================
    // Range planning
    // =========================================================================

    /// Returns the range covering every row of the group.
    pub fn group_range(&self) -> GroveResult<KeyRange> {
        let root = self.group.root_ordinal();
        let prefix = encoding::encode_value(&Value::bigint(root.as_i64()))?;
        Ok(KeyRange::prefix(&Key::from_vec(prefix)))
    }

    /// Returns the range covering one row and all of its descendants.
    pub fn branch_range(&self, row: &RowData) -> GroveResult<KeyRange> {
        let key = HKey::build(&self.group, row)?.encode()?;
        Ok(KeyRange::prefix(&key))
    }

    /// Returns the range bounded by two partial-row patterns. The end
    /// bound includes the subtree of the last matching row.
    pub fn scan_range(&self, start: &PartialRow, end: &PartialRow) -> GroveResult<KeyRange> {
        let start_key = self.partial_bound(start, false)?;
        let end_key = self.partial_bound(end, true)?;
        Ok(KeyRange::new(start_key, end_key))
    }

    /// Resolves a strategy into a physical range.
    pub fn plan_scan(&self, strategy: &ScanStrategy) -> GroveResult<KeyRange> {
        match strategy {
            ScanStrategy::FullGroup => self.group_range(),
            ScanStrategy::Branch { row } => self.branch_range(row),
            ScanStrategy::TableRange { start, end } => self.scan_range(start, end),
        }
    }

    /// Opens a collector over the range a strategy resolves to. The
    /// collector is returned in its created state; call `open` on it.
    pub fn scan<'e>(
        &self,
        engine: &'e dyn KvEngine,
        strategy: &ScanStrategy,
        tables: TableBitmap,
        columns: ColumnBitmap,
        config: ScanConfig,
    ) -> GroveResult<RowCollector<'e>> {
        let range = self.plan_scan(strategy)?;
        Ok(RowCollector::new(
            engine,
            self.group.clone(),
            range,
            tables,
            columns,
            config,
        ))
    }

    /// Encodes one bound of a partial-row range. The encoding walks the
    /// ancestor chain root-first, emitting each ordinal and the key
    /// values derivable from the pattern; at the first unset key column
    /// it appends the low or high edge sentinel and stops.
    fn partial_bound(&self, partial: &PartialRow, high: bool) -> GroveResult<Key> {
        let table = partial.table();
        if !self.group.contains(table.ordinal()) {
            return Err(GroveError::TableNotFound {
                table: table.name().to_string(),
            });
        }

        // Per chain table, the mapping from its column positions to the
        // pattern's own column positions.
        let mut maps: Vec<(Arc<TableDef>, Vec<Option<usize>>)> = Vec::new();
        let mut position_map: Vec<Option<usize>> = (0..table.column_count()).map(Some).collect();
        let mut current = table.clone();
        loop {
            maps.push((current.clone(), position_map.clone()));
            let Some(link) = current.parent() else { break };
            let mut parent_map = vec![None; link.table.column_count()];
            for (i, &key_position) in link.table.primary_key().iter().enumerate() {
                parent_map[key_position] = position_map[link.join_columns[i]];
            }
            let parent = link.table.clone();
            position_map = parent_map;
            current = parent;
        }
        maps.reverse();

        let sentinel = if high {
            encoding::EDGE_HIGH
        } else {
            encoding::EDGE_LOW
        };
        let mut buf = Vec::new();
        let mut truncated = false;
        'chain: for (chain_table, map) in &maps {
            encoding::encode_value_into(&Value::bigint(chain_table.ordinal().as_i64()), &mut buf)?;
            for &key_position in chain_table.primary_key() {
                let value = map[key_position].and_then(|p| partial.value(p));
                match value {
                    Some(value) if value.is_null() => {
                        return Err(GroveError::invalid_argument(
                            "NULL cannot bound a key range",
                        ));
                    }
                    Some(value) => encoding::encode_value_into(value, &mut buf)?,
                    None => {
                        buf.push(sentinel);
                        truncated = true;
                        break 'chain;
                    }
                }
            }
        }
        if high && !truncated {
            // fully specified end pattern: include that row's subtree
            buf.push(encoding::EDGE_HIGH);
        }
        Ok(Key::from_vec(buf))
    }

    // =========================================================================
    // Bitmaps
    // =========================================================================

    /// Returns a table bitmap selecting the given member tables.
    pub fn table_bitmap(&self, tables: &[&TableDef]) -> GroveResult<TableBitmap> {
        let mut bitmap = TableBitmap::new();
        for table in tables {
            if !self.group.contains(table.ordinal()) {
                return Err(GroveError::TableNotFound {
                    table: table.name().to_string(),
                });
            }
            bitmap.set(table.ordinal());
        }
        Ok(bitmap)
    }

    /// Returns a table bitmap selecting every member table.
    #[must_use]
    pub fn table_bitmap_all(&self) -> TableBitmap {
        self.group.tables().iter().map(|t| t.ordinal()).collect()
    }

    /// Returns a column bitmap selecting every column slot of the group.
    #[must_use]
    pub fn column_bitmap_all(&self) -> ColumnBitmap {
        ColumnBitmap::all(self.group.total_columns())
    }

    /// Returns a column bitmap selecting the named (table, column)
    /// positions.
    pub fn column_bitmap_for(
        &self,
        columns: &[(TableOrdinal, usize)],
    ) -> GroveResult<ColumnBitmap> {
        let mut bitmap = ColumnBitmap::new(self.group.total_columns());
        for &(ordinal, position) in columns {
            let table = self.group.table(ordinal).ok_or_else(|| {
                GroveError::TableNotFound {
                    table: ordinal.to_string(),
                }
            })?;
            if position >= table.column_count() {
                return Err(GroveError::ColumnNotFound {
                    column: position.to_string(),
                    table: table.name().to_string(),
                });
            }
            let offset = self
                .group
                .column_offset(ordinal)
                .expect("member table has an offset");
            bitmap.set(offset + position);
        }
        Ok(bitmap)
    }

    /// Returns the tables that have at least one column selected, i.e.
    /// the table set a projection actually touches.
    #[must_use]
    pub fn projected_tables(&self, columns: &ColumnBitmap) -> TableBitmap {
        let mut bitmap = TableBitmap::new();
        for table in self.group.tables() {
            let offset = self
                .group
                .column_offset(table.ordinal())
                .expect("member table has an offset");
            if columns.any_in_range(offset, table.column_count()) {
                bitmap.set(table.ordinal());
            }
        }
        bitmap
    }

    // =========================================================================
    // Row write path
    // =========================================================================

    /// Validates and writes one row.
    pub fn store_row(&self, engine: &dyn KvEngine, row: &RowData) -> GroveResult<()> {
        let table = row.table();
        self.validate_row(row)?;
        let key = HKey::build(&self.group, row)?.encode()?;
        let payload = encoding::encode_tuple(row.values())?;
        trace!(table = table.name(), key = ?key, "storing row");
        engine.put(key, StorageValue::from_vec(payload))
    }

    /// Fetches one row by its primary key values.
    ///
    /// The row's full hierarchical key must be derivable from its primary
    /// key, i.e. the table's join columns must be key columns; tables
    /// outside that discipline are reachable only by scan.
    pub fn fetch_row(
        &self,
        engine: &dyn KvEngine,
        table: &Arc<TableDef>,
        key_values: &[Value],
    ) -> GroveResult<Option<RowData>> {
        let key = self.key_for(table, key_values)?;
        match engine.get(&key)? {
            None => Ok(None),
            Some(payload) => {
                let values = encoding::decode_tuple(payload.as_bytes())?;
                if values.len() != table.column_count() {
                    return Err(GroveError::SchemaMismatch {
                        message: format!(
                            "stored row for '{}' has {} columns, schema has {}",
                            table.name(),
                            values.len(),
                            table.column_count()
                        ),
                    });
                }
                Ok(Some(RowData::new(table.clone(), values)))
            }
        }
    }

    /// Deletes one row by its primary key values. Returns true if the
    /// row existed. Descendant rows are untouched; removing a whole
    /// subtree is `drop_subtree`'s job.
    pub fn delete_row(
        &self,
        engine: &dyn KvEngine,
        table: &Arc<TableDef>,
        key_values: &[Value],
    ) -> GroveResult<bool> {
        let key = self.key_for(table, key_values)?;
        engine.delete(&key)
    }

    fn key_for(&self, table: &Arc<TableDef>, key_values: &[Value]) -> GroveResult<Key> {
        if key_values.len() != table.primary_key().len() {
            return Err(GroveError::invalid_argument(format!(
                "table '{}' has {} key columns, got {} values",
                table.name(),
                table.primary_key().len(),
                key_values.len()
            )));
        }
        // a pattern row carrying just the key columns is enough to build
        // the full hierarchical key
        let mut values = vec![Value::Null; table.column_count()];
        for (i, &position) in table.primary_key().iter().enumerate() {
            values[position] = key_values[i].clone();
        }
        let row = RowData::new(table.clone(), Tuple::new(values));
        HKey::build(&self.group, &row)?.encode()
    }

    fn validate_row(&self, row: &RowData) -> GroveResult<()> {
        let table = row.table();
        if !self.group.contains(table.ordinal()) {
            return Err(GroveError::TableNotFound {
                table: table.name().to_string(),
            });
        }
        if row.num_columns() != table.column_count() {
            return Err(GroveError::SchemaMismatch {
                message: format!(
                    "table '{}' has {} columns, row has {}",
                    table.name(),
                    table.column_count(),
                    row.num_columns()
                ),
            });
        }
        for (position, column) in table.columns().iter().enumerate() {
            let value = row.get(position).expect("arity checked above");
            if value.is_null() {
                if !column.is_nullable() {
                    return Err(GroveError::NullConstraint {
                        column: column.name().to_string(),
                        table: table.name().to_string(),
                    });
                }
                continue;
            }
            if !value.is_compatible_with(column.kind()) {
                return Err(GroveError::SchemaMismatch {
                    message: format!(
                        "column '{}' of table '{}' is {}, row value is {}",
                        column.name(),
                        table.name(),
                        column.kind(),
                        value.kind().map_or("null", |k| k.name())
                    ),
                });
            }
        }
        Ok(())
    }

    // =========================================================================
    // Subtree deletion
    // =========================================================================

    /// Physically deletes every row of the requested tables.
    ///
    /// The request must be closed under children: dropping a table whose
    /// child is not also requested fails with `DependentTable` before any
    /// mutation. Returns the number of entries removed.
    pub fn drop_subtree(
        &self,
        engine: &dyn KvEngine,
        tables: &[TableOrdinal],
    ) -> GroveResult<u64> {
        if tables.is_empty() {
            return Err(GroveError::invalid_argument("empty drop request"));
        }
        for &ordinal in tables {
            let table = self.group.table(ordinal).ok_or_else(|| {
                GroveError::TableNotFound {
                    table: ordinal.to_string(),
                }
            })?;
            for &child in self.group.children(ordinal) {
                if !tables.contains(&child) {
                    let child_table = self.group.table(child).expect("child is a member");
                    return Err(GroveError::DependentTable {
                        table: table.name().to_string(),
                        child: child_table.name().to_string(),
                    });
                }
            }
        }

        if tables.contains(&self.group.root_ordinal()) {
            // the whole group is one contiguous range
            let count = engine.delete_range(&self.group_range()?)?;
            debug!(count, "dropped group range");
            return Ok(count);
        }

        // Interior tables interleave under their parent rows, so there is
        // no single covering range; sweep the group and match on the
        // ordinal chain instead.
        let mut doomed = Vec::new();
        let mut iter = engine.iter(self.group_range()?)?;
        while let Some((key, _)) = iter.next()? {
            let hkey = HKey::decode(&self.group, key.as_bytes())?;
            if hkey
                .ordinal_chain()
                .iter()
                .any(|ordinal| tables.contains(ordinal))
            {
                doomed.push(key);
            }
        }
        drop(iter);

        let count = doomed.len() as u64;
        let mut txn = engine.begin();
        for key in doomed {
            txn.delete(key);
        }
        txn.commit()?;
        debug!(count, "dropped subtree by sweep");
        Ok(count)
    }
}
