//! Row collection.
//!
//! A [`RowCollector`] drives a KV iterator over one physical range and
//! reconstructs logical rows: it decodes each entry's hierarchical key,
//! skips tables the scan did not ask for, decodes the payload, and
//! applies the column projection. The API is cooperative and pull-based:
//! backpressure is expressed entirely through [`RowBuffer`] capacity and
//! the boolean result of `collect_next_row`; the caller controls pacing.
//!
//! A collector is owned by exactly one logical scan at a time and is not
//! safe to share across threads; independent collectors over overlapping
//! ranges are fine.

use std::sync::Arc;

use tracing::trace;

use grove_codec::{encoding, Tuple, Value};
use grove_common::config::ScanConfig;
use grove_common::error::{GroveError, GroveResult};
use grove_common::types::{Key, Value as StorageValue};

use crate::bitmap::{ColumnBitmap, TableBitmap};
use crate::engine::{KeyRange, KvEngine, KvIterator};
use crate::hkey::HKey;
use crate::row::RowData;
use crate::schema::GroupDef;

/// Lifecycle state of a collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    /// Constructed, not yet opened.
    Created,
    /// Open with entries (possibly) remaining.
    Active,
    /// The range ran dry. This is the normal terminal state, not an
    /// error.
    Exhausted,
    /// Closed; engine resources released.
    Closed,
}

impl CollectorState {
    const fn name(self) -> &'static str {
        match self {
            CollectorState::Created => "created",
            CollectorState::Active => "active",
            CollectorState::Exhausted => "exhausted",
            CollectorState::Closed => "closed",
        }
    }
}

/// A bounded buffer of collected rows.
///
/// The collector appends rows until the buffer is full, then reports
/// backpressure; the caller drains with [`take_rows`](Self::take_rows)
/// and resumes collecting.
#[derive(Debug)]
pub struct RowBuffer {
    rows: Vec<RowData>,
    capacity: usize,
}

impl RowBuffer {
    /// Creates a buffer holding up to `capacity` rows.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Returns true if the buffer cannot take another row.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.rows.len() >= self.capacity
    }

    /// Returns the number of buffered rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the buffer holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the buffered rows.
    #[must_use]
    pub fn rows(&self) -> &[RowData] {
        &self.rows
    }

    /// Drains and returns the buffered rows.
    pub fn take_rows(&mut self) -> Vec<RowData> {
        std::mem::take(&mut self.rows)
    }

    fn push(&mut self, row: RowData) {
        self.rows.push(row);
    }
}

/// A stateful cursor turning a physical key range into logical rows.
pub struct RowCollector<'e> {
    engine: &'e dyn KvEngine,
    group: Arc<GroupDef>,
    range: KeyRange,
    tables: TableBitmap,
    columns: ColumnBitmap,
    config: ScanConfig,
    state: CollectorState,
    iter: Option<Box<dyn KvIterator + 'e>>,
    pending: Option<(Key, StorageValue)>,
    generation: u64,
    delivered: usize,
}

impl<'e> RowCollector<'e> {
    /// Creates a collector in the created state over a planned range.
    #[must_use]
    pub fn new(
        engine: &'e dyn KvEngine,
        group: Arc<GroupDef>,
        range: KeyRange,
        tables: TableBitmap,
        columns: ColumnBitmap,
        config: ScanConfig,
    ) -> Self {
        Self {
            engine,
            group,
            range,
            tables,
            columns,
            config,
            state: CollectorState::Created,
            iter: None,
            pending: None,
            generation: 0,
            delivered: 0,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> CollectorState {
        self.state
    }

    /// Returns true iff the collector is open and entries may remain.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.state == CollectorState::Active
    }

    /// Positions the engine iterator at the range start. Transitions to
    /// `Active`, or straight to `Exhausted` if the range is empty.
    pub fn open(&mut self) -> GroveResult<()> {
        if self.state != CollectorState::Created {
            return Err(GroveError::InvalidState {
                expected: CollectorState::Created.name(),
                actual: self.state.name(),
            });
        }
        self.config.validate()?;
        self.generation = self.engine.key_generation();
        let mut iter = self.engine.iter(self.range.clone())?;
        self.pending = iter.next()?;
        self.iter = Some(iter);
        self.state = if self.pending.is_some() {
            CollectorState::Active
        } else {
            CollectorState::Exhausted
        };
        trace!(state = self.state.name(), "collector opened");
        Ok(())
    }

    /// Collects the next wanted row into `buffer`.
    ///
    /// Returns `true` when a row was appended. Returns `false` when the
    /// buffer is full (drain it and call again) or the range is
    /// exhausted (the state is then `Exhausted`). Entries of tables
    /// outside the table bitmap are traversed but produce no row.
    ///
    /// Fails with `ConcurrentModification` if the keyspace's structure
    /// changed since `open`; the scan terminates and the caller must
    /// retry the whole operation.
    pub fn collect_next_row(&mut self, buffer: &mut RowBuffer) -> GroveResult<bool> {
        loop {
            match self.state {
                CollectorState::Active => {}
                CollectorState::Exhausted => return Ok(false),
                state => {
                    return Err(GroveError::InvalidState {
                        expected: CollectorState::Active.name(),
                        actual: state.name(),
                    });
                }
            }

            if self.engine.key_generation() != self.generation {
                self.abort();
                return Err(GroveError::ConcurrentModification {
                    ordinal: self.group.root_ordinal(),
                });
            }

            if buffer.is_full() {
                return Ok(false);
            }
            if let Some(limit) = self.config.row_limit {
                if self.delivered >= limit {
                    self.state = CollectorState::Exhausted;
                    self.iter = None;
                    self.pending = None;
                    return Ok(false);
                }
            }

            let Some((key, payload)) = self.pending.take() else {
                self.state = CollectorState::Exhausted;
                self.iter = None;
                return Ok(false);
            };
            // advance before decoding so a skip continues cleanly
            self.pending = self
                .iter
                .as_mut()
                .expect("iterator present while active")
                .next()?;

            match self.materialize(&key, &payload) {
                Ok(Some(row)) => {
                    buffer.push(row);
                    self.delivered += 1;
                    return Ok(true);
                }
                Ok(None) => {
                    // entry of an unwanted table; keep walking
                    continue;
                }
                Err(error) => {
                    // a corrupt entry aborts this scan, nothing else
                    self.abort();
                    return Err(error);
                }
            }
        }
    }

    /// Releases the engine iterator. Idempotent; safe after errors.
    pub fn close(&mut self) {
        self.iter = None;
        self.pending = None;
        self.state = CollectorState::Closed;
    }

    fn abort(&mut self) {
        self.iter = None;
        self.pending = None;
        self.state = CollectorState::Exhausted;
    }

    /// Decodes one physical entry into a row, or `None` if its table is
    /// not selected.
    fn materialize(&self, key: &Key, payload: &StorageValue) -> GroveResult<Option<RowData>> {
        let hkey = HKey::decode(&self.group, key.as_bytes())?;
        let ordinal = hkey.table_ordinal();
        if !self.tables.contains(ordinal) {
            return Ok(None);
        }
        let table = self
            .group
            .table(ordinal)
            .expect("decoded ordinal is a member")
            .clone();

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

        // project: unselected columns are nulled, never omitted, so the
        // row keeps its fixed shape
        let offset = self
            .group
            .column_offset(ordinal)
            .expect("member table has an offset");
        let values: Vec<Value> = values
            .into_values()
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                if self.columns.is_set(offset + i) {
                    value
                } else {
                    Value::Null
                }
            })
            .collect();

        Ok(Some(RowData::new(table, Tuple::new(values))))
    }
}

impl std::fmt::Debug for RowCollector<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowCollector")
            .field("state", &self.state)
            .field("delivered", &self.delivered)
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}
