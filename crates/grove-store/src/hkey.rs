//! Hierarchical keys.
//!
//! An HKey is the physical storage key of a row: for the root-to-self
//! ancestor chain it interleaves each table's ordinal with that table's
//! primary-key tuple. Because every element encoding is self-delimiting
//! and order-preserving, the encoded HKey of a row sorts immediately
//! before the encoded HKeys of all of its descendants, which is the
//! clustering property the whole layout is built on.
//!
//! HKeys are transient: built on demand from a row and its table chain,
//! encoded, and discarded. They are never persisted as objects.

use grove_codec::{encoding, Tuple, Value};
use grove_common::error::{GroveError, GroveResult};
use grove_common::types::{Key, TableOrdinal};

use crate::row::RowData;
use crate::schema::{GroupDef, TableDef};

/// One (ordinal, primary-key) pair on an HKey's ancestor chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HKeySegment {
    /// Ordinal of the table at this depth.
    pub ordinal: TableOrdinal,
    /// That table's primary-key values.
    pub key: Tuple,
}

/// A hierarchical key: the root-first chain of (ordinal, key) segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HKey {
    segments: Vec<HKeySegment>,
}

impl HKey {
    /// Builds the HKey of a row.
    ///
    /// Each ancestor's primary key is resolved from the row itself by
    /// following join columns up the chain (the group validated at
    /// construction that this is always possible). Fails if any key
    /// column of the chain is NULL.
    pub fn build(group: &GroupDef, row: &RowData) -> GroveResult<Self> {
        let table = row.table();
        if !group.contains(table.ordinal()) {
            return Err(GroveError::TableNotFound {
                table: table.name().to_string(),
            });
        }

        let mut segments = Vec::with_capacity(table.hkey_depth());
        // Maps a column position of the current chain table to the row's
        // own column position; identity at the leaf, narrowed through
        // join columns at each step up.
        let mut position_map: Vec<Option<usize>> = (0..table.column_count()).map(Some).collect();
        let mut current: &TableDef = table;

        loop {
            let mut key_values = Vec::with_capacity(current.primary_key().len());
            for &key_position in current.primary_key() {
                let row_position = position_map[key_position].ok_or_else(|| {
                    GroveError::internal(format!(
                        "key column '{}' of ancestor '{}' not derivable from row",
                        current
                            .column(key_position)
                            .map_or("?", |c| c.name()),
                        current.name()
                    ))
                })?;
                let value = row.get(row_position).ok_or_else(|| {
                    GroveError::SchemaMismatch {
                        message: format!(
                            "row for '{}' is missing column {}",
                            table.name(),
                            row_position
                        ),
                    }
                })?;
                if value.is_null() {
                    return Err(GroveError::NullConstraint {
                        column: current
                            .column(key_position)
                            .map_or_else(|| "?".to_string(), |c| c.name().to_string()),
                        table: current.name().to_string(),
                    });
                }
                key_values.push(value.clone());
            }
            segments.push(HKeySegment {
                ordinal: current.ordinal(),
                key: Tuple::new(key_values),
            });

            let Some(link) = current.parent() else { break };
            let mut parent_map = vec![None; link.table.column_count()];
            for (i, &key_position) in link.table.primary_key().iter().enumerate() {
                parent_map[key_position] = position_map[link.join_columns[i]];
            }
            position_map = parent_map;
            current = link.table.as_ref();
        }

        segments.reverse();
        Ok(Self { segments })
    }

    /// Decodes an encoded HKey back into its segments, using the group's
    /// metadata to recover each segment's key arity.
    pub fn decode(group: &GroupDef, bytes: &[u8]) -> GroveResult<Self> {
        let mut segments = Vec::new();
        let mut offset = 0;
        let mut expected_parent: Option<TableOrdinal> = None;

        while offset < bytes.len() {
            let (value, consumed) = encoding::decode_value(bytes, offset)?;
            let Value::BigInt(raw) = value else {
                return Err(GroveError::decoding(
                    offset,
                    "hkey segment does not begin with an ordinal",
                ));
            };
            offset += consumed;

            let ordinal = u16::try_from(raw)
                .map(TableOrdinal::new)
                .map_err(|_| GroveError::decoding(offset, format!("ordinal {raw} out of range")))?;
            let table = group.table(ordinal).ok_or_else(|| {
                GroveError::decoding(offset, format!("ordinal {ordinal} is not in this group"))
            })?;

            let actual_parent = table.parent().map(|link| link.table.ordinal());
            if actual_parent != expected_parent {
                return Err(GroveError::decoding(
                    offset,
                    format!("table ordinal {ordinal} out of chain order in hkey"),
                ));
            }

            let (key, consumed) =
                encoding::decode_tuple_prefix(bytes, offset, table.primary_key().len())?;
            offset += consumed;
            segments.push(HKeySegment { ordinal, key });
            expected_parent = Some(ordinal);
        }

        if segments.is_empty() {
            return Err(GroveError::decoding(0, "empty hkey"));
        }
        Ok(Self { segments })
    }

    /// Returns the root-first segments.
    #[must_use]
    pub fn segments(&self) -> &[HKeySegment] {
        &self.segments
    }

    /// Returns the ordinal of the row's own table (the deepest segment).
    #[must_use]
    pub fn table_ordinal(&self) -> TableOrdinal {
        self.segments.last().expect("hkey has a leaf segment").ordinal
    }

    /// Returns the root-first chain of ordinals.
    #[must_use]
    pub fn ordinal_chain(&self) -> Vec<TableOrdinal> {
        self.segments.iter().map(|s| s.ordinal).collect()
    }

    /// Flattens the key into one tuple: ordinal, key values, ordinal, ...
    #[must_use]
    pub fn to_tuple(&self) -> Tuple {
        let mut values = Vec::new();
        for segment in &self.segments {
            values.push(Value::bigint(segment.ordinal.as_i64()));
            values.extend(segment.key.iter().cloned());
        }
        Tuple::new(values)
    }

    /// Encodes the key into its physical byte form.
    pub fn encode(&self) -> GroveResult<Key> {
        Ok(Key::from_vec(encoding::encode_tuple(&self.to_tuple())?))
    }
}
