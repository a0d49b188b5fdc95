//! Table and group metadata.
//!
//! A [`TableDef`] describes one logical table: its columns, primary key,
//! and (for non-root tables) the parent it is grouped under plus the join
//! columns that mirror the parent's primary key position-for-position. A
//! [`GroupDef`] collects every table of one group and validates the tree
//! invariant that the clustering property depends on.

use std::collections::HashMap;
use std::sync::Arc;

use grove_codec::ValueKind;
use grove_common::error::{GroveError, GroveResult};
use grove_common::types::TableOrdinal;

/// A column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    name: String,
    kind: ValueKind,
    nullable: bool,
}

impl ColumnDef {
    /// Creates a non-nullable column.
    pub fn not_null(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
        }
    }

    /// Creates a nullable column.
    pub fn nullable(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
        }
    }

    /// Returns the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared value kind.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Returns true if the column accepts NULL.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Link from a child table to its parent within a group.
#[derive(Debug, Clone)]
pub struct ParentLink {
    /// The parent table.
    pub table: Arc<TableDef>,
    /// Child column positions matching the parent's primary key,
    /// position-for-position.
    pub join_columns: Vec<usize>,
}

/// A logical table's layout within a group.
#[derive(Debug, Clone)]
pub struct TableDef {
    name: String,
    ordinal: TableOrdinal,
    columns: Vec<ColumnDef>,
    primary_key: Vec<usize>,
    parent: Option<ParentLink>,
}

impl TableDef {
    /// Creates a new root-less table definition with no primary key.
    /// Use the `with_*` builders to complete it, then validate the whole
    /// group with [`GroupDef::new`].
    pub fn new(name: impl Into<String>, ordinal: u16, columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.into(),
            ordinal: TableOrdinal::new(ordinal),
            columns,
            primary_key: Vec::new(),
            parent: None,
        }
    }

    /// Sets the primary key column positions.
    #[must_use]
    pub fn with_primary_key(mut self, positions: Vec<usize>) -> Self {
        self.primary_key = positions;
        self
    }

    /// Links this table under a parent. `join_columns` are this table's
    /// column positions corresponding to the parent's primary key.
    #[must_use]
    pub fn with_parent(mut self, parent: Arc<TableDef>, join_columns: Vec<usize>) -> Self {
        self.parent = Some(ParentLink {
            table: parent,
            join_columns,
        });
        self
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the table ordinal.
    #[must_use]
    pub const fn ordinal(&self) -> TableOrdinal {
        self.ordinal
    }

    /// Returns the columns.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Returns the column at the given position.
    #[must_use]
    pub fn column(&self, position: usize) -> Option<&ColumnDef> {
        self.columns.get(position)
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the primary key column positions.
    #[must_use]
    pub fn primary_key(&self) -> &[usize] {
        &self.primary_key
    }

    /// Returns the parent link, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    /// Returns true if this table has no parent.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Returns the number of tables on the root-to-self chain.
    #[must_use]
    pub fn hkey_depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self.parent.as_ref();
        while let Some(link) = current {
            depth += 1;
            current = link.table.parent();
        }
        depth
    }

    /// Returns the root-to-self ancestor chain, self included.
    #[must_use]
    pub fn ancestor_chain(&self) -> Vec<&TableDef> {
        let mut chain = vec![self];
        let mut current = self.parent.as_ref();
        while let Some(link) = current {
            chain.push(link.table.as_ref());
            current = link.table.parent();
        }
        chain.reverse();
        chain
    }
}

/// The set of tables forming one group: a root table and every table
/// reachable from it through parent links, stored in one keyspace.
#[derive(Debug)]
pub struct GroupDef {
    tables: Vec<Arc<TableDef>>,
    by_ordinal: HashMap<TableOrdinal, usize>,
    children: HashMap<TableOrdinal, Vec<TableOrdinal>>,
    column_offsets: HashMap<TableOrdinal, usize>,
    total_columns: usize,
    root: TableOrdinal,
}

impl GroupDef {
    /// Builds and validates a group from its member tables.
    ///
    /// Validation enforces the tree invariant: unique valid ordinals,
    /// exactly one root, every parent a member, join columns matching the
    /// parent's primary key in arity and kind, and, for tables that have
    /// both a parent and children, join columns contained in the table's
    /// own primary key, so that any row's full ancestor chain is
    /// derivable from the row alone.
    pub fn new(tables: Vec<Arc<TableDef>>) -> GroveResult<Self> {
        if tables.is_empty() {
            return Err(GroveError::group_invariant("group has no tables"));
        }

        let mut tables = tables;
        tables.sort_by_key(|t| t.ordinal());

        let mut by_ordinal = HashMap::with_capacity(tables.len());
        for (index, table) in tables.iter().enumerate() {
            if !table.ordinal().is_valid() {
                return Err(GroveError::group_invariant(format!(
                    "table '{}' has the invalid ordinal 0",
                    table.name()
                )));
            }
            if by_ordinal.insert(table.ordinal(), index).is_some() {
                return Err(GroveError::group_invariant(format!(
                    "duplicate ordinal {} in group",
                    table.ordinal()
                )));
            }
        }

        let mut root = None;
        let mut children: HashMap<TableOrdinal, Vec<TableOrdinal>> =
            tables.iter().map(|t| (t.ordinal(), Vec::new())).collect();

        for table in &tables {
            Self::validate_table(table, &by_ordinal)?;
            match table.parent() {
                None => {
                    if let Some(existing) = root {
                        return Err(GroveError::group_invariant(format!(
                            "group has two roots: ordinals {existing} and {}",
                            table.ordinal()
                        )));
                    }
                    root = Some(table.ordinal());
                }
                Some(link) => {
                    children
                        .get_mut(&link.table.ordinal())
                        .expect("parent membership validated")
                        .push(table.ordinal());
                }
            }
        }
        let root = root.ok_or_else(|| GroveError::group_invariant("group has no root table"))?;

        for ordinals in children.values_mut() {
            ordinals.sort();
        }

        // join-in-primary-key discipline for interior tables
        for table in &tables {
            let has_children = !children[&table.ordinal()].is_empty();
            if let Some(link) = table.parent() {
                if has_children {
                    for &join in &link.join_columns {
                        if !table.primary_key().contains(&join) {
                            return Err(GroveError::group_invariant(format!(
                                "interior table '{}' must carry join column {} in its primary key",
                                table.name(),
                                join
                            )));
                        }
                    }
                }
            }
        }

        let mut column_offsets = HashMap::with_capacity(tables.len());
        let mut total_columns = 0;
        for table in &tables {
            column_offsets.insert(table.ordinal(), total_columns);
            total_columns += table.column_count();
        }

        Ok(Self {
            tables,
            by_ordinal,
            children,
            column_offsets,
            total_columns,
            root,
        })
    }

    fn validate_table(
        table: &Arc<TableDef>,
        by_ordinal: &HashMap<TableOrdinal, usize>,
    ) -> GroveResult<()> {
        if table.primary_key().is_empty() {
            return Err(GroveError::group_invariant(format!(
                "table '{}' has no primary key",
                table.name()
            )));
        }
        for &position in table.primary_key() {
            let column = table.column(position).ok_or_else(|| {
                GroveError::group_invariant(format!(
                    "table '{}' primary key position {} out of range",
                    table.name(),
                    position
                ))
            })?;
            if column.is_nullable() {
                return Err(GroveError::group_invariant(format!(
                    "table '{}' primary key column '{}' must be non-nullable",
                    table.name(),
                    column.name()
                )));
            }
        }

        let Some(link) = table.parent() else {
            return Ok(());
        };
        if !by_ordinal.contains_key(&link.table.ordinal()) {
            return Err(GroveError::group_invariant(format!(
                "table '{}' joins to parent ordinal {} outside the group",
                table.name(),
                link.table.ordinal()
            )));
        }
        let parent_key = link.table.primary_key();
        if link.join_columns.len() != parent_key.len() {
            return Err(GroveError::group_invariant(format!(
                "table '{}' has {} join columns but parent '{}' has {} key columns",
                table.name(),
                link.join_columns.len(),
                link.table.name(),
                parent_key.len()
            )));
        }
        for (i, &join) in link.join_columns.iter().enumerate() {
            let child_column = table.column(join).ok_or_else(|| {
                GroveError::group_invariant(format!(
                    "table '{}' join column position {} out of range",
                    table.name(),
                    join
                ))
            })?;
            let parent_column = link.table.column(parent_key[i]).ok_or_else(|| {
                GroveError::group_invariant(format!(
                    "table '{}' primary key position {} out of range",
                    link.table.name(),
                    parent_key[i]
                ))
            })?;
            if child_column.kind() != parent_column.kind() {
                return Err(GroveError::group_invariant(format!(
                    "table '{}' join column '{}' is {} but parent key column '{}' is {}",
                    table.name(),
                    child_column.name(),
                    child_column.kind(),
                    parent_column.name(),
                    parent_column.kind()
                )));
            }
        }
        Ok(())
    }

    /// Returns the root table's ordinal.
    #[must_use]
    pub const fn root_ordinal(&self) -> TableOrdinal {
        self.root
    }

    /// Returns the root table.
    #[must_use]
    pub fn root(&self) -> &Arc<TableDef> {
        self.table(self.root).expect("root is a member")
    }

    /// Returns every member table, in ordinal order.
    #[must_use]
    pub fn tables(&self) -> &[Arc<TableDef>] {
        &self.tables
    }

    /// Returns the number of member tables.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Looks up a member table by ordinal.
    #[must_use]
    pub fn table(&self, ordinal: TableOrdinal) -> Option<&Arc<TableDef>> {
        self.by_ordinal.get(&ordinal).map(|&i| &self.tables[i])
    }

    /// Returns true if the ordinal names a member table.
    #[must_use]
    pub fn contains(&self, ordinal: TableOrdinal) -> bool {
        self.by_ordinal.contains_key(&ordinal)
    }

    /// Returns the direct children of a table, in ordinal order.
    #[must_use]
    pub fn children(&self, ordinal: TableOrdinal) -> &[TableOrdinal] {
        self.children.get(&ordinal).map_or(&[], Vec::as_slice)
    }

    /// Returns the column-slot offset of a table in the group-wide
    /// column numbering (tables concatenated in ordinal order).
    #[must_use]
    pub fn column_offset(&self, ordinal: TableOrdinal) -> Option<usize> {
        self.column_offsets.get(&ordinal).copied()
    }

    /// Returns the total number of column slots across the group.
    #[must_use]
    pub const fn total_columns(&self) -> usize {
        self.total_columns
    }
}
