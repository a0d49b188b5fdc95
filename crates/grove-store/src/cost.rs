//! Access-path cost estimation.
//!
//! [`CostModel`] is a pure, stateless estimator: given per-table row
//! counts and widths it prices candidate access paths: a single random
//! read, a sequential sweep, an ancestor chain of point lookups, or a
//! root row plus its whole descendant branch. The planner compares these
//! numbers; they claim monotonicity and relative ordering, not wall-clock
//! accuracy.
//!
//! Statistics arrive from an out-of-band collection job; stale numbers
//! shift estimates, never correctness.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use grove_common::config::CostCoefficients;
use grove_common::error::{GroveError, GroveResult};
use grove_common::types::TableOrdinal;

/// Row-count and row-width statistics for one table or index tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TreeStatistics {
    /// Number of stored rows.
    pub row_count: u64,
    /// Average encoded row width in bytes.
    pub average_row_width: u32,
}

impl TreeStatistics {
    /// Creates statistics from a count and width.
    #[must_use]
    pub const fn new(row_count: u64, average_row_width: u32) -> Self {
        Self {
            row_count,
            average_row_width,
        }
    }
}

/// Read-mostly cache of per-table statistics, refreshed by an external
/// statistics job and consulted by planners.
#[derive(Debug, Default)]
pub struct StatisticsCache {
    entries: RwLock<HashMap<TableOrdinal, TreeStatistics>>,
}

impl StatisticsCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs fresh statistics for a table.
    pub fn put(&self, ordinal: TableOrdinal, statistics: TreeStatistics) {
        self.entries.write().insert(ordinal, statistics);
    }

    /// Returns the cached statistics for a table, if any.
    #[must_use]
    pub fn get(&self, ordinal: TableOrdinal) -> Option<TreeStatistics> {
        self.entries.read().get(&ordinal).copied()
    }

    /// Removes the statistics of a dropped table.
    pub fn remove(&self, ordinal: TableOrdinal) {
        self.entries.write().remove(&ordinal);
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Pure estimator of access-path costs.
#[derive(Debug, Clone)]
pub struct CostModel {
    coefficients: CostCoefficients,
}

impl CostModel {
    /// Creates a model from validated coefficients.
    pub fn new(coefficients: CostCoefficients) -> GroveResult<Self> {
        coefficients.validate()?;
        Ok(Self { coefficients })
    }

    /// Creates a model with the default coefficients.
    #[must_use]
    pub fn default_model() -> Self {
        Self {
            coefficients: CostCoefficients::default(),
        }
    }

    /// Returns the coefficients in use.
    #[must_use]
    pub const fn coefficients(&self) -> &CostCoefficients {
        &self.coefficients
    }

    /// Cost of one non-sequential read of a row of the given width.
    #[must_use]
    pub fn random_access_cost(&self, row_width: u32) -> f64 {
        self.coefficients.random_access_per_byte * f64::from(row_width)
            + self.coefficients.random_access_base
    }

    /// Sequential-access-only cost of sweeping `row_count` rows of the
    /// given width. The positioning seek is charged separately by the
    /// composite paths, so summing this over a group's constituent
    /// tables never double-charges it.
    #[must_use]
    pub fn sequential_scan_cost(&self, row_width: u32, row_count: u64) -> f64 {
        let per_row = self.coefficients.sequential_per_byte * f64::from(row_width)
            + self.coefficients.sequential_base;
        row_count as f64 * per_row
    }

    /// Cost of fetching one row plus each of its ancestors by point
    /// lookups: the sum of independent random accesses down the chain.
    #[must_use]
    pub fn ancestor_lookup_cost(&self, chain: &[TreeStatistics]) -> f64 {
        chain
            .iter()
            .map(|statistics| self.random_access_cost(statistics.average_row_width))
            .sum()
    }

    /// Cost of fetching one root row together with its whole descendant
    /// branch: one random access to the root plus the average per-root
    /// share of sweeping the group.
    #[must_use]
    pub fn branch_lookup_cost(&self, root: &TreeStatistics, group: &[TreeStatistics]) -> f64 {
        let group_sweep: f64 = group
            .iter()
            .map(|statistics| {
                self.sequential_scan_cost(statistics.average_row_width, statistics.row_count)
            })
            .sum();
        let root_rows = root.row_count.max(1) as f64;
        self.random_access_cost(root.average_row_width) + group_sweep / root_rows
    }

    /// Cost of a full sweep of a group: one seek plus the sequential
    /// cost of every constituent table.
    #[must_use]
    pub fn group_scan_cost(&self, group: &[TreeStatistics]) -> f64 {
        let widest = group
            .iter()
            .map(|statistics| statistics.average_row_width)
            .max()
            .unwrap_or(0);
        self.random_access_cost(widest)
            + group
                .iter()
                .map(|statistics| {
                    self.sequential_scan_cost(statistics.average_row_width, statistics.row_count)
                })
                .sum::<f64>()
    }

    // =========================================================================
    // Unimplemented combinators
    // =========================================================================
    //
    // These operators are priced by the executor's own model, not this
    // one. Each returns an explicit error instead of a silently wrong
    // number.

    /// Sorting is not priced by this model.
    pub fn sort_cost(&self, _input: &TreeStatistics) -> GroveResult<f64> {
        Err(GroveError::not_supported("sort cost estimation"))
    }

    /// Duplicate elimination is not priced by this model.
    pub fn distinct_cost(&self, _input: &TreeStatistics) -> GroveResult<f64> {
        Err(GroveError::not_supported("distinct cost estimation"))
    }

    /// Cross products are not priced by this model.
    pub fn product_cost(
        &self,
        _left: &TreeStatistics,
        _right: &TreeStatistics,
    ) -> GroveResult<f64> {
        Err(GroveError::not_supported("product cost estimation"))
    }

    /// Row mapping is not priced by this model.
    pub fn map_cost(&self, _input: &TreeStatistics) -> GroveResult<f64> {
        Err(GroveError::not_supported("map cost estimation"))
    }

    /// Branch flattening is not priced by this model.
    pub fn flatten_cost(&self, _input: &TreeStatistics) -> GroveResult<f64> {
        Err(GroveError::not_supported("flatten cost estimation"))
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::default_model()
    }
}
