//! Storage-layer configuration structures.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_ROW_BUFFER_CAPACITY;
use crate::error::{GroveError, GroveResult};

/// Coefficients of the access-path cost model.
///
/// The four constants are empirically fit, not derived; the model promises
/// only monotonicity and a relative ordering good enough to compare
/// candidate access paths. All costs are in abstract time units per byte
/// or per operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostCoefficients {
    /// Per-byte cost of one non-sequential read.
    pub random_access_per_byte: f64,
    /// Fixed cost of one non-sequential read (seek).
    pub random_access_base: f64,
    /// Per-byte cost of reading one row sequentially.
    pub sequential_per_byte: f64,
    /// Fixed per-row cost of a sequential read.
    pub sequential_base: f64,
}

impl CostCoefficients {
    /// Validates that every coefficient is finite and non-negative, and
    /// that each access kind has some nonzero cost.
    pub fn validate(&self) -> GroveResult<()> {
        let all = [
            self.random_access_per_byte,
            self.random_access_base,
            self.sequential_per_byte,
            self.sequential_base,
        ];
        if all.iter().any(|c| !c.is_finite() || *c < 0.0) {
            return Err(GroveError::invalid_argument(
                "cost coefficients must be finite and non-negative",
            ));
        }
        if self.random_access_per_byte + self.random_access_base == 0.0
            || self.sequential_per_byte + self.sequential_base == 0.0
        {
            return Err(GroveError::invalid_argument(
                "cost coefficients must give each access kind a nonzero cost",
            ));
        }
        Ok(())
    }
}

impl Default for CostCoefficients {
    fn default() -> Self {
        // Fit against an ordered-KV engine on NVMe; random reads dominated
        // by their fixed seek, sequential reads by bandwidth.
        Self {
            random_access_per_byte: 0.012,
            random_access_base: 15.0,
            sequential_per_byte: 0.004,
            sequential_base: 0.25,
        }
    }
}

/// Configuration of a scan's row collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Capacity in rows of the collector's buffer; the collector reports
    /// backpressure when the buffer reaches this size.
    pub row_buffer_capacity: usize,
    /// Optional cap on the total number of rows a scan returns.
    pub row_limit: Option<usize>,
}

impl ScanConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> GroveResult<()> {
        if self.row_buffer_capacity == 0 {
            return Err(GroveError::invalid_argument(
                "row_buffer_capacity must be at least 1",
            ));
        }
        if self.row_limit == Some(0) {
            return Err(GroveError::invalid_argument(
                "row_limit of 0 would collect nothing; use None for unlimited",
            ));
        }
        Ok(())
    }

    /// Returns a copy with the given row limit.
    #[must_use]
    pub fn with_row_limit(mut self, limit: usize) -> Self {
        self.row_limit = Some(limit);
        self
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            row_buffer_capacity: DEFAULT_ROW_BUFFER_CAPACITY,
            row_limit: None,
        }
    }
}
