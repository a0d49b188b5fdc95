//! Storage-layer error types.
//!
//! Provides the error taxonomy for encoding, schema, layout, scan, and
//! engine failures.

use std::fmt;
use thiserror::Error;

use crate::types::TableOrdinal;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Unknown or unspecified error.
    Unknown = 0x0000,
    /// Internal error (bug).
    Internal = 0x0001,
    /// Operation not supported.
    NotSupported = 0x0002,
    /// Invalid argument provided.
    InvalidArgument = 0x0003,
    /// Object used in the wrong state.
    InvalidState = 0x0004,

    // Codec errors (0x0100 - 0x01FF)
    /// Value could not be encoded.
    Encoding = 0x0100,
    /// Byte run could not be decoded.
    Decoding = 0x0101,

    // Schema errors (0x0200 - 0x02FF)
    /// Table not found.
    TableNotFound = 0x0200,
    /// Column not found.
    ColumnNotFound = 0x0201,
    /// Row shape does not match the table schema.
    SchemaMismatch = 0x0202,
    /// NULL written to a non-nullable column.
    NullConstraint = 0x0203,
    /// Group metadata violates the tree invariant.
    GroupInvariant = 0x0204,

    // Layout / scan errors (0x0300 - 0x03FF)
    /// Table dropped without its dependent children.
    DependentTable = 0x0300,
    /// Concurrent write invalidated an open scan.
    ConcurrentModification = 0x0301,

    // Engine errors (0x0400 - 0x04FF)
    /// KV engine failure.
    Engine = 0x0400,
    /// Key exceeds the maximum size.
    KeyTooLarge = 0x0401,
    /// Value exceeds the maximum size.
    ValueTooLarge = 0x0402,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "Codec",
            0x02 => "Schema",
            0x03 => "Layout",
            0x04 => "Engine",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The main error type for GroveDB.
///
/// This enum covers all possible errors that can occur in the storage
/// layer. Each variant includes relevant context for debugging.
///
/// # Example
///
/// ```rust
/// use grove_common::error::{GroveError, GroveResult};
///
/// fn decode_header(bytes: &[u8]) -> GroveResult<u8> {
///     bytes.first().copied().ok_or(GroveError::Decoding {
///         offset: 0,
///         message: "empty input".to_string(),
///     })
/// }
/// ```
#[derive(Debug, Error)]
pub enum GroveError {
    // ==========================================================================
    // General Errors
    // ==========================================================================
    /// Internal error - this indicates a bug.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },

    /// Operation not supported.
    #[error("operation not supported: {operation}")]
    NotSupported {
        /// The unsupported operation.
        operation: String,
    },

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Error message.
        message: String,
    },

    /// Object used in the wrong state.
    #[error("invalid state: expected {expected}, was {actual}")]
    InvalidState {
        /// The state the operation requires.
        expected: &'static str,
        /// The state the object was in.
        actual: &'static str,
    },

    // ==========================================================================
    // Codec Errors
    // ==========================================================================
    /// Value could not be encoded.
    #[error("encoding error: {message}")]
    Encoding {
        /// Error message.
        message: String,
    },

    /// Byte run could not be decoded. Local to one decode call; a scan
    /// that hits this aborts, other in-flight operations are unaffected.
    #[error("decoding error at offset {offset}: {message}")]
    Decoding {
        /// Byte offset where decoding failed.
        offset: usize,
        /// Error message.
        message: String,
    },

    // ==========================================================================
    // Schema Errors
    // ==========================================================================
    /// Table not found.
    #[error("table '{table}' not found")]
    TableNotFound {
        /// The missing table.
        table: String,
    },

    /// Column not found.
    #[error("column '{column}' not found in table '{table}'")]
    ColumnNotFound {
        /// The missing column.
        column: String,
        /// The table name.
        table: String,
    },

    /// Row shape does not match the table schema.
    #[error("schema mismatch: {message}")]
    SchemaMismatch {
        /// Error message.
        message: String,
    },

    /// NULL written to a non-nullable column.
    #[error("null value violates not-null constraint on column '{column}' of table '{table}'")]
    NullConstraint {
        /// The violated column.
        column: String,
        /// The table name.
        table: String,
    },

    /// Group metadata violates the tree invariant.
    #[error("invalid group definition: {message}")]
    GroupInvariant {
        /// Error message.
        message: String,
    },

    // ==========================================================================
    // Layout / Scan Errors
    // ==========================================================================
    /// Table dropped without its dependent children. Validated before any
    /// mutation, so no partial delete is ever performed.
    #[error("cannot drop table '{table}': dependent child table '{child}' not in drop request")]
    DependentTable {
        /// The table being dropped.
        table: String,
        /// A child table missing from the request.
        child: String,
    },

    /// Concurrent write invalidated an open scan. The caller retries the
    /// whole operation; the scan is never resumed.
    #[error("scan of group rooted at ordinal {ordinal} invalidated by a concurrent key-structure change")]
    ConcurrentModification {
        /// Ordinal of the scanned group's root table.
        ordinal: TableOrdinal,
    },

    // ==========================================================================
    // Engine Errors
    // ==========================================================================
    /// KV engine failure.
    #[error("kv engine error: {message}")]
    Engine {
        /// Error message.
        message: String,
    },

    /// Key exceeds the maximum size.
    #[error("key size {size} exceeds maximum {max_size}")]
    KeyTooLarge {
        /// Actual key size.
        size: usize,
        /// Maximum allowed size.
        max_size: usize,
    },

    /// Value exceeds the maximum size.
    #[error("value size {size} exceeds maximum {max_size}")]
    ValueTooLarge {
        /// Actual value size.
        size: usize,
        /// Maximum allowed size.
        max_size: usize,
    },
}

impl GroveError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Internal { .. } => ErrorCode::Internal,
            Self::NotSupported { .. } => ErrorCode::NotSupported,
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Self::InvalidState { .. } => ErrorCode::InvalidState,
            Self::Encoding { .. } => ErrorCode::Encoding,
            Self::Decoding { .. } => ErrorCode::Decoding,
            Self::TableNotFound { .. } => ErrorCode::TableNotFound,
            Self::ColumnNotFound { .. } => ErrorCode::ColumnNotFound,
            Self::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
            Self::NullConstraint { .. } => ErrorCode::NullConstraint,
            Self::GroupInvariant { .. } => ErrorCode::GroupInvariant,
            Self::DependentTable { .. } => ErrorCode::DependentTable,
            Self::ConcurrentModification { .. } => ErrorCode::ConcurrentModification,
            Self::Engine { .. } => ErrorCode::Engine,
            Self::KeyTooLarge { .. } => ErrorCode::KeyTooLarge,
            Self::ValueTooLarge { .. } => ErrorCode::ValueTooLarge,
        }
    }

    /// Returns true if retrying the whole operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a not-supported error.
    #[must_use]
    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported {
            operation: operation.into(),
        }
    }

    /// Creates an invalid-argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an encoding error.
    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Creates a decoding error at the given byte offset.
    #[must_use]
    pub fn decoding(offset: usize, message: impl Into<String>) -> Self {
        Self::Decoding {
            offset,
            message: message.into(),
        }
    }

    /// Creates a group-invariant error.
    #[must_use]
    pub fn group_invariant(message: impl Into<String>) -> Self {
        Self::GroupInvariant {
            message: message.into(),
        }
    }

    /// Creates a KV engine error.
    #[must_use]
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = GroveError::decoding(12, "truncated run");
        assert_eq!(err.code(), ErrorCode::Decoding);
        assert_eq!(err.code().category(), "Codec");
    }

    #[test]
    fn test_error_display() {
        let err = GroveError::DependentTable {
            table: "orders".to_string(),
            child: "items".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cannot drop table 'orders': dependent child table 'items' not in drop request"
        );
    }

    #[test]
    fn test_retryable() {
        let conflict = GroveError::ConcurrentModification {
            ordinal: TableOrdinal::new(3),
        };
        assert!(conflict.is_retryable());
        assert!(!GroveError::encoding("NaN").is_retryable());
    }

    #[test]
    fn test_category_ranges() {
        assert_eq!(ErrorCode::NullConstraint.category(), "Schema");
        assert_eq!(ErrorCode::ConcurrentModification.category(), "Layout");
        assert_eq!(ErrorCode::KeyTooLarge.category(), "Engine");
    }
}
