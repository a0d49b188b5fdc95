//! System-wide constants and limits.

/// Maximum encoded key size in bytes (16 KB).
///
/// Hierarchical keys concatenate every ancestor's ordinal and primary key,
/// so deep groups with wide keys approach this limit first.
pub const MAX_KEY_SIZE: usize = 16 * 1024;

/// Maximum encoded row payload size in bytes (1 MB).
pub const MAX_VALUE_SIZE: usize = 1024 * 1024;

/// Default capacity (in rows) of a collector's row buffer.
pub const DEFAULT_ROW_BUFFER_CAPACITY: usize = 256;

/// Maximum number of significant decimal digits a key column may carry.
pub const MAX_DECIMAL_DIGITS: u32 = 38;
