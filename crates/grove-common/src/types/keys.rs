//! Byte-level key and value types for the KV-engine boundary.
//!
//! A [`Key`] is an encoded hierarchical key; a [`Value`] is an encoded row
//! payload. Both are cheap-to-clone variable-length byte wrappers. Keys
//! compare as unsigned byte strings, which by construction of the codec is
//! exactly the semantic row order.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;

/// An encoded storage key.
///
/// Keys are produced by the tuple codec and are never interpreted here;
/// this wrapper only carries bytes and their lexicographic order.
///
/// # Example
///
/// ```rust
/// use grove_common::types::Key;
///
/// let key = Key::from_bytes(&[0x03, 0x80, 0, 0, 0, 0, 0, 0, 1]);
/// assert_eq!(key.len(), 9);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key(Bytes);

impl Key {
    /// Creates an empty key.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self(Bytes::new())
    }

    /// Creates a key from a byte slice.
    #[inline]
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }

    /// Creates a key from owned bytes.
    #[inline]
    #[must_use]
    pub fn from_vec(vec: Vec<u8>) -> Self {
        Self(Bytes::from(vec))
    }

    /// Returns the length of the key in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the key is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the key as a byte slice.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Checks if this key starts with the given prefix.
    #[inline]
    #[must_use]
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.0.starts_with(prefix)
    }

    /// Returns the smallest key strictly greater than every key with this
    /// key as a prefix, i.e. the exclusive upper bound of the prefix range.
    #[must_use]
    pub fn prefix_end(&self) -> Self {
        let mut bytes = self.0.to_vec();
        bytes.push(0xFF);
        Self::from_vec(bytes)
    }

    /// Returns the immediate successor key (this key followed by 0x00).
    #[must_use]
    pub fn successor(&self) -> Self {
        let mut bytes = self.0.to_vec();
        bytes.push(0x00);
        Self::from_vec(bytes)
    }
}

impl Deref for Key {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for Key {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Ord for Key {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for Key {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Encoded keys are binary, so always render hex
        write!(f, "Key(0x")?;
        for byte in &self.0[..self.0.len().min(32)] {
            write!(f, "{byte:02x}")?;
        }
        if self.0.len() > 32 {
            write!(f, "...")?;
        }
        write!(f, ")")
    }
}

impl From<Vec<u8>> for Key {
    #[inline]
    fn from(vec: Vec<u8>) -> Self {
        Self::from_vec(vec)
    }
}

impl From<&[u8]> for Key {
    #[inline]
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

/// An encoded row payload.
///
/// Values are opaque to the engine; the store layer encodes and decodes
/// them with the tuple codec.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Value(Bytes);

impl Value {
    /// Creates an empty value.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self(Bytes::new())
    }

    /// Creates a value from a byte slice.
    #[inline]
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }

    /// Creates a value from owned bytes.
    #[inline]
    #[must_use]
    pub fn from_vec(vec: Vec<u8>) -> Self {
        Self(Bytes::from(vec))
    }

    /// Returns the length of the value in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the value is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the value as a byte slice.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for Value {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for Value {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for Value {
    #[inline]
    fn from(vec: Vec<u8>) -> Self {
        Self::from_vec(vec)
    }
}

impl From<&[u8]> for Value {
    #[inline]
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ordering() {
        let a = Key::from_bytes(&[1, 2]);
        let b = Key::from_bytes(&[1, 2, 0]);
        let c = Key::from_bytes(&[1, 3]);

        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_key_prefix_end_bounds_descendants() {
        let prefix = Key::from_bytes(&[1, 2]);
        let end = prefix.prefix_end();

        // Every extension of the prefix sorts below the bound, the prefix
        // itself included
        assert!(prefix < end);
        assert!(Key::from_bytes(&[1, 2, 0xFE, 0xFE]) < end);
        assert!(Key::from_bytes(&[1, 3]) > end);
    }

    #[test]
    fn test_key_successor() {
        let key = Key::from_bytes(&[7]);
        let succ = key.successor();
        assert!(key < succ);
        assert_eq!(succ.as_bytes(), &[7, 0]);
    }

    #[test]
    fn test_key_debug_hex() {
        let key = Key::from_bytes(&[0x0a, 0xff]);
        assert_eq!(format!("{:?}", key), "Key(0x0aff)");
    }

    #[test]
    fn test_value_roundtrip() {
        let value = Value::from_vec(vec![1, 2, 3]);
        assert_eq!(value.as_bytes(), &[1, 2, 3]);
        assert_eq!(value.len(), 3);
        assert!(Value::empty().is_empty());
    }
}
