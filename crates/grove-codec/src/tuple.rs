//! Ordered, immutable sequences of values.
//!
//! A [`Tuple`] is the logical form of every key and row payload. Tuples
//! compare element-wise left to right; a tuple that is a proper prefix of
//! another sorts before it. The codec guarantees the same relation on the
//! encoded bytes.

use std::fmt;

use crate::value::Value;

/// An ordered, immutable sequence of values.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tuple {
    values: Vec<Value>,
}

impl Tuple {
    /// Creates a tuple from the given values.
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Creates an empty tuple.
    #[must_use]
    pub const fn empty() -> Self {
        Self { values: Vec::new() }
    }

    /// Creates a tuple of `len` NULLs.
    #[must_use]
    pub fn nulls(len: usize) -> Self {
        Self {
            values: vec![Value::Null; len],
        }
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the tuple has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the element at the given position.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the elements as a slice.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns an iterator over the elements.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Consumes the tuple and returns its elements.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Returns a new tuple holding the elements at the given positions;
    /// out-of-range positions yield NULL.
    #[must_use]
    pub fn project(&self, positions: &[usize]) -> Tuple {
        let values = positions
            .iter()
            .map(|&i| self.values.get(i).cloned().unwrap_or(Value::Null))
            .collect();
        Tuple { values }
    }

    /// Returns true if `prefix` equals the leading elements of this tuple.
    #[must_use]
    pub fn starts_with(&self, prefix: &Tuple) -> bool {
        prefix.len() <= self.len() && self.values[..prefix.len()] == prefix.values[..]
    }
}

impl From<Vec<Value>> for Tuple {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl IntoIterator for Tuple {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}
