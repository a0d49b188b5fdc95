//! # grove-codec
//!
//! Order-preserving scalar and tuple codec for GroveDB.
//!
//! This crate defines the runtime [`Value`] union, the fixed-point
//! [`Decimal`], the immutable [`Tuple`], and the binary codec that turns
//! them into byte runs whose unsigned lexicographic order equals their
//! semantic order. The codec is the foundation of the hierarchical
//! keyspace: every physical storage key is an encoded tuple.
//!
//! ## Example
//!
//! ```rust
//! use grove_codec::{encoding, Tuple, Value};
//!
//! let a = Tuple::new(vec![Value::bigint(-5), Value::string("ab")]);
//! let b = Tuple::new(vec![Value::bigint(-5), Value::string("abc")]);
//!
//! let ea = encoding::encode_tuple(&a).unwrap();
//! let eb = encoding::encode_tuple(&b).unwrap();
//! assert!(ea < eb);
//! assert_eq!(encoding::decode_tuple(&ea).unwrap(), a);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod decimal;
pub mod encoding;
pub mod tuple;
pub mod value;

pub use decimal::Decimal;
pub use tuple::Tuple;
pub use value::{Value, ValueKind};
