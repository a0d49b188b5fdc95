//! Core types shared across GroveDB components.

mod ids;
mod keys;

pub use ids::TableOrdinal;
pub use keys::{Key, Value};
