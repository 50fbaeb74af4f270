//! Individual value generators for different data types.
//!
//! Each function draws from the stream it is handed and never derives
//! streams itself; stream derivation belongs to the row generator.

pub mod collection;
pub mod numeric;
pub mod pattern;
pub mod static_value;
pub mod string;
pub mod temporal;
pub mod uuid;
