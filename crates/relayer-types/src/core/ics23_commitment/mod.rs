//! ICS 23: Vector commitment scheme specification.

pub mod commitment;
pub mod error;
pub mod proof;
