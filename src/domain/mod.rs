//! Domain models for the proof gateway
//!
//! Identifiers, proof objects and node aggregation records.

mod proof;
mod types;

pub use proof::*;
pub use types::*;
