//! REST API handlers.

pub mod health;
pub mod proofs;

pub use health::*;
pub use proofs::*;
