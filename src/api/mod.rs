//! HTTP API for the proof gateway

pub mod error;
pub mod handlers;
pub mod negotiate;
mod rest;

pub use error::{ApiError, ErrorCode};
pub use negotiate::negotiate;
pub use rest::*;
