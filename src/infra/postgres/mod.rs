//! PostgreSQL implementations of the gateway stores

mod kv_store;
mod public_keys;

pub use kv_store::*;
pub use public_keys::*;
