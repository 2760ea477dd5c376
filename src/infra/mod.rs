//! Infrastructure layer for the proof gateway
//!
//! Contains trait definitions and implementations for:
//! - Lookup and aggregation stores (in-memory LRU, PostgreSQL)
//! - Shard host transport (HTTP)
//! - Public key registry

mod cache;
mod error;
pub mod postgres;
mod public_keys;
mod traits;
mod transport;

pub use cache::{CacheStats, InMemoryKeyValueStore, LruCache};
pub use error::*;
pub use postgres::{PgKeyValueStore, PgPublicKeyStore};
pub use public_keys::{
    InMemoryPublicKeyStore, PublicKeyRecord, PublicKeyRegistry, PublicKeyStore,
};
pub use traits::*;
pub use transport::{HttpShardTransport, ShardTransportConfig, HASHIDS_HEADER};
