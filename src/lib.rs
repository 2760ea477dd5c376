//! Proof Gateway Library
//!
//! Aggregation gateway in front of sharded proof storage: resolves node
//! proof ids to their core proofs, fetches those from shard hosts in
//! batches, and rebuilds each node's full proof from local aggregation data.
//!
//! ## Modules
//!
//! - [`domain`] - Identifier and proof types
//! - [`codec`] - Binary proof codec and anchor classification
//! - [`infra`] - Stores, shard transport, public key registry
//! - [`retrieval`] - The resolve, batch, fetch and rebuild pipeline
//! - [`crypto`] - Public key hashing
//! - [`metrics`] - Counters and latency histograms
//! - [`api`] - REST routes

pub mod api;
pub mod codec;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod metrics;
pub mod retrieval;
pub mod server;

// Re-export commonly used types
pub use domain::{ChainpointProof, CoreLocation, HashIdCore, HashIdNode, ProofFormat, ShardHost};
pub use infra::{GatewayError, Result};
pub use retrieval::{ProofResult, ProofRetrieval, RetrievalConfig, RetrievalError};
