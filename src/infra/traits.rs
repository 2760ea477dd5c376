//! Collaborator traits for the retrieval pipeline
//!
//! Each store or transport the gateway talks to is a capability trait so
//! in-memory, database and HTTP backings can be swapped behind one contract.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::domain::{HashIdCore, ShardHost};

use super::Result;

/// Node id -> (core id, shard host) lookup table.
///
/// Values have the form `<hash_id_core>:<shard_host>`. A missing key is
/// `Ok(None)`; `Err` means the store itself could not be reached.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LookupStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Node aggregation data, one JSON record per core id.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AggregationStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// One entry of a shard host's `GET /proofs` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardProofItem {
    pub hash_id: String,

    /// Base64 binary proof, `None` while the core proof does not exist yet.
    #[serde(default)]
    pub proof: Option<String>,
}

/// Batched proof request to a shard host.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ShardTransport: Send + Sync {
    /// Fetch the core proofs for `hash_id_cores` from `shard_host`.
    ///
    /// Fails with [`GatewayError::Transport`](super::GatewayError::Transport)
    /// on a non-success status or when the host cannot be reached.
    async fn get_proofs(
        &self,
        shard_host: &ShardHost,
        hash_id_cores: &[HashIdCore],
    ) -> Result<Vec<ShardProofItem>>;
}
