//! Local registry of core public keys
//!
//! Keys are persisted as `(pub_key_hash, base64 pub_key)` pairs. On startup the
//! configured keys are stored when none exist yet, then every stored key is
//! validated against its hash and loaded.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use ed25519_dalek::VerifyingKey;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::crypto::verifying_key_for;

use super::{GatewayError, Result};

/// A stored public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyRecord {
    pub pub_key_hash: String,
    /// Base64 encoded raw key
    pub pub_key: String,
}

impl PublicKeyRecord {
    pub fn new(pub_key_hash: impl Into<String>, pub_key: impl Into<String>) -> Self {
        Self {
            pub_key_hash: pub_key_hash.into(),
            pub_key: pub_key.into(),
        }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait PublicKeyStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<PublicKeyRecord>>;

    /// Insert all records, failing if any hash is already present.
    async fn bulk_create(&self, records: Vec<PublicKeyRecord>) -> Result<()>;
}

/// Process-local public key store
#[derive(Default)]
pub struct InMemoryPublicKeyStore {
    records: RwLock<Vec<PublicKeyRecord>>,
}

impl InMemoryPublicKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PublicKeyStore for InMemoryPublicKeyStore {
    async fn list_all(&self) -> Result<Vec<PublicKeyRecord>> {
        Ok(self.records.read().await.clone())
    }

    async fn bulk_create(&self, records: Vec<PublicKeyRecord>) -> Result<()> {
        let mut stored = self.records.write().await;
        let mut seen: HashSet<&str> = stored.iter().map(|r| r.pub_key_hash.as_str()).collect();
        for record in &records {
            if !seen.insert(record.pub_key_hash.as_str()) {
                return Err(GatewayError::Store(format!(
                    "duplicate public key hash: {}",
                    record.pub_key_hash
                )));
            }
        }
        stored.extend(records);
        Ok(())
    }
}

/// Public key lookups on top of a [`PublicKeyStore`]
#[derive(Clone)]
pub struct PublicKeyRegistry {
    store: Arc<dyn PublicKeyStore>,
}

impl PublicKeyRegistry {
    pub fn new(store: Arc<dyn PublicKeyStore>) -> Self {
        Self { store }
    }

    /// All valid stored keys by hash, or `None` when nothing is stored.
    ///
    /// Entries whose key does not decode or does not match its hash are
    /// logged and left out.
    pub async fn local_public_keys(&self) -> Result<Option<HashMap<String, VerifyingKey>>> {
        let records = self.store.list_all().await?;
        if records.is_empty() {
            return Ok(None);
        }

        let mut keys = HashMap::with_capacity(records.len());
        for record in records {
            match verifying_key_for(&record.pub_key_hash, &record.pub_key) {
                Ok(key) => {
                    keys.insert(record.pub_key_hash, key);
                }
                Err(e) => {
                    error!(
                        pub_key_hash = %record.pub_key_hash,
                        error = %e,
                        "Invalid public key entry"
                    );
                }
            }
        }
        Ok(Some(keys))
    }

    /// Persist configured keys (`hash -> base64 key`).
    pub async fn store_config_keys(&self, keys: &HashMap<String, String>) -> Result<()> {
        let mut records: Vec<PublicKeyRecord> = keys
            .iter()
            .map(|(hash, key)| PublicKeyRecord::new(hash.clone(), key.clone()))
            .collect();
        records.sort_by(|a, b| a.pub_key_hash.cmp(&b.pub_key_hash));

        let count = records.len();
        self.store.bulk_create(records).await?;
        info!(count, "Stored configured public keys");
        Ok(())
    }

    /// Store configured keys if none exist yet, then load what is stored.
    pub async fn bootstrap(
        &self,
        configured: &HashMap<String, String>,
    ) -> Result<HashMap<String, VerifyingKey>> {
        if self.local_public_keys().await?.is_none() && !configured.is_empty() {
            self.store_config_keys(configured).await?;
        }

        let keys = self.local_public_keys().await?.unwrap_or_default();
        info!(count = keys.len(), "Loaded public keys");
        Ok(keys)
    }
}
