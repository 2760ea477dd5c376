//! HTTP transport to shard (Core) hosts

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tracing::debug;

use crate::domain::{HashIdCore, ShardHost};

use super::{GatewayError, Result, ShardProofItem, ShardTransport};

/// Request header carrying the comma separated core ids
pub const HASHIDS_HEADER: &str = "hashids";

#[derive(Debug, Clone)]
pub struct ShardTransportConfig {
    /// Scheme used when a shard host is a bare `host[:port]`
    pub scheme: String,
    pub timeout: Duration,
}

impl Default for ShardTransportConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            timeout: Duration::from_millis(10_000),
        }
    }
}

/// `GET {base}/proofs` against shard hosts over HTTP
#[derive(Clone)]
pub struct HttpShardTransport {
    client: reqwest::Client,
    config: ShardTransportConfig,
}

impl HttpShardTransport {
    pub fn new(config: ShardTransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .gzip(true)
            .build()
            .map_err(|e| GatewayError::Configuration(format!("http client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Base URL for a shard host. Hosts that already carry a scheme are used as-is.
    pub fn base_url(&self, host: &ShardHost) -> String {
        let host = host.as_str().trim_end_matches('/');
        if host.contains("://") {
            host.to_string()
        } else {
            format!("{}://{}", self.config.scheme, host)
        }
    }

    fn proofs_url(&self, host: &ShardHost) -> String {
        format!("{}/proofs", self.base_url(host))
    }
}

#[async_trait]
impl ShardTransport for HttpShardTransport {
    async fn get_proofs(
        &self,
        shard_host: &ShardHost,
        hash_id_cores: &[HashIdCore],
    ) -> Result<Vec<ShardProofItem>> {
        let url = self.proofs_url(shard_host);
        let ids = hash_id_cores
            .iter()
            .map(HashIdCore::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let ids = HeaderValue::from_str(&ids)
            .map_err(|e| GatewayError::Internal(format!("invalid hashids header: {e}")))?;

        debug!(url = %url, count = hash_id_cores.len(), "Requesting core proofs");

        let response = self
            .client
            .get(&url)
            .header(HASHIDS_HEADER, ids)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| GatewayError::transport_no_response(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::transport_status(
                status.as_u16(),
                format!("GET {url}"),
            ));
        }

        response
            .json::<Vec<ShardProofItem>>()
            .await
            .map_err(|e| {
                GatewayError::transport_status(status.as_u16(), format!("GET {url}: bad body: {e}"))
            })
    }
}
