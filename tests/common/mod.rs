//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::{NoContext, Timestamp, Uuid};

use proof_gateway::codec::{ChainpointBinaryCodec, ProofCodec};
use proof_gateway::domain::{ChainpointProof, HashIdCore, HashIdNode, ShardHost};
use proof_gateway::infra::{
    AggregationStore, GatewayError, InMemoryKeyValueStore, LookupStore, Result, ShardProofItem,
    ShardTransport,
};
use proof_gateway::metrics::MetricsRegistry;
use proof_gateway::retrieval::{ProofRetrieval, RetrievalConfig};
use proof_gateway::server::AppState;

pub const LOOKUP_PREFIX: &str = "HashIDNode";
pub const AGGREGATION_PREFIX: &str = "CoreSubmission";

/// Version 1 node id whose embedded time is `1_500_000_000 + n` seconds.
pub fn node_id(n: u64) -> HashIdNode {
    let ts = Timestamp::from_unix(NoContext, 1_500_000_000 + n, 0);
    HashIdNode::from_uuid(Uuid::new_v1(ts, &[1, 2, 3, 4, 5, 6])).unwrap()
}

/// Skeleton proof as a shard host returns it.
pub fn skeleton(hash_id_core: &str) -> ChainpointProof {
    serde_json::from_value(json!({
        "@context": "https://w3id.org/chainpoint/v3",
        "type": "Chainpoint",
        "hash_id_core": hash_id_core,
        "hash_submitted_core_at": "2017-07-14T02:40:05Z",
        "branches": [{
            "label": "cal_anchor_branch",
            "ops": [
                {"l": "a1"},
                {"op": "sha-256"},
                {"anchors": [{"type": "cal", "anchor_id": "985"}]}
            ]
        }]
    }))
    .unwrap()
}

pub fn encode(proof: &ChainpointProof) -> String {
    ChainpointBinaryCodec::new().encode_base64(proof).unwrap()
}

pub fn decode(encoded: &str) -> ChainpointProof {
    ChainpointBinaryCodec::new().decode_base64(encoded).unwrap()
}

/// Aggregation record JSON with one `[{"l": <hash>}]` partial path per node.
pub fn aggregation_record(hash_id_core: &str, nodes: &[(HashIdNode, &str)]) -> String {
    let proof_data: Vec<Value> = nodes
        .iter()
        .map(|(id, hash)| {
            json!({
                "hash_id": id.to_string(),
                "hash": hash,
                "partial_proof_path": [{"l": hash}, {"op": "sha-256"}]
            })
        })
        .collect();

    json!({"hash_id_core": hash_id_core, "proof_data": proof_data}).to_string()
}

// ============================================================================
// Fakes
// ============================================================================

/// Key-value store that counts reads and can be switched to failing.
#[derive(Default)]
pub struct CountingStore {
    inner: InMemoryKeyValueStore,
    gets: AtomicUsize,
    failing: bool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryKeyValueStore::unbounded(),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    pub async fn seed(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.put(key, value).await;
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(GatewayError::Store("connection refused".into()));
        }
        Ok(self.inner.fetch(key).await)
    }
}

#[async_trait]
impl LookupStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.read(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.seed(key, value).await;
        Ok(())
    }
}

#[async_trait]
impl AggregationStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.read(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.seed(key, value).await;
        Ok(())
    }
}

/// Shard transport serving canned proofs and recording every request.
#[derive(Default)]
pub struct FakeShards {
    /// core id -> base64 proof, `None` for "not yet"
    proofs: Mutex<HashMap<String, Option<String>>>,
    failing_hosts: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
    /// Simulated response time in milliseconds
    latency_ms: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeShards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, hash_id_core: &str, proof: Option<String>) {
        self.proofs
            .lock()
            .unwrap()
            .insert(hash_id_core.to_string(), proof);
    }

    pub fn fail_host(&self, host: &str) {
        self.failing_hosts.lock().unwrap().insert(host.to_string());
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as usize, Ordering::SeqCst);
    }

    /// Most requests that were outstanding at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// `(host, core ids)` per request, in issue order.
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ShardTransport for FakeShards {
    async fn get_proofs(
        &self,
        shard_host: &ShardHost,
        hash_id_cores: &[HashIdCore],
    ) -> Result<Vec<ShardProofItem>> {
        let ids: Vec<String> = hash_id_cores.iter().map(|c| c.to_string()).collect();
        self.calls
            .lock()
            .unwrap()
            .push((shard_host.to_string(), ids.clone()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency as u64)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_hosts.lock().unwrap().contains(shard_host.as_str()) {
            return Err(GatewayError::transport_status(503, "GET /proofs"));
        }

        let proofs = self.proofs.lock().unwrap();
        Ok(ids
            .into_iter()
            .map(|id| ShardProofItem {
                proof: proofs.get(&id).cloned().flatten(),
                hash_id: id,
            })
            .collect())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub lookup: Arc<CountingStore>,
    pub aggregation: Arc<CountingStore>,
    pub shards: Arc<FakeShards>,
    pub metrics: Arc<MetricsRegistry>,
    pub config: RetrievalConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_stores(CountingStore::new(), CountingStore::new())
    }

    pub fn with_stores(lookup: CountingStore, aggregation: CountingStore) -> Self {
        Self {
            lookup: Arc::new(lookup),
            aggregation: Arc::new(aggregation),
            shards: Arc::new(FakeShards::new()),
            metrics: Arc::new(MetricsRegistry::new()),
            config: RetrievalConfig::default(),
        }
    }

    /// Map a node id to `core` on `host`.
    pub async fn locate(&self, id: &HashIdNode, core: &str, host: &str) {
        self.lookup
            .seed(format!("{LOOKUP_PREFIX}:{id}"), format!("{core}:{host}"))
            .await;
    }

    pub async fn aggregate(&self, core: &str, nodes: &[(HashIdNode, &str)]) {
        self.aggregation
            .seed(
                format!("{AGGREGATION_PREFIX}:{core}"),
                aggregation_record(core, nodes),
            )
            .await;
    }

    pub fn retrieval(&self) -> ProofRetrieval {
        ProofRetrieval::new(
            self.lookup.clone(),
            self.aggregation.clone(),
            self.shards.clone(),
            Arc::new(ChainpointBinaryCodec::new()),
            self.config.clone(),
        )
        .with_metrics(self.metrics.clone())
    }

    pub fn state(&self) -> AppState {
        AppState {
            retrieval: Arc::new(self.retrieval()),
            metrics: self.metrics.clone(),
            public_keys: Arc::new(HashMap::new()),
            store_cache: None,
        }
    }

    pub fn router(&self) -> axum::Router {
        proof_gateway::server::app(self.state())
    }
}
