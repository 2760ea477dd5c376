//! Proof retrieval pipeline
//!
//! Resolves node ids to core locations, batches the distinct core ids per
//! shard host, fetches skeleton proofs concurrently, then rebuilds one full
//! proof per requested id from the node's aggregation data.
//!
//! Failures that affect the whole set of batches (lookup store, any shard
//! batch) abort the request. Gaps scoped to a single id (no lookup record,
//! no core proof yet, missing aggregation data) only null that id's entry.

mod fanout;
mod metadata;
mod normalize;
mod planner;
mod reconstruct;
mod resolver;

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::codec::{AnchorType, ProofCodec};
use crate::domain::{ChainpointProof, HashIdNode, ProofFormat};
use crate::infra::{AggregationStore, LookupStore, ShardTransport};
use crate::metrics::{metric_names, MetricsRegistry};

pub use fanout::{fetch_skeletons, SkeletonOutcome, Skeletons, MAX_CONCURRENT_BATCHES};
pub use metadata::{fetch_metadata, MetadataFetch};
pub use normalize::{normalize_header_ids, normalize_path_id};
pub use planner::{plan_batches, ShardBatch, SHARD_BATCH_SIZE};
pub use reconstruct::build_full_proof;
pub use resolver::{resolve, Resolution};

/// Request-level retrieval failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    /// Bad or missing ids, rejected before any I/O
    #[error("{0}")]
    InvalidArgument(String),

    /// Store or shard failure; the message never names hosts or keys
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Most ids accepted per request
    pub max_ids: usize,
    pub batch_size: usize,
    pub max_concurrent_batches: usize,
    pub lookup_key_prefix: String,
    pub aggregation_key_prefix: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_ids: 250,
            batch_size: SHARD_BATCH_SIZE,
            max_concurrent_batches: MAX_CONCURRENT_BATCHES,
            lookup_key_prefix: "HashIDNode".to_string(),
            aggregation_key_prefix: "CoreSubmission".to_string(),
        }
    }
}

/// A proof in the negotiated representation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProofPayload {
    Object(Box<ChainpointProof>),
    /// Base64 binary form; empty when the core proof could not be decoded
    Encoded(String),
}

/// One response entry per requested id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProofResult {
    pub hash_id_node: HashIdNode,
    pub proof: Option<ProofPayload>,
    pub anchors_complete: Vec<AnchorType>,
}

impl ProofResult {
    fn empty(hash_id_node: HashIdNode) -> Self {
        Self {
            hash_id_node,
            proof: None,
            anchors_complete: Vec::new(),
        }
    }
}

/// The retrieval pipeline and its collaborators
#[derive(Clone)]
pub struct ProofRetrieval {
    lookup: Arc<dyn LookupStore>,
    aggregation: Arc<dyn AggregationStore>,
    transport: Arc<dyn ShardTransport>,
    codec: Arc<dyn ProofCodec>,
    config: RetrievalConfig,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl ProofRetrieval {
    pub fn new(
        lookup: Arc<dyn LookupStore>,
        aggregation: Arc<dyn AggregationStore>,
        transport: Arc<dyn ShardTransport>,
        codec: Arc<dyn ProofCodec>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            lookup,
            aggregation,
            transport,
            codec,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Retrieve one result per id, in request order.
    #[instrument(skip_all, fields(ids = ids.len(), format = ?format))]
    pub async fn retrieve(
        &self,
        ids: &[HashIdNode],
        format: ProofFormat,
    ) -> Result<Vec<ProofResult>, RetrievalError> {
        let started = Instant::now();
        let metrics = self.metrics.as_deref();
        if let Some(metrics) = metrics {
            metrics.inc_counter(metric_names::PROOFS_REQUESTS).await;
            metrics
                .add_counter(metric_names::PROOFS_REQUESTED_IDS, ids.len() as u64)
                .await;
        }

        let resolution = resolve(
            self.lookup.as_ref(),
            &self.config.lookup_key_prefix,
            ids,
        )
        .await?;

        let batches = plan_batches(&resolution.unique_locations, self.config.batch_size);
        debug!(
            locations = resolution.unique_locations.len(),
            batches = batches.len(),
            "Planned shard batches"
        );

        let skeletons = fetch_skeletons(
            self.transport.as_ref(),
            self.codec.as_ref(),
            &batches,
            self.config.max_concurrent_batches,
            metrics,
        )
        .await?;

        let decoded_cores = resolution
            .unique_locations
            .iter()
            .filter(|location| {
                skeletons
                    .get(*location)
                    .is_some_and(|outcome| outcome.skeleton().is_some())
            })
            .map(|location| &location.hash_id_core);
        let metadata = fetch_metadata(
            self.aggregation.as_ref(),
            &self.config.aggregation_key_prefix,
            decoded_cores,
        )
        .await;

        let results: Vec<ProofResult> = ids
            .iter()
            .map(|id| self.rehydrate(*id, &resolution, &skeletons, &metadata, format))
            .collect();

        if let Some(metrics) = metrics {
            let unresolved = resolution.unresolved_count(ids) as u64;
            metrics
                .add_counter(metric_names::PROOFS_UNRESOLVED, unresolved)
                .await;
            metrics
                .add_counter(
                    metric_names::METADATA_FETCH_FAILURES,
                    metadata.failures as u64,
                )
                .await;
            metrics
                .observe_ms(
                    metric_names::PROOFS_REQUEST_DURATION,
                    started.elapsed().as_secs_f64() * 1000.0,
                )
                .await;
        }

        Ok(results)
    }

    fn rehydrate(
        &self,
        id: HashIdNode,
        resolution: &Resolution,
        skeletons: &Skeletons,
        metadata: &MetadataFetch,
        format: ProofFormat,
    ) -> ProofResult {
        let Some(location) = resolution.location(&id) else {
            return ProofResult::empty(id);
        };

        let outcome = match skeletons.get(location) {
            None | Some(SkeletonOutcome::Absent) => return ProofResult::empty(id),
            Some(SkeletonOutcome::Malformed) => {
                return ProofResult {
                    proof: Some(ProofPayload::Encoded(String::new())),
                    ..ProofResult::empty(id)
                }
            }
            Some(outcome) => outcome,
        };
        let Some(skeleton) = outcome.skeleton() else {
            return ProofResult::empty(id);
        };
        let anchors_complete = outcome.anchors_complete().to_vec();

        let full = metadata
            .records
            .get(&location.hash_id_core)
            .and_then(|record| build_full_proof(&id, &location.hash_id_core, skeleton, record));

        ProofResult {
            hash_id_node: id,
            proof: full.and_then(|proof| self.format_proof(&id, proof, format)),
            anchors_complete,
        }
    }

    fn format_proof(
        &self,
        id: &HashIdNode,
        proof: ChainpointProof,
        format: ProofFormat,
    ) -> Option<ProofPayload> {
        match format {
            ProofFormat::JsonLd => Some(ProofPayload::Object(Box::new(proof))),
            ProofFormat::Base64 => match self.codec.encode_base64(&proof) {
                Ok(encoded) => Some(ProofPayload::Encoded(encoded)),
                Err(e) => {
                    warn!(hash_id_node = %id, error = %e, "Failed to encode proof");
                    None
                }
            },
        }
    }
}
