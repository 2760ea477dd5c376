//! Concurrent skeleton proof fetches across shard hosts.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::codec::{parse_anchors_complete, AnchorType, ProofCodec};
use crate::domain::{ChainpointProof, CoreLocation, HashIdCore};
use crate::infra::{ShardProofItem, ShardTransport};
use crate::metrics::{metric_names, MetricsRegistry};

use super::planner::ShardBatch;
use super::RetrievalError;

/// Most shard requests in flight per retrieval, across all hosts
pub const MAX_CONCURRENT_BATCHES: usize = 20;

/// What a shard host returned for one core id
#[derive(Debug, Clone, PartialEq)]
pub enum SkeletonOutcome {
    /// No core proof exists yet
    Absent,
    /// A proof was returned but could not be decoded
    Malformed,
    Decoded {
        proof: Arc<ChainpointProof>,
        anchors_complete: Vec<AnchorType>,
    },
}

impl SkeletonOutcome {
    pub fn anchors_complete(&self) -> &[AnchorType] {
        match self {
            SkeletonOutcome::Decoded {
                anchors_complete, ..
            } => anchors_complete,
            _ => &[],
        }
    }

    pub fn skeleton(&self) -> Option<&Arc<ChainpointProof>> {
        match self {
            SkeletonOutcome::Decoded { proof, .. } => Some(proof),
            _ => None,
        }
    }
}

pub type Skeletons = HashMap<CoreLocation, SkeletonOutcome>;

/// Run every batch with at most `max_in_flight` outstanding requests.
///
/// The first failing batch fails the whole set; batches still queued or in
/// flight are dropped.
pub async fn fetch_skeletons(
    transport: &dyn ShardTransport,
    codec: &dyn ProofCodec,
    batches: &[ShardBatch],
    max_in_flight: usize,
    metrics: Option<&MetricsRegistry>,
) -> Result<Skeletons, RetrievalError> {
    let permits = Semaphore::new(max_in_flight.max(1));

    let requests = batches.iter().map(|batch| {
        let permits = &permits;
        async move {
            let _permit = permits
                .acquire()
                .await
                .map_err(|e| RetrievalError::Internal(format!("batch limiter closed: {e}")))?;

            if let Some(metrics) = metrics {
                metrics.inc_counter(metric_names::SHARD_BATCHES).await;
            }
            debug!(
                shard_host = %batch.shard_host,
                count = batch.hash_id_cores.len(),
                "Fetching core proof batch"
            );

            match transport
                .get_proofs(&batch.shard_host, &batch.hash_id_cores)
                .await
            {
                Ok(items) => Ok((batch, items)),
                Err(e) => {
                    error!(
                        shard_host = %batch.shard_host,
                        error = %e,
                        "Core proof batch failed"
                    );
                    if let Some(metrics) = metrics {
                        metrics.inc_counter(metric_names::SHARD_BATCH_FAILURES).await;
                    }
                    Err(RetrievalError::Internal(
                        "error retrieving proofs from Core".into(),
                    ))
                }
            }
        }
    });

    let responses = try_join_all(requests).await?;

    let mut skeletons = Skeletons::new();
    for (batch, items) in responses {
        for item in items {
            let location = CoreLocation::new(
                HashIdCore::new(item.hash_id.clone()),
                batch.shard_host.clone(),
            );
            skeletons.insert(location, decode_item(codec, &item));
        }
    }
    Ok(skeletons)
}

fn decode_item(codec: &dyn ProofCodec, item: &ShardProofItem) -> SkeletonOutcome {
    let Some(encoded) = item.proof.as_deref() else {
        return SkeletonOutcome::Absent;
    };

    match codec.decode_base64(encoded) {
        Ok(proof) => {
            let anchors_complete = parse_anchors_complete(&proof);
            SkeletonOutcome::Decoded {
                proof: Arc::new(proof),
                anchors_complete,
            }
        }
        Err(e) => {
            warn!(hash_id_core = %item.hash_id, error = %e, "Undecodable core proof");
            SkeletonOutcome::Malformed
        }
    }
}
