//! Groups core ids into per-host request batches.

use crate::domain::{CoreLocation, HashIdCore, ShardHost};

/// Most core ids a shard host accepts in one request
pub const SHARD_BATCH_SIZE: usize = 250;

/// One outbound request to a shard host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardBatch {
    pub shard_host: ShardHost,
    pub hash_id_cores: Vec<HashIdCore>,
}

/// Group `locations` by host (hosts in first-seen order) and split each host's
/// ids into consecutive batches of at most `batch_size`.
pub fn plan_batches(locations: &[CoreLocation], batch_size: usize) -> Vec<ShardBatch> {
    let batch_size = batch_size.max(1);

    let mut by_host: Vec<(&ShardHost, Vec<HashIdCore>)> = Vec::new();
    for location in locations {
        match by_host
            .iter_mut()
            .find(|(host, _)| **host == location.shard_host)
        {
            Some((_, ids)) => ids.push(location.hash_id_core.clone()),
            None => by_host.push((&location.shard_host, vec![location.hash_id_core.clone()])),
        }
    }

    by_host
        .into_iter()
        .flat_map(|(host, ids)| {
            ids.chunks(batch_size)
                .map(|chunk| ShardBatch {
                    shard_host: host.clone(),
                    hash_id_cores: chunk.to_vec(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}
