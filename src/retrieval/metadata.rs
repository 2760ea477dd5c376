//! Aggregation record fetches. Failures only degrade the affected ids.

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use tracing::warn;

use crate::domain::{AggregationRecord, HashIdCore};
use crate::infra::AggregationStore;

/// Records fetched for one request, plus how many could not be fetched
#[derive(Debug, Default)]
pub struct MetadataFetch {
    pub records: HashMap<HashIdCore, AggregationRecord>,
    pub failures: usize,
}

pub async fn fetch_metadata<'a>(
    store: &dyn AggregationStore,
    key_prefix: &str,
    hash_id_cores: impl IntoIterator<Item = &'a HashIdCore>,
) -> MetadataFetch {
    let mut seen = HashSet::new();
    let distinct: Vec<&HashIdCore> = hash_id_cores
        .into_iter()
        .filter(|core| seen.insert(*core))
        .collect();

    let reads = distinct.into_iter().map(|core| async move {
        let key = format!("{key_prefix}:{core}");
        (core, store.get(&key).await)
    });

    let mut fetch = MetadataFetch::default();
    for (core, result) in join_all(reads).await {
        let raw = match result {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                warn!(hash_id_core = %core, "No aggregation record");
                fetch.failures += 1;
                continue;
            }
            Err(e) => {
                warn!(hash_id_core = %core, error = %e, "Aggregation record read failed");
                fetch.failures += 1;
                continue;
            }
        };

        match serde_json::from_str::<AggregationRecord>(&raw) {
            Ok(record) => {
                fetch.records.insert(core.clone(), record);
            }
            Err(e) => {
                warn!(hash_id_core = %core, error = %e, "Unparsable aggregation record");
                fetch.failures += 1;
            }
        }
    }
    fetch
}
