//! Node id to (core id, shard host) resolution.

use std::collections::{HashMap, HashSet};

use futures::future::try_join_all;
use tracing::{debug, error, warn};

use crate::domain::{CoreLocation, HashIdNode};
use crate::infra::LookupStore;

use super::RetrievalError;

/// Resolved lookups for one request
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Resolution {
    pub resolved: HashMap<HashIdNode, CoreLocation>,
    /// Distinct locations in first-seen order
    pub unique_locations: Vec<CoreLocation>,
}

impl Resolution {
    pub fn location(&self, id: &HashIdNode) -> Option<&CoreLocation> {
        self.resolved.get(id)
    }

    pub fn unresolved_count(&self, ids: &[HashIdNode]) -> usize {
        ids.iter().filter(|id| !self.resolved.contains_key(id)).count()
    }
}

/// Look up every distinct id concurrently.
///
/// Missing keys and malformed values leave the id unresolved. A store
/// failure aborts the whole resolution.
pub async fn resolve(
    store: &dyn LookupStore,
    key_prefix: &str,
    ids: &[HashIdNode],
) -> Result<Resolution, RetrievalError> {
    let mut seen = HashSet::new();
    let distinct: Vec<HashIdNode> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

    let lookups = distinct.iter().map(|id| async move {
        let key = format!("{key_prefix}:{id}");
        store.get(&key).await.map(|value| (*id, value))
    });

    let values = try_join_all(lookups).await.map_err(|e| {
        error!(error = %e, "Lookup store read failed");
        RetrievalError::Internal("error retrieving proof lookup data".into())
    })?;

    let mut resolution = Resolution::default();
    let mut locations = HashSet::new();
    for (id, value) in values {
        let Some(value) = value else {
            debug!(hash_id_node = %id, "No lookup record");
            continue;
        };
        let Some(location) = CoreLocation::parse_lookup_value(&value) else {
            warn!(hash_id_node = %id, value = %value, "Malformed lookup record");
            continue;
        };
        if locations.insert(location.clone()) {
            resolution.unique_locations.push(location.clone());
        }
        resolution.resolved.insert(id, location);
    }

    Ok(resolution)
}
