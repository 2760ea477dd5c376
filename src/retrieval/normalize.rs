//! Identifier validation for incoming requests.

use crate::domain::HashIdNode;

use super::RetrievalError;

/// Validate a single id taken from the request path.
pub fn normalize_path_id(raw: &str, max_ids: usize) -> Result<Vec<HashIdNode>, RetrievalError> {
    let id = HashIdNode::parse(raw)
        .ok_or_else(|| RetrievalError::InvalidArgument("invalid request, bad hash_id".into()))?;
    check_cardinality(vec![id], max_ids)
}

/// Validate the comma separated ids of a `hashids` header.
///
/// Entries are trimmed. Duplicates are kept, each one yields a result entry.
pub fn normalize_header_ids(
    raw: Option<&str>,
    max_ids: usize,
) -> Result<Vec<HashIdNode>, RetrievalError> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return check_cardinality(Vec::new(), max_ids);
    }

    let ids = raw
        .split(',')
        .map(str::trim)
        .map(|value| {
            HashIdNode::parse(value).ok_or_else(|| {
                RetrievalError::InvalidArgument(format!("invalid request, bad hash_id: {value}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    check_cardinality(ids, max_ids)
}

fn check_cardinality(
    ids: Vec<HashIdNode>,
    max_ids: usize,
) -> Result<Vec<HashIdNode>, RetrievalError> {
    if ids.is_empty() {
        return Err(RetrievalError::InvalidArgument(
            "invalid request, at least one hash id required".into(),
        ));
    }
    if ids.len() > max_ids {
        return Err(RetrievalError::InvalidArgument(format!(
            "invalid request, too many hash ids ({max_ids} max)"
        )));
    }
    Ok(ids)
}
