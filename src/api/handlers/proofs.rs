//! Proof retrieval handlers.

use axum::extract::{Path, State};
use axum::http::header::ACCEPT;
use axum::http::HeaderMap;
use axum::Json;
use tracing::{debug, instrument};

use crate::api::error::{ApiError, ErrorCode};
use crate::api::negotiate::negotiate;
use crate::domain::HashIdNode;
use crate::infra::HASHIDS_HEADER;
use crate::retrieval::{normalize_header_ids, normalize_path_id, ProofResult};
use crate::server::AppState;

/// GET /proofs/:hash_id_node - Full proof for a single node id.
#[instrument(skip(state, headers), fields(hash_id_node = %hash_id_node))]
pub async fn get_proof_by_id(
    State(state): State<AppState>,
    Path(hash_id_node): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<ProofResult>>, ApiError> {
    let ids = normalize_path_id(&hash_id_node, state.retrieval.config().max_ids)?;
    respond(&state, &ids, &headers).await
}

/// GET /proofs - Full proofs for the node ids in the `hashids` header.
#[instrument(skip(state, headers))]
pub async fn get_proofs_by_ids(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ProofResult>>, ApiError> {
    let raw = headers
        .get(HASHIDS_HEADER)
        .map(|value| value.to_str())
        .transpose()
        .map_err(|_| ApiError::new(ErrorCode::InvalidArgument, "invalid request, bad hash_id"))?;

    let ids = normalize_header_ids(raw, state.retrieval.config().max_ids)?;
    respond(&state, &ids, &headers).await
}

async fn respond(
    state: &AppState,
    ids: &[HashIdNode],
    headers: &HeaderMap,
) -> Result<Json<Vec<ProofResult>>, ApiError> {
    let accept = headers.get(ACCEPT).and_then(|value| value.to_str().ok());
    let format = negotiate(accept);
    debug!(count = ids.len(), format = ?format, "Retrieving proofs");

    let results = state.retrieval.retrieve(ids, format).await?;
    Ok(Json(results))
}
