//! REST routes for the proof gateway.

use axum::routing::get;
use axum::Router;

use crate::api::handlers::{get_proof_by_id, get_proofs_by_ids, health_check, metrics};
use crate::server::AppState;

/// Proof retrieval routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/proofs", get(get_proofs_by_ids))
        .route("/proofs/:hash_id_node", get(get_proof_by_id))
}

/// Health and metrics routes.
pub fn ops_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
}
