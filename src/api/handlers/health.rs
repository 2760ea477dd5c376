//! Health and metrics handlers

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    /// Valid core public keys loaded at startup
    pub public_keys: usize,
}

/// Liveness check, no downstream calls.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "proof-gateway",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        public_keys: state.public_keys.len(),
    })
}

/// Counters and histograms as JSON, plus in-memory store cache stats when
/// no database is configured.
pub async fn metrics(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mut body = state.metrics.to_json().await;
    if let Some(cache) = &state.store_cache {
        let mut stats = cache.stats().to_json();
        stats["entries"] = cache.len().await.into();
        body["store_cache"] = stats;
    }
    Json(body)
}
