//! HTTP server bootstrap for the proof gateway.
//!
//! This module wires together:
//! - configuration
//! - lookup, aggregation and public key stores (PostgreSQL or in-memory)
//! - the shard transport and retrieval pipeline
//! - the Axum router

use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use axum::Router;
use ed25519_dalek::VerifyingKey;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use crate::codec::ChainpointBinaryCodec;
use crate::infra::{
    AggregationStore, GatewayError, HttpShardTransport, InMemoryKeyValueStore,
    InMemoryPublicKeyStore, LookupStore, PgKeyValueStore, PgPublicKeyStore, PublicKeyRegistry,
    PublicKeyStore, ShardTransportConfig, HASHIDS_HEADER,
};
use crate::metrics::MetricsRegistry;
use crate::retrieval::{ProofRetrieval, RetrievalConfig};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub retrieval: RetrievalConfig,
    pub transport: ShardTransportConfig,
    /// PostgreSQL connection URL; in-memory stores when unset.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub store_cache_ttl: Duration,
    pub store_cache_max_entries: usize,
    /// Configured core public keys, `pub_key_hash -> base64 key`.
    pub public_keys: HashMap<String, String>,
    pub cors_allow_origins: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from any variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, GatewayError> {
        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_var(&var, "PORT", 8080)?;
        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| GatewayError::Configuration(format!("invalid listen address: {e}")))?;

        let max_ids: usize = parse_var(&var, "GET_PROOFS_MAX_REST", 250)?;
        if max_ids == 0 {
            return Err(GatewayError::Configuration(
                "GET_PROOFS_MAX_REST must be greater than 0".into(),
            ));
        }

        let timeout_ms: u64 = parse_var(&var, "SHARD_REQUEST_TIMEOUT_MS", 10_000)?;
        if timeout_ms == 0 {
            return Err(GatewayError::Configuration(
                "SHARD_REQUEST_TIMEOUT_MS must be greater than 0".into(),
            ));
        }

        let scheme = var("SHARD_HOST_SCHEME").unwrap_or_else(|| "http".to_string());
        if !matches!(scheme.as_str(), "http" | "https") {
            return Err(GatewayError::Configuration(format!(
                "SHARD_HOST_SCHEME must be http or https, got {scheme:?}"
            )));
        }

        let defaults = RetrievalConfig::default();
        let retrieval = RetrievalConfig {
            max_ids,
            lookup_key_prefix: var("HASH_NODE_LOOKUP_KEY_PREFIX")
                .unwrap_or(defaults.lookup_key_prefix),
            aggregation_key_prefix: var("CORE_SUBMISSION_KEY_PREFIX")
                .unwrap_or(defaults.aggregation_key_prefix),
            ..defaults
        };

        let public_keys = match var("PUBLIC_KEYS").filter(|v| !v.trim().is_empty()) {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                GatewayError::Configuration(format!("PUBLIC_KEYS must be a JSON object: {e}"))
            })?,
            None => HashMap::new(),
        };

        Ok(Self {
            listen_addr,
            retrieval,
            transport: ShardTransportConfig {
                scheme,
                timeout: Duration::from_millis(timeout_ms),
            },
            database_url: var("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            max_connections: parse_var(&var, "MAX_DB_CONNECTIONS", 10)?,
            store_cache_ttl: Duration::from_secs(parse_var(&var, "STORE_CACHE_TTL_SECS", 3600)?),
            store_cache_max_entries: parse_var(&var, "STORE_CACHE_MAX_ENTRIES", 100_000)?,
            public_keys,
            cors_allow_origins: var("CORS_ALLOW_ORIGINS"),
        })
    }
}

fn parse_var<T>(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, GatewayError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| GatewayError::Configuration(format!("invalid {name} {raw:?}: {e}"))),
        None => Ok(default),
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub retrieval: Arc<ProofRetrieval>,
    pub metrics: Arc<MetricsRegistry>,
    pub public_keys: Arc<HashMap<String, VerifyingKey>>,
    /// The in-memory lookup/aggregation store, when one is in use
    pub store_cache: Option<Arc<InMemoryKeyValueStore>>,
}

struct Stores {
    lookup: Arc<dyn LookupStore>,
    aggregation: Arc<dyn AggregationStore>,
    public_keys: Arc<dyn PublicKeyStore>,
    cache: Option<Arc<InMemoryKeyValueStore>>,
}

/// Start the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting proof gateway v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("  Listen address: {}", config.listen_addr);
    info!("  Max ids per request: {}", config.retrieval.max_ids);
    info!("  Shard request timeout: {:?}", config.transport.timeout);

    let stores = connect_stores(&config).await?;

    let registry = PublicKeyRegistry::new(stores.public_keys);
    let public_keys = registry.bootstrap(&config.public_keys).await?;

    let metrics = Arc::new(MetricsRegistry::new());
    let transport = Arc::new(HttpShardTransport::new(config.transport.clone())?);
    let retrieval = ProofRetrieval::new(
        stores.lookup,
        stores.aggregation,
        transport,
        Arc::new(ChainpointBinaryCodec::new()),
        config.retrieval.clone(),
    )
    .with_metrics(metrics.clone());

    let state = AppState {
        retrieval: Arc::new(retrieval),
        metrics,
        public_keys: Arc::new(public_keys),
        store_cache: stores.cache,
    };

    let mut app = app(state);
    if let Some(cors_layer) = cors_layer(config.cors_allow_origins.as_deref())? {
        app = app.layer(cors_layer);
    }

    info!("Starting HTTP server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    info!("Proof gateway is ready to accept connections");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Proof gateway stopped");
    Ok(())
}

async fn connect_stores(config: &Config) -> anyhow::Result<Stores> {
    let Some(database_url) = &config.database_url else {
        info!(
            max_entries = config.store_cache_max_entries,
            ttl_secs = config.store_cache_ttl.as_secs(),
            "DATABASE_URL not set, using in-memory stores"
        );
        let kv = Arc::new(InMemoryKeyValueStore::new(
            config.store_cache_max_entries,
            Some(config.store_cache_ttl),
        ));
        spawn_expiry_sweep(kv.clone(), config.store_cache_ttl);

        return Ok(Stores {
            lookup: kv.clone(),
            aggregation: kv.clone(),
            public_keys: Arc::new(InMemoryPublicKeyStore::new()),
            cache: Some(kv),
        });
    };

    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(database_url)
        .await?;
    info!("Connected to PostgreSQL");

    let kv = Arc::new(PgKeyValueStore::new(pool.clone()));
    kv.initialize().await?;
    let public_keys = PgPublicKeyStore::new(pool);
    public_keys.initialize().await?;

    Ok(Stores {
        lookup: kv.clone(),
        aggregation: kv,
        public_keys: Arc::new(public_keys),
        cache: None,
    })
}

fn spawn_expiry_sweep(store: Arc<InMemoryKeyValueStore>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            store.cleanup_expired().await;
        }
    });
}

/// Full router with state applied.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(crate::api::router())
        .merge(crate::api::ops_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

fn cors_layer(origins: Option<&str>) -> anyhow::Result<Option<CorsLayer>> {
    let Some(origins) = origins.map(str::trim).filter(|o| !o.is_empty()) else {
        return Ok(None);
    };

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {s:?}: {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET])
            .allow_headers([
                axum::http::header::ACCEPT,
                axum::http::header::CONTENT_TYPE,
                HeaderName::from_static(HASHIDS_HEADER),
            ]),
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
