//! Postgres-backed integration tests.
//!
//! These are ignored by default and are intended to run in CI (or locally)
//! with `DATABASE_URL` set.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use ed25519_dalek::SigningKey;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use proof_gateway::codec::ChainpointBinaryCodec;
use proof_gateway::crypto::pub_key_hash;
use proof_gateway::domain::ProofFormat;
use proof_gateway::infra::{
    AggregationStore, LookupStore, PgKeyValueStore, PgPublicKeyStore, PublicKeyRegistry,
};
use proof_gateway::retrieval::{ProofPayload, ProofRetrieval, RetrievalConfig};

use common::*;

async fn connect_db() -> Option<sqlx::PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .ok()?;
    Some(pool)
}

/// Key prefix unique to one test run so reruns never collide.
fn run_prefix(name: &str) -> String {
    format!("{name}-{}", Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_kv_store_upsert_and_read() {
    let Some(pool) = connect_db().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let store = PgKeyValueStore::new(pool);
    store.initialize().await.unwrap();

    let key = run_prefix("kv");
    assert_eq!(LookupStore::get(&store, &key).await.unwrap(), None);

    LookupStore::set(&store, &key, "b1:h1").await.unwrap();
    assert_eq!(
        LookupStore::get(&store, &key).await.unwrap().as_deref(),
        Some("b1:h1")
    );

    AggregationStore::set(&store, &key, "b2:h2").await.unwrap();
    assert_eq!(
        AggregationStore::get(&store, &key).await.unwrap().as_deref(),
        Some("b2:h2")
    );
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_retrieval_over_postgres_stores() {
    let Some(pool) = connect_db().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let store = Arc::new(PgKeyValueStore::new(pool));
    store.initialize().await.unwrap();

    let config = RetrievalConfig {
        lookup_key_prefix: run_prefix("HashIDNode"),
        aggregation_key_prefix: run_prefix("CoreSubmission"),
        ..RetrievalConfig::default()
    };

    let e1 = node_id(42);
    LookupStore::set(
        store.as_ref(),
        &format!("{}:{e1}", config.lookup_key_prefix),
        "b1:h1",
    )
    .await
    .unwrap();
    AggregationStore::set(
        store.as_ref(),
        &format!("{}:b1", config.aggregation_key_prefix),
        &aggregation_record("b1", &[(e1, "42")]),
    )
    .await
    .unwrap();

    let shards = Arc::new(FakeShards::new());
    shards.serve("b1", Some(encode(&skeleton("b1"))));

    let retrieval = ProofRetrieval::new(
        store.clone(),
        store.clone(),
        shards.clone(),
        Arc::new(ChainpointBinaryCodec::new()),
        config,
    );

    let results = retrieval
        .retrieve(&[e1, node_id(43)], ProofFormat::JsonLd)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    match &results[0].proof {
        Some(ProofPayload::Object(proof)) => assert_eq!(proof.hash.as_deref(), Some("42")),
        other => panic!("expected a full proof, got {other:?}"),
    }
    assert!(results[1].proof.is_none());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_public_key_bootstrap_persists_once() {
    let Some(pool) = connect_db().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let store = PgPublicKeyStore::new(pool.clone());
    store.initialize().await.unwrap();
    sqlx::query("DELETE FROM pubkeys")
        .execute(&pool)
        .await
        .unwrap();

    let bytes = SigningKey::from_bytes(&[9; 32]).verifying_key().to_bytes();
    let hash = pub_key_hash(&bytes);
    let configured = HashMap::from([(
        hash.clone(),
        base64::engine::general_purpose::STANDARD.encode(bytes),
    )]);

    let registry = PublicKeyRegistry::new(Arc::new(store));
    let keys = registry.bootstrap(&configured).await.unwrap();
    assert_eq!(keys.len(), 1);
    assert!(keys.contains_key(&hash));

    // second start finds the stored keys and does not insert again
    let keys = registry.bootstrap(&configured).await.unwrap();
    assert_eq!(keys.len(), 1);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pubkeys")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}
