//! PostgreSQL-backed key-value store
//!
//! Persistent backing for the lookup and aggregation stores when the gateway
//! shares a database with the node that writes them.

use async_trait::async_trait;
use sqlx::postgres::PgPool;

use crate::infra::{AggregationStore, LookupStore, Result};

/// Key-value rows in `gateway_kv`
#[derive(Clone)]
pub struct PgKeyValueStore {
    pool: PgPool,
}

impl PgKeyValueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS gateway_kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM gateway_kv WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO gateway_kv (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl LookupStore for PgKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.read(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write(key, value).await
    }
}

#[async_trait]
impl AggregationStore for PgKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.read(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write(key, value).await
    }
}
