//! PostgreSQL-backed public key store

use async_trait::async_trait;
use sqlx::postgres::PgPool;

use crate::infra::{PublicKeyRecord, PublicKeyStore, Result};

pub struct PgPublicKeyStore {
    pool: PgPool,
}

impl PgPublicKeyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema for public keys
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pubkeys (
                pub_key_hash TEXT PRIMARY KEY,
                pub_key TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl PublicKeyStore for PgPublicKeyStore {
    async fn list_all(&self) -> Result<Vec<PublicKeyRecord>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT pub_key_hash, pub_key FROM pubkeys ORDER BY pub_key_hash")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(pub_key_hash, pub_key)| PublicKeyRecord {
                pub_key_hash,
                pub_key,
            })
            .collect())
    }

    async fn bulk_create(&self, records: Vec<PublicKeyRecord>) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for record in &records {
            sqlx::query("INSERT INTO pubkeys (pub_key_hash, pub_key) VALUES ($1, $2)")
                .bind(&record.pub_key_hash)
                .bind(&record.pub_key)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
