//! PostgreSQL record store.
//!
//! Records live in a single `kv_records` table keyed by `(collection, key)`
//! with a JSONB value. See `migrations/` for the schema.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use super::unit_of_work::{StoreTransaction, UnitOfWork};
use crate::shared::error::AppError;

/// PostgreSQL Unit of Work implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, AppError> {
        let tx = self.pool.begin().await.map_err(AppError::Database)?;
        Ok(Box::new(PgStoreTransaction { tx }))
    }
}

/// Transaction context that wraps a SQLx transaction.
struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn get(&mut self, collection: &str, key: &str) -> Result<Option<Value>, AppError> {
        let row: Option<Json<Value>> = sqlx::query_scalar(
            "SELECT value FROM kv_records WHERE collection = $1 AND key = $2",
        )
        .bind(collection)
        .bind(key)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|Json(value)| value))
    }

    async fn put(&mut self, collection: &str, key: &str, value: Value) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO kv_records (collection, key, value, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (collection, key)
            DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(collection)
        .bind(key)
        .bind(Json(value))
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete(&mut self, collection: &str, key: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM kv_records WHERE collection = $1 AND key = $2")
            .bind(collection)
            .bind(key)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await.map_err(AppError::Database)
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        self.tx.rollback().await.map_err(AppError::Database)
    }
}
