//! Unit of Work Pattern Implementation
//!
//! Scoped transactions over the key-value record store. Every persisted send
//! state transition runs inside one transaction that either commits or rolls
//! back.

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::shared::error::AppError;

/// Opens transactions against the record store.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Begin a new transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, AppError>;
}

/// A single open transaction. Dropping it without committing discards its
/// writes.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Read a record, seeing this transaction's own uncommitted writes.
    async fn get(&mut self, collection: &str, key: &str) -> Result<Option<Value>, AppError>;

    /// Insert or replace a record.
    async fn put(&mut self, collection: &str, key: &str, value: Value) -> Result<(), AppError>;

    /// Remove a record if present.
    async fn delete(&mut self, collection: &str, key: &str) -> Result<(), AppError>;

    /// Commit the transaction.
    async fn commit(self: Box<Self>) -> Result<(), AppError>;

    /// Rollback the transaction.
    async fn rollback(self: Box<Self>) -> Result<(), AppError>;
}

/// Execute a closure within a transaction.
///
/// The closure hands the transaction back together with its result; the
/// transaction is committed on `Ok` and rolled back on `Err`.
///
/// # Example
/// ```ignore
/// let saved = with_transaction(store.as_ref(), |mut tx| async move {
///     let result = KvMessageRepository::save(tx.as_mut(), &message).await;
///     (tx, result)
/// })
/// .await?;
/// ```
pub async fn with_transaction<F, Fut, T, E>(uow: &dyn UnitOfWork, f: F) -> Result<T, E>
where
    F: FnOnce(Box<dyn StoreTransaction>) -> Fut,
    Fut: Future<Output = (Box<dyn StoreTransaction>, Result<T, E>)>,
    E: From<AppError>,
{
    let tx = uow.begin().await?;

    match f(tx).await {
        (tx, Ok(value)) => {
            tx.commit().await?;
            Ok(value)
        }
        (tx, Err(e)) => {
            if let Err(rollback_error) = tx.rollback().await {
                tracing::warn!(error = %rollback_error, "Transaction rollback failed");
            }
            Err(e)
        }
    }
}
