//! In-process record store.
//!
//! Transactions are serialized: `begin` waits until the previous transaction
//! has committed or been dropped, which gives serializable isolation. Writes
//! are buffered and applied in one step on commit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::unit_of_work::{StoreTransaction, UnitOfWork};
use crate::shared::error::AppError;

type RecordKey = (String, String);

/// Record store kept in memory. Clones share the same records.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<RecordKey, Value>>>,
    gate: Arc<Mutex<()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a committed record outside of any transaction.
    pub fn committed(&self, collection: &str, key: &str) -> Option<Value> {
        self.records
            .read()
            .get(&(collection.to_string(), key.to_string()))
            .cloned()
    }

    /// Number of committed records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, AppError> {
        let guard = self.gate.clone().lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            records: self.records.clone(),
            writes: HashMap::new(),
            _guard: guard,
        }))
    }
}

struct MemoryTransaction {
    records: Arc<RwLock<HashMap<RecordKey, Value>>>,
    /// `None` marks a delete
    writes: HashMap<RecordKey, Option<Value>>,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn get(&mut self, collection: &str, key: &str) -> Result<Option<Value>, AppError> {
        let record_key = (collection.to_string(), key.to_string());
        if let Some(pending) = self.writes.get(&record_key) {
            return Ok(pending.clone());
        }
        Ok(self.records.read().get(&record_key).cloned())
    }

    async fn put(&mut self, collection: &str, key: &str, value: Value) -> Result<(), AppError> {
        self.writes
            .insert((collection.to_string(), key.to_string()), Some(value));
        Ok(())
    }

    async fn delete(&mut self, collection: &str, key: &str) -> Result<(), AppError> {
        self.writes
            .insert((collection.to_string(), key.to_string()), None);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryTransaction { records, writes, _guard } = *self;
        let mut records = records.write();
        for (key, value) in writes {
            match value {
                Some(value) => {
                    records.insert(key, value);
                }
                None => {
                    records.remove(&key);
                }
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        Ok(())
    }
}
