//! Per-thread disappearing-message configuration records.

use crate::domain::{DisappearingConfig, ThreadId};
use crate::infrastructure::database::StoreTransaction;
use crate::shared::error::AppError;

const COLLECTION: &str = "disappearing_configs";

/// Reads and writes thread [`DisappearingConfig`] records.
pub struct KvDisappearingConfigRepository;

impl KvDisappearingConfigRepository {
    /// Stored config for a thread, if one was ever written.
    pub async fn find_by_thread(
        tx: &mut dyn StoreTransaction,
        thread_id: &ThreadId,
    ) -> Result<Option<DisappearingConfig>, AppError> {
        match tx.get(COLLECTION, thread_id.as_str()).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn save(
        tx: &mut dyn StoreTransaction,
        thread_id: &ThreadId,
        config: &DisappearingConfig,
    ) -> Result<(), AppError> {
        tx.put(COLLECTION, thread_id.as_str(), serde_json::to_value(config)?)
            .await
    }
}
