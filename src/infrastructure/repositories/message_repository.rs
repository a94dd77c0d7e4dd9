//! Outgoing message records.

use crate::domain::{MessageId, OutgoingMessage};
use crate::infrastructure::database::StoreTransaction;
use crate::shared::error::AppError;

const COLLECTION: &str = "outgoing_messages";

/// Reads and writes [`OutgoingMessage`] records inside a caller's transaction.
pub struct KvMessageRepository;

impl KvMessageRepository {
    /// Find a message by id.
    pub async fn find_by_id(
        tx: &mut dyn StoreTransaction,
        id: &MessageId,
    ) -> Result<Option<OutgoingMessage>, AppError> {
        match tx.get(COLLECTION, &id.to_string()).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Insert or replace a message.
    pub async fn save(
        tx: &mut dyn StoreTransaction,
        message: &OutgoingMessage,
    ) -> Result<(), AppError> {
        let value = serde_json::to_value(message)?;
        tx.put(COLLECTION, &message.id.to_string(), value).await
    }

    /// Delete a message.
    pub async fn delete(tx: &mut dyn StoreTransaction, id: &MessageId) -> Result<(), AppError> {
        tx.delete(COLLECTION, &id.to_string()).await
    }
}
