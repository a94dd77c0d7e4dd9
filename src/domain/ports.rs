//! Collaborator contracts.
//!
//! The send core consumes these capabilities; the embedding client injects
//! concrete implementations at construction.

use async_trait::async_trait;

use super::entities::{EncryptedAttachment, OutgoingMessage, RecipientSet, UploadMetadata};
use super::errors::{TransportFailure, UploadError};
use super::value_objects::{RecipientId, ThreadId};
use crate::shared::error::AppError;

/// Encrypts and delivers a message to one recipient.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(
        &self,
        message: &OutgoingMessage,
        recipient: &RecipientId,
    ) -> Result<(), TransportFailure>;
}

/// Transmits encrypted attachment bytes and returns the server-assigned id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttachmentUploader: Send + Sync {
    async fn upload(&self, ciphertext: &[u8], metadata: &UploadMetadata)
        -> Result<u64, UploadError>;
}

/// Attachment encryption failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CipherError(pub String);

/// Client-side attachment encryption.
#[cfg_attr(test, mockall::automock)]
pub trait AttachmentCipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedAttachment, CipherError>;
}

/// Contact and group membership lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecipientResolver: Send + Sync {
    /// Current members of a thread, excluding the local account.
    async fn resolve(&self, thread_id: &ThreadId) -> Result<RecipientSet, AppError>;

    /// Whether the recipient is already known to be deregistered or removed.
    async fn is_unregistered(&self, recipient: &RecipientId) -> bool;

    /// Record that the service no longer knows this recipient.
    async fn mark_unregistered(&self, recipient: &RecipientId) -> Result<(), AppError>;
}

/// Local blocking list.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlockingList: Send + Sync {
    async fn is_blocked(&self, recipient: &RecipientId) -> bool;
}
