//! Attachment source and uploaded attachment reference.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default upload size limit in bytes (100MB).
pub const DEFAULT_MAX_ATTACHMENT_SIZE: u64 = 100 * 1024 * 1024;

/// Local bytes backing an attachment that has not been uploaded yet.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Size of the data in bytes.
    async fn size(&self) -> std::io::Result<u64>;

    /// Read the whole payload.
    async fn read(&self) -> std::io::Result<Vec<u8>>;

    /// Remove the local copy. Deleting an already deleted source succeeds.
    async fn delete(&self) -> std::io::Result<()>;
}

/// An attachment waiting to be uploaded.
///
/// A temporary source has its local copy deleted once the owning send has
/// reached its terminal outcome.
#[derive(Clone)]
pub struct AttachmentSource {
    data: Arc<dyn DataSource>,
    content_type: String,
    source_filename: Option<String>,
    temporary: bool,
}

impl AttachmentSource {
    pub fn new(
        data: Arc<dyn DataSource>,
        content_type: impl Into<String>,
        source_filename: Option<String>,
    ) -> Self {
        Self {
            data,
            content_type: content_type.into(),
            source_filename,
            temporary: false,
        }
    }

    /// Mark the source for deletion after the send completes.
    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    pub fn data(&self) -> &Arc<dyn DataSource> {
        &self.data
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn source_filename(&self) -> Option<&str> {
        self.source_filename.as_deref()
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }
}

impl fmt::Debug for AttachmentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachmentSource")
            .field("content_type", &self.content_type)
            .field("source_filename", &self.source_filename)
            .field("temporary", &self.temporary)
            .finish_non_exhaustive()
    }
}

/// Attachment bytes after client-side encryption.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedAttachment {
    pub ciphertext: Vec<u8>,
    /// Key material the recipient needs to decrypt
    pub key: Vec<u8>,
}

/// Metadata sent alongside an attachment upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMetadata {
    pub content_type: String,
    pub source_filename: Option<String>,
    /// Ciphertext length in bytes
    pub encrypted_size: u64,
}

/// Server-side reference to an uploaded attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAttachmentRef {
    /// Identifier assigned by the upload service
    pub server_id: u64,

    /// Encryption key material
    pub key: Vec<u8>,

    /// SHA-256 of the uploaded ciphertext
    pub digest: Vec<u8>,

    /// Plaintext size in bytes
    pub size: u64,

    pub content_type: String,

    pub source_filename: Option<String>,
}

impl UploadedAttachmentRef {
    /// Check if this attachment is an image.
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    /// Digest as lowercase hex, for logs.
    pub fn digest_hex(&self) -> String {
        self.digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
