//! Attachment Upload Service
//!
//! Turns a local [`AttachmentSource`] into an [`UploadedAttachmentRef`]:
//! size check, read, encrypt, digest, upload. One call is one attempt; the
//! sender owns the retry loop. Sources are never deleted here.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::config::AttachmentSettings;
use crate::domain::ports::{AttachmentCipher, AttachmentUploader};
use crate::domain::{AttachmentSource, UploadError, UploadMetadata, UploadedAttachmentRef};
use crate::infrastructure::metrics;

pub struct AttachmentUploadService {
    uploader: Arc<dyn AttachmentUploader>,
    cipher: Arc<dyn AttachmentCipher>,
    max_size_bytes: u64,
}

impl AttachmentUploadService {
    pub fn new(
        uploader: Arc<dyn AttachmentUploader>,
        cipher: Arc<dyn AttachmentCipher>,
        settings: &AttachmentSettings,
    ) -> Self {
        Self {
            uploader,
            cipher,
            max_size_bytes: settings.max_size_bytes,
        }
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Upload one attachment.
    pub async fn upload(
        &self,
        source: &AttachmentSource,
    ) -> Result<UploadedAttachmentRef, UploadError> {
        let result = self.try_upload(source).await;
        match &result {
            Ok(uploaded) => {
                metrics::record_upload("uploaded", Some(uploaded.size));
                tracing::debug!(
                    server_id = uploaded.server_id,
                    size = uploaded.size,
                    content_type = %uploaded.content_type,
                    "Attachment uploaded"
                );
            }
            Err(e) => {
                metrics::record_upload("failed", None);
                tracing::warn!(error = %e, content_type = source.content_type(), "Attachment upload failed");
            }
        }
        result
    }

    async fn try_upload(
        &self,
        source: &AttachmentSource,
    ) -> Result<UploadedAttachmentRef, UploadError> {
        self.check_size(source.data().size().await?)?;

        let plaintext = source.data().read().await?;
        let size = plaintext.len() as u64;
        // The source may have grown since it was measured.
        self.check_size(size)?;

        let encrypted = self
            .cipher
            .encrypt(&plaintext)
            .map_err(|e| UploadError::Encryption(e.0))?;
        drop(plaintext);

        let digest = Sha256::digest(&encrypted.ciphertext).to_vec();
        let metadata = UploadMetadata {
            content_type: source.content_type().to_string(),
            source_filename: source.source_filename().map(str::to_string),
            encrypted_size: encrypted.ciphertext.len() as u64,
        };

        let server_id = self.uploader.upload(&encrypted.ciphertext, &metadata).await?;

        Ok(UploadedAttachmentRef {
            server_id,
            key: encrypted.key,
            digest,
            size,
            content_type: metadata.content_type,
            source_filename: metadata.source_filename,
        })
    }

    fn check_size(&self, size: u64) -> Result<(), UploadError> {
        if size > self.max_size_bytes {
            return Err(UploadError::Oversize {
                size,
                limit: self.max_size_bytes,
            });
        }
        Ok(())
    }
}
