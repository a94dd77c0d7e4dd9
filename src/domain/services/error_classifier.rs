//! Send failure classification domain service.

use crate::domain::errors::{SendError, SendErrorKind, TransportFailure, UploadError};
use crate::domain::value_objects::RecipientId;

/// What the classifier knows about the failed delivery.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationContext<'a> {
    pub recipient: &'a RecipientId,

    /// The recipient was already known to be deregistered or removed
    pub recipient_departed: bool,

    /// The message fans out to more than one recipient
    pub group_send: bool,
}

/// Domain service that tags failures as retryable and group-ignorable.
///
/// Pure and deterministic: identical inputs always produce identical errors.
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify a transport failure for one recipient.
    pub fn classify(failure: &TransportFailure, context: &ClassificationContext<'_>) -> SendError {
        let (kind, retryable) = match failure {
            TransportFailure::Timeout
            | TransportFailure::Network(_)
            | TransportFailure::Server { .. }
            | TransportFailure::StaleDevices => (SendErrorKind::TransientNetwork, true),
            TransportFailure::RateLimited { .. } => (SendErrorKind::RateLimited, true),
            TransportFailure::Unregistered => (SendErrorKind::RecipientUnreachable, false),
            TransportFailure::UntrustedIdentity => (SendErrorKind::UntrustedIdentity, false),
            TransportFailure::Rejected { .. } | TransportFailure::ProtocolMismatch(_) => {
                (SendErrorKind::InvalidPayload, false)
            }
        };

        // A recipient we already know is gone cannot be reached by any
        // terminal path; only transient failures keep their meaning.
        let kind = if context.recipient_departed && !retryable {
            SendErrorKind::RecipientUnreachable
        } else {
            kind
        };

        let retry_after = match failure {
            TransportFailure::RateLimited { retry_after } => *retry_after,
            _ => None,
        };

        let ignorable = kind == SendErrorKind::RecipientUnreachable && context.group_send;

        SendError::new(kind, failure.to_string())
            .for_recipient(context.recipient.clone())
            .retryable(retryable)
            .ignored_for_groups(ignorable)
            .with_retry_after(retry_after)
    }

    /// Classify a failure from the attachment upload path.
    pub fn classify_upload(error: &UploadError) -> SendError {
        let (kind, retryable) = match error {
            UploadError::Oversize { .. } => (SendErrorKind::InvalidPayload, false),
            UploadError::Transport(_) => (SendErrorKind::TransientNetwork, true),
            UploadError::Rejected(_) => (SendErrorKind::UploadRejected, false),
            UploadError::Read(_) | UploadError::Encryption(_) => (SendErrorKind::Internal, false),
        };

        SendError::new(kind, error.to_string()).retryable(retryable)
    }
}
