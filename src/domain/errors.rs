//! Send failure taxonomy.
//!
//! Collaborators report raw failures ([`TransportFailure`], [`UploadError`]);
//! the error classifier turns them into a [`SendError`] that carries both
//! classification facets as plain fields. A `SendError` built outside the
//! classifier is never retryable and never ignorable for groups.

use std::fmt;
use std::time::Duration;

use crate::shared::error::AppError;

use super::value_objects::RecipientId;

/// Raw failure reported by the message transport for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportFailure {
    #[error("request timed out")]
    Timeout,

    #[error("network failure: {0}")]
    Network(String),

    #[error("server error (status {status})")]
    Server { status: u16 },

    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("recipient is not registered")]
    Unregistered,

    #[error("recipient device list is stale")]
    StaleDevices,

    #[error("recipient identity key is untrusted")]
    UntrustedIdentity,

    #[error("payload rejected (status {status}): {reason}")]
    Rejected { status: u16, reason: String },

    #[error("protocol mismatch: {0}")]
    ProtocolMismatch(String),
}

/// Failure reported by the attachment upload path.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("attachment is {size} bytes, limit is {limit}")]
    Oversize { size: u64, limit: u64 },

    #[error("could not read attachment source: {0}")]
    Read(#[from] std::io::Error),

    #[error("attachment encryption failed: {0}")]
    Encryption(String),

    #[error("upload transport failure: {0}")]
    Transport(String),

    #[error("upload rejected by server: {0}")]
    Rejected(String),
}

/// Category of a classified send failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendErrorKind {
    /// Timeout, dropped connection, 5xx, stale device list
    TransientNetwork,
    /// Server asked the client to slow down
    RateLimited,
    /// Recipient is deregistered or removed
    RecipientUnreachable,
    /// Payload can never be delivered as-is
    InvalidPayload,
    /// Recipient identity key changed and is not yet trusted
    UntrustedIdentity,
    /// Recipient is on the local blocking list
    RecipientBlocked,
    /// Attachment upload refused by the server
    UploadRejected,
    /// Caller cancelled the send
    Cancelled,
    /// Persisting send state failed
    Storage,
    /// Anything else, including a panicked send task
    Internal,
}

impl SendErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransientNetwork => "transient_network",
            Self::RateLimited => "rate_limited",
            Self::RecipientUnreachable => "recipient_unreachable",
            Self::InvalidPayload => "invalid_payload",
            Self::UntrustedIdentity => "untrusted_identity",
            Self::RecipientBlocked => "recipient_blocked",
            Self::UploadRejected => "upload_rejected",
            Self::Cancelled => "cancelled",
            Self::Storage => "storage",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for SendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified send failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct SendError {
    kind: SendErrorKind,
    detail: String,
    recipient: Option<RecipientId>,
    retry_after: Option<Duration>,
    is_retryable: bool,
    should_be_ignored_for_groups: bool,
}

impl SendError {
    /// Build an unclassified error: terminal and not ignorable.
    pub fn new(kind: SendErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            recipient: None,
            retry_after: None,
            is_retryable: false,
            should_be_ignored_for_groups: false,
        }
    }

    pub fn cancelled() -> Self {
        Self::new(SendErrorKind::Cancelled, "send cancelled by caller")
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(SendErrorKind::Internal, detail)
    }

    pub(crate) fn retryable(mut self, value: bool) -> Self {
        self.is_retryable = value;
        self
    }

    pub(crate) fn ignored_for_groups(mut self, value: bool) -> Self {
        self.should_be_ignored_for_groups = value;
        self
    }

    pub(crate) fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    pub fn for_recipient(mut self, recipient: RecipientId) -> Self {
        self.recipient = Some(recipient);
        self
    }

    pub fn kind(&self) -> SendErrorKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn recipient(&self) -> Option<&RecipientId> {
        self.recipient.as_ref()
    }

    /// Server-provided minimum wait before the next attempt.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    pub fn is_retryable(&self) -> bool {
        self.is_retryable
    }

    pub fn should_be_ignored_for_groups(&self) -> bool {
        self.should_be_ignored_for_groups
    }
}

impl From<AppError> for SendError {
    fn from(error: AppError) -> Self {
        let kind = if error.is_storage() {
            SendErrorKind::Storage
        } else {
            SendErrorKind::Internal
        };
        SendError::new(kind, error.to_string())
    }
}
