//! Successful send summary.

use crate::domain::{MessageId, RecipientId, SendError, ThreadId, UploadedAttachmentRef};

/// Outcome details of a message that reached `Sent`.
#[derive(Debug, Clone, PartialEq)]
pub struct SendReport {
    pub message_id: MessageId,
    pub thread_id: ThreadId,

    /// Network send rounds, first attempt included
    pub attempts: u32,

    /// Upload attempts, 0 when nothing was uploaded
    pub upload_attempts: u32,

    pub delivered: Vec<RecipientId>,

    /// Blocked group members that were not sent to
    pub skipped: Vec<RecipientId>,

    /// Group-ignorable failures absorbed into this success
    pub ignored_failures: Vec<SendError>,

    /// Attachments carried by the sent message
    pub attachments: Vec<UploadedAttachmentRef>,
}

impl SendReport {
    /// Send rounds after the first one.
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}
