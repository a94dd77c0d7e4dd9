//! Outgoing message entity and its send state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attachment::UploadedAttachmentRef;
use super::disappearing::DisappearingConfig;
use crate::domain::errors::{SendError, SendErrorKind};
use crate::domain::value_objects::{MessageId, RecipientId, ThreadId};

/// Plain text above this many bytes must be sent as an attachment.
pub const OVERSIZE_TEXT_MESSAGE_SIZE_THRESHOLD: usize = 2 * 1024;

/// Lifecycle of one outgoing message within an enqueue call.
///
/// ```text
/// Pending -> (Uploading)? -> Sending -> Sent
///                               |  ^
///                               +--+ retry
///                               +-> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    #[default]
    Pending,
    Uploading,
    Sending,
    Sent,
    Failed,
}

impl MessageState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    /// `Sent` and `Failed` end the state machine.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Uploading => 1,
            Self::Sending => 2,
            Self::Sent | Self::Failed => 3,
        }
    }

    /// Whether `next` is a legal forward move from this state.
    pub fn can_advance_to(&self, next: MessageState) -> bool {
        if self.is_terminal() {
            return false;
        }
        // Sending re-enters itself on retry
        next.rank() > self.rank() || (*self == Self::Sending && next == Self::Sending)
    }
}

impl std::fmt::Display for MessageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Delivery progress for one recipient of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecipientDeliveryState {
    #[default]
    Pending,
    Sent,
    /// Not attempted (blocked group member)
    Skipped,
    Failed,
}

/// A composed message owned by the sender for the duration of a send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub id: MessageId,

    /// Conversation the message belongs to
    pub thread_id: ThreadId,

    /// Inline text body
    pub body: String,

    /// Attachments that are already uploaded
    pub attachments: Vec<UploadedAttachmentRef>,

    /// Thread policy snapshot taken when the message was composed
    pub disappearing_config: DisappearingConfig,

    pub created_at: DateTime<Utc>,

    pub state: MessageState,

    /// Per-recipient progress, filled in once recipients are resolved
    pub recipient_states: BTreeMap<RecipientId, RecipientDeliveryState>,
}

impl OutgoingMessage {
    pub fn new(
        thread_id: ThreadId,
        body: impl Into<String>,
        disappearing_config: DisappearingConfig,
    ) -> Self {
        Self {
            id: MessageId::new(),
            thread_id,
            body: body.into(),
            attachments: Vec::new(),
            disappearing_config,
            created_at: Utc::now(),
            state: MessageState::Pending,
            recipient_states: BTreeMap::new(),
        }
    }

    /// Check if the inline body needs to be converted to an attachment.
    pub fn is_oversize_text(&self) -> bool {
        self.body.len() > OVERSIZE_TEXT_MESSAGE_SIZE_THRESHOLD
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    /// Move the message forward. Backward moves and moves out of a terminal
    /// state are rejected.
    pub fn advance(&mut self, next: MessageState) -> Result<(), SendError> {
        if !self.state.can_advance_to(next) {
            return Err(SendError::new(
                SendErrorKind::Internal,
                format!("illegal state transition {} -> {}", self.state, next),
            ));
        }
        self.state = next;
        Ok(())
    }

    /// Recipients that have not yet reached a final delivery state.
    pub fn pending_recipients(&self) -> Vec<RecipientId> {
        self.recipient_states
            .iter()
            .filter(|(_, state)| **state == RecipientDeliveryState::Pending)
            .map(|(recipient, _)| recipient.clone())
            .collect()
    }

    /// Recipients in the given delivery state.
    pub fn recipients_in(&self, wanted: RecipientDeliveryState) -> Vec<RecipientId> {
        self.recipient_states
            .iter()
            .filter(|(_, state)| **state == wanted)
            .map(|(recipient, _)| recipient.clone())
            .collect()
    }

    pub fn set_recipient_state(&mut self, recipient: &RecipientId, state: RecipientDeliveryState) {
        self.recipient_states.insert(recipient.clone(), state);
    }

    /// Reset for a new enqueue. Recipients that already received the message
    /// stay `Sent` so a resend only targets the rest.
    pub fn prepare_for_send(&mut self) {
        self.state = MessageState::Pending;
        self.recipient_states
            .retain(|_, state| *state == RecipientDeliveryState::Sent);
    }
}
