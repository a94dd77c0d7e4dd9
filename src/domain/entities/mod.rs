//! # Domain Entities
//!
//! Core objects the send pipeline moves around.
//!
//! ## Entities
//!
//! - **OutgoingMessage**: a composed message with its send state
//! - **AttachmentSource**: local attachment bytes awaiting upload
//! - **UploadedAttachmentRef**: server reference produced by an upload
//! - **RecipientSet**: thread members targeted by one send
//! - **DisappearingConfig**: per-thread message expiration policy

mod attachment;
mod disappearing;
mod message;
mod thread;

pub use attachment::{
    AttachmentSource, DataSource, EncryptedAttachment, UploadMetadata, UploadedAttachmentRef,
    DEFAULT_MAX_ATTACHMENT_SIZE,
};
pub use disappearing::DisappearingConfig;
pub use message::{
    MessageState, OutgoingMessage, RecipientDeliveryState, OVERSIZE_TEXT_MESSAGE_SIZE_THRESHOLD,
};
pub use thread::RecipientSet;
