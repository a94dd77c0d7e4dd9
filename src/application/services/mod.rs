//! Application Services
//!
//! Services that coordinate domain operations for an outgoing message.
//!
//! ## Available Services
//!
//! - **MessageSender**: enqueue, upload, send with retries, completion
//! - **AttachmentUploadService**: read, encrypt, digest, and upload attachments
//! - **DisappearingConfigSynchronizer**: per-thread expiration policy
//! - **RetryPolicy**: bounded exponential backoff

pub mod attachment_upload;
pub mod completion;
pub mod disappearing_config;
pub mod message_sender;
pub mod retry;

pub use attachment_upload::AttachmentUploadService;
pub use completion::{SendHandle, SendOutcome};
pub use disappearing_config::{DisappearingConfigSynchronizer, ReconcileOutcome};
pub use message_sender::{Collaborators, MessageSendService, MessageSender};
pub use retry::RetryPolicy;
