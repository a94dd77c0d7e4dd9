//! # Domain Layer
//!
//! Message, attachment, and thread-policy types plus the failure taxonomy.
//! Independent of storage and transport implementations.
//!
//! ## Structure
//!
//! - **entities**: outgoing messages, attachments, recipients, policies
//! - **value_objects**: identifiers
//! - **services**: error classification
//! - **errors**: raw collaborator failures and the classified `SendError`
//! - **ports**: collaborator traits injected into the sender

pub mod entities;
pub mod errors;
pub mod ports;
pub mod services;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use errors::*;
pub use value_objects::*;
