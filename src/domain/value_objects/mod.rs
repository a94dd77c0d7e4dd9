//! # Domain Value Objects
//!
//! Immutable value types that represent domain concepts without identity.
//!
//! ## Value Objects
//!
//! - **MessageId**: time-ordered UUID (v7) naming one outgoing message
//! - **ThreadId**: conversation identifier assigned by the thread store
//! - **RecipientId**: service address of a single conversation participant

mod ids;

pub use ids::*;
