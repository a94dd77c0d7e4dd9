//! Application Layer
//!
//! The outgoing message pipeline and the values it reports back to callers.

pub mod dto;
pub mod services;

pub use dto::SendReport;
pub use services::*;
