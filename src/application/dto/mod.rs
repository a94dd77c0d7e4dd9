//! Data Transfer Objects
//!
//! Values handed back to callers when a send completes.

pub mod send_report;

pub use send_report::SendReport;
