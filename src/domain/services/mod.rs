//! # Domain Services
//!
//! Domain services encapsulate logic that doesn't naturally belong to a single
//! entity.
//!
//! ## Services
//!
//! - **ErrorClassifier**: retryable / group-ignorable verdicts for send failures

mod error_classifier;

pub use error_classifier::*;
