//! # Courier
//!
//! Outbound message delivery core for an end-to-end encrypted messaging
//! client:
//! - Fire-and-forget enqueueing with a single awaitable completion per send
//! - Attachment encryption and upload before the first send attempt
//! - Failure classification into retryable and group-ignorable errors
//! - Bounded exponential backoff with cancellation
//! - Disappearing-message policy reconciliation per thread
//!
//! ## Architecture
//!
//! - **Domain Layer**: messages, attachments, failure taxonomy, collaborator ports
//! - **Application Layer**: the sender pipeline and its supporting services
//! - **Infrastructure Layer**: record stores, repositories, data sources, metrics
//!
//! ## Module Structure
//!
//! ```text
//! courier/
//! +-- config/         Configuration management
//! +-- domain/         Entities, value objects, errors, ports, classifier
//! +-- application/    Sender, uploads, retry policy, reports
//! +-- infrastructure/ Stores, repositories, data sources, metrics
//! +-- shared/         Errors, validation, cancellation
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Send pipeline
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Shared utilities
pub mod shared;

// Wiring against PostgreSQL
pub mod startup;

// Telemetry and observability
pub mod telemetry;
