//! Infrastructure Layer
//!
//! Contains implementations for external concerns including:
//! - Record store adapters (in-memory, PostgreSQL) and repositories
//! - Attachment data sources
//! - Prometheus metrics

pub mod data_sources;
pub mod database;
pub mod metrics;
pub mod repositories;
