//! Prometheus Metrics Module
//!
//! Provides send pipeline metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Send outcomes by result and error kind
//! - Individual network send attempts and retries
//! - Attachment upload outcomes and sizes
//! - End-to-end send latency
//! - Sends currently in flight

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Completed sends by outcome ("sent", "failed") and error kind
pub static MESSAGES_COMPLETED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("messages_completed_total", "Outgoing messages that reached a terminal state")
            .namespace("courier"),
        &["outcome", "kind"],
    )
    .expect("Failed to create MESSAGES_COMPLETED_TOTAL metric")
});

/// Per-recipient network send attempts by result
pub static SEND_ATTEMPTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("send_attempts_total", "Per-recipient network send attempts")
            .namespace("courier"),
        &["result"],
    )
    .expect("Failed to create SEND_ATTEMPTS_TOTAL metric")
});

/// Retries scheduled, by phase ("upload", "send") and error kind
pub static RETRIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("retries_total", "Retries scheduled after a retryable failure")
            .namespace("courier"),
        &["phase", "kind"],
    )
    .expect("Failed to create RETRIES_TOTAL metric")
});

/// Attachment uploads by outcome
pub static ATTACHMENT_UPLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("attachment_uploads_total", "Attachment upload attempts")
            .namespace("courier"),
        &["outcome"],
    )
    .expect("Failed to create ATTACHMENT_UPLOADS_TOTAL metric")
});

/// Uploaded attachment plaintext size in bytes
pub static ATTACHMENT_UPLOAD_BYTES: Lazy<Histogram> = Lazy::new(|| {
    let buckets = prometheus::exponential_buckets(1024.0, 4.0, 10)
        .expect("Failed to build upload size buckets");
    Histogram::with_opts(
        HistogramOpts::new("attachment_upload_bytes", "Uploaded attachment size in bytes")
            .namespace("courier")
            .buckets(buckets),
    )
    .expect("Failed to create ATTACHMENT_UPLOAD_BYTES metric")
});

/// Time from enqueue to terminal outcome
pub static SEND_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    let buckets = vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];
    Histogram::with_opts(
        HistogramOpts::new("send_duration_seconds", "Enqueue to terminal outcome latency")
            .namespace("courier")
            .buckets(buckets),
    )
    .expect("Failed to create SEND_DURATION_SECONDS metric")
});

/// Sends currently between enqueue and terminal outcome
pub static SENDS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("sends_in_flight", "Sends that have not completed yet").namespace("courier"),
    )
    .expect("Failed to create SENDS_IN_FLIGHT metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(MESSAGES_COMPLETED_TOTAL.clone()))
        .expect("Failed to register MESSAGES_COMPLETED_TOTAL");
    registry
        .register(Box::new(SEND_ATTEMPTS_TOTAL.clone()))
        .expect("Failed to register SEND_ATTEMPTS_TOTAL");
    registry
        .register(Box::new(RETRIES_TOTAL.clone()))
        .expect("Failed to register RETRIES_TOTAL");
    registry
        .register(Box::new(ATTACHMENT_UPLOADS_TOTAL.clone()))
        .expect("Failed to register ATTACHMENT_UPLOADS_TOTAL");
    registry
        .register(Box::new(ATTACHMENT_UPLOAD_BYTES.clone()))
        .expect("Failed to register ATTACHMENT_UPLOAD_BYTES");
    registry
        .register(Box::new(SEND_DURATION_SECONDS.clone()))
        .expect("Failed to register SEND_DURATION_SECONDS");
    registry
        .register(Box::new(SENDS_IN_FLIGHT.clone()))
        .expect("Failed to register SENDS_IN_FLIGHT");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Metrics should be valid UTF-8")
}

/// Helper to record a terminal send outcome
pub fn record_completion(outcome: &str, kind: &str, duration_secs: f64) {
    MESSAGES_COMPLETED_TOTAL
        .with_label_values(&[outcome, kind])
        .inc();
    SEND_DURATION_SECONDS.observe(duration_secs);
}

/// Helper to record one per-recipient send attempt
pub fn record_send_attempt(result: &str) {
    SEND_ATTEMPTS_TOTAL.with_label_values(&[result]).inc();
}

/// Helper to record a scheduled retry
pub fn record_retry(phase: &str, kind: &str) {
    RETRIES_TOTAL.with_label_values(&[phase, kind]).inc();
}

/// Helper to record an upload attempt
pub fn record_upload(outcome: &str, bytes: Option<u64>) {
    ATTACHMENT_UPLOADS_TOTAL.with_label_values(&[outcome]).inc();
    if let Some(bytes) = bytes {
        ATTACHMENT_UPLOAD_BYTES.observe(bytes as f64);
    }
}
