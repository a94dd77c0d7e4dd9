//! Retry and cancellation tests.

use std::time::Duration;

use courier::application::MessageSendService;
use courier::domain::{MessageState, SendErrorKind, TransportFailure};
use courier::shared::CancellationToken;
use pretty_assertions::assert_eq;
use tokio::time::Instant;

use crate::common::*;

#[tokio::test(start_paused = true)]
async fn test_transient_failure_then_success() {
    // Arrange
    let harness = Harness::new(&["bob"]);
    harness
        .transport
        .script("bob", vec![Err(TransportFailure::Timeout), Ok(())]);
    let msg = message("hello");
    let id = msg.id;

    // Act
    let report = harness
        .sender
        .enqueue_message(msg, CancellationToken::new())
        .await
        .unwrap();

    // Assert
    assert_eq!(report.attempts, 2);
    assert_eq!(report.retries(), 1);
    assert_eq!(harness.transport.calls("bob"), 2);
    assert_eq!(harness.stored_state(&id), Some(MessageState::Sent));
}

#[tokio::test(start_paused = true)]
async fn test_retry_ceiling_surfaces_last_retryable_error() {
    let harness = Harness::new(&["bob"]);
    harness
        .transport
        .always_fail("bob", TransportFailure::Server { status: 503 });
    let msg = message("hello");
    let id = msg.id;
    let started = Instant::now();

    let error = harness
        .sender
        .enqueue_message(msg, CancellationToken::new())
        .await
        .unwrap_err();

    // One attempt plus three retries.
    assert_eq!(harness.transport.calls("bob"), 4);
    assert_eq!(error.kind(), SendErrorKind::TransientNetwork);
    assert!(error.is_retryable());
    assert!(started.elapsed() >= Duration::from_millis(500 + 1000 + 2000));
    assert_eq!(harness.stored_state(&id), Some(MessageState::Failed));
}

#[tokio::test(start_paused = true)]
async fn test_stale_devices_are_retried() {
    let harness = Harness::new(&["bob"]);
    harness
        .transport
        .script("bob", vec![Err(TransportFailure::StaleDevices), Ok(())]);

    let report = harness
        .sender
        .enqueue_message(message("hello"), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.attempts, 2);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_waits_for_retry_after() {
    let harness = Harness::new(&["bob"]);
    harness.transport.script(
        "bob",
        vec![
            Err(TransportFailure::RateLimited {
                retry_after: Some(Duration::from_secs(90)),
            }),
            Ok(()),
        ],
    );
    let started = Instant::now();

    harness
        .sender
        .enqueue_message(message("hello"), CancellationToken::new())
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_secs(90));
    assert_eq!(harness.transport.calls("bob"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_backoff() {
    let harness = Harness::new(&["bob"]);
    harness.transport.script(
        "bob",
        vec![Err(TransportFailure::RateLimited {
            retry_after: Some(Duration::from_secs(3600)),
        })],
    );
    let cancel = CancellationToken::new();
    harness.transport.cancel_on_first_call(cancel.clone());
    let msg = message("hello");
    let id = msg.id;
    let started = Instant::now();

    let error = harness
        .sender
        .enqueue_message(msg, cancel)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), SendErrorKind::Cancelled);
    assert!(!error.is_retryable());
    assert!(started.elapsed() < Duration::from_secs(3600));
    assert_eq!(harness.transport.calls("bob"), 1);
    assert_eq!(harness.stored_state(&id), Some(MessageState::Failed));
}
