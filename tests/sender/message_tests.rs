//! One-to-one send tests.

use std::sync::Arc;

use courier::application::MessageSendService;
use courier::domain::{
    MessageState, RecipientDeliveryState, SendErrorKind, TransportFailure,
    OVERSIZE_TEXT_MESSAGE_SIZE_THRESHOLD,
};
use courier::shared::CancellationToken;
use pretty_assertions::assert_eq;

use crate::common::*;

#[tokio::test(start_paused = true)]
async fn test_plain_message_is_sent_without_upload() {
    // Arrange
    let harness = Harness::new(&["bob"]);
    let msg = message("hello");
    let id = msg.id;

    // Act
    let report = harness
        .sender
        .enqueue_message(msg, CancellationToken::new())
        .await
        .unwrap();

    // Assert
    assert_eq!(report.message_id, id);
    assert_eq!(report.attempts, 1);
    assert_eq!(report.retries(), 0);
    assert_eq!(report.delivered, vec![rid("bob")]);
    assert_eq!(harness.uploader.calls(), 0);
    assert_eq!(harness.transport.calls("bob"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_handle_carries_message_id() {
    let harness = Harness::new(&["bob"]);
    let msg = message("hello");
    let id = msg.id;

    let handle = harness
        .sender
        .enqueue_message(msg, CancellationToken::new());

    assert_eq!(handle.message_id(), id);
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_sent_state_is_persisted() {
    let harness = Harness::new(&["bob"]);
    let msg = message("hello");
    let id = msg.id;

    harness
        .sender
        .enqueue_message(msg, CancellationToken::new())
        .await
        .unwrap();

    let stored = harness.stored(&id).expect("message should be persisted");
    assert_eq!(stored.state, MessageState::Sent);
    assert_eq!(
        stored.recipient_states.get(&rid("bob")),
        Some(&RecipientDeliveryState::Sent)
    );
}

#[tokio::test(start_paused = true)]
async fn test_oversize_text_fails_before_any_network_call() {
    let harness = Harness::new(&["bob"]);
    let body = "a".repeat(OVERSIZE_TEXT_MESSAGE_SIZE_THRESHOLD + 1);

    let error = harness
        .sender
        .enqueue_message(message(&body), CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(error.kind(), SendErrorKind::InvalidPayload);
    assert!(!error.is_retryable());
    assert_eq!(harness.transport.total_calls(), 0);
    assert_eq!(harness.uploader.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_blocked_recipient_fails_one_to_one_send() {
    let harness = Harness::with_blocked(&["bob"], &["bob"]);
    let msg = message("hello");
    let id = msg.id;

    let error = harness
        .sender
        .enqueue_message(msg, CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(error.kind(), SendErrorKind::RecipientBlocked);
    assert_eq!(harness.transport.total_calls(), 0);
    assert_eq!(harness.stored_state(&id), Some(MessageState::Failed));
}

#[tokio::test(start_paused = true)]
async fn test_terminal_failure_is_not_retried() {
    let harness = Harness::new(&["bob"]);
    harness
        .transport
        .script("bob", vec![Err(TransportFailure::UntrustedIdentity)]);
    let msg = message("hello");
    let id = msg.id;

    let error = harness
        .sender
        .enqueue_message(msg, CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(error.kind(), SendErrorKind::UntrustedIdentity);
    assert_eq!(error.recipient(), Some(&rid("bob")));
    assert_eq!(harness.transport.calls("bob"), 1);
    assert_eq!(harness.stored_state(&id), Some(MessageState::Failed));
}

#[tokio::test(start_paused = true)]
async fn test_unregistered_recipient_is_reported_to_resolver() {
    let harness = Harness::new(&["bob"]);
    harness
        .transport
        .script("bob", vec![Err(TransportFailure::Unregistered)]);

    let error = harness
        .sender
        .enqueue_message(message("hello"), CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(error.kind(), SendErrorKind::RecipientUnreachable);
    assert!(!error.should_be_ignored_for_groups());
    assert!(harness.resolver.is_marked("bob"));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_start_never_sends() {
    let harness = Harness::new(&["bob"]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let error = harness
        .sender
        .enqueue_message(message("hello"), cancel)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), SendErrorKind::Cancelled);
    assert_eq!(harness.transport.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_panic_in_pipeline_completes_with_internal_error() {
    let harness = Harness::with_transport(Arc::new(PanickingTransport), &["bob"]);
    let msg = message("hello");
    let id = msg.id;

    let error = harness
        .sender
        .enqueue_message(msg, CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(error.kind(), SendErrorKind::Internal);
    assert!(error.detail().contains("transport exploded"));
    assert_eq!(harness.stored_state(&id), Some(MessageState::Failed));
}

#[tokio::test(start_paused = true)]
async fn test_enqueueing_twice_sends_twice() {
    let harness = Harness::new(&["bob"]);
    let msg = message("hello");

    let first = harness
        .sender
        .enqueue_message(msg.clone(), CancellationToken::new());
    let second = harness.sender.enqueue_message(msg, CancellationToken::new());

    first.await.unwrap();
    second.await.unwrap();
    assert_eq!(harness.transport.calls("bob"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_resend_targets_only_undelivered_recipients() {
    let harness = Harness::new(&["bob", "carol"]);
    harness
        .transport
        .always_fail("carol", TransportFailure::Timeout);
    let msg = message("hello");
    let id = msg.id;

    harness
        .sender
        .enqueue_message(msg, CancellationToken::new())
        .await
        .unwrap_err();
    let bob_calls = harness.transport.calls("bob");

    // Carol comes back online; resend the stored failed message.
    let stored = harness.stored(&id).unwrap();
    let carol_calls = harness.transport.calls("carol");
    let fresh = Harness::new(&["bob", "carol"]);
    let report = fresh
        .sender
        .enqueue_message(stored, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(bob_calls, 1);
    assert_eq!(carol_calls, 4);
    assert_eq!(fresh.transport.calls("bob"), 0);
    assert_eq!(fresh.transport.calls("carol"), 1);
    assert_eq!(report.delivered, vec![rid("bob"), rid("carol")]);
}

#[tokio::test(start_paused = true)]
async fn test_on_complete_invokes_success_callback() {
    let harness = Harness::new(&["bob"]);
    let (tx, rx) = tokio::sync::oneshot::channel();

    harness
        .sender
        .enqueue_message(message("hello"), CancellationToken::new())
        .on_complete(
            move |report| {
                let _ = tx.send(report.attempts);
            },
            |error| panic!("unexpected failure: {}", error),
        )
        .await
        .unwrap();

    assert_eq!(rx.await.unwrap(), 1);
}
