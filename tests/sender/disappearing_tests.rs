//! Disappearing-message configuration tests.

use courier::application::{MessageSendService, ReconcileOutcome};
use courier::domain::{DisappearingConfig, OutgoingMessage};
use courier::shared::CancellationToken;
use pretty_assertions::assert_eq;

use crate::common::*;

fn message_with(config: DisappearingConfig) -> OutgoingMessage {
    OutgoingMessage::new(thread(), "hello", config)
}

#[tokio::test(start_paused = true)]
async fn test_enqueue_adopts_newer_thread_policy() {
    let harness = Harness::new(&["bob"]);
    let config = DisappearingConfig::enabled(3600, 1_000);

    harness
        .sender
        .enqueue_message(message_with(config), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        harness.sender.disappearing_configuration(&thread()).await.unwrap(),
        config
    );
}

#[tokio::test(start_paused = true)]
async fn test_older_policy_does_not_override() {
    let harness = Harness::new(&["bob"]);
    let newer = DisappearingConfig::enabled(3600, 2_000);
    harness
        .sender
        .become_consistent_with_disappearing_configuration(&message_with(newer))
        .await
        .unwrap();

    harness
        .sender
        .enqueue_message(
            message_with(DisappearingConfig::disabled(1_000)),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        harness.sender.disappearing_configuration(&thread()).await.unwrap(),
        newer
    );
}

#[tokio::test(start_paused = true)]
async fn test_become_consistent_is_idempotent() {
    let harness = Harness::new(&["bob"]);
    let msg = message_with(DisappearingConfig::enabled(60, 5_000));

    let first = harness
        .sender
        .become_consistent_with_disappearing_configuration(&msg)
        .await
        .unwrap();
    let second = harness
        .sender
        .become_consistent_with_disappearing_configuration(&msg)
        .await
        .unwrap();

    assert_eq!(
        first,
        ReconcileOutcome::Updated {
            previous: DisappearingConfig::default()
        }
    );
    assert_eq!(second, ReconcileOutcome::Unchanged);
    assert_eq!(harness.transport.total_calls(), 0);
}
