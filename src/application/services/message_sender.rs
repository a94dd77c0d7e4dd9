//! Message Sender
//!
//! Accepts enqueue requests and drives each one on its own task:
//! reconcile the thread's disappearing policy, resolve recipients, upload any
//! attachment, send with bounded retries, then complete the caller's
//! [`SendHandle`] exactly once.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use tracing::Instrument;

use super::attachment_upload::AttachmentUploadService;
use super::completion::{self, Completion, SendHandle, SendOutcome};
use super::disappearing_config::{DisappearingConfigSynchronizer, ReconcileOutcome};
use super::retry::RetryPolicy;
use crate::application::dto::SendReport;
use crate::config::{AttachmentSettings, SenderSettings};
use crate::domain::ports::{
    AttachmentCipher, AttachmentUploader, BlockingList, MessageTransport, RecipientResolver,
};
use crate::domain::services::{ClassificationContext, ErrorClassifier};
use crate::domain::{
    AttachmentSource, DataSource, DisappearingConfig, MessageState, OutgoingMessage,
    RecipientDeliveryState, RecipientId, SendError, SendErrorKind, ThreadId,
    UploadedAttachmentRef, OVERSIZE_TEXT_MESSAGE_SIZE_THRESHOLD,
};
use crate::infrastructure::database::{with_transaction, UnitOfWork};
use crate::infrastructure::metrics;
use crate::infrastructure::repositories::KvMessageRepository;
use crate::shared::CancellationToken;

/// Capabilities injected into the sender.
#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn MessageTransport>,
    pub uploader: Arc<dyn AttachmentUploader>,
    pub cipher: Arc<dyn AttachmentCipher>,
    pub resolver: Arc<dyn RecipientResolver>,
    pub blocking: Arc<dyn BlockingList>,
    pub store: Arc<dyn UnitOfWork>,
}

/// Outbound message service
#[async_trait]
pub trait MessageSendService: Send + Sync {
    /// Send a message that carries no un-uploaded content.
    fn enqueue_message(&self, message: OutgoingMessage, cancel: CancellationToken) -> SendHandle;

    /// Upload an attachment, then send the message carrying it.
    fn enqueue_attachment(
        &self,
        data: Arc<dyn DataSource>,
        content_type: &str,
        source_filename: Option<String>,
        message: OutgoingMessage,
        cancel: CancellationToken,
    ) -> SendHandle;

    /// Like [`enqueue_attachment`](Self::enqueue_attachment), deleting the
    /// local data once the caller has observed the outcome (the handle was
    /// awaited, its callback returned, or it was dropped).
    fn enqueue_temporary_attachment(
        &self,
        data: Arc<dyn DataSource>,
        content_type: &str,
        message: OutgoingMessage,
        cancel: CancellationToken,
    ) -> SendHandle;

    /// Bring the thread's stored disappearing policy in line with the
    /// message's snapshot.
    async fn become_consistent_with_disappearing_configuration(
        &self,
        message: &OutgoingMessage,
    ) -> Result<ReconcileOutcome, SendError>;
}

/// Message sender. Clones share the same collaborators.
#[derive(Clone)]
pub struct MessageSender {
    inner: Arc<SenderInner>,
}

struct SenderInner {
    transport: Arc<dyn MessageTransport>,
    resolver: Arc<dyn RecipientResolver>,
    blocking: Arc<dyn BlockingList>,
    store: Arc<dyn UnitOfWork>,
    uploads: AttachmentUploadService,
    disappearing: DisappearingConfigSynchronizer,
    retry: RetryPolicy,
}

impl MessageSender {
    pub fn new(
        collaborators: Collaborators,
        sender: &SenderSettings,
        attachments: &AttachmentSettings,
    ) -> Self {
        Self::with_retry_policy(collaborators, RetryPolicy::new(sender), attachments)
    }

    pub fn with_retry_policy(
        collaborators: Collaborators,
        retry: RetryPolicy,
        attachments: &AttachmentSettings,
    ) -> Self {
        let Collaborators {
            transport,
            uploader,
            cipher,
            resolver,
            blocking,
            store,
        } = collaborators;

        Self {
            inner: Arc::new(SenderInner {
                transport,
                resolver,
                blocking,
                uploads: AttachmentUploadService::new(uploader, cipher, attachments),
                disappearing: DisappearingConfigSynchronizer::new(store.clone()),
                store,
                retry,
            }),
        }
    }

    /// Stored disappearing policy for a thread.
    pub async fn disappearing_configuration(
        &self,
        thread_id: &ThreadId,
    ) -> Result<DisappearingConfig, SendError> {
        Ok(self.inner.disappearing.current(thread_id).await?)
    }

    fn spawn(
        &self,
        mut message: OutgoingMessage,
        attachment: Option<AttachmentSource>,
        cancel: CancellationToken,
    ) -> SendHandle {
        message.prepare_for_send();
        let (completion, handle) = completion::channel(message.id);
        let span = tracing::info_span!(
            "send",
            message_id = %message.id,
            thread_id = %message.thread_id,
        );

        tracing::debug!(
            parent: &span,
            has_attachment = attachment.is_some(),
            "Message enqueued"
        );
        tokio::spawn(
            self.inner
                .clone()
                .run(message, attachment, cancel, completion)
                .instrument(span),
        );
        handle
    }
}

#[async_trait]
impl MessageSendService for MessageSender {
    fn enqueue_message(&self, message: OutgoingMessage, cancel: CancellationToken) -> SendHandle {
        self.spawn(message, None, cancel)
    }

    fn enqueue_attachment(
        &self,
        data: Arc<dyn DataSource>,
        content_type: &str,
        source_filename: Option<String>,
        message: OutgoingMessage,
        cancel: CancellationToken,
    ) -> SendHandle {
        let source = AttachmentSource::new(data, content_type, source_filename);
        self.spawn(message, Some(source), cancel)
    }

    fn enqueue_temporary_attachment(
        &self,
        data: Arc<dyn DataSource>,
        content_type: &str,
        message: OutgoingMessage,
        cancel: CancellationToken,
    ) -> SendHandle {
        let source = AttachmentSource::new(data, content_type, None).temporary();
        self.spawn(message, Some(source), cancel)
    }

    async fn become_consistent_with_disappearing_configuration(
        &self,
        message: &OutgoingMessage,
    ) -> Result<ReconcileOutcome, SendError> {
        Ok(self
            .inner
            .disappearing
            .reconcile(&message.thread_id, &message.disappearing_config)
            .await?)
    }
}

impl SenderInner {
    async fn run(
        self: Arc<Self>,
        mut message: OutgoingMessage,
        attachment: Option<AttachmentSource>,
        cancel: CancellationToken,
        completion: Completion,
    ) {
        let temporary = attachment
            .as_ref()
            .filter(|source| source.is_temporary())
            .map(|source| source.data().clone());
        let started = Instant::now();
        metrics::SENDS_IN_FLIGHT.inc();

        let caught = AssertUnwindSafe(self.drive(&mut message, attachment, &cancel))
            .catch_unwind()
            .await;
        let outcome: SendOutcome = match caught {
            Ok(outcome) => outcome,
            Err(panic) => {
                let error = SendError::internal(format!(
                    "send pipeline panicked: {}",
                    panic_message(panic.as_ref())
                ));
                self.abandon(&mut message).await;
                Err(error)
            }
        };

        metrics::SENDS_IN_FLIGHT.dec();
        let elapsed = started.elapsed().as_secs_f64();
        match &outcome {
            Ok(report) => {
                metrics::record_completion("sent", "none", elapsed);
                tracing::info!(
                    attempts = report.attempts,
                    delivered = report.delivered.len(),
                    skipped = report.skipped.len(),
                    ignored_failures = report.ignored_failures.len(),
                    "Message sent"
                );
            }
            Err(error) => {
                metrics::record_completion("failed", error.kind().as_str(), elapsed);
                tracing::warn!(
                    kind = %error.kind(),
                    retryable = error.is_retryable(),
                    error = %error,
                    "Message send failed"
                );
            }
        }

        let acknowledged = completion.complete(outcome);

        if let Some(data) = temporary {
            // The outcome may still be in use by the caller's callback.
            acknowledged.wait().await;
            match data.delete().await {
                Ok(()) => tracing::debug!("Temporary attachment source deleted"),
                Err(e) => tracing::warn!(error = %e, "Failed to delete temporary attachment source"),
            }
        }
    }

    async fn drive(
        &self,
        message: &mut OutgoingMessage,
        attachment: Option<AttachmentSource>,
        cancel: &CancellationToken,
    ) -> SendOutcome {
        match self.pipeline(message, attachment, cancel).await {
            Ok(report) => Ok(report),
            Err(error) => {
                self.abandon(message).await;
                Err(error)
            }
        }
    }

    async fn pipeline(
        &self,
        message: &mut OutgoingMessage,
        attachment: Option<AttachmentSource>,
        cancel: &CancellationToken,
    ) -> SendOutcome {
        if message.is_oversize_text() {
            return Err(SendError::new(
                SendErrorKind::InvalidPayload,
                format!(
                    "body is {} bytes; text over {} bytes must be sent as an attachment",
                    message.body.len(),
                    OVERSIZE_TEXT_MESSAGE_SIZE_THRESHOLD
                ),
            ));
        }
        check_cancelled(cancel)?;

        if let Err(e) = self
            .disappearing
            .reconcile(&message.thread_id, &message.disappearing_config)
            .await
        {
            tracing::warn!(error = %e, "Could not reconcile disappearing message configuration");
        }

        let recipients = self.resolver.resolve(&message.thread_id).await?;
        let group_send = recipients.is_group();

        for recipient in recipients.iter() {
            if message.recipient_states.get(recipient) == Some(&RecipientDeliveryState::Sent) {
                continue;
            }
            if self.blocking.is_blocked(recipient).await {
                if !group_send {
                    message.set_recipient_state(recipient, RecipientDeliveryState::Failed);
                    return Err(SendError::new(
                        SendErrorKind::RecipientBlocked,
                        "recipient is on the blocking list",
                    )
                    .for_recipient(recipient.clone()));
                }
                tracing::debug!(recipient = %recipient, "Skipping blocked group member");
                message.set_recipient_state(recipient, RecipientDeliveryState::Skipped);
            } else {
                message.set_recipient_state(recipient, RecipientDeliveryState::Pending);
            }
        }
        self.persist(message).await?;

        let mut upload_attempts = 0;
        if let Some(source) = attachment {
            message.advance(MessageState::Uploading)?;
            self.persist(message).await?;

            let (uploaded, attempts) = self.upload_with_retries(&source, cancel).await?;
            upload_attempts = attempts;
            message.attachments.push(uploaded);
        }

        message.advance(MessageState::Sending)?;
        self.persist(message).await?;

        let mut attempts = 0;
        let mut ignored_failures = Vec::new();
        let mut terminal: Option<SendError> = None;

        loop {
            check_cancelled(cancel)?;
            let pending = message.pending_recipients();
            if pending.is_empty() {
                break;
            }
            attempts += 1;

            let snapshot = &*message;
            let results = join_all(
                pending
                    .iter()
                    .map(|recipient| self.send_to(snapshot, recipient, group_send)),
            )
            .await;

            let mut retryable = None;
            for (recipient, result) in pending.iter().zip(results) {
                match result {
                    Ok(()) => message.set_recipient_state(recipient, RecipientDeliveryState::Sent),
                    Err(error) if error.is_retryable() => retryable = Some(error),
                    Err(error) => {
                        message.set_recipient_state(recipient, RecipientDeliveryState::Failed);
                        if group_send && error.should_be_ignored_for_groups() {
                            ignored_failures.push(error);
                        } else {
                            terminal.get_or_insert(error);
                        }
                    }
                }
            }
            if let Err(e) = self.persist(message).await {
                tracing::warn!(error = %e, "Failed to persist send progress");
            }

            let Some(error) = retryable else {
                break;
            };
            if attempts > self.retry.max_retries() {
                tracing::warn!(attempts, "Retry ceiling reached");
                return Err(terminal.unwrap_or(error));
            }
            metrics::record_retry("send", error.kind().as_str());
            self.retry.back_off(attempts, &error, cancel).await?;
        }

        if let Some(error) = terminal {
            return Err(error);
        }

        message.advance(MessageState::Sent)?;
        if let Err(e) = self.persist(message).await {
            tracing::error!(error = %e, "Message sent but its final state was not persisted");
        }

        Ok(SendReport {
            message_id: message.id,
            thread_id: message.thread_id.clone(),
            attempts,
            upload_attempts,
            delivered: message.recipients_in(RecipientDeliveryState::Sent),
            skipped: message.recipients_in(RecipientDeliveryState::Skipped),
            ignored_failures,
            attachments: message.attachments.clone(),
        })
    }

    async fn upload_with_retries(
        &self,
        source: &AttachmentSource,
        cancel: &CancellationToken,
    ) -> Result<(UploadedAttachmentRef, u32), SendError> {
        let mut attempts = 0;
        loop {
            check_cancelled(cancel)?;
            attempts += 1;

            let failure = match self.uploads.upload(source).await {
                Ok(uploaded) => return Ok((uploaded, attempts)),
                Err(e) => ErrorClassifier::classify_upload(&e),
            };
            if !failure.is_retryable() || attempts > self.retry.max_retries() {
                return Err(failure);
            }
            metrics::record_retry("upload", failure.kind().as_str());
            self.retry.back_off(attempts, &failure, cancel).await?;
        }
    }

    async fn send_to(
        &self,
        message: &OutgoingMessage,
        recipient: &RecipientId,
        group_send: bool,
    ) -> Result<(), SendError> {
        let failure = match self.transport.send(message, recipient).await {
            Ok(()) => {
                metrics::record_send_attempt("ok");
                return Ok(());
            }
            Err(failure) => failure,
        };

        let departed = self.resolver.is_unregistered(recipient).await;
        let error = ErrorClassifier::classify(
            &failure,
            &ClassificationContext {
                recipient,
                recipient_departed: departed,
                group_send,
            },
        );
        metrics::record_send_attempt(error.kind().as_str());
        tracing::debug!(
            recipient = %recipient,
            retryable = error.is_retryable(),
            error = %error,
            "Send attempt failed"
        );

        if error.kind() == SendErrorKind::RecipientUnreachable && !departed {
            if let Err(e) = self.resolver.mark_unregistered(recipient).await {
                tracing::warn!(recipient = %recipient, error = %e, "Failed to mark recipient unregistered");
            }
        }
        Err(error)
    }

    /// Move an unfinished message to `Failed` and persist it.
    async fn abandon(&self, message: &mut OutgoingMessage) {
        for recipient in message.pending_recipients() {
            message.set_recipient_state(&recipient, RecipientDeliveryState::Failed);
        }
        if message.advance(MessageState::Failed).is_err() {
            return;
        }
        if let Err(e) = self.persist(message).await {
            tracing::warn!(error = %e, "Failed to persist failed message state");
        }
    }

    async fn persist(&self, message: &OutgoingMessage) -> Result<(), SendError> {
        with_transaction(self.store.as_ref(), |mut tx| async move {
            let result = KvMessageRepository::save(tx.as_mut(), message).await;
            (tx, result)
        })
        .await
        .map_err(SendError::from)
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), SendError> {
    if cancel.is_cancelled() {
        return Err(SendError::cancelled());
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}
