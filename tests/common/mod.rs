//! Common Test Utilities
//!
//! Scripted collaborators and a harness that wires them into a
//! [`MessageSender`] backed by the in-memory store.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use courier::application::{Collaborators, MessageSender, RetryPolicy};
use courier::config::AttachmentSettings;
use courier::domain::ports::{
    AttachmentCipher, AttachmentUploader, BlockingList, CipherError, MessageTransport,
    RecipientResolver,
};
use courier::domain::{
    DataSource, DisappearingConfig, EncryptedAttachment, MessageId, MessageState,
    OutgoingMessage, RecipientId, RecipientSet, ThreadId, TransportFailure, UploadError,
    UploadMetadata,
};
use courier::infrastructure::database::MemoryStore;
use courier::shared::{AppError, CancellationToken};

pub fn rid(id: &str) -> RecipientId {
    RecipientId::new(id)
}

pub fn thread() -> ThreadId {
    ThreadId::new("thread-1")
}

pub fn message(body: &str) -> OutgoingMessage {
    OutgoingMessage::new(thread(), body, DisappearingConfig::default())
}

/// Transport that replays a per-recipient script, then succeeds.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<RecipientId, VecDeque<Result<(), TransportFailure>>>>,
    calls: Mutex<HashMap<RecipientId, u32>>,
    attachment_counts: Mutex<Vec<usize>>,
    cancel_on_call: Mutex<Option<CancellationToken>>,
}

impl ScriptedTransport {
    pub fn script(&self, recipient: &str, results: Vec<Result<(), TransportFailure>>) {
        self.scripts
            .lock()
            .entry(rid(recipient))
            .or_default()
            .extend(results);
    }

    /// Fail every attempt for `recipient` with `failure`.
    pub fn always_fail(&self, recipient: &str, failure: TransportFailure) {
        self.script(recipient, vec![Err(failure); 64]);
    }

    /// Cancel `token` as soon as the first send attempt is made.
    pub fn cancel_on_first_call(&self, token: CancellationToken) {
        *self.cancel_on_call.lock() = Some(token);
    }

    pub fn calls(&self, recipient: &str) -> u32 {
        self.calls.lock().get(&rid(recipient)).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().values().sum()
    }

    /// Attachment count of every message seen, in call order.
    pub fn attachment_counts(&self) -> Vec<usize> {
        self.attachment_counts.lock().clone()
    }
}

#[async_trait]
impl MessageTransport for ScriptedTransport {
    async fn send(
        &self,
        message: &OutgoingMessage,
        recipient: &RecipientId,
    ) -> Result<(), TransportFailure> {
        *self.calls.lock().entry(recipient.clone()).or_default() += 1;
        self.attachment_counts.lock().push(message.attachments.len());
        if let Some(token) = self.cancel_on_call.lock().take() {
            token.cancel();
        }

        self.scripts
            .lock()
            .get_mut(recipient)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(()))
    }
}

/// Transport whose every call panics.
pub struct PanickingTransport;

#[async_trait]
impl MessageTransport for PanickingTransport {
    async fn send(&self, _: &OutgoingMessage, _: &RecipientId) -> Result<(), TransportFailure> {
        panic!("transport exploded");
    }
}

/// Uploader that fails with scripted errors, then hands out sequential ids.
#[derive(Default)]
pub struct CountingUploader {
    failures: Mutex<VecDeque<UploadError>>,
    calls: AtomicU32,
    next_id: AtomicU64,
    last_metadata: Mutex<Option<UploadMetadata>>,
}

impl CountingUploader {
    pub fn fail_with(&self, error: UploadError) {
        self.failures.lock().push_back(error);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_metadata(&self) -> Option<UploadMetadata> {
        self.last_metadata.lock().clone()
    }
}

#[async_trait]
impl AttachmentUploader for CountingUploader {
    async fn upload(&self, _: &[u8], metadata: &UploadMetadata) -> Result<u64, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_metadata.lock() = Some(metadata.clone());
        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }
        Ok(1000 + self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

/// Single-byte XOR "cipher"; enough to tell plaintext from ciphertext.
pub struct XorCipher;

impl AttachmentCipher for XorCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedAttachment, CipherError> {
        Ok(EncryptedAttachment {
            ciphertext: plaintext.iter().map(|b| b ^ 0x5a).collect(),
            key: vec![0x5a],
        })
    }
}

/// Resolver with fixed membership that remembers deregistrations.
pub struct StaticResolver {
    members: Vec<RecipientId>,
    unregistered: Mutex<HashSet<RecipientId>>,
}

impl StaticResolver {
    pub fn new(members: &[&str]) -> Self {
        Self {
            members: members.iter().map(|m| rid(m)).collect(),
            unregistered: Mutex::new(HashSet::new()),
        }
    }

    pub fn preset_unregistered(&self, recipient: &str) {
        self.unregistered.lock().insert(rid(recipient));
    }

    pub fn is_marked(&self, recipient: &str) -> bool {
        self.unregistered.lock().contains(&rid(recipient))
    }
}

#[async_trait]
impl RecipientResolver for StaticResolver {
    async fn resolve(&self, _: &ThreadId) -> Result<RecipientSet, AppError> {
        Ok(RecipientSet::new(self.members.clone()))
    }

    async fn is_unregistered(&self, recipient: &RecipientId) -> bool {
        self.unregistered.lock().contains(recipient)
    }

    async fn mark_unregistered(&self, recipient: &RecipientId) -> Result<(), AppError> {
        self.unregistered.lock().insert(recipient.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct BlockList {
    blocked: HashSet<RecipientId>,
}

impl BlockList {
    pub fn new(blocked: &[&str]) -> Self {
        Self {
            blocked: blocked.iter().map(|b| rid(b)).collect(),
        }
    }
}

#[async_trait]
impl BlockingList for BlockList {
    async fn is_blocked(&self, recipient: &RecipientId) -> bool {
        self.blocked.contains(recipient)
    }
}

/// In-memory source that counts deletes and lets a test wait for one.
pub struct CountingDataSource {
    bytes: Vec<u8>,
    deletes: AtomicU32,
    deleted: Notify,
}

impl CountingDataSource {
    pub fn new(bytes: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            bytes: bytes.to_vec(),
            deletes: AtomicU32::new(0),
            deleted: Notify::new(),
        })
    }

    pub fn deletes(&self) -> u32 {
        self.deletes.load(Ordering::SeqCst)
    }

    pub async fn wait_deleted(&self) {
        loop {
            let notified = self.deleted.notified();
            if self.deletes() > 0 {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl DataSource for CountingDataSource {
    async fn size(&self) -> std::io::Result<u64> {
        Ok(self.bytes.len() as u64)
    }

    async fn read(&self) -> std::io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }

    async fn delete(&self) -> std::io::Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.deleted.notify_waiters();
        Ok(())
    }
}

/// A sender wired to scripted collaborators.
pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub uploader: Arc<CountingUploader>,
    pub resolver: Arc<StaticResolver>,
    pub store: MemoryStore,
    pub sender: MessageSender,
}

impl Harness {
    pub fn new(members: &[&str]) -> Self {
        Self::with_options(members, &[], AttachmentSettings::default())
    }

    pub fn with_blocked(members: &[&str], blocked: &[&str]) -> Self {
        Self::with_options(members, blocked, AttachmentSettings::default())
    }

    pub fn with_options(members: &[&str], blocked: &[&str], attachments: AttachmentSettings) -> Self {
        let transport = Arc::new(ScriptedTransport::default());
        Self::build(transport.clone(), transport, members, blocked, attachments)
    }

    /// Harness whose sends go through `transport` instead of the script.
    pub fn with_transport(transport: Arc<dyn MessageTransport>, members: &[&str]) -> Self {
        Self::build(
            Arc::new(ScriptedTransport::default()),
            transport,
            members,
            &[],
            AttachmentSettings::default(),
        )
    }

    fn build(
        scripted: Arc<ScriptedTransport>,
        transport: Arc<dyn MessageTransport>,
        members: &[&str],
        blocked: &[&str],
        attachments: AttachmentSettings,
    ) -> Self {
        courier::telemetry::try_init_test_tracing();

        let uploader = Arc::new(CountingUploader::default());
        let resolver = Arc::new(StaticResolver::new(members));
        let store = MemoryStore::new();

        let sender = MessageSender::with_retry_policy(
            Collaborators {
                transport,
                uploader: uploader.clone(),
                cipher: Arc::new(XorCipher),
                resolver: resolver.clone(),
                blocking: Arc::new(BlockList::new(blocked)),
                store: Arc::new(store.clone()),
            },
            RetryPolicy::default().without_jitter(),
            &attachments,
        );

        Self {
            transport: scripted,
            uploader,
            resolver,
            store,
            sender,
        }
    }

    /// Message record as last committed by the sender.
    pub fn stored(&self, id: &MessageId) -> Option<OutgoingMessage> {
        self.store
            .committed("outgoing_messages", &id.to_string())
            .map(|value| serde_json::from_value(value).expect("stored message should decode"))
    }

    pub fn stored_state(&self, id: &MessageId) -> Option<MessageState> {
        self.stored(id).map(|message| message.state)
    }
}
