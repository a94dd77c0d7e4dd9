//! Disappearing Config Synchronizer
//!
//! Keeps a thread's stored disappearing-message policy in line with the
//! snapshot embedded in messages passing through the client.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::domain::{DisappearingConfig, ThreadId};
use crate::infrastructure::database::{with_transaction, UnitOfWork};
use crate::infrastructure::repositories::KvDisappearingConfigRepository;
use crate::shared::error::AppError;

/// Result of reconciling a thread against an embedded policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The stored policy was replaced; `previous` is what it replaced.
    Updated { previous: DisappearingConfig },
    Unchanged,
}

pub struct DisappearingConfigSynchronizer {
    store: Arc<dyn UnitOfWork>,
    thread_locks: DashMap<ThreadId, Arc<Mutex<()>>>,
}

impl DisappearingConfigSynchronizer {
    pub fn new(store: Arc<dyn UnitOfWork>) -> Self {
        Self {
            store,
            thread_locks: DashMap::new(),
        }
    }

    /// Stored policy for a thread, or the disabled default.
    pub async fn current(&self, thread_id: &ThreadId) -> Result<DisappearingConfig, AppError> {
        let thread_id = thread_id.clone();
        with_transaction(self.store.as_ref(), |mut tx| async move {
            let result = KvDisappearingConfigRepository::find_by_thread(tx.as_mut(), &thread_id)
                .await
                .map(Option::unwrap_or_default);
            (tx, result)
        })
        .await
    }

    /// Replace the stored policy if `embedded` is strictly newer and differs.
    pub async fn reconcile(
        &self,
        thread_id: &ThreadId,
        embedded: &DisappearingConfig,
    ) -> Result<ReconcileOutcome, AppError> {
        let embedded = *embedded;
        let outcome = {
            let lock = self
                .thread_locks
                .entry(thread_id.clone())
                .or_default()
                .clone();
            let _guard = lock.lock().await;
            self.reconcile_locked(thread_id, embedded).await
        };
        // Drop the lock entry once no other reconcile holds or waits on it.
        self.thread_locks
            .remove_if(thread_id, |_, lock| Arc::strong_count(lock) == 1);
        let outcome = outcome?;

        if let ReconcileOutcome::Updated { previous } = &outcome {
            tracing::info!(
                thread_id = %thread_id,
                enabled = embedded.enabled,
                duration_seconds = embedded.duration_seconds,
                previous_enabled = previous.enabled,
                previous_duration_seconds = previous.duration_seconds,
                "Disappearing message configuration updated"
            );
        }
        Ok(outcome)
    }

    async fn reconcile_locked(
        &self,
        thread_id: &ThreadId,
        embedded: DisappearingConfig,
    ) -> Result<ReconcileOutcome, AppError> {
        let thread = thread_id.clone();
        with_transaction(self.store.as_ref(), |mut tx| async move {
            let result: Result<ReconcileOutcome, AppError> = async {
                let stored = KvDisappearingConfigRepository::find_by_thread(tx.as_mut(), &thread)
                    .await?
                    .unwrap_or_default();

                if !embedded.is_newer_than(&stored) || embedded.same_policy(&stored) {
                    return Ok(ReconcileOutcome::Unchanged);
                }

                KvDisappearingConfigRepository::save(tx.as_mut(), &thread, &embedded).await?;
                Ok(ReconcileOutcome::Updated { previous: stored })
            }
            .await;
            (tx, result)
        })
        .await
    }
}
