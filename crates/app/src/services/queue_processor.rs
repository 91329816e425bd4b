//! Queue processor — dispatches due queue items through the email transport.
//!
//! A run claims due items (`scheduled → processing`) in one atomic storage
//! step, renders and sends them concurrently, then records `sent` or
//! `failed` per item. Transport failures are data: they end up on the item
//! and in the summary, never in the returned error.
//!
//! Items a previous run claimed but never resolved (crash, lost write) are
//! failed at the start of a run once their claim is older than the lease.

use std::time::Duration;

use futures::stream::{self, StreamExt};

use mailflow_domain::error::{MailflowError, TransportError, error_chain};
use mailflow_domain::placeholder::Variables;
use mailflow_domain::queue::{ProcessSummary, QueueItem, QueueStatus};
use mailflow_domain::time::{Timestamp, now};

use crate::ports::{EmailTransport, QueueRepository};

/// Tuning knobs of a processing run.
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    /// Maximum number of items claimed per run.
    pub batch_size: usize,
    /// Maximum number of sends in flight.
    pub concurrency: usize,
    pub send_timeout: Duration,
    /// Age after which a `processing` claim counts as interrupted. Must
    /// exceed `send_timeout`.
    pub claim_lease: Duration,
    /// Global template context, filling what the recipient's variables left.
    pub globals: Variables,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            concurrency: 4,
            send_timeout: Duration::from_secs(30),
            claim_lease: Duration::from_secs(600),
            globals: Variables::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Sent,
    Failed,
}

/// Application service processing the email queue.
pub struct QueueProcessor<Q, T> {
    queue: Q,
    transport: T,
    settings: ProcessorSettings,
}

impl<Q, T> QueueProcessor<Q, T>
where
    Q: QueueRepository + Sync,
    T: EmailTransport + Sync,
{
    /// Create a new processor.
    pub fn new(queue: Q, transport: T, settings: ProcessorSettings) -> Self {
        Self {
            queue,
            transport,
            settings,
        }
    }

    /// Process every item due now.
    ///
    /// # Errors
    ///
    /// Returns a storage error if due items cannot be claimed.
    pub async fn process_queue(&self) -> Result<ProcessSummary, MailflowError> {
        self.process_queue_at(now()).await
    }

    /// Process every item due at `now`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if stale claims cannot be recovered or due
    /// items cannot be claimed. Failures of individual sends are recorded on
    /// the items instead.
    #[tracing::instrument(skip(self, now))]
    pub async fn process_queue_at(&self, now: Timestamp) -> Result<ProcessSummary, MailflowError> {
        self.recover_interrupted(now).await?;

        let claimed = self.queue.claim_due(now, self.settings.batch_size).await?;
        if claimed.is_empty() {
            tracing::debug!("no due items");
            return Ok(ProcessSummary::default());
        }

        let processed = claimed.len();
        let outcomes: Vec<Outcome> = stream::iter(claimed)
            .map(|item| self.dispatch(item, now))
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        let sent = outcomes.iter().filter(|o| **o == Outcome::Sent).count();
        let summary = ProcessSummary {
            processed,
            sent,
            failed: processed - sent,
        };
        tracing::info!(
            processed = summary.processed,
            sent = summary.sent,
            failed = summary.failed,
            "queue processed"
        );
        Ok(summary)
    }

    async fn recover_interrupted(&self, now: Timestamp) -> Result<(), MailflowError> {
        let Some(cutoff) = chrono::Duration::from_std(self.settings.claim_lease)
            .ok()
            .and_then(|lease| now.checked_sub_signed(lease))
        else {
            return Ok(());
        };
        let recovered = self.queue.fail_interrupted(cutoff).await?;
        if recovered > 0 {
            tracing::warn!(recovered, "failed items left in processing by an interrupted run");
        }
        Ok(())
    }

    async fn dispatch(&self, mut item: QueueItem, now: Timestamp) -> Outcome {
        let email = item.to_outgoing(&self.settings.globals);
        let timeout = self.settings.send_timeout;
        let result = match tokio::time::timeout(timeout, self.transport.send(&email)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(timeout.as_secs())),
        };

        let (outcome, transition) = match result {
            Ok(()) => (Outcome::Sent, item.mark_sent(now)),
            Err(err) => {
                let detail = error_chain(&err);
                tracing::warn!(
                    item_id = %item.id,
                    to = %item.recipient_email,
                    error = %detail,
                    "send failed"
                );
                (Outcome::Failed, item.mark_failed(now, detail))
            }
        };
        if let Err(err) = transition {
            tracing::error!(item_id = %item.id, error = %err, "claimed item left processing");
            return Outcome::Failed;
        }

        match self.queue.update_if(&item, QueueStatus::Processing).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(item_id = %item.id, "item changed while being sent");
            }
            Err(err) => {
                tracing::error!(
                    item_id = %item.id,
                    error = %error_chain(&err),
                    "failed to record outcome"
                );
            }
        }
        outcome
    }
}
