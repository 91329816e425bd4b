//! Periodic driver for the [`QueueProcessor`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use mailflow_domain::error::error_chain;

use crate::ports::{EmailTransport, QueueRepository};
use crate::services::queue_processor::QueueProcessor;

/// Calls [`QueueProcessor::process_queue`] every `interval` until shut down.
pub struct QueueWorker<Q, T> {
    processor: Arc<QueueProcessor<Q, T>>,
    interval: Duration,
}

impl<Q, T> QueueWorker<Q, T>
where
    Q: QueueRepository + Send + Sync,
    T: EmailTransport + Send + Sync,
{
    pub fn new(processor: Arc<QueueProcessor<Q, T>>, interval: Duration) -> Self {
        Self {
            processor,
            interval,
        }
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// A run that is still in progress when shutdown is requested completes
    /// first, so claimed items never stay in `processing`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "queue worker started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.processor.process_queue().await {
                        tracing::error!(error = %error_chain(&err), "scheduled queue run failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("queue worker stopped");
    }
}
