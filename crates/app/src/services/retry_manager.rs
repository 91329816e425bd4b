//! Retry manager — manual retry of failed items and cancel of scheduled ones.
//!
//! Both operations load the item, apply the domain transition, and persist
//! it with a compare-and-swap on the status it was loaded with. When another
//! writer wins the race, the error reports the item's fresh status.

use mailflow_domain::error::{InvalidTransitionError, MailflowError, NotFoundError};
use mailflow_domain::id::QueueItemId;
use mailflow_domain::queue::{QueueItem, QueueStatus};
use mailflow_domain::time::{Timestamp, now};

use crate::ports::QueueRepository;

/// Application service for manual queue interventions.
pub struct RetryManager<Q> {
    queue: Q,
}

impl<Q: QueueRepository> RetryManager<Q> {
    /// Create a new manager backed by the given queue repository.
    pub fn new(queue: Q) -> Self {
        Self { queue }
    }

    /// Reschedule a failed item for immediate delivery.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] for an unknown item,
    /// [`MailflowError::InvalidTransition`] unless the item is `failed`, or a
    /// storage error from the repository.
    pub async fn retry(&self, id: QueueItemId) -> Result<QueueItem, MailflowError> {
        self.retry_at(id, now()).await
    }

    /// Same as [`retry`](Self::retry), scheduling the item at `now`.
    ///
    /// # Errors
    ///
    /// See [`retry`](Self::retry).
    #[tracing::instrument(skip(self, now))]
    pub async fn retry_at(
        &self,
        id: QueueItemId,
        now: Timestamp,
    ) -> Result<QueueItem, MailflowError> {
        let mut item = self.load(id).await?;
        let expected = item.status;
        item.retry(now)?;
        self.store(item, expected, "retry").await
    }

    /// Cancel a scheduled item.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] for an unknown item,
    /// [`MailflowError::InvalidTransition`] unless the item is `scheduled`,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, id: QueueItemId) -> Result<QueueItem, MailflowError> {
        let mut item = self.load(id).await?;
        let expected = item.status;
        item.cancel()?;
        self.store(item, expected, "cancel").await
    }

    async fn load(&self, id: QueueItemId) -> Result<QueueItem, MailflowError> {
        self.queue.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Queue item",
                id: id.to_string(),
            }
            .into()
        })
    }

    async fn store(
        &self,
        item: QueueItem,
        expected: QueueStatus,
        action: &'static str,
    ) -> Result<QueueItem, MailflowError> {
        if self.queue.update_if(&item, expected).await? {
            tracing::info!(item_id = %item.id, status = %item.status, "queue item updated");
            return Ok(item);
        }
        let fresh = self.load(item.id).await?;
        Err(InvalidTransitionError {
            action,
            from: fresh.status,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryStore;
    use chrono::Duration;
    use mailflow_domain::id::AutomationId;
    use mailflow_domain::queue::EmailContent;
    use mailflow_domain::recipient::Recipient;
    use std::future::Future;
    use std::sync::Arc;

    fn scheduled_item() -> QueueItem {
        let recipient = Recipient::new("ada@example.com", None).unwrap();
        let ts = now();
        QueueItem::scheduled(
            AutomationId::new(),
            0,
            &recipient,
            EmailContent {
                subject: "Hi".to_string(),
                body_text: "Hello".to_string(),
                body_html: None,
            },
            ts,
            ts,
        )
    }

    fn item_in(status: QueueStatus) -> QueueItem {
        let mut item = scheduled_item();
        match status {
            QueueStatus::Scheduled => {}
            QueueStatus::Cancelled => item.cancel().unwrap(),
            QueueStatus::Processing => item.claim().unwrap(),
            QueueStatus::Sent => {
                item.claim().unwrap();
                item.mark_sent(now()).unwrap();
            }
            QueueStatus::Failed => {
                item.claim().unwrap();
                item.mark_failed(now(), "connection refused").unwrap();
            }
        }
        item
    }

    fn make_manager(
        items: Vec<QueueItem>,
    ) -> (RetryManager<Arc<InMemoryStore>>, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::default());
        for item in items {
            store.insert_item(item);
        }
        (RetryManager::new(Arc::clone(&store)), store)
    }

    #[tokio::test]
    async fn should_reschedule_failed_item_immediately() {
        let failed = item_in(QueueStatus::Failed);
        let id = failed.id;
        let (manager, store) = make_manager(vec![failed]);
        let at = now() + Duration::days(2);

        let item = manager.retry_at(id, at).await.unwrap();
        assert_eq!(item.status, QueueStatus::Scheduled);
        assert_eq!(item.scheduled_for, at);
        assert_eq!(item.retry_count, 1);
        assert!(item.error.is_none());
        assert_eq!(store.item(id), item);
    }

    #[tokio::test]
    async fn should_count_every_retry() {
        let failed = item_in(QueueStatus::Failed);
        let id = failed.id;
        let (manager, store) = make_manager(vec![failed]);

        manager.retry(id).await.unwrap();
        let mut again = store.item(id);
        again.claim().unwrap();
        again.mark_failed(now(), "still down").unwrap();
        store.insert_item(again);

        assert_eq!(manager.retry(id).await.unwrap().retry_count, 2);
    }

    #[tokio::test]
    async fn should_reject_retry_unless_failed() {
        for status in [
            QueueStatus::Scheduled,
            QueueStatus::Processing,
            QueueStatus::Sent,
            QueueStatus::Cancelled,
        ] {
            let item = item_in(status);
            let id = item.id;
            let (manager, store) = make_manager(vec![item.clone()]);

            let result = manager.retry(id).await;
            assert!(
                matches!(
                    result,
                    Err(MailflowError::InvalidTransition(InvalidTransitionError { from, .. }))
                        if from == status
                ),
                "retry from {status} should be rejected"
            );
            assert_eq!(store.item(id), item);
        }
    }

    #[tokio::test]
    async fn should_cancel_scheduled_item() {
        let item = item_in(QueueStatus::Scheduled);
        let id = item.id;
        let (manager, store) = make_manager(vec![item]);

        let cancelled = manager.cancel(id).await.unwrap();
        assert_eq!(cancelled.status, QueueStatus::Cancelled);
        assert_eq!(store.item(id).status, QueueStatus::Cancelled);
    }

    #[tokio::test]
    async fn should_reject_cancel_of_sent_item() {
        let item = item_in(QueueStatus::Sent);
        let id = item.id;
        let (manager, _) = make_manager(vec![item]);

        let result = manager.cancel(id).await;
        assert!(matches!(result, Err(MailflowError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn should_return_not_found_for_unknown_item() {
        let (manager, _) = make_manager(vec![]);
        assert!(matches!(
            manager.retry(QueueItemId::new()).await,
            Err(MailflowError::NotFound(_))
        ));
        assert!(matches!(
            manager.cancel(QueueItemId::new()).await,
            Err(MailflowError::NotFound(_))
        ));
    }

    /// Queue where a processor claims the item between load and write.
    struct RacingQueue {
        inner: Arc<InMemoryStore>,
    }

    impl QueueRepository for RacingQueue {
        fn enqueue(
            &self,
            items: Vec<QueueItem>,
            one_time: bool,
        ) -> impl Future<Output = Result<Vec<QueueItem>, MailflowError>> + Send {
            self.inner.enqueue(items, one_time)
        }

        fn get_by_id(
            &self,
            id: QueueItemId,
        ) -> impl Future<Output = Result<Option<QueueItem>, MailflowError>> + Send {
            QueueRepository::get_by_id(&*self.inner, id)
        }

        fn list(
            &self,
            filter: crate::ports::QueueFilter,
        ) -> impl Future<Output = Result<Vec<QueueItem>, MailflowError>> + Send {
            self.inner.list(filter)
        }

        fn claim_due(
            &self,
            now: Timestamp,
            limit: usize,
        ) -> impl Future<Output = Result<Vec<QueueItem>, MailflowError>> + Send {
            self.inner.claim_due(now, limit)
        }

        fn fail_interrupted(
            &self,
            claimed_before: Timestamp,
        ) -> impl Future<Output = Result<u64, MailflowError>> + Send {
            self.inner.fail_interrupted(claimed_before)
        }

        fn update_if(
            &self,
            item: &QueueItem,
            expected: QueueStatus,
        ) -> impl Future<Output = Result<bool, MailflowError>> + Send {
            let mut stolen = self.inner.item(item.id);
            stolen.status = QueueStatus::Processing;
            self.inner.insert_item(stolen);
            self.inner.update_if(item, expected)
        }

        fn stats(
            &self,
        ) -> impl Future<Output = Result<mailflow_domain::queue::QueueStats, MailflowError>> + Send
        {
            self.inner.stats()
        }
    }

    #[tokio::test]
    async fn should_report_fresh_status_when_losing_a_race() {
        let store = Arc::new(InMemoryStore::default());
        let item = item_in(QueueStatus::Scheduled);
        let id = item.id;
        store.insert_item(item);
        let manager = RetryManager::new(RacingQueue {
            inner: Arc::clone(&store),
        });

        let result = manager.cancel(id).await;
        assert!(matches!(
            result,
            Err(MailflowError::InvalidTransition(InvalidTransitionError {
                from: QueueStatus::Processing,
                ..
            }))
        ));
        assert_eq!(store.item(id).status, QueueStatus::Processing);
    }
}
