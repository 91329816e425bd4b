//! Read-only views over the queue for the admin client.

use mailflow_domain::error::{MailflowError, NotFoundError};
use mailflow_domain::id::QueueItemId;
use mailflow_domain::queue::{QueueItem, QueueStats};

use crate::ports::{QueueFilter, QueueRepository};

/// Largest page returned by [`QueueInspector::list`].
pub const MAX_LIST_LIMIT: usize = 500;

pub struct QueueInspector<Q> {
    queue: Q,
}

impl<Q: QueueRepository> QueueInspector<Q> {
    pub fn new(queue: Q) -> Self {
        Self { queue }
    }

    /// Count items per status.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn stats(&self) -> Result<QueueStats, MailflowError> {
        self.queue.stats().await
    }

    /// List items matching `filter`, capped at [`MAX_LIST_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list(&self, mut filter: QueueFilter) -> Result<Vec<QueueItem>, MailflowError> {
        filter.limit = Some(filter.limit.map_or(MAX_LIST_LIMIT, |l| l.min(MAX_LIST_LIMIT)));
        self.queue.list(filter).await
    }

    /// Look up one item.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] when no item with `id` exists, or
    /// a storage error from the repository.
    pub async fn get(&self, id: QueueItemId) -> Result<QueueItem, MailflowError> {
        self.queue.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Queue item",
                id: id.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::queue_scheduler::QueueScheduler;
    use crate::testing::InMemoryStore;
    use mailflow_domain::automation::{Automation, EmailTemplate};
    use mailflow_domain::queue::QueueStatus;
    use mailflow_domain::recipient::Recipient;
    use std::sync::Arc;

    fn automation(name: &str) -> Automation {
        Automation::builder()
            .name(name)
            .template(EmailTemplate {
                subject: "Hi".to_string(),
                body_text: "Hello".to_string(),
                ..EmailTemplate::default()
            })
            .build()
            .unwrap()
    }

    async fn seeded() -> (QueueInspector<Arc<InMemoryStore>>, Arc<InMemoryStore>, Automation) {
        let store = Arc::new(InMemoryStore::default());
        let scheduler = QueueScheduler::new(Arc::clone(&store));
        let a = automation("A");
        let b = automation("B");
        for email in ["one@example.com", "two@example.com"] {
            let r = Recipient::new(email, None).unwrap();
            scheduler.enroll(&a, &r).await.unwrap();
            scheduler.enroll(&b, &r).await.unwrap();
        }
        (QueueInspector::new(Arc::clone(&store)), store, a)
    }

    #[tokio::test]
    async fn should_filter_by_automation_and_status() {
        let (inspector, store, a) = seeded().await;
        let mut cancelled = store.items()[0].clone();
        cancelled.cancel().unwrap();
        store.insert_item(cancelled.clone());

        let for_a = inspector
            .list(QueueFilter {
                automation_id: Some(a.id),
                ..QueueFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(for_a.len(), 2);
        assert!(for_a.iter().all(|i| i.automation_id == a.id));

        let only_cancelled = inspector
            .list(QueueFilter {
                status: Some(QueueStatus::Cancelled),
                ..QueueFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(only_cancelled, vec![cancelled]);
    }

    #[tokio::test]
    async fn should_apply_limit() {
        let (inspector, _, _) = seeded().await;
        let page = inspector
            .list(QueueFilter {
                limit: Some(3),
                ..QueueFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 3);
    }

    #[tokio::test]
    async fn should_report_stats_per_status() {
        let (inspector, _, _) = seeded().await;
        let stats = inspector.stats().await.unwrap();
        assert_eq!(stats.scheduled, 4);
        assert_eq!(stats.sent + stats.failed + stats.cancelled + stats.processing, 0);
    }

    #[tokio::test]
    async fn should_return_not_found_for_unknown_item() {
        let (inspector, _, _) = seeded().await;
        assert!(matches!(
            inspector.get(QueueItemId::new()).await,
            Err(MailflowError::NotFound(_))
        ));
    }
}
