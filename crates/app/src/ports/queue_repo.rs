//! Queue repository port — persistence for scheduled sends.

use std::future::Future;
use std::sync::Arc;

use mailflow_domain::error::MailflowError;
use mailflow_domain::id::{AutomationId, QueueItemId};
use mailflow_domain::queue::{QueueItem, QueueStats, QueueStatus};
use mailflow_domain::time::Timestamp;

/// Optional filters for listing queue items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFilter {
    pub status: Option<QueueStatus>,
    pub automation_id: Option<AutomationId>,
    pub limit: Option<usize>,
}

impl QueueFilter {
    /// `true` when `item` passes the status and automation filters.
    #[must_use]
    pub fn matches(&self, item: &QueueItem) -> bool {
        self.status.is_none_or(|s| s == item.status)
            && self.automation_id.is_none_or(|id| id == item.automation_id)
    }
}

/// Repository for persisting and querying [`QueueItem`]s.
pub trait QueueRepository {
    /// Insert all items of one enrollment atomically.
    ///
    /// With `one_time` set, nothing is inserted when the recipient already
    /// holds an item of the same automation that counts as an enrollment
    /// (see [`QueueStatus::counts_as_enrolled`]); the check and the insert
    /// are atomic. Nothing is inserted either when the automation no longer
    /// exists or stopped accepting enrollments. Returns the inserted items,
    /// empty when skipped.
    fn enqueue(
        &self,
        items: Vec<QueueItem>,
        one_time: bool,
    ) -> impl Future<Output = Result<Vec<QueueItem>, MailflowError>> + Send;

    /// Get a queue item by its unique identifier.
    fn get_by_id(
        &self,
        id: QueueItemId,
    ) -> impl Future<Output = Result<Option<QueueItem>, MailflowError>> + Send;

    /// List items, most recently scheduled first.
    fn list(
        &self,
        filter: QueueFilter,
    ) -> impl Future<Output = Result<Vec<QueueItem>, MailflowError>> + Send;

    /// Move up to `limit` due items from `scheduled` to `processing` and
    /// return them, earliest first. Concurrent callers never claim the same
    /// item.
    fn claim_due(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<QueueItem>, MailflowError>> + Send;

    /// Mark as `failed` every item still `processing` that was claimed at or
    /// before `claimed_before`, with [`INTERRUPTED`] as error. Returns how
    /// many items were recovered.
    ///
    /// [`INTERRUPTED`]: mailflow_domain::queue::INTERRUPTED
    fn fail_interrupted(
        &self,
        claimed_before: Timestamp,
    ) -> impl Future<Output = Result<u64, MailflowError>> + Send;

    /// Persist `item` only if its stored status is still `expected`.
    ///
    /// Returns `false` when another writer changed the status first.
    fn update_if(
        &self,
        item: &QueueItem,
        expected: QueueStatus,
    ) -> impl Future<Output = Result<bool, MailflowError>> + Send;

    /// Count items per status.
    fn stats(&self) -> impl Future<Output = Result<QueueStats, MailflowError>> + Send;
}

impl<T: QueueRepository + Send + Sync> QueueRepository for Arc<T> {
    fn enqueue(
        &self,
        items: Vec<QueueItem>,
        one_time: bool,
    ) -> impl Future<Output = Result<Vec<QueueItem>, MailflowError>> + Send {
        (**self).enqueue(items, one_time)
    }

    fn get_by_id(
        &self,
        id: QueueItemId,
    ) -> impl Future<Output = Result<Option<QueueItem>, MailflowError>> + Send {
        (**self).get_by_id(id)
    }

    fn list(
        &self,
        filter: QueueFilter,
    ) -> impl Future<Output = Result<Vec<QueueItem>, MailflowError>> + Send {
        (**self).list(filter)
    }

    fn claim_due(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<QueueItem>, MailflowError>> + Send {
        (**self).claim_due(now, limit)
    }

    fn fail_interrupted(
        &self,
        claimed_before: Timestamp,
    ) -> impl Future<Output = Result<u64, MailflowError>> + Send {
        (**self).fail_interrupted(claimed_before)
    }

    fn update_if(
        &self,
        item: &QueueItem,
        expected: QueueStatus,
    ) -> impl Future<Output = Result<bool, MailflowError>> + Send {
        (**self).update_if(item, expected)
    }

    fn stats(&self) -> impl Future<Output = Result<QueueStats, MailflowError>> + Send {
        (**self).stats()
    }
}
