//! In-memory port fakes shared by the service tests and, through the
//! `testing` feature, by the adapters' tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use mailflow_domain::automation::{Automation, Trigger};
use mailflow_domain::error::{MailflowError, NotFoundError, TransportError};
use mailflow_domain::id::{AutomationId, QueueItemId};
use mailflow_domain::queue::{INTERRUPTED, OutgoingEmail, QueueItem, QueueStats, QueueStatus};
use mailflow_domain::time::Timestamp;

use crate::ports::{AutomationRepository, EmailTransport, QueueFilter, QueueRepository};

/// Automations and queue items behind one lock each, like two tables of
/// one database.
#[derive(Default)]
pub struct InMemoryStore {
    automations: Mutex<HashMap<AutomationId, Automation>>,
    items: Mutex<HashMap<QueueItemId, QueueItem>>,
    claimed_at: Mutex<HashMap<QueueItemId, Timestamp>>,
}

impl InMemoryStore {
    pub fn with_automations(automations: Vec<Automation>) -> Self {
        let store = Self::default();
        {
            let mut map = store.automations.lock().unwrap();
            for a in automations {
                map.insert(a.id, a);
            }
        }
        store
    }

    pub fn insert_item(&self, item: QueueItem) {
        self.items.lock().unwrap().insert(item.id, item);
    }

    pub fn item(&self, id: QueueItemId) -> QueueItem {
        self.items.lock().unwrap()[&id].clone()
    }

    pub fn items(&self) -> Vec<QueueItem> {
        let mut items: Vec<QueueItem> = self.items.lock().unwrap().values().cloned().collect();
        items.sort_by_key(|i| (i.scheduled_for, i.step_order));
        items
    }

    fn cancel_scheduled(&self, automation_id: AutomationId) -> u64 {
        let mut items = self.items.lock().unwrap();
        let mut cancelled = 0;
        for item in items.values_mut() {
            if item.automation_id == automation_id && item.status == QueueStatus::Scheduled {
                item.status = QueueStatus::Cancelled;
                cancelled += 1;
            }
        }
        cancelled
    }
}

impl AutomationRepository for InMemoryStore {
    fn create(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, MailflowError>> + Send {
        let mut store = self.automations.lock().unwrap();
        store.insert(automation.id, automation.clone());
        async { Ok(automation) }
    }

    fn get_by_id(
        &self,
        id: AutomationId,
    ) -> impl Future<Output = Result<Option<Automation>, MailflowError>> + Send {
        let store = self.automations.lock().unwrap();
        let result = store.get(&id).cloned();
        async { Ok(result) }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Automation>, MailflowError>> + Send {
        let store = self.automations.lock().unwrap();
        let mut result: Vec<Automation> = store.values().cloned().collect();
        result.sort_by_key(|a| a.created_at);
        async { Ok(result) }
    }

    fn get_accepting(
        &self,
        trigger: Trigger,
    ) -> impl Future<Output = Result<Vec<Automation>, MailflowError>> + Send {
        let store = self.automations.lock().unwrap();
        let result: Vec<Automation> = store
            .values()
            .filter(|a| a.trigger == trigger && a.is_accepting())
            .cloned()
            .collect();
        async { Ok(result) }
    }

    fn update(
        &self,
        automation: Automation,
        cancel_scheduled: bool,
    ) -> impl Future<Output = Result<u64, MailflowError>> + Send {
        let id = automation.id;
        let found = {
            let mut store = self.automations.lock().unwrap();
            store.insert(automation.id, automation).is_some()
        };
        let result = if !found {
            Err(NotFoundError {
                entity: "Automation",
                id: id.to_string(),
            }
            .into())
        } else if cancel_scheduled {
            Ok(self.cancel_scheduled(id))
        } else {
            Ok(0)
        };
        async { result }
    }

    fn delete(&self, id: AutomationId) -> impl Future<Output = Result<u64, MailflowError>> + Send {
        self.automations.lock().unwrap().remove(&id);
        let cancelled = self.cancel_scheduled(id);
        async move { Ok(cancelled) }
    }
}

impl QueueRepository for InMemoryStore {
    fn enqueue(
        &self,
        items: Vec<QueueItem>,
        one_time: bool,
    ) -> impl Future<Output = Result<Vec<QueueItem>, MailflowError>> + Send {
        let mut store = self.items.lock().unwrap();
        let already_enrolled = one_time
            && items.first().is_some_and(|first| {
                store.values().any(|existing| {
                    existing.automation_id == first.automation_id
                        && existing.recipient_email == first.recipient_email
                        && existing.status.counts_as_enrolled()
                })
            });
        let inserted = if already_enrolled {
            Vec::new()
        } else {
            for item in &items {
                store.insert(item.id, item.clone());
            }
            items
        };
        async { Ok(inserted) }
    }

    fn get_by_id(
        &self,
        id: QueueItemId,
    ) -> impl Future<Output = Result<Option<QueueItem>, MailflowError>> + Send {
        let result = self.items.lock().unwrap().get(&id).cloned();
        async { Ok(result) }
    }

    fn list(
        &self,
        filter: QueueFilter,
    ) -> impl Future<Output = Result<Vec<QueueItem>, MailflowError>> + Send {
        let mut result: Vec<QueueItem> = self
            .items()
            .into_iter()
            .rev()
            .filter(|i| filter.matches(i))
            .collect();
        if let Some(limit) = filter.limit {
            result.truncate(limit);
        }
        async { Ok(result) }
    }

    fn claim_due(
        &self,
        now: Timestamp,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<QueueItem>, MailflowError>> + Send {
        let mut store = self.items.lock().unwrap();
        let mut due: Vec<&mut QueueItem> = store.values_mut().filter(|i| i.is_due(now)).collect();
        due.sort_by_key(|i| i.scheduled_for);
        let claimed: Vec<QueueItem> = due
            .into_iter()
            .take(limit)
            .map(|item| {
                item.status = QueueStatus::Processing;
                item.clone()
            })
            .collect();
        let mut claimed_at = self.claimed_at.lock().unwrap();
        for item in &claimed {
            claimed_at.insert(item.id, now);
        }
        async { Ok(claimed) }
    }

    fn fail_interrupted(
        &self,
        claimed_before: Timestamp,
    ) -> impl Future<Output = Result<u64, MailflowError>> + Send {
        let mut store = self.items.lock().unwrap();
        let claimed_at = self.claimed_at.lock().unwrap();
        let mut recovered = 0;
        for item in store.values_mut() {
            let at = claimed_at.get(&item.id).copied();
            if item.status == QueueStatus::Processing && at.is_none_or(|at| at <= claimed_before)
            {
                item.mark_failed(at.unwrap_or(claimed_before), INTERRUPTED)
                    .unwrap();
                recovered += 1;
            }
        }
        async move { Ok(recovered) }
    }

    fn update_if(
        &self,
        item: &QueueItem,
        expected: QueueStatus,
    ) -> impl Future<Output = Result<bool, MailflowError>> + Send {
        let mut store = self.items.lock().unwrap();
        let swapped = match store.get_mut(&item.id) {
            Some(stored) if stored.status == expected => {
                *stored = item.clone();
                true
            }
            _ => false,
        };
        async move { Ok(swapped) }
    }

    fn stats(&self) -> impl Future<Output = Result<QueueStats, MailflowError>> + Send {
        let stats: QueueStats = self.items.lock().unwrap().values().map(|i| i.status).collect();
        async move { Ok(stats) }
    }
}

/// Records every message; fails for addresses listed in `rejected`.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    pub rejected: Vec<String>,
}

impl RecordingTransport {
    pub fn rejecting(addresses: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            rejected: addresses.iter().map(|a| (*a).to_string()).collect(),
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

impl EmailTransport for RecordingTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        if self.rejected.contains(&email.to) {
            return Err(TransportError::Delivery(Box::new(std::io::Error::other(
                "550 mailbox unavailable",
            ))));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
