//! Automation repository port — persistence for automations.

use std::future::Future;
use std::sync::Arc;

use mailflow_domain::automation::{Automation, Trigger};
use mailflow_domain::error::MailflowError;
use mailflow_domain::id::AutomationId;

/// Repository for persisting and querying [`Automation`]s.
///
/// Implementations share storage with the [`QueueRepository`](super::QueueRepository):
/// deactivating or deleting an automation cancels its scheduled queue items
/// in the same transaction as the definition change.
pub trait AutomationRepository {
    /// Create a new automation in storage.
    fn create(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, MailflowError>> + Send;

    /// Get an automation by its unique identifier.
    fn get_by_id(
        &self,
        id: AutomationId,
    ) -> impl Future<Output = Result<Option<Automation>, MailflowError>> + Send;

    /// Get all automations.
    fn get_all(&self) -> impl Future<Output = Result<Vec<Automation>, MailflowError>> + Send;

    /// Get the enabled, active automations bound to `trigger`.
    fn get_accepting(
        &self,
        trigger: Trigger,
    ) -> impl Future<Output = Result<Vec<Automation>, MailflowError>> + Send;

    /// Replace an existing automation.
    ///
    /// When `cancel_scheduled` is set, every `scheduled` queue item of the
    /// automation is cancelled in the same transaction. Returns the number of
    /// cancelled items.
    fn update(
        &self,
        automation: Automation,
        cancel_scheduled: bool,
    ) -> impl Future<Output = Result<u64, MailflowError>> + Send;

    /// Delete an automation and cancel its scheduled queue items in one
    /// transaction. Returns the number of cancelled items.
    fn delete(&self, id: AutomationId) -> impl Future<Output = Result<u64, MailflowError>> + Send;
}

impl<T: AutomationRepository + Send + Sync> AutomationRepository for Arc<T> {
    fn create(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, MailflowError>> + Send {
        (**self).create(automation)
    }

    fn get_by_id(
        &self,
        id: AutomationId,
    ) -> impl Future<Output = Result<Option<Automation>, MailflowError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Automation>, MailflowError>> + Send {
        (**self).get_all()
    }

    fn get_accepting(
        &self,
        trigger: Trigger,
    ) -> impl Future<Output = Result<Vec<Automation>, MailflowError>> + Send {
        (**self).get_accepting(trigger)
    }

    fn update(
        &self,
        automation: Automation,
        cancel_scheduled: bool,
    ) -> impl Future<Output = Result<u64, MailflowError>> + Send {
        (**self).update(automation, cancel_scheduled)
    }

    fn delete(&self, id: AutomationId) -> impl Future<Output = Result<u64, MailflowError>> + Send {
        (**self).delete(id)
    }
}
