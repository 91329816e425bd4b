//! Trigger router — reacts to domain events by enrolling recipients.
//!
//! For each incoming event the router loads the enabled, active automations
//! bound to the matching trigger and enrolls the payload's recipient in each
//! of them. A failure for one automation is logged and never prevents the
//! others from enrolling.

use mailflow_domain::automation::{Automation, Trigger};
use mailflow_domain::error::{MailflowError, NotFoundError, ValidationError, error_chain};
use mailflow_domain::event::Event;
use mailflow_domain::id::AutomationId;
use mailflow_domain::queue::QueueItem;
use mailflow_domain::recipient::Recipient;
use mailflow_domain::time::{Timestamp, now};

use crate::ports::{AutomationRepository, QueueRepository};
use crate::services::queue_scheduler::QueueScheduler;

/// Routes events and manual enrollments to the [`QueueScheduler`].
pub struct TriggerRouter<A, Q> {
    automations: A,
    scheduler: QueueScheduler<Q>,
}

impl<A, Q> TriggerRouter<A, Q>
where
    A: AutomationRepository,
    Q: QueueRepository,
{
    /// Create a new router.
    pub fn new(automations: A, queue: Q) -> Self {
        Self {
            automations,
            scheduler: QueueScheduler::new(queue),
        }
    }

    /// Route `event` to every matching automation.
    ///
    /// Returns the ids of the automations that scheduled at least one email.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the matching automations cannot be loaded.
    /// Per-automation failures are logged instead.
    pub async fn on_event(&self, event: &Event) -> Result<Vec<AutomationId>, MailflowError> {
        self.on_event_at(event, now()).await
    }

    /// Same as [`on_event`](Self::on_event), with an explicit enrollment time.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the matching automations cannot be loaded.
    #[tracing::instrument(
        skip(self, event, now),
        fields(event_id = %event.id, event_type = %event.event_type)
    )]
    pub async fn on_event_at(
        &self,
        event: &Event,
        now: Timestamp,
    ) -> Result<Vec<AutomationId>, MailflowError> {
        let automations = self
            .automations
            .get_accepting(Trigger::from(event.event_type))
            .await?;
        if automations.is_empty() {
            tracing::debug!("no automation matches event");
            return Ok(Vec::new());
        }

        let recipient = Recipient::from_payload(&event.payload);
        let mut enrolled = Vec::new();

        for automation in &automations {
            let recipient = match &recipient {
                Ok(recipient) => recipient,
                Err(err) => {
                    tracing::warn!(
                        automation_id = %automation.id,
                        error = %err,
                        "cannot enroll from event payload"
                    );
                    continue;
                }
            };

            match self.scheduler.enroll_at(automation, recipient, now).await {
                Ok(items) if items.is_empty() => {}
                Ok(_) => enrolled.push(automation.id),
                Err(err) => {
                    tracing::warn!(
                        automation_id = %automation.id,
                        error = %error_chain(&err),
                        "enrollment failed"
                    );
                }
            }
        }

        tracing::info!(
            matched = automations.len(),
            enrolled = enrolled.len(),
            "event routed"
        );
        Ok(enrolled)
    }

    /// Enroll `recipient` in one automation directly, whatever its trigger.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::NotFound`] for an unknown automation,
    /// [`ValidationError::AutomationInactive`] when it is paused or disabled,
    /// or a storage error from the repositories.
    #[tracing::instrument(skip(self, recipient), fields(email = %recipient.email))]
    pub async fn enroll(
        &self,
        id: AutomationId,
        recipient: &Recipient,
    ) -> Result<Vec<QueueItem>, MailflowError> {
        let automation = self.accepting_automation(id).await?;
        self.scheduler.enroll(&automation, recipient).await
    }

    async fn accepting_automation(&self, id: AutomationId) -> Result<Automation, MailflowError> {
        let automation = self
            .automations
            .get_by_id(id)
            .await?
            .ok_or_else(|| NotFoundError {
                entity: "Automation",
                id: id.to_string(),
            })?;
        if !automation.is_accepting() {
            return Err(ValidationError::AutomationInactive { id: id.to_string() }.into());
        }
        Ok(automation)
    }
}
