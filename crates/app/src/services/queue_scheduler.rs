//! Queue scheduler — turns one enrollment into scheduled queue items.

use mailflow_domain::automation::{Automation, AutomationContent, EmailTemplate};
use mailflow_domain::error::{MailflowError, ValidationError};
use mailflow_domain::placeholder::{Variables, render};
use mailflow_domain::queue::{EmailContent, QueueItem};
use mailflow_domain::recipient::Recipient;
use mailflow_domain::time::{Timestamp, after_delay, now};

use crate::ports::QueueRepository;

/// Application service scheduling the emails of an enrollment.
pub struct QueueScheduler<Q> {
    queue: Q,
}

impl<Q: QueueRepository> QueueScheduler<Q> {
    /// Create a new scheduler backed by the given queue repository.
    pub fn new(queue: Q) -> Self {
        Self { queue }
    }

    /// Enroll `recipient` in `automation` as of now.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::Validation`] when a delay is out of range, or
    /// a storage error propagated from the repository.
    pub async fn enroll(
        &self,
        automation: &Automation,
        recipient: &Recipient,
    ) -> Result<Vec<QueueItem>, MailflowError> {
        self.enroll_at(automation, recipient, now()).await
    }

    /// Enroll `recipient` in `automation`, treating `now` as enrollment time.
    ///
    /// Returns the created items, or an empty list when the automation is
    /// one-time-per-recipient and the recipient is already enrolled, or when
    /// the automation stopped accepting enrollments in the meantime.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::Validation`] when a delay is out of range, or
    /// a storage error propagated from the repository.
    #[tracing::instrument(
        skip(self, automation, recipient, now),
        fields(automation_id = %automation.id, email = %recipient.email)
    )]
    pub async fn enroll_at(
        &self,
        automation: &Automation,
        recipient: &Recipient,
        now: Timestamp,
    ) -> Result<Vec<QueueItem>, MailflowError> {
        let items = build_items(automation, recipient, now)?;
        let inserted = self
            .queue
            .enqueue(items, automation.one_time_per_recipient)
            .await?;
        if inserted.is_empty() {
            tracing::debug!("recipient already enrolled or automation inactive, skipping");
        } else {
            tracing::info!(items = inserted.len(), "recipient enrolled");
        }
        Ok(inserted)
    }
}

/// Build the queue items of one enrollment without persisting them.
///
/// Every item is due at `now` plus its own delay; sequence delays are
/// independent of each other.
///
/// # Errors
///
/// Returns [`ValidationError::DelayTooLong`] when a delay is out of range.
pub fn build_items(
    automation: &Automation,
    recipient: &Recipient,
    now: Timestamp,
) -> Result<Vec<QueueItem>, ValidationError> {
    let variables = recipient.template_variables();
    match &automation.content {
        AutomationContent::Template(template) => {
            let due = after_delay(now, template.send_delay_days, template.send_delay_hours)?;
            let cta = cta_scope(template, &variables);
            let content = template_content(template).render(&[&variables, &cta]);
            Ok(vec![QueueItem::scheduled(
                automation.id,
                0,
                recipient,
                content,
                due,
                now,
            )])
        }
        AutomationContent::Sequence { steps } => steps
            .iter()
            .map(|step| {
                let due = after_delay(now, step.delay_days, step.delay_hours)?;
                let content = EmailContent {
                    subject: step.subject.clone(),
                    body_text: step.body.clone(),
                    body_html: None,
                }
                .render(&[&variables]);
                Ok(QueueItem::scheduled(
                    automation.id,
                    step.order,
                    recipient,
                    content,
                    due,
                    now,
                ))
            })
            .collect(),
    }
}

fn template_content(template: &EmailTemplate) -> EmailContent {
    EmailContent {
        subject: template.subject.clone(),
        body_text: template.compose_text(),
        body_html: template.body_html.clone(),
    }
}

/// `cta_url` exposed as a variable, itself rendered with the recipient's.
fn cta_scope(template: &EmailTemplate, variables: &Variables) -> Variables {
    template
        .cta_url
        .iter()
        .map(|url| ("cta_url".to_string(), render(url, &[variables])))
        .collect()
}
