//! Queue — scheduled sends and their status lifecycle.
//!
//! ```text
//! scheduled ──claim──▶ processing ──▶ sent
//!     │  ▲                  │
//!     │  └──── retry ──── failed ◀┘
//!     └──cancel──▶ cancelled
//! ```
//!
//! `sent` and `cancelled` are terminal. `failed` can be retried any number
//! of times, always manually. An item whose run was interrupted while
//! `processing` is failed with [`INTERRUPTED`] once its claim goes stale.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{InvalidTransitionError, ValidationError};
use crate::id::{AutomationId, QueueItemId};
use crate::placeholder::{Variables, render};
use crate::recipient::Recipient;
use crate::time::Timestamp;

/// Error recorded on items recovered from an interrupted run.
pub const INTERRUPTED: &str = "processing interrupted";

/// Status of a [`QueueItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Scheduled,
    /// Claimed by a processor; resolves to `Sent` or `Failed`.
    Processing,
    Sent,
    Failed,
    Cancelled,
}

impl QueueStatus {
    pub const ALL: [Self; 5] = [
        Self::Scheduled,
        Self::Processing,
        Self::Sent,
        Self::Failed,
        Self::Cancelled,
    ];

    /// Stable `snake_case` name, identical to the serde representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Processing => "processing",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// `true` for states no transition leaves.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Cancelled)
    }

    /// `true` when an item in this state counts as an enrollment for the
    /// one-time-per-recipient policy.
    #[must_use]
    pub fn counts_as_enrolled(self) -> bool {
        matches!(self, Self::Scheduled | Self::Processing | Self::Sent)
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidStatus(s.to_string()))
    }
}

/// Rendered subject and bodies of one email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailContent {
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
}

impl EmailContent {
    /// Substitute placeholders in every part, searching `scopes` in order.
    #[must_use]
    pub fn render(&self, scopes: &[&Variables]) -> Self {
        Self {
            subject: render(&self.subject, scopes),
            body_text: render(&self.body_text, scopes),
            body_html: self.body_html.as_deref().map(|html| render(html, scopes)),
        }
    }
}

/// One scheduled send to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: QueueItemId,
    pub automation_id: AutomationId,
    /// `0` for template automations, the step's `order` for sequences.
    pub step_order: u32,
    pub recipient_email: String,
    pub recipient_name: Option<String>,
    #[serde(flatten)]
    pub content: EmailContent,
    /// Recipient variables captured at enrollment.
    pub variables: Variables,
    pub scheduled_for: Timestamp,
    pub status: QueueStatus,
    pub error: Option<String>,
    pub retry_count: u32,
    pub last_attempt: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl QueueItem {
    /// Create a freshly scheduled item.
    #[must_use]
    pub fn scheduled(
        automation_id: AutomationId,
        step_order: u32,
        recipient: &Recipient,
        content: EmailContent,
        scheduled_for: Timestamp,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: QueueItemId::new(),
            automation_id,
            step_order,
            recipient_email: recipient.email.clone(),
            recipient_name: recipient.name.clone(),
            content,
            variables: recipient.template_variables(),
            scheduled_for,
            status: QueueStatus::Scheduled,
            error: None,
            retry_count: 0,
            last_attempt: None,
            created_at,
        }
    }

    /// Scheduled and not in the future.
    #[must_use]
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.status == QueueStatus::Scheduled && self.scheduled_for <= now
    }

    /// `scheduled → processing`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransitionError`] unless the item is scheduled.
    pub fn claim(&mut self) -> Result<(), InvalidTransitionError> {
        self.expect(QueueStatus::Scheduled, "claim")?;
        self.status = QueueStatus::Processing;
        Ok(())
    }

    /// `processing → sent`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransitionError`] unless the item is processing.
    pub fn mark_sent(&mut self, now: Timestamp) -> Result<(), InvalidTransitionError> {
        self.expect(QueueStatus::Processing, "mark as sent")?;
        self.status = QueueStatus::Sent;
        self.error = None;
        self.last_attempt = Some(now);
        Ok(())
    }

    /// `processing → failed`, keeping `retry_count` as is.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransitionError`] unless the item is processing.
    pub fn mark_failed(
        &mut self,
        now: Timestamp,
        error: impl Into<String>,
    ) -> Result<(), InvalidTransitionError> {
        self.expect(QueueStatus::Processing, "mark as failed")?;
        self.status = QueueStatus::Failed;
        self.error = Some(error.into());
        self.last_attempt = Some(now);
        Ok(())
    }

    /// `failed → scheduled`, due immediately.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransitionError`] unless the item has failed.
    pub fn retry(&mut self, now: Timestamp) -> Result<(), InvalidTransitionError> {
        self.expect(QueueStatus::Failed, "retry")?;
        self.status = QueueStatus::Scheduled;
        self.scheduled_for = now;
        self.retry_count += 1;
        self.error = None;
        Ok(())
    }

    /// `scheduled → cancelled`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransitionError`] unless the item is scheduled.
    pub fn cancel(&mut self) -> Result<(), InvalidTransitionError> {
        self.expect(QueueStatus::Scheduled, "cancel")?;
        self.status = QueueStatus::Cancelled;
        Ok(())
    }

    /// Build the outgoing message.
    ///
    /// The content was rendered with the recipient's variables at
    /// enrollment, so only `globals` fill what is left; recipient values are
    /// never expanded a second time.
    #[must_use]
    pub fn to_outgoing(&self, globals: &Variables) -> OutgoingEmail {
        let content = self.content.render(&[globals]);
        OutgoingEmail {
            to: self.recipient_email.clone(),
            to_name: self.recipient_name.clone(),
            subject: content.subject,
            text: content.body_text,
            html: content.body_html,
        }
    }

    fn expect(
        &self,
        expected: QueueStatus,
        action: &'static str,
    ) -> Result<(), InvalidTransitionError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(InvalidTransitionError {
                action,
                from: self.status,
            })
        }
    }
}

/// A fully rendered email handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

/// Item counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub scheduled: u64,
    pub processing: u64,
    pub sent: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl QueueStats {
    /// Add `count` items of `status`.
    pub fn add(&mut self, status: QueueStatus, count: u64) {
        let slot = match status {
            QueueStatus::Scheduled => &mut self.scheduled,
            QueueStatus::Processing => &mut self.processing,
            QueueStatus::Sent => &mut self.sent,
            QueueStatus::Failed => &mut self.failed,
            QueueStatus::Cancelled => &mut self.cancelled,
        };
        *slot += count;
    }
}

impl FromIterator<QueueStatus> for QueueStats {
    fn from_iter<I: IntoIterator<Item = QueueStatus>>(iter: I) -> Self {
        let mut stats = Self::default();
        for status in iter {
            stats.add(status, 1);
        }
        stats
    }
}

/// Outcome of one processing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub processed: usize,
    pub sent: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now;
    use chrono::Duration;

    fn item() -> QueueItem {
        let recipient = Recipient::new("ada@example.com", Some("Ada Lovelace".to_string()))
            .unwrap()
            .with_variables([("order_id".to_string(), "42".to_string())]);
        let ts = now();
        QueueItem::scheduled(
            AutomationId::new(),
            0,
            &recipient,
            EmailContent {
                subject: "Order {{order_id}}".to_string(),
                body_text: "Hi {{customer_first_name}}, {{cart_recovery_url}}".to_string(),
                body_html: Some("<p>{{site_name}}</p>".to_string()),
            },
            ts,
            ts,
        )
    }

    fn failed_item() -> QueueItem {
        let mut item = item();
        item.claim().unwrap();
        item.mark_failed(now(), "smtp down").unwrap();
        item
    }

    #[test]
    fn should_be_due_only_when_scheduled_and_not_in_future() {
        let mut item = item();
        let at = item.scheduled_for;
        assert!(item.is_due(at));
        assert!(!item.is_due(at - Duration::seconds(1)));

        item.claim().unwrap();
        assert!(!item.is_due(at));
    }

    #[test]
    fn should_mark_sent_after_claim() {
        let mut item = item();
        let ts = now();
        item.claim().unwrap();
        item.mark_sent(ts).unwrap();
        assert_eq!(item.status, QueueStatus::Sent);
        assert_eq!(item.last_attempt, Some(ts));
        assert!(item.error.is_none());
    }

    #[test]
    fn should_not_mark_sent_without_claim() {
        let mut item = item();
        let err = item.mark_sent(now()).unwrap_err();
        assert_eq!(err.from, QueueStatus::Scheduled);
    }

    #[test]
    fn should_keep_retry_count_when_marking_failed() {
        let item = failed_item();
        assert_eq!(item.status, QueueStatus::Failed);
        assert_eq!(item.error.as_deref(), Some("smtp down"));
        assert_eq!(item.retry_count, 0);
        assert!(item.last_attempt.is_some());
    }

    #[test]
    fn should_reschedule_failed_item_on_retry() {
        let mut item = failed_item();
        let ts = now() + Duration::hours(5);
        item.retry(ts).unwrap();
        assert_eq!(item.status, QueueStatus::Scheduled);
        assert_eq!(item.scheduled_for, ts);
        assert_eq!(item.retry_count, 1);
        assert!(item.error.is_none());
    }

    #[test]
    fn should_reject_retry_of_sent_cancelled_and_scheduled_items() {
        let mut sent = item();
        sent.claim().unwrap();
        sent.mark_sent(now()).unwrap();
        assert!(sent.retry(now()).is_err());

        let mut cancelled = item();
        cancelled.cancel().unwrap();
        assert!(cancelled.retry(now()).is_err());

        let mut scheduled = item();
        let err = scheduled.retry(now()).unwrap_err();
        assert_eq!(err.action, "retry");
        assert_eq!(err.from, QueueStatus::Scheduled);
    }

    #[test]
    fn should_cancel_only_scheduled_items() {
        let mut scheduled = item();
        scheduled.cancel().unwrap();
        assert_eq!(scheduled.status, QueueStatus::Cancelled);
        assert!(scheduled.cancel().is_err());

        let mut failed = failed_item();
        assert!(failed.cancel().is_err());
    }

    #[test]
    fn should_fill_remaining_placeholders_from_globals() {
        let item = item();
        let mut globals = Variables::new();
        globals.insert("site_name".to_string(), "The Studio".to_string());

        let email = item.to_outgoing(&globals);
        assert_eq!(email.to, "ada@example.com");
        assert_eq!(email.subject, "Order {{order_id}}");
        assert_eq!(email.text, "Hi {{customer_first_name}}, {{cart_recovery_url}}");
        assert_eq!(email.html.as_deref(), Some("<p>The Studio</p>"));
    }

    #[test]
    fn should_not_expand_recipient_values_again_when_dispatching() {
        // enrollment already substituted a name that itself looks like a token
        let mut item = item();
        item.content.subject = "Thanks {{order_id}}".to_string();
        assert_eq!(item.variables["order_id"], "42");

        let email = item.to_outgoing(&Variables::new());
        assert_eq!(email.subject, "Thanks {{order_id}}");
    }

    #[test]
    fn should_count_statuses_into_stats() {
        let stats: QueueStats = [
            QueueStatus::Sent,
            QueueStatus::Sent,
            QueueStatus::Failed,
            QueueStatus::Scheduled,
        ]
        .into_iter()
        .collect();
        assert_eq!(stats.sent, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.scheduled, 1);
        assert_eq!(stats.cancelled, 0);
    }

    #[test]
    fn should_parse_status_names() {
        for status in QueueStatus::ALL {
            assert_eq!(status.as_str().parse::<QueueStatus>().unwrap(), status);
        }
        assert!("queued".parse::<QueueStatus>().is_err());
    }

    #[test]
    fn should_flatten_content_when_serializing() {
        let json = serde_json::to_value(item()).unwrap();
        assert_eq!(json["subject"], "Order {{order_id}}");
        assert_eq!(json["status"], "scheduled");
        assert_eq!(json["retryCount"], 0);
    }
}
