//! Content — what an automation sends: one template or an ordered sequence.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::time::{check_delay, delay};

/// The two mutually exclusive sending modes of an automation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AutomationContent {
    /// A single email sent once after an optional delay.
    Template(EmailTemplate),
    /// Several emails, each with its own delay relative to enrollment.
    Sequence { steps: Vec<SequenceStep> },
}

impl AutomationContent {
    /// Build a sequence, sorting steps by their `order`.
    #[must_use]
    pub fn sequence(mut steps: Vec<SequenceStep>) -> Self {
        steps.sort_by_key(|s| s.order);
        Self::Sequence { steps }
    }

    /// Number of emails one enrollment produces.
    #[must_use]
    pub fn email_count(&self) -> usize {
        match self {
            Self::Template(_) => 1,
            Self::Sequence { steps } => steps.len(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Template(template) => template.validate(),
            Self::Sequence { steps } => {
                if steps.is_empty() {
                    return Err(ValidationError::NoSteps);
                }
                let mut seen = std::collections::HashSet::with_capacity(steps.len());
                for step in steps {
                    step.validate()?;
                    if !seen.insert(step.order) {
                        return Err(ValidationError::DuplicateStepOrder { order: step.order });
                    }
                }
                Ok(())
            }
        }
    }
}

/// A single-email template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplate {
    pub subject: String,
    pub body_text: String,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub cta_label: Option<String>,
    #[serde(default)]
    pub cta_url: Option<String>,
    #[serde(default)]
    pub footer_text: Option<String>,
    #[serde(default)]
    pub send_delay_days: u32,
    #[serde(default)]
    pub send_delay_hours: u32,
}

impl EmailTemplate {
    /// Delay between enrollment and the send.
    #[must_use]
    pub fn delay(&self) -> Duration {
        delay(self.send_delay_days, self.send_delay_hours)
    }

    /// Plain-text body: text, then the call-to-action line, then the footer.
    ///
    /// Placeholders are left untouched; rendering happens later.
    #[must_use]
    pub fn compose_text(&self) -> String {
        let mut body = self.body_text.clone();
        let cta = (
            non_blank(self.cta_label.as_deref()),
            non_blank(self.cta_url.as_deref()),
        );
        if let (Some(label), Some(url)) = cta {
            body.push_str("\n\n");
            body.push_str(label);
            body.push_str(": ");
            body.push_str(url);
        }
        if let Some(footer) = non_blank(self.footer_text.as_deref()) {
            body.push_str("\n\n");
            body.push_str(footer);
        }
        body
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.subject.trim().is_empty() {
            return Err(ValidationError::EmptySubject);
        }
        if self.body_text.trim().is_empty() {
            return Err(ValidationError::EmptyBody);
        }
        if non_blank(self.cta_label.as_deref()).is_some()
            && non_blank(self.cta_url.as_deref()).is_none()
        {
            return Err(ValidationError::CtaWithoutUrl);
        }
        check_delay(self.send_delay_days, self.send_delay_hours)
    }
}

/// One email of a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceStep {
    pub order: u32,
    #[serde(default)]
    pub delay_days: u32,
    #[serde(default)]
    pub delay_hours: u32,
    pub subject: String,
    pub body: String,
}

impl SequenceStep {
    /// Delay between enrollment and this step's send.
    ///
    /// Delays are independent per step, never cumulative.
    #[must_use]
    pub fn delay(&self) -> Duration {
        delay(self.delay_days, self.delay_hours)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.subject.trim().is_empty() {
            return Err(ValidationError::EmptyStepSubject { order: self.order });
        }
        if self.body.trim().is_empty() {
            return Err(ValidationError::EmptyStepBody { order: self.order });
        }
        check_delay(self.delay_days, self.delay_hours)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> EmailTemplate {
        EmailTemplate {
            subject: "Welcome".to_string(),
            body_text: "Hi {{customer_first_name}}".to_string(),
            ..EmailTemplate::default()
        }
    }

    fn step(order: u32, days: u32, hours: u32) -> SequenceStep {
        SequenceStep {
            order,
            delay_days: days,
            delay_hours: hours,
            subject: format!("Step {order}"),
            body: "Body".to_string(),
        }
    }

    #[test]
    fn should_compose_text_with_cta_and_footer() {
        let t = EmailTemplate {
            cta_label: Some("Shop now".to_string()),
            cta_url: Some("https://shop.test".to_string()),
            footer_text: Some("Unsubscribe anytime".to_string()),
            ..template()
        };
        assert_eq!(
            t.compose_text(),
            "Hi {{customer_first_name}}\n\nShop now: https://shop.test\n\nUnsubscribe anytime"
        );
    }

    #[test]
    fn should_compose_text_without_optional_parts() {
        assert_eq!(template().compose_text(), "Hi {{customer_first_name}}");
    }

    #[test]
    fn should_reject_template_with_blank_subject() {
        let t = EmailTemplate {
            subject: "  ".to_string(),
            ..template()
        };
        assert_eq!(t.validate(), Err(ValidationError::EmptySubject));
    }

    #[test]
    fn should_reject_template_with_empty_body() {
        let t = EmailTemplate {
            body_text: String::new(),
            ..template()
        };
        assert_eq!(t.validate(), Err(ValidationError::EmptyBody));
    }

    #[test]
    fn should_reject_cta_label_without_url() {
        let t = EmailTemplate {
            cta_label: Some("Go".to_string()),
            ..template()
        };
        assert_eq!(t.validate(), Err(ValidationError::CtaWithoutUrl));
    }

    #[test]
    fn should_reject_template_delay_beyond_ten_years() {
        let t = EmailTemplate {
            send_delay_days: 3_000_000,
            ..template()
        };
        assert!(matches!(
            t.validate(),
            Err(ValidationError::DelayTooLong { days: 3_000_000, .. })
        ));
    }

    #[test]
    fn should_reject_step_delay_beyond_ten_years() {
        let content = AutomationContent::sequence(vec![step(1, 0, 0), step(2, 0, u32::MAX)]);
        assert!(matches!(
            content.validate(),
            Err(ValidationError::DelayTooLong { hours: u32::MAX, .. })
        ));
    }

    #[test]
    fn should_reject_empty_sequence() {
        let content = AutomationContent::sequence(vec![]);
        assert_eq!(content.validate(), Err(ValidationError::NoSteps));
    }

    #[test]
    fn should_reject_duplicate_step_order() {
        let content = AutomationContent::sequence(vec![step(1, 0, 0), step(1, 1, 0)]);
        assert_eq!(
            content.validate(),
            Err(ValidationError::DuplicateStepOrder { order: 1 })
        );
    }

    #[test]
    fn should_sort_steps_by_order() {
        let content =
            AutomationContent::sequence(vec![step(3, 3, 0), step(1, 0, 0), step(2, 1, 0)]);
        let AutomationContent::Sequence { steps } = content else {
            panic!("expected a sequence");
        };
        let orders: Vec<u32> = steps.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[test]
    fn should_compute_independent_step_delays() {
        assert_eq!(step(1, 0, 0).delay(), Duration::zero());
        assert_eq!(step(2, 1, 2).delay(), Duration::hours(26));
    }

    #[test]
    fn should_deserialize_tagged_template_from_camel_case_json() {
        let json = serde_json::json!({
            "mode": "template",
            "subject": "Thanks",
            "bodyText": "Order {{order_id}}",
            "sendDelayDays": 1
        });
        let content: AutomationContent = serde_json::from_value(json).unwrap();
        match content {
            AutomationContent::Template(t) => {
                assert_eq!(t.send_delay_days, 1);
                assert_eq!(t.send_delay_hours, 0);
                assert!(t.body_html.is_none());
            }
            AutomationContent::Sequence { .. } => panic!("expected a template"),
        }
    }

    #[test]
    fn should_deserialize_tagged_sequence() {
        let json = serde_json::json!({
            "mode": "sequence",
            "steps": [{"order": 1, "subject": "A", "body": "a"}]
        });
        let content: AutomationContent = serde_json::from_value(json).unwrap();
        assert_eq!(content.email_count(), 1);
    }
}
