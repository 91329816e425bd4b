//! Automation — trigger → template or sequence rules.
//!
//! An automation enrolls a recipient when its [`Trigger`] fires and then
//! sends either one [`EmailTemplate`] or every step of a sequence. The two
//! modes are the variants of [`AutomationContent`], so a definition can never
//! carry both.

mod content;
mod trigger;

pub use content::{AutomationContent, EmailTemplate, SequenceStep};
pub use trigger::Trigger;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MailflowError, ValidationError};
use crate::id::AutomationId;
use crate::time::{Timestamp, now};

/// Whether an automation is currently running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationStatus {
    #[default]
    Active,
    Paused,
}

impl AutomationStatus {
    /// Stable `snake_case` name, identical to the serde representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for AutomationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutomationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            other => Err(ValidationError::InvalidStatus(other.to_string())),
        }
    }
}

/// A rule that enrolls recipients and schedules the emails they receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Automation {
    pub id: AutomationId,
    pub name: String,
    pub description: Option<String>,
    pub trigger: Trigger,
    pub status: AutomationStatus,
    pub enabled: bool,
    /// Seeded automations cannot be deleted.
    pub is_system: bool,
    /// At most one enrollment per recipient email.
    pub one_time_per_recipient: bool,
    pub content: AutomationContent,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Automation {
    /// Create a builder for constructing an [`Automation`].
    #[must_use]
    pub fn builder() -> AutomationBuilder {
        AutomationBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - the template or one of the steps is incomplete
    /// - a sequence has no steps or repeats a step order
    pub fn validate(&self) -> Result<(), MailflowError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        self.content.validate()?;
        Ok(())
    }

    /// Whether new recipients may be enrolled right now.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.enabled && self.status == AutomationStatus::Active
    }
}

/// Step-by-step builder for [`Automation`].
#[derive(Debug, Default)]
pub struct AutomationBuilder {
    id: Option<AutomationId>,
    name: Option<String>,
    description: Option<String>,
    trigger: Option<Trigger>,
    status: Option<AutomationStatus>,
    enabled: Option<bool>,
    is_system: bool,
    one_time_per_recipient: bool,
    content: Option<AutomationContent>,
    created_at: Option<Timestamp>,
}

impl AutomationBuilder {
    #[must_use]
    pub fn id(mut self, id: AutomationId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    #[must_use]
    pub fn status(mut self, status: AutomationStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn system(mut self, is_system: bool) -> Self {
        self.is_system = is_system;
        self
    }

    #[must_use]
    pub fn one_time_per_recipient(mut self, one_time: bool) -> Self {
        self.one_time_per_recipient = one_time;
        self
    }

    #[must_use]
    pub fn template(mut self, template: EmailTemplate) -> Self {
        self.content = Some(AutomationContent::Template(template));
        self
    }

    #[must_use]
    pub fn steps(mut self, steps: Vec<SequenceStep>) -> Self {
        self.content = Some(AutomationContent::sequence(steps));
        self
    }

    #[must_use]
    pub fn content(mut self, content: AutomationContent) -> Self {
        self.content = Some(match content {
            AutomationContent::Sequence { steps } => AutomationContent::sequence(steps),
            template @ AutomationContent::Template(_) => template,
        });
        self
    }

    #[must_use]
    pub fn created_at(mut self, ts: Timestamp) -> Self {
        self.created_at = Some(ts);
        self
    }

    /// Consume the builder, validate, and return an [`Automation`].
    ///
    /// # Errors
    ///
    /// Returns [`MailflowError::Validation`] if required fields are missing or empty.
    pub fn build(self) -> Result<Automation, MailflowError> {
        let content = self.content.ok_or(ValidationError::MissingContent)?;
        let created_at = self.created_at.unwrap_or_else(now);
        let automation = Automation {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            description: self.description,
            trigger: self.trigger.unwrap_or(Trigger::Manual),
            status: self.status.unwrap_or_default(),
            enabled: self.enabled.unwrap_or(true),
            is_system: self.is_system,
            one_time_per_recipient: self.one_time_per_recipient,
            content,
            created_at,
            updated_at: created_at,
        };
        automation.validate()?;
        Ok(automation)
    }
}
