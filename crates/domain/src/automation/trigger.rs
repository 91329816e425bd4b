//! Trigger — the event kind that enrolls recipients in an automation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::event::{Event, EventType};

/// Describes which domain event activates an automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Signup,
    Purchase,
    FormSubmission,
    OrderFulfilled,
    CartAbandoned,
    /// Enrolled only through the manual enroll endpoint.
    Manual,
}

impl Trigger {
    /// The event type this trigger listens to, or `None` for [`Trigger::Manual`].
    #[must_use]
    pub fn event_type(self) -> Option<EventType> {
        match self {
            Self::Signup => Some(EventType::Signup),
            Self::Purchase => Some(EventType::Purchase),
            Self::FormSubmission => Some(EventType::FormSubmission),
            Self::OrderFulfilled => Some(EventType::OrderFulfilled),
            Self::CartAbandoned => Some(EventType::CartAbandoned),
            Self::Manual => None,
        }
    }

    /// Check whether this trigger matches a given event.
    ///
    /// `Manual` triggers never match broadcast events.
    #[must_use]
    pub fn matches_event(self, event: &Event) -> bool {
        self.event_type() == Some(event.event_type)
    }

    /// Stable `snake_case` name, identical to the serde representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self.event_type() {
            Some(t) => t.as_str(),
            None => "manual",
        }
    }
}

impl From<EventType> for Trigger {
    fn from(value: EventType) -> Self {
        match value {
            EventType::Signup => Self::Signup,
            EventType::Purchase => Self::Purchase,
            EventType::FormSubmission => Self::FormSubmission,
            EventType::OrderFulfilled => Self::OrderFulfilled,
            EventType::CartAbandoned => Self::CartAbandoned,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trigger {
    type Err = crate::event::UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "manual" {
            return Ok(Self::Manual);
        }
        s.parse::<EventType>().map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_match_event_of_same_type() {
        let event = Event::new(EventType::Purchase, serde_json::json!({}));
        assert!(Trigger::Purchase.matches_event(&event));
    }

    #[test]
    fn should_not_match_event_of_other_type() {
        let event = Event::new(EventType::Signup, serde_json::json!({}));
        assert!(!Trigger::CartAbandoned.matches_event(&event));
    }

    #[test]
    fn should_never_match_manual_trigger_against_events() {
        for t in EventType::ALL {
            let event = Event::new(t, serde_json::json!({}));
            assert!(!Trigger::Manual.matches_event(&event));
        }
    }

    #[test]
    fn should_parse_display_output_back() {
        for t in [
            Trigger::Signup,
            Trigger::Purchase,
            Trigger::FormSubmission,
            Trigger::OrderFulfilled,
            Trigger::CartAbandoned,
            Trigger::Manual,
        ] {
            assert_eq!(t.to_string().parse::<Trigger>().unwrap(), t);
        }
    }

    #[test]
    fn should_deserialize_from_snake_case_string() {
        let t: Trigger = serde_json::from_str("\"order_fulfilled\"").unwrap();
        assert_eq!(t, Trigger::OrderFulfilled);
    }
}
