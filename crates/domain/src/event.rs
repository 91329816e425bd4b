//! Event — an immutable record of something that happened in the shop.
//!
//! Events are produced by the storefront (a signup, a purchase, an abandoned
//! cart, …) and routed to the automations whose trigger they match.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::EventId;
use crate::time::{Timestamp, now};

/// The kind of domain event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Signup,
    Purchase,
    FormSubmission,
    OrderFulfilled,
    CartAbandoned,
}

impl EventType {
    /// Every event type, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Signup,
        Self::Purchase,
        Self::FormSubmission,
        Self::OrderFulfilled,
        Self::CartAbandoned,
    ];

    /// Stable `snake_case` name, identical to the serde representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::Purchase => "purchase",
            Self::FormSubmission => "form_submission",
            Self::OrderFulfilled => "order_fulfilled",
            Self::CartAbandoned => "cart_abandoned",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown event type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event type {0:?}")]
pub struct UnknownEventType(pub String);

impl From<UnknownEventType> for ValidationError {
    fn from(err: UnknownEventType) -> Self {
        Self::UnknownEventType(err.0)
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownEventType(s.to_string()))
    }
}

/// A domain event carrying a free-form JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    pub payload: serde_json::Value,
    pub timestamp: Timestamp,
}

impl Event {
    /// Create a new event stamped with the current time.
    #[must_use]
    pub fn new(event_type: EventType, payload: serde_json::Value) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            payload,
            timestamp: now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_every_event_type_from_its_name() {
        for t in EventType::ALL {
            assert_eq!(t.as_str().parse::<EventType>().unwrap(), t);
        }
    }

    #[test]
    fn should_reject_unknown_event_type() {
        let err = "refund".parse::<EventType>().unwrap_err();
        assert_eq!(err, UnknownEventType("refund".to_string()));
    }

    #[test]
    fn should_match_serde_name_with_as_str() {
        let json = serde_json::to_value(EventType::FormSubmission).unwrap();
        assert_eq!(json, "form_submission");
    }

    #[test]
    fn should_stamp_new_event_with_fresh_id() {
        let a = Event::new(EventType::Signup, serde_json::json!({}));
        let b = Event::new(EventType::Signup, serde_json::json!({}));
        assert_ne!(a.id, b.id);
    }
}
