//! Recipient — the person an automation emails, keyed by address.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::placeholder::Variables;

/// An email recipient together with the variables captured at enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Normalised (trimmed, lower-case) address.
    pub email: String,
    pub name: Option<String>,
    #[serde(default)]
    pub variables: Variables,
}

impl Recipient {
    /// Create a recipient, normalising and checking the address.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEmail`] when the address is not
    /// `local@domain.tld`-shaped.
    pub fn new(email: &str, name: Option<String>) -> Result<Self, ValidationError> {
        let email = normalize_email(email)?;
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        Ok(Self {
            email,
            name,
            variables: Variables::new(),
        })
    }

    /// Attach extra template variables (existing keys are overwritten).
    #[must_use]
    pub fn with_variables(mut self, variables: impl IntoIterator<Item = (String, String)>) -> Self {
        self.variables.extend(variables);
        self
    }

    /// Extract a recipient from an event payload.
    ///
    /// The address comes from `email` or `customer_email`; the name from
    /// `name`, `customer_name`, or `first_name` + `last_name`. Every scalar
    /// top-level field becomes a variable, as do the fields of the first
    /// entry of an `items` array when not already present.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingRecipient`] when no address is
    /// present and [`ValidationError::InvalidEmail`] when it is malformed.
    pub fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let fields = payload.as_object().ok_or(ValidationError::MissingRecipient)?;

        let email = ["email", "customer_email"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .ok_or(ValidationError::MissingRecipient)?;

        let name = ["name", "customer_name"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .or_else(|| joined_name(fields));

        let mut variables = scalar_fields(fields);
        if let Some(Value::Object(first_item)) = fields
            .get("items")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
        {
            for (key, value) in scalar_fields(first_item) {
                variables.entry(key).or_insert(value);
            }
        }

        Ok(Self::new(email, name)?.with_variables(variables))
    }

    /// First word of the name, if any.
    #[must_use]
    pub fn first_name(&self) -> Option<&str> {
        self.name.as_deref().and_then(|n| n.split_whitespace().next())
    }

    /// Variables used for rendering: the captured ones plus
    /// `customer_first_name`, `customer_name` and `customer_email` when
    /// they were not provided explicitly.
    #[must_use]
    pub fn template_variables(&self) -> Variables {
        let mut vars = self.variables.clone();
        if let Some(first) = self.first_name() {
            vars.entry("customer_first_name".to_string())
                .or_insert_with(|| first.to_string());
        }
        if let Some(name) = &self.name {
            vars.entry("customer_name".to_string())
                .or_insert_with(|| name.clone());
        }
        vars.entry("customer_email".to_string())
            .or_insert_with(|| self.email.clone());
        vars
    }
}

/// Trim and lower-case an address, rejecting obviously malformed ones.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidEmail`] for malformed addresses.
pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_lowercase();
    let invalid = || ValidationError::InvalidEmail(raw.to_string());

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    let well_formed = !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace);
    if !well_formed {
        return Err(invalid());
    }
    Ok(email)
}

fn joined_name(fields: &Map<String, Value>) -> Option<String> {
    let first = fields.get("first_name").and_then(Value::as_str);
    let last = fields.get("last_name").and_then(Value::as_str);
    match (first, last) {
        (Some(f), Some(l)) => Some(format!("{f} {l}")),
        (Some(f), None) => Some(f.to_string()),
        (None, Some(l)) => Some(l.to_string()),
        (None, None) => None,
    }
}

fn scalar_fields(fields: &Map<String, Value>) -> Variables {
    fields
        .iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => return None,
            };
            Some((key.clone(), text))
        })
        .collect()
}
