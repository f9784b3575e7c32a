//! The validation boundary.
//!
//! Validation rules belong to the application or a rule engine; the session
//! only runs them at the right point and collects what they report into a
//! [`ValidationErrors`].

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Field-keyed collection of validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Whether any message was recorded.
    #[must_use]
    pub fn has_any(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Messages for one field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    /// Number of fields with at least one message.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate `(field, messages)` in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    /// Move every message from `other` into `self`.
    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                first = false;
                write!(f, "{}: {}", field, message)?;
            }
        }
        Ok(())
    }
}

/// Application-supplied validation, run by the `validate_and_*` operations.
pub trait Validate {
    /// Report problems into `errors`. The default reports nothing.
    fn validate(&self, errors: &mut ValidationErrors) {
        let _ = errors;
    }
}
