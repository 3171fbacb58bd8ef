//! Validation message accumulator.

use std::fmt;

use serde::Serialize;

/// Property name for messages that do not belong to a single field.
pub const GLOBAL: &str = "global";

/// One validation message: a message key plus positional arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationMessage {
    key: String,
    args: Vec<String>,
}

impl ValidationMessage {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            f.write_str(&self.key)
        } else {
            write!(f, "{} {:?}", self.key, self.args)
        }
    }
}

/// Messages accumulated during binding and validation, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    entries: Vec<(String, ValidationMessage)>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a property.
    pub fn add(&mut self, property: impl Into<String>, message: ValidationMessage) {
        self.entries.push((property.into(), message));
    }

    pub fn add_global(&mut self, message: ValidationMessage) {
        self.add(GLOBAL, message);
    }

    /// Append every message of `other`.
    pub fn merge(&mut self, other: ValidationErrors) {
        self.entries.extend(other.entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Messages recorded against `property`.
    pub fn get<'a>(&'a self, property: &'a str) -> impl Iterator<Item = &'a ValidationMessage> + 'a {
        self.entries
            .iter()
            .filter(move |(prop, _)| prop == property)
            .map(|(_, message)| message)
    }

    /// Distinct properties with messages, in first-seen order.
    pub fn properties(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for (property, _) in &self.entries {
            if !seen.contains(&property.as_str()) {
                seen.push(property);
            }
        }
        seen
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ValidationMessage)> {
        self.entries.iter().map(|(prop, message)| (prop.as_str(), message))
    }
}
