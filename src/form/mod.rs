//! Form subsystem.
//!
//! # Data Flow
//! ```text
//! Request parameters (bound by the host)
//!     → Form::set_field (typed, by name)
//!     → DispatchContext (Arc<dyn Form>)
//!     → pipeline: publish into request/session scope, validate, execute
//! ```
//!
//! # Design Decisions
//! - Field access is by name through an explicit capability trait
//! - `DynaForm` backs that trait with a field table declared up front
//! - Forms are immutable once handed to the pipeline

pub mod dyna;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::dispatch::WebRequest;
use crate::routing::RouteDescriptor;
use crate::validation::ValidationErrors;

pub use dyna::{DynaForm, FieldKind, FieldSpec};

/// A typed form field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Flag(bool),
    List(Vec<String>),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Integer(_) => FieldKind::Integer,
            FieldValue::Flag(_) => FieldKind::Flag,
            FieldValue::List(_) => FieldKind::List,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns true for empty text and empty lists.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Integer(_) | FieldValue::Flag(_) => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Integer(value) => write!(f, "{}", value),
            FieldValue::Flag(value) => write!(f, "{}", value),
            FieldValue::List(items) => f.write_str(&items.join(",")),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

/// Field access failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("form '{form}' has no field '{field}'")]
    UnknownField { form: String, field: String },

    #[error("field '{field}' expects {expected:?}, got {actual:?}")]
    TypeMismatch {
        field: String,
        expected: FieldKind,
        actual: FieldKind,
    },

    #[error("field '{field}' cannot parse '{value}' as {expected:?}")]
    Unparseable {
        field: String,
        value: String,
        expected: FieldKind,
    },
}

/// A form object bound from request data.
pub trait Form: Send + Sync + fmt::Debug {
    /// Name of the form type, used in logs.
    fn form_type(&self) -> &str;

    /// Current value of a field, or `None` if unset or unknown.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Set a field by name.
    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError>;

    /// Self-validation, used when no explicit validators are configured.
    fn validate(&self, _route: &RouteDescriptor, _request: &WebRequest) -> ValidationErrors {
        ValidationErrors::new()
    }

    /// Restore defaults before binding.
    fn reset(&mut self) {}
}
