//! Forms whose fields are declared at configuration time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dispatch::WebRequest;
use crate::form::{FieldError, FieldValue, Form};
use crate::routing::RouteDescriptor;
use crate::validation::{ValidationErrors, ValidationMessage};

/// Declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Integer,
    Flag,
    List,
}

/// One entry of a form's field table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    name: String,
    kind: FieldKind,
    required: bool,
    initial: Option<FieldValue>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            initial: None,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Flag)
    }

    pub fn list(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::List)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value restored by `reset`. Ignored if its kind does not match.
    pub fn initial(mut self, value: FieldValue) -> Self {
        if value.kind() == self.kind {
            self.initial = Some(value);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// A form backed by a declared field table.
#[derive(Debug, Clone)]
pub struct DynaForm {
    form_type: String,
    fields: Vec<FieldSpec>,
    values: HashMap<String, FieldValue>,
}

impl DynaForm {
    pub fn new(form_type: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        let mut form = Self {
            form_type: form_type.into(),
            fields,
            values: HashMap::new(),
        };
        form.reset();
        form
    }

    fn spec(&self, name: &str) -> Result<&FieldSpec, FieldError> {
        self.fields
            .iter()
            .find(|spec| spec.name == name)
            .ok_or_else(|| FieldError::UnknownField {
                form: self.form_type.clone(),
                field: name.to_string(),
            })
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Set a field from its raw request text, converting to the declared kind.
    pub fn set_raw(&mut self, name: &str, raw: &str) -> Result<(), FieldError> {
        let kind = self.spec(name)?.kind;
        let value = match kind {
            FieldKind::Text => FieldValue::Text(raw.to_string()),
            FieldKind::Integer => raw
                .trim()
                .parse()
                .map(FieldValue::Integer)
                .map_err(|_| FieldError::Unparseable {
                    field: name.to_string(),
                    value: raw.to_string(),
                    expected: kind,
                })?,
            FieldKind::Flag => FieldValue::Flag(matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "true" | "on" | "yes" | "1"
            )),
            FieldKind::List => FieldValue::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(String::from)
                    .collect(),
            ),
        };
        self.set_field(name, value)
    }

    /// Bind every declared field present in the request parameters.
    ///
    /// List fields collect all values of a repeated parameter.
    pub fn bind(&mut self, request: &WebRequest) -> Result<(), FieldError> {
        let specs = self.fields.clone();
        for spec in specs {
            let values: Vec<&str> = request
                .parameters()
                .iter()
                .filter(|(key, _)| *key == spec.name)
                .map(|(_, value)| value.as_str())
                .collect();
            if values.is_empty() {
                continue;
            }
            if spec.kind == FieldKind::List {
                let items = values.iter().map(|v| v.to_string()).collect();
                self.set_field(&spec.name, FieldValue::List(items))?;
            } else {
                self.set_raw(&spec.name, values[0])?;
            }
        }
        Ok(())
    }
}

impl Form for DynaForm {
    fn form_type(&self) -> &str {
        &self.form_type
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        self.values.get(name).cloned()
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
        let expected = self.spec(name)?.kind;
        if value.kind() != expected {
            return Err(FieldError::TypeMismatch {
                field: name.to_string(),
                expected,
                actual: value.kind(),
            });
        }
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Checks required fields are present and not blank.
    fn validate(&self, _route: &RouteDescriptor, _request: &WebRequest) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for spec in self.fields.iter().filter(|spec| spec.required) {
            let missing = self.values.get(&spec.name).map_or(true, FieldValue::is_blank);
            if missing {
                errors.add(&spec.name, ValidationMessage::new("errors.required").arg(&spec.name));
            }
        }
        errors
    }

    fn reset(&mut self) {
        self.values = self
            .fields
            .iter()
            .filter_map(|spec| spec.initial.clone().map(|value| (spec.name.clone(), value)))
            .collect();
    }
}
