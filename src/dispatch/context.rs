//! Per-request dispatch state.
//!
//! # Responsibilities
//! - Aggregate the resolved route, its action, the form and binding results
//! - Check mandatory fields at construction
//! - Record the failure of the current dispatch, if any
//!
//! # Design Decisions
//! - Built with a plain constructor plus an options struct; no deferred validation
//! - The request and response travel separately so the context can be
//!   published into request scope without owning the request
//! - Only the execution failure is mutable, and only on the error path

use std::fmt;
use std::sync::{Arc, RwLock};

use crate::dispatch::action::Action;
use crate::error::{ConfigurationError, Failure};
use crate::form::Form;
use crate::routing::RouteDescriptor;
use crate::validation::ValidationErrors;

/// Optional parts of a dispatch context.
#[derive(Clone)]
pub struct ContextOptions {
    form: Option<Arc<dyn Form>>,
    form_name: Option<String>,
    binding_result: ValidationErrors,
    form_validation_required: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            form: None,
            form_name: None,
            binding_result: ValidationErrors::new(),
            form_validation_required: true,
        }
    }
}

impl ContextOptions {
    pub fn form(mut self, form: Arc<dyn Form>) -> Self {
        self.form = Some(form);
        self
    }

    /// Attribute name for the form, overriding the route's.
    pub fn form_name(mut self, name: impl Into<String>) -> Self {
        self.form_name = Some(name.into());
        self
    }

    /// Errors already recorded while binding request data to the form.
    pub fn binding_result(mut self, errors: ValidationErrors) -> Self {
        self.binding_result = errors;
        self
    }

    /// Switch form validation off for this dispatch only.
    pub fn form_validation_required(mut self, required: bool) -> Self {
        self.form_validation_required = required;
        self
    }
}

/// Everything the pipeline needs to process one request.
pub struct DispatchContext {
    route: Arc<RouteDescriptor>,
    action: Arc<dyn Action>,
    form: Option<Arc<dyn Form>>,
    form_name: Option<String>,
    binding_result: ValidationErrors,
    form_validation_required: bool,
    execution_failure: RwLock<Option<Failure>>,
}

impl DispatchContext {
    /// Assemble a context. A form needs an attribute name, from the options or
    /// from the route.
    pub fn new(
        route: Arc<RouteDescriptor>,
        action: Arc<dyn Action>,
        options: ContextOptions,
    ) -> Result<Self, ConfigurationError> {
        let form_name = options
            .form_name
            .filter(|name| !name.trim().is_empty())
            .or_else(|| route.form_name().map(String::from));

        if options.form.is_some() && form_name.is_none() {
            return Err(ConfigurationError::MissingContextField {
                path: route.path().to_string(),
                field: "form_name",
            });
        }

        Ok(Self {
            route,
            action,
            form: options.form,
            form_name,
            binding_result: options.binding_result,
            form_validation_required: options.form_validation_required,
            execution_failure: RwLock::new(None),
        })
    }

    pub fn route(&self) -> &Arc<RouteDescriptor> {
        &self.route
    }

    pub fn action(&self) -> &Arc<dyn Action> {
        &self.action
    }

    pub fn form(&self) -> Option<&Arc<dyn Form>> {
        self.form.as_ref()
    }

    /// Attribute name the form is published under.
    pub fn form_name(&self) -> Option<&str> {
        self.form_name.as_deref()
    }

    pub fn binding_result(&self) -> &ValidationErrors {
        &self.binding_result
    }

    pub fn form_validation_required(&self) -> bool {
        self.form_validation_required
    }

    pub fn execution_failure(&self) -> Option<Failure> {
        match self.execution_failure.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_execution_failure(&self, failure: Failure) {
        match self.execution_failure.write() {
            Ok(mut guard) => *guard = Some(failure),
            Err(poisoned) => *poisoned.into_inner() = Some(failure),
        }
    }
}

impl fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchContext")
            .field("route", &self.route.path())
            .field("handler", &self.route.handler())
            .field("form_name", &self.form_name)
            .field("form_validation_required", &self.form_validation_required)
            .field("failed", &self.execution_failure().is_some())
            .finish()
    }
}
