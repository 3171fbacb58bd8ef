//! Ordered form validators.
//!
//! # Responsibilities
//! - Decide whether validation runs at all for a dispatch
//! - Reject cancellation of routes that do not allow it
//! - Run validators in registration order against one accumulator
//! - Turn a failing validator into a single generic message
//!
//! # Design Decisions
//! - An empty chain falls back to the form's own `Form::validate`
//! - The first failing validator stops the chain; earlier messages are kept

use std::sync::Arc;

use crate::dispatch::scope::Cancelled;
use crate::dispatch::{DispatchContext, WebRequest};
use crate::error::{DispatchError, HandlerError};
use crate::form::Form;
use crate::routing::RouteDescriptor;
use crate::validation::errors::{ValidationErrors, ValidationMessage};

/// Validates a bound form, recording messages into `errors`.
pub trait FormValidator: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Returns `Err` when the validator itself could not run.
    fn validate(
        &self,
        form: &dyn Form,
        route: &RouteDescriptor,
        request: &WebRequest,
        errors: &mut ValidationErrors,
    ) -> Result<(), HandlerError>;
}

/// Delegates to the form's own validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormSelfValidator;

impl FormValidator for FormSelfValidator {
    fn name(&self) -> &str {
        "form"
    }

    fn validate(
        &self,
        form: &dyn Form,
        route: &RouteDescriptor,
        request: &WebRequest,
        errors: &mut ValidationErrors,
    ) -> Result<(), HandlerError> {
        errors.merge(form.validate(route, request));
        Ok(())
    }
}

/// Validators applied in registration order.
#[derive(Clone, Default)]
pub struct ValidatorChain {
    validators: Vec<Arc<dyn FormValidator>>,
}

impl ValidatorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, validator: Arc<dyn FormValidator>) {
        self.validators.push(validator);
    }

    pub fn with(mut self, validator: Arc<dyn FormValidator>) -> Self {
        self.push(validator);
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Validate the context's form. Binding errors recorded on the context are
    /// included whenever validation runs.
    ///
    /// Skips when there is no form, when the route does not validate, or when
    /// form validation was switched off for this dispatch. A cancelled request
    /// skips validation on cancellable routes and fails otherwise.
    pub fn validate(
        &self,
        ctx: &DispatchContext,
        request: &mut WebRequest,
        errors: &mut ValidationErrors,
    ) -> Result<(), DispatchError> {
        let route = ctx.route();
        let Some(form) = ctx.form() else {
            return Ok(());
        };
        if !route.validates() || !ctx.form_validation_required() {
            tracing::debug!(route = %route.path(), "Form validation skipped");
            return Ok(());
        }

        if request.is_cancelled() {
            if !route.is_cancellable() {
                tracing::warn!(route = %route.path(), "Cancel attempted on non-cancellable route");
                return Err(DispatchError::InvalidCancel {
                    path: route.path().to_string(),
                });
            }
            request.extensions_mut().insert(Cancelled);
            tracing::debug!(route = %route.path(), "Request cancelled, validation skipped");
            return Ok(());
        }

        errors.merge(ctx.binding_result().clone());

        let fallback: [Arc<dyn FormValidator>; 1] = [Arc::new(FormSelfValidator)];
        let validators = if self.validators.is_empty() {
            &fallback[..]
        } else {
            &self.validators[..]
        };

        for validator in validators {
            if let Err(err) = validator.validate(form.as_ref(), route, request, errors) {
                tracing::warn!(
                    route = %route.path(),
                    validator = validator.name(),
                    kind = %err.kind(),
                    error = %err,
                    "Validator failed"
                );
                errors.add_global(ValidationMessage::new(format!(
                    "Validation failed. ['{}::{}']",
                    err.kind(),
                    err.message()
                )));
                break;
            }
        }

        tracing::debug!(route = %route.path(), errors = errors.len(), "Form validated");
        Ok(())
    }
}
