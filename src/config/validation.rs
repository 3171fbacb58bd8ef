//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every route has a path and a handler reference
//! - Detect duplicate route paths and unusable forwards
//! - Check response headers can be sent on the wire
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DispatchConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;

use crate::config::schema::{DispatchConfig, ForwardConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("route #{index} has no path")]
    MissingRoutePath { index: usize },

    #[error("route '{path}' has no handler")]
    MissingHandler { path: String },

    #[error("route '{path}' is defined more than once")]
    DuplicateRoute { path: String },

    #[error("forward '{name}' in {owner} has no path")]
    EmptyForwardPath { owner: String, name: String },

    #[error("route '{path}' validates forms but defines no input path")]
    MissingInput { path: String },

    #[error("response header '{name}' is not valid: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("exception handler #{index} declares no error or origin kinds")]
    UnscopedExceptionHandler { index: usize },

    #[error("exception handler #{index} has no target path")]
    MissingHandlerPath { index: usize },
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &DispatchConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_forwards("global forwards", &config.global_forwards, &mut errors);

    let mut seen = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        if route.path.trim().is_empty() {
            errors.push(ValidationError::MissingRoutePath { index });
            continue;
        }
        if route.handler.trim().is_empty() {
            errors.push(ValidationError::MissingHandler {
                path: route.path.clone(),
            });
        }
        if !seen.insert(route.path.as_str()) {
            errors.push(ValidationError::DuplicateRoute {
                path: route.path.clone(),
            });
        }
        let has_input = route.input.as_deref().is_some_and(|i| !i.trim().is_empty());
        if config.pipeline.strict_routes && route.validate && !has_input {
            errors.push(ValidationError::MissingInput {
                path: route.path.clone(),
            });
        }
        check_forwards(&format!("route '{}'", route.path), &route.forwards, &mut errors);
    }

    for (name, values) in &config.pipeline.response_headers {
        if let Err(e) = HeaderName::from_bytes(name.as_bytes()) {
            errors.push(ValidationError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            });
            continue;
        }
        for value in values {
            if let Err(e) = HeaderValue::from_str(value) {
                errors.push(ValidationError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    for (index, handler) in config.exception_handlers.iter().enumerate() {
        if handler.error_kinds.is_empty() && handler.origin_kinds.is_empty() {
            errors.push(ValidationError::UnscopedExceptionHandler { index });
        }
        if handler.path.trim().is_empty() {
            errors.push(ValidationError::MissingHandlerPath { index });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_forwards(owner: &str, forwards: &[ForwardConfig], errors: &mut Vec<ValidationError>) {
    for forward in forwards {
        if forward.path.trim().is_empty() {
            errors.push(ValidationError::EmptyForwardPath {
                owner: owner.to_string(),
                name: forward.name.clone(),
            });
        }
    }
}
