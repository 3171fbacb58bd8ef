//! Request-scoped keys published by the resolver and the pipeline.
//!
//! Each key is a distinct type stored in the request's extensions, so view
//! and telemetry collaborators look them up with
//! `request.extensions().get::<Key>()`.
//!
//! | Key | Published by | When |
//! |---|---|---|
//! | `Arc<DispatchContext>` | pipeline | first stage of every dispatch |
//! | [`MatchedRoute`] | resolver | every successful resolution |
//! | [`WildcardGroups`] | resolver | wildcard match with captured groups |
//! | [`CurrentFailure`] | pipeline | error path |
//! | [`Cancelled`] | caller or request parameter | cancelled submissions |
//! | `ValidationErrors` | pipeline | validation produced errors |
//! | [`ErrorAttributes`] | pipeline | error path, when enabled |

use std::sync::Arc;

use axum::http::StatusCode;
use uuid::Uuid;

use crate::error::Failure;
use crate::routing::{Captures, RouteDescriptor};

/// The route the current request resolved to.
#[derive(Debug, Clone)]
pub struct MatchedRoute(pub Arc<RouteDescriptor>);

/// Wildcard captures of the current request; index 0 is the full path.
#[derive(Debug, Clone)]
pub struct WildcardGroups(pub Captures);

/// The failure being handled on the error path.
#[derive(Debug, Clone)]
pub struct CurrentFailure(pub Failure);

/// Marker for a cancelled submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Error details for error views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorAttributes {
    pub status: StatusCode,
    pub message: String,
    pub request_path: String,
    pub kind: String,
    pub correlation_id: Uuid,
}

impl ErrorAttributes {
    pub fn from_failure(failure: &Failure, request_path: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: failure.to_string(),
            request_path: request_path.to_string(),
            kind: failure.kind().to_string(),
            correlation_id: failure.correlation_id(),
        }
    }
}
