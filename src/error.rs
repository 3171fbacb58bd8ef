//! Error taxonomy for routing and dispatch.
//!
//! # Design Decisions
//! - Configuration errors are fatal and always escalate
//! - Per-request errors are recovered as close to their origin as possible
//! - Every failure carries a [`Kind`] so recovery handlers can select on it
//! - Authorization denial is an outcome, not an error

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Dotted classification tag for failures and business-logic origins.
///
/// Tags form a hierarchy by prefix: `billing.timeout` is a `billing`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kind(Cow<'static, str>);

impl Kind {
    /// Create a kind from a static tag.
    pub const fn from_static(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }

    /// Create a kind from an owned tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(Cow::Owned(tag.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this kind equals `ancestor` or sits below it in the
    /// dotted hierarchy.
    pub fn is_a(&self, ancestor: &Kind) -> bool {
        let tag = self.as_str();
        let parent = ancestor.as_str();
        if tag == parent {
            return true;
        }
        tag.len() > parent.len()
            && tag.starts_with(parent)
            && tag.as_bytes()[parent.len()] == b'.'
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Kind {
    fn from(tag: &'static str) -> Self {
        Self::from_static(tag)
    }
}

/// Kinds assigned to the dispatch layer's own failures.
pub mod kinds {
    use super::Kind;

    pub const CONFIGURATION: Kind = Kind::from_static("dispatch.configuration");
    pub const ROUTE_NOT_FOUND: Kind = Kind::from_static("dispatch.route_not_found");
    pub const INVALID_CANCEL: Kind = Kind::from_static("dispatch.invalid_cancel");
    pub const HANDLER: Kind = Kind::from_static("handler");
}

/// Fatal configuration problems, raised at startup or on first use.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A route was registered without a path.
    #[error("route has no path configured")]
    MissingPath,

    /// A route was registered without a handler reference.
    #[error("route '{path}' has no handler reference")]
    MissingHandler { path: String },

    /// Validation failed on a route that has nowhere to send the user back to.
    #[error("form validation failed but route '{path}' defines no 'input' forward")]
    MissingInputForward { path: String },

    /// A dispatch context could not be assembled.
    #[error("dispatch context for route '{path}' is missing '{field}'")]
    MissingContextField { path: String, field: &'static str },

    /// The resolved route names a handler nobody registered.
    #[error("route '{path}' references unknown handler '{handler}'")]
    UnknownHandler { path: String, handler: String },

    /// A configured response header cannot be represented on the wire.
    #[error("invalid response header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
}

/// Error raised by business logic invoked through an [`Action`](crate::dispatch::Action).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    kind: Kind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HandlerError {
    pub fn new(kind: impl Into<Kind>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors produced while resolving or dispatching a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// No direct or wildcard route matched. Client-facing (404 class).
    #[error("unable to locate a route for path '{path}'")]
    RouteNotFound { path: String },

    /// Cancellation was signalled on a route that does not allow it.
    #[error("invalid cancel attempt on route '{path}': the route is not cancellable")]
    InvalidCancel { path: String },

    #[error("handler failed: {0}")]
    Handler(#[from] HandlerError),
}

impl DispatchError {
    /// Classification used by exception-handler selection.
    pub fn kind(&self) -> Kind {
        match self {
            DispatchError::Configuration(_) => kinds::CONFIGURATION,
            DispatchError::RouteNotFound { .. } => kinds::ROUTE_NOT_FOUND,
            DispatchError::InvalidCancel { .. } => kinds::INVALID_CANCEL,
            DispatchError::Handler(err) => err.kind().clone(),
        }
    }

    /// Returns true for failures caused by the client rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, DispatchError::RouteNotFound { .. })
    }
}

/// A dispatch failure shared between the pipeline, recovery handlers and the
/// request scope.
///
/// Clones refer to the same failure. The correlation id is assigned on first
/// request and is stable for the lifetime of the failure.
#[derive(Debug, Clone)]
pub struct Failure {
    inner: Arc<FailureInner>,
}

#[derive(Debug)]
struct FailureInner {
    error: DispatchError,
    correlation_id: OnceLock<Uuid>,
}

impl Failure {
    pub fn new(error: DispatchError) -> Self {
        Self {
            inner: Arc::new(FailureInner {
                error,
                correlation_id: OnceLock::new(),
            }),
        }
    }

    pub fn error(&self) -> &DispatchError {
        &self.inner.error
    }

    pub fn kind(&self) -> Kind {
        self.inner.error.kind()
    }

    /// Correlation id for log correlation, computed once per failure.
    pub fn correlation_id(&self) -> Uuid {
        *self.inner.correlation_id.get_or_init(Uuid::new_v4)
    }

    /// Returns true if both handles refer to the same failure instance.
    pub fn same_as(&self, other: &Failure) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner.error, f)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.inner.error)
    }
}

impl From<DispatchError> for Failure {
    fn from(error: DispatchError) -> Self {
        Self::new(error)
    }
}

impl From<ConfigurationError> for Failure {
    fn from(error: ConfigurationError) -> Self {
        Self::new(error.into())
    }
}

impl From<HandlerError> for Failure {
    fn from(error: HandlerError) -> Self {
        Self::new(error.into())
    }
}
