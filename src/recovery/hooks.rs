//! Last-resort handling for failures nobody recovered.

use axum::http::StatusCode;

use crate::dispatch::{ViewTarget, WebRequest, WebResponse};
use crate::error::Failure;

/// Called once per unrecovered failure, after the exception handler chain
/// declined it.
pub trait UnhandledFailureHook: Send + Sync {
    /// Prepare the response and optionally name a view to render.
    fn on_unhandled(
        &self,
        failure: &Failure,
        request: &WebRequest,
        response: &mut WebResponse,
    ) -> Option<ViewTarget>;
}

/// Marks the response as failed and renders a configured error page.
///
/// Client errors keep their status; everything else becomes a 500.
#[derive(Debug, Clone, Default)]
pub struct ErrorPageHook {
    error_page: Option<String>,
}

impl ErrorPageHook {
    pub fn new(error_page: Option<String>) -> Self {
        Self {
            error_page: error_page.filter(|page| !page.trim().is_empty()),
        }
    }

    pub fn error_page(&self) -> Option<&str> {
        self.error_page.as_deref()
    }
}

impl UnhandledFailureHook for ErrorPageHook {
    fn on_unhandled(
        &self,
        failure: &Failure,
        request: &WebRequest,
        response: &mut WebResponse,
    ) -> Option<ViewTarget> {
        let status = if failure.error().is_client_error() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        response.send_error(
            status,
            format!("Request failed. Reference: {}", failure.correlation_id()),
        );
        tracing::error!(
            path = %request.path(),
            correlation_id = %failure.correlation_id(),
            kind = %failure.kind(),
            error = %failure,
            error_page = self.error_page.as_deref().unwrap_or("-"),
            "Unhandled dispatch failure"
        );
        self.error_page.as_ref().map(ViewTarget::forward)
    }
}
