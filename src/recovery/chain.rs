//! Exception handlers and their selection.

use std::sync::Arc;

use crate::config::ExceptionHandlerConfig;
use crate::dispatch::{DispatchContext, WebRequest, WebResponse};
use crate::error::{Failure, Kind};
use crate::routing::{Forward, ForwardDescriptor};

/// Which failures a handler wants to see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerSupport {
    error_kinds: Vec<Kind>,
    origin_kinds: Vec<Kind>,
}

impl HandlerSupport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept failures of `kind` or any kind below it.
    pub fn error_kind(mut self, kind: impl Into<Kind>) -> Self {
        self.error_kinds.push(kind.into());
        self
    }

    /// Accept any failure raised by actions of `origin` or below it.
    pub fn origin_kind(mut self, origin: impl Into<Kind>) -> Self {
        self.origin_kinds.push(origin.into());
        self
    }

    /// Eligible when the origin matches a declared origin kind, or the
    /// failure matches a declared error kind.
    pub fn is_eligible(&self, error: &Kind, origin: &Kind) -> bool {
        self.origin_kinds.iter().any(|kind| origin.is_a(kind))
            || self.error_kinds.iter().any(|kind| error.is_a(kind))
    }
}

/// Turns a failure into a forward, or declines with `None`.
pub trait ExceptionHandler: Send + Sync {
    fn support(&self) -> &HandlerSupport;

    fn handle(
        &self,
        failure: &Failure,
        ctx: &DispatchContext,
        request: &mut WebRequest,
        response: &mut WebResponse,
    ) -> Option<Forward>;
}

/// Handlers consulted in registration order.
#[derive(Clone, Default)]
pub struct ExceptionHandlerChain {
    handlers: Vec<Arc<dyn ExceptionHandler>>,
}

impl ExceptionHandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handler: Arc<dyn ExceptionHandler>) {
        self.handlers.push(handler);
    }

    pub fn with(mut self, handler: Arc<dyn ExceptionHandler>) -> Self {
        self.push(handler);
        self
    }

    /// One `ForwardingExceptionHandler` per configured rule.
    pub fn from_config(handlers: &[ExceptionHandlerConfig]) -> Self {
        handlers.iter().fold(Self::new(), |chain, config| {
            chain.with(Arc::new(ForwardingExceptionHandler::from_config(config)))
        })
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// The first forward produced by an eligible handler.
    pub fn recover(
        &self,
        failure: &Failure,
        ctx: &DispatchContext,
        request: &mut WebRequest,
        response: &mut WebResponse,
    ) -> Option<Forward> {
        let error_kind = failure.kind();
        let origin = ctx.action().origin();

        for (index, handler) in self.handlers.iter().enumerate() {
            if !handler.support().is_eligible(&error_kind, &origin) {
                continue;
            }
            if let Some(forward) = handler.handle(failure, ctx, request, response) {
                tracing::info!(
                    route = %ctx.route().path(),
                    kind = %error_kind,
                    handler_index = index,
                    forward = %forward,
                    "Failure recovered"
                );
                return Some(forward);
            }
            tracing::debug!(handler_index = index, kind = %error_kind, "Exception handler declined");
        }
        None
    }
}

/// Sends every eligible failure to one fixed forward.
#[derive(Debug, Clone)]
pub struct ForwardingExceptionHandler {
    support: HandlerSupport,
    forward: ForwardDescriptor,
}

impl ForwardingExceptionHandler {
    pub fn new(support: HandlerSupport, forward: ForwardDescriptor) -> Self {
        Self { support, forward }
    }

    pub fn from_config(config: &ExceptionHandlerConfig) -> Self {
        let support = config
            .error_kinds
            .iter()
            .fold(HandlerSupport::new(), |support, kind| support.error_kind(Kind::new(kind.clone())));
        let support = config
            .origin_kinds
            .iter()
            .fold(support, |support, kind| support.origin_kind(Kind::new(kind.clone())));
        Self::new(support, ForwardDescriptor::unnamed(config.path.clone(), config.redirect))
    }
}

impl ExceptionHandler for ForwardingExceptionHandler {
    fn support(&self) -> &HandlerSupport {
        &self.support
    }

    fn handle(
        &self,
        _failure: &Failure,
        _ctx: &DispatchContext,
        _request: &mut WebRequest,
        _response: &mut WebResponse,
    ) -> Option<Forward> {
        Some(self.forward.clone().into())
    }
}
