//! The per-request dispatch state machine.
//!
//! # Responsibilities
//! - Run the fixed stage sequence for one resolved request
//! - Short-circuit on authorization denial and on validation errors
//! - Recover handler failures locally, everything else at the boundary
//! - Publish one execution event per request, whatever the outcome
//!
//! # Stages
//! 1. Publish the dispatch context into request scope
//! 2. Response headers (global headers, content type, no-cache)
//! 3. Character encoding override
//! 4. Authorization (hard stop with 403)
//! 5. Publish the form into the route's scope
//! 6. Validation (errors resolve to the route's input forward)
//! 7. Execute the action (failures offered to the exception handler chain)
//! 8. Forward → view
//! 9. Execution event (always)
//!
//! # Design Decisions
//! - Header settings are parsed when the pipeline is built, so stage 2 cannot fail
//! - Authorization denial is an outcome, never an error
//! - Failures escaping the stages get one more pass through the handler chain
//!   with the published context before the unhandled hook runs

use std::sync::Arc;
use std::time::{Instant, SystemTime};

use axum::http::{HeaderName, HeaderValue, StatusCode};

use crate::config::PipelineConfig;
use crate::dispatch::context::DispatchContext;
use crate::dispatch::scope::{CurrentFailure, ErrorAttributes};
use crate::dispatch::view::{DefaultViewGenerator, ViewGenerator, ViewTarget};
use crate::dispatch::web::{WebRequest, WebResponse};
use crate::error::{ConfigurationError, Failure};
use crate::observability::events::{epoch_millis, EventPublisher, ExecutionEvent, FailureSummary, TracingEventPublisher};
use crate::observability::metrics;
use crate::recovery::{ErrorPageHook, ExceptionHandler, ExceptionHandlerChain, UnhandledFailureHook};
use crate::routing::{Forward, RouteDescriptor, Scope};
use crate::validation::{FormValidator, ValidationErrors, ValidatorChain};

/// Resolves the user name reported in execution events.
pub type UserDetails = dyn Fn(&WebRequest) -> Option<String> + Send + Sync;

/// How a dispatch ended.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// Render this view.
    View(ViewTarget),
    /// The action produced the full response; nothing to render.
    Completed,
    /// The principal lacks every role the route requires.
    Forbidden,
    /// A failure was turned into a view by an exception handler.
    Recovered { failure: Failure, view: ViewTarget },
    /// Nobody recovered the failure; the unhandled hook ran.
    Unhandled {
        failure: Failure,
        view: Option<ViewTarget>,
    },
}

impl DispatchOutcome {
    /// Metric and log label.
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::View(_) => "view",
            DispatchOutcome::Completed => "completed",
            DispatchOutcome::Forbidden => "forbidden",
            DispatchOutcome::Recovered { .. } => "recovered",
            DispatchOutcome::Unhandled { .. } => "unhandled",
        }
    }

    pub fn view(&self) -> Option<&ViewTarget> {
        match self {
            DispatchOutcome::View(view) | DispatchOutcome::Recovered { view, .. } => Some(view),
            DispatchOutcome::Unhandled { view, .. } => view.as_ref(),
            DispatchOutcome::Completed | DispatchOutcome::Forbidden => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            DispatchOutcome::Recovered { failure, .. } | DispatchOutcome::Unhandled { failure, .. } => {
                Some(failure)
            }
            _ => None,
        }
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, DispatchOutcome::Forbidden)
    }
}

/// Parsed, ready-to-apply pipeline settings.
#[derive(Debug, Clone, Default)]
struct Settings {
    response_headers: Vec<(HeaderName, HeaderValue)>,
    content_type: Option<HeaderValue>,
    no_cache: bool,
    character_encoding: bool,
    charset: Option<String>,
    expose_error_attributes: bool,
}

impl Settings {
    fn from_config(config: &PipelineConfig) -> Result<Self, ConfigurationError> {
        let mut response_headers = Vec::new();
        for (name, values) in &config.response_headers {
            let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid_header(name, e))?;
            for value in values {
                let value = HeaderValue::from_str(value).map_err(|e| invalid_header(name, e))?;
                response_headers.push((header.clone(), value));
            }
        }

        let content_type = config
            .content_type
            .as_deref()
            .filter(|ct| !ct.trim().is_empty())
            .map(|ct| HeaderValue::from_str(ct).map_err(|e| invalid_header("content-type", e)))
            .transpose()?;

        Ok(Self {
            response_headers,
            content_type,
            no_cache: config.no_cache,
            character_encoding: config.character_encoding,
            charset: config.charset.clone().filter(|c| !c.trim().is_empty()),
            expose_error_attributes: config.expose_error_attributes,
        })
    }
}

fn invalid_header(name: &str, err: impl std::fmt::Display) -> ConfigurationError {
    ConfigurationError::InvalidHeader {
        name: name.to_string(),
        reason: err.to_string(),
    }
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    config: PipelineConfig,
    validators: ValidatorChain,
    exception_handlers: ExceptionHandlerChain,
    view_generator: Arc<dyn ViewGenerator>,
    unhandled_hook: Option<Arc<dyn UnhandledFailureHook>>,
    event_publisher: Option<Arc<dyn EventPublisher>>,
    user_details: Option<Arc<UserDetails>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            validators: ValidatorChain::new(),
            exception_handlers: ExceptionHandlerChain::new(),
            view_generator: Arc::new(DefaultViewGenerator),
            unhandled_hook: None,
            event_publisher: None,
            user_details: None,
        }
    }

    /// Apply pipeline settings. Enables the tracing event publisher when the
    /// configuration asks for events and none was set.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        if config.publish_events && self.event_publisher.is_none() {
            self.event_publisher = Some(Arc::new(TracingEventPublisher));
        }
        self.config = config;
        self
    }

    pub fn validator(mut self, validator: Arc<dyn FormValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn exception_handler(mut self, handler: Arc<dyn ExceptionHandler>) -> Self {
        self.exception_handlers.push(handler);
        self
    }

    pub fn exception_handlers(mut self, chain: ExceptionHandlerChain) -> Self {
        self.exception_handlers = chain;
        self
    }

    pub fn view_generator(mut self, generator: Arc<dyn ViewGenerator>) -> Self {
        self.view_generator = generator;
        self
    }

    /// Defaults to an [`ErrorPageHook`] for the configured default error page.
    pub fn unhandled_hook(mut self, hook: Arc<dyn UnhandledFailureHook>) -> Self {
        self.unhandled_hook = Some(hook);
        self
    }

    /// Publish execution events to `publisher`, regardless of `publish_events`.
    pub fn event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.event_publisher = Some(publisher);
        self
    }

    pub fn user_details(mut self, details: Arc<UserDetails>) -> Self {
        self.user_details = Some(details);
        self
    }

    pub fn build(self) -> Result<Pipeline, ConfigurationError> {
        let settings = Settings::from_config(&self.config)?;
        let unhandled_hook = self
            .unhandled_hook
            .unwrap_or_else(|| Arc::new(ErrorPageHook::new(self.config.default_error_page.clone())));

        Ok(Pipeline {
            settings,
            validators: self.validators,
            exception_handlers: self.exception_handlers,
            view_generator: self.view_generator,
            unhandled_hook,
            event_publisher: self.event_publisher,
            user_details: self.user_details,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Executes the dispatch stages for resolved requests. Shared by all requests.
pub struct Pipeline {
    settings: Settings,
    validators: ValidatorChain,
    exception_handlers: ExceptionHandlerChain,
    view_generator: Arc<dyn ViewGenerator>,
    unhandled_hook: Arc<dyn UnhandledFailureHook>,
    event_publisher: Option<Arc<dyn EventPublisher>>,
    user_details: Option<Arc<UserDetails>>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Run every stage for one request.
    pub fn dispatch(
        &self,
        ctx: Arc<DispatchContext>,
        request: &mut WebRequest,
        response: &mut WebResponse,
    ) -> DispatchOutcome {
        let start = Instant::now();
        let started_at = SystemTime::now();
        let span = tracing::debug_span!(
            "dispatch",
            path = %request.path(),
            handler = %ctx.route().handler()
        );
        let _enter = span.enter();

        let outcome = match self.run(&ctx, request, response) {
            Ok(outcome) => outcome,
            Err(failure) => self.recover_at_boundary(failure, request, response),
        };

        self.publish_event(&ctx, request, response, &outcome, started_at, start);
        metrics::record_dispatch(outcome.label(), start);
        tracing::debug!(outcome = outcome.label(), status = response.status().as_u16(), "Dispatch finished");
        outcome
    }

    fn run(
        &self,
        ctx: &Arc<DispatchContext>,
        request: &mut WebRequest,
        response: &mut WebResponse,
    ) -> Result<DispatchOutcome, Failure> {
        let route = ctx.route();

        request.extensions_mut().insert(Arc::clone(ctx));
        self.apply_headers(response);
        self.apply_encoding(request, response);

        if !is_authorized(route, request) {
            tracing::warn!(
                route = %route.path(),
                user = request.principal().map(|p| p.name()).unwrap_or("-"),
                "Access denied"
            );
            response.send_error(
                StatusCode::FORBIDDEN,
                format!("You are not Authorized to access path ['{}']", route.path()),
            );
            return Ok(DispatchOutcome::Forbidden);
        }

        bind_form_scope(ctx, request);

        if let Some(input) = self.validate(ctx, request)? {
            return Ok(self.resolve_view(Some(input), request));
        }

        match self.execute(ctx, request, response) {
            Ok(forward) => Ok(self.resolve_view(forward, request)),
            Err(failure) => {
                self.publish_failure(ctx, &failure, request);
                match self.exception_handlers.recover(&failure, ctx, request, response) {
                    Some(forward) => {
                        let view = self.view_generator.generate(&forward, request);
                        Ok(DispatchOutcome::Recovered { failure, view })
                    }
                    None => Err(failure),
                }
            }
        }
    }

    fn apply_headers(&self, response: &mut WebResponse) {
        for (name, value) in &self.settings.response_headers {
            response.add_header(name.clone(), value.clone());
        }
        if let Some(content_type) = &self.settings.content_type {
            response.set_content_type(content_type.clone());
        }
        if self.settings.no_cache {
            response.set_no_cache();
        }
    }

    fn apply_encoding(&self, request: &WebRequest, response: &mut WebResponse) {
        if !self.settings.character_encoding {
            return;
        }
        let charset = self
            .settings
            .charset
            .as_deref()
            .or_else(|| request.character_encoding());
        if let Some(charset) = charset {
            response.set_character_encoding(charset);
        }
    }

    /// Returns the input forward when validation recorded errors.
    fn validate(&self, ctx: &DispatchContext, request: &mut WebRequest) -> Result<Option<Forward>, Failure> {
        let route = ctx.route();
        if !route.validates() {
            return Ok(None);
        }

        let mut errors = ValidationErrors::new();
        self.validators.validate(ctx, request, &mut errors)?;
        if errors.is_empty() {
            return Ok(None);
        }

        tracing::debug!(route = %route.path(), errors = errors.len(), "Validation failed, returning to input");
        request.extensions_mut().insert(errors);
        match route.input_forward() {
            Some(input) => Ok(Some(input.clone().into())),
            None => Err(ConfigurationError::MissingInputForward {
                path: route.path().to_string(),
            }
            .into()),
        }
    }

    fn execute(
        &self,
        ctx: &DispatchContext,
        request: &mut WebRequest,
        response: &mut WebResponse,
    ) -> Result<Option<Forward>, Failure> {
        let route = ctx.route();
        let form = ctx.form().map(|form| &**form);
        ctx.action()
            .execute(route, form, request, response)
            .map_err(|err| {
                tracing::warn!(route = %route.path(), kind = %err.kind(), error = %err, "Action failed");
                Failure::from(err)
            })
    }

    fn resolve_view(&self, forward: Option<Forward>, request: &WebRequest) -> DispatchOutcome {
        match forward {
            Some(forward) => DispatchOutcome::View(self.view_generator.generate(&forward, request)),
            None => DispatchOutcome::Completed,
        }
    }

    /// Record the failure on the context and in request scope.
    fn publish_failure(&self, ctx: &DispatchContext, failure: &Failure, request: &mut WebRequest) {
        ctx.set_execution_failure(failure.clone());
        request.extensions_mut().insert(CurrentFailure(failure.clone()));
        if self.settings.expose_error_attributes {
            let attributes = ErrorAttributes::from_failure(failure, request.path());
            request.extensions_mut().insert(attributes);
        }
    }

    fn recover_at_boundary(
        &self,
        failure: Failure,
        request: &mut WebRequest,
        response: &mut WebResponse,
    ) -> DispatchOutcome {
        tracing::error!(
            path = %request.path(),
            correlation_id = %failure.correlation_id(),
            kind = %failure.kind(),
            error = %failure,
            "Dispatch failed"
        );

        let ctx = request.extensions().get::<Arc<DispatchContext>>().cloned();
        if let Some(ctx) = ctx {
            let published = ctx
                .execution_failure()
                .is_some_and(|current| current.same_as(&failure));
            if !published {
                self.publish_failure(&ctx, &failure, request);
            }
            if let Some(forward) = self.exception_handlers.recover(&failure, &ctx, request, response) {
                let view = self.view_generator.generate(&forward, request);
                return DispatchOutcome::Recovered { failure, view };
            }
        } else {
            request.extensions_mut().insert(CurrentFailure(failure.clone()));
        }

        let view = self.unhandled_hook.on_unhandled(&failure, request, response);
        DispatchOutcome::Unhandled { failure, view }
    }

    fn publish_event(
        &self,
        ctx: &DispatchContext,
        request: &WebRequest,
        response: &WebResponse,
        outcome: &DispatchOutcome,
        started_at: SystemTime,
        start: Instant,
    ) {
        let Some(publisher) = &self.event_publisher else {
            return;
        };

        let user = self
            .user_details
            .as_ref()
            .and_then(|details| details(request))
            .or_else(|| request.principal().map(|p| p.name().to_string()));

        let failure = outcome.failure().map(|failure| FailureSummary {
            kind: failure.kind().to_string(),
            message: failure.to_string(),
            correlation_id: failure.correlation_id(),
            recovered: matches!(outcome, DispatchOutcome::Recovered { .. }),
        });

        let event = ExecutionEvent {
            path: request.path().to_string(),
            method: request.method().to_string(),
            remote_addr: request.remote_addr().map(String::from),
            handler: ctx.route().handler().to_string(),
            session_id: request.session().map(|s| s.id().to_string()),
            user,
            started_at: epoch_millis(started_at),
            duration_ms: start.elapsed().as_millis() as u64,
            outcome: outcome.label(),
            status: response.status().as_u16(),
            failure,
        };
        publisher.publish(&event);
    }
}

fn is_authorized(route: &RouteDescriptor, request: &WebRequest) -> bool {
    let roles = route.roles();
    roles.is_empty()
        || request
            .principal()
            .is_some_and(|principal| principal.has_any_role(roles))
}

fn bind_form_scope(ctx: &DispatchContext, request: &mut WebRequest) {
    let (Some(form), Some(name)) = (ctx.form(), ctx.form_name()) else {
        return;
    };
    match ctx.route().scope() {
        Scope::Request => request.set_form_attribute(name, Arc::clone(form)),
        Scope::Session => request.session_or_create().set_form(name, Arc::clone(form)),
    }
    tracing::trace!(form = name, scope = %ctx.route().scope(), "Form published");
}
