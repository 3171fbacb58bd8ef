//! Request entry point tying resolution, action lookup and the pipeline together.

use std::sync::Arc;

use crate::config::DispatchConfig;
use crate::dispatch::action::ActionRegistry;
use crate::dispatch::context::{ContextOptions, DispatchContext};
use crate::dispatch::pipeline::{DispatchOutcome, Pipeline};
use crate::dispatch::web::{WebRequest, WebResponse};
use crate::error::{ConfigurationError, DispatchError};
use crate::recovery::ExceptionHandlerChain;
use crate::routing::{RouteRegistry, RouteResolver};

/// Resolves a request, finds its action and runs the pipeline.
pub struct Dispatcher {
    resolver: RouteResolver,
    actions: ActionRegistry,
    pipeline: Pipeline,
}

impl Dispatcher {
    pub fn new(resolver: RouteResolver, actions: ActionRegistry, pipeline: Pipeline) -> Self {
        Self {
            resolver,
            actions,
            pipeline,
        }
    }

    /// Freeze the configured routes and build a pipeline with config-driven
    /// exception handlers.
    ///
    /// Handler references are checked at dispatch time, so actions may be
    /// registered for a subset of routes.
    pub fn from_config(config: &DispatchConfig, actions: ActionRegistry) -> Result<Self, ConfigurationError> {
        let registry = Arc::new(RouteRegistry::from_config(config)?);
        let pipeline = Pipeline::builder()
            .config(config.pipeline.clone())
            .exception_handlers(ExceptionHandlerChain::from_config(&config.exception_handlers))
            .build()?;

        let missing: Vec<&str> = registry
            .routes()
            .iter()
            .map(|route| route.handler())
            .filter(|handler| !actions.contains(handler))
            .collect();
        if !missing.is_empty() {
            tracing::warn!(handlers = ?missing, "Routes reference unregistered actions");
        }

        Ok(Self::new(RouteResolver::new(registry), actions, pipeline))
    }

    pub fn resolver(&self) -> &RouteResolver {
        &self.resolver
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Dispatch one request.
    ///
    /// Resolution and context failures are returned as `Err`; everything
    /// after the context exists ends in a [`DispatchOutcome`].
    pub fn dispatch(
        &self,
        request: &mut WebRequest,
        response: &mut WebResponse,
        options: ContextOptions,
    ) -> Result<DispatchOutcome, DispatchError> {
        let resolution = self.resolver.resolve_into(request)?;
        let route = resolution.route;

        let action = self
            .actions
            .get(route.handler())
            .ok_or_else(|| ConfigurationError::UnknownHandler {
                path: route.path().to_string(),
                handler: route.handler().to_string(),
            })?;

        let ctx = DispatchContext::new(route, action, options)?;
        Ok(self.pipeline.dispatch(Arc::new(ctx), request, response))
    }
}
