//! Configuration schema definitions.
//!
//! This module defines the configuration structure for routes, forwards,
//! exception handlers and pipeline behavior.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::routing::{ForwardDescriptor, RouteBuilder, Scope};

/// Root configuration for the dispatcher.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DispatchConfig {
    /// Pipeline behavior (headers, encoding, telemetry).
    pub pipeline: PipelineConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Forwards visible from every route.
    pub global_forwards: Vec<ForwardConfig>,

    /// Route definitions, in resolution order.
    pub routes: Vec<RouteConfig>,

    /// Exception handlers, in selection order.
    pub exception_handlers: Vec<ExceptionHandlerConfig>,
}

/// Pipeline behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Emit no-cache headers on every response.
    pub no_cache: bool,

    /// Content type applied to every response, if set.
    pub content_type: Option<String>,

    /// Override the response character encoding.
    pub character_encoding: bool,

    /// Charset used by the encoding override. Falls back to the request's.
    pub charset: Option<String>,

    /// Publish one execution event per request.
    pub publish_events: bool,

    /// Publish error attributes into the request on the error path.
    pub expose_error_attributes: bool,

    /// View rendered for failures nobody recovered.
    pub default_error_page: Option<String>,

    /// Reject validating routes that lack an input path at load time.
    pub strict_routes: bool,

    /// Headers added to every response (name → values).
    pub response_headers: BTreeMap<String, Vec<String>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            no_cache: false,
            content_type: None,
            character_encoding: false,
            charset: Some("UTF-8".to_string()),
            publish_events: false,
            expose_error_attributes: false,
            default_error_page: None,
            strict_routes: false,
            response_headers: BTreeMap::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Include the event target in log lines.
    pub log_targets: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "action_dispatch=info".to_string(),
            log_targets: true,
        }
    }
}

/// A named forward.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForwardConfig {
    pub name: String,

    /// Target view or route path.
    pub path: String,

    #[serde(default)]
    pub redirect: bool,
}

impl ForwardConfig {
    pub fn to_descriptor(&self) -> ForwardDescriptor {
        ForwardDescriptor::new(self.name.clone(), self.path.clone(), self.redirect)
    }
}

/// One configured route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Request path or wildcard pattern.
    pub path: String,

    /// Name of the registered action serving this route.
    pub handler: String,

    #[serde(default)]
    pub scope: Scope,

    #[serde(default = "default_validate")]
    pub validate: bool,

    #[serde(default)]
    pub cancellable: bool,

    /// Path the user is sent back to when validation fails.
    #[serde(default)]
    pub input: Option<String>,

    /// Comma-separated role names.
    #[serde(default)]
    pub roles: String,

    /// Attribute name the form is published under.
    #[serde(default)]
    pub form: Option<String>,

    #[serde(default)]
    pub forwards: Vec<ForwardConfig>,

    /// Arbitrary metadata.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

fn default_validate() -> bool {
    true
}

impl RouteConfig {
    /// Translate into a route builder, ready to be frozen.
    pub fn to_builder(&self) -> RouteBuilder {
        let mut builder = RouteBuilder::new(self.path.clone(), self.handler.clone())
            .scope(self.scope)
            .validate(self.validate)
            .cancellable(self.cancellable)
            .roles(&self.roles);
        if let Some(input) = &self.input {
            builder = builder.input(input.clone());
        }
        if let Some(form) = &self.form {
            builder = builder.form(form.clone());
        }
        for forward in &self.forwards {
            builder = builder.add_forward(forward.to_descriptor());
        }
        for (key, value) in &self.properties {
            builder = builder.property(key.clone(), value.clone());
        }
        builder
    }
}

/// A recovery rule: failures of the listed kinds, or from the listed origins,
/// are sent to a fixed forward.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExceptionHandlerConfig {
    #[serde(default)]
    pub error_kinds: Vec<String>,

    #[serde(default)]
    pub origin_kinds: Vec<String>,

    pub path: String,

    #[serde(default)]
    pub redirect: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_route_defaults() {
        let config: DispatchConfig = toml::from_str(
            r#"
            [[routes]]
            path = "/login.do"
            handler = "loginAction"
            "#,
        )
        .unwrap();

        let route = &config.routes[0];
        assert!(route.validate);
        assert!(!route.cancellable);
        assert_eq!(route.scope, Scope::Session);
        assert!(route.input.is_none());
        assert_eq!(config.pipeline.charset.as_deref(), Some("UTF-8"));
        assert!(!config.pipeline.publish_events);
    }

    #[test]
    fn test_route_to_builder() {
        let config: DispatchConfig = toml::from_str(
            r#"
            [[global_forwards]]
            name = "login"
            path = "/login.jsp"

            [[routes]]
            path = "/Prepare*.do"
            handler = "prepareAction"
            scope = "request"
            validate = false
            input = "/jsp/{1}/input.jsp"
            roles = "ADMIN, CSR"
            form = "prepareForm"
            forwards = [{ name = "success", path = "/jsp/{1}/done.jsp", redirect = true }]
            [routes.properties]
            owner = "ops"
            "#,
        )
        .unwrap();

        let globals = std::sync::Arc::new(
            config
                .global_forwards
                .iter()
                .map(|f| (f.name.clone(), f.to_descriptor()))
                .collect(),
        );
        let route = config.routes[0].to_builder().freeze(globals).unwrap();

        assert_eq!(route.scope(), Scope::Request);
        assert!(!route.validates());
        assert_eq!(route.roles(), ["ADMIN", "CSR"]);
        assert_eq!(route.form_name(), Some("prepareForm"));
        assert_eq!(route.input(), Some("/jsp/{1}/input.jsp"));
        assert!(route.find_forward("success").unwrap().is_redirect());
        assert_eq!(route.find_forward("login").unwrap().path(), "/login.jsp");
        assert_eq!(route.property("owner"), Some("ops"));
    }
}
