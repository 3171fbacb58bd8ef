//! Route descriptors and their configuration-time builder.
//!
//! # Responsibilities
//! - Collect route settings while configuration is loaded
//! - Freeze them into an immutable [`RouteDescriptor`]
//! - Answer forward lookups (route forwards, then global forwards)
//!
//! # Design Decisions
//! - The builder is the only mutable form of a route; freezing consumes it
//! - The input forward is derived once, at freeze time
//! - Roles are an ordered set; an empty set means unrestricted
//!
//! Once frozen a route cannot be changed:
//!
//! ```compile_fail
//! use std::sync::Arc;
//! use action_dispatch::routing::{ForwardMap, RouteBuilder};
//!
//! let route = RouteBuilder::new("/login.do", "loginAction")
//!     .freeze(Arc::new(ForwardMap::new()))
//!     .unwrap();
//! route.validate(false);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::routing::forward::ForwardDescriptor;

/// Forwards keyed by name.
pub type ForwardMap = HashMap<String, ForwardDescriptor>;

/// Where a route publishes its form object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Request,
    #[default]
    Session,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Request => f.write_str("request"),
            Scope::Session => f.write_str("session"),
        }
    }
}

/// Split a comma-separated role list, ignoring whitespace around separators.
pub fn parse_roles(roles: &str) -> Vec<String> {
    roles
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

/// Mutable route definition used while configuration is loaded.
#[derive(Debug, Clone)]
pub struct RouteBuilder {
    path: String,
    handler: String,
    scope: Scope,
    validate: bool,
    cancellable: bool,
    input: Option<String>,
    form: Option<String>,
    roles: Vec<String>,
    forwards: ForwardMap,
    properties: BTreeMap<String, String>,
}

impl RouteBuilder {
    /// Start a route for `path` handled by the handler registered as `handler`.
    ///
    /// Validation is on by default; routes are session-scoped and not
    /// cancellable unless configured otherwise.
    pub fn new(path: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            handler: handler.into(),
            scope: Scope::default(),
            validate: true,
            cancellable: false,
            input: None,
            form: None,
            roles: Vec::new(),
            forwards: ForwardMap::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn cancellable(mut self, cancellable: bool) -> Self {
        self.cancellable = cancellable;
        self
    }

    /// Path the user is sent back to when validation fails.
    pub fn input(mut self, input: impl Into<String>) -> Self {
        let input = input.into();
        self.input = if input.trim().is_empty() { None } else { Some(input) };
        self
    }

    /// Attribute name the form object is published under.
    pub fn form(mut self, form: impl Into<String>) -> Self {
        let form = form.into();
        self.form = if form.trim().is_empty() { None } else { Some(form) };
        self
    }

    /// Comma-separated role names. A blank list leaves the route unrestricted.
    /// Repeated names, within one list or across calls, are kept once.
    pub fn roles(mut self, roles: &str) -> Self {
        for role in parse_roles(roles) {
            if !self.roles.contains(&role) {
                self.roles.push(role);
            }
        }
        self
    }

    pub fn forward(self, name: impl Into<String>, path: impl Into<String>) -> Self {
        let name = name.into();
        self.add_forward(ForwardDescriptor::new(name, path, false))
    }

    pub fn redirect(self, name: impl Into<String>, path: impl Into<String>) -> Self {
        let name = name.into();
        self.add_forward(ForwardDescriptor::new(name, path, true))
    }

    /// Register a forward under its own name, or its path when unnamed.
    pub fn add_forward(mut self, forward: ForwardDescriptor) -> Self {
        let key = forward
            .name()
            .filter(|n| !n.is_empty())
            .unwrap_or(forward.path())
            .to_string();
        self.forwards.insert(key, forward);
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Freeze into an immutable descriptor sharing `global_forwards`.
    pub fn freeze(self, global_forwards: Arc<ForwardMap>) -> Result<RouteDescriptor, ConfigurationError> {
        if self.path.trim().is_empty() {
            return Err(ConfigurationError::MissingPath);
        }
        if self.handler.trim().is_empty() {
            return Err(ConfigurationError::MissingHandler { path: self.path });
        }

        let input_forward = self.input.as_ref().map(|input| ForwardDescriptor::to_path(input.clone()));

        Ok(RouteDescriptor {
            path: self.path,
            handler: self.handler,
            scope: self.scope,
            validate: self.validate,
            cancellable: self.cancellable,
            input: self.input,
            input_forward,
            form: self.form,
            roles: self.roles,
            forwards: self.forwards,
            global_forwards,
            properties: self.properties,
        })
    }
}

/// An immutable, configured route.
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    path: String,
    handler: String,
    scope: Scope,
    validate: bool,
    cancellable: bool,
    input: Option<String>,
    input_forward: Option<ForwardDescriptor>,
    form: Option<String>,
    roles: Vec<String>,
    forwards: ForwardMap,
    global_forwards: Arc<ForwardMap>,
    properties: BTreeMap<String, String>,
}

impl RouteDescriptor {
    pub fn builder(path: impl Into<String>, handler: impl Into<String>) -> RouteBuilder {
        RouteBuilder::new(path, handler)
    }

    /// The configured path, possibly a wildcard pattern.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Opaque reference to the business logic serving this route.
    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn validates(&self) -> bool {
        self.validate
    }

    pub fn is_cancellable(&self) -> bool {
        self.cancellable
    }

    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    pub fn input_forward(&self) -> Option<&ForwardDescriptor> {
        self.input_forward.as_ref()
    }

    pub fn form_name(&self) -> Option<&str> {
        self.form.as_deref()
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn forwards(&self) -> &ForwardMap {
        &self.forwards
    }

    pub fn global_forwards(&self) -> &ForwardMap {
        &self.global_forwards
    }

    /// Look up a forward by name: route forwards first, then global forwards.
    pub fn find_forward(&self, name: &str) -> Option<&ForwardDescriptor> {
        let found = self
            .forwards
            .get(name)
            .or_else(|| self.global_forwards.get(name));
        tracing::debug!(route = %self.path, forward = name, found = found.is_some(), "Forward lookup");
        found
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

impl fmt::Display for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "route[path='{}', handler={}, scope={}, validate={}, cancellable={}, input={}, roles={:?}]",
            self.path,
            self.handler,
            self.scope,
            self.validate,
            self.cancellable,
            self.input.as_deref().unwrap_or("-"),
            self.roles
        )
    }
}
