//! Request and response model seen by the pipeline.
//!
//! # Responsibilities
//! - Carry the parts of an HTTP exchange the pipeline reads and writes
//! - Hold request-scoped state (typed extensions and named form attributes)
//! - Hold session state shared across requests of one client
//! - Convert from axum request parts and into axum responses
//!
//! # Design Decisions
//! - Typed request-scope keys live in `http::Extensions`, like axum middleware state
//! - Forms are published under attribute names, not types, so several can coexist
//! - The response is a buffer: nothing is written until the host converts it

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, EXPIRES, PRAGMA};
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use url::form_urlencoded;
use uuid::Uuid;

use crate::dispatch::scope::Cancelled;
use crate::form::Form;

/// Request parameter that marks a submission as cancelled.
pub const CANCEL_PARAM: &str = "dispatch.cancel";

/// Image-button variant of [`CANCEL_PARAM`].
pub const CANCEL_PARAM_X: &str = "dispatch.cancel.x";

/// An authenticated user and the roles they hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    name: String,
    roles: HashSet<String>,
}

impl Principal {
    pub fn new<I, S>(name: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Returns true if the principal holds at least one of `roles`.
    pub fn has_any_role(&self, roles: &[String]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }
}

/// Client session. Shared between requests, safe for concurrent access.
pub struct Session {
    id: String,
    forms: DashMap<String, Arc<dyn Form>>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            forms: DashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn form(&self, name: &str) -> Option<Arc<dyn Form>> {
        self.forms.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn set_form(&self, name: impl Into<String>, form: Arc<dyn Form>) {
        self.forms.insert(name.into(), form);
    }

    pub fn remove_form(&self, name: &str) -> Option<Arc<dyn Form>> {
        self.forms.remove(name).map(|(_, form)| form)
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("forms", &self.forms.len())
            .finish()
    }
}

/// An incoming request as the pipeline sees it.
pub struct WebRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    parameters: Vec<(String, String)>,
    principal: Option<Principal>,
    remote_addr: Option<String>,
    character_encoding: Option<String>,
    session: Option<Arc<Session>>,
    forms: HashMap<String, Arc<dyn Form>>,
    extensions: Extensions,
}

impl WebRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            parameters: Vec::new(),
            principal: None,
            remote_addr: None,
            character_encoding: None,
            session: None,
            forms: HashMap::new(),
            extensions: Extensions::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Build from axum request parts: method, path, headers, query
    /// parameters, charset and extensions carry over.
    pub fn from_parts(parts: Parts) -> Self {
        let parameters: Vec<(String, String)> = parts
            .uri
            .query()
            .map(|query| {
                form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();

        let character_encoding = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(charset_of);

        Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            headers: parts.headers,
            parameters,
            principal: None,
            remote_addr: None,
            character_encoding,
            session: None,
            forms: HashMap::new(),
            extensions: parts.extensions,
        }
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    pub fn with_session(mut self, session: Arc<Session>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_character_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.character_encoding = Some(encoding.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a request parameter.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }

    pub fn character_encoding(&self) -> Option<&str> {
        self.character_encoding.as_deref()
    }

    pub fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }

    /// The current session, created on first use.
    pub fn session_or_create(&mut self) -> Arc<Session> {
        Arc::clone(self.session.get_or_insert_with(|| Arc::new(Session::new())))
    }

    /// A form published into request scope.
    pub fn form_attribute(&self, name: &str) -> Option<&Arc<dyn Form>> {
        self.forms.get(name)
    }

    pub fn set_form_attribute(&mut self, name: impl Into<String>, form: Arc<dyn Form>) {
        self.forms.insert(name.into(), form);
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Flag the request as cancelled.
    pub fn mark_cancelled(&mut self) {
        self.extensions.insert(Cancelled);
    }

    /// Returns true if the request was flagged as cancelled or carries a
    /// cancel parameter.
    pub fn is_cancelled(&self) -> bool {
        self.extensions.get::<Cancelled>().is_some()
            || self.parameter(CANCEL_PARAM).is_some()
            || self.parameter(CANCEL_PARAM_X).is_some()
    }
}

impl fmt::Debug for WebRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("principal", &self.principal.as_ref().map(Principal::name))
            .field("remote_addr", &self.remote_addr)
            .finish_non_exhaustive()
    }
}

/// Extract the `charset` parameter of a content type.
fn charset_of(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|charset| !charset.is_empty())
}

/// The response being assembled by the pipeline.
#[derive(Debug, Clone)]
pub struct WebResponse {
    status: StatusCode,
    headers: HeaderMap,
    character_encoding: Option<String>,
    error_message: Option<String>,
    body: Option<String>,
}

impl WebResponse {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            character_encoding: None,
            error_message: None,
            body: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Add a header value, keeping existing values.
    pub fn add_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }

    /// Replace all values of a header.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn set_content_type(&mut self, content_type: HeaderValue) {
        self.headers.insert(CONTENT_TYPE, content_type);
    }

    /// Disable client and proxy caching.
    pub fn set_no_cache(&mut self) {
        self.headers.insert(PRAGMA, HeaderValue::from_static("No-cache"));
        self.headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, max-age=0, must-revalidate"),
        );
        self.headers.insert(EXPIRES, HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT"));
    }

    pub fn character_encoding(&self) -> Option<&str> {
        self.character_encoding.as_deref()
    }

    pub fn set_character_encoding(&mut self, encoding: impl Into<String>) {
        self.character_encoding = Some(encoding.into());
    }

    /// Mark the response as an error with a client-visible message.
    pub fn send_error(&mut self, status: StatusCode, message: impl Into<String>) {
        self.status = status;
        self.error_message = Some(message.into());
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_error(&self) -> bool {
        self.status.is_client_error() || self.status.is_server_error()
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = Some(body.into());
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

impl Default for WebResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl IntoResponse for WebResponse {
    fn into_response(self) -> Response {
        let mut headers = self.headers;
        if let Some(charset) = &self.character_encoding {
            let content_type = headers
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("text/html");
            if charset_of(content_type).is_none() {
                let value = format!("{}; charset={}", content_type, charset);
                if let Ok(value) = HeaderValue::from_str(&value) {
                    headers.insert(CONTENT_TYPE, value);
                }
            }
        }

        let body = self.body.or(self.error_message).unwrap_or_default();
        (self.status, headers, Body::from(body)).into_response()
    }
}
