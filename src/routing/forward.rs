//! Named outcomes a route can resolve to.
//!
//! # Responsibilities
//! - Describe where control goes after a handler runs (forward or redirect)
//! - Build redirect targets with encoded query parameters and a fragment
//!
//! # Design Decisions
//! - Immutable values; redirect parameters are added with a consuming builder
//! - Redirect target paths are computed on read, never stored pre-encoded

use std::borrow::Cow;
use std::fmt;

use url::form_urlencoded;

/// A named forward to a view or another route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardDescriptor {
    name: Option<String>,
    path: String,
    redirect: bool,
}

impl ForwardDescriptor {
    /// An unnamed, non-redirect forward.
    pub fn to_path(path: impl Into<String>) -> Self {
        Self {
            name: None,
            path: path.into(),
            redirect: false,
        }
    }

    pub fn unnamed(path: impl Into<String>, redirect: bool) -> Self {
        Self {
            name: None,
            path: path.into(),
            redirect,
        }
    }

    pub fn new(name: impl Into<String>, path: impl Into<String>, redirect: bool) -> Self {
        Self {
            name: Some(name.into()),
            path: path.into(),
            redirect,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_redirect(&self) -> bool {
        self.redirect
    }
}

/// A redirect whose target carries query parameters and an optional fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectForward {
    name: Option<String>,
    path: String,
    params: Vec<(String, String)>,
    anchor: Option<String>,
}

impl RedirectForward {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            name: None,
            path: path.into(),
            params: Vec::new(),
            anchor: None,
        }
    }

    /// Start from an existing forward, keeping its name and path.
    pub fn from_forward(forward: &ForwardDescriptor) -> Self {
        Self {
            name: forward.name.clone(),
            path: forward.path.clone(),
            params: Vec::new(),
            anchor: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append a query parameter. Repeated names are kept in insertion order.
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }

    pub fn anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The path before parameters and fragment were applied.
    pub fn original_path(&self) -> &str {
        &self.path
    }

    /// Encoded query string without the leading `?`.
    pub fn query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.params {
            serializer.append_pair(name, value);
        }
        serializer.finish()
    }

    /// The effective redirect target: path, encoded query and fragment.
    pub fn target_path(&self) -> String {
        let mut target = String::with_capacity(self.path.len() + 32);
        target.push_str(&self.path);
        if !self.params.is_empty() {
            target.push(if self.path.contains('?') { '&' } else { '?' });
            target.push_str(&self.query_string());
        }
        if let Some(anchor) = &self.anchor {
            target.push('#');
            target.push_str(anchor);
        }
        target
    }
}

/// The outcome a handler, validator or recovery handler hands to view resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Forward {
    Path(ForwardDescriptor),
    Redirect(RedirectForward),
}

impl Forward {
    pub fn name(&self) -> Option<&str> {
        match self {
            Forward::Path(fwd) => fwd.name(),
            Forward::Redirect(fwd) => fwd.name(),
        }
    }

    pub fn target_path(&self) -> Cow<'_, str> {
        match self {
            Forward::Path(fwd) => Cow::Borrowed(fwd.path()),
            Forward::Redirect(fwd) => Cow::Owned(fwd.target_path()),
        }
    }

    pub fn is_redirect(&self) -> bool {
        match self {
            Forward::Path(fwd) => fwd.is_redirect(),
            Forward::Redirect(_) => true,
        }
    }
}

impl From<ForwardDescriptor> for Forward {
    fn from(fwd: ForwardDescriptor) -> Self {
        Forward::Path(fwd)
    }
}

impl From<RedirectForward> for Forward {
    fn from(fwd: RedirectForward) -> Self {
        Forward::Redirect(fwd)
    }
}

impl fmt::Display for Forward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "forward[name={}, path={}, redirect={}]",
            self.name().unwrap_or("-"),
            self.target_path(),
            self.is_redirect()
        )
    }
}
