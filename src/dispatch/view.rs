//! Forward → view translation.
//!
//! # Responsibilities
//! - Turn the forward chosen by a stage into a view name for the renderer
//! - Rebuild wildcard routes' targets from the captured groups
//!
//! # Design Decisions
//! - `{N}` placeholders take capture group N; unknown indices stay as written
//! - Redirects are expressed as a `redirect:` view-name prefix

use std::fmt;

use serde::Serialize;

use crate::dispatch::scope::WildcardGroups;
use crate::dispatch::web::WebRequest;
use crate::routing::{Captures, Forward};

/// View-name prefix marking a redirect.
pub const REDIRECT_PREFIX: &str = "redirect:";

/// What the external renderer should produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewTarget {
    name: String,
    redirect: bool,
}

impl ViewTarget {
    pub fn forward(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            redirect: false,
        }
    }

    pub fn redirect(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = if path.starts_with(REDIRECT_PREFIX) {
            path
        } else {
            format!("{}{}", REDIRECT_PREFIX, path)
        };
        Self { name, redirect: true }
    }

    /// View name, including the redirect prefix for redirects.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_redirect(&self) -> bool {
        self.redirect
    }

    /// The target path without the redirect prefix.
    pub fn path(&self) -> &str {
        self.name.strip_prefix(REDIRECT_PREFIX).unwrap_or(&self.name)
    }
}

impl fmt::Display for ViewTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Produces the view for a forward.
pub trait ViewGenerator: Send + Sync {
    fn generate(&self, forward: &Forward, request: &WebRequest) -> ViewTarget;
}

/// Substitutes wildcard captures and prefixes redirects.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultViewGenerator;

impl ViewGenerator for DefaultViewGenerator {
    fn generate(&self, forward: &Forward, request: &WebRequest) -> ViewTarget {
        let target = forward.target_path();
        let path = match request.extensions().get::<WildcardGroups>() {
            Some(groups) => substitute_groups(&target, &groups.0),
            None => target.into_owned(),
        };

        if forward.is_redirect() {
            ViewTarget::redirect(path)
        } else {
            ViewTarget::forward(path)
        }
    }
}

/// Replace `{N}` with capture group N.
pub fn substitute_groups(template: &str, captures: &Captures) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            let value = captures.get(index)?;
            Some((value, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
