//! Business-logic handlers invoked by the pipeline.
//!
//! # Responsibilities
//! - Define the `Action` capability the execute stage calls
//! - Adapt plain closures into actions
//! - Look up actions by the handler reference a route names
//!
//! # Design Decisions
//! - Actions declare an origin kind; exception handlers may select on it
//! - The registry is filled at startup and read-only afterwards

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::dispatch::web::{WebRequest, WebResponse};
use crate::error::{kinds, HandlerError, Kind};
use crate::form::Form;
use crate::routing::{Forward, RouteDescriptor};

/// Business logic bound to a route.
pub trait Action: Send + Sync {
    /// Classification of this action for exception-handler selection.
    fn origin(&self) -> Kind {
        kinds::HANDLER
    }

    /// Run the action. `Ok(None)` means the response is complete and nothing
    /// is left to render.
    fn execute(
        &self,
        route: &RouteDescriptor,
        form: Option<&dyn Form>,
        request: &mut WebRequest,
        response: &mut WebResponse,
    ) -> Result<Option<Forward>, HandlerError>;
}

type ActionFn = dyn Fn(&RouteDescriptor, Option<&dyn Form>, &mut WebRequest, &mut WebResponse) -> Result<Option<Forward>, HandlerError>
    + Send
    + Sync;

/// An action backed by a closure.
pub struct FnAction {
    origin: Kind,
    f: Box<ActionFn>,
}

impl FnAction {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&RouteDescriptor, Option<&dyn Form>, &mut WebRequest, &mut WebResponse) -> Result<Option<Forward>, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            origin: kinds::HANDLER,
            f: Box::new(f),
        }
    }

    /// Same as `new`, already shared.
    pub fn shared<F>(f: F) -> Arc<dyn Action>
    where
        F: Fn(&RouteDescriptor, Option<&dyn Form>, &mut WebRequest, &mut WebResponse) -> Result<Option<Forward>, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(Self::new(f))
    }

    pub fn with_origin(mut self, origin: impl Into<Kind>) -> Self {
        self.origin = origin.into();
        self
    }
}

impl Action for FnAction {
    fn origin(&self) -> Kind {
        self.origin.clone()
    }

    fn execute(
        &self,
        route: &RouteDescriptor,
        form: Option<&dyn Form>,
        request: &mut WebRequest,
        response: &mut WebResponse,
    ) -> Result<Option<Forward>, HandlerError> {
        (self.f)(route, form, request, response)
    }
}

impl fmt::Debug for FnAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction").field("origin", &self.origin).finish()
    }
}

/// Actions keyed by handler reference.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: impl Into<String>, action: Arc<dyn Action>) -> Self {
        self.actions.insert(name.into(), action);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.actions.keys().collect();
        names.sort();
        f.debug_struct("ActionRegistry").field("actions", &names).finish()
    }
}
