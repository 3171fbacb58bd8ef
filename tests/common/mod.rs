//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use action_dispatch::config::{parse_config, DispatchConfig};
use action_dispatch::dispatch::{ActionRegistry, DispatchContext, FnAction, WebRequest, WebResponse};
use action_dispatch::error::{Failure, HandlerError};
use action_dispatch::form::{DynaForm, FieldSpec};
use action_dispatch::observability::{EventPublisher, ExecutionEvent};
use action_dispatch::recovery::{ExceptionHandler, HandlerSupport};
use action_dispatch::routing::{Forward, ForwardDescriptor};

/// A small order-entry application.
pub const ORDERS_CONFIG: &str = r#"
[pipeline]
no_cache = true
content_type = "text/html"
default_error_page = "/error.jsp"
[pipeline.response_headers]
X-Frame-Options = ["DENY"]

[[global_forwards]]
name = "login"
path = "/login.jsp"

[[routes]]
path = "/orders/list.do"
handler = "list"
validate = false
forwards = [{ name = "success", path = "/orders/list.jsp" }]

[[routes]]
path = "/orders/save.do"
handler = "save"
scope = "request"
input = "/orders/edit.jsp"
cancellable = true
form = "orderForm"
forwards = [
    { name = "success", path = "/orders/list.do", redirect = true },
]

[[routes]]
path = "/admin/purge.do"
handler = "purge"
validate = false
roles = "ADMIN, OPS"
forwards = [{ name = "success", path = "/admin/done.jsp" }]

[[routes]]
path = "/Prepare*.do"
handler = "prepare"
validate = false
forwards = [{ name = "success", path = "/jsp/{1}/prepare.jsp" }]

[[routes]]
path = "/billing/charge.do"
handler = "charge"
validate = false

[[routes]]
path = "/audit/*.do"
handler = "audit"
validate = false

[[exception_handlers]]
error_kinds = ["billing"]
path = "/billing-error.jsp"
"#;

pub fn orders_config() -> DispatchConfig {
    parse_config(ORDERS_CONFIG).unwrap()
}

/// Action returning the route's `success` forward.
pub fn success_action() -> Arc<dyn action_dispatch::dispatch::Action> {
    FnAction::shared(|route, _, _, _| Ok(route.find_forward("success").cloned().map(Forward::from)))
}

/// Action failing with the given kind.
pub fn failing_action(kind: &'static str) -> Arc<dyn action_dispatch::dispatch::Action> {
    FnAction::shared(move |_, _, _, _| Err(HandlerError::new(kind, "backend unavailable")))
}

pub fn orders_actions() -> ActionRegistry {
    ActionRegistry::new()
        .register("list", success_action())
        .register("save", success_action())
        .register("purge", success_action())
        .register("prepare", success_action())
        .register("charge", failing_action("billing.timeout"))
        .register("audit", failing_action("audit.store"))
}

/// Form with one required field.
pub fn order_form(customer: Option<&str>) -> DynaForm {
    let mut form = DynaForm::new("orderForm", vec![FieldSpec::text("customer").required()]);
    if let Some(customer) = customer {
        form.set_raw("customer", customer).unwrap();
    }
    form
}

/// Keeps every published event.
#[derive(Default)]
pub struct CollectingPublisher {
    events: Mutex<Vec<ExecutionEvent>>,
}

impl CollectingPublisher {
    pub fn events(&self) -> Vec<ExecutionEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventPublisher for CollectingPublisher {
    fn publish(&self, event: &ExecutionEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Exception handler that counts calls and forwards to a fixed path.
pub struct CountingHandler {
    support: HandlerSupport,
    forward: Option<ForwardDescriptor>,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<Failure>>,
}

impl CountingHandler {
    pub fn new(support: HandlerSupport, forward: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            support,
            forward: forward.map(ForwardDescriptor::to_path),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ExceptionHandler for CountingHandler {
    fn support(&self) -> &HandlerSupport {
        &self.support
    }

    fn handle(
        &self,
        failure: &Failure,
        _ctx: &DispatchContext,
        _request: &mut WebRequest,
        _response: &mut WebResponse,
    ) -> Option<Forward> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(failure.clone());
        self.forward.clone().map(Forward::from)
    }
}
