//! End-to-end dispatch through the pipeline stages.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use axum::http::StatusCode;

use action_dispatch::config::DispatchConfig;
use action_dispatch::dispatch::scope::{Cancelled, CurrentFailure, ErrorAttributes};
use action_dispatch::dispatch::{
    ActionRegistry, ContextOptions, DispatchOutcome, Dispatcher, FnAction, Pipeline, Principal, Session,
    WebRequest, WebResponse, CANCEL_PARAM,
};
use action_dispatch::error::{kinds, ConfigurationError, DispatchError};
use action_dispatch::recovery::{ExceptionHandlerChain, HandlerSupport};
use action_dispatch::routing::{RouteRegistry, RouteResolver};
use action_dispatch::validation::ValidationErrors;

mod common;

use common::{CollectingPublisher, CountingHandler};

fn dispatcher() -> Dispatcher {
    Dispatcher::from_config(&common::orders_config(), common::orders_actions()).unwrap()
}

fn custom(config: &DispatchConfig, actions: ActionRegistry, pipeline: Pipeline) -> Dispatcher {
    let registry = RouteRegistry::from_config(config).unwrap();
    Dispatcher::new(RouteResolver::new(Arc::new(registry)), actions, pipeline)
}

fn run(dispatcher: &Dispatcher, request: &mut WebRequest, options: ContextOptions) -> (DispatchOutcome, WebResponse) {
    let mut response = WebResponse::new();
    let outcome = dispatcher.dispatch(request, &mut response, options).unwrap();
    (outcome, response)
}

#[test]
fn test_success_applies_headers_and_resolves_view() {
    let (outcome, response) = run(&dispatcher(), &mut WebRequest::get("/orders/list.do"), ContextOptions::default());

    assert_eq!(outcome.label(), "view");
    assert_eq!(outcome.view().unwrap().name(), "/orders/list.jsp");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-frame-options"], "DENY");
    assert_eq!(response.headers()[CONTENT_TYPE], "text/html");
    assert_eq!(response.headers()[PRAGMA], "No-cache");
    assert!(response.headers().contains_key(CACHE_CONTROL));
}

#[test]
fn test_wildcard_groups_reach_the_view() {
    let (outcome, _) = run(&dispatcher(), &mut WebRequest::get("/PrepareInvoice.do"), ContextOptions::default());
    assert_eq!(outcome.view().unwrap().name(), "/jsp/Invoice/prepare.jsp");
}

#[test]
fn test_authorization_denied_is_terminal() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invoked);
    let actions = common::orders_actions().register(
        "purge",
        FnAction::shared(move |_, _, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }),
    );
    let dispatcher = Dispatcher::from_config(&common::orders_config(), actions).unwrap();

    let mut request = WebRequest::post("/admin/purge.do").with_principal(Principal::new("bob", ["CSR"]));
    let (outcome, response) = run(&dispatcher, &mut request, ContextOptions::default());

    assert!(outcome.is_forbidden());
    assert!(outcome.view().is_none());
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        response.error_message(),
        Some("You are not Authorized to access path ['/admin/purge.do']")
    );
    assert_eq!(invoked.load(Ordering::SeqCst), 0);

    let mut request = WebRequest::post("/admin/purge.do");
    let (outcome, _) = run(&dispatcher, &mut request, ContextOptions::default());
    assert!(outcome.is_forbidden());

    let mut request = WebRequest::post("/admin/purge.do").with_principal(Principal::new("alice", ["OPS"]));
    let (outcome, response) = run(&dispatcher, &mut request, ContextOptions::default());
    assert!(matches!(outcome, DispatchOutcome::Completed));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(invoked.load(Ordering::SeqCst), 1);
}

#[test]
fn test_validation_errors_return_to_input() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invoked);
    let actions = common::orders_actions().register(
        "save",
        FnAction::shared(move |_, _, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }),
    );
    let dispatcher = Dispatcher::from_config(&common::orders_config(), actions).unwrap();

    let mut request = WebRequest::post("/orders/save.do");
    let options = ContextOptions::default().form(Arc::new(common::order_form(None)));
    let (outcome, _) = run(&dispatcher, &mut request, options);

    assert_eq!(outcome.view().unwrap().name(), "/orders/edit.jsp");
    assert_eq!(invoked.load(Ordering::SeqCst), 0);
    let errors = request.extensions().get::<ValidationErrors>().unwrap();
    assert_eq!(errors.get("customer").count(), 1);
}

#[test]
fn test_valid_form_is_published_in_request_scope() {
    let mut request = WebRequest::post("/orders/save.do");
    let options = ContextOptions::default().form(Arc::new(common::order_form(Some("ACME"))));
    let (outcome, _) = run(&dispatcher(), &mut request, options);

    let view = outcome.view().unwrap();
    assert!(view.is_redirect());
    assert_eq!(view.name(), "redirect:/orders/list.do");

    let form = request.form_attribute("orderForm").unwrap();
    assert_eq!(form.field("customer").unwrap().as_text(), Some("ACME"));
    assert!(request.session().is_none());
}

#[test]
fn test_binding_errors_count_as_validation_errors() {
    let mut binding = ValidationErrors::new();
    binding.add(
        "quantity",
        action_dispatch::validation::ValidationMessage::new("errors.integer").arg("quantity"),
    );
    let options = ContextOptions::default()
        .form(Arc::new(common::order_form(Some("ACME"))))
        .binding_result(binding);

    let mut request = WebRequest::post("/orders/save.do");
    let (outcome, _) = run(&dispatcher(), &mut request, options);
    assert_eq!(outcome.view().unwrap().name(), "/orders/edit.jsp");
    assert_eq!(
        request.extensions().get::<ValidationErrors>().unwrap().get("quantity").count(),
        1
    );
}

#[test]
fn test_cancel_skips_validation_on_cancellable_route() {
    let mut request = WebRequest::post("/orders/save.do").with_parameter(CANCEL_PARAM, "Cancel");
    let options = ContextOptions::default().form(Arc::new(common::order_form(None)));
    let (outcome, _) = run(&dispatcher(), &mut request, options);

    assert_eq!(outcome.view().unwrap().name(), "redirect:/orders/list.do");
    assert!(request.extensions().get::<Cancelled>().is_some());
    assert!(request.extensions().get::<ValidationErrors>().is_none());
}

#[test]
fn test_cancel_on_non_cancellable_route_is_unhandled() {
    let config = action_dispatch::config::parse_config(
        r#"
        [pipeline]
        default_error_page = "/error.jsp"

        [[routes]]
        path = "/orders/submit.do"
        handler = "submit"
        input = "/orders/edit.jsp"
        form = "orderForm"
        "#,
    )
    .unwrap();
    let actions = ActionRegistry::new().register("submit", common::success_action());
    let dispatcher = Dispatcher::from_config(&config, actions).unwrap();

    let mut request = WebRequest::post("/orders/submit.do").with_parameter(CANCEL_PARAM, "Cancel");
    let options = ContextOptions::default().form(Arc::new(common::order_form(Some("ACME"))));
    let (outcome, response) = run(&dispatcher, &mut request, options);

    let failure = outcome.failure().unwrap();
    assert!(matches!(failure.error(), DispatchError::InvalidCancel { .. }));
    assert!(matches!(outcome, DispatchOutcome::Unhandled { .. }));
    assert_eq!(outcome.view().unwrap().name(), "/error.jsp");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_handler_failure_recovered_by_configured_handler() {
    let mut request = WebRequest::post("/billing/charge.do");
    let (outcome, response) = run(&dispatcher(), &mut request, ContextOptions::default());

    assert_eq!(outcome.label(), "recovered");
    assert_eq!(outcome.view().unwrap().name(), "/billing-error.jsp");
    assert_eq!(response.status(), StatusCode::OK);

    let current = request.extensions().get::<CurrentFailure>().unwrap();
    assert!(current.0.same_as(outcome.failure().unwrap()));
    assert_eq!(current.0.kind().as_str(), "billing.timeout");
}

#[test]
fn test_unrecovered_failure_has_stable_correlation_id() {
    let mut request = WebRequest::post("/audit/flush.do");
    let (outcome, response) = run(&dispatcher(), &mut request, ContextOptions::default());

    let DispatchOutcome::Unhandled { failure, view } = &outcome else {
        panic!("expected unhandled outcome, got {}", outcome.label());
    };
    assert_eq!(view.as_ref().unwrap().name(), "/error.jsp");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let id = failure.correlation_id();
    assert_eq!(failure.correlation_id(), id);
    assert!(response.error_message().unwrap().contains(&id.to_string()));

    let current = request.extensions().get::<CurrentFailure>().unwrap();
    assert_eq!(current.0.correlation_id(), id);
}

#[test]
fn test_boundary_retries_recovery_before_unhandled_hook() {
    let declining = CountingHandler::new(HandlerSupport::new().error_kind("audit"), None);
    let pipeline = Pipeline::builder().exception_handler(declining.clone()).build().unwrap();
    let dispatcher = custom(&common::orders_config(), common::orders_actions(), pipeline);

    let (outcome, _) = run(&dispatcher, &mut WebRequest::post("/audit/flush.do"), ContextOptions::default());
    assert!(matches!(outcome, DispatchOutcome::Unhandled { view: None, .. }));
    assert_eq!(declining.calls(), 2);
    let seen = declining.seen.lock().unwrap();
    assert!(seen[0].same_as(&seen[1]));
}

#[test]
fn test_first_eligible_handler_wins() {
    let first = CountingHandler::new(HandlerSupport::new().error_kind("billing"), Some("/first.jsp"));
    let second = CountingHandler::new(HandlerSupport::new().error_kind("billing.timeout"), Some("/second.jsp"));
    let chain = ExceptionHandlerChain::new().with(first.clone()).with(second.clone());
    let pipeline = Pipeline::builder().exception_handlers(chain).build().unwrap();
    let dispatcher = custom(&common::orders_config(), common::orders_actions(), pipeline);

    let (outcome, _) = run(&dispatcher, &mut WebRequest::post("/billing/charge.do"), ContextOptions::default());
    assert_eq!(outcome.view().unwrap().name(), "/first.jsp");
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 0);
}

#[test]
fn test_missing_input_forward_recovered_at_boundary() {
    let config = action_dispatch::config::parse_config(
        r#"
        [pipeline]
        expose_error_attributes = true

        [[routes]]
        path = "/orders/quick.do"
        handler = "quick"
        form = "orderForm"
        "#,
    )
    .unwrap();
    let handler = CountingHandler::new(
        HandlerSupport::new().error_kind(kinds::CONFIGURATION),
        Some("/config-error.jsp"),
    );
    let pipeline = Pipeline::builder()
        .config(config.pipeline.clone())
        .exception_handler(handler.clone())
        .build()
        .unwrap();
    let actions = ActionRegistry::new().register("quick", common::success_action());
    let dispatcher = custom(&config, actions, pipeline);

    let mut request = WebRequest::post("/orders/quick.do");
    let options = ContextOptions::default().form(Arc::new(common::order_form(None)));
    let (outcome, _) = run(&dispatcher, &mut request, options);

    assert_eq!(outcome.label(), "recovered");
    assert_eq!(outcome.view().unwrap().name(), "/config-error.jsp");
    assert!(matches!(
        outcome.failure().unwrap().error(),
        DispatchError::Configuration(ConfigurationError::MissingInputForward { .. })
    ));
    assert_eq!(handler.calls(), 1);

    let attributes = request.extensions().get::<ErrorAttributes>().unwrap();
    assert_eq!(attributes.request_path, "/orders/quick.do");
    assert_eq!(attributes.correlation_id, outcome.failure().unwrap().correlation_id());
}

#[test]
fn test_session_scope_form_binding() {
    let config = action_dispatch::config::parse_config(
        r#"
        [[routes]]
        path = "/wizard/step.do"
        handler = "step"
        validate = false
        form = "wizardForm"
        "#,
    )
    .unwrap();
    let actions = ActionRegistry::new().register("step", common::success_action());
    let dispatcher = Dispatcher::from_config(&config, actions).unwrap();

    let session = Arc::new(Session::with_id("s-1"));
    let mut request = WebRequest::post("/wizard/step.do").with_session(Arc::clone(&session));
    let options = ContextOptions::default().form(Arc::new(common::order_form(Some("ACME"))));
    run(&dispatcher, &mut request, options);

    assert!(session.form("wizardForm").is_some());
    assert!(request.form_attribute("wizardForm").is_none());
}

#[test]
fn test_one_event_per_dispatch() {
    let publisher = Arc::new(CollectingPublisher::default());
    let config = common::orders_config();
    let pipeline = Pipeline::builder()
        .config(config.pipeline.clone())
        .exception_handlers(ExceptionHandlerChain::from_config(&config.exception_handlers))
        .event_publisher(publisher.clone())
        .user_details(Arc::new(|request: &WebRequest| {
            request.principal().map(|p| format!("user:{}", p.name()))
        }))
        .build()
        .unwrap();
    let dispatcher = custom(&config, common::orders_actions(), pipeline);

    let mut request = WebRequest::get("/orders/list.do")
        .with_remote_addr("10.0.0.7")
        .with_principal(Principal::new("carol", ["CSR"]));
    run(&dispatcher, &mut request, ContextOptions::default());
    run(&dispatcher, &mut WebRequest::post("/admin/purge.do"), ContextOptions::default());
    run(&dispatcher, &mut WebRequest::post("/billing/charge.do"), ContextOptions::default());

    let events = publisher.events();
    assert_eq!(events.len(), 3);

    assert_eq!(events[0].handler, "list");
    assert_eq!(events[0].method, "GET");
    assert_eq!(events[0].user.as_deref(), Some("user:carol"));
    assert_eq!(events[0].remote_addr.as_deref(), Some("10.0.0.7"));
    assert!(events[0].failure.is_none());

    assert_eq!(events[1].outcome, "forbidden");
    assert_eq!(events[1].status, 403);

    let failure = events[2].failure.as_ref().unwrap();
    assert_eq!(failure.kind, "billing.timeout");
    assert!(failure.recovered);
}
