//! Route resolution against a loaded configuration, including concurrent use.

use std::sync::Arc;
use std::thread;

use action_dispatch::config::{load_config, ConfigError};
use action_dispatch::dispatch::scope::{MatchedRoute, WildcardGroups};
use action_dispatch::dispatch::WebRequest;
use action_dispatch::error::DispatchError;
use action_dispatch::routing::{RouteRegistry, RouteResolver};

mod common;

fn resolver() -> RouteResolver {
    let registry = RouteRegistry::from_config(&common::orders_config()).unwrap();
    RouteResolver::new(Arc::new(registry))
}

#[test]
fn test_literal_routes_resolve_directly() {
    let resolver = resolver();
    let resolution = resolver.resolve("/orders/list.do").unwrap();
    assert_eq!(resolution.route.handler(), "list");
    assert!(!resolution.is_wildcard());
    assert!(resolver.route_cache().contains("/orders/list.do"));
}

#[test]
fn test_wildcard_matches_are_not_cached() {
    let resolver = resolver();
    for name in ["Order", "Invoice", "Customer"] {
        let path = format!("/Prepare{}.do", name);
        let resolution = resolver.resolve(&path).unwrap();
        assert_eq!(resolution.route.handler(), "prepare");
        assert_eq!(resolution.captures.as_ref().unwrap().get(1), Some(name));
    }

    assert!(resolver.route_cache().is_empty());
    // One compiled program per wildcard route pattern tried.
    assert!(resolver.pattern_cache().len() <= resolver.wildcard_routes().len());
}

#[test]
fn test_unmatched_path() {
    let resolver = resolver();
    let err = resolver.resolve("/orders/unknown.do").unwrap_err();
    assert!(matches!(err, DispatchError::RouteNotFound { ref path } if path == "/orders/unknown.do"));
    assert!(err.is_client_error());
    assert!(resolver.route_cache().is_empty());
}

#[test]
fn test_repeated_misses_do_not_grow_route_cache() {
    let resolver = resolver();
    let misses = (0..50)
        .map(|i| format!("/orders/missing{}.do", i))
        .chain((0..10).map(|i| format!("/Prepare{}.jsp", i)))
        .chain((0..10).map(|i| format!("/prepare{}.do", i)));

    for (seen, path) in misses.enumerate() {
        let err = resolver.resolve(&path).unwrap_err();
        assert!(matches!(err, DispatchError::RouteNotFound { path: ref missed } if *missed == path));
        assert!(resolver.route_cache().is_empty(), "cache grew after {} misses", seen + 1);
    }
    assert!(resolver.pattern_cache().len() <= resolver.wildcard_routes().len());
}

#[test]
fn test_resolution_published_into_request() {
    let resolver = resolver();

    let mut request = WebRequest::get("/PrepareOrder.do");
    resolver.resolve_into(&mut request).unwrap();
    let matched = request.extensions().get::<MatchedRoute>().unwrap();
    assert_eq!(matched.0.path(), "/Prepare*.do");
    let groups = request.extensions().get::<WildcardGroups>().unwrap();
    assert_eq!(groups.0.get(0), Some("/PrepareOrder.do"));
    assert_eq!(groups.0.get(1), Some("Order"));

    let mut request = WebRequest::get("/orders/list.do");
    resolver.resolve_into(&mut request).unwrap();
    assert!(request.extensions().get::<MatchedRoute>().is_some());
    assert!(request.extensions().get::<WildcardGroups>().is_none());
}

#[test]
fn test_concurrent_resolution_is_idempotent() {
    let resolver = resolver();
    let paths = ["/orders/list.do", "/orders/save.do", "/PrepareOrder.do", "/audit/x.do"];

    thread::scope(|scope| {
        for worker in 0..8 {
            let resolver = &resolver;
            scope.spawn(move || {
                for round in 0..200 {
                    let path = paths[(worker + round) % paths.len()];
                    let resolution = resolver.resolve(path).unwrap();
                    match path {
                        "/orders/list.do" => assert_eq!(resolution.route.handler(), "list"),
                        "/orders/save.do" => assert_eq!(resolution.route.handler(), "save"),
                        "/PrepareOrder.do" => assert_eq!(resolution.route.handler(), "prepare"),
                        _ => assert_eq!(resolution.route.handler(), "audit"),
                    }
                }
            });
        }
    });

    assert_eq!(resolver.route_cache().len(), 2);
    let first = resolver.route_cache().get("/orders/list.do").unwrap();
    let again = resolver.resolve("/orders/list.do").unwrap().route;
    assert!(Arc::ptr_eq(&first, &again));
}

#[test]
fn test_load_config_from_file() {
    let dir = std::env::temp_dir().join(format!("action-dispatch-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let good = dir.join("orders.toml");
    std::fs::write(&good, common::ORDERS_CONFIG).unwrap();
    let config = load_config(&good).unwrap();
    assert_eq!(config.routes.len(), 6);
    assert_eq!(config.pipeline.default_error_page.as_deref(), Some("/error.jsp"));

    let bad = dir.join("duplicate.toml");
    std::fs::write(
        &bad,
        r#"
        [[routes]]
        path = "/a.do"
        handler = "a"

        [[routes]]
        path = "/a.do"
        handler = ""
        "#,
    )
    .unwrap();
    let err = load_config(&bad).unwrap_err();
    let ConfigError::Validation(errors) = &err else {
        panic!("expected validation error, got {}", err);
    };
    assert_eq!(errors.len(), 2);

    assert!(matches!(load_config(&dir.join("missing.toml")), Err(ConfigError::Io(_))));
    std::fs::remove_dir_all(&dir).unwrap();
}
