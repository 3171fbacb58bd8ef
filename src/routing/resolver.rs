//! Request path → route resolution.
//!
//! # Responsibilities
//! - Resolve a path to exactly one route: direct match first, wildcard second
//! - Cache direct matches by path; cache compiled patterns by pattern string
//! - Publish the matched route and wildcard captures into request scope
//!
//! # Design Decisions
//! - Registration order decides ties in both phases
//! - Direct matches compare against the unescaped route path, so `/a\*b`
//!   serves `/a*b` without a wildcard scan
//! - Only direct matches are cached by request path; wildcard hits are
//!   recomputed so arbitrary client paths cannot grow the cache
//! - Pattern cache keys come from configuration only, so it is bounded by the
//!   number of wildcard routes
//! - Caches are explicit objects handed to the resolver, cheap to clone and
//!   safe to share; concurrent first inserts keep the first value

use std::sync::Arc;

use dashmap::DashMap;

use crate::dispatch::scope::{MatchedRoute, WildcardGroups};
use crate::dispatch::WebRequest;
use crate::error::DispatchError;
use crate::observability::metrics;
use crate::routing::descriptor::RouteDescriptor;
use crate::routing::matcher::{Captures, CompiledPattern, PathMatcher, WildcardMatcher};
use crate::routing::registry::RouteRegistry;

/// Direct-match cache: request path → route.
#[derive(Debug, Clone, Default)]
pub struct RouteCache {
    inner: Arc<DashMap<String, Arc<RouteDescriptor>>>,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Arc<RouteDescriptor>> {
        self.inner.get(path).map(|entry| Arc::clone(entry.value()))
    }

    /// Insert unless the path is already cached. Returns the cached route,
    /// which is the earlier value when another caller won the race.
    pub fn insert_if_absent(&self, path: &str, route: Arc<RouteDescriptor>) -> Arc<RouteDescriptor> {
        let cached = Arc::clone(self.inner.entry(path.to_string()).or_insert(route).value());
        metrics::record_route_cache_size(self.inner.len());
        cached
    }

    pub fn contains(&self, path: &str) -> bool {
        self.inner.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Compiled-pattern cache: pattern string → program.
#[derive(Debug, Clone, Default)]
pub struct PatternCache {
    inner: Arc<DashMap<String, Arc<CompiledPattern>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `pattern` with `matcher` unless a program is already cached.
    pub fn get_or_compile(&self, pattern: &str, matcher: &dyn PathMatcher) -> Arc<CompiledPattern> {
        if let Some(compiled) = self.inner.get(pattern) {
            return Arc::clone(compiled.value());
        }
        let compiled = Arc::new(matcher.compile(pattern));
        Arc::clone(self.inner.entry(pattern.to_string()).or_insert(compiled).value())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// A successful resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub route: Arc<RouteDescriptor>,
    /// Present for wildcard matches only.
    pub captures: Option<Captures>,
}

impl Resolution {
    pub fn is_wildcard(&self) -> bool {
        self.captures.is_some()
    }
}

/// Two-phase resolver over a frozen registry.
#[derive(Debug, Clone)]
pub struct RouteResolver {
    registry: Arc<RouteRegistry>,
    literal_routes: Vec<(String, Arc<RouteDescriptor>)>,
    wildcard_routes: Vec<Arc<RouteDescriptor>>,
    matcher: Arc<dyn PathMatcher>,
    route_cache: RouteCache,
    pattern_cache: PatternCache,
}

impl RouteResolver {
    /// Resolver with the default matcher and fresh caches.
    pub fn new(registry: Arc<RouteRegistry>) -> Self {
        Self::with_parts(
            registry,
            Arc::new(WildcardMatcher::new()),
            RouteCache::new(),
            PatternCache::new(),
        )
    }

    /// Resolver with caller-owned matcher and caches.
    pub fn with_parts(
        registry: Arc<RouteRegistry>,
        matcher: Arc<dyn PathMatcher>,
        route_cache: RouteCache,
        pattern_cache: PatternCache,
    ) -> Self {
        let mut literal_routes = Vec::new();
        let mut wildcard_routes = Vec::new();
        for route in registry.routes() {
            match matcher.literal_text(route.path()) {
                Some(key) => literal_routes.push((key, Arc::clone(route))),
                None => wildcard_routes.push(Arc::clone(route)),
            }
        }

        Self {
            registry,
            literal_routes,
            wildcard_routes,
            matcher,
            route_cache,
            pattern_cache,
        }
    }

    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    /// Routes whose paths contain wildcards, in registration order.
    pub fn wildcard_routes(&self) -> &[Arc<RouteDescriptor>] {
        &self.wildcard_routes
    }

    pub fn route_cache(&self) -> &RouteCache {
        &self.route_cache
    }

    pub fn pattern_cache(&self) -> &PatternCache {
        &self.pattern_cache
    }

    /// Resolve `path` to a route.
    pub fn resolve(&self, path: &str) -> Result<Resolution, DispatchError> {
        if let Some(route) = self.route_cache.get(path) {
            tracing::trace!(path, route = %route.path(), "Route cache hit");
            return Ok(Resolution { route, captures: None });
        }

        if let Some((_, route)) = self.literal_routes.iter().find(|(key, _)| key == path) {
            let route = self.route_cache.insert_if_absent(path, Arc::clone(route));
            tracing::debug!(path, handler = %route.handler(), "Direct route match");
            return Ok(Resolution { route, captures: None });
        }

        for route in &self.wildcard_routes {
            let compiled = self.pattern_cache.get_or_compile(route.path(), self.matcher.as_ref());
            if let Some(captures) = self.matcher.matches(&compiled, path) {
                tracing::debug!(
                    path,
                    pattern = %route.path(),
                    handler = %route.handler(),
                    groups = captures.len() - 1,
                    "Wildcard route match"
                );
                return Ok(Resolution {
                    route: Arc::clone(route),
                    captures: Some(captures),
                });
            }
        }

        metrics::record_route_not_found();
        tracing::warn!(path, "No route matches request path");
        Err(DispatchError::RouteNotFound {
            path: path.to_string(),
        })
    }

    /// Resolve the request's path and publish the result into request scope.
    ///
    /// Wildcard captures are published only when at least one wildcard group
    /// was captured in addition to the full path.
    pub fn resolve_into(&self, request: &mut WebRequest) -> Result<Resolution, DispatchError> {
        let resolution = self.resolve(request.path())?;
        request
            .extensions_mut()
            .insert(MatchedRoute(Arc::clone(&resolution.route)));
        if let Some(captures) = resolution.captures.as_ref().filter(|c| c.has_wildcard_groups()) {
            request.extensions_mut().insert(WildcardGroups(captures.clone()));
        }
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RouteBuilder;

    fn resolver() -> RouteResolver {
        let registry = RouteRegistry::builder()
            .route(RouteBuilder::new("/a/*", "wildcard"))
            .route(RouteBuilder::new("/a/b", "literal"))
            .route(RouteBuilder::new("/Prepare*.do", "prepare"))
            .route(RouteBuilder::new("/**/launchAdmin.do", "admin"))
            .build()
            .unwrap();
        RouteResolver::new(Arc::new(registry))
    }

    #[test]
    fn test_literal_precedence() {
        let resolver = resolver();
        let resolution = resolver.resolve("/a/b").unwrap();
        assert_eq!(resolution.route.handler(), "literal");
        assert!(!resolution.is_wildcard());

        let resolution = resolver.resolve("/a/c").unwrap();
        assert_eq!(resolution.route.handler(), "wildcard");
        assert_eq!(resolution.captures.unwrap().get(1), Some("c"));
    }

    #[test]
    fn test_only_direct_matches_are_cached() {
        let resolver = resolver();
        resolver.resolve("/a/b").unwrap();
        resolver.resolve("/a/b").unwrap();
        resolver.resolve("/PrepareAction.do").unwrap();
        resolver.resolve("/CSR/launchAdmin.do").unwrap();

        assert_eq!(resolver.route_cache().len(), 1);
        assert!(resolver.route_cache().contains("/a/b"));
        assert_eq!(resolver.pattern_cache().len(), 3);
    }

    #[test]
    fn test_route_not_found() {
        let resolver = resolver();
        let err = resolver.resolve("/missing.do").unwrap_err();
        assert!(matches!(err, DispatchError::RouteNotFound { ref path } if path == "/missing.do"));
        assert!(err.is_client_error());
        assert!(resolver.route_cache().is_empty());
    }

    #[test]
    fn test_resolve_into_publishes_scope() {
        let resolver = resolver();

        let mut request = WebRequest::get("/PrepareAction.do");
        resolver.resolve_into(&mut request).unwrap();
        let matched = request.extensions().get::<MatchedRoute>().unwrap();
        assert_eq!(matched.0.handler(), "prepare");
        let groups = request.extensions().get::<WildcardGroups>().unwrap();
        assert_eq!(groups.0.get(1), Some("Action"));

        let mut request = WebRequest::get("/a/b");
        resolver.resolve_into(&mut request).unwrap();
        assert!(request.extensions().get::<MatchedRoute>().is_some());
        assert!(request.extensions().get::<WildcardGroups>().is_none());
    }

    #[test]
    fn test_empty_trailing_capture_published() {
        let resolver = resolver();
        let mut request = WebRequest::get("/a/");
        let resolution = resolver.resolve_into(&mut request).unwrap();
        assert_eq!(resolution.route.handler(), "wildcard");
        let groups = request.extensions().get::<WildcardGroups>().unwrap();
        assert_eq!(groups.0.len(), 2);
        assert_eq!(groups.0.get(1), Some(""));
    }

    #[test]
    fn test_first_literal_registration_wins() {
        let registry = RouteRegistry::builder()
            .route(RouteBuilder::new("/a.do", "first"))
            .route(RouteBuilder::new("/a.do", "second"))
            .build()
            .unwrap();
        let resolver = RouteResolver::new(Arc::new(registry));
        assert_eq!(resolver.resolve("/a.do").unwrap().route.handler(), "first");
        assert!(resolver.resolve("/b.do").is_err());
    }

    #[test]
    fn test_escaped_star_route_resolves_directly() {
        let registry = RouteRegistry::builder()
            .route(RouteBuilder::new("/a\\*b", "starred"))
            .route(RouteBuilder::new("/a*", "wildcard"))
            .build()
            .unwrap();
        let resolver = RouteResolver::new(Arc::new(registry));
        assert!(resolver.wildcard_routes().iter().all(|r| r.handler() == "wildcard"));

        let resolution = resolver.resolve("/a*b").unwrap();
        assert_eq!(resolution.route.handler(), "starred");
        assert!(!resolution.is_wildcard());
        assert!(resolver.route_cache().contains("/a*b"));

        let resolution = resolver.resolve("/axb").unwrap();
        assert_eq!(resolution.route.handler(), "wildcard");
        assert!(resolver.resolve("/a\\*b").unwrap().is_wildcard());
    }

    #[test]
    fn test_shared_caches_across_resolvers() {
        let registry = Arc::new(
            RouteRegistry::builder()
                .route(RouteBuilder::new("/x.do", "x"))
                .build()
                .unwrap(),
        );
        let cache = RouteCache::new();
        let first = RouteResolver::with_parts(
            Arc::clone(&registry),
            Arc::new(WildcardMatcher::new()),
            cache.clone(),
            PatternCache::new(),
        );
        first.resolve("/x.do").unwrap();
        assert!(cache.contains("/x.do"));
    }
}
