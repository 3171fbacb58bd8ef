//! The frozen set of configured routes.
//!
//! # Responsibilities
//! - Collect route builders and global forwards during configuration
//! - Freeze every route exactly once, sharing one global forward map
//! - Preserve registration order, which decides resolution tie-breaks
//!
//! # Design Decisions
//! - The registry builder is consumed by `build`; there is no way back
//! - Any route that fails to freeze fails the whole registry

use std::sync::Arc;

use crate::config::DispatchConfig;
use crate::error::ConfigurationError;
use crate::routing::descriptor::{ForwardMap, RouteBuilder, RouteDescriptor};
use crate::routing::forward::ForwardDescriptor;

/// Mutable registry used while configuration is loaded.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    routes: Vec<RouteBuilder>,
    global_forwards: ForwardMap,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, route: RouteBuilder) -> Self {
        self.routes.push(route);
        self
    }

    /// Register a forward visible from every route.
    pub fn global_forward(mut self, forward: ForwardDescriptor) -> Self {
        let key = forward.name().unwrap_or(forward.path()).to_string();
        self.global_forwards.insert(key, forward);
        self
    }

    /// Freeze all routes. This is the only freeze point.
    pub fn build(self) -> Result<RouteRegistry, ConfigurationError> {
        let global_forwards = Arc::new(self.global_forwards);
        let routes = self
            .routes
            .into_iter()
            .map(|builder| builder.freeze(Arc::clone(&global_forwards)).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            routes = routes.len(),
            global_forwards = global_forwards.len(),
            "Route registry frozen"
        );

        Ok(RouteRegistry {
            routes,
            global_forwards,
        })
    }
}

/// Immutable, ordered route set.
#[derive(Debug, Clone)]
pub struct RouteRegistry {
    routes: Vec<Arc<RouteDescriptor>>,
    global_forwards: Arc<ForwardMap>,
}

impl RouteRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Build and freeze the registry described by a loaded configuration.
    pub fn from_config(config: &DispatchConfig) -> Result<Self, ConfigurationError> {
        let mut builder = RegistryBuilder::new();
        for forward in &config.global_forwards {
            builder = builder.global_forward(forward.to_descriptor());
        }
        for route in &config.routes {
            builder = builder.route(route.to_builder());
        }
        builder.build()
    }

    /// Routes in registration order.
    pub fn routes(&self) -> &[Arc<RouteDescriptor>] {
        &self.routes
    }

    pub fn global_forwards(&self) -> &ForwardMap {
        &self.global_forwards
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
