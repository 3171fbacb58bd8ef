//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → descriptor.rs (RouteBuilder per route)
//!     → registry.rs (freeze all routes, share global forwards)
//!     → immutable RouteRegistry
//!
//! Incoming Request (path)
//!     → resolver.rs (direct match via cache / registry scan)
//!     → matcher.rs (wildcard patterns, compiled once and cached)
//!     → Return: Resolution (route + captures) or RouteNotFound
//! ```
//!
//! # Design Decisions
//! - Routes frozen at startup, immutable at runtime
//! - Literal routes always win over wildcard routes
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod descriptor;
pub mod forward;
pub mod matcher;
pub mod registry;
pub mod resolver;

pub use descriptor::{parse_roles, ForwardMap, RouteBuilder, RouteDescriptor, Scope};
pub use forward::{Forward, ForwardDescriptor, RedirectForward};
pub use matcher::{Captures, CompiledPattern, PathMatcher, WildcardMatcher};
pub use registry::{RegistryBuilder, RouteRegistry};
pub use resolver::{PatternCache, Resolution, RouteCache, RouteResolver};
