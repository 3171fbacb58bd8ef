//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Resolver and pipeline produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!     → events.rs (one ExecutionEvent per dispatched request)
//!
//! Consumers:
//!     → Log aggregation (stderr)
//!     → Whatever metrics recorder the host installs
//!     → EventPublisher implementations (default: tracing)
//! ```
//!
//! # Design Decisions
//! - Structured fields everywhere a stage makes a decision
//! - Metrics go through the `metrics` facade; without a recorder they are no-ops
//! - Event publishing is opt-in per pipeline and always runs last

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{EventPublisher, ExecutionEvent, TracingEventPublisher};
pub use logging::init_logging;
