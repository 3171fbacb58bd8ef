//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DispatchConfig (validated, immutable)
//!     → RouteRegistry::from_config (routes frozen)
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; routes never change afterwards
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    DispatchConfig, ExceptionHandlerConfig, ForwardConfig, ObservabilityConfig, PipelineConfig,
    RouteConfig,
};
pub use validation::{validate_config, ValidationError};
