//! Validation subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline (validation stage)
//!     → chain.rs (skip rules, cancel handling)
//!     → FormValidator[] in registration order (default: the form itself)
//!     → errors.rs (ValidationErrors accumulator)
//!     → Pipeline: errors → input forward, none → execute
//! ```
//!
//! # Design Decisions
//! - A validator failure is recorded as one generic message, never propagated
//! - Cancelling a non-cancellable route is a fatal error, not a validation error
//! - Messages carry keys and arguments; rendering them is the view's job

pub mod chain;
pub mod errors;

pub use chain::{FormSelfValidator, FormValidator, ValidatorChain};
pub use errors::{ValidationErrors, ValidationMessage, GLOBAL};
