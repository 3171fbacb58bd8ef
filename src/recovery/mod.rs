//! Failure recovery subsystem.
//!
//! # Data Flow
//! ```text
//! Failure (handler error, or anything reaching the pipeline boundary)
//!     → chain.rs (eligible handlers in registration order)
//!     → first handler returning a forward wins
//!     → no forward: hooks.rs (UnhandledFailureHook, e.g. default error page)
//! ```
//!
//! # Design Decisions
//! - Eligibility is by kind tags, not types: error kind OR origin kind
//! - A handler may decline an eligible failure by returning `None`
//! - Unrecovered failures are rendered, never turned into a panic

pub mod chain;
pub mod hooks;

pub use chain::{ExceptionHandler, ExceptionHandlerChain, ForwardingExceptionHandler, HandlerSupport};
pub use hooks::{ErrorPageHook, UnhandledFailureHook};
