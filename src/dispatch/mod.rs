//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! WebRequest
//!     → dispatcher.rs (resolve route, look up action, build context)
//!     → pipeline.rs (headers → encoding → authorize → form scope
//!                    → validate → execute → view)
//!     → view.rs (forward → ViewTarget, wildcard groups substituted)
//!     → DispatchOutcome + WebResponse
//! ```
//!
//! # Design Decisions
//! - The pipeline is shared and stateless; per-request state lives in
//!   `DispatchContext` and the request's extensions (see `scope`)
//! - Request and response are passed alongside the context, never owned by it
//! - Authorization denial is an outcome, not an error

pub mod action;
pub mod context;
pub mod dispatcher;
pub mod pipeline;
pub mod scope;
pub mod view;
pub mod web;

pub use action::{Action, ActionRegistry, FnAction};
pub use context::{ContextOptions, DispatchContext};
pub use dispatcher::Dispatcher;
pub use pipeline::{DispatchOutcome, Pipeline, PipelineBuilder, UserDetails};
pub use view::{DefaultViewGenerator, ViewGenerator, ViewTarget};
pub use web::{Principal, Session, WebRequest, WebResponse, CANCEL_PARAM, CANCEL_PARAM_X};
