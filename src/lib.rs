//! Action dispatch library.
//!
//! Routes request paths to configured actions and runs each request through
//! a fixed pipeline: response headers, encoding, authorization, form scope,
//! validation, execution, view resolution and telemetry.
//!
//! # Architecture Overview
//!
//! ```text
//!   config file ──▶ config ──▶ routing::RouteRegistry (frozen)
//!                                        │
//!   WebRequest ──▶ routing::RouteResolver ┘
//!                    │  (exact → cache, then wildcard patterns in order)
//!                    ▼
//!              dispatch::Dispatcher ──▶ dispatch::Pipeline
//!                                         │   ├─ validation::ValidatorChain
//!                                         │   ├─ dispatch::Action
//!                                         │   └─ recovery::ExceptionHandlerChain
//!                                         ▼
//!                               DispatchOutcome + WebResponse
//!
//!   Cross-cutting: error (kinds, shared failures), observability
//!   (tracing, metrics, execution events), form (typed form fields)
//! ```

// Core subsystems
pub mod config;
pub mod dispatch;
pub mod routing;

// Request data
pub mod form;
pub mod validation;

// Cross-cutting concerns
pub mod error;
pub mod observability;
pub mod recovery;

pub use config::DispatchConfig;
pub use dispatch::{Dispatcher, DispatchOutcome, Pipeline, WebRequest, WebResponse};
pub use error::{DispatchError, Failure};
