//! # stencil-runtime
//!
//! Runs Apps and Dashboards.
//!
//! - [`AppRunner`] validates inputs, checks the [`RunPolicy`](stencil_policy::RunPolicy),
//!   compiles and hands the artifact to an [`Executor`].
//! - [`DashboardSession`] drives one dashboard through load, prepare and
//!   actions, including bindings and confirmations.
//!
//! Executors, repositories and audit sinks are trait seams; concrete
//! adapters live in their own crates.

pub mod audit;
pub mod bindings;
pub mod compiler;
pub mod confirmation;
pub mod error;
pub mod executor;
pub mod repository;
pub mod runner;
pub mod session;

pub use audit::{AuditEvent, AuditEventKind, AuditSink, TracingAuditSink};
pub use bindings::{BindingContext, lookup_path, resolve_bindings};
pub use compiler::AppCompiler;
pub use confirmation::{ConfirmationGate, PendingConfirmation};
pub use error::{BindingError, RuntimeError};
pub use executor::{CompiledArtifact, DispatchExecutor, ExecutionResponse, Executor};
pub use repository::{AppRepository, InMemoryRepository};
pub use runner::{AppExecution, AppRunner};
pub use session::{ActionResult, ActionRunOutcome, DashboardSession, Phase, SessionSnapshot};
