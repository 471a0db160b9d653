//! Application engine: transactional workflow operations.
//!
//! This crate composes the domain crates into the public operation surface
//! callers (an HTTP layer, a CLI) expose one endpoint per operation. It owns:
//!
//! - the transactional store contract ([`store::WorkflowStore`] /
//!   [`store::WorkflowTx`]) plus an in-memory implementation for tests/dev;
//! - the [`WorkflowEngine`] service with every public operation, including
//!   the estimate-acceptance fan-out (one transition atomically creating a
//!   job, an invoice and milestones) and the overdue sweep;
//! - cancellation ([`CancelToken`]) and the engine-level error taxonomy
//!   ([`EngineError`]).
//!
//! Transition events publish strictly after commit; a publish failure is
//! logged and never rolls back business state.

pub mod cancel;
pub mod engine;
pub mod error;
pub mod ops;
pub mod store;

pub use cancel::CancelToken;
pub use engine::WorkflowEngine;
pub use error::{EngineError, EngineResult};
pub use ops::estimates::{AcceptedEstimate, JobSchedule, NewEstimate};
pub use ops::leads::NewLead;
pub use store::{FailPoint, InMemoryWorkflowStore, StoreError, WorkflowStore, WorkflowTx};
