//! `migrun-core` -- one-shot migration task orchestration.
//!
//! Holds the request/outcome data model, the [`TaskScheduler`] seam that
//! remote container schedulers implement, and the polling state machine
//! in [`orchestrator`].
//!
//! [`TaskScheduler`]: scheduler::TaskScheduler

pub mod backoff;
pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod request;
pub mod scheduler;
pub mod status;
