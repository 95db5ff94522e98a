//! Amazon ECS implementation of the migration task scheduler.
//!
//! Launches the migration as a one-off Fargate task (`RunTask`), polls it
//! with `DescribeTasks` and stops it with `StopTask` when the
//! orchestrator gives up.  Conversions between SDK shapes and the core
//! model live in [`convert`]; SDK error classification in [`errors`].

pub mod convert;
pub mod errors;
mod scheduler;

pub use scheduler::EcsScheduler;
