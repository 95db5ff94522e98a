//! Remote container-task scheduler seam.
//!
//! The orchestrator talks to the scheduler only through
//! [`TaskScheduler`]: launch one task, describe it, and (best-effort)
//! stop it.  Concrete implementations live in provider crates.

use std::fmt;

use async_trait::async_trait;

use crate::request::MigrationRequest;

/// Opaque handle to a launched task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    cluster: String,
    task_id: String,
}

impl TaskHandle {
    pub fn new(cluster: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            task_id: task_id.into(),
        }
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Scheduler-assigned task identifier (an ARN for ECS).
    pub fn task_id(&self) -> &str {
        &self.task_id
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.task_id)
    }
}

/// Raw task state as reported by the scheduler for one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteTaskState {
    /// Lifecycle status string, e.g. `PENDING`, `RUNNING`, `STOPPED`.
    pub last_status: String,
    /// Why the task stopped, e.g. `EssentialContainerExited`.
    pub stop_code: Option<String>,
    /// Free-text stop reason from the scheduler.
    pub stopped_reason: Option<String>,
    /// Exit code of the migration container, once it has exited.
    pub exit_code: Option<i32>,
    /// Container-level reason (e.g. `OutOfMemoryError`).
    pub container_reason: Option<String>,
}

/// Result of a describe call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSnapshot {
    Found(RemoteTaskState),
    /// The scheduler no longer knows the task.
    Vanished { reason: Option<String> },
}

/// Errors returned by a [`TaskScheduler`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// The launch request was rejected or could not be placed.
    #[error("{0}")]
    Launch(String),

    /// A retryable failure (throttling, network, 5xx).
    #[error("{0}")]
    Transient(String),

    /// A non-retryable failure (bad cluster, permissions, ...).
    #[error("{0}")]
    Fatal(String),
}

impl SchedulerError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// A remote scheduler capable of running one-off container tasks.
#[async_trait]
pub trait TaskScheduler: Send + Sync {
    /// Submit a single task run for `request`.
    async fn launch_task(&self, request: &MigrationRequest) -> Result<TaskHandle, SchedulerError>;

    /// Query the current state of a launched task.
    async fn describe_task(&self, handle: &TaskHandle) -> Result<TaskSnapshot, SchedulerError>;

    /// Ask the scheduler to stop a task.  Callers treat failure as non-fatal.
    async fn stop_task(&self, handle: &TaskHandle, reason: &str) -> Result<(), SchedulerError>;
}
