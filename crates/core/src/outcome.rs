//! Run outcome and failure taxonomy.
//!
//! An [`Outcome`] is produced exactly once per invocation and is the only
//! externally visible artifact of a run.  Every failure carries a
//! [`RunError`] whose display text is the outcome's reason.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::request::LifecycleAction;
use crate::scheduler::SchedulerError;

/// Binary result handed back to the invoking lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeResult {
    Success,
    Failure,
}

/// Why a run failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    /// The launch call itself errored.  Never retried.
    #[error("failed to launch migration task: {0}")]
    Launch(SchedulerError),

    /// Consecutive transient status-query failures exceeded the retry bound.
    #[error("migration task status timed out after {attempts} failed status queries: {last_error}")]
    PollExhausted {
        attempts: u32,
        last_error: SchedulerError,
    },

    /// A status query failed with a non-retryable error.
    #[error("migration task status query failed: {0}")]
    PollFatal(SchedulerError),

    /// The task reached a terminal state other than a clean exit.
    #[error("{}", task_failed_reason(.exit_code, .reason))]
    TaskFailed {
        exit_code: Option<i32>,
        reason: String,
    },

    /// No terminal status was observed before the deadline.
    #[error("migration task timed out after {}s{}", .after.as_secs(), last_error_suffix(.last_error))]
    Timeout {
        after: Duration,
        last_error: Option<SchedulerError>,
    },
}

impl RunError {
    /// Whether the task may still be running on the scheduler, so a stop
    /// request should be issued.
    pub fn task_may_be_running(&self) -> bool {
        matches!(
            self,
            Self::PollExhausted { .. } | Self::PollFatal(_) | Self::Timeout { .. }
        )
    }
}

fn task_failed_reason(exit_code: &Option<i32>, reason: &str) -> String {
    match *exit_code {
        Some(code) if reason.is_empty() => format!("migration task exited with code {code}"),
        Some(code) => format!("migration task exited with code {code}: {reason}"),
        None => format!("migration task stopped abnormally: {reason}"),
    }
}

fn last_error_suffix(last_error: &Option<SchedulerError>) -> String {
    match last_error {
        Some(err) => format!(" (last status query error: {err})"),
        None => String::new(),
    }
}

/// Final result of one orchestrator invocation.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub result: OutcomeResult,
    /// Human-readable reason.  Never empty.
    pub reason: String,
    pub elapsed: Duration,
    /// Scheduler task id, when a task was launched.
    pub task_id: Option<String>,
    /// Number of status queries issued.
    pub polls: u32,
    /// Failure cause; `None` on success.
    pub error: Option<RunError>,
    pub finished_at: DateTime<Utc>,
}

impl Outcome {
    pub fn success(reason: impl Into<String>, elapsed: Duration, task_id: Option<String>, polls: u32) -> Self {
        Self {
            result: OutcomeResult::Success,
            reason: reason.into(),
            elapsed,
            task_id,
            polls,
            error: None,
            finished_at: Utc::now(),
        }
    }

    pub fn failure(error: RunError, elapsed: Duration, task_id: Option<String>, polls: u32) -> Self {
        Self {
            result: OutcomeResult::Failure,
            reason: error.to_string(),
            elapsed,
            task_id,
            polls,
            error: Some(error),
            finished_at: Utc::now(),
        }
    }

    /// Success for an action that does not run the migration.
    pub fn skipped(action: LifecycleAction) -> Self {
        Self::success(
            format!("{action} is a no-op; migration not run"),
            Duration::ZERO,
            None,
            0,
        )
    }

    pub fn is_success(&self) -> bool {
        self.result == OutcomeResult::Success
    }
}
