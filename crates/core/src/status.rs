//! Per-poll task status derived from the scheduler's raw task state.
//!
//! Status strings follow the ECS task lifecycle:
//! `PROVISIONING -> PENDING -> ACTIVATING -> RUNNING -> DEACTIVATING ->
//! STOPPING -> DEPROVISIONING -> STOPPED`.

use std::fmt;

use crate::scheduler::RemoteTaskState;

/// Stop code reported when the essential container exits on its own.
pub const STOP_CODE_ESSENTIAL_CONTAINER_EXITED: &str = "EssentialContainerExited";

const PENDING_STATUSES: &[&str] = &["PROVISIONING", "PENDING", "ACTIVATING"];
const STATUS_STOPPED: &str = "STOPPED";

/// Derived task status.  Recomputed on every poll, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    /// The migration container exited with code 0.
    Succeeded,
    /// The migration container ran to completion with a non-zero code.
    Failed {
        exit_code: i32,
        reason: Option<String>,
    },
    /// The task stopped without the container completing normally.
    StoppedAbnormally { reason: String },
}

impl TaskStatus {
    /// Classify a raw scheduler snapshot.
    ///
    /// Unknown status strings count as running so the poll loop keeps
    /// going until a recognised terminal state or the deadline.
    pub fn from_remote(state: &RemoteTaskState) -> Self {
        let status = state.last_status.trim().to_ascii_uppercase();

        if status == STATUS_STOPPED {
            return Self::from_stopped(state);
        }
        if PENDING_STATUSES.contains(&status.as_str()) {
            return Self::Pending;
        }
        Self::Running
    }

    fn from_stopped(state: &RemoteTaskState) -> Self {
        let exited = state.stop_code.as_deref() == Some(STOP_CODE_ESSENTIAL_CONTAINER_EXITED);

        match (exited, state.exit_code) {
            (true, Some(0)) => Self::Succeeded,
            (true, Some(exit_code)) => Self::Failed {
                exit_code,
                reason: state
                    .container_reason
                    .clone()
                    .or_else(|| state.stopped_reason.clone()),
            },
            _ => Self::StoppedAbnormally {
                reason: stop_reason(state),
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed { .. } => "failed",
            Self::StoppedAbnormally { .. } => "stopped_abnormally",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Best available human-readable reason for an abnormal stop.
fn stop_reason(state: &RemoteTaskState) -> String {
    let parts: Vec<&str> = [
        state.stop_code.as_deref(),
        state.stopped_reason.as_deref(),
        state.container_reason.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .collect();

    if parts.is_empty() {
        "no stop reason reported".to_string()
    } else {
        parts.join(": ")
    }
}
