//! Completion response sent back to the provisioning lifecycle.
//!
//! The lifecycle only ever sees `SUCCESS` or `FAILED` plus a reason; no
//! intermediate task states are reported.

use serde::Serialize;

use migrun_core::outcome::{Outcome, OutcomeResult};

use crate::event::LifecycleEvent;

/// Maximum reason length.  Keeps the whole body well under the
/// lifecycle's 4 KiB response limit.
pub const MAX_REASON_LEN: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

impl From<OutcomeResult> for ResponseStatus {
    fn from(result: OutcomeResult) -> Self {
        match result {
            OutcomeResult::Success => Self::Success,
            OutcomeResult::Failure => Self::Failed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompletionResponse {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub data: ResponseData,
}

/// Attributes exposed to the rest of the stack.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_arn: Option<String>,
    pub elapsed_seconds: u64,
    pub polls: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
}

impl CompletionResponse {
    pub fn from_outcome(event: &LifecycleEvent, outcome: &Outcome) -> Self {
        let data = ResponseData {
            task_arn: outcome.task_id.clone(),
            elapsed_seconds: outcome.elapsed.as_secs(),
            polls: outcome.polls,
            finished_at: Some(outcome.finished_at.to_rfc3339()),
        };
        Self::new(event, outcome.result.into(), &outcome.reason, data)
    }

    /// A failure that happened before the orchestrator could run
    /// (bad configuration or event).
    pub fn failed(event: &LifecycleEvent, reason: &str) -> Self {
        Self::new(event, ResponseStatus::Failed, reason, ResponseData::default())
    }

    fn new(event: &LifecycleEvent, status: ResponseStatus, reason: &str, data: ResponseData) -> Self {
        Self {
            status,
            reason: truncate_reason(reason),
            physical_resource_id: event.physical_resource_id(),
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            data,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

/// Truncate to [`MAX_REASON_LEN`] bytes on a char boundary.
fn truncate_reason(reason: &str) -> String {
    const ELLIPSIS: &str = "...";

    let reason = if reason.trim().is_empty() {
        "no reason given"
    } else {
        reason
    };
    if reason.len() <= MAX_REASON_LEN {
        return reason.to_string();
    }

    let mut end = MAX_REASON_LEN - ELLIPSIS.len();
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{ELLIPSIS}", &reason[..end])
}
