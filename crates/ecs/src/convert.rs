//! Conversions between ECS API shapes and the core scheduler model.

use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, Container, Failure, NetworkConfiguration, Task,
};

use migrun_core::request::{IdempotencyToken, NetworkPlacement};
use migrun_core::scheduler::{RemoteTaskState, SchedulerError, TaskHandle, TaskSnapshot};

/// ECS limits `startedBy` to 36 characters.
pub const MAX_STARTED_BY_LEN: usize = 36;

/// ECS limits `StopTask` reasons to 255 characters.
pub const MAX_STOP_REASON_LEN: usize = 255;

/// `startedBy` tag for a launch, derived from the idempotency token.
///
/// Characters ECS rejects are replaced with `-`.
pub fn started_by(token: &IdempotencyToken) -> String {
    let tag: String = token
        .as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/') {
                c
            } else {
                '-'
            }
        })
        .take(MAX_STARTED_BY_LEN)
        .collect();

    if tag.is_empty() {
        "migrun".to_string()
    } else {
        tag
    }
}

pub fn stop_reason(reason: &str) -> String {
    reason.chars().take(MAX_STOP_REASON_LEN).collect()
}

/// `awsvpc` network configuration for a Fargate launch.
pub fn network_configuration(
    placement: &NetworkPlacement,
) -> Result<NetworkConfiguration, SchedulerError> {
    let security_groups = if placement.security_groups().is_empty() {
        None
    } else {
        Some(placement.security_groups().to_vec())
    };
    let assign_public_ip = if placement.assign_public_ip() {
        AssignPublicIp::Enabled
    } else {
        AssignPublicIp::Disabled
    };

    let vpc = AwsVpcConfiguration::builder()
        .set_subnets(Some(placement.subnets().to_vec()))
        .set_security_groups(security_groups)
        .assign_public_ip(assign_public_ip)
        .build()
        .map_err(|e| SchedulerError::Launch(format!("invalid network configuration: {e}")))?;

    Ok(NetworkConfiguration::builder()
        .awsvpc_configuration(vpc)
        .build())
}

/// Extract the launched task from a `RunTask` response.
///
/// ECS reports placement problems (e.g. `RESOURCE:MEMORY`) as failures in
/// a successful response, so an empty task list is a launch error.
pub fn launch_handle(
    cluster: &str,
    tasks: &[Task],
    failures: &[Failure],
) -> Result<TaskHandle, SchedulerError> {
    if let Some(arn) = tasks.iter().find_map(Task::task_arn) {
        return Ok(TaskHandle::new(cluster, arn));
    }

    if failures.is_empty() {
        Err(SchedulerError::Launch(
            "RunTask returned neither a task nor a failure".to_string(),
        ))
    } else {
        Err(SchedulerError::Launch(format!(
            "RunTask placed no task: {}",
            describe_failures(failures)
        )))
    }
}

/// Turn a `DescribeTasks` response into a snapshot.
pub fn snapshot(tasks: &[Task], failures: &[Failure]) -> TaskSnapshot {
    match tasks.first() {
        Some(task) => TaskSnapshot::Found(remote_state(task)),
        None => TaskSnapshot::Vanished {
            reason: (!failures.is_empty()).then(|| describe_failures(failures)),
        },
    }
}

/// Raw state of one task.
///
/// The reported exit code is the first non-zero container exit code, so a
/// failing sidecar fails the run; otherwise the first reported one.
pub fn remote_state(task: &Task) -> RemoteTaskState {
    let containers = task.containers();
    let reporting = containers
        .iter()
        .find(|c| matches!(c.exit_code(), Some(code) if code != 0))
        .or_else(|| containers.iter().find(|c| c.exit_code().is_some()));

    RemoteTaskState {
        last_status: task.last_status().unwrap_or_default().to_string(),
        stop_code: task.stop_code().map(|code| code.as_str().to_string()),
        stopped_reason: task.stopped_reason().map(str::to_string),
        exit_code: reporting.and_then(Container::exit_code),
        container_reason: reporting.and_then(Container::reason).map(str::to_string),
    }
}

fn describe_failures(failures: &[Failure]) -> String {
    failures
        .iter()
        .map(|f| {
            let reason = f.reason().unwrap_or("unknown");
            match f.detail() {
                Some(detail) if !detail.is_empty() => format!("{reason} ({detail})"),
                _ => reason.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
