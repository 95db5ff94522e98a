//! One-shot migration task orchestrator.
//!
//! [`MigrationOrchestrator::run`] launches a single task, polls the
//! scheduler until the task reaches a terminal state or the deadline
//! passes, and folds the result into an [`Outcome`]:
//!
//! ```text
//! Submitted -> {Pending, Running}* -> Succeeded(exit=0)       => Success
//!                                   | Failed(exit!=0)         => Failure
//!                                   | StoppedAbnormally       => Failure
//!                                   | TimedOut                => Failure (stop attempted)
//!           -> LaunchFailed                                   => Failure
//! ```
//!
//! The task is never re-launched.  Delete actions return immediately
//! without touching the scheduler.

use std::time::Duration;

use tokio::time::Instant;

use crate::backoff::BackoffPolicy;
use crate::outcome::{Outcome, RunError};
use crate::request::MigrationRequest;
use crate::scheduler::{SchedulerError, TaskHandle, TaskScheduler, TaskSnapshot};
use crate::status::TaskStatus;

/// Default interval between status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(6);

/// Default overall deadline, measured from a successful launch.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(15 * 60);

/// Default number of retries for consecutive transient status-query failures.
pub const DEFAULT_MAX_POLL_RETRIES: u32 = 5;

/// Polling and timeout policy.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub poll_interval: Duration,
    pub deadline: Duration,
    /// Retries allowed after a transient failure before giving up.
    pub max_poll_retries: u32,
    pub backoff: BackoffPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: DEFAULT_DEADLINE,
            max_poll_retries: DEFAULT_MAX_POLL_RETRIES,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Runs one migration task per invocation against a [`TaskScheduler`].
pub struct MigrationOrchestrator<S> {
    scheduler: S,
    config: OrchestratorConfig,
}

impl<S: TaskScheduler> MigrationOrchestrator<S> {
    pub fn new(scheduler: S, config: OrchestratorConfig) -> Self {
        Self { scheduler, config }
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run the migration for `request` and report the outcome.
    pub async fn run(&self, request: &MigrationRequest) -> Outcome {
        let token = request.token().as_str();

        if !request.action().launches_task() {
            tracing::info!(token, action = %request.action(), "Skipping migration task");
            return Outcome::skipped(request.action());
        }

        let started = Instant::now();
        tracing::info!(
            token,
            action = %request.action(),
            cluster = request.cluster(),
            task_definition = request.task_definition(),
            subnets = request.placement().subnets().len(),
            "Launching migration task",
        );

        let handle = match self.scheduler.launch_task(request).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(token, error = %e, "Migration task launch failed");
                return Outcome::failure(RunError::Launch(e), started.elapsed(), None, 0);
            }
        };

        tracing::info!(token, task_id = %handle, "Migration task submitted");

        let mut polls = 0u32;
        let result = self
            .poll_until_terminal(&handle, started + self.config.deadline, &mut polls)
            .await;
        let task_id = Some(handle.task_id().to_string());

        match result {
            Ok(()) => {
                tracing::info!(
                    token,
                    task_id = %handle,
                    polls,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Migration task succeeded",
                );
                Outcome::success(
                    "migration task exited with code 0",
                    started.elapsed(),
                    task_id,
                    polls,
                )
            }
            Err(error) => {
                if error.task_may_be_running() {
                    self.stop_best_effort(&handle, &error).await;
                }
                tracing::error!(
                    token,
                    task_id = %handle,
                    polls,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %error,
                    "Migration task failed",
                );
                Outcome::failure(error, started.elapsed(), task_id, polls)
            }
        }
    }

    /// Poll until the task settles.  `Ok(())` only for a clean exit.
    async fn poll_until_terminal(
        &self,
        handle: &TaskHandle,
        deadline: Instant,
        polls: &mut u32,
    ) -> Result<(), RunError> {
        let mut delay = self.config.poll_interval;
        let mut backoff = self.config.backoff.start();
        let mut failures = 0u32;
        let mut last_error: Option<SchedulerError> = None;
        let mut last_status: Option<TaskStatus> = None;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(RunError::Timeout {
                    after: self.config.deadline,
                    last_error,
                });
            }
            tokio::time::sleep(delay.min(remaining)).await;

            *polls += 1;
            let polled = match self.scheduler.describe_task(handle).await {
                // A task the scheduler has never shown us is most likely not
                // visible yet, not reaped.
                Ok(TaskSnapshot::Vanished { reason }) if last_status.is_none() => {
                    Err(SchedulerError::Transient(format!(
                        "task not yet visible to the scheduler{}",
                        reason.map(|r| format!(" ({r})")).unwrap_or_default()
                    )))
                }
                other => other,
            };

            match polled {
                Ok(snapshot) => {
                    failures = 0;
                    backoff.reset();
                    delay = self.config.poll_interval;
                    last_error = None;

                    let status = match snapshot {
                        TaskSnapshot::Found(state) => TaskStatus::from_remote(&state),
                        TaskSnapshot::Vanished { reason } => TaskStatus::StoppedAbnormally {
                            reason: format!(
                                "task vanished from the scheduler{}",
                                reason.map(|r| format!(" ({r})")).unwrap_or_default()
                            ),
                        },
                    };

                    if last_status.as_ref() != Some(&status) {
                        tracing::info!(
                            task_id = %handle,
                            status = %status,
                            terminal = status.is_terminal(),
                            poll = *polls,
                            "Migration task status changed",
                        );
                    }

                    match status {
                        TaskStatus::Pending | TaskStatus::Running => last_status = Some(status),
                        TaskStatus::Succeeded => return Ok(()),
                        TaskStatus::Failed { exit_code, reason } => {
                            return Err(RunError::TaskFailed {
                                exit_code: Some(exit_code),
                                reason: reason.unwrap_or_default(),
                            });
                        }
                        TaskStatus::StoppedAbnormally { reason } => {
                            return Err(RunError::TaskFailed {
                                exit_code: None,
                                reason,
                            });
                        }
                    }
                }
                Err(e) if e.is_transient() => {
                    failures += 1;
                    if failures > self.config.max_poll_retries {
                        return Err(RunError::PollExhausted {
                            attempts: failures,
                            last_error: e,
                        });
                    }
                    delay = backoff.next_delay();
                    tracing::warn!(
                        task_id = %handle,
                        attempt = failures,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "Migration task status query failed, retrying",
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(RunError::PollFatal(e)),
            }
        }
    }

    /// Ask the scheduler to stop the task.  Errors are logged, not returned.
    async fn stop_best_effort(&self, handle: &TaskHandle, error: &RunError) {
        let reason = format!("migration orchestrator gave up: {error}");
        match self.scheduler.stop_task(handle, &reason).await {
            Ok(()) => tracing::info!(task_id = %handle, "Stop requested for migration task"),
            Err(e) => {
                tracing::warn!(task_id = %handle, error = %e, "Failed to stop migration task");
            }
        }
    }
}
