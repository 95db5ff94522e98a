//! Integration tests for the migration orchestrator state machine.
//!
//! Time is paused (`start_paused = true`), so poll intervals, backoff and
//! deadlines advance instantly and deterministically.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;

use migrun_core::orchestrator::{MigrationOrchestrator, OrchestratorConfig};
use migrun_core::outcome::{OutcomeResult, RunError};
use migrun_core::request::LifecycleAction;
use migrun_core::scheduler::SchedulerError;

use common::*;

fn orchestrator(scheduler: ScriptedScheduler) -> MigrationOrchestrator<ScriptedScheduler> {
    MigrationOrchestrator::new(scheduler, OrchestratorConfig::default())
}

fn short_deadline(scheduler: ScriptedScheduler) -> MigrationOrchestrator<ScriptedScheduler> {
    let config = OrchestratorConfig {
        deadline: Duration::from_secs(60),
        ..Default::default()
    };
    MigrationOrchestrator::new(scheduler, config)
}

// ---------------------------------------------------------------------------
// Success paths
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn running_twice_then_exit_zero_succeeds_after_three_polls() {
    let orch = orchestrator(
        ScriptedScheduler::launching()
            .then(Ok(running()))
            .then(Ok(running()))
            .then(Ok(exited(0))),
    );

    let outcome = orch.run(&request(LifecycleAction::Create)).await;

    assert_eq!(outcome.result, OutcomeResult::Success);
    assert_eq!(outcome.polls, 3);
    assert_eq!(orch.scheduler().describes(), 3);
    assert_eq!(orch.scheduler().launches(), 1);
    assert_eq!(orch.scheduler().stops(), 0);
    assert_eq!(outcome.task_id.as_deref(), Some(TASK_ARN));
    assert!(outcome.error.is_none());
    assert!(!outcome.reason.is_empty());
}

#[tokio::test(start_paused = true)]
async fn pending_then_running_then_exit_zero_succeeds() {
    let orch = orchestrator(
        ScriptedScheduler::launching()
            .then(Ok(pending()))
            .then(Ok(status("PROVISIONING")))
            .then(Ok(running()))
            .then(Ok(status("DEPROVISIONING")))
            .then(Ok(exited(0))),
    );

    let outcome = orch.run(&request(LifecycleAction::Create)).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.polls, 5);
    assert_eq!(outcome.elapsed, Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn update_reruns_the_full_sequence() {
    let orch = orchestrator(ScriptedScheduler::launching().then(Ok(exited(0))));

    let outcome = orch.run(&request(LifecycleAction::Update)).await;

    assert!(outcome.is_success());
    assert_eq!(orch.scheduler().launches(), 1);
    assert_eq!(orch.scheduler().describes(), 1);
}

#[tokio::test(start_paused = true)]
async fn delete_never_contacts_the_scheduler() {
    let orch = orchestrator(ScriptedScheduler::failing_launch("should not be called"));

    let outcome = orch.run(&request(LifecycleAction::Delete)).await;

    assert!(outcome.is_success());
    assert_eq!(orch.scheduler().launches(), 0);
    assert_eq!(orch.scheduler().describes(), 0);
    assert_eq!(orch.scheduler().stops(), 0);
    assert!(outcome.task_id.is_none());
}

// ---------------------------------------------------------------------------
// Terminal failures
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn exit_code_one_fails_and_mentions_the_code() {
    let orch = orchestrator(ScriptedScheduler::launching().then(Ok(exited(1))));

    let outcome = orch.run(&request(LifecycleAction::Create)).await;

    assert_eq!(outcome.result, OutcomeResult::Failure);
    assert!(outcome.reason.contains("code 1"), "reason: {}", outcome.reason);
    assert_matches!(
        outcome.error,
        Some(RunError::TaskFailed {
            exit_code: Some(1),
            ..
        })
    );
    assert_eq!(orch.scheduler().stops(), 0);
}

#[tokio::test(start_paused = true)]
async fn launch_error_fails_without_polling() {
    let orch = orchestrator(ScriptedScheduler::failing_launch(
        "ClientException: TaskDefinition is inactive",
    ));

    let outcome = orch.run(&request(LifecycleAction::Create)).await;

    assert!(!outcome.is_success());
    assert!(outcome.reason.contains("TaskDefinition is inactive"));
    assert_matches!(outcome.error, Some(RunError::Launch(SchedulerError::Launch(_))));
    assert_eq!(orch.scheduler().launches(), 1);
    assert_eq!(orch.scheduler().describes(), 0);
    assert_eq!(orch.scheduler().stops(), 0);
    assert_eq!(outcome.polls, 0);
    assert!(outcome.task_id.is_none());
}

#[tokio::test(start_paused = true)]
async fn abnormal_stop_fails_with_stop_reason() {
    let orch = orchestrator(
        ScriptedScheduler::launching()
            .then(Ok(pending()))
            .then(Ok(stopped("TaskFailedToStart", "CannotPullContainerError: pull access denied"))),
    );

    let outcome = orch.run(&request(LifecycleAction::Create)).await;

    assert!(!outcome.is_success());
    assert!(outcome.reason.contains("CannotPullContainerError"));
    assert_matches!(outcome.error, Some(RunError::TaskFailed { exit_code: None, .. }));
    assert_eq!(orch.scheduler().stops(), 0);
}

#[tokio::test(start_paused = true)]
async fn task_reaped_after_running_fails() {
    let orch = orchestrator(
        ScriptedScheduler::launching()
            .then(Ok(running()))
            .then(Ok(vanished())),
    );

    let outcome = orch.run(&request(LifecycleAction::Create)).await;

    assert!(!outcome.is_success());
    assert!(outcome.reason.contains("vanished"), "reason: {}", outcome.reason);
    assert_eq!(outcome.polls, 2);
}

#[tokio::test(start_paused = true)]
async fn every_non_clean_terminal_state_is_a_failure_with_reason() {
    let terminals = vec![
        exited(1),
        exited(137),
        exited(-1),
        stopped("TaskFailedToStart", "ResourceInitializationError"),
        stopped("UserInitiated", "Stopped by operator"),
        stopped("SpotInterruption", "Capacity reclaimed"),
        status("STOPPED"),
    ];

    for terminal in terminals {
        let orch = orchestrator(
            ScriptedScheduler::launching()
                .then(Ok(running()))
                .then(Ok(terminal.clone())),
        );

        let outcome = orch.run(&request(LifecycleAction::Create)).await;

        assert_eq!(outcome.result, OutcomeResult::Failure, "{terminal:?}");
        assert!(!outcome.reason.trim().is_empty(), "{terminal:?}");
        assert_eq!(orch.scheduler().launches(), 1);
    }
}

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn deadline_times_out_and_requests_stop() {
    let orch = short_deadline(ScriptedScheduler::launching().otherwise(Ok(running())));

    let outcome = orch.run(&request(LifecycleAction::Create)).await;

    assert!(!outcome.is_success());
    assert!(outcome.reason.contains("timed out"), "reason: {}", outcome.reason);
    assert_matches!(outcome.error, Some(RunError::Timeout { last_error: None, .. }));
    assert_eq!(orch.scheduler().stops(), 1);
    assert_eq!(outcome.polls, 10);
    assert!(outcome.elapsed >= Duration::from_secs(60));
    assert_eq!(orch.scheduler().launches(), 1);

    let reasons = orch.scheduler().stop_reasons.lock().unwrap();
    assert!(reasons[0].contains("timed out"));
}

#[tokio::test(start_paused = true)]
async fn failed_stop_does_not_change_the_timeout_outcome() {
    let orch = short_deadline(
        ScriptedScheduler::launching()
            .otherwise(Ok(pending()))
            .failing_stop(),
    );

    let outcome = orch.run(&request(LifecycleAction::Create)).await;

    assert!(!outcome.is_success());
    assert!(outcome.reason.contains("timed out"));
    assert_eq!(orch.scheduler().stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn last_poll_lands_on_the_deadline() {
    let config = OrchestratorConfig {
        poll_interval: Duration::from_secs(7),
        deadline: Duration::from_secs(20),
        ..Default::default()
    };
    // Polls at 7s, 14s and a final clamped poll at 20s.
    let orch = MigrationOrchestrator::new(
        ScriptedScheduler::launching()
            .then(Ok(running()))
            .then(Ok(running()))
            .then(Ok(exited(0))),
        config,
    );

    let outcome = orch.run(&request(LifecycleAction::Create)).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.elapsed, Duration::from_secs(20));
}

// ---------------------------------------------------------------------------
// Transient poll failures
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn transient_poll_errors_are_retried() {
    let orch = orchestrator(
        ScriptedScheduler::launching()
            .then(transient("ThrottlingException: Rate exceeded"))
            .then(transient("dispatch failure"))
            .then(Ok(exited(0))),
    );

    let outcome = orch.run(&request(LifecycleAction::Create)).await;

    assert!(outcome.is_success());
    assert_eq!(orch.scheduler().describes(), 3);
    // 6s interval, then 1s and 2s backoff.
    assert_eq!(outcome.elapsed, Duration::from_secs(9));
}

#[tokio::test(start_paused = true)]
async fn exhausted_poll_retries_fold_into_timeout_failure() {
    let orch = orchestrator(
        ScriptedScheduler::launching().otherwise(transient("ServerException: internal error")),
    );

    let outcome = orch.run(&request(LifecycleAction::Create)).await;

    assert!(!outcome.is_success());
    assert!(outcome.reason.contains("timed out"), "reason: {}", outcome.reason);
    assert!(outcome.reason.contains("ServerException"));
    assert_matches!(outcome.error, Some(RunError::PollExhausted { attempts: 6, .. }));
    assert_eq!(orch.scheduler().describes(), 6);
    assert_eq!(orch.scheduler().stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn successful_poll_resets_the_retry_budget() {
    let config = OrchestratorConfig {
        max_poll_retries: 1,
        ..Default::default()
    };
    let orch = MigrationOrchestrator::new(
        ScriptedScheduler::launching()
            .then(transient("timeout"))
            .then(Ok(running()))
            .then(transient("timeout"))
            .then(Ok(exited(0))),
        config,
    );

    let outcome = orch.run(&request(LifecycleAction::Create)).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.polls, 4);
}

#[tokio::test(start_paused = true)]
async fn transient_errors_until_deadline_report_last_error() {
    let config = OrchestratorConfig {
        deadline: Duration::from_secs(20),
        max_poll_retries: 100,
        ..Default::default()
    };
    let orch = MigrationOrchestrator::new(
        ScriptedScheduler::launching().otherwise(transient("connection reset")),
        config,
    );

    let outcome = orch.run(&request(LifecycleAction::Create)).await;

    assert!(outcome.reason.contains("timed out"));
    assert!(outcome.reason.contains("connection reset"));
    assert_eq!(orch.scheduler().stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn task_not_yet_visible_is_retried() {
    let orch = orchestrator(
        ScriptedScheduler::launching()
            .then(Ok(vanished()))
            .then(Ok(running()))
            .then(Ok(exited(0))),
    );

    let outcome = orch.run(&request(LifecycleAction::Create)).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.polls, 3);
}

#[tokio::test(start_paused = true)]
async fn fatal_poll_error_fails_immediately_and_requests_stop() {
    let orch = orchestrator(
        ScriptedScheduler::launching()
            .then(Ok(running()))
            .then(Err(SchedulerError::Fatal("AccessDeniedException".into()))),
    );

    let outcome = orch.run(&request(LifecycleAction::Create)).await;

    assert!(!outcome.is_success());
    assert_matches!(outcome.error, Some(RunError::PollFatal(_)));
    assert!(outcome.reason.contains("AccessDeniedException"));
    assert_eq!(orch.scheduler().describes(), 2);
    assert_eq!(orch.scheduler().stops(), 1);
}
