//! Single lifecycle invocation: resolve the request, run the
//! orchestrator, report the outcome.

use std::future::Future;
use std::io::Write;

use migrun_core::orchestrator::MigrationOrchestrator;
use migrun_core::outcome::Outcome;
use migrun_core::request::LifecycleAction;
use migrun_core::scheduler::TaskScheduler;
use migrun_lifecycle::{CompletionResponse, LifecycleError, LifecycleEvent, ResponseDelivery, TargetDefaults};

use crate::config::RunnerConfig;

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The orchestrator ran (or skipped a Delete).
    Ran,
    /// The event or configuration was unusable and nothing was launched.
    Rejected,
}

/// The answer owed to the lifecycle for one invocation.
#[derive(Debug)]
pub struct Completion {
    pub event: LifecycleEvent,
    pub response: CompletionResponse,
    pub disposition: Disposition,
}

impl Completion {
    fn ran(event: LifecycleEvent, outcome: &Outcome) -> Self {
        Self {
            response: CompletionResponse::from_outcome(&event, outcome),
            event,
            disposition: Disposition::Ran,
        }
    }

    /// Nothing could be run.  A Delete still succeeds.
    fn rejected(event: LifecycleEvent, reason: &str) -> Self {
        let response = if event.request_type == LifecycleAction::Delete {
            tracing::warn!(reason, "Acknowledging delete despite unusable input");
            CompletionResponse::from_outcome(&event, &Outcome::skipped(LifecycleAction::Delete))
        } else {
            CompletionResponse::failed(&event, reason)
        };
        Self {
            event,
            response,
            disposition: Disposition::Rejected,
        }
    }

    /// Process exit code: 0 success, 1 migration failure, 2 bad input.
    pub fn exit_code(&self) -> u8 {
        match (self.response.is_success(), self.disposition) {
            (true, _) => 0,
            (false, Disposition::Ran) => 1,
            (false, Disposition::Rejected) => 2,
        }
    }
}

/// Run one raw invocation payload end to end, short of reporting.
///
/// `connect` builds the scheduler and is only called once the event and
/// configuration are usable.  Errors only when the payload is so broken
/// that nobody can be answered.
pub async fn process<S, F, Fut>(
    raw: &str,
    config: anyhow::Result<RunnerConfig>,
    connect: F,
) -> Result<Completion, LifecycleError>
where
    S: TaskScheduler,
    F: FnOnce() -> Fut,
    Fut: Future<Output = S>,
{
    let event = match LifecycleEvent::parse(raw) {
        Ok(event) => event,
        Err(e) => {
            let Some(event) = LifecycleEvent::salvage(raw) else {
                return Err(e);
            };
            tracing::error!(error = %e, request_id = %event.request_id, "Invalid lifecycle event");
            return Ok(Completion::rejected(event, &format!("invalid lifecycle event: {e}")));
        }
    };

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Invalid configuration");
            return Ok(Completion::rejected(event, &format!("invalid configuration: {e:#}")));
        }
    };

    let orchestrator = MigrationOrchestrator::new(connect().await, config.orchestrator);
    tracing::info!(
        poll_interval_secs = orchestrator.config().poll_interval.as_secs(),
        deadline_secs = orchestrator.config().deadline.as_secs(),
        max_poll_retries = orchestrator.config().max_poll_retries,
        "Orchestrator ready",
    );

    match handle_event(&event, &config.target, &orchestrator).await {
        Ok(outcome) => Ok(Completion::ran(event, &outcome)),
        Err(e) => {
            tracing::error!(error = %e, "Could not resolve migration request");
            let reason = e.to_string();
            Ok(Completion::rejected(event, &reason))
        }
    }
}

/// Resolve and run one lifecycle event.
///
/// A Delete whose target cannot be resolved (stale or missing
/// configuration) still succeeds: deletion is never blocked.
pub async fn handle_event<S: TaskScheduler>(
    event: &LifecycleEvent,
    target: &TargetDefaults,
    orchestrator: &MigrationOrchestrator<S>,
) -> Result<Outcome, LifecycleError> {
    tracing::info!(
        request_id = %event.request_id,
        action = %event.request_type,
        logical_resource_id = %event.logical_resource_id,
        "Handling lifecycle event",
    );

    match event.to_request(target) {
        Ok(request) => Ok(orchestrator.run(&request).await),
        Err(e) if event.request_type == LifecycleAction::Delete => {
            tracing::warn!(error = %e, "Ignoring unresolvable target for delete");
            Ok(Outcome::skipped(LifecycleAction::Delete))
        }
        Err(e) => Err(e),
    }
}

/// Report a response back to the lifecycle.
///
/// Events with a response URL get an HTTP PUT; otherwise the JSON body is
/// written to `out`.
pub async fn report<W: Write>(
    event: &LifecycleEvent,
    response: &CompletionResponse,
    out: &mut W,
) -> Result<(), LifecycleError> {
    match event.response_url.as_deref() {
        Some(url) if !url.trim().is_empty() => ResponseDelivery::new()?.deliver(url, response).await,
        _ => {
            serde_json::to_writer_pretty(&mut *out, response)?;
            writeln!(out).map_err(serde_json::Error::io)?;
            Ok(())
        }
    }
}
