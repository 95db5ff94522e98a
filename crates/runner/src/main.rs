//! `migrun-runner` -- one-shot database migration task runner.
//!
//! Invoked once per provisioning lifecycle event.  Launches the migration
//! task on ECS, blocks until it succeeds, fails or times out, and reports
//! `SUCCESS`/`FAILED` back to the lifecycle.
//!
//! # Hosting
//!
//! Inside AWS Lambda (`AWS_LAMBDA_RUNTIME_API` set) the runner serves
//! invocations through the Lambda runtime; each invocation payload is one
//! lifecycle event and the completion response is also the function
//! result.  Anywhere else it handles a single event and exits:
//!
//! ```text
//! migrun-runner [EVENT_FILE]
//! ```
//!
//! The lifecycle event JSON is read from `EVENT_FILE`, or from stdin when
//! no file is given.  An empty event is a direct Create using the
//! environment defaults (see [`RunnerConfig::from_env`]).
//!
//! # Exit codes
//!
//! | Code | Meaning                                  |
//! |------|------------------------------------------|
//! | `0`  | Migration succeeded (or delete no-op)    |
//! | `1`  | Migration failed                         |
//! | `2`  | Bad event or configuration               |

use std::io::{IsTerminal, Read};
use std::process::ExitCode;

use anyhow::Context;
use lambda_runtime::{service_fn, LambdaEvent};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use migrun_ecs::EcsScheduler;
use migrun_lifecycle::LifecycleError;
use migrun_runner::config::{LogFormat, RunnerConfig};
use migrun_runner::handler::{self, Completion};

/// Default tracing filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "migrun_runner=info,migrun_core=info,migrun_ecs=info,migrun_lifecycle=info";

/// Set by the Lambda execution environment.
const LAMBDA_RUNTIME_API: &str = "AWS_LAMBDA_RUNTIME_API";

const EXIT_BAD_INPUT: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    init_tracing(LogFormat::from_lookup(|key| std::env::var(key).ok()));

    if std::env::var_os(LAMBDA_RUNTIME_API).is_some() {
        tracing::info!("Serving lifecycle events from the Lambda runtime");
        return match lambda_runtime::run(service_fn(lambda_invocation)).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "Lambda runtime stopped");
                ExitCode::FAILURE
            }
        };
    }

    match run_once().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "migrun-runner failed");
            ExitCode::from(EXIT_BAD_INPUT)
        }
    }
}

/// Handle one event from a file or stdin.
async fn run_once() -> anyhow::Result<ExitCode> {
    let raw = read_event()?;
    let completion = invoke(&raw).await.context("unusable lifecycle event")?;

    handler::report(&completion.event, &completion.response, &mut std::io::stdout())
        .await
        .context("failed to report outcome to the lifecycle")?;

    Ok(ExitCode::from(completion.exit_code()))
}

/// Handle one Lambda invocation.
async fn lambda_invocation(
    invocation: LambdaEvent<serde_json::Value>,
) -> Result<serde_json::Value, lambda_runtime::Error> {
    let raw = match &invocation.payload {
        serde_json::Value::Null => String::new(),
        payload => payload.to_string(),
    };
    tracing::info!(aws_request_id = %invocation.context.request_id, "Lambda invocation");

    let completion = invoke(&raw).await?;
    handler::report(&completion.event, &completion.response, &mut std::io::sink()).await?;

    Ok(serde_json::to_value(&completion.response)?)
}

async fn invoke(raw: &str) -> Result<Completion, LifecycleError> {
    handler::process(raw, RunnerConfig::from_env(), EcsScheduler::from_env).await
}

/// Read the event from the file named by the first argument, or stdin.
fn read_event() -> anyhow::Result<String> {
    if let Some(path) = std::env::args().nth(1) {
        return std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read event file {path}"));
    }

    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(String::new());
    }

    let mut raw = String::new();
    stdin
        .read_to_string(&mut raw)
        .context("failed to read event from stdin")?;
    Ok(raw)
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    // stdout is reserved for the response body of direct invocations.
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}
