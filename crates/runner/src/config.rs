use std::time::Duration;

use anyhow::{bail, Context};

use migrun_core::backoff::BackoffPolicy;
use migrun_core::orchestrator::{
    OrchestratorConfig, DEFAULT_DEADLINE, DEFAULT_MAX_POLL_RETRIES, DEFAULT_POLL_INTERVAL,
};
use migrun_core::request::split_csv;
use migrun_lifecycle::event::parse_flag;
use migrun_lifecycle::TargetDefaults;

/// Log output format, selected with `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Unknown values fall back to [`LogFormat::Pretty`].
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Runner configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Migration target used when the lifecycle event does not override it.
    pub target: TargetDefaults,
    pub orchestrator: OrchestratorConfig,
}

impl RunnerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default    |
    /// |-------------------------|------------|
    /// | `CLUSTER_NAME`          | --         |
    /// | `TASK_DEF`              | --         |
    /// | `SUBNETS`               | --         |
    /// | `SECURITY_GROUPS`       | (none)     |
    /// | `ASSIGN_PUBLIC_IP`      | `false`    |
    /// | `POLL_INTERVAL_SECS`    | `6`        |
    /// | `DEADLINE_SECS`         | `900`      |
    /// | `POLL_MAX_RETRIES`      | `5`        |
    /// | `POLL_BACKOFF_MAX_SECS` | `30`       |
    ///
    /// Target variables may be left unset when every event carries them.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let assign_public_ip = match non_blank("ASSIGN_PUBLIC_IP") {
            Some(raw) => parse_flag(&raw)
                .with_context(|| format!("ASSIGN_PUBLIC_IP must be a boolean flag, got '{raw}'"))?,
            None => false,
        };

        let target = TargetDefaults {
            cluster: non_blank("CLUSTER_NAME").map(|v| v.trim().to_string()),
            task_definition: non_blank("TASK_DEF").map(|v| v.trim().to_string()),
            subnets: non_blank("SUBNETS").map(|v| split_csv(&v)).unwrap_or_default(),
            security_groups: non_blank("SECURITY_GROUPS")
                .map(|v| split_csv(&v))
                .unwrap_or_default(),
            assign_public_ip,
        };

        let poll_interval = secs(&non_blank, "POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL)?;
        let deadline = secs(&non_blank, "DEADLINE_SECS", DEFAULT_DEADLINE)?;
        let backoff_max = secs(&non_blank, "POLL_BACKOFF_MAX_SECS", BackoffPolicy::default().max)?;
        let max_poll_retries = match non_blank("POLL_MAX_RETRIES") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("POLL_MAX_RETRIES must be a valid u32, got '{raw}'"))?,
            None => DEFAULT_MAX_POLL_RETRIES,
        };

        if poll_interval.is_zero() {
            bail!("POLL_INTERVAL_SECS must be greater than zero");
        }
        if deadline < poll_interval {
            bail!("DEADLINE_SECS must be at least POLL_INTERVAL_SECS");
        }

        let orchestrator = OrchestratorConfig {
            poll_interval,
            deadline,
            max_poll_retries,
            backoff: BackoffPolicy {
                max: backoff_max,
                ..Default::default()
            },
        };

        Ok(Self {
            target,
            orchestrator,
        })
    }
}

fn secs<F>(lookup: &F, key: &str, default: Duration) -> anyhow::Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .with_context(|| format!("{key} must be a whole number of seconds, got '{raw}'")),
        None => Ok(default),
    }
}
