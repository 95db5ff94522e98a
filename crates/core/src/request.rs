//! Migration request model: lifecycle action, idempotency token and
//! network placement.
//!
//! A [`MigrationRequest`] is built fresh for every invocation and is
//! immutable once constructed.  Construction performs the only local
//! validation the orchestrator does; whether the cluster and task
//! definition actually exist is left to the launch call.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Number of task copies launched per invocation.  Not configurable.
pub const DESIRED_TASK_COUNT: i32 = 1;

// ---------------------------------------------------------------------------
// LifecycleAction
// ---------------------------------------------------------------------------

/// Provisioning operation that triggered the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleAction {
    Create,
    Update,
    Delete,
}

impl LifecycleAction {
    /// Parse a lifecycle action name (case-insensitive).
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(CoreError::Validation(format!(
                "Unknown lifecycle action '{other}'. Must be one of: Create, Update, Delete"
            ))),
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }

    /// Whether this action runs the migration task.  Delete never does.
    pub fn launches_task(self) -> bool {
        !matches!(self, Self::Delete)
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// IdempotencyToken
// ---------------------------------------------------------------------------

/// Caller-supplied key identifying one logical lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyToken(String);

impl IdempotencyToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// NetworkPlacement
// ---------------------------------------------------------------------------

/// Where the migration task runs: subnets, security groups and whether
/// the task gets a public IP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPlacement {
    subnets: Vec<String>,
    security_groups: Vec<String>,
    assign_public_ip: bool,
}

impl NetworkPlacement {
    /// Build a placement from subnet identifiers.
    ///
    /// Identifiers are trimmed, blanks are dropped and duplicates removed
    /// (first occurrence wins).  At least one subnet must remain.
    pub fn new<I, S>(subnets: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let subnets = normalize_ids(subnets);
        if subnets.is_empty() {
            return Err(CoreError::Validation(
                "At least one subnet is required".into(),
            ));
        }

        Ok(Self {
            subnets,
            security_groups: Vec::new(),
            assign_public_ip: false,
        })
    }

    /// Attach security groups (normalized like subnets; may be empty).
    pub fn with_security_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.security_groups = normalize_ids(groups);
        self
    }

    pub fn with_public_ip(mut self, assign: bool) -> Self {
        self.assign_public_ip = assign;
        self
    }

    pub fn subnets(&self) -> &[String] {
        &self.subnets
    }

    pub fn security_groups(&self) -> &[String] {
        &self.security_groups
    }

    pub fn assign_public_ip(&self) -> bool {
        self.assign_public_ip
    }
}

/// Split a comma-separated identifier list, e.g. `subnet-a, subnet-b`.
pub fn split_csv(raw: &str) -> Vec<String> {
    normalize_ids(raw.split(','))
}

fn normalize_ids<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for id in ids {
        let id = id.as_ref().trim();
        if !id.is_empty() && !out.iter().any(|existing| existing == id) {
            out.push(id.to_string());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// MigrationRequest
// ---------------------------------------------------------------------------

/// Everything the orchestrator needs for one invocation.
#[derive(Debug, Clone)]
pub struct MigrationRequest {
    cluster: String,
    task_definition: String,
    placement: NetworkPlacement,
    action: LifecycleAction,
    token: IdempotencyToken,
}

impl MigrationRequest {
    pub fn new(
        cluster: impl Into<String>,
        task_definition: impl Into<String>,
        placement: NetworkPlacement,
        action: LifecycleAction,
        token: IdempotencyToken,
    ) -> Result<Self, CoreError> {
        let cluster = require_non_blank(cluster.into(), "cluster")?;
        let task_definition = require_non_blank(task_definition.into(), "task definition")?;

        Ok(Self {
            cluster,
            task_definition,
            placement,
            action,
            token,
        })
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn task_definition(&self) -> &str {
        &self.task_definition
    }

    pub fn placement(&self) -> &NetworkPlacement {
        &self.placement
    }

    pub fn action(&self) -> LifecycleAction {
        self.action
    }

    pub fn token(&self) -> &IdempotencyToken {
        &self.token
    }

    pub fn desired_count(&self) -> i32 {
        DESIRED_TASK_COUNT
    }
}

fn require_non_blank(value: String, field: &str) -> Result<String, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!(
            "The {field} identifier must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
