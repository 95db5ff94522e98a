//! Custom-resource lifecycle events.
//!
//! The provisioning system invokes the runner with a JSON event such as:
//!
//! ```json
//! {
//!   "RequestType": "Create",
//!   "RequestId": "9f5a...",
//!   "ResponseURL": "https://...",
//!   "StackId": "arn:aws:cloudformation:...",
//!   "LogicalResourceId": "LiquibaseRun",
//!   "ResourceProperties": {
//!     "ClusterName": "app-cluster",
//!     "TaskDefinition": "arn:aws:ecs:...:task-definition/liquibase:7",
//!     "Subnets": ["subnet-a", "subnet-b"]
//!   }
//! }
//! ```
//!
//! An empty payload is a direct invocation: a Create that takes its
//! target entirely from the environment defaults.

use serde::{Deserialize, Deserializer};

use migrun_core::request::{
    split_csv, IdempotencyToken, LifecycleAction, MigrationRequest, NetworkPlacement,
};

use crate::error::LifecycleError;

/// Physical resource id prefix for runs without an existing id.
pub const PHYSICAL_ID_PREFIX: &str = "migration-run";

/// Migration target used when the event does not override it.
#[derive(Debug, Clone, Default)]
pub struct TargetDefaults {
    pub cluster: Option<String>,
    pub task_definition: Option<String>,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub assign_public_ip: bool,
}

/// One lifecycle invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleEvent {
    #[serde(default = "direct_invocation_action")]
    pub request_type: LifecycleAction,
    #[serde(default)]
    pub request_id: String,
    #[serde(rename = "ResponseURL", default)]
    pub response_url: Option<String>,
    #[serde(default)]
    pub stack_id: String,
    #[serde(default)]
    pub logical_resource_id: String,
    #[serde(default)]
    pub physical_resource_id: Option<String>,
    #[serde(default)]
    pub resource_properties: ResourceProperties,
}

/// Target overrides carried by the event.  All optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceProperties {
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub task_definition: Option<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub subnets: Option<Vec<String>>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub security_groups: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub assign_public_ip: Option<bool>,
}

fn direct_invocation_action() -> LifecycleAction {
    LifecycleAction::Create
}

impl LifecycleEvent {
    /// Parse an event payload.  Blank input is a direct invocation.
    ///
    /// Events without a request id get a generated one so every run has
    /// an idempotency token.
    pub fn parse(raw: &str) -> Result<Self, LifecycleError> {
        let event = if raw.trim().is_empty() {
            Self::direct()
        } else {
            serde_json::from_str(raw)?
        };
        Ok(event.with_request_id())
    }

    /// Recover the lifecycle metadata of a payload that [`parse`] rejected,
    /// so the lifecycle still gets an answer.  Properties are dropped and
    /// an unrecognised request type is read as Create.  `None` unless the
    /// payload is a JSON object.
    ///
    /// [`parse`]: Self::parse
    pub fn salvage(raw: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(raw).ok()?;
        let fields = value.as_object()?;
        let text = |key: &str| fields.get(key).and_then(|v| v.as_str()).map(str::to_string);

        let event = Self {
            request_type: text("RequestType")
                .and_then(|name| LifecycleAction::from_name(&name).ok())
                .unwrap_or(LifecycleAction::Create),
            request_id: text("RequestId").unwrap_or_default(),
            response_url: text("ResponseURL"),
            stack_id: text("StackId").unwrap_or_default(),
            logical_resource_id: text("LogicalResourceId").unwrap_or_default(),
            physical_resource_id: text("PhysicalResourceId"),
            resource_properties: ResourceProperties::default(),
        };
        Some(event.with_request_id())
    }

    /// A Create with no lifecycle metadata.
    pub fn direct() -> Self {
        Self {
            request_type: LifecycleAction::Create,
            request_id: String::new(),
            response_url: None,
            stack_id: String::new(),
            logical_resource_id: String::new(),
            physical_resource_id: None,
            resource_properties: ResourceProperties::default(),
        }
        .with_request_id()
    }

    fn with_request_id(mut self) -> Self {
        if self.request_id.trim().is_empty() {
            self.request_id = uuid::Uuid::new_v4().to_string();
        }
        self
    }

    pub fn idempotency_token(&self) -> IdempotencyToken {
        IdempotencyToken::new(self.request_id.clone())
    }

    /// Stable physical id: the existing one, else derived from the logical id.
    pub fn physical_resource_id(&self) -> String {
        match self.physical_resource_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ if self.logical_resource_id.is_empty() => PHYSICAL_ID_PREFIX.to_string(),
            _ => format!("{PHYSICAL_ID_PREFIX}/{}", self.logical_resource_id),
        }
    }

    /// Resolve the migration request, with event properties taking
    /// precedence over `defaults`.
    pub fn to_request(&self, defaults: &TargetDefaults) -> Result<MigrationRequest, LifecycleError> {
        let props = &self.resource_properties;

        let cluster = props
            .cluster_name
            .clone()
            .or_else(|| defaults.cluster.clone())
            .ok_or(LifecycleError::MissingTarget("cluster"))?;
        let task_definition = props
            .task_definition
            .clone()
            .or_else(|| defaults.task_definition.clone())
            .ok_or(LifecycleError::MissingTarget("task definition"))?;
        let subnets = props.subnets.as_ref().unwrap_or(&defaults.subnets);
        let security_groups = props
            .security_groups
            .as_ref()
            .unwrap_or(&defaults.security_groups);
        let assign_public_ip = props.assign_public_ip.unwrap_or(defaults.assign_public_ip);

        let placement = NetworkPlacement::new(subnets)?
            .with_security_groups(security_groups)
            .with_public_ip(assign_public_ip);

        Ok(MigrationRequest::new(
            cluster,
            task_definition,
            placement,
            self.request_type,
            self.idempotency_token(),
        )?)
    }
}

// ---------------------------------------------------------------------------
// Property deserializers
// ---------------------------------------------------------------------------

/// Lists arrive either as JSON arrays or as comma-separated strings.
fn string_or_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(String),
        Many(Vec<String>),
    }

    Ok(
        Option::<StringOrList>::deserialize(deserializer)?.map(|value| match value {
            StringOrList::One(raw) => split_csv(&raw),
            StringOrList::Many(items) => items,
        }),
    )
}

/// Property values are usually stringly typed (`"true"`, `"ENABLED"`).
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Text(String),
    }

    match Option::<BoolOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolOrString::Bool(b)) => Ok(Some(b)),
        Some(BoolOrString::Text(text)) => parse_flag(&text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid boolean flag '{text}'"))),
    }
}

/// Parse `true`/`false`, `enabled`/`disabled`, `yes`/`no`, `1`/`0`.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "enabled" | "yes" | "1" => Some(true),
        "false" | "disabled" | "no" | "0" => Some(false),
        _ => None,
    }
}
