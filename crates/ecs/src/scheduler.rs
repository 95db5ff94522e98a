use async_trait::async_trait;
use aws_sdk_ecs::types::LaunchType;
use aws_sdk_ecs::Client;

use migrun_core::request::MigrationRequest;
use migrun_core::scheduler::{SchedulerError, TaskHandle, TaskScheduler, TaskSnapshot};

use crate::convert;
use crate::errors::{classify, launch_error};

/// [`TaskScheduler`] backed by the ECS API.
pub struct EcsScheduler {
    client: Client,
}

impl EcsScheduler {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS credential and region chain.
    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl TaskScheduler for EcsScheduler {
    async fn launch_task(&self, request: &MigrationRequest) -> Result<TaskHandle, SchedulerError> {
        let network = convert::network_configuration(request.placement())?;

        let output = self
            .client
            .run_task()
            .cluster(request.cluster())
            .task_definition(request.task_definition())
            .launch_type(LaunchType::Fargate)
            .count(request.desired_count())
            .started_by(convert::started_by(request.token()))
            .network_configuration(network)
            .send()
            .await
            .map_err(|e| launch_error(&e))?;

        if !output.failures().is_empty() {
            tracing::warn!(
                cluster = request.cluster(),
                failures = output.failures().len(),
                "RunTask reported placement failures",
            );
        }

        convert::launch_handle(request.cluster(), output.tasks(), output.failures())
    }

    async fn describe_task(&self, handle: &TaskHandle) -> Result<TaskSnapshot, SchedulerError> {
        let output = self
            .client
            .describe_tasks()
            .cluster(handle.cluster())
            .tasks(handle.task_id())
            .send()
            .await
            .map_err(|e| classify(&e))?;

        Ok(convert::snapshot(output.tasks(), output.failures()))
    }

    async fn stop_task(&self, handle: &TaskHandle, reason: &str) -> Result<(), SchedulerError> {
        self.client
            .stop_task()
            .cluster(handle.cluster())
            .task(handle.task_id())
            .reason(convert::stop_reason(reason))
            .send()
            .await
            .map_err(|e| classify(&e))?;

        Ok(())
    }
}
