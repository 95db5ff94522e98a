//! Scripted in-memory [`TaskScheduler`] for orchestrator tests.
//!
//! Each describe call pops the next scripted response; once the script
//! is exhausted the fallback response is returned forever.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use migrun_core::request::{IdempotencyToken, LifecycleAction, MigrationRequest, NetworkPlacement};
use migrun_core::scheduler::{RemoteTaskState, SchedulerError, TaskHandle, TaskScheduler, TaskSnapshot};

pub const TASK_ARN: &str = "arn:aws:ecs:eu-west-1:123456789012:task/app-cluster/0f1e2d3c";

type Describe = Result<TaskSnapshot, SchedulerError>;

pub struct ScriptedScheduler {
    launch: Result<TaskHandle, SchedulerError>,
    script: Mutex<VecDeque<Describe>>,
    fallback: Describe,
    stop: Result<(), SchedulerError>,
    pub launch_calls: AtomicU32,
    pub describe_calls: AtomicU32,
    pub stop_calls: AtomicU32,
    pub stop_reasons: Mutex<Vec<String>>,
}

impl ScriptedScheduler {
    /// A scheduler whose launch succeeds and whose task runs forever
    /// unless more responses are scripted.
    pub fn launching() -> Self {
        Self {
            launch: Ok(TaskHandle::new("app-cluster", TASK_ARN)),
            script: Mutex::new(VecDeque::new()),
            fallback: Ok(running()),
            stop: Ok(()),
            launch_calls: AtomicU32::new(0),
            describe_calls: AtomicU32::new(0),
            stop_calls: AtomicU32::new(0),
            stop_reasons: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_launch(message: &str) -> Self {
        Self {
            launch: Err(SchedulerError::Launch(message.to_string())),
            ..Self::launching()
        }
    }

    pub fn then(self, response: Describe) -> Self {
        self.script.lock().unwrap().push_back(response);
        self
    }

    pub fn otherwise(mut self, response: Describe) -> Self {
        self.fallback = response;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.stop = Err(SchedulerError::Fatal("AccessDeniedException".into()));
        self
    }

    pub fn launches(&self) -> u32 {
        self.launch_calls.load(Ordering::SeqCst)
    }

    pub fn describes(&self) -> u32 {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> u32 {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskScheduler for ScriptedScheduler {
    async fn launch_task(&self, _request: &MigrationRequest) -> Result<TaskHandle, SchedulerError> {
        self.launch_calls.fetch_add(1, Ordering::SeqCst);
        self.launch.clone()
    }

    async fn describe_task(&self, _handle: &TaskHandle) -> Result<TaskSnapshot, SchedulerError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }

    async fn stop_task(&self, _handle: &TaskHandle, reason: &str) -> Result<(), SchedulerError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.stop_reasons.lock().unwrap().push(reason.to_string());
        self.stop.clone()
    }
}

// ---------------------------------------------------------------------------
// Snapshot helpers
// ---------------------------------------------------------------------------

pub fn status(last_status: &str) -> TaskSnapshot {
    TaskSnapshot::Found(RemoteTaskState {
        last_status: last_status.to_string(),
        ..Default::default()
    })
}

pub fn pending() -> TaskSnapshot {
    status("PENDING")
}

pub fn running() -> TaskSnapshot {
    status("RUNNING")
}

pub fn exited(exit_code: i32) -> TaskSnapshot {
    TaskSnapshot::Found(RemoteTaskState {
        last_status: "STOPPED".into(),
        stop_code: Some("EssentialContainerExited".into()),
        stopped_reason: Some("Essential container in task exited".into()),
        exit_code: Some(exit_code),
        container_reason: None,
    })
}

pub fn stopped(stop_code: &str, reason: &str) -> TaskSnapshot {
    TaskSnapshot::Found(RemoteTaskState {
        last_status: "STOPPED".into(),
        stop_code: Some(stop_code.to_string()),
        stopped_reason: Some(reason.to_string()),
        ..Default::default()
    })
}

pub fn vanished() -> TaskSnapshot {
    TaskSnapshot::Vanished {
        reason: Some("MISSING".into()),
    }
}

pub fn transient(message: &str) -> Result<TaskSnapshot, SchedulerError> {
    Err(SchedulerError::Transient(message.to_string()))
}

pub fn request(action: LifecycleAction) -> MigrationRequest {
    let placement = NetworkPlacement::new(["subnet-0a1b", "subnet-2c3d"]).unwrap();
    MigrationRequest::new(
        "app-cluster",
        "arn:aws:ecs:eu-west-1:123456789012:task-definition/liquibase:7",
        placement,
        action,
        IdempotencyToken::new("c5f0e4a2-request"),
    )
    .unwrap()
}
