//! Scripted agent service and status source for driver tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use adf_agent::adf::PipelineStatusSource;
use adf_agent::config::Toolset;
use adf_agent::driver::{DriverOptions, PollPolicy, SessionDriver};
use adf_agent::tools::LocalTools;
use adf_agent_sdk::{
    async_trait, Agent, AgentService, AgentServiceError, AgentServiceResult, CreateAgentRequest,
    CreateRunRequest, ListSortOrder, MessageRole, Run, RunStatus, RunStep, Thread, ThreadMessage,
    ToolApproval, ToolOutput,
};
use serde_json::Value;

pub const THREAD_ID: &str = "thread_1";
pub const RUN_ID: &str = "run_1";

/// What the driver did to the service
#[derive(Debug, Default)]
pub struct Calls {
    pub created_agents: Vec<CreateAgentRequest>,
    pub deleted_agents: Vec<String>,
    pub get_run: usize,
    pub approvals: Vec<ToolApproval>,
    pub outputs: Vec<ToolOutput>,
    pub cancelled: bool,
}

/// Replays a fixed sequence of run snapshots; the last one repeats
#[derive(Default)]
pub struct ScriptedService {
    pub polls: Mutex<VecDeque<Run>>,
    pub last: Mutex<Option<Run>>,
    pub steps: Vec<RunStep>,
    pub messages: Vec<ThreadMessage>,
    pub fail_create_agent: bool,
    pub fail_submit: bool,
    pub fail_cancel: bool,
    /// `get_run` errors once it has been called more than this many times
    pub fail_get_run_after: Option<usize>,
    pub calls: Mutex<Calls>,
}

impl ScriptedService {
    /// `polls` are raw run payloads as the service would return them
    pub fn new(polls: Vec<Value>) -> Self {
        let polls = polls
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect();
        Self {
            polls: Mutex::new(polls),
            ..Default::default()
        }
    }

    pub fn with_steps(mut self, steps: Vec<Value>) -> Self {
        self.steps = steps.into_iter().map(|v| serde_json::from_value(v).unwrap()).collect();
        self
    }

    pub fn with_messages(mut self, messages: Vec<Value>) -> Self {
        self.messages = messages.into_iter().map(|v| serde_json::from_value(v).unwrap()).collect();
        self
    }

    pub fn calls(&self) -> std::sync::MutexGuard<'_, Calls> {
        self.calls.lock().unwrap()
    }
}

#[async_trait]
impl AgentService for ScriptedService {
    async fn create_agent(&self, request: &CreateAgentRequest) -> AgentServiceResult<Agent> {
        if self.fail_create_agent {
            return Err(AgentServiceError::Http {
                status: 401,
                body: "unauthorized".into(),
            });
        }
        self.calls().created_agents.push(request.clone());
        Ok(Agent {
            id: "asst_1".into(),
            name: Some(request.name.clone()),
        })
    }

    async fn delete_agent(&self, agent_id: &str) -> AgentServiceResult<()> {
        self.calls().deleted_agents.push(agent_id.to_string());
        Ok(())
    }

    async fn create_thread(&self) -> AgentServiceResult<Thread> {
        Ok(Thread { id: THREAD_ID.into() })
    }

    async fn create_message(
        &self,
        _thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> AgentServiceResult<ThreadMessage> {
        Ok(ThreadMessage::text("msg_user", role, content))
    }

    async fn create_run(&self, _thread_id: &str, _request: &CreateRunRequest) -> AgentServiceResult<Run> {
        Ok(Run::new(RUN_ID, RunStatus::Queued))
    }

    async fn get_run(&self, _thread_id: &str, _run_id: &str) -> AgentServiceResult<Run> {
        let (count, cancelled) = {
            let mut calls = self.calls();
            calls.get_run += 1;
            (calls.get_run, calls.cancelled)
        };
        if self.fail_get_run_after.is_some_and(|limit| count > limit) {
            return Err(AgentServiceError::Transport("connection reset".into()));
        }
        if cancelled {
            return Ok(Run::new(RUN_ID, RunStatus::Cancelled));
        }

        let next = self.polls.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(run) = next {
            *last = Some(run);
        }
        last.clone()
            .ok_or_else(|| AgentServiceError::Other("no scripted run".into()))
    }

    async fn cancel_run(&self, _thread_id: &str, _run_id: &str) -> AgentServiceResult<Run> {
        if self.fail_cancel {
            return Err(AgentServiceError::Http {
                status: 409,
                body: "run is not cancellable".into(),
            });
        }
        self.calls().cancelled = true;
        Ok(Run::new(RUN_ID, RunStatus::Cancelling))
    }

    async fn submit_tool_outputs(
        &self,
        _thread_id: &str,
        _run_id: &str,
        outputs: &[ToolOutput],
    ) -> AgentServiceResult<Run> {
        if self.fail_submit {
            return Err(AgentServiceError::Transport("connection reset".into()));
        }
        self.calls().outputs.extend_from_slice(outputs);
        Ok(Run::new(RUN_ID, RunStatus::InProgress))
    }

    async fn submit_tool_approvals(
        &self,
        _thread_id: &str,
        _run_id: &str,
        approvals: &[ToolApproval],
    ) -> AgentServiceResult<Run> {
        if self.fail_submit {
            return Err(AgentServiceError::Transport("connection reset".into()));
        }
        self.calls().approvals.extend_from_slice(approvals);
        Ok(Run::new(RUN_ID, RunStatus::InProgress))
    }

    async fn list_run_steps(&self, _thread_id: &str, _run_id: &str) -> AgentServiceResult<Vec<RunStep>> {
        Ok(self.steps.clone())
    }

    async fn list_messages(
        &self,
        _thread_id: &str,
        _order: ListSortOrder,
    ) -> AgentServiceResult<Vec<ThreadMessage>> {
        Ok(self.messages.clone())
    }
}

/// Status source that records what it was asked for
#[derive(Default)]
pub struct FakeStatus {
    pub pipeline_reply: String,
    pub activity_reply: String,
    pub requests: Mutex<Vec<String>>,
}

impl FakeStatus {
    pub fn replying(pipeline_reply: &str) -> Self {
        Self {
            pipeline_reply: pipeline_reply.to_string(),
            activity_reply: "[]".to_string(),
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PipelineStatusSource for FakeStatus {
    async fn latest_pipeline_run(&self, pipeline_name: &str) -> String {
        self.requests.lock().unwrap().push(format!("runs:{}", pipeline_name));
        self.pipeline_reply.clone()
    }

    async fn activity_runs(&self, pipeline_run_id: &str) -> String {
        self.requests.lock().unwrap().push(format!("activities:{}", pipeline_run_id));
        self.activity_reply.clone()
    }
}

pub fn fast_policy(max_attempts: u32) -> PollPolicy {
    PollPolicy {
        max_attempts,
        interval: Duration::from_millis(10),
    }
}

pub fn driver(service: Arc<ScriptedService>, status: Arc<FakeStatus>, toolset: Toolset) -> SessionDriver {
    let mut options = DriverOptions::new("gpt-4o");
    options.toolset = toolset;
    options.poll = fast_policy(10);
    SessionDriver::new(service, LocalTools::new(status, "processELT"), options)
}
