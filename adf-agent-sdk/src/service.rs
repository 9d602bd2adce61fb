//! Abstraction over the remote agent-hosting service

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::action::{ToolApproval, ToolOutput};
use crate::message::{ListSortOrder, MessageRole, ThreadMessage};
use crate::run::Run;
use crate::step::RunStep;
use crate::tools::{ToolDefinition, ToolResources};

#[derive(Debug, thiserror::Error)]
pub enum AgentServiceError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("credential error: {0}")]
    Credential(String),

    #[error("{0}")]
    Other(String),
}

pub type AgentServiceResult<T> = std::result::Result<T, AgentServiceError>;

/// A registered agent
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Agent {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A conversation thread
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Thread {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateAgentRequest {
    pub model: String,
    pub name: String,
    pub instructions: String,
    pub tools: Vec<ToolDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_resources: Option<ToolResources>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateRunRequest {
    pub assistant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_resources: Option<ToolResources>,
}

/// Operations the session driver needs from the agent-hosting service.
///
/// The production implementation talks REST; tests and the demo mode plug in
/// scripted fakes.
#[async_trait]
pub trait AgentService: Send + Sync {
    async fn create_agent(&self, request: &CreateAgentRequest) -> AgentServiceResult<Agent>;

    async fn delete_agent(&self, agent_id: &str) -> AgentServiceResult<()>;

    async fn create_thread(&self) -> AgentServiceResult<Thread>;

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> AgentServiceResult<ThreadMessage>;

    async fn create_run(&self, thread_id: &str, request: &CreateRunRequest)
        -> AgentServiceResult<Run>;

    async fn get_run(&self, thread_id: &str, run_id: &str) -> AgentServiceResult<Run>;

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> AgentServiceResult<Run>;

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> AgentServiceResult<Run>;

    async fn submit_tool_approvals(
        &self,
        thread_id: &str,
        run_id: &str,
        approvals: &[ToolApproval],
    ) -> AgentServiceResult<Run>;

    async fn list_run_steps(&self, thread_id: &str, run_id: &str)
        -> AgentServiceResult<Vec<RunStep>>;

    async fn list_messages(
        &self,
        thread_id: &str,
        order: ListSortOrder,
    ) -> AgentServiceResult<Vec<ThreadMessage>>;
}
