//! Shared data model for driving hosted agent runs.
//!
//! This crate holds everything the dashboards, the REST client and the test
//! fakes need to agree on: the wire shapes of runs, steps and messages, the
//! tool definitions registered with an agent, the normalized [`AgentResult`]
//! handed to the front ends, and the [`AgentService`] trait that abstracts the
//! remote agent-hosting service.

// Re-export the derive macro
pub use adf_agent_macros::FunctionTool;

// Re-export async trait and serde_json for implementors and generated code
pub use async_trait::async_trait;
pub use serde_json;

mod action;
mod message;
mod result;
mod run;
mod service;
mod step;
mod tools;

pub use action::{ApprovalCall, FunctionCall, RequiredAction, ToolApproval, ToolOutput};
pub use message::{ListSortOrder, MessageContent, MessageRole, MessageText, ThreadMessage};
pub use result::{ActivityTool, AgentResult, ResultMessage, StepRecord, ToolCallRecord};
pub use run::{Run, RunError, RunStatus, TokenUsage};
pub use service::{
    Agent, AgentService, AgentServiceError, AgentServiceResult, CreateAgentRequest,
    CreateRunRequest, Thread,
};
pub use step::{ActivityFunction, RunStep, StepActivity, StepDetails, StepToolCall};
pub use tools::{FunctionDefinition, FunctionTool, McpToolResource, ToolDefinition, ToolResources};
