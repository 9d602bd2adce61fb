//! Drives one question through the hosted agent
//!
//! A [`SessionDriver`] owns no per-query state: every call to
//! [`SessionDriver::run_query`] registers a fresh agent, opens a thread, posts
//! the question, starts a run and then polls it under a [`PollPolicy`] until it
//! leaves the active statuses. While polling it resolves `requires_action`
//! pauses itself:
//!
//! - approval requests: every MCP call is approved with the configured headers;
//!   an approval request with nothing approvable cancels the run
//! - function-call requests: every call must name one of the local ADF tools;
//!   outputs are computed and submitted together, otherwise the run is cancelled
//!
//! The driver never returns an error. Setup failures and remote failures both
//! end up in the returned [`AgentResult`], together with the debug log.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use adf_agent_sdk::{
    Agent, AgentResult, AgentService, CreateAgentRequest, CreateRunRequest, ListSortOrder,
    MessageRole, RequiredAction, Run, RunStatus, RunStep, ThreadMessage, ToolApproval, ToolOutput,
};

use crate::config::{McpSettings, Toolset};
use crate::normalize::{normalize, NO_ASSISTANT_RESPONSE};
use crate::tools::{instructions, tool_definitions, tool_resources, LocalTools, AGENT_NAME};

/// Bounded polling: at most `max_attempts` status checks, `interval` apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            interval: Duration::from_millis(800),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub model: String,
    pub agent_name: String,
    pub toolset: Toolset,
    pub mcp: McpSettings,
    pub poll: PollPolicy,
}

impl DriverOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            agent_name: AGENT_NAME.to_string(),
            toolset: Toolset::default(),
            mcp: McpSettings::default(),
            poll: PollPolicy::default(),
        }
    }
}

/// Debug log collected for the details panel; every line is also traced
#[derive(Debug, Default)]
pub struct RunLog {
    lines: Vec<String>,
}

impl RunLog {
    pub fn info(&mut self, line: impl Into<String>) {
        let line = line.into();
        info!(target: "adf_agent::driver", "{}", line);
        self.lines.push(line);
    }

    pub fn debug(&mut self, line: impl Into<String>) {
        let line = line.into();
        debug!(target: "adf_agent::driver", "{}", line);
        self.lines.push(line);
    }

    pub fn warn(&mut self, line: impl Into<String>) {
        let line = line.into();
        warn!(target: "adf_agent::driver", "{}", line);
        self.lines.push(line);
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// What to do about one `requires_action` pause
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolution {
    Submitted,
    Cancel(String),
}

/// Everything fetched from a run once polling stops
struct Collected {
    run: Run,
    steps: Vec<RunStep>,
    messages: Vec<ThreadMessage>,
}

pub struct SessionDriver {
    service: Arc<dyn AgentService>,
    functions: Option<LocalTools>,
    options: DriverOptions,
}

impl SessionDriver {
    /// Local functions are only offered to the agent with [`Toolset::Functions`]
    pub fn new(service: Arc<dyn AgentService>, tools: LocalTools, options: DriverOptions) -> Self {
        let functions = match options.toolset {
            Toolset::Functions => Some(tools),
            Toolset::CodeInterpreter => None,
        };
        Self {
            service,
            functions,
            options,
        }
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Run one question to completion and return the normalized result
    pub async fn run_query(&self, query: &str) -> AgentResult {
        let mut log = RunLog::default();
        log.info(format!("Processing query: {}", query));

        let tools = tool_definitions(self.options.toolset, &self.options.mcp);
        let request = CreateAgentRequest {
            model: self.options.model.clone(),
            name: self.options.agent_name.clone(),
            instructions: instructions(self.options.toolset).to_string(),
            tools,
            tool_resources: Some(tool_resources(&self.options.mcp)),
        };

        let agent = match self.service.create_agent(&request).await {
            Ok(agent) => agent,
            Err(e) => return failed_result(query, format!("Failed to create agent: {}", e), log),
        };
        log.info(format!("Registered {} tool definitions", request.tools.len()));
        log.info(format!("Agent: {} | MCP: {}", agent.id, self.options.mcp.server_label));

        let mut local_outputs = HashMap::new();
        let outcome = self.drive(&agent, query, &mut local_outputs, &mut log).await;

        if let Err(e) = self.service.delete_agent(&agent.id).await {
            log.warn(format!("Failed to delete agent {}: {}", agent.id, e));
        }

        match outcome {
            Ok(collected) => normalize(
                query,
                &collected.run,
                &collected.steps,
                &collected.messages,
                &local_outputs,
                log.into_lines(),
            ),
            Err(message) => failed_result(query, message, log),
        }
    }

    async fn drive(
        &self,
        agent: &Agent,
        query: &str,
        local_outputs: &mut HashMap<String, String>,
        log: &mut RunLog,
    ) -> Result<Collected, String> {
        let service = &self.service;

        let thread = service
            .create_thread()
            .await
            .map_err(|e| format!("Failed to create thread: {}", e))?;
        log.info(format!("Thread: {}", thread.id));

        service
            .create_message(&thread.id, MessageRole::User, query)
            .await
            .map_err(|e| format!("Failed to post message: {}", e))?;

        let run_request = CreateRunRequest {
            assistant_id: agent.id.clone(),
            tool_resources: Some(tool_resources(&self.options.mcp)),
        };
        let run = service
            .create_run(&thread.id, &run_request)
            .await
            .map_err(|e| format!("Failed to start run: {}", e))?;
        log.info(format!("Run: {}", run.id));

        let run = self.poll(&thread.id, run, local_outputs, log).await;
        if run.status == RunStatus::Failed {
            let detail = run
                .last_error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no error detail".to_string());
            log.warn(format!("Run failed: {}", detail));
        }
        log.info(format!("Final status: {}", run.status));

        let steps = match service.list_run_steps(&thread.id, &run.id).await {
            Ok(steps) => steps,
            Err(e) => {
                log.warn(format!("Failed to list run steps: {}", e));
                Vec::new()
            }
        };
        let messages = match service.list_messages(&thread.id, ListSortOrder::Ascending).await {
            Ok(messages) => messages,
            Err(e) => {
                log.warn(format!("Failed to list messages: {}", e));
                Vec::new()
            }
        };

        Ok(Collected { run, steps, messages })
    }

    async fn poll(
        &self,
        thread_id: &str,
        mut run: Run,
        local_outputs: &mut HashMap<String, String>,
        log: &mut RunLog,
    ) -> Run {
        let policy = self.options.poll;
        let mut attempts = 0;

        while run.status.is_active() && attempts < policy.max_attempts {
            attempts += 1;
            tokio::time::sleep(policy.interval).await;

            let run_id = run.id.clone();
            run = match self.service.get_run(thread_id, &run_id).await {
                Ok(fresh) => fresh,
                Err(e) => {
                    log.warn(format!("Failed to poll run {}: {}", run_id, e));
                    return self.cancel(thread_id, run, log).await;
                }
            };
            log.debug(format!("Status: {} (attempt {}/{})", run.status, attempts, policy.max_attempts));

            if run.status == RunStatus::RequiresAction {
                match self.resolve(thread_id, &run, local_outputs, log).await {
                    Resolution::Submitted => continue,
                    Resolution::Cancel(reason) => {
                        log.warn(reason);
                        return self.cancel(thread_id, run, log).await;
                    }
                }
            }
        }

        if run.status.is_active() {
            log.warn(format!(
                "Max attempts ({}) reached while run is {}; cancelling run",
                policy.max_attempts, run.status
            ));
            return self.cancel(thread_id, run, log).await;
        }

        run
    }

    async fn resolve(
        &self,
        thread_id: &str,
        run: &Run,
        local_outputs: &mut HashMap<String, String>,
        log: &mut RunLog,
    ) -> Resolution {
        let Some(action) = &run.required_action else {
            return Resolution::Cancel("requires_action without a payload; cancelling run".into());
        };

        let kind = match action {
            RequiredAction::ApprovalRequest { .. } => "Approval",
            RequiredAction::FunctionCallRequest { .. } => "Function call",
        };
        log.info(format!("{} action with {} tool_calls", kind, action.call_count()));

        match action {
            RequiredAction::ApprovalRequest { calls } => {
                let mut approvals = Vec::new();
                for call in calls {
                    if call.is_approvable() {
                        approvals.push(ToolApproval::approve(call.id.clone(), self.options.mcp.headers.clone()));
                        log.info(format!("Queued approval for MCP tool_call {}", call.id));
                    } else {
                        log.info(format!(
                            "Non-MCP tool call in approval action func={}",
                            call.name.as_deref().unwrap_or("?")
                        ));
                    }
                }

                if approvals.is_empty() {
                    return Resolution::Cancel("No approvals found; cancelling run to avoid infinite wait".into());
                }

                match self.service.submit_tool_approvals(thread_id, &run.id, &approvals).await {
                    Ok(_) => {
                        log.info(format!("Submitted {} approvals", approvals.len()));
                        Resolution::Submitted
                    }
                    Err(e) => Resolution::Cancel(format!("Failed submitting approvals: {}", e)),
                }
            }
            RequiredAction::FunctionCallRequest { calls } => {
                if calls.is_empty() {
                    return Resolution::Cancel(
                        "No tool outputs produced for required_action; cancelling to avoid stall".into(),
                    );
                }

                // Every call has to be ours before anything runs
                let tools = self.functions.as_ref();
                let mut resolved = Vec::with_capacity(calls.len());
                for call in calls {
                    match tools.and_then(|tools| tools.parse(call)) {
                        Some(function) => resolved.push((call.id.clone(), function)),
                        None => {
                            return Resolution::Cancel(format!(
                                "Unrecognized tool call func={} id={}; cancelling run",
                                call.name.as_deref().unwrap_or("?"),
                                call.id
                            ))
                        }
                    }
                }

                let Some(tools) = tools else {
                    return Resolution::Cancel("No local functions registered".into());
                };

                let mut outputs = Vec::with_capacity(resolved.len());
                for (call_id, function) in resolved {
                    let output = tools.invoke(&function).await;
                    log.info(format!("Prepared output {} for {}", function.name(), call_id));
                    local_outputs.insert(call_id.clone(), output.clone());
                    outputs.push(ToolOutput {
                        tool_call_id: call_id,
                        output,
                    });
                }

                match self.service.submit_tool_outputs(thread_id, &run.id, &outputs).await {
                    Ok(_) => {
                        log.info(format!("Submitted {} tool outputs", outputs.len()));
                        Resolution::Submitted
                    }
                    Err(e) => Resolution::Cancel(format!("Failed submitting tool outputs: {}", e)),
                }
            }
        }
    }

    /// Best-effort cancel, then report the run as it stands afterwards
    async fn cancel(&self, thread_id: &str, run: Run, log: &mut RunLog) -> Run {
        let run_id = run.id.clone();
        match self.service.cancel_run(thread_id, &run_id).await {
            Ok(_) => log.info(format!("Cancelled run {}", run_id)),
            Err(e) => log.warn(format!("Failed to cancel run {}: {}", run_id, e)),
        }

        let mut latest = match self.service.get_run(thread_id, &run_id).await {
            Ok(fresh) => fresh,
            Err(_) => run,
        };
        if !latest.status.is_terminal() {
            latest.status = RunStatus::Cancelled;
        }
        latest
    }
}

fn failed_result(query: &str, message: String, mut log: RunLog) -> AgentResult {
    log.warn(message.clone());
    AgentResult {
        query: query.to_string(),
        summary: NO_ASSISTANT_RESPONSE.to_string(),
        status: RunStatus::Failed,
        error: Some(message),
        messages: Vec::new(),
        steps: Vec::new(),
        token_usage: None,
        log: log.into_lines(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_the_dashboard_cadence() {
        let policy = PollPolicy::default();
        assert_eq!(policy.max_attempts, 50);
        assert_eq!(policy.interval, Duration::from_millis(800));
    }

    #[test]
    fn failed_result_keeps_the_log() {
        let mut log = RunLog::default();
        log.info("Processing query: q");
        let result = failed_result("q", "Failed to create agent: HTTP 401: denied".into(), log);
        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.summary, NO_ASSISTANT_RESPONSE);
        assert_eq!(result.log.len(), 2);
        assert_eq!(result.error.as_deref(), Some("Failed to create agent: HTTP 401: denied"));
    }
}
