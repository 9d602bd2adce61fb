use async_trait::async_trait;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use adf_agent_sdk::{
    ActivityFunction, Agent, AgentService, AgentServiceError, AgentServiceResult, ApprovalCall,
    CreateAgentRequest, CreateRunRequest, FunctionCall, ListSortOrder, MessageRole,
    RequiredAction, Run, RunStatus, RunStep, StepActivity, StepDetails, StepToolCall, Thread,
    ThreadMessage, TokenUsage, ToolApproval, ToolOutput,
};

use super::DEMO_RUN_ID;

const DOCS_TOOL: &str = "microsoft_docs_search";

/// Where a scripted run is; advanced by polling and submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Queued,
    InProgress,
    NeedsApproval,
    Approved,
    NeedsOutputs,
    OutputsSubmitted,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone)]
struct Script {
    calls: Vec<(&'static str, String)>,
    summary: &'static str,
}

impl Script {
    /// Keyword-based plan, so the demo answers differently to different questions
    fn for_query(query: &str) -> Self {
        let q = query.to_lowercase();
        let runs = |name: &str| ("adf_pipeline_runs", json!({ "pipelinename": name }).to_string());
        let activities = |id: &str| ("adf_pipeline_activity_runs", json!({ "pipeline_run_id": id }).to_string());

        if q.contains("failed") || q.contains("error") {
            Script {
                calls: vec![runs("CustomerETL-Failed"), activities("failed-run-123")],
                summary: "Analysis shows pipeline failure in CustomerETL. The TransformData activity failed due to schema mismatch. Error code 2200 indicates data transformation issues.",
            }
        } else if q.contains("status") || q.contains("running") {
            Script {
                calls: vec![runs("CustomerETL"), activities(DEMO_RUN_ID)],
                summary: "Pipeline CustomerETL completed successfully. All activities executed without errors.",
            }
        } else {
            Script {
                calls: vec![runs("GeneralPipeline")],
                summary: "Here's the information about your Azure Data Factory pipelines. You can ask about specific pipeline status, failures, or activity details.",
            }
        }
    }
}

#[derive(Debug)]
struct DemoRun {
    id: String,
    phase: Phase,
    script: Script,
}

#[derive(Debug, Default)]
struct DemoThread {
    messages: Vec<ThreadMessage>,
    run: Option<DemoRun>,
}

#[derive(Debug, Default)]
struct DemoState {
    next_id: u64,
    threads: HashMap<String, DemoThread>,
}

impl DemoState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}_demo_{}", prefix, self.next_id)
    }

    fn thread(&mut self, thread_id: &str) -> AgentServiceResult<&mut DemoThread> {
        self.threads
            .get_mut(thread_id)
            .ok_or_else(|| not_found("thread", thread_id))
    }

    fn run(&mut self, thread_id: &str, run_id: &str) -> AgentServiceResult<&mut DemoThread> {
        let thread = self.thread(thread_id)?;
        match &thread.run {
            Some(run) if run.id == run_id => Ok(thread),
            _ => Err(not_found("run", run_id)),
        }
    }
}

fn not_found(kind: &str, id: &str) -> AgentServiceError {
    AgentServiceError::Http {
        status: 404,
        body: format!("{} {} not found", kind, id),
    }
}

/// Offline stand-in for the agent service.
///
/// Each run walks through the same pauses a real one does: an approval request
/// for a documentation lookup, then a function-call request for the ADF tools
/// picked from the question's keywords, then a canned answer.
#[derive(Debug, Default)]
pub struct DemoAgentService {
    state: Mutex<DemoState>,
}

impl DemoAgentService {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> AgentServiceResult<MutexGuard<'_, DemoState>> {
        self.state
            .lock()
            .map_err(|_| AgentServiceError::Other("demo state poisoned".into()))
    }
}

fn snapshot(thread_id: &str, run: &DemoRun) -> Run {
    let status = match run.phase {
        Phase::Queued => RunStatus::Queued,
        Phase::InProgress | Phase::Approved | Phase::OutputsSubmitted => RunStatus::InProgress,
        Phase::NeedsApproval | Phase::NeedsOutputs => RunStatus::RequiresAction,
        Phase::Completed => RunStatus::Completed,
        Phase::Cancelled => RunStatus::Cancelled,
    };

    let mut snapshot = Run::new(run.id.clone(), status);
    snapshot.thread_id = Some(thread_id.to_string());

    match run.phase {
        Phase::NeedsApproval => snapshot.with_required_action(RequiredAction::ApprovalRequest {
            calls: vec![ApprovalCall {
                id: format!("{}_mcp", run.id),
                kind: "mcp".into(),
                name: Some(DOCS_TOOL.into()),
                arguments: Some(json!({ "query": "Azure Data Factory queryPipelineRuns" }).to_string()),
                server_label: Some("MicrosoftLearn".into()),
            }],
        }),
        Phase::NeedsOutputs => snapshot.with_required_action(RequiredAction::FunctionCallRequest {
            calls: run
                .script
                .calls
                .iter()
                .enumerate()
                .map(|(i, (name, arguments))| FunctionCall {
                    id: format!("{}_call_{}", run.id, i + 1),
                    name: Some(name.to_string()),
                    arguments: Some(arguments.clone()),
                })
                .collect(),
        }),
        Phase::Completed => snapshot.with_usage(TokenUsage {
            prompt_tokens: Some(150),
            completion_tokens: Some(200),
            total_tokens: Some(350),
        }),
        _ => snapshot,
    }
}

fn steps_for(run: &DemoRun) -> Vec<RunStep> {
    let reached = |phase: Phase| run.phase as u8 >= phase as u8 && run.phase != Phase::Cancelled;
    let mut steps = Vec::new();

    if reached(Phase::NeedsApproval) {
        let mut tools = BTreeMap::new();
        tools.insert(
            DOCS_TOOL.to_string(),
            ActivityFunction {
                description: Some("Search official Microsoft documentation".into()),
                parameters: Some(json!({"type": "object", "properties": {"query": {"type": "string"}}})),
            },
        );
        steps.push(RunStep {
            id: format!("{}_step_1", run.id),
            status: Some("completed".into()),
            step_details: StepDetails::Activities {
                activities: vec![StepActivity {
                    kind: Some("mcp_list_tools".into()),
                    server_label: Some("MicrosoftLearn".into()),
                    tools,
                }],
            },
        });
    }

    if reached(Phase::Approved) {
        steps.push(RunStep {
            id: format!("{}_step_2", run.id),
            status: Some("completed".into()),
            step_details: StepDetails::ToolCalls {
                tool_calls: vec![StepToolCall {
                    id: Some(format!("{}_mcp", run.id)),
                    kind: Some("mcp".into()),
                    name: Some(DOCS_TOOL.into()),
                    arguments: Some(json!({ "query": "Azure Data Factory queryPipelineRuns" })),
                    output: Some(json!("Pipeline Runs - Query By Factory: POST .../queryPipelineRuns?api-version=2018-06-01")),
                    server_label: Some("MicrosoftLearn".into()),
                    ..Default::default()
                }],
            },
        });
    }

    if reached(Phase::OutputsSubmitted) {
        // Outputs are left empty; the driver fills them from what it submitted
        let tool_calls = run
            .script
            .calls
            .iter()
            .enumerate()
            .map(|(i, (name, arguments))| StepToolCall {
                id: Some(format!("{}_call_{}", run.id, i + 1)),
                kind: Some("function".into()),
                name: Some(name.to_string()),
                arguments: Some(json!(arguments)),
                ..Default::default()
            })
            .collect();
        steps.push(RunStep {
            id: format!("{}_step_3", run.id),
            status: Some("completed".into()),
            step_details: StepDetails::ToolCalls { tool_calls },
        });
    }

    if reached(Phase::Completed) {
        steps.push(RunStep {
            id: format!("{}_step_4", run.id),
            status: Some("completed".into()),
            step_details: StepDetails::MessageCreation { message_creation: None },
        });
    }

    steps
}

#[async_trait]
impl AgentService for DemoAgentService {
    async fn create_agent(&self, request: &CreateAgentRequest) -> AgentServiceResult<Agent> {
        let mut state = self.state()?;
        Ok(Agent {
            id: state.next_id("asst"),
            name: Some(request.name.clone()),
        })
    }

    async fn delete_agent(&self, _agent_id: &str) -> AgentServiceResult<()> {
        Ok(())
    }

    async fn create_thread(&self) -> AgentServiceResult<Thread> {
        let mut state = self.state()?;
        let id = state.next_id("thread");
        state.threads.insert(id.clone(), DemoThread::default());
        Ok(Thread { id })
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> AgentServiceResult<ThreadMessage> {
        let mut state = self.state()?;
        let id = state.next_id("msg");
        let message = ThreadMessage::text(id, role, content);
        state.thread(thread_id)?.messages.push(message.clone());
        Ok(message)
    }

    async fn create_run(&self, thread_id: &str, _request: &CreateRunRequest) -> AgentServiceResult<Run> {
        let mut state = self.state()?;
        let id = state.next_id("run");
        let thread = state.thread(thread_id)?;
        let query = thread
            .messages
            .iter()
            .rev()
            .find(|m| !m.is_assistant())
            .and_then(|m| m.last_text())
            .unwrap_or_default()
            .to_string();
        let run = DemoRun {
            id,
            phase: Phase::Queued,
            script: Script::for_query(&query),
        };
        let snapshot = snapshot(thread_id, &run);
        thread.run = Some(run);
        Ok(snapshot)
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> AgentServiceResult<Run> {
        let mut state = self.state()?;
        let thread = state.run(thread_id, run_id)?;
        let Some(run) = thread.run.as_mut() else {
            return Err(not_found("run", run_id));
        };

        run.phase = match run.phase {
            Phase::Queued => Phase::InProgress,
            Phase::InProgress => Phase::NeedsApproval,
            Phase::Approved => Phase::NeedsOutputs,
            Phase::OutputsSubmitted => Phase::Completed,
            other => other,
        };

        if run.phase == Phase::Completed && !thread.messages.iter().any(|m| m.is_assistant()) {
            let id = format!("{}_answer", run.id);
            thread
                .messages
                .push(ThreadMessage::text(id, MessageRole::Assistant, run.script.summary));
        }

        Ok(snapshot(thread_id, run))
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> AgentServiceResult<Run> {
        let mut state = self.state()?;
        let thread = state.run(thread_id, run_id)?;
        let Some(run) = thread.run.as_mut() else {
            return Err(not_found("run", run_id));
        };
        if run.phase != Phase::Completed {
            run.phase = Phase::Cancelled;
        }
        Ok(snapshot(thread_id, run))
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> AgentServiceResult<Run> {
        let mut state = self.state()?;
        let thread = state.run(thread_id, run_id)?;
        let Some(run) = thread.run.as_mut() else {
            return Err(not_found("run", run_id));
        };
        if run.phase != Phase::NeedsOutputs || outputs.len() != run.script.calls.len() {
            return Err(AgentServiceError::Http {
                status: 400,
                body: "run is not waiting for these tool outputs".into(),
            });
        }
        run.phase = Phase::OutputsSubmitted;
        Ok(snapshot(thread_id, run))
    }

    async fn submit_tool_approvals(
        &self,
        thread_id: &str,
        run_id: &str,
        approvals: &[ToolApproval],
    ) -> AgentServiceResult<Run> {
        let mut state = self.state()?;
        let thread = state.run(thread_id, run_id)?;
        let Some(run) = thread.run.as_mut() else {
            return Err(not_found("run", run_id));
        };
        if run.phase != Phase::NeedsApproval || approvals.is_empty() {
            return Err(AgentServiceError::Http {
                status: 400,
                body: "run is not waiting for approvals".into(),
            });
        }
        run.phase = Phase::Approved;
        Ok(snapshot(thread_id, run))
    }

    async fn list_run_steps(&self, thread_id: &str, run_id: &str) -> AgentServiceResult<Vec<RunStep>> {
        let mut state = self.state()?;
        let thread = state.run(thread_id, run_id)?;
        Ok(thread.run.as_ref().map(steps_for).unwrap_or_default())
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        order: ListSortOrder,
    ) -> AgentServiceResult<Vec<ThreadMessage>> {
        let mut state = self.state()?;
        let mut messages = state.thread(thread_id)?.messages.clone();
        if order == ListSortOrder::Descending {
            messages.reverse();
        }
        Ok(messages)
    }
}
