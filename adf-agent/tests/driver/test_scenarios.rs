//! End-to-end driver scenarios

use std::sync::Arc;

use adf_agent::adf::NO_RUNS_FOUND;
use adf_agent::config::Toolset;
use adf_agent::normalize::NO_ASSISTANT_RESPONSE;
use adf_agent_sdk::{RunStatus, ToolDefinition};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use super::common::*;

fn function_call_action(calls: Value) -> Value {
    json!({
        "id": RUN_ID,
        "status": "requires_action",
        "required_action": {
            "type": "submit_tool_outputs",
            "submit_tool_outputs": { "tool_calls": calls }
        }
    })
}

fn assistant(text: &str) -> Value {
    json!({
        "id": "msg_2",
        "role": "assistant",
        "content": [{"type": "text", "text": {"value": text, "annotations": []}}]
    })
}

// ============================================================================
// Completion
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_process_elt_status_completes() {
    let service = Arc::new(
        ScriptedService::new(vec![
            json!({"id": RUN_ID, "status": "in_progress"}),
            json!({
                "id": RUN_ID,
                "status": "completed",
                "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
            }),
        ])
        .with_messages(vec![
            json!({"id": "msg_1", "role": "user", "content": [{"type": "text", "text": {"value": "processELT"}}]}),
            assistant("Status: Succeeded"),
        ]),
    );
    let status = Arc::new(FakeStatus::replying("{}"));
    let driver = driver(service.clone(), status, Toolset::Functions);

    let result = driver.run_query("processELT").await;

    assert_eq!(result.summary, "Status: Succeeded");
    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.error, None);
    assert_eq!(result.messages.len(), 2);
    assert_eq!(result.token_usage.as_ref().and_then(|u| u.total_tokens), Some(15));
    assert!(result.log.iter().any(|l| l == "Processing query: processELT"));

    let calls = service.calls();
    assert_eq!(calls.get_run, 2);
    assert!(!calls.cancelled);
    assert_eq!(calls.deleted_agents, vec!["asst_1".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_agent_registration_carries_mcp_and_functions() {
    let service = Arc::new(ScriptedService::new(vec![json!({"id": RUN_ID, "status": "completed"})]));
    let driver = driver(service.clone(), Arc::new(FakeStatus::default()), Toolset::Functions);

    let result = driver.run_query("anything").await;
    assert_eq!(result.summary, NO_ASSISTANT_RESPONSE);

    let calls = service.calls();
    let request = &calls.created_agents[0];
    assert_eq!(request.name, "adf-mcp-agent");
    let labels: Vec<&str> = request.tools.iter().map(ToolDefinition::label).collect();
    assert_eq!(
        labels,
        vec!["MicrosoftLearn", "adf_pipeline_runs", "adf_pipeline_activity_runs"]
    );
}

// ============================================================================
// Local function outputs
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_no_runs_found_is_the_step_output() {
    let service = Arc::new(
        ScriptedService::new(vec![
            function_call_action(json!([{
                "id": "call_1",
                "type": "function",
                "function": {"name": "adf_pipeline_runs", "arguments": "{\"pipelinename\": \"processELT\"}"}
            }])),
            json!({"id": RUN_ID, "status": "completed"}),
        ])
        .with_steps(vec![json!({
            "id": "step_1",
            "status": "completed",
            "step_details": {
                "type": "tool_calls",
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "adf_pipeline_runs", "arguments": "{}", "output": null}
                }]
            }
        })]),
    );
    let status = Arc::new(FakeStatus::replying(NO_RUNS_FOUND));
    let driver = driver(service.clone(), status, Toolset::Functions);

    let result = driver.run_query("processELT").await;

    assert_eq!(result.status, RunStatus::Completed);
    let call = &result.steps[0].tool_calls[0];
    assert_eq!(call.output, Some(json!("No runs found for pipeline.")));
    assert_eq!(result.steps[0].outputs, vec![NO_RUNS_FOUND.to_string()]);

    let calls = service.calls();
    assert_eq!(calls.outputs.len(), 1);
    assert_eq!(calls.outputs[0].tool_call_id, "call_1");
    assert_eq!(calls.outputs[0].output, NO_RUNS_FOUND);
}

#[tokio::test(start_paused = true)]
async fn test_missing_arguments_default_to_process_elt() {
    let service = Arc::new(ScriptedService::new(vec![
        function_call_action(json!([
            {"id": "call_1", "type": "function", "function": {"name": "adf_pipeline_runs"}},
            {"id": "call_2", "type": "function", "function": {"name": "adf_pipeline_runs", "arguments": "{}"}}
        ])),
        json!({"id": RUN_ID, "status": "completed"}),
    ]));
    let status = Arc::new(FakeStatus::replying("{}"));
    let driver = driver(service.clone(), status.clone(), Toolset::Functions);

    driver.run_query("how is my pipeline doing?").await;

    assert_eq!(
        status.requests(),
        vec!["runs:processELT".to_string(), "runs:processELT".to_string()]
    );
    assert_eq!(service.calls().outputs.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_activity_runs_use_the_requested_run_id() {
    let service = Arc::new(ScriptedService::new(vec![
        function_call_action(json!([{
            "id": "call_1",
            "type": "function",
            "function": {"name": "adf_pipeline_activity_runs", "arguments": "{\"pipeline_run_id\": \"run-42\"}"}
        }])),
        json!({"id": RUN_ID, "status": "completed"}),
    ]));
    let status = Arc::new(FakeStatus::replying("{}"));
    let driver = driver(service.clone(), status.clone(), Toolset::Functions);

    driver.run_query("activities for run-42").await;

    assert_eq!(status.requests(), vec!["activities:run-42".to_string()]);
    assert_eq!(service.calls().outputs[0].output, "[]");
}

// ============================================================================
// Setup failures
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_agent_creation_failure_is_a_failed_result() {
    let service = Arc::new(ScriptedService {
        fail_create_agent: true,
        ..ScriptedService::new(vec![])
    });
    let driver = driver(service.clone(), Arc::new(FakeStatus::default()), Toolset::Functions);

    let result = driver.run_query("processELT").await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.summary, NO_ASSISTANT_RESPONSE);
    let error = result.error.unwrap();
    assert!(error.starts_with("Failed to create agent"));
    assert!(error.contains("401"));
    assert!(service.calls().deleted_agents.is_empty());
}
