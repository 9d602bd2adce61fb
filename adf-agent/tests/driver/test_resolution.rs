//! Approval and function-call pauses, and every path that cancels a run

use std::sync::Arc;

use adf_agent::config::Toolset;
use adf_agent::driver::{DriverOptions, SessionDriver};
use adf_agent::tools::LocalTools;
use adf_agent_sdk::RunStatus;
use serde_json::{json, Value};

use super::common::*;

fn approval_action(calls: Value) -> Value {
    json!({
        "id": RUN_ID,
        "status": "requires_action",
        "required_action": {
            "type": "submit_tool_approval",
            "submit_tool_approval": { "tool_calls": calls }
        }
    })
}

fn mcp_call(id: &str) -> Value {
    json!({
        "id": id,
        "type": "mcp",
        "name": "microsoft_docs_search",
        "arguments": "{\"query\": \"queryPipelineRuns\"}",
        "server_label": "MicrosoftLearn"
    })
}

fn function_action(name: &str) -> Value {
    json!({
        "id": RUN_ID,
        "status": "requires_action",
        "required_action": {
            "type": "submit_tool_outputs",
            "submit_tool_outputs": {
                "tool_calls": [{"id": "call_1", "type": "function", "function": {"name": name, "arguments": "{}"}}]
            }
        }
    })
}

// ============================================================================
// Approvals
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_mcp_calls_are_approved_with_configured_headers() {
    let service = Arc::new(ScriptedService::new(vec![
        approval_action(json!([mcp_call("mcp_1"), mcp_call("mcp_2")])),
        json!({"id": RUN_ID, "status": "completed"}),
    ]));
    let mut options = DriverOptions::new("gpt-4o");
    options.poll = fast_policy(10);
    options
        .mcp
        .headers
        .insert("x-ms-client".to_string(), "adf-agent".to_string());
    let driver = SessionDriver::new(
        service.clone(),
        LocalTools::new(Arc::new(FakeStatus::default()), "processELT"),
        options,
    );

    let result = driver.run_query("docs please").await;

    assert_eq!(result.status, RunStatus::Completed);
    assert!(result.log.iter().any(|l| l == "Approval action with 2 tool_calls"));
    let calls = service.calls();
    let ids: Vec<&str> = calls.approvals.iter().map(|a| a.tool_call_id.as_str()).collect();
    assert_eq!(ids, vec!["mcp_1", "mcp_2"]);
    assert!(calls.approvals.iter().all(|a| a.approve));
    assert_eq!(calls.approvals[0].headers["x-ms-client"], "adf-agent");
}

#[tokio::test(start_paused = true)]
async fn test_approval_without_mcp_calls_cancels() {
    let service = Arc::new(ScriptedService::new(vec![approval_action(json!([{
        "id": "fn_1",
        "type": "function",
        "name": "adf_pipeline_runs"
    }]))]));
    let driver = driver(service.clone(), Arc::new(FakeStatus::default()), Toolset::Functions);

    let result = driver.run_query("processELT").await;

    assert_eq!(result.status, RunStatus::Cancelled);
    let calls = service.calls();
    assert!(calls.cancelled);
    assert!(calls.approvals.is_empty());
    assert!(result
        .log
        .iter()
        .any(|l| l.contains("No approvals found")));
}

#[tokio::test(start_paused = true)]
async fn test_null_approval_list_cancels_instead_of_failing_to_decode() {
    let service = Arc::new(ScriptedService::new(vec![approval_action(Value::Null)]));
    let driver = driver(service.clone(), Arc::new(FakeStatus::default()), Toolset::Functions);

    let result = driver.run_query("processELT").await;

    assert_eq!(result.status, RunStatus::Cancelled);
    assert!(service.calls().cancelled);
    assert!(result.log.iter().any(|l| l.contains("No approvals found")));
}

// ============================================================================
// Function calls
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_unrecognized_function_cancels_without_running_anything() {
    let service = Arc::new(ScriptedService::new(vec![json!({
        "id": RUN_ID,
        "status": "requires_action",
        "required_action": {
            "type": "submit_tool_outputs",
            "submit_tool_outputs": {
                "tool_calls": [
                    {"id": "call_1", "type": "function", "function": {"name": "adf_pipeline_runs", "arguments": "{}"}},
                    {"id": "call_2", "type": "function", "function": {"name": "delete_factory", "arguments": "{}"}}
                ]
            }
        }
    })]));
    let status = Arc::new(FakeStatus::default());
    let driver = driver(service.clone(), status.clone(), Toolset::Functions);

    let result = driver.run_query("processELT").await;

    assert!(result.status.is_terminal());
    assert_eq!(result.status, RunStatus::Cancelled);
    assert!(status.requests().is_empty());
    assert!(service.calls().outputs.is_empty());
    assert!(result
        .log
        .iter()
        .any(|l| l.contains("Unrecognized tool call func=delete_factory")));
}

#[tokio::test(start_paused = true)]
async fn test_code_interpreter_toolset_has_no_local_functions() {
    let service = Arc::new(ScriptedService::new(vec![function_action("adf_pipeline_runs")]));
    let status = Arc::new(FakeStatus::default());
    let driver = driver(service.clone(), status.clone(), Toolset::CodeInterpreter);

    let result = driver.run_query("processELT").await;

    assert_eq!(result.status, RunStatus::Cancelled);
    assert!(status.requests().is_empty());
    let labels: Vec<String> = service.calls().created_agents[0]
        .tools
        .iter()
        .map(|t| t.label().to_string())
        .collect();
    assert_eq!(labels, vec!["MicrosoftLearn".to_string(), "code_interpreter".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_submission_failure_cancels() {
    let service = Arc::new(ScriptedService {
        fail_submit: true,
        ..ScriptedService::new(vec![function_action("adf_pipeline_runs")])
    });
    let driver = driver(service.clone(), Arc::new(FakeStatus::default()), Toolset::Functions);

    let result = driver.run_query("processELT").await;

    assert_eq!(result.status, RunStatus::Cancelled);
    assert!(service.calls().cancelled);
    assert!(result
        .log
        .iter()
        .any(|l| l.starts_with("Failed submitting tool outputs")));
}

#[tokio::test(start_paused = true)]
async fn test_requires_action_without_payload_cancels() {
    let service = Arc::new(ScriptedService::new(vec![json!({"id": RUN_ID, "status": "requires_action"})]));
    let driver = driver(service.clone(), Arc::new(FakeStatus::default()), Toolset::Functions);

    let result = driver.run_query("processELT").await;

    assert_eq!(result.status, RunStatus::Cancelled);
    assert!(service.calls().cancelled);
}

// ============================================================================
// Attempt ceiling
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_ceiling_stops_a_run_that_never_finishes() {
    let service = Arc::new(ScriptedService::new(vec![json!({"id": RUN_ID, "status": "in_progress"})]));
    let driver = driver(service.clone(), Arc::new(FakeStatus::default()), Toolset::Functions);

    let result = driver.run_query("processELT").await;

    assert_eq!(result.status, RunStatus::Cancelled);
    let calls = service.calls();
    assert!(calls.cancelled);
    // 10 polls plus the refresh after cancelling
    assert_eq!(calls.get_run, 11);
    assert!(result.log.iter().any(|l| l.starts_with("Max attempts (10) reached")));
}

#[tokio::test(start_paused = true)]
async fn test_ceiling_holds_for_endless_approval_requests() {
    let service = Arc::new(ScriptedService::new(vec![approval_action(json!([mcp_call("mcp_1")]))]));
    let driver = driver(service.clone(), Arc::new(FakeStatus::default()), Toolset::Functions);

    let result = driver.run_query("processELT").await;

    assert_eq!(result.status, RunStatus::Cancelled);
    let calls = service.calls();
    assert_eq!(calls.approvals.len(), 10);
    assert!(calls.get_run <= 11);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_failure_is_swallowed_at_ceiling() {
    let service = Arc::new(ScriptedService {
        fail_cancel: true,
        ..ScriptedService::new(vec![json!({"id": RUN_ID, "status": "in_progress"})])
    });
    let driver = driver(service.clone(), Arc::new(FakeStatus::default()), Toolset::Functions);

    let result = driver.run_query("processELT").await;

    // The refreshed run is still in progress, so it is reported as cancelled
    assert_eq!(result.status, RunStatus::Cancelled);
    assert!(!service.calls().cancelled);
    assert_eq!(service.calls().deleted_agents, vec!["asst_1".to_string()]);
    assert!(result.log.iter().any(|l| l.starts_with("Max attempts (10) reached")));
    assert!(result
        .log
        .iter()
        .any(|l| l.starts_with("Failed to cancel run run_1") && l.contains("409")));
}

// ============================================================================
// Poll failures
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_poll_failure_cancels() {
    let service = Arc::new(ScriptedService {
        fail_get_run_after: Some(1),
        ..ScriptedService::new(vec![json!({"id": RUN_ID, "status": "in_progress"})])
    });
    let driver = driver(service.clone(), Arc::new(FakeStatus::default()), Toolset::Functions);

    let result = driver.run_query("processELT").await;

    assert_eq!(result.status, RunStatus::Cancelled);
    let calls = service.calls();
    assert!(calls.cancelled);
    // One good poll, the failing poll, then the failed refresh after cancelling
    assert_eq!(calls.get_run, 3);
    assert!(result
        .log
        .iter()
        .any(|l| l.starts_with("Failed to poll run run_1") && l.contains("connection reset")));
    assert!(result.log.iter().any(|l| l == "Cancelled run run_1"));
}
