//! The offline demo backends driven by the real driver

use std::sync::Arc;

use adf_agent::config::Toolset;
use adf_agent::demo::{DemoAgentService, DemoStatusSource, DEMO_RUN_ID};
use adf_agent::driver::{DriverOptions, SessionDriver};
use adf_agent::tools::LocalTools;
use adf_agent_sdk::RunStatus;
use serde_json::Value;

use super::common::fast_policy;

fn demo_driver(toolset: Toolset) -> SessionDriver {
    let mut options = DriverOptions::new("demo-model");
    options.toolset = toolset;
    options.poll = fast_policy(50);
    SessionDriver::new(
        Arc::new(DemoAgentService::new()),
        LocalTools::new(Arc::new(DemoStatusSource), "processELT"),
        options,
    )
}

#[tokio::test(start_paused = true)]
async fn test_demo_status_question_completes() {
    let result = demo_driver(Toolset::Functions)
        .run_query("show me status of azure data factory pipeline processELT?")
        .await;

    assert_eq!(result.status, RunStatus::Completed);
    assert!(result.summary.contains("CustomerETL completed successfully"));
    assert_eq!(result.token_usage.as_ref().and_then(|u| u.total_tokens), Some(350));

    let names: Vec<&str> = result.tool_calls().filter_map(|c| c.name.as_deref()).collect();
    assert_eq!(
        names,
        vec!["microsoft_docs_search", "adf_pipeline_runs", "adf_pipeline_activity_runs"]
    );

    // Local outputs fill in the function steps
    let runs_output = result
        .tool_calls()
        .find(|c| c.name.as_deref() == Some("adf_pipeline_runs"))
        .and_then(|c| c.output.clone())
        .unwrap();
    let parsed: Value = serde_json::from_str(runs_output.as_str().unwrap()).unwrap();
    assert_eq!(parsed["runId"], DEMO_RUN_ID);
    assert_eq!(parsed["status"], "Succeeded");

    let activity_tools: Vec<&str> = result
        .steps
        .iter()
        .flat_map(|s| s.activity_tools.iter().map(|t| t.function.as_str()))
        .collect();
    assert_eq!(activity_tools, vec!["microsoft_docs_search"]);
}

#[tokio::test(start_paused = true)]
async fn test_demo_failure_question_reports_schema_mismatch() {
    let result = demo_driver(Toolset::Functions)
        .run_query("why did the pipeline fail with an error?")
        .await;

    assert_eq!(result.status, RunStatus::Completed);
    assert!(result.summary.contains("Error code 2200"));
    let activity_output = result
        .tool_calls()
        .find(|c| c.name.as_deref() == Some("adf_pipeline_activity_runs"))
        .and_then(|c| c.output.clone())
        .unwrap();
    assert!(activity_output.as_str().unwrap().contains("schema mismatch"));
}

#[tokio::test(start_paused = true)]
async fn test_demo_code_interpreter_cancels_function_requests() {
    let result = demo_driver(Toolset::CodeInterpreter)
        .run_query("status please")
        .await;
    assert_eq!(result.status, RunStatus::Cancelled);
}
