//! Azure Data Factory run status
//!
//! The agent's local function tools end up here. Both lookups return a plain
//! string in every case (compact JSON, a "nothing found" sentence, or an error
//! description) because the string is handed back to the agent verbatim as the
//! tool output.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

mod client;

pub use client::{AdfStatusClient, FactoryRef, HttpReply, ManagementApi, ReqwestManagementApi, TransportError};

/// Token scope for the ARM management plane
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";
pub const MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";
pub const ADF_API_VERSION: &str = "2018-06-01";

pub const NO_RUNS_FOUND: &str = "No runs found for pipeline.";
pub const NO_ACTIVITY_LOGS: &str = "No activity logs found for this run.";

/// Error bodies are cut to this many characters
const ERROR_BODY_LIMIT: usize = 500;

/// Pipeline and activity run lookups used by the local function tools
#[async_trait]
pub trait PipelineStatusSource: Send + Sync {
    /// Most recent run of `pipeline_name` inside the lookback window
    async fn latest_pipeline_run(&self, pipeline_name: &str) -> String;

    /// Activity runs of one pipeline run inside the lookback window
    async fn activity_runs(&self, pipeline_run_id: &str) -> String;
}

/// Whitelisted fields of a pipeline run, in display order
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunSummary {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub pipeline_name: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub run_start: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub run_end: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
}

/// Whitelisted fields of an activity run, in display order
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRunSummary {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub activity_name: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub activity_run_start: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub activity_run_end: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// A key that is present keeps its value even when that value is null
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
struct QueryResponse<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

/// Turn a `queryPipelineRuns` reply into the tool output string
pub fn summarize_pipeline_runs(reply: &HttpReply) -> String {
    if reply.status != 200 {
        return error_text(reply);
    }
    match serde_json::from_str::<QueryResponse<PipelineRunSummary>>(&reply.body) {
        Ok(parsed) => match parsed.value.into_iter().next() {
            Some(latest) => pretty(&latest),
            None => NO_RUNS_FOUND.to_string(),
        },
        Err(e) => format!("Exception querying pipeline runs: {}", e),
    }
}

/// Turn a `queryActivityRuns` reply into the tool output string
pub fn summarize_activity_runs(reply: &HttpReply) -> String {
    if reply.status != 200 {
        return error_text(reply);
    }
    match serde_json::from_str::<QueryResponse<ActivityRunSummary>>(&reply.body) {
        Ok(parsed) if parsed.value.is_empty() => NO_ACTIVITY_LOGS.to_string(),
        Ok(parsed) => pretty(&parsed.value),
        Err(e) => format!("Exception querying activity runs: {}", e),
    }
}

fn error_text(reply: &HttpReply) -> String {
    let body: String = reply.body.chars().take(ERROR_BODY_LIMIT).collect();
    format!("Error {}: {}", reply.status, body)
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("Exception serializing runs: {}", e))
}
