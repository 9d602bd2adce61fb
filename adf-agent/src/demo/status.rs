use async_trait::async_trait;
use serde_json::{json, Value};

use crate::adf::PipelineStatusSource;

pub const DEMO_RUN_ID: &str = "abc123-def456-789";

/// Canned pipeline data; names containing "failed" describe a failed run
#[derive(Debug, Default, Clone)]
pub struct DemoStatusSource;

fn is_failure(name: &str) -> bool {
    name.to_lowercase().contains("failed")
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[async_trait]
impl PipelineStatusSource for DemoStatusSource {
    async fn latest_pipeline_run(&self, pipeline_name: &str) -> String {
        let (status, message) = if is_failure(pipeline_name) {
            ("Failed", "Pipeline execution completed with errors")
        } else {
            ("Succeeded", "Pipeline execution completed successfully")
        };
        pretty(&json!({
            "pipelineName": pipeline_name,
            "runId": DEMO_RUN_ID,
            "status": status,
            "runStart": "2024-01-15T09:30:00Z",
            "runEnd": "2024-01-15T09:45:00Z",
            "message": message,
        }))
    }

    async fn activity_runs(&self, pipeline_run_id: &str) -> String {
        let (status, error) = if is_failure(pipeline_run_id) {
            (
                "Failed",
                json!({
                    "errorCode": "2200",
                    "message": "Data transformation failed due to schema mismatch"
                }),
            )
        } else {
            ("Succeeded", Value::Null)
        };
        pretty(&json!([
            {
                "activityName": "CopyCustomerData",
                "activityType": "Copy",
                "status": "Succeeded",
                "activityRunStart": "2024-01-15T09:30:00Z",
                "activityRunEnd": "2024-01-15T09:35:00Z"
            },
            {
                "activityName": "TransformData",
                "activityType": "ExecuteDataFlow",
                "status": status,
                "activityRunStart": "2024-01-15T09:35:00Z",
                "activityRunEnd": "2024-01-15T09:45:00Z",
                "error": error
            }
        ]))
    }
}
