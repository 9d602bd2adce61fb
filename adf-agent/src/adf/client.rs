use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use foundry_agents_client::TokenCredential;

use super::{
    summarize_activity_runs, summarize_pipeline_runs, PipelineStatusSource, ADF_API_VERSION,
    MANAGEMENT_ENDPOINT, MANAGEMENT_SCOPE,
};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Status code and raw body of a management-plane reply
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// The one HTTP call the status client makes, behind a seam for tests
#[async_trait]
pub trait ManagementApi: Send + Sync {
    async fn post_json(&self, url: &str, bearer: &str, body: &Value) -> Result<HttpReply, TransportError>;
}

pub struct ReqwestManagementApi {
    http: reqwest::Client,
}

impl ReqwestManagementApi {
    pub fn new() -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ManagementApi for ReqwestManagementApi {
    async fn post_json(&self, url: &str, bearer: &str, body: &Value) -> Result<HttpReply, TransportError> {
        let response = self
            .http
            .post(url)
            .bearer_auth(bearer)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(HttpReply { status, body })
    }
}

/// Identifies one data factory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryRef {
    pub subscription_id: String,
    pub resource_group: String,
    pub factory_name: String,
}

impl FactoryRef {
    pub fn resource_path(&self) -> String {
        format!(
            "subscriptions/{}/resourceGroups/{}/providers/Microsoft.DataFactory/factories/{}",
            self.subscription_id, self.resource_group, self.factory_name
        )
    }
}

/// Queries the ADF REST API for pipeline and activity runs
pub struct AdfStatusClient {
    api: Arc<dyn ManagementApi>,
    credential: Arc<dyn TokenCredential>,
    factory: FactoryRef,
    lookback: Duration,
    endpoint: String,
}

impl AdfStatusClient {
    pub fn new(
        api: Arc<dyn ManagementApi>,
        credential: Arc<dyn TokenCredential>,
        factory: FactoryRef,
        lookback: Duration,
    ) -> Self {
        Self {
            api,
            credential,
            factory,
            lookback,
            endpoint: MANAGEMENT_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    fn pipeline_runs_url(&self) -> String {
        format!(
            "{}/{}/queryPipelineRuns?api-version={}",
            self.endpoint,
            self.factory.resource_path(),
            ADF_API_VERSION
        )
    }

    fn activity_runs_url(&self, pipeline_run_id: &str) -> String {
        format!(
            "{}/{}/pipelineruns/{}/queryActivityRuns?api-version={}",
            self.endpoint,
            self.factory.resource_path(),
            pipeline_run_id,
            ADF_API_VERSION
        )
    }

    async fn post(&self, url: &str, body: &Value) -> Result<HttpReply, String> {
        let token = self
            .credential
            .get_token(MANAGEMENT_SCOPE)
            .await
            .map_err(|e| e.to_string())?;
        debug!(url, "querying data factory");
        self.api
            .post_json(url, &token.token, body)
            .await
            .map_err(|e| e.to_string())
    }
}

/// `lastUpdatedAfter` / `lastUpdatedBefore` for a window ending at `now`
pub fn query_window(now: DateTime<Utc>, lookback: Duration) -> (String, String) {
    const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
    let start = now - lookback;
    (start.format(FORMAT).to_string(), now.format(FORMAT).to_string())
}

#[async_trait]
impl PipelineStatusSource for AdfStatusClient {
    async fn latest_pipeline_run(&self, pipeline_name: &str) -> String {
        let (after, before) = query_window(Utc::now(), self.lookback);
        let body = json!({
            "lastUpdatedAfter": after,
            "lastUpdatedBefore": before,
            "filters": [
                {"operand": "PipelineName", "operator": "Equals", "values": [pipeline_name]}
            ]
        });

        match self.post(&self.pipeline_runs_url(), &body).await {
            Ok(reply) => summarize_pipeline_runs(&reply),
            Err(e) => {
                warn!(pipeline_name, error = %e, "pipeline run query failed");
                format!("Exception querying pipeline runs: {}", e)
            }
        }
    }

    async fn activity_runs(&self, pipeline_run_id: &str) -> String {
        let (after, before) = query_window(Utc::now(), self.lookback);
        let body = json!({
            "lastUpdatedAfter": after,
            "lastUpdatedBefore": before,
        });

        match self.post(&self.activity_runs_url(pipeline_run_id), &body).await {
            Ok(reply) => summarize_activity_runs(&reply),
            Err(e) => {
                warn!(pipeline_run_id, error = %e, "activity run query failed");
                format!("Exception querying activity runs: {}", e)
            }
        }
    }
}
