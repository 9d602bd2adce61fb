//! REST client for the hosted agent service
//!
//! [`AgentsClient`] implements [`AgentService`] over the project endpoint's
//! assistants API. Every request carries `api-version` and a bearer token for
//! [`AGENTS_SCOPE`], obtained from the configured [`TokenCredential`].
//!
//! # Example
//!
//! ```no_run
//! use adf_agent_sdk::{AgentService, MessageRole};
//! use foundry_agents_client::{AgentsClient, DefaultAzureCredential};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let http = reqwest::Client::new();
//! let credential = Arc::new(DefaultAzureCredential::from_env(http.clone()));
//! let client = AgentsClient::new(http, "https://example.services.ai.azure.com/api/projects/p", credential);
//!
//! let thread = client.create_thread().await?;
//! client
//!     .create_message(&thread.id, MessageRole::User, "What is the status of processELT?")
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! List endpoints are cursor-paginated; [`AgentsClient`] follows `last_id`
//! until `has_more` is false and returns the concatenated pages.

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use adf_agent_sdk::{
    Agent, AgentService, AgentServiceError, AgentServiceResult, CreateAgentRequest,
    CreateRunRequest, ListSortOrder, MessageRole, Run, RunStep, Thread, ThreadMessage,
    ToolApproval, ToolOutput,
};

use crate::credential::TokenCredential;

/// Token scope for the agent service
pub const AGENTS_SCOPE: &str = "https://ai.azure.com/.default";

pub const DEFAULT_API_VERSION: &str = "v1";

/// Largest page the service accepts
const PAGE_LIMIT: usize = 100;

/// Upper bound on pages followed for one listing
const MAX_PAGES: usize = 50;

#[derive(Clone)]
pub struct AgentsClient {
    http: reqwest::Client,
    endpoint: String,
    api_version: String,
    credential: Arc<dyn TokenCredential>,
}

/// One page of a cursor-paginated listing
#[derive(Debug, Deserialize)]
struct ListPage<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    last_id: Option<String>,
}

#[derive(Serialize)]
struct SubmitToolOutputs<'a> {
    tool_outputs: &'a [ToolOutput],
}

#[derive(Serialize)]
struct SubmitToolApprovals<'a> {
    tool_approvals: &'a [ToolApproval],
}

impl AgentsClient {
    pub fn new(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        credential: Arc<dyn TokenCredential>,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            credential,
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    async fn send<B, T>(&self, method: Method, path: &str, query: &[(&str, String)], body: Option<&B>) -> AgentServiceResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let token = self
            .credential
            .get_token(AGENTS_SCOPE)
            .await
            .map_err(|e| AgentServiceError::Credential(e.to_string()))?;

        let mut request = self
            .http
            .request(method.clone(), self.url(path))
            .bearer_auth(&token.token)
            .query(&[("api-version", self.api_version.as_str())])
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        trace!(%method, path, "agent service request");
        let response = request
            .send()
            .await
            .map_err(|e| AgentServiceError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AgentServiceError::Transport(e.to_string()))?;

        if !status.is_success() {
            debug!(%method, path, status = status.as_u16(), "agent service error");
            return Err(AgentServiceError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        decode_body(&text)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> AgentServiceResult<T> {
        self.send::<(), T>(Method::GET, path, query, None).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> AgentServiceResult<T> {
        self.send(Method::POST, path, &[], Some(body)).await
    }

    /// Fetch every page of a listing
    async fn list_all<T: DeserializeOwned>(&self, path: &str, order: ListSortOrder) -> AgentServiceResult<Vec<T>> {
        let mut items = Vec::new();
        let mut after: Option<String> = None;

        for page_number in 1..=MAX_PAGES {
            let mut query = vec![
                ("order", order.as_str().to_string()),
                ("limit", PAGE_LIMIT.to_string()),
            ];
            if let Some(cursor) = &after {
                query.push(("after", cursor.clone()));
            }

            let page: ListPage<T> = self.get(path, &query).await?;
            items.extend(page.data);

            match next_cursor(page.has_more, page.last_id, after.as_deref()) {
                Some(cursor) => after = Some(cursor),
                None => return Ok(items),
            }
            if page_number == MAX_PAGES {
                warn!(path, pages = MAX_PAGES, "listing still has more pages; stopping");
            }
        }

        Ok(items)
    }
}

/// The cursor for the next page; `None` once the listing stops advancing
fn next_cursor(has_more: bool, last_id: Option<String>, previous: Option<&str>) -> Option<String> {
    if has_more {
        last_id.filter(|id| !id.is_empty() && Some(id.as_str()) != previous)
    } else {
        None
    }
}

fn decode_body<T: DeserializeOwned>(text: &str) -> AgentServiceResult<T> {
    // DELETE and some POSTs answer with an empty body
    let text = if text.trim().is_empty() { "null" } else { text };
    serde_json::from_str(text).map_err(|e| AgentServiceError::Decode(e.to_string()))
}

#[async_trait]
impl AgentService for AgentsClient {
    async fn create_agent(&self, request: &CreateAgentRequest) -> AgentServiceResult<Agent> {
        self.post("assistants", request).await
    }

    async fn delete_agent(&self, agent_id: &str) -> AgentServiceResult<()> {
        let _: serde_json::Value = self
            .send::<(), _>(Method::DELETE, &format!("assistants/{}", agent_id), &[], None)
            .await?;
        Ok(())
    }

    async fn create_thread(&self) -> AgentServiceResult<Thread> {
        self.post("threads", &json!({})).await
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> AgentServiceResult<ThreadMessage> {
        self.post(
            &format!("threads/{}/messages", thread_id),
            &json!({ "role": role, "content": content }),
        )
        .await
    }

    async fn create_run(&self, thread_id: &str, request: &CreateRunRequest) -> AgentServiceResult<Run> {
        self.post(&format!("threads/{}/runs", thread_id), request).await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> AgentServiceResult<Run> {
        self.get(&format!("threads/{}/runs/{}", thread_id, run_id), &[]).await
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> AgentServiceResult<Run> {
        self.post(&format!("threads/{}/runs/{}/cancel", thread_id, run_id), &json!({}))
            .await
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> AgentServiceResult<Run> {
        self.post(
            &format!("threads/{}/runs/{}/submit_tool_outputs", thread_id, run_id),
            &SubmitToolOutputs { tool_outputs: outputs },
        )
        .await
    }

    async fn submit_tool_approvals(
        &self,
        thread_id: &str,
        run_id: &str,
        approvals: &[ToolApproval],
    ) -> AgentServiceResult<Run> {
        self.post(
            &format!("threads/{}/runs/{}/submit_tool_outputs", thread_id, run_id),
            &SubmitToolApprovals {
                tool_approvals: approvals,
            },
        )
        .await
    }

    async fn list_run_steps(&self, thread_id: &str, run_id: &str) -> AgentServiceResult<Vec<RunStep>> {
        self.list_all(
            &format!("threads/{}/runs/{}/steps", thread_id, run_id),
            ListSortOrder::Ascending,
        )
        .await
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        order: ListSortOrder,
    ) -> AgentServiceResult<Vec<ThreadMessage>> {
        self.list_all(&format!("threads/{}/messages", thread_id), order).await
    }
}
