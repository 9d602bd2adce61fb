//! Wiring shared by the three front ends

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use adf_agent_sdk::AgentService;
use foundry_agents_client::{AgentsClient, DefaultAzureCredential, TokenCredential};

use crate::adf::{AdfStatusClient, PipelineStatusSource, ReqwestManagementApi};
use crate::config::Settings;
use crate::demo::{DemoAgentService, DemoStatusSource};
use crate::driver::{DriverOptions, SessionDriver};
use crate::tools::{LocalTools, AGENT_NAME};

const DEMO_MODEL: &str = "demo-model";

/// Build the driver either against Azure or against the offline demo backends
pub fn build_driver(settings: &Settings, demo: bool) -> Result<SessionDriver> {
    let (service, source, model): (Arc<dyn AgentService>, Arc<dyn PipelineStatusSource>, String) =
        if demo {
            info!("using demo backends");
            (
                Arc::new(DemoAgentService::new()),
                Arc::new(DemoStatusSource),
                DEMO_MODEL.to_string(),
            )
        } else {
            let azure = settings.require_azure()?;
            let http = reqwest::Client::builder()
                .build()
                .context("failed to build HTTP client")?;
            let credential: Arc<dyn TokenCredential> = Arc::new(DefaultAzureCredential::from_env(http.clone()));

            let agents = AgentsClient::new(http, azure.project_endpoint.clone(), credential.clone())
                .with_api_version(settings.api_version.clone());
            let management = ReqwestManagementApi::new().context("failed to build management client")?;
            let status = AdfStatusClient::new(
                Arc::new(management),
                credential,
                azure.factory.clone(),
                chrono::Duration::hours(settings.lookback_hours),
            );

            info!(
                endpoint = %azure.project_endpoint,
                factory = %azure.factory.factory_name,
                "using Azure backends"
            );
            (Arc::new(agents), Arc::new(status), azure.model_deployment.clone())
        };

    let options = DriverOptions {
        model,
        agent_name: AGENT_NAME.to_string(),
        toolset: settings.toolset,
        mcp: settings.mcp.clone(),
        poll: settings.poll,
    };
    let tools = LocalTools::new(source, settings.default_pipeline.clone());
    Ok(SessionDriver::new(service, tools, options))
}
