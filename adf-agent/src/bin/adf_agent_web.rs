use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;

use adf_agent::bootstrap::build_driver;
use adf_agent::config::Settings;
use adf_agent::logging::{init_tracing, LogTarget};
use adf_agent::web;

/// Browser dashboard for asking an agent about Azure Data Factory pipelines
#[derive(Parser, Debug)]
#[command(name = "adf-agent-web", version, about)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "ADF_AGENT_LISTEN", default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Run against canned offline backends instead of Azure
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(&LogTarget::Stderr)?;

    let settings = Settings::from_env(!args.demo).context("invalid configuration")?;
    let driver = build_driver(&settings, args.demo)?;

    println!("adf-agent-web listening on http://{}", args.listen);
    web::serve(args.listen, Arc::new(driver)).await
}
