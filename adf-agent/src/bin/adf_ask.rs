use anyhow::{Context, Result};
use clap::Parser;

use adf_agent::bootstrap::build_driver;
use adf_agent::config::Settings;
use adf_agent::logging::{init_tracing, LogTarget};
use adf_agent::normalize::display_output;
use adf_agent_sdk::AgentResult;

/// Ask one question and print the result
#[derive(Parser, Debug)]
#[command(name = "adf-ask", version, about)]
struct Args {
    /// The question for the agent
    #[arg(short, long)]
    question: String,

    /// Run against canned offline backends instead of Azure
    #[arg(long)]
    demo: bool,

    /// Print the whole result as JSON
    #[arg(long)]
    json: bool,
}

fn print_result(result: &AgentResult) {
    println!("Status: {}", result.status);
    if let Some(error) = &result.error {
        println!("Error: {}", error);
    }
    println!();
    println!("{}", result.summary);

    if let Some(usage) = &result.token_usage {
        let badges: Vec<String> = usage
            .entries()
            .into_iter()
            .map(|(label, value)| format!("{}={}", label, value))
            .collect();
        println!();
        println!("Tokens: {}", badges.join(" "));
    }

    if result.tool_call_count() > 0 {
        println!();
        println!("Tool calls:");
        for call in result.tool_calls() {
            println!(
                "  {} [{}] {}",
                call.name.as_deref().unwrap_or("-"),
                call.kind.as_deref().unwrap_or("-"),
                call.id.as_deref().unwrap_or("-")
            );
            if let Some(output) = &call.output {
                for line in display_output(output).lines() {
                    println!("      {}", line);
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(&LogTarget::Stderr)?;

    let settings = Settings::from_env(!args.demo).context("invalid configuration")?;
    let driver = build_driver(&settings, args.demo)?;
    let result = driver.run_query(&args.question).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}
