use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use adf_agent::app::{command_for_key, App};
use adf_agent::bootstrap::build_driver;
use adf_agent::config::Settings;
use adf_agent::logging::{init_tracing, LogTarget, DEFAULT_LOG_FILE};
use adf_agent::ui::ui;

/// Terminal dashboard for asking an agent about Azure Data Factory pipelines
#[derive(Parser, Debug)]
#[command(name = "adf-agent", version, about)]
struct Args {
    /// Run against canned offline backends instead of Azure
    #[arg(long)]
    demo: bool,

    /// Log file (the screen is never used for logs)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let settings = Settings::from_env(!args.demo).context("invalid configuration")?;
    let log_file = args
        .log_file
        .or_else(|| settings.log_file.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
    init_tracing(&LogTarget::File(log_file))?;

    let runtime = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
    let driver = {
        let _guard = runtime.enter();
        build_driver(&settings, args.demo)?
    };
    let mode_label = if args.demo {
        "demo".to_string()
    } else {
        settings.toolset.as_str().to_string()
    };
    let mut app = App::new(Arc::new(driver), runtime.handle().clone(), mode_label);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        app.poll_result();
        if app.waiting {
            app.update_spinner();
        }

        terminal.draw(|f| ui(f, app))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(cmd) = command_for_key(key) {
                        app.handle_command(cmd);
                    }
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
