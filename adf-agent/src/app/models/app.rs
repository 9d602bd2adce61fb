//! Main application state

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use adf_agent_sdk::AgentResult;

use super::Pane;
use crate::driver::SessionDriver;
use crate::history::SessionHistory;

/// Question the input box starts with
pub const SAMPLE_QUESTION: &str = "show me status of azure data factory pipeline processELT?";

/// Main application state
pub struct App {
    /// Current input buffer
    pub input: String,
    pub history: SessionHistory,
    pub should_quit: bool,

    // Panels
    pub focused: Pane,
    pub summary_scroll: u16,
    pub details_scroll: u16,

    // In-flight query
    pub waiting: bool,
    pub pending_query: Option<String>,
    pub started_at: Option<Instant>,
    pub spinner_frame: usize,
    /// One-line notice shown in the summary panel (e.g. a lost query task)
    pub notice: Option<String>,

    /// Shown in the header, e.g. "demo" or "functions"
    pub mode_label: String,

    pub(crate) driver: Arc<SessionDriver>,
    pub(crate) result_rx: Option<mpsc::UnboundedReceiver<AgentResult>>,
    pub(crate) tokio_handle: tokio::runtime::Handle,
}
