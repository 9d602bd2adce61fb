//! Terminal dashboard state
//!
//! [`App`] holds one session: the input buffer, the in-memory result history
//! and the query currently running on the tokio runtime, if any. Key presses
//! are translated to [`AppCommand`]s and applied by [`App::handle_command`].

use std::sync::Arc;

use crate::driver::SessionDriver;
use crate::history::SessionHistory;

mod models;
pub use models::*;

mod command_handlers;
mod commands;
mod navigation;
mod query;

pub use commands::{command_for_key, AppCommand};

impl App {
    pub fn new(
        driver: Arc<SessionDriver>,
        tokio_handle: tokio::runtime::Handle,
        mode_label: impl Into<String>,
    ) -> Self {
        Self {
            input: SAMPLE_QUESTION.to_string(),
            history: SessionHistory::new(),
            should_quit: false,
            focused: Pane::default(),
            summary_scroll: 0,
            details_scroll: 0,
            waiting: false,
            pending_query: None,
            started_at: None,
            spinner_frame: 0,
            notice: None,
            mode_label: mode_label.into(),
            driver,
            result_rx: None,
            tokio_handle,
        }
    }
}
