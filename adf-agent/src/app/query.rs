//! Running a question on the tokio runtime without blocking the draw loop

use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::App;

const SPINNER: [char; 8] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧'];

impl App {
    /// Start the query in the input buffer on a background task
    pub fn submit(&mut self) {
        let query = self.input.trim().to_string();
        if query.is_empty() {
            return;
        }

        info!(query = %query, "submitting query");
        self.waiting = true;
        self.started_at = Some(Instant::now());
        self.pending_query = Some(query.clone());
        self.notice = None;
        self.input.clear();

        let (tx, rx) = mpsc::unbounded_channel();
        self.result_rx = Some(rx);

        let driver = self.driver.clone();
        self.tokio_handle.spawn(async move {
            let result = driver.run_query(&query).await;
            let _ = tx.send(result);
        });
    }

    /// Collect a finished query (non-blocking)
    pub fn poll_result(&mut self) {
        let Some(rx) = &mut self.result_rx else {
            return;
        };

        match rx.try_recv() {
            Ok(result) => {
                info!(status = %result.status, "query finished");
                self.finish_waiting();
                self.history.push(result);
                self.reset_scroll();
            }
            Err(mpsc::error::TryRecvError::Empty) => {}
            Err(mpsc::error::TryRecvError::Disconnected) => {
                warn!("query task ended without a result");
                self.finish_waiting();
                self.notice = Some("Error: query task ended without a result".to_string());
            }
        }
    }

    fn finish_waiting(&mut self) {
        self.waiting = false;
        self.started_at = None;
        self.pending_query = None;
        self.result_rx = None;
    }

    pub fn update_spinner(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER.len();
    }

    pub fn spinner_char(&self) -> char {
        SPINNER[self.spinner_frame]
    }

    pub fn elapsed_seconds(&self) -> Option<u64> {
        self.started_at.map(|start| start.elapsed().as_secs())
    }
}
