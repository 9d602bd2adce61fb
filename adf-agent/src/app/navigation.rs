//! Panel focus and scrolling

use super::*;

impl App {
    pub fn next_pane(&mut self) {
        self.focused = self.focused.next();
    }

    /// Scroll up in the focused panel
    pub fn scroll_up(&mut self, lines: u16) {
        match self.focused {
            Pane::Summary => self.summary_scroll = self.summary_scroll.saturating_sub(lines),
            Pane::Details => self.details_scroll = self.details_scroll.saturating_sub(lines),
        }
    }

    /// Scroll down in the focused panel
    pub fn scroll_down(&mut self, lines: u16) {
        match self.focused {
            Pane::Summary => self.summary_scroll = self.summary_scroll.saturating_add(lines),
            Pane::Details => self.details_scroll = self.details_scroll.saturating_add(lines),
        }
    }

    /// Back to the top of both panels
    pub fn reset_scroll(&mut self) {
        self.summary_scroll = 0;
        self.details_scroll = 0;
    }
}
