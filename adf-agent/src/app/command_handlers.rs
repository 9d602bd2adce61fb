//! Applies [`AppCommand`]s to the dashboard state

use super::{App, AppCommand};

impl App {
    /// Process a single command. Input edits and submissions are ignored
    /// while a query is running.
    pub fn handle_command(&mut self, cmd: AppCommand) {
        match cmd {
            AppCommand::Submit => {
                if !self.waiting {
                    self.submit();
                }
            }
            AppCommand::InsertChar(c) => {
                if !self.waiting {
                    self.input.push(c);
                }
            }
            AppCommand::Backspace => {
                if !self.waiting {
                    self.input.pop();
                }
            }
            AppCommand::NextPane => self.next_pane(),
            AppCommand::ScrollUp(lines) => self.scroll_up(lines),
            AppCommand::ScrollDown(lines) => self.scroll_down(lines),
            AppCommand::ClearHistory => {
                self.history.clear();
                self.notice = None;
                self.reset_scroll();
            }
            AppCommand::Quit => {
                self.should_quit = true;
            }
        }
    }
}
