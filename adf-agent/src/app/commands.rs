//! Commands the dashboard reacts to
//!
//! Key events are mapped here so the event loop stays a thin translation layer.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Lines moved by PgUp/PgDn
pub const PAGE_LINES: u16 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Send the input buffer as a question
    Submit,
    InsertChar(char),
    Backspace,
    /// Move focus to the other panel
    NextPane,
    ScrollUp(u16),
    ScrollDown(u16),
    /// Discard the session history
    ClearHistory,
    Quit,
}

/// Translate one key press; `None` for keys the dashboard ignores
pub fn command_for_key(key: KeyEvent) -> Option<AppCommand> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => Some(AppCommand::Quit),
        KeyCode::Char('q') | KeyCode::Char('Q') if ctrl => Some(AppCommand::Quit),
        KeyCode::Char('c') if ctrl => Some(AppCommand::Quit),
        KeyCode::Char('l') | KeyCode::Char('L') if ctrl => Some(AppCommand::ClearHistory),
        KeyCode::Char(_) if ctrl => None,
        KeyCode::Char(c) => Some(AppCommand::InsertChar(c)),
        KeyCode::Backspace => Some(AppCommand::Backspace),
        KeyCode::Enter => Some(AppCommand::Submit),
        KeyCode::Tab => Some(AppCommand::NextPane),
        KeyCode::Up => Some(AppCommand::ScrollUp(1)),
        KeyCode::Down => Some(AppCommand::ScrollDown(1)),
        KeyCode::PageUp => Some(AppCommand::ScrollUp(PAGE_LINES)),
        KeyCode::PageDown => Some(AppCommand::ScrollDown(PAGE_LINES)),
        _ => None,
    }
}
