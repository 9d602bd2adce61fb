//! Reusable widgets and text helpers

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders},
};

use adf_agent_sdk::{RunStatus, TokenUsage};

pub fn status_color(status: RunStatus) -> Color {
    match status {
        RunStatus::Completed => Color::Green,
        RunStatus::Failed | RunStatus::Expired => Color::Red,
        RunStatus::Cancelled | RunStatus::Cancelling => Color::Yellow,
        RunStatus::Queued | RunStatus::InProgress | RunStatus::RequiresAction => Color::Cyan,
        RunStatus::Unknown => Color::Gray,
    }
}

pub fn status_badge(status: RunStatus) -> Span<'static> {
    Span::styled(
        format!(" {} ", status.as_str().to_uppercase()),
        Style::default()
            .fg(Color::Black)
            .bg(status_color(status))
            .add_modifier(Modifier::BOLD),
    )
}

/// One badge per present counter
pub fn token_badges(usage: &TokenUsage) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for (label, value) in usage.entries() {
        spans.push(Span::styled(
            format!(" {}: {} ", label, value),
            Style::default().fg(Color::Black).bg(Color::Blue),
        ));
        spans.push(Span::raw(" "));
    }
    spans
}

pub fn section_title(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        title.to_string(),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
    ))
}

/// Bordered panel; the focused one gets a highlighted border
pub fn panel_block(title: &str, focused: bool) -> Block<'static> {
    let border = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", title))
        .border_style(border)
}

/// Split multi-line text into plain lines
pub fn text_lines(text: &str) -> Vec<Line<'static>> {
    text.lines().map(|l| Line::from(l.to_string())).collect()
}
