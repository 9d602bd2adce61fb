//! Summary panel: question, status, answer and token usage

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use adf_agent_sdk::AgentResult;

use super::components::{panel_block, status_badge, text_lines, token_badges};
use crate::app::{App, Pane};

pub fn summary_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if let Some(notice) = &app.notice {
        lines.push(Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Red),
        )));
        lines.push(Line::from(""));
    }

    if app.waiting {
        lines.push(Line::from(vec![
            Span::styled("Question: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(app.pending_query.clone().unwrap_or_default()),
        ]));
        lines.push(Line::from(Span::styled(
            format!("{} Agent is working...", app.spinner_char()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        )));
        return lines;
    }

    match app.history.latest() {
        Some(result) => lines.extend(result_summary(result)),
        None => lines.push(Line::from(Span::styled(
            "Ask about your Data Factory pipelines and press Enter.",
            Style::default().fg(Color::DarkGray),
        ))),
    }
    lines
}

fn result_summary(result: &AgentResult) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Question: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(result.query.clone()),
        ]),
        Line::from(vec![
            Span::styled("Status: ", Style::default().add_modifier(Modifier::BOLD)),
            status_badge(result.status),
        ]),
    ];

    if let Some(error) = &result.error {
        lines.push(Line::from(Span::styled(
            format!("Error: {}", error),
            Style::default().fg(Color::Red),
        )));
    }

    lines.push(Line::from(""));
    lines.extend(text_lines(&result.summary));

    if let Some(usage) = &result.token_usage {
        lines.push(Line::from(""));
        lines.push(Line::from(token_badges(usage)));
    }
    lines
}

pub fn render_summary(f: &mut Frame, area: Rect, app: &App) {
    let widget = Paragraph::new(summary_lines(app))
        .block(panel_block("Summary", app.focused == Pane::Summary))
        .wrap(Wrap { trim: false })
        .scroll((app.summary_scroll, 0));
    f.render_widget(widget, area);
}
