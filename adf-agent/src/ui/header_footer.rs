//! Header and footer rendering functions

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;

pub fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled(
            "ADF Pipeline Agent",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            format!("[{}]", app.mode_label),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  "),
        Span::styled(
            format!("{} result(s)", app.history.len()),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    if app.waiting {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!(
                "{} running {}s",
                app.spinner_char(),
                app.elapsed_seconds().unwrap_or(0)
            ),
            Style::default().fg(Color::Yellow),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

pub fn render_footer(f: &mut Frame, area: Rect, _app: &App) {
    let footer_text = Line::from(vec![
        Span::styled("[Enter]", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" Send  "),
        Span::styled("[Tab]", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" Switch Panel  "),
        Span::styled("[↑↓/PgUp/PgDn]", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" Scroll  "),
        Span::styled("[Ctrl+L]", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" Clear  "),
        Span::styled("[Esc/Ctrl+Q]", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" Quit"),
    ]);

    let footer = Paragraph::new(footer_text).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}
