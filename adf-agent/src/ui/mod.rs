//! Rendering for the terminal dashboard

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;

mod components;
mod details_view;
mod header_footer;
mod summary_view;

pub use details_view::{detail_lines, render_details};
pub use header_footer::{render_footer, render_header};
pub use summary_view::{render_summary, summary_lines};

/// Main UI rendering function
pub fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, chunks[0], app);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);
    render_summary(f, panels[0], app);
    render_details(f, panels[1], app);

    render_input(f, chunks[2], app);
    render_footer(f, chunks[3], app);
}

fn render_input(f: &mut Frame, area: Rect, app: &App) {
    let (title, style) = if app.waiting {
        (" Waiting for the agent... ", Style::default().fg(Color::DarkGray))
    } else {
        (" Question (Enter to send) ", Style::default().fg(Color::White))
    };
    let input = Paragraph::new(app.input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(style),
    );
    f.render_widget(input, area);
}
