//! Details panel: everything the run produced, down to the debug log

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};
use serde_json::Value;

use adf_agent_sdk::{AgentResult, StepRecord, ToolCallRecord};

use super::components::{panel_block, section_title, text_lines};
use crate::app::{App, Pane};
use crate::normalize::{display_output, tail_chars, LOG_TAIL_CHARS};

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

fn tool_call_lines(call: &ToolCallRecord) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::DarkGray);
    let mut lines = vec![Line::from(vec![
        Span::styled("  • ", Style::default().fg(Color::Yellow)),
        Span::raw(or_dash(call.id.as_deref())),
        Span::styled(" | ", label),
        Span::raw(or_dash(call.kind.as_deref())),
        Span::styled(" | ", label),
        Span::styled(
            or_dash(call.name.as_deref()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ])];

    let mut field = |name: &str, value: Option<&Value>| {
        let text = value.map(display_output).unwrap_or_else(|| "-".to_string());
        let mut body = text.lines();
        lines.push(Line::from(vec![
            Span::styled(format!("    {}: ", name), label),
            Span::raw(body.next().unwrap_or_default().to_string()),
        ]));
        lines.extend(body.map(|l| Line::from(format!("      {}", l))));
    };
    field("arguments", call.arguments.as_ref());
    field("output", call.output.as_ref());
    for nested in &call.nested_outputs {
        field("nested", Some(nested));
    }
    lines
}

fn step_lines(step: &StepRecord) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("Step {}", step.id),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" [{}]", or_dash(step.status.as_deref()))),
    ])];

    for call in &step.tool_calls {
        lines.extend(tool_call_lines(call));
    }

    if !step.outputs.is_empty() {
        lines.push(Line::from("  Outputs:"));
        for output in &step.outputs {
            lines.extend(output.lines().map(|l| Line::from(format!("    {}", l))));
        }
    }

    if !step.activity_tools.is_empty() {
        lines.push(Line::from("  Activity tools:"));
        for tool in &step.activity_tools {
            let description = tool
                .description
                .as_deref()
                .map(|d| format!(" - {}", d))
                .unwrap_or_default();
            lines.push(Line::from(format!(
                "    {}({}){}",
                tool.function,
                tool.parameters.join(", "),
                description
            )));
        }
    }
    lines
}

/// All detail sections for one result
pub fn detail_lines(result: &AgentResult) -> Vec<Line<'static>> {
    let mut lines = vec![section_title("Final Response")];
    lines.extend(text_lines(&result.summary));

    lines.push(Line::from(""));
    lines.push(section_title("Conversation"));
    for message in &result.messages {
        let color = if message.role == "assistant" {
            Color::Cyan
        } else {
            Color::Green
        };
        lines.push(Line::from(Span::styled(
            format!("{}:", message.role),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        lines.extend(text_lines(&message.content));
    }

    lines.push(Line::from(""));
    lines.push(section_title(&format!(
        "Steps ({} tool calls)",
        result.tool_call_count()
    )));
    if result.steps.is_empty() {
        lines.push(Line::from("No steps recorded."));
    }
    for step in &result.steps {
        lines.extend(step_lines(step));
    }

    lines.push(Line::from(""));
    lines.push(section_title("Debug log"));
    let log = result.log.join("\n");
    lines.extend(text_lines(tail_chars(&log, LOG_TAIL_CHARS)));
    lines
}

pub fn render_details(f: &mut Frame, area: Rect, app: &App) {
    let lines = match app.history.latest() {
        Some(result) => detail_lines(result),
        None => vec![Line::from(Span::styled(
            "No results yet.",
            Style::default().fg(Color::DarkGray),
        ))],
    };
    let widget = Paragraph::new(lines)
        .block(panel_block("Details", app.focused == Pane::Details))
        .wrap(Wrap { trim: false })
        .scroll((app.details_scroll, 0));
    f.render_widget(widget, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use adf_agent_sdk::{ResultMessage, RunStatus};
    use serde_json::json;

    fn plain(lines: &[Line]) -> String {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn lists_tool_calls_outputs_and_log() {
        let result = AgentResult {
            query: "status?".into(),
            summary: "Status: Succeeded".into(),
            status: RunStatus::Completed,
            error: None,
            messages: vec![ResultMessage {
                role: "assistant".into(),
                content: "Status: Succeeded".into(),
            }],
            steps: vec![StepRecord {
                id: "step_1".into(),
                status: Some("completed".into()),
                tool_calls: vec![ToolCallRecord {
                    id: Some("call_1".into()),
                    kind: Some("function".into()),
                    name: Some("adf_pipeline_runs".into()),
                    arguments: Some(json!("{\"pipelinename\":\"processELT\"}")),
                    output: Some(json!("No runs found for pipeline.")),
                    nested_outputs: vec![],
                }],
                activity_tools: vec![],
                outputs: vec!["No runs found for pipeline.".into()],
            }],
            token_usage: None,
            log: vec!["Processing query: status?".into()],
        };

        let text = plain(&detail_lines(&result));
        assert!(text.contains("call_1 | function | adf_pipeline_runs"));
        assert!(text.contains("output: No runs found for pipeline."));
        assert!(text.contains("Steps (1 tool calls)"));
        assert!(text.ends_with("Processing query: status?"));
    }
}
