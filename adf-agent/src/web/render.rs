//! Server-rendered HTML for a session page
//!
//! Everything that came from the agent, the status API or the user is escaped
//! with [`escape_html`] before it reaches the page.

use serde_json::Value;
use std::fmt::Write;
use uuid::Uuid;

use adf_agent_sdk::{AgentResult, StepRecord};

use crate::history::SessionHistory;
use crate::normalize::{display_output, tail_chars, LOG_TAIL_CHARS};

const STYLE: &str = "body{font-family:sans-serif;margin:1.5rem;background:#f6f7f9}\
.panels{display:flex;gap:1rem;align-items:flex-start}\
.panel{background:#fff;border:1px solid #ccd;border-radius:6px;padding:1rem;flex:1;min-width:0}\
.details{flex:1.5}\
pre{white-space:pre-wrap;word-break:break-word;background:#f0f1f4;padding:.5rem}\
.badge{display:inline-block;padding:.1rem .5rem;border-radius:4px;color:#fff;font-weight:bold;margin-right:.3rem}\
.status-completed{background:#2e7d32}.status-failed,.status-expired{background:#c62828}\
.status-cancelled,.status-cancelling{background:#ef6c00}.token{background:#1565c0}\
.error{color:#c62828}table{border-collapse:collapse;width:100%}\
td,th{border:1px solid #dde;padding:.3rem;vertical-align:top;text-align:left}";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn cell(value: Option<&Value>) -> String {
    match value {
        Some(v) => format!("<pre>{}</pre>", escape_html(&display_output(v))),
        None => "-".to_string(),
    }
}

fn text_or_dash(value: Option<&str>) -> String {
    escape_html(value.unwrap_or("-"))
}

fn status_badge(result: &AgentResult) -> String {
    format!(
        "<span class=\"badge status-{0}\">{0}</span>",
        result.status.as_str()
    )
}

fn render_summary(out: &mut String, result: &AgentResult) {
    let _ = write!(
        out,
        "<p><b>Question:</b> {}</p><p><b>Status:</b> {}</p>",
        escape_html(&result.query),
        status_badge(result)
    );
    if let Some(error) = &result.error {
        let _ = write!(out, "<p class=\"error\">Error: {}</p>", escape_html(error));
    }
    let _ = write!(out, "<pre>{}</pre>", escape_html(&result.summary));
    if let Some(usage) = &result.token_usage {
        out.push_str("<p>");
        for (label, value) in usage.entries() {
            let _ = write!(out, "<span class=\"badge token\">{}: {}</span>", label, value);
        }
        out.push_str("</p>");
    }
}

fn render_step(out: &mut String, step: &StepRecord) {
    let _ = write!(
        out,
        "<h4>Step {} [{}]</h4>",
        escape_html(&step.id),
        text_or_dash(step.status.as_deref())
    );

    if !step.tool_calls.is_empty() {
        out.push_str("<table><tr><th>id</th><th>type</th><th>name</th><th>arguments</th><th>output</th></tr>");
        for call in &step.tool_calls {
            let mut output = cell(call.output.as_ref());
            for nested in &call.nested_outputs {
                output.push_str(&cell(Some(nested)));
            }
            let _ = write!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                text_or_dash(call.id.as_deref()),
                text_or_dash(call.kind.as_deref()),
                text_or_dash(call.name.as_deref()),
                cell(call.arguments.as_ref()),
                output
            );
        }
        out.push_str("</table>");
    }

    if !step.outputs.is_empty() {
        out.push_str("<p><b>Outputs</b></p>");
        for output in &step.outputs {
            let _ = write!(out, "<pre>{}</pre>", escape_html(output));
        }
    }

    if !step.activity_tools.is_empty() {
        out.push_str("<p><b>Activity tools</b></p><ul>");
        for tool in &step.activity_tools {
            let _ = write!(
                out,
                "<li><code>{}({})</code> {}</li>",
                escape_html(&tool.function),
                escape_html(&tool.parameters.join(", ")),
                escape_html(tool.description.as_deref().unwrap_or(""))
            );
        }
        out.push_str("</ul>");
    }
}

fn render_details(out: &mut String, result: &AgentResult) {
    let _ = write!(
        out,
        "<h3>Final Response</h3><pre>{}</pre><h3>Conversation</h3>",
        escape_html(&result.summary)
    );
    for message in &result.messages {
        let _ = write!(
            out,
            "<p><b>{}:</b></p><pre>{}</pre>",
            escape_html(&message.role),
            escape_html(&message.content)
        );
    }

    let _ = write!(out, "<h3>Steps ({} tool calls)</h3>", result.tool_call_count());
    if result.steps.is_empty() {
        out.push_str("<p>No steps recorded.</p>");
    }
    for step in &result.steps {
        render_step(out, step);
    }

    let log = result.log.join("\n");
    let _ = write!(
        out,
        "<h3>Debug log</h3><pre>{}</pre>",
        escape_html(tail_chars(&log, LOG_TAIL_CHARS))
    );
}

/// Full page for one session. `history` is `None` while a query holds the session.
pub fn session_page(id: Uuid, history: Option<&SessionHistory>) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>ADF Pipeline Agent</title>\
<style>{}</style></head><body><h1>ADF Pipeline Agent</h1>\
<form method=\"post\" action=\"/sessions/{id}/ask\">\
<input type=\"text\" name=\"question\" size=\"80\" placeholder=\"Ask about your pipelines\">\
<button type=\"submit\">Send</button></form>\
<form method=\"post\" action=\"/sessions/{id}/clear\"><button type=\"submit\">Clear history</button></form>",
        STYLE,
        id = id
    );

    out.push_str("<div class=\"panels\"><div class=\"panel\"><h2>Summary</h2>");
    match history {
        None => out.push_str("<p>A query is running for this session. Refresh in a moment.</p>"),
        Some(history) => match history.latest() {
            Some(result) => render_summary(&mut out, result),
            None => out.push_str("<p>No results yet.</p>"),
        },
    }

    if let Some(history) = history.filter(|h| h.len() > 1) {
        out.push_str("<h3>History</h3><ol>");
        for result in history.iter() {
            let _ = write!(
                out,
                "<li>{} {}</li>",
                status_badge(result),
                escape_html(&result.query)
            );
        }
        out.push_str("</ol>");
    }

    out.push_str("</div><div class=\"panel details\"><h2>Details</h2>");
    if let Some(result) = history.and_then(|h| h.latest()) {
        render_details(&mut out, result);
    }
    out.push_str("</div></div></body></html>");
    out
}
