//! Turns the raw run, steps and messages into an [`AgentResult`]

use serde_json::Value;
use std::collections::HashMap;

use adf_agent_sdk::{
    ActivityTool, AgentResult, ResultMessage, Run, RunStatus, RunStep, StepRecord,
    StepToolCall, ThreadMessage, ToolCallRecord,
};

/// Display strings are capped at this many characters
pub const MAX_OUTPUT_CHARS: usize = 8000;

pub const NO_ASSISTANT_RESPONSE: &str = "No assistant response.";

/// Cap a display string at [`MAX_OUTPUT_CHARS`] characters
pub fn truncate_output(text: &str) -> String {
    match text.char_indices().nth(MAX_OUTPUT_CHARS) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Characters of debug log the dashboards show
pub const LOG_TAIL_CHARS: usize = 15000;

/// Last `max` characters of `text`, on a char boundary
pub fn tail_chars(text: &str, max: usize) -> &str {
    let count = text.chars().count();
    if count <= max {
        return text;
    }
    match text.char_indices().nth(count - max) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// Render one output value for display
pub fn display_output(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    };
    truncate_output(&text)
}

/// Empty strings, empty containers, null and `false` carry nothing worth showing
fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}

/// Build the result for a finished run.
///
/// `local_outputs` maps tool-call ids to outputs computed here, used when the
/// service did not echo an output back on the step. Step-level notes are
/// appended to `log`.
pub fn normalize(
    query: &str,
    run: &Run,
    steps: &[RunStep],
    messages: &[ThreadMessage],
    local_outputs: &HashMap<String, String>,
    mut log: Vec<String>,
) -> AgentResult {
    let steps = steps
        .iter()
        .map(|step| normalize_step(step, local_outputs, &mut log))
        .collect();

    let messages: Vec<ResultMessage> = messages
        .iter()
        .map(|m| ResultMessage {
            role: m.role.clone(),
            content: m.last_text().unwrap_or_default().to_string(),
        })
        .collect();

    let summary = messages
        .iter()
        .rev()
        .find(|m| m.role == "assistant")
        .map(|m| m.content.clone())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| NO_ASSISTANT_RESPONSE.to_string());

    let error = match run.status {
        RunStatus::Failed => Some(
            run.last_error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "run failed without error detail".to_string()),
        ),
        _ => None,
    };

    AgentResult {
        query: query.to_string(),
        summary,
        status: run.status,
        error,
        messages,
        steps,
        token_usage: run.usage.clone().filter(|u| !u.is_empty()),
        log,
    }
}

fn normalize_step(step: &RunStep, local_outputs: &HashMap<String, String>, log: &mut Vec<String>) -> StepRecord {
    let mut outputs = Vec::new();
    let tool_calls: Vec<ToolCallRecord> = step
        .step_details
        .tool_calls()
        .iter()
        .map(|call| {
            let record = tool_call_record(call, local_outputs);
            if let Some(output) = record.output.as_ref().filter(|o| has_content(o)) {
                outputs.push(display_output(output));
            }
            outputs.extend(record.nested_outputs.iter().map(display_output));
            log.push(format!(
                "Step {} tool_call {} type={}",
                step.id,
                record.id.as_deref().unwrap_or("?"),
                record.kind.as_deref().unwrap_or("?")
            ));
            record
        })
        .collect();

    let mut activity_tools = Vec::new();
    for activity in step.step_details.activities() {
        for (function, definition) in &activity.tools {
            log.push(format!("Activity tool def: {}", function));
            activity_tools.push(ActivityTool {
                function: function.clone(),
                description: definition.description.clone(),
                parameters: definition.parameter_names(),
            });
        }
    }

    log.push(format!(
        "Step {} [{}] with {} tool calls and {} outputs",
        step.id,
        step.status.as_deref().unwrap_or("unknown"),
        tool_calls.len(),
        outputs.len()
    ));

    StepRecord {
        id: step.id.clone(),
        status: step.status.clone(),
        tool_calls,
        activity_tools,
        outputs,
    }
}

fn tool_call_record(call: &StepToolCall, local_outputs: &HashMap<String, String>) -> ToolCallRecord {
    let output = call.output.clone().filter(has_content).or_else(|| {
        call.id
            .as_ref()
            .and_then(|id| local_outputs.get(id))
            .map(|text| Value::String(text.clone()))
    });

    ToolCallRecord {
        id: call.id.clone(),
        kind: call.kind.clone(),
        name: call.name.clone(),
        arguments: call.arguments.clone(),
        output,
        nested_outputs: call.nested_outputs.clone(),
    }
}
