//! Run steps as listed by the service

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One unit of progress within a run
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunStep {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub step_details: StepDetails,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepDetails {
    ToolCalls {
        #[serde(default)]
        tool_calls: Vec<StepToolCall>,
    },
    MessageCreation {
        #[serde(default)]
        message_creation: Option<Value>,
    },
    Activities {
        #[serde(default)]
        activities: Vec<StepActivity>,
    },
    #[default]
    #[serde(other)]
    Other,
}

impl StepDetails {
    pub fn tool_calls(&self) -> &[StepToolCall] {
        match self {
            StepDetails::ToolCalls { tool_calls } => tool_calls,
            _ => &[],
        }
    }

    pub fn activities(&self) -> &[StepActivity] {
        match self {
            StepDetails::Activities { activities } => activities,
            _ => &[],
        }
    }
}

/// A tool call recorded on a step, flattened across the function, MCP and
/// code-interpreter shapes
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "RawStepToolCall")]
pub struct StepToolCall {
    pub id: Option<String>,
    pub kind: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<Value>,
    pub output: Option<Value>,
    /// Execution artifacts from sub-executions (code interpreter logs, images)
    pub nested_outputs: Vec<Value>,
    pub server_label: Option<String>,
}

/// Tool listing surfaced by an MCP activity step
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StepActivity {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub server_label: Option<String>,
    #[serde(default)]
    pub tools: BTreeMap<String, ActivityFunction>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActivityFunction {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Option<Value>,
}

impl ActivityFunction {
    /// Names of the declared JSON-schema properties
    pub fn parameter_names(&self) -> Vec<String> {
        self.parameters
            .as_ref()
            .and_then(|p| p.get("properties"))
            .and_then(Value::as_object)
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct RawStepToolCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<Value>,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    server_label: Option<String>,
    #[serde(default)]
    function: Option<RawStepFunction>,
    #[serde(default)]
    code_interpreter: Option<RawCodeInterpreter>,
}

#[derive(Deserialize)]
struct RawStepFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<Value>,
    #[serde(default)]
    output: Option<Value>,
}

#[derive(Deserialize)]
struct RawCodeInterpreter {
    #[serde(default)]
    input: Option<String>,
    #[serde(default)]
    outputs: Vec<Value>,
}

impl From<RawStepToolCall> for StepToolCall {
    fn from(raw: RawStepToolCall) -> Self {
        let (fn_name, fn_args, fn_output) = match raw.function {
            Some(f) => (f.name, f.arguments, f.output),
            None => (None, None, None),
        };
        let (code_input, nested_outputs) = match raw.code_interpreter {
            Some(ci) => (ci.input.map(Value::String), ci.outputs),
            None => (None, Vec::new()),
        };

        StepToolCall {
            id: raw.id,
            kind: raw.kind,
            name: raw.name.or(fn_name),
            arguments: non_null(raw.arguments)
                .or_else(|| non_null(fn_args))
                .or(code_input),
            output: non_null(raw.output).or_else(|| non_null(fn_output)),
            nested_outputs,
            server_label: raw.server_label,
        }
    }
}

fn non_null(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_null())
}
