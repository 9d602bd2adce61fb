//! The "requires action" payload and the replies the driver submits for it
//!
//! The service reports required actions in several shapes depending on API
//! version: a typed envelope (`submit_tool_approval` / `submit_tool_outputs`)
//! or a bare `tool_calls` list, with function calls either nested under a
//! `function` object or flattened. All of them are decoded here, once, into
//! [`RequiredAction`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A decoded required action
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawRequiredAction")]
pub enum RequiredAction {
    /// Tool calls that only need a yes/no approval (e.g. MCP documentation lookups)
    ApprovalRequest { calls: Vec<ApprovalCall> },
    /// Function calls whose outputs must be computed locally and submitted
    FunctionCallRequest { calls: Vec<FunctionCall> },
}

impl RequiredAction {
    pub fn call_count(&self) -> usize {
        match self {
            RequiredAction::ApprovalRequest { calls } => calls.len(),
            RequiredAction::FunctionCallRequest { calls } => calls.len(),
        }
    }
}

/// A tool call awaiting approval
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalCall {
    pub id: String,
    pub kind: String,
    pub name: Option<String>,
    pub arguments: Option<String>,
    pub server_label: Option<String>,
}

impl ApprovalCall {
    /// Only MCP calls are approved; anything else in an approval envelope is left alone
    pub fn is_approvable(&self) -> bool {
        self.kind == "mcp"
    }
}

/// A function call requested by the agent
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub id: String,
    pub name: Option<String>,
    /// Raw JSON argument string as sent by the service
    pub arguments: Option<String>,
}

/// Approval reply for one tool call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolApproval {
    pub tool_call_id: String,
    pub approve: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl ToolApproval {
    pub fn approve(tool_call_id: impl Into<String>, headers: BTreeMap<String, String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            approve: true,
            headers,
        }
    }
}

/// Output reply for one function call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

#[derive(Deserialize)]
struct RawRequiredAction {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    submit_tool_approval: Option<RawCallList>,
    #[serde(default)]
    submit_tool_outputs: Option<RawCallList>,
    #[serde(default)]
    tool_calls: Option<Vec<RawRequiredCall>>,
}

#[derive(Deserialize)]
struct RawCallList {
    #[serde(default)]
    tool_calls: Option<Vec<RawRequiredCall>>,
}

#[derive(Deserialize)]
struct RawRequiredCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<Value>,
    #[serde(default)]
    server_label: Option<String>,
    #[serde(default)]
    function: Option<RawFunction>,
}

#[derive(Deserialize)]
struct RawFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<Value>,
}

impl From<RawRequiredAction> for RequiredAction {
    fn from(raw: RawRequiredAction) -> Self {
        // Approval and function envelopes are treated as mutually exclusive.
        // The type tag wins; without one the approval envelope is checked first.
        let is_approval = match raw.kind.as_deref() {
            Some("submit_tool_approval") => true,
            Some("submit_tool_outputs") => false,
            _ => raw.submit_tool_approval.is_some(),
        };

        if is_approval {
            let calls = raw
                .submit_tool_approval
                .and_then(|list| list.tool_calls)
                .or(raw.tool_calls)
                .unwrap_or_default();
            RequiredAction::ApprovalRequest {
                calls: calls.into_iter().map(ApprovalCall::from).collect(),
            }
        } else {
            let calls = raw
                .submit_tool_outputs
                .and_then(|list| list.tool_calls)
                .or(raw.tool_calls)
                .unwrap_or_default();
            RequiredAction::FunctionCallRequest {
                calls: calls.into_iter().map(FunctionCall::from).collect(),
            }
        }
    }
}

impl From<RawRequiredCall> for ApprovalCall {
    fn from(raw: RawRequiredCall) -> Self {
        let kind = raw.kind.unwrap_or_else(|| {
            if raw.server_label.is_some() {
                "mcp".to_string()
            } else {
                "unknown".to_string()
            }
        });
        let (fn_name, fn_args) = match raw.function {
            Some(f) => (f.name, f.arguments),
            None => (None, None),
        };
        ApprovalCall {
            id: raw.id.unwrap_or_default(),
            kind,
            name: raw.name.or(fn_name),
            arguments: raw.arguments.or(fn_args).map(argument_text),
            server_label: raw.server_label,
        }
    }
}

impl From<RawRequiredCall> for FunctionCall {
    fn from(raw: RawRequiredCall) -> Self {
        let (fn_name, fn_args) = match raw.function {
            Some(f) => (f.name, f.arguments),
            None => (None, None),
        };
        FunctionCall {
            id: raw.id.unwrap_or_default(),
            name: fn_name.or(raw.name),
            arguments: fn_args.or(raw.arguments).map(argument_text),
        }
    }
}

/// Arguments arrive as a JSON-encoded string, or occasionally as an inline object
fn argument_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
