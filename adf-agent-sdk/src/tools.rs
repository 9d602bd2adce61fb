//! Tool definitions registered with an agent

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A tool the agent may use
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolDefinition {
    /// Remote MCP server (documentation lookup); calls arrive as approval requests
    Mcp {
        server_label: String,
        server_url: String,
        allowed_tools: Vec<String>,
    },
    /// Locally executed function; calls arrive as function-call requests
    Function { function: FunctionDefinition },
    /// Hosted code execution; runs entirely on the service
    CodeInterpreter,
}

impl ToolDefinition {
    pub fn label(&self) -> &str {
        match self {
            ToolDefinition::Mcp { server_label, .. } => server_label,
            ToolDefinition::Function { function } => &function.name,
            ToolDefinition::CodeInterpreter => "code_interpreter",
        }
    }
}

/// JSON-schema description of a function tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Per-run resources for tools that need them
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolResources {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mcp: Vec<McpToolResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct McpToolResource {
    pub server_label: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    pub require_approval: String,
}

/// Argument struct for a local function tool.
///
/// Implemented with `#[derive(FunctionTool)]`, which derives the schema from the
/// struct's fields and its `#[tool(...)]` / `#[param(...)]` attributes.
pub trait FunctionTool: DeserializeOwned + Default {
    fn tool_name() -> &'static str;

    fn definition() -> FunctionDefinition;

    fn tool_definition() -> ToolDefinition {
        ToolDefinition::Function {
            function: Self::definition(),
        }
    }

    /// Lenient argument decoding: missing, empty or malformed arguments yield
    /// the default value so the caller can apply its own fallbacks.
    fn parse_arguments(raw: Option<&str>) -> Self {
        raw.map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_definitions_serialize_as_a_flat_tagged_list() {
        let tools = vec![
            ToolDefinition::Mcp {
                server_label: "MicrosoftLearn".into(),
                server_url: "https://learn.microsoft.com/api/mcp".into(),
                allowed_tools: vec![],
            },
            ToolDefinition::CodeInterpreter,
        ];
        assert_eq!(
            serde_json::to_value(&tools).unwrap(),
            json!([
                {"type": "mcp", "server_label": "MicrosoftLearn", "server_url": "https://learn.microsoft.com/api/mcp", "allowed_tools": []},
                {"type": "code_interpreter"}
            ])
        );
    }

    #[derive(Debug, Default, PartialEq, serde::Deserialize)]
    struct Args {
        name: Option<String>,
    }

    impl FunctionTool for Args {
        fn tool_name() -> &'static str {
            "args"
        }

        fn definition() -> FunctionDefinition {
            FunctionDefinition {
                name: "args".into(),
                description: String::new(),
                parameters: json!({}),
            }
        }
    }

    #[test]
    fn parse_arguments_falls_back_to_default() {
        assert_eq!(Args::parse_arguments(None), Args::default());
        assert_eq!(Args::parse_arguments(Some("  ")), Args::default());
        assert_eq!(Args::parse_arguments(Some("not json")), Args::default());
        assert_eq!(
            Args::parse_arguments(Some(r#"{"name":"x"}"#)),
            Args {
                name: Some("x".into())
            }
        );
    }
}
