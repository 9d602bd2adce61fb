//! Settings read from the environment (and `.env`, loaded by the binaries)

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::adf::FactoryRef;
use crate::driver::PollPolicy;

pub const DEFAULT_MCP_SERVER_URL: &str = "https://learn.microsoft.com/api/mcp";
pub const DEFAULT_MCP_SERVER_LABEL: &str = "MicrosoftLearn";
pub const DEFAULT_PIPELINE: &str = "processELT";
pub const DEFAULT_LOOKBACK_HOURS: i64 = 48;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which tools the agent gets besides the documentation lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Toolset {
    /// Local ADF function tools
    #[default]
    Functions,
    /// Hosted code interpreter, no local functions
    CodeInterpreter,
}

impl FromStr for Toolset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "functions" | "function" => Ok(Toolset::Functions),
            "code_interpreter" | "code-interpreter" => Ok(Toolset::CodeInterpreter),
            other => Err(format!("expected `functions` or `code_interpreter`, got `{}`", other)),
        }
    }
}

impl Toolset {
    pub fn as_str(self) -> &'static str {
        match self {
            Toolset::Functions => "functions",
            Toolset::CodeInterpreter => "code_interpreter",
        }
    }
}

/// Documentation-lookup MCP server
#[derive(Debug, Clone, PartialEq)]
pub struct McpSettings {
    pub server_url: String,
    pub server_label: String,
    /// Sent along with every approval
    pub headers: BTreeMap<String, String>,
}

impl Default for McpSettings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_MCP_SERVER_URL.to_string(),
            server_label: DEFAULT_MCP_SERVER_LABEL.to_string(),
            headers: BTreeMap::new(),
        }
    }
}

/// What is needed to talk to the real services
#[derive(Debug, Clone, PartialEq)]
pub struct AzureSettings {
    pub project_endpoint: String,
    pub model_deployment: String,
    pub factory: FactoryRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// `None` only when Azure settings were not required (demo mode) and are incomplete
    pub azure: Option<AzureSettings>,
    pub mcp: McpSettings,
    pub toolset: Toolset,
    pub default_pipeline: String,
    pub lookback_hours: i64,
    pub poll: PollPolicy,
    pub log_file: Option<PathBuf>,
    pub api_version: String,
}

impl Settings {
    pub fn from_env(require_azure: bool) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), require_azure)
    }

    pub fn from_lookup<F>(lookup: F, require_azure: bool) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let azure = {
            let keys = [
                "PROJECT_ENDPOINT",
                "MODEL_DEPLOYMENT_NAME",
                "AZURE_SUBSCRIPTION_ID",
                "AZURE_RESOURCE_GROUP",
                "AZURE_DATA_FACTORY_NAME",
            ];
            let values: Vec<Option<String>> = keys.iter().map(|k| get(*k)).collect();
            if let Some(missing) = keys.iter().zip(&values).find(|(_, v)| v.is_none()).map(|(k, _)| *k) {
                if require_azure {
                    return Err(ConfigError::Missing(missing));
                }
                None
            } else {
                let mut values = values.into_iter().flatten();
                let mut next = || values.next().unwrap_or_default();
                Some(AzureSettings {
                    project_endpoint: next(),
                    model_deployment: next(),
                    factory: FactoryRef {
                        subscription_id: next(),
                        resource_group: next(),
                        factory_name: next(),
                    },
                })
            }
        };

        let mcp = McpSettings {
            server_url: get("MCP_SERVER_URL").unwrap_or_else(|| DEFAULT_MCP_SERVER_URL.to_string()),
            server_label: get("MCP_SERVER_LABEL").unwrap_or_else(|| DEFAULT_MCP_SERVER_LABEL.to_string()),
            headers: BTreeMap::new(),
        };

        let toolset = match get("ADF_AGENT_TOOLSET") {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                var: "ADF_AGENT_TOOLSET",
                value: raw.clone(),
                reason,
            })?,
            None => Toolset::default(),
        };

        let lookback_hours = parse_number(&get, "ADF_LOOKBACK_HOURS", DEFAULT_LOOKBACK_HOURS)?;
        let defaults = PollPolicy::default();
        let interval_ms = parse_number(
            &get,
            "ADF_POLL_INTERVAL_MS",
            defaults.interval.as_millis() as u64,
        )?;
        let max_attempts = parse_number(&get, "ADF_POLL_MAX_ATTEMPTS", defaults.max_attempts)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "ADF_POLL_MAX_ATTEMPTS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        Ok(Self {
            azure,
            mcp,
            toolset,
            default_pipeline: get("ADF_DEFAULT_PIPELINE").unwrap_or_else(|| DEFAULT_PIPELINE.to_string()),
            lookback_hours,
            poll: PollPolicy {
                max_attempts,
                interval: Duration::from_millis(interval_ms),
            },
            log_file: get("ADF_AGENT_LOG_FILE").map(PathBuf::from),
            api_version: get("AGENTS_API_VERSION")
                .unwrap_or_else(|| foundry_agents_client::DEFAULT_API_VERSION.to_string()),
        })
    }

    /// Azure settings, or the error naming the first missing variable
    pub fn require_azure(&self) -> Result<&AzureSettings, ConfigError> {
        self.azure
            .as_ref()
            .ok_or(ConfigError::Missing("PROJECT_ENDPOINT"))
    }
}

fn parse_number<F, T>(get: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
