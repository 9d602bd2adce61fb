//! Azure access-token providers
//!
//! Every call to the agent service and to the management plane carries a bearer
//! token. [`DefaultAzureCredential`] resolves one from whichever source the
//! environment provides, in this order:
//!
//! 1. `AZURE_ACCESS_TOKEN` (a pre-issued token, mostly for CI)
//! 2. Service principal (`AZURE_TENANT_ID` / `AZURE_CLIENT_ID` / `AZURE_CLIENT_SECRET`)
//! 3. Managed identity (App Service `IDENTITY_ENDPOINT`, otherwise IMDS)
//! 4. The Azure CLI login (`az account get-access-token`)
//!
//! Tokens are cached per scope and reused until five minutes before expiry.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Tokens closer than this to expiry are refreshed
const REFRESH_MARGIN_SECS: i64 = 300;

const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }

    /// True while the token has more than the refresh margin left
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_on - now > Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("{source_name} unavailable: {reason}")]
    Unavailable {
        source_name: &'static str,
        reason: String,
    },

    #[error("{source_name} failed: {reason}")]
    Failed {
        source_name: &'static str,
        reason: String,
    },

    #[error("no credential source succeeded: {}", .0.join("; "))]
    Exhausted(Vec<String>),
}

/// A source of bearer tokens
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError>;
}

/// Fixed token, typically from `AZURE_ACCESS_TOKEN`
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    fn name(&self) -> &'static str {
        "static token"
    }

    async fn get_token(&self, _scope: &str) -> Result<AccessToken, CredentialError> {
        // Lifetime is unknown; report an hour so the cache keeps it around.
        Ok(AccessToken::new(
            self.token.clone(),
            Utc::now() + Duration::hours(1),
        ))
    }
}

/// OAuth2 client-credentials flow for a service principal
pub struct ClientSecretCredential {
    http: reqwest::Client,
    authority: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

impl ClientSecretCredential {
    pub fn new(
        http: reqwest::Client,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            authority: AUTHORITY_HOST.to_string(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Override the authority host (sovereign clouds, tests)
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }
}

#[derive(Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    expires_in: i64,
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    fn name(&self) -> &'static str {
        "client secret"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority.trim_end_matches('/'),
            self.tenant_id
        );
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
        ];

        let response = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| failed(self.name(), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(failed(self.name(), format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let parsed: OAuthTokenResponse = response.json().await.map_err(|e| failed(self.name(), e))?;
        Ok(AccessToken::new(
            parsed.access_token,
            Utc::now() + Duration::seconds(parsed.expires_in),
        ))
    }
}

/// Managed identity, via the App Service identity endpoint or IMDS
pub struct ManagedIdentityCredential {
    http: reqwest::Client,
    endpoint: Option<(String, String)>,
    client_id: Option<String>,
}

impl ManagedIdentityCredential {
    /// `endpoint` is the App Service `(IDENTITY_ENDPOINT, IDENTITY_HEADER)` pair;
    /// without it the instance metadata service is used.
    pub fn new(http: reqwest::Client, endpoint: Option<(String, String)>, client_id: Option<String>) -> Self {
        Self {
            http,
            endpoint,
            client_id,
        }
    }
}

#[derive(Deserialize)]
struct ManagedIdentityResponse {
    access_token: String,
    #[serde(default)]
    expires_on: Option<serde_json::Value>,
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    fn name(&self) -> &'static str {
        "managed identity"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let resource = scope_to_resource(scope);
        let mut query: Vec<(&str, &str)> = vec![("resource", resource)];
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id));
        }

        let request = match &self.endpoint {
            Some((url, header)) => {
                query.push(("api-version", "2019-08-01"));
                self.http
                    .get(url)
                    .header("X-IDENTITY-HEADER", header)
                    .query(&query)
            }
            None => {
                query.push(("api-version", "2018-02-01"));
                self.http
                    .get(IMDS_ENDPOINT)
                    .header("Metadata", "true")
                    .query(&query)
                    .timeout(std::time::Duration::from_secs(2))
            }
        };

        let response = request.send().await.map_err(|e| CredentialError::Unavailable {
            source_name: self.name(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(failed(self.name(), format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let parsed: ManagedIdentityResponse =
            response.json().await.map_err(|e| failed(self.name(), e))?;
        let expires_on = parsed
            .expires_on
            .as_ref()
            .and_then(parse_epoch_value)
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        Ok(AccessToken::new(parsed.access_token, expires_on))
    }
}

/// Token from the local Azure CLI login
pub struct AzureCliCredential {
    program: String,
}

impl AzureCliCredential {
    pub fn new() -> Self {
        Self {
            program: "az".to_string(),
        }
    }
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_on: Option<String>,
    #[serde(default, rename = "expires_on")]
    expires_on_epoch: Option<i64>,
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    fn name(&self) -> &'static str {
        "azure cli"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let output = tokio::process::Command::new(&self.program)
            .args(["account", "get-access-token", "--scope", scope, "-o", "json"])
            .output()
            .await
            .map_err(|e| CredentialError::Unavailable {
                source_name: self.name(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(self.name(), stderr.trim().to_string()));
        }

        parse_cli_token(&output.stdout).map_err(|reason| failed(self.name(), reason))
    }
}

fn parse_cli_token(stdout: &[u8]) -> Result<AccessToken, String> {
    let parsed: CliTokenResponse = serde_json::from_slice(stdout).map_err(|e| e.to_string())?;

    let expires_on = parsed
        .expires_on_epoch
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .or_else(|| {
            // Older CLIs print local time without an offset
            parsed.expires_on.as_deref().and_then(|s| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                    .ok()
                    .and_then(|naive| chrono::Local.from_local_datetime(&naive).single())
                    .map(|local| local.with_timezone(&Utc))
            })
        })
        .unwrap_or_else(|| Utc::now() + Duration::minutes(30));

    Ok(AccessToken::new(parsed.access_token, expires_on))
}

/// Chained credential with a per-scope token cache
#[derive(Clone)]
pub struct DefaultAzureCredential {
    sources: Arc<Vec<Box<dyn TokenCredential>>>,
    cache: Arc<Mutex<HashMap<String, AccessToken>>>,
}

impl DefaultAzureCredential {
    /// Build the chain from process environment variables
    pub fn from_env(http: reqwest::Client) -> Self {
        Self::from_lookup(http, |key| std::env::var(key).ok())
    }

    /// Build the chain from an arbitrary variable lookup
    pub fn from_lookup<F>(http: reqwest::Client, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut sources: Vec<Box<dyn TokenCredential>> = Vec::new();

        if let Some(token) = get("AZURE_ACCESS_TOKEN") {
            sources.push(Box::new(StaticTokenCredential::new(token)));
        }

        if let (Some(tenant), Some(client), Some(secret)) = (
            get("AZURE_TENANT_ID"),
            get("AZURE_CLIENT_ID"),
            get("AZURE_CLIENT_SECRET"),
        ) {
            let mut credential = ClientSecretCredential::new(http.clone(), tenant, client, secret);
            if let Some(authority) = get("AZURE_AUTHORITY_HOST") {
                credential = credential.with_authority(authority);
            }
            sources.push(Box::new(credential));
        }

        let app_service = match (get("IDENTITY_ENDPOINT"), get("IDENTITY_HEADER")) {
            (Some(endpoint), Some(header)) => Some((endpoint, header)),
            _ => None,
        };
        sources.push(Box::new(ManagedIdentityCredential::new(
            http,
            app_service,
            get("AZURE_CLIENT_ID"),
        )));

        sources.push(Box::new(AzureCliCredential::new()));

        Self::with_sources(sources)
    }

    pub fn with_sources(sources: Vec<Box<dyn TokenCredential>>) -> Self {
        Self {
            sources: Arc::new(sources),
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }
}

#[async_trait]
impl TokenCredential for DefaultAzureCredential {
    fn name(&self) -> &'static str {
        "default azure credential"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let mut cache = self.cache.lock().await;
        if let Some(token) = cache.get(scope) {
            if token.is_fresh(Utc::now()) {
                return Ok(token.clone());
            }
        }

        let mut errors = Vec::new();
        for source in self.sources.iter() {
            match source.get_token(scope).await {
                Ok(token) => {
                    debug!(source = source.name(), scope, "acquired access token");
                    cache.insert(scope.to_string(), token.clone());
                    return Ok(token);
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "credential source failed");
                    errors.push(e.to_string());
                }
            }
        }

        Err(CredentialError::Exhausted(errors))
    }
}

fn failed(source_name: &'static str, reason: impl ToString) -> CredentialError {
    CredentialError::Failed {
        source_name,
        reason: reason.to_string(),
    }
}

/// `https://ai.azure.com/.default` -> `https://ai.azure.com`
fn scope_to_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}

/// Managed identity endpoints report expiry as epoch seconds, as a number or a string
fn parse_epoch_value(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    let secs = match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    }?;
    Utc.timestamp_opt(secs, 0).single()
}
