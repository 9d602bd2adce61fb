//! Client for the hosted agent service
//!
//! Two pieces:
//! - [`credential`]: bearer-token providers for Azure (static token, service
//!   principal, managed identity, Azure CLI) chained by [`DefaultAzureCredential`]
//! - [`client`]: [`AgentsClient`], the REST implementation of
//!   [`adf_agent_sdk::AgentService`]

pub mod client;
pub mod credential;

pub use client::{AgentsClient, AGENTS_SCOPE, DEFAULT_API_VERSION};
pub use credential::{
    AccessToken, AzureCliCredential, ClientSecretCredential, CredentialError,
    DefaultAzureCredential, ManagedIdentityCredential, StaticTokenCredential, TokenCredential,
};
