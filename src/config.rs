//! Runtime configuration for Hermes
//!
//! Behavior is controlled entirely through environment variables, read
//! once at process start: `HERMES_*` settings via the config crate's
//! Environment source, with the conventional provider key names
//! (`MISTRAL_API_KEY`, `GEMINI_API_KEY`, `OPENROUTER_API_KEY`) accepted as
//! fallbacks. Credential validation happens before any network activity.

use crate::error::{HermesError, Result};
use serde::Deserialize;
use std::env;

/// Text-generation provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Mistral,
    Gemini,
    Openrouter,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Mistral => "mistral",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Openrouter => "openrouter",
        }
    }
}

/// Where the MCP server lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Spawn a child process and speak newline-delimited JSON-RPC
    Stdio { program: String, args: Vec<String> },
    /// POST to an HTTP endpoint
    Http { url: String },
}

/// Settings read from the environment
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Which provider drives the tool loop (HERMES_PROVIDER)
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,

    /// HTTP MCP endpoint (HERMES_MCP_URL); ignored when mcp_cmd is set
    #[serde(default = "default_mcp_url")]
    pub mcp_url: String,

    /// Command line for a stdio MCP server (HERMES_MCP_CMD)
    #[serde(default)]
    pub mcp_cmd: Option<String>,

    /// Bearer token for the HTTP MCP endpoint (HERMES_MCP_TOKEN)
    #[serde(default)]
    pub mcp_token: Option<String>,

    /// Model override for the selected provider (HERMES_MODEL)
    #[serde(default)]
    pub model: Option<String>,

    /// System prompt override (HERMES_SYSTEM_PROMPT)
    #[serde(default)]
    pub system_prompt: Option<String>,

    #[serde(default)]
    pub mistral_api_key: Option<String>,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub openrouter_api_key: Option<String>,
}

fn default_provider() -> ProviderKind {
    ProviderKind::Mistral
}

fn default_mcp_url() -> String {
    "http://localhost:3000/mcp".to_string()
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

impl Settings {
    /// Read settings from the environment
    pub fn from_env() -> Result<Self> {
        let source = config::Config::builder()
            .add_source(config::Environment::with_prefix("HERMES"))
            .build()?;
        let mut settings: Settings = source.try_deserialize()?;

        // Conventional unprefixed key names as fallback
        settings.mistral_api_key = settings
            .mistral_api_key
            .take()
            .or_else(|| non_empty_env("MISTRAL_API_KEY"));
        settings.gemini_api_key = settings
            .gemini_api_key
            .take()
            .or_else(|| non_empty_env("GEMINI_API_KEY"));
        settings.openrouter_api_key = settings
            .openrouter_api_key
            .take()
            .or_else(|| non_empty_env("OPENROUTER_API_KEY"));

        Ok(settings)
    }

    /// API key for the selected provider.
    ///
    /// Missing credentials are a configuration error and abort before any
    /// network activity.
    pub fn api_key(&self) -> Result<&str> {
        let (key, var) = match self.provider {
            ProviderKind::Mistral => (&self.mistral_api_key, "MISTRAL_API_KEY"),
            ProviderKind::Gemini => (&self.gemini_api_key, "GEMINI_API_KEY"),
            ProviderKind::Openrouter => (&self.openrouter_api_key, "OPENROUTER_API_KEY"),
        };
        key.as_deref().ok_or_else(|| {
            HermesError::config(format!(
                "{var} not set (required for provider '{}')",
                self.provider.as_str()
            ))
        })
    }

    /// Resolve which MCP transport to use. A stdio command, when set,
    /// takes precedence over the HTTP endpoint.
    pub fn endpoint(&self) -> Result<Endpoint> {
        if let Some(cmd) = self.mcp_cmd.as_deref().filter(|c| !c.trim().is_empty()) {
            let mut parts = cmd.split_whitespace().map(String::from);
            let program = parts
                .next()
                .ok_or_else(|| HermesError::config("HERMES_MCP_CMD is empty"))?;
            return Ok(Endpoint::Stdio {
                program,
                args: parts.collect(),
            });
        }
        Ok(Endpoint::Http {
            url: self.mcp_url.clone(),
        })
    }
}

/// Truncate a secret for display.
///
/// Errors and logs show enough of a token to tell credentials apart
/// without leaking the full value.
pub fn redact(secret: &str) -> String {
    let shown: String = secret.chars().take(8).collect();
    if shown.len() == secret.len() {
        "********".to_string()
    } else {
        format!("{shown}…")
    }
}
