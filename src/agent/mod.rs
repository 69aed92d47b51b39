// src/agent/mod.rs
//! Refinement agent: provider abstraction, config and factory.
//!
//! An agent turns a student's free-text request plus their current profile
//! into a structured profile patch. The trait keeps the rest of the service
//! provider-agnostic; tests swap in [`MockAgent`], deployments without an
//! LLM run with [`DisabledAgent`].

pub mod openai;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::{env, fs, path::Path};
use tracing::{debug, warn};

pub use openai::OpenAiAgent;

pub const AGENT_CONFIG_ENV: &str = "AGENT_CONFIG_PATH";
const DEFAULT_AGENT_CONFIG_PATH: &str = "config/agent.json";

/// Errors surfaced by refinement agents.
#[derive(Debug)]
pub enum AgentError {
    /// Refinement is switched off for this deployment.
    Disabled,
    /// The agent was built without an API key.
    MissingCredential,
    /// The transport failed before a response arrived.
    Http(reqwest::Error),
    /// The provider answered with a non-success status.
    Status(reqwest::StatusCode),
    /// The provider answered, but not with a usable patch.
    Malformed(String),
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentError::Disabled => write!(f, "refinement agent is disabled"),
            AgentError::MissingCredential => write!(f, "refinement agent has no API key"),
            AgentError::Http(err) => write!(f, "agent transport error: {}", err),
            AgentError::Status(status) => write!(f, "agent returned status {}", status),
            AgentError::Malformed(detail) => write!(f, "agent reply unusable: {}", detail),
        }
    }
}

impl std::error::Error for AgentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AgentError::Http(err) => Some(err),
            _ => None,
        }
    }
}

/// Trait object used by the session and the HTTP layer.
#[async_trait::async_trait]
pub trait RefineAgent: Send + Sync {
    /// Turn a free-text request into a partial profile patch.
    async fn refine(&self, profile: &Value, message: &str) -> Result<Value, AgentError>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynRefineAgent = Arc<dyn RefineAgent>;

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_connect_timeout() -> u64 {
    4
}
fn default_request_timeout() -> u64 {
    10
}

/// Agent config loaded from `config/agent.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub enabled: bool,
    /// "openai" (case-insensitive); anything else builds a disabled agent.
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from OPENAI_API_KEY.
    pub api_key: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "openai".to_string(),
            model: default_model(),
            api_key: "ENV".to_string(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl AgentConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: AgentConfig = serde_json::from_str(&data)?;

        cfg.provider = cfg.provider.to_lowercase();

        // Resolve api key if "ENV". An absent variable resolves to empty;
        // the agent reports MissingCredential on first use rather than
        // blocking startup for deployments that never refine.
        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        }

        Ok(cfg)
    }

    /// Resolve `AGENT_CONFIG_PATH` (or the conventional location) and load.
    /// A missing or broken file yields the disabled default.
    pub fn load() -> Self {
        let path =
            env::var(AGENT_CONFIG_ENV).unwrap_or_else(|_| DEFAULT_AGENT_CONFIG_PATH.to_string());
        let path = Path::new(&path);
        if !path.exists() {
            debug!(path = %path.display(), "no agent config file; refinement disabled");
            return Self::default();
        }
        match Self::load_from_file(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!(error = %err, path = %path.display(), "agent config unusable; refinement disabled");
                Self::default()
            }
        }
    }
}

/// Factory: build an agent according to config and environment.
///
/// * If `AGENT_TEST_MODE=mock`, returns a deterministic mock agent.
/// * Else if `config.enabled==false`, returns a disabled agent.
/// * Else builds the real provider.
pub fn build_agent(config: &AgentConfig) -> DynRefineAgent {
    if env::var("AGENT_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockAgent::default());
    }

    if !config.enabled {
        return Arc::new(DisabledAgent);
    }

    match config.provider.as_str() {
        "openai" => Arc::new(OpenAiAgent::new(config)),
        other => {
            warn!(provider = other, "unknown agent provider; refinement disabled");
            Arc::new(DisabledAgent)
        }
    }
}

/// Always fails; used when refinement is switched off.
pub struct DisabledAgent;

#[async_trait::async_trait]
impl RefineAgent for DisabledAgent {
    async fn refine(&self, _profile: &Value, _message: &str) -> Result<Value, AgentError> {
        Err(AgentError::Disabled)
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic agent for tests and local runs.
#[derive(Clone)]
pub struct MockAgent {
    pub patch: Value,
}

impl Default for MockAgent {
    fn default() -> Self {
        Self {
            patch: json!({ "preferences": { "campus_setting": "urban" } }),
        }
    }
}

#[async_trait::async_trait]
impl RefineAgent for MockAgent {
    async fn refine(&self, _profile: &Value, _message: &str) -> Result<Value, AgentError> {
        Ok(self.patch.clone())
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[tokio::test]
    async fn mock_agent_returns_its_patch() {
        let agent = MockAgent {
            patch: json!({ "languages": ["fr"] }),
        };
        let patch = agent.refine(&json!({}), "prefer french").await.unwrap();
        assert_eq!(patch, json!({ "languages": ["fr"] }));
        assert_eq!(agent.name(), "mock");
    }

    #[tokio::test]
    async fn disabled_agent_always_fails() {
        let err = DisabledAgent.refine(&json!({}), "anything").await.unwrap_err();
        assert!(matches!(err, AgentError::Disabled));
    }

    #[test]
    #[serial]
    fn factory_prefers_mock_mode_over_config() {
        env::set_var("AGENT_TEST_MODE", "mock");
        let agent = build_agent(&AgentConfig {
            enabled: true,
            ..AgentConfig::default()
        });
        assert_eq!(agent.name(), "mock");
        env::remove_var("AGENT_TEST_MODE");
    }

    #[test]
    #[serial]
    fn factory_disables_unknown_providers() {
        env::remove_var("AGENT_TEST_MODE");
        let disabled = build_agent(&AgentConfig::default());
        assert_eq!(disabled.name(), "disabled");

        let unknown = build_agent(&AgentConfig {
            enabled: true,
            provider: "azure".to_string(),
            ..AgentConfig::default()
        });
        assert_eq!(unknown.name(), "disabled");
    }

    #[test]
    #[serial]
    fn config_resolves_env_api_key_leniently() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.json");
        std::fs::write(
            &path,
            r#"{ "enabled": true, "provider": "OpenAI", "api_key": "ENV" }"#,
        )
        .unwrap();

        env::set_var("OPENAI_API_KEY", "sk-test");
        let cfg = AgentConfig::load_from_file(&path).unwrap();
        assert_eq!(cfg.provider, "openai");
        assert_eq!(cfg.api_key, "sk-test");
        assert_eq!(cfg.model, "gpt-4o-mini");
        assert_eq!(cfg.connect_timeout_secs, 4);

        env::remove_var("OPENAI_API_KEY");
        let cfg = AgentConfig::load_from_file(&path).unwrap();
        assert!(cfg.api_key.is_empty());
    }
}
