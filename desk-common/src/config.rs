//! Configuration management for the desk agent.
//!
//! Configuration lives in a single file at `~/.desk/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! ## Tool provider
//! - `ARCADE_API_KEY` → arcade.api_key
//! - `ARCADE_BASE_URL` → arcade.base_url
//! - `ARCADE_USER_ID` → arcade.user_id (required at startup)
//!
//! ## LLM
//! - `OPENAI_API_KEY` → llm.api_key
//! - `OPENAI_BASE_URL` → llm.base_url
//! - `OPENAI_MODEL` → llm.model (required at startup)
//!
//! ## Observability
//! - `DESK_LOG_LEVEL` → observability.log_level
//! - `DESK_LOG_FORMAT` → observability.log_format
//! - `DESK_CONFIRMATION_POLICY` → confirmation.policy

use crate::error::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".desk"),
        |dirs| dirs.home_dir().join(".desk"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Tool Provider
// ============================================================================

/// Hosted tool provider (Arcade) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArcadeConfig {
    /// API base URL
    #[serde(default = "default_arcade_base_url")]
    pub base_url: String,

    /// API key sent as a bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Identifies who is authorizing each service
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Default for ArcadeConfig {
    fn default() -> Self {
        Self {
            base_url: default_arcade_base_url(),
            api_key: None,
            user_id: None,
        }
    }
}

fn default_arcade_base_url() -> String {
    "https://api.arcade.dev".into()
}

// ============================================================================
// LLM
// ============================================================================

/// OpenAI-compatible chat completion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier passed to every request
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub temperature: Option<f64>,

    #[serde(default)]
    pub max_tokens: Option<i64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: None,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com".into()
}

// ============================================================================
// Agent
// ============================================================================

/// Agent definition and tool catalog selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent name shown as the author of its messages
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Label used by the lifecycle logger
    #[serde(default = "default_display_name")]
    pub display_name: String,

    /// System instructions; the built-in Zendesk prompt is used when unset
    #[serde(default)]
    pub instructions: Option<String>,

    /// Toolkits whose tools are all fetched
    #[serde(default = "default_toolkits")]
    pub toolkits: Vec<String>,

    /// Individual tools fetched in addition to the toolkits
    #[serde(default)]
    pub tools: Vec<String>,

    /// Maximum number of tool definitions fetched
    #[serde(default = "default_tool_limit")]
    pub tool_limit: usize,

    /// Maximum model calls per user turn
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Log agent lifecycle events (start, tool start/end, handoff, end)
    #[serde(default = "default_true")]
    pub log_lifecycle: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            display_name: default_display_name(),
            instructions: None,
            toolkits: default_toolkits(),
            tools: Vec::new(),
            tool_limit: default_tool_limit(),
            max_turns: default_max_turns(),
            log_lifecycle: true,
        }
    }
}

fn default_agent_name() -> String {
    "zendesk_agent".into()
}

fn default_display_name() -> String {
    "desk".into()
}

fn default_toolkits() -> Vec<String> {
    vec!["Zendesk".into()]
}

fn default_tool_limit() -> usize {
    100
}

fn default_max_turns() -> usize {
    10
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Confirmation
// ============================================================================

/// Which tool calls require human approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationPolicy {
    /// Only the tools named in `confirmation.tools`
    #[default]
    Listed,
    /// Every tool call
    All,
    /// No confirmation at all
    Off,
}

impl FromStr for ConfirmationPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "listed" | "list" => Ok(Self::Listed),
            "all" => Ok(Self::All),
            "off" | "none" => Ok(Self::Off),
            other => Err(Error::InvalidInput(format!(
                "unknown confirmation policy '{other}' (expected listed, all or off)"
            ))),
        }
    }
}

/// Human-in-the-loop confirmation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    #[serde(default)]
    pub policy: ConfirmationPolicy,

    /// Tool names (as exposed to the model) gated under the `listed` policy
    #[serde(default = "default_confirmed_tools")]
    pub tools: Vec<String>,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            policy: ConfirmationPolicy::default(),
            tools: default_confirmed_tools(),
        }
    }
}

fn default_confirmed_tools() -> Vec<String> {
    vec![
        "Zendesk_AddTicketComment".into(),
        "Zendesk_MarkTicketSolved".into(),
    ]
}

// ============================================================================
// Observability
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub arcade: ArcadeConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub confirmation: ConfirmationConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Values that must be present before a session can start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub user_id: String,
    pub model: String,
}

impl Config {
    /// Load configuration from the default path, falling back to defaults.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .context(format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration (explicit path or default) and apply environment overrides.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply process environment overrides to the configuration.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Empty values are ignored so that `FOO=` does not clear a file setting.
    /// A value that does not parse is an error naming the variable.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("ARCADE_API_KEY") {
            self.arcade.api_key = Some(key);
        }
        if let Some(url) = get("ARCADE_BASE_URL") {
            self.arcade.base_url = url;
        }
        if let Some(user) = get("ARCADE_USER_ID") {
            self.arcade.user_id = Some(user);
        }

        if let Some(key) = get("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.llm.model = Some(model);
        }

        if let Some(level) = get("DESK_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = get("DESK_LOG_FORMAT") {
            self.observability.log_format = format;
        }
        if let Some(policy) = get("DESK_CONFIRMATION_POLICY") {
            self.confirmation.policy = policy.parse().map_err(|_| {
                Error::Config(format!(
                    "DESK_CONFIRMATION_POLICY must be listed, all or off (got '{}')",
                    policy.trim()
                ))
            })?;
        }
        Ok(())
    }

    /// Reject values that would make a session unusable.
    pub fn validate(&self) -> Result<()> {
        if self.agent.max_turns == 0 {
            return Err(Error::Config("agent.max_turns must be at least 1".into()));
        }
        if self.agent.tool_limit == 0 {
            return Err(Error::Config("agent.tool_limit must be at least 1".into()));
        }
        if self.agent.toolkits.is_empty() && self.agent.tools.is_empty() {
            return Err(Error::Config(
                "configure at least one toolkit or tool".into(),
            ));
        }
        Ok(())
    }

    /// Extract the settings every session needs, failing on the first missing one.
    pub fn session_settings(&self) -> Result<SessionSettings> {
        let user_id = non_empty(self.arcade.user_id.as_deref()).ok_or(Error::MissingSetting {
            var: "ARCADE_USER_ID",
            hint: "Add it to your environment or ~/.desk/config.json.",
        })?;
        let model = non_empty(self.llm.model.as_deref()).ok_or(Error::MissingSetting {
            var: "OPENAI_MODEL",
            hint: "Add it to your environment or ~/.desk/config.json.",
        })?;

        Ok(SessionSettings {
            user_id: user_id.to_string(),
            model: model.to_string(),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_case::test_case;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_target_zendesk() {
        let config = Config::default();
        assert_eq!(config.arcade.base_url, "https://api.arcade.dev");
        assert_eq!(config.agent.toolkits, vec!["Zendesk".to_string()]);
        assert_eq!(config.agent.tool_limit, 100);
        assert_eq!(config.agent.max_turns, 10);
        assert_eq!(config.confirmation.policy, ConfirmationPolicy::Listed);
        assert!(config
            .confirmation
            .tools
            .contains(&"Zendesk_MarkTicketSolved".to_string()));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = Config::default();
        config.llm.model = Some("from-file".into());

        let vars = env(&[
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("ARCADE_USER_ID", "agent@example.com"),
            ("ARCADE_BASE_URL", "http://localhost:9099"),
            ("DESK_CONFIRMATION_POLICY", "all"),
        ]);
        config.apply_env_from(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.llm.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(config.arcade.user_id.as_deref(), Some("agent@example.com"));
        assert_eq!(config.arcade.base_url, "http://localhost:9099");
        assert_eq!(config.confirmation.policy, ConfirmationPolicy::All);
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = Config::default();
        config.arcade.user_id = Some("kept".into());
        let vars = env(&[("ARCADE_USER_ID", "  ")]);
        config.apply_env_from(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.arcade.user_id.as_deref(), Some("kept"));
    }

    #[test]
    fn unknown_env_policy_is_rejected() {
        let mut config = Config::default();
        let vars = env(&[("DESK_CONFIRMATION_POLICY", "al")]);

        let err = config.apply_env_from(|k| vars.get(k).cloned()).unwrap_err();

        assert!(err.is_config());
        assert!(err.to_string().contains("DESK_CONFIRMATION_POLICY"));
        assert!(err.to_string().contains("'al'"));
        assert_eq!(config.confirmation.policy, ConfirmationPolicy::Listed);
    }

    #[test]
    fn missing_user_id_is_reported_first() {
        let config = Config::default();
        let err = config.session_settings().unwrap_err();
        assert!(err.to_string().contains("ARCADE_USER_ID"));
    }

    #[test]
    fn missing_model_is_reported() {
        let mut config = Config::default();
        config.arcade.user_id = Some("me".into());
        let err = config.session_settings().unwrap_err();
        assert!(err.to_string().contains("OPENAI_MODEL"));
    }

    #[test]
    fn session_settings_when_complete() {
        let mut config = Config::default();
        config.arcade.user_id = Some(" me ".into());
        config.llm.model = Some("gpt-4o".into());
        let settings = config.session_settings().unwrap();
        assert_eq!(settings.user_id, "me");
        assert_eq!(settings.model, "gpt-4o");
    }

    #[test_case("listed", ConfirmationPolicy::Listed)]
    #[test_case("ALL", ConfirmationPolicy::All)]
    #[test_case(" off ", ConfirmationPolicy::Off)]
    fn policy_parses(input: &str, expected: ConfirmationPolicy) {
        assert_eq!(input.parse::<ConfirmationPolicy>().unwrap(), expected);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!("sometimes".parse::<ConfirmationPolicy>().is_err());
    }

    #[test]
    fn load_from_partial_file_fills_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"agent": {"tools": ["Zendesk.WhoAmI"]}, "confirmation": {"policy": "all"}}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.agent.tools, vec!["Zendesk.WhoAmI".to_string()]);
        assert_eq!(config.agent.toolkits, vec!["Zendesk".to_string()]);
        assert_eq!(config.confirmation.policy, ConfirmationPolicy::All);
        assert_eq!(config.observability.log_format, "pretty");
    }

    #[test]
    fn load_from_invalid_json_has_context() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn validate_rejects_zero_turns() {
        let mut config = Config::default();
        config.agent.max_turns = 0;
        assert!(config.validate().unwrap_err().is_config());
    }
}
