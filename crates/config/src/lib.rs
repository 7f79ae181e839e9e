//! Configuration loading, validation, and management for Log Detective.
//!
//! Loads configuration from `~/.logdetective/config.toml` with environment
//! variable overrides. Validated once at startup, then passed by value into
//! the sandbox manager, the provider, and the agent loop.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the sandbox service credential.
pub const RUNLOOP_API_KEY: &str = "RUNLOOP_API_KEY";
/// Environment variable overriding the sandbox service URL.
pub const RUNLOOP_BASE_URL: &str = "RUNLOOP_BASE_URL";
/// Environment variable holding the model service credential.
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable overriding the model service URL.
pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const MODEL_ENV: &str = "LOGDETECTIVE_MODEL";
pub const MAX_CHUNK_SIZE_ENV: &str = "LOGDETECTIVE_MAX_CHUNK_SIZE";

/// The root configuration structure.
///
/// Maps directly to `~/.logdetective/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote sandbox service
    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// Remote model service
    #[serde(default)]
    pub model: ModelConfig,

    /// Agent loop and chunking limits
    #[serde(default)]
    pub agent: AgentConfig,
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_runloop_url")]
    pub base_url: String,

    /// How long to wait for a new devbox to reach `running`
    #[serde(default = "default_provision_timeout")]
    pub provision_timeout_secs: u64,

    /// Delay between status polls while provisioning
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_runloop_url() -> String {
    "https://api.runloop.ai".into()
}
fn default_provision_timeout() -> u64 {
    300
}
fn default_poll_interval() -> u64 {
    2000
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_runloop_url(),
            provision_timeout_secs: default_provision_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl std::fmt::Debug for SandboxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("provision_timeout_secs", &self.provision_timeout_secs)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_openai_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub name: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4-turbo".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    4096
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_url(),
            name: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("name", &self.name)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Largest chunk handed to one agent loop, in bytes of decoded text
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Model turns allowed per chunk before the loop aborts
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Tool output longer than this is truncated before reaching the model
    #[serde(default = "default_max_tool_output_len")]
    pub max_tool_output_len: usize,

    /// Extra attempts after a retryable model failure
    #[serde(default = "default_model_retries")]
    pub model_retries: u32,

    /// First backoff delay; doubles on every retry
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,
}

fn default_max_chunk_size() -> usize {
    100_000
}
fn default_max_iterations() -> usize {
    10
}
fn default_max_tool_output_len() -> usize {
    10_000
}
fn default_model_retries() -> u32 {
    3
}
fn default_retry_base_delay() -> u64 {
    500
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            max_iterations: default_max_iterations(),
            max_tool_output_len: default_max_tool_output_len(),
            model_retries: default_model_retries(),
            retry_base_delay_ms: default_retry_base_delay(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path` (or `~/.logdetective/config.toml`),
    /// then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| Self::config_dir().join("config.toml"));
        let mut config = Self::load_from(&path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides. Environment wins over the file.
    ///
    /// `lookup` is `std::env::var` in production and a map in tests.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(RUNLOOP_API_KEY) {
            self.sandbox.api_key = Some(key);
        }
        if let Some(url) = non_empty(RUNLOOP_BASE_URL) {
            self.sandbox.base_url = url;
        }
        if let Some(key) = non_empty(OPENAI_API_KEY) {
            self.model.api_key = Some(key);
        }
        if let Some(url) = non_empty(OPENAI_BASE_URL) {
            self.model.base_url = url;
        }
        if let Some(model) = non_empty(MODEL_ENV) {
            self.model.name = model;
        }
        if let Some(size) = non_empty(MAX_CHUNK_SIZE_ENV) {
            self.agent.max_chunk_size = size.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "{MAX_CHUNK_SIZE_ENV} must be a positive integer, got '{size}'"
                ))
            })?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".logdetective")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.temperature < 0.0 || self.model.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.agent.max_chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_chunk_size must be > 0".into(),
            ));
        }
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be > 0".into(),
            ));
        }
        if self.agent.max_tool_output_len == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tool_output_len must be > 0".into(),
            ));
        }
        if self.sandbox.provision_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "sandbox.provision_timeout_secs must be > 0".into(),
            ));
        }
        if self.sandbox.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "sandbox.poll_interval_ms must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Fail fast when either service credential is absent.
    ///
    /// Called before any remote request is made. The model credential is
    /// checked first.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        let blank = |key: Option<&str>| key.is_none_or(|k| k.trim().is_empty());
        if blank(self.model.api_key.as_deref()) {
            return Err(ConfigError::MissingCredential { var: OPENAI_API_KEY });
        }
        if blank(self.sandbox.api_key.as_deref()) {
            return Err(ConfigError::MissingCredential {
                var: RUNLOOP_API_KEY,
            });
        }
        Ok(())
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("{var} is not set")]
    MissingCredential { var: &'static str },
}
