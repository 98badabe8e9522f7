//! Configuration loading, validation, and management for contextloop.
//!
//! Loads configuration from `~/.contextloop/config.toml` with environment
//! variable overrides. Validates all settings at load time.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// The root configuration structure.
///
/// Maps directly to `~/.contextloop/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model used for the review step. `None` lets the chat backend choose.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Maximum tokens to sample per review response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Maximum review rounds per chat turn.
    #[serde(default = "default_max_loops")]
    pub max_loops: u32,

    /// Cap on implicit mentions included in a review prompt; older items are
    /// truncated first.
    #[serde(default = "default_max_search_items")]
    pub max_search_items: usize,

    /// Quota limiter settings.
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Command tool settings.
    #[serde(default)]
    pub shell: ShellConfig,
}

/// Usage quota settings for the review loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Base daily quota. Zero disables the limiter.
    #[serde(default)]
    pub base_quota: f64,

    /// Plan multiplier applied to the base quota.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            base_quota: 0.0,
            multiplier: default_multiplier(),
        }
    }
}

/// Settings for the command-running tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShellConfig {
    /// If non-empty, only these base commands are allowed.
    #[serde(default)]
    pub allowed_commands: Vec<String>,
}

fn default_max_tokens() -> u32 {
    4000
}

fn default_max_loops() -> u32 {
    2
}

fn default_max_search_items() -> usize {
    30
}

fn default_multiplier() -> f64 {
    1.0
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: default_max_tokens(),
            max_loops: default_max_loops(),
            max_search_items: default_max_search_items(),
            quota: QuotaConfig::default(),
            shell: ShellConfig::default(),
        }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl AgentConfig {
    /// Default config file path: `~/.contextloop/config.toml`.
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".contextloop").join("config.toml")
    }

    /// Load from a TOML file, apply environment overrides, and validate.
    ///
    /// A missing file yields the defaults (still validated).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                Self::default()
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse from a TOML string (no env overrides, no validation).
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `CONTEXTLOOP_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var("CONTEXTLOOP_MODEL") {
            if !model.is_empty() {
                self.model = Some(model);
            }
        }
        if let Ok(loops) = std::env::var("CONTEXTLOOP_MAX_LOOPS") {
            if let Ok(n) = loops.parse() {
                self.max_loops = n;
            }
        }
        if let Ok(quota) = std::env::var("CONTEXTLOOP_BASE_QUOTA") {
            if let Ok(q) = quota.parse() {
                self.quota.base_quota = q;
            }
        }
    }

    /// Validate all settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_loops == 0 {
            return Err(ConfigError::Invalid("max_loops must be at least 1".into()));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid("max_tokens must be at least 1".into()));
        }
        if self.quota.base_quota < 0.0 {
            return Err(ConfigError::Invalid(
                "quota.base_quota must not be negative".into(),
            ));
        }
        if self.quota.multiplier < 0.0 {
            return Err(ConfigError::Invalid(
                "quota.multiplier must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Effective daily quota after the plan multiplier.
    pub fn daily_quota(&self) -> f64 {
        self.quota.base_quota * self.quota.multiplier
    }
}
