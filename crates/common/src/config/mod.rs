//! Configuration management for Smart Explain
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Completion source configuration
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Context extraction configuration
    #[serde(default)]
    pub context: ContextConfig,

    /// Session behaviour
    #[serde(default)]
    pub session: SessionConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompletionConfig {
    /// Provider: gemini, mock
    #[serde(default = "default_provider")]
    pub provider: String,

    /// API key for the provider
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Sampling temperature (provider default when unset)
    pub temperature: Option<f32>,

    /// Output token cap (provider default when unset)
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContextConfig {
    /// Characters kept on each side of the selection
    #[serde(default = "default_radius")]
    pub radius: usize,

    /// Title used when the note has none
    #[serde(default = "default_title")]
    pub default_title: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Whole-session timeout in seconds (0 disables)
    #[serde(default = "default_session_timeout")]
    pub timeout_secs: u64,

    /// What to do when a new explanation is triggered while one is running
    #[serde(default)]
    pub trigger_policy: TriggerPolicy,
}

/// Policy for a trigger arriving while a session is in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerPolicy {
    /// Reject the new trigger
    IgnoreNew,
    /// Cancel the running session and start the new one
    #[default]
    CancelReplace,
    /// Run both; only the newest is tracked for dismiss
    AllowConcurrent,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,
}

// Default value functions
fn default_provider() -> String { "gemini".to_string() }
fn default_api_base() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }
fn default_model() -> String { crate::DEFAULT_MODEL.to_string() }
fn default_connect_timeout() -> u64 { 10 }
fn default_radius() -> usize { crate::DEFAULT_CONTEXT_RADIUS }
fn default_title() -> String { crate::DEFAULT_NOTE_TITLE.to_string() }
fn default_session_timeout() -> u64 { 60 }
fn default_log_level() -> String { "info".to_string() }

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            api_base: default_api_base(),
            model: default_model(),
            connect_timeout_secs: default_connect_timeout(),
            temperature: None,
            max_output_tokens: None,
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            radius: default_radius(),
            default_title: default_title(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_session_timeout(),
            trigger_policy: TriggerPolicy::default(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__COMPLETION__API_KEY=...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        let mut loaded: Self = config.try_deserialize()?;
        loaded.completion.apply_env_fallback();
        Ok(loaded)
    }

    /// Load from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        let mut loaded: Self = config.try_deserialize()?;
        loaded.completion.apply_env_fallback();
        Ok(loaded)
    }

    /// Session timeout as Duration, None when disabled
    pub fn session_timeout(&self) -> Option<Duration> {
        match self.session.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl CompletionConfig {
    /// Connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Pick up GEMINI_API_KEY when no key was configured
    fn apply_env_fallback(&mut self) {
        if self.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            if let Ok(key) = std::env::var("GEMINI_API_KEY") {
                self.api_key = Some(key);
            }
        }
    }
}
