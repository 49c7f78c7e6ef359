//! Service configuration
//!
//! Values come from an optional TOML file layered under environment
//! variables prefixed `STORY_POINTS__` (for example
//! `STORY_POINTS__SERVER__PORT=9000`). Every field has a default, so an empty
//! configuration is runnable.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{EstimatorError, Result};
use crate::llm::LlmConfig;
use crate::text_classifier::TextClassifierConfig;

pub const ENV_PREFIX: &str = "STORY_POINTS";
pub const DEFAULT_CONFIG_FILE: &str = "config";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub keywords: KeywordsConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub text_classifier: TextClassifierConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted request body, CSV uploads included
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_max_body_bytes() -> usize { 2 * 1024 * 1024 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| EstimatorError::Config(format!("Invalid server address: {}", e)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeywordsConfig {
    /// JSON file holding the user's keyword taxonomy
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryConfig {
    /// Directory for the task history and trained model; in memory if unset
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl HistoryConfig {
    pub fn model_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join("model.json"))
    }
}

impl Config {
    /// Load from `path` (missing file is fine) and the environment, then
    /// validate.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| EstimatorError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| EstimatorError::Config(e.to_string()))?;

        let config = config.with_env_secrets();
        config.validate()?;
        Ok(config)
    }

    /// Pick up provider keys from their conventional variables.
    pub fn with_env_secrets(mut self) -> Self {
        self.llm = self.llm.from_env();
        self.text_classifier = self.text_classifier.from_env();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(EstimatorError::Config("server.port must be non-zero".into()));
        }
        if self.server.max_body_bytes == 0 {
            return Err(EstimatorError::Config(
                "server.max_body_bytes must be non-zero".into(),
            ));
        }
        if self.llm.timeout_ms == 0 || self.text_classifier.timeout_ms == 0 {
            return Err(EstimatorError::Config("timeouts must be non-zero".into()));
        }
        if self.llm.max_concurrent_requests == 0 {
            return Err(EstimatorError::Config(
                "llm.max_concurrent_requests must be non-zero".into(),
            ));
        }
        if self.text_classifier.max_input_chars == 0 {
            return Err(EstimatorError::Config(
                "text_classifier.max_input_chars must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
