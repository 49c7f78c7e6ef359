//! Configuration for the remote text classifier

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "giseldo/distilbert_bert_uncased_finetuned_story_point";

#[derive(Debug, Clone, Deserialize)]
pub struct TextClassifierConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Inference endpoint receiving `{"inputs": ...}`
    #[serde(default = "default_endpoint")]
    pub endpoint_url: String,

    /// Bearer token (read from env HF_API_TOKEN if not set)
    #[serde(default)]
    pub api_token: Option<SecretString>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Longer inputs are cut and suffixed with "..."
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    #[serde(default = "default_breaker_failures")]
    pub circuit_breaker_failures: usize,

    #[serde(default = "default_breaker_reset")]
    pub circuit_breaker_reset_secs: u64,
}

fn default_enabled() -> bool { true }
fn default_endpoint() -> String {
    format!("https://api-inference.huggingface.co/models/{}", DEFAULT_MODEL)
}
fn default_timeout_ms() -> u64 { 30000 }
fn default_max_input_chars() -> usize { 400 }
fn default_breaker_failures() -> usize { 5 }
fn default_breaker_reset() -> u64 { 60 }

impl Default for TextClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            endpoint_url: default_endpoint(),
            api_token: None,
            timeout_ms: default_timeout_ms(),
            max_input_chars: default_max_input_chars(),
            circuit_breaker_failures: default_breaker_failures(),
            circuit_breaker_reset_secs: default_breaker_reset(),
        }
    }
}

impl TextClassifierConfig {
    pub fn from_env(mut self) -> Self {
        if self.api_token.is_none() {
            if let Ok(token) = std::env::var("HF_API_TOKEN") {
                self.api_token = Some(SecretString::new(token));
            }
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn breaker_reset_timeout(&self) -> Duration {
        Duration::from_secs(self.circuit_breaker_reset_secs)
    }
}
