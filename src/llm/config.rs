//! Configuration for the remote LLM estimators

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

/// One OpenAI-compatible chat-completions provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    /// Falls back to the provider's environment variable when unset.
    #[serde(default)]
    pub api_key: Option<SecretString>,
}

impl ProviderConfig {
    fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            model: model.to_string(),
            api_key: None,
        }
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_groq")]
    pub groq: ProviderConfig,

    #[serde(default = "default_grok")]
    pub grok: ProviderConfig,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries after the first attempt, transient failures only
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: usize,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_breaker_failures")]
    pub circuit_breaker_failures: usize,

    #[serde(default = "default_breaker_reset")]
    pub circuit_breaker_reset_secs: u64,

    /// Zero disables caching
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_cache_size")]
    pub cache_max_size: u64,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

fn default_enabled() -> bool { true }
fn default_groq() -> ProviderConfig {
    ProviderConfig::new("https://api.groq.com/openai/v1", "llama-3.1-8b-instant")
}
fn default_grok() -> ProviderConfig {
    ProviderConfig::new("https://api.x.ai/v1", "grok-3-mini")
}
fn default_temperature() -> f32 { 0.2 }
fn default_max_tokens() -> u32 { 10 }
fn default_timeout_ms() -> u64 { 15000 }
fn default_retry_attempts() -> usize { 2 }
fn default_retry_backoff_ms() -> u64 { 250 }
fn default_breaker_failures() -> usize { 5 }
fn default_breaker_reset() -> u64 { 30 }
fn default_cache_ttl() -> u64 { 600 }
fn default_cache_size() -> u64 { 1000 }
fn default_max_concurrent() -> usize { 8 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            groq: default_groq(),
            grok: default_grok(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_timeout_ms(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            circuit_breaker_failures: default_breaker_failures(),
            circuit_breaker_reset_secs: default_breaker_reset(),
            cache_ttl_secs: default_cache_ttl(),
            cache_max_size: default_cache_size(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

impl LlmConfig {
    /// Fill in provider keys from `GROQ_API_KEY` / `XAI_API_KEY` where the
    /// configuration file left them out.
    pub fn from_env(mut self) -> Self {
        if self.groq.api_key.is_none() {
            if let Ok(key) = std::env::var("GROQ_API_KEY") {
                self.groq.api_key = Some(SecretString::new(key));
            }
        }

        if self.grok.api_key.is_none() {
            if let Ok(key) = std::env::var("XAI_API_KEY") {
                self.grok.api_key = Some(SecretString::new(key));
            }
        }

        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn breaker_reset_timeout(&self) -> Duration {
        Duration::from_secs(self.circuit_breaker_reset_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
