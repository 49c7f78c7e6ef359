//! Story-point estimates from remote LLM providers
//!
//! Both providers speak the OpenAI chat-completions protocol. Failures are
//! classified so callers can show a useful message and fall back to the
//! rule-based estimate.

pub mod client;
pub mod config;
pub mod models;
pub mod prompt;

pub use client::{LlmClient, LlmEstimator};
pub use config::{LlmConfig, ProviderConfig};
pub use models::{parse_points, AiModel, LlmEstimate, DEFAULT_POINTS};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM estimation is disabled")]
    Disabled,

    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("Circuit breaker is open for {0}")]
    CircuitOpen(AiModel),

    #[error("API credit limit reached: {0}")]
    CreditLimitExceeded(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Model unavailable on {model}: {message}")]
    ModelAccess { model: AiModel, message: String },

    #[error("API key problem: {0}")]
    ApiKey(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Classify an upstream failure from its HTTP status and error message.
    pub fn classify(model: AiModel, status: Option<u16>, message: &str) -> Self {
        let lowered = message.to_lowercase();
        let message = message.to_string();

        if lowered.contains("credits") || lowered.contains("spending limit") {
            LlmError::CreditLimitExceeded(message)
        } else if lowered.contains("rate limit") || status == Some(429) {
            LlmError::RateLimited(message)
        } else if lowered.contains("does not exist") || lowered.contains("does not have access") {
            LlmError::ModelAccess { model, message }
        } else if lowered.contains("api key") || status == Some(401) {
            LlmError::ApiKey(message)
        } else {
            LlmError::Api(message)
        }
    }

    /// HTTP status reported to API clients.
    pub fn status_code(&self) -> u16 {
        match self {
            LlmError::UnsupportedModel(_) => 400,
            LlmError::ApiKey(_) => 401,
            LlmError::ModelAccess { .. } => 403,
            LlmError::CreditLimitExceeded(_) | LlmError::RateLimited(_) => 429,
            LlmError::InvalidResponse(_) => 502,
            LlmError::Disabled | LlmError::CircuitOpen(_) | LlmError::Api(_) => 503,
            LlmError::Timeout(_) => 504,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            LlmError::Disabled => "UPSTREAM_DISABLED",
            LlmError::UnsupportedModel(_) => "UNSUPPORTED_MODEL",
            LlmError::CreditLimitExceeded(_) => "CREDIT_LIMIT_EXCEEDED",
            LlmError::RateLimited(_) => "RATE_LIMIT_EXCEEDED",
            LlmError::ModelAccess { .. } => "MODEL_ACCESS_ERROR",
            LlmError::ApiKey(_) => "API_KEY_ERROR",
            LlmError::Timeout(_) => "TIMEOUT",
            LlmError::CircuitOpen(_) | LlmError::Api(_) | LlmError::InvalidResponse(_) => {
                "API_ERROR"
            }
        }
    }

    /// Message meant for the person asking for an estimate.
    pub fn user_message(&self) -> String {
        match self {
            LlmError::Disabled => {
                "AI estimation is turned off. Use the rule-based estimate.".to_string()
            }
            LlmError::UnsupportedModel(model) => {
                format!("Model \"{}\" is not supported. Choose groq or grok.", model)
            }
            LlmError::CreditLimitExceeded(_) => "The AI service is temporarily unavailable because its credit limit was reached. Use the rule-based estimate for now.".to_string(),
            LlmError::RateLimited(_) => {
                "Too many simultaneous requests. Wait a few seconds and try again.".to_string()
            }
            LlmError::ModelAccess { model, .. } => format!(
                "The {} model is not available right now. Try {} or use the rule-based estimate.",
                model.display_name(),
                model.alternative().display_name()
            ),
            LlmError::ApiKey(_) => {
                "AI service configuration error. Use the rule-based estimate for now.".to_string()
            }
            LlmError::CircuitOpen(model) => format!(
                "{} is failing repeatedly and has been paused. Try again shortly or use the rule-based estimate.",
                model.display_name()
            ),
            LlmError::Timeout(_) => {
                "The AI service took too long to answer. Try again or use the rule-based estimate.".to_string()
            }
            LlmError::Api(_) | LlmError::InvalidResponse(_) => {
                "Temporary error in the AI service. Try again in a few moments.".to_string()
            }
        }
    }

    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited(_) | LlmError::Api(_) | LlmError::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_message() {
        let cases = [
            ("You have run out of credits", "CREDIT_LIMIT_EXCEEDED", 429),
            ("Team spending limit reached", "CREDIT_LIMIT_EXCEEDED", 429),
            ("Rate limit reached for requests", "RATE_LIMIT_EXCEEDED", 429),
            ("The model `x` does not exist", "MODEL_ACCESS_ERROR", 403),
            ("Your team does not have access to model", "MODEL_ACCESS_ERROR", 403),
            ("Invalid API Key", "API_KEY_ERROR", 401),
            ("Internal server error", "API_ERROR", 503),
        ];
        for (message, code, status) in cases {
            let err = LlmError::classify(AiModel::Groq, Some(500), message);
            assert_eq!(err.error_code(), code, "{}", message);
            assert_eq!(err.status_code(), status, "{}", message);
        }
    }

    #[test]
    fn test_classify_by_status() {
        assert!(matches!(
            LlmError::classify(AiModel::Grok, Some(429), "slow down"),
            LlmError::RateLimited(_)
        ));
        assert!(matches!(
            LlmError::classify(AiModel::Grok, Some(401), "unauthorized"),
            LlmError::ApiKey(_)
        ));
    }

    #[test]
    fn test_model_access_names_alternative() {
        let err = LlmError::classify(AiModel::Grok, None, "model does not exist");
        let message = err.user_message();
        assert!(message.contains("Grok"));
        assert!(message.contains("Groq"));
    }

    #[test]
    fn test_transient() {
        assert!(LlmError::Api("x".into()).is_transient());
        assert!(LlmError::Timeout("x".into()).is_transient());
        assert!(!LlmError::ApiKey("x".into()).is_transient());
        assert!(!LlmError::CreditLimitExceeded("x".into()).is_transient());
    }
}
