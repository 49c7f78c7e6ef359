//! Provider selection and chat-completions wire types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::LlmError;
use crate::estimation::is_on_scale;

/// Points used when the model's answer is not a scale value.
pub const DEFAULT_POINTS: u32 = 3;

pub const DEFAULT_POINTS_NOTE: &str = "Default estimate used because the model gave a non-standard answer";

/// Remote LLM provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiModel {
    /// Groq-hosted Llama
    Groq,
    /// xAI Grok
    Grok,
}

impl AiModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiModel::Groq => "groq",
            AiModel::Grok => "grok",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AiModel::Groq => "Groq",
            AiModel::Grok => "Grok",
        }
    }

    /// The other provider, suggested when one is unavailable.
    pub fn alternative(&self) -> AiModel {
        match self {
            AiModel::Groq => AiModel::Grok,
            AiModel::Grok => AiModel::Groq,
        }
    }
}

impl FromStr for AiModel {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "groq" => Ok(AiModel::Groq),
            "grok" => Ok(AiModel::Grok),
            other => Err(LlmError::UnsupportedModel(other.to_string())),
        }
    }
}

impl fmt::Display for AiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Points suggested by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmEstimate {
    pub points: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Read the estimate out of the model's reply: the first run of digits, if
/// it is a scale value. Anything else yields the default with a note.
pub fn parse_points(text: &str) -> LlmEstimate {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    match digits.parse::<i64>() {
        Ok(points) if is_on_scale(points) => LlmEstimate {
            points: points as u32,
            note: None,
        },
        _ => LlmEstimate {
            points: DEFAULT_POINTS,
            note: Some(DEFAULT_POINTS_NOTE.to_string()),
        },
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatReply,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice.
    pub fn text(&self) -> Option<&str> {
        self.choices.first()?.message.content.as_deref()
    }
}

/// Error body returned by OpenAI-compatible APIs.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_model() {
        assert_eq!("groq".parse::<AiModel>().unwrap(), AiModel::Groq);
        assert_eq!("grok".parse::<AiModel>().unwrap(), AiModel::Grok);
        assert!(matches!(
            "gpt".parse::<AiModel>(),
            Err(LlmError::UnsupportedModel(m)) if m == "gpt"
        ));
    }

    #[test]
    fn test_parse_points() {
        assert_eq!(parse_points("8").points, 8);
        assert_eq!(parse_points("Estimate: 13 points").points, 13);
        assert!(parse_points("5").note.is_none());
    }

    #[test]
    fn test_parse_points_falls_back() {
        for reply in ["4", "about five", "", "0", "210"] {
            let estimate = parse_points(reply);
            assert_eq!(estimate.points, DEFAULT_POINTS, "reply {:?}", reply);
            assert!(estimate.note.is_some());
        }
    }

    #[test]
    fn test_chat_response_text() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"5"}}]}"#,
        )
        .unwrap();
        assert_eq!(response.text(), Some("5"));
    }
}
