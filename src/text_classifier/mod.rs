//! Story points from a fine-tuned transformer served over HTTP
//!
//! The model is a sequence classifier whose labels carry the point value;
//! this module builds its input, calls the inference endpoint and maps the
//! best label back onto the scale.

pub mod client;
pub mod config;

pub use client::{TextClassifierClient, TransformerEstimator};
pub use config::{TextClassifierConfig, DEFAULT_MODEL};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::estimation::{is_on_scale, snap_to_scale};

#[derive(Debug, Error)]
pub enum TextClassifierError {
    #[error("Text classifier is disabled")]
    Disabled,

    #[error("Circuit breaker is open for the text classifier")]
    CircuitOpen,

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl TextClassifierError {
    pub fn status_code(&self) -> u16 {
        match self {
            TextClassifierError::Disabled | TextClassifierError::CircuitOpen => 503,
            TextClassifierError::Timeout(_) => 504,
            _ => 502,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            TextClassifierError::Disabled => "UPSTREAM_DISABLED",
            TextClassifierError::Timeout(_) => "TIMEOUT",
            _ => "API_ERROR",
        }
    }
}

/// One label with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

/// Inference responses come either flat or wrapped in one outer list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ClassificationResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

impl ClassificationResponse {
    pub fn into_predictions(self) -> Vec<LabelScore> {
        match self {
            ClassificationResponse::Nested(outer) => outer.into_iter().next().unwrap_or_default(),
            ClassificationResponse::Flat(flat) => flat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformerEstimate {
    pub points: u32,
    pub confidence: f32,
    pub predictions: Vec<LabelScore>,
}

/// `"{title}. {description}"`, trimmed, cut to `max_chars` characters with
/// `"..."` appended when longer.
pub fn build_context(title: &str, description: &str, max_chars: usize) -> String {
    let context = format!("{}. {}", title, description).trim().to_string();
    if context.chars().count() > max_chars {
        let cut: String = context.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        context
    }
}

/// Highest-scoring prediction; a later entry wins a tie.
pub fn best_prediction(predictions: &[LabelScore]) -> Option<&LabelScore> {
    predictions
        .iter()
        .reduce(|best, current| if best.score > current.score { best } else { current })
}

/// Point value of a label. The first digit run is used as is when on the
/// scale and snapped otherwise; labels without a positive number count as 3.
pub fn label_to_points(label: &str) -> u32 {
    let digits: String = label
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        return 3;
    }
    // A run too long for i64 saturates and snaps to the top of the scale
    let number = match digits.parse::<i64>().unwrap_or(i64::MAX) {
        n if n > 0 => n,
        _ => 3,
    };

    if is_on_scale(number) {
        number as u32
    } else {
        snap_to_scale(number)
    }
}

/// Decode the endpoint's predictions into an estimate.
pub fn interpret(predictions: Vec<LabelScore>) -> Result<TransformerEstimate, TextClassifierError> {
    let (points, confidence) = best_prediction(&predictions)
        .map(|best| (label_to_points(&best.label), best.score))
        .ok_or_else(|| TextClassifierError::InvalidResponse("No predictions returned".to_string()))?;

    Ok(TransformerEstimate {
        points,
        confidence,
        predictions,
    })
}
