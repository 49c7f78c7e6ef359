//! Request and response bodies for the HTTP API

use serde::{Deserialize, Serialize};

use crate::classifier::ModelStats;
use crate::estimation::{
    ComparisonEntry, EstimationMethod, KeywordCategory, KeywordTaxonomy, ScoreBreakdown, TaskInput,
};
use crate::readability::{ReadabilityLevel, ReadabilityMetrics};

/// Error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    /// Rule-based estimate to use instead when a remote estimator fails
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_points: Option<u32>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            user_message: None,
            fallback_points: None,
        }
    }

    pub fn with_user_message(mut self, message: impl Into<String>) -> Self {
        self.user_message = Some(message.into());
        self
    }

    pub fn with_fallback(mut self, points: u32) -> Self {
        self.fallback_points = Some(points);
        self
    }
}

pub mod error_codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const CREDIT_LIMIT_EXCEEDED: &str = "CREDIT_LIMIT_EXCEEDED";
    pub const RATE_LIMIT_EXCEEDED: &str = "RATE_LIMIT_EXCEEDED";
    pub const MODEL_ACCESS_ERROR: &str = "MODEL_ACCESS_ERROR";
    pub const API_KEY_ERROR: &str = "API_KEY_ERROR";
    pub const API_ERROR: &str = "API_ERROR";
    pub const UPSTREAM_DISABLED: &str = "UPSTREAM_DISABLED";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const UNSUPPORTED_MODEL: &str = "UNSUPPORTED_MODEL";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResponse {
    pub rule_based_points: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier_points: Option<u32>,
    pub suggested_points: u32,
    pub suggested_by: EstimationMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainResponse {
    pub points: u32,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesResponse {
    pub names: Vec<String>,
    pub features: Vec<f32>,
}

/// Feature names in vector order.
pub const FEATURE_NAMES: [&str; 13] = [
    "type_feature",
    "type_bug",
    "type_refactor",
    "type_documentation",
    "description_length",
    "complexity_high",
    "complexity_medium",
    "complexity_low",
    "scope_large",
    "scope_medium",
    "scope_small",
    "dependencies",
    "word_count",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiEstimateRequest {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub task_type: String,
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiEstimateResponse {
    pub points: u32,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransformerEstimateRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    #[serde(flatten)]
    pub task: TaskInput,
    /// LLM provider to include; omitted means no LLM
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub include_transformer: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResponse {
    pub rule_based_points: u32,
    pub results: Vec<ComparisonEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub category: &'static str,
    pub weight: i64,
    pub label: String,
    pub count: usize,
}

impl CategorySummary {
    pub fn for_taxonomy(taxonomy: &KeywordTaxonomy) -> Vec<Self> {
        KeywordCategory::ALL
            .iter()
            .map(|&category| Self {
                category: category.as_str(),
                weight: category.weight(),
                label: category.weight_label(),
                count: taxonomy.keywords(category).len(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordsResponse {
    pub taxonomy: KeywordTaxonomy,
    pub categories: Vec<CategorySummary>,
}

impl KeywordsResponse {
    pub fn new(taxonomy: &KeywordTaxonomy) -> Self {
        Self {
            categories: CategorySummary::for_taxonomy(taxonomy),
            taxonomy: taxonomy.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordRequest {
    pub keyword: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordChangeResponse {
    pub category: &'static str,
    pub keyword: String,
    pub changed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadabilityRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadabilityResponse {
    pub metrics: ReadabilityMetrics,
    pub reading_ease: ReadabilityLevel,
    pub grade_level: ReadabilityLevel,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub imported: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelStats>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatusResponse {
    pub trained: bool,
    pub stats: ModelStats,
    pub task_count: usize,
    pub min_training_tasks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
