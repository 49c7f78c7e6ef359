//! Common interface over the estimation strategies

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::scorer::RuleBasedEstimator;
use super::task_type::TaskType;
use crate::error::Result;

/// Which strategy produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationMethod {
    Rules,
    Classifier,
    Llm,
    Transformer,
}

impl EstimationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimationMethod::Rules => "rules",
            EstimationMethod::Classifier => "classifier",
            EstimationMethod::Llm => "llm",
            EstimationMethod::Transformer => "transformer",
        }
    }
}

/// A task as submitted for estimation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub task_type: TaskType,
}

impl TaskInput {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        task_type: impl Into<TaskType>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            task_type: task_type.into(),
        }
    }
}

/// Story points produced by one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub points: u32,
    pub method: EstimationMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Estimate {
    pub fn new(points: u32, method: EstimationMethod) -> Self {
        Self {
            points,
            method,
            confidence: None,
            note: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Estimation strategy
#[async_trait]
pub trait Estimator: Send + Sync {
    fn method(&self) -> EstimationMethod;

    async fn estimate(&self, input: &TaskInput) -> Result<Estimate>;
}

#[async_trait]
impl Estimator for RuleBasedEstimator {
    fn method(&self) -> EstimationMethod {
        EstimationMethod::Rules
    }

    async fn estimate(&self, input: &TaskInput) -> Result<Estimate> {
        let points = RuleBasedEstimator::estimate(self, &input.description, &input.task_type);
        Ok(Estimate::new(points, EstimationMethod::Rules))
    }
}

/// Outcome of one strategy in a comparison run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonEntry {
    pub method: EstimationMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<Estimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Signed difference from the rule-based estimate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_from_rules: Option<i64>,
}

/// Run every strategy on the same input and report each against the
/// rule-based estimate. Failing strategies are reported, not propagated.
pub async fn compare(
    rules: &RuleBasedEstimator,
    estimators: &[Arc<dyn Estimator>],
    input: &TaskInput,
) -> Vec<ComparisonEntry> {
    let baseline = i64::from(rules.estimate(&input.description, &input.task_type));
    let mut entries = Vec::with_capacity(estimators.len());

    for estimator in estimators {
        let entry = match estimator.estimate(input).await {
            Ok(estimate) => ComparisonEntry {
                method: estimate.method,
                delta_from_rules: Some(i64::from(estimate.points) - baseline),
                estimate: Some(estimate),
                error: None,
            },
            Err(e) => {
                warn!("{} estimator failed during comparison: {}", estimator.method().as_str(), e);
                ComparisonEntry {
                    method: estimator.method(),
                    estimate: None,
                    error: Some(e.to_string()),
                    delta_from_rules: None,
                }
            }
        };
        entries.push(entry);
    }

    entries
}
