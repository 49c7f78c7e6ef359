//! Structured explanation of a rule-based estimate

use serde::{Deserialize, Serialize};

/// Complexity keywords that matched, per tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityDetails {
    pub high: Vec<String>,
    pub medium: Vec<String>,
    pub low: Vec<String>,
    pub score: i64,
}

/// Scope keywords that matched, per tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeDetails {
    pub large: Vec<String>,
    pub medium: Vec<String>,
    pub small: Vec<String>,
    pub score: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDetails {
    pub keywords: Vec<String>,
    pub score: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LengthDetails {
    pub character_count: usize,
    pub score: i64,
}

/// How the clamped score was snapped onto the scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FibonacciMapping {
    pub original_score: i64,
    pub mapped_to: u32,
    pub reason: String,
}

impl FibonacciMapping {
    pub fn new(clamped_score: i64, mapped_to: u32) -> Self {
        let reason = if clamped_score == i64::from(mapped_to) {
            "Exact match: the score was already on the Fibonacci scale".to_string()
        } else {
            format!(
                "Mapped to the nearest value on the Fibonacci scale (difference: {})",
                (clamped_score - i64::from(mapped_to)).abs()
            )
        };

        Self {
            original_score: clamped_score,
            mapped_to,
            reason,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.original_score == i64::from(self.mapped_to)
    }
}

/// Every intermediate value of a rule-based estimate.
///
/// `total_score` is the pre-clamp sum of the five component scores and
/// `final_points` is always a member of the scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub base_points: i64,
    pub base_points_reason: String,
    pub complexity_score: i64,
    pub complexity_details: ComplexityDetails,
    pub scope_score: i64,
    pub scope_details: ScopeDetails,
    pub dependency_score: i64,
    pub dependency_details: DependencyDetails,
    pub length_score: i64,
    pub length_details: LengthDetails,
    pub total_score: i64,
    pub final_points: u32,
    pub fibonacci_mapping: FibonacciMapping,
}

impl ScoreBreakdown {
    /// Sum of the five component scores.
    pub fn component_sum(&self) -> i64 {
        self.base_points
            + self.complexity_score
            + self.scope_score
            + self.dependency_score
            + self.length_score
    }

    /// Every matched keyword across all categories, in scoring order.
    pub fn matched_keywords(&self) -> impl Iterator<Item = &str> {
        self.complexity_details
            .high
            .iter()
            .chain(&self.complexity_details.medium)
            .chain(&self.complexity_details.low)
            .chain(&self.scope_details.large)
            .chain(&self.scope_details.medium)
            .chain(&self.scope_details.small)
            .chain(&self.dependency_details.keywords)
            .map(String::as_str)
    }
}
