//! Rule-based estimator
//!
//! `estimate` and `explain` are two views over the same scoring pass, so the
//! reported breakdown always agrees with the returned points.

use std::sync::Arc;

use super::breakdown::{
    ComplexityDetails, DependencyDetails, FibonacciMapping, LengthDetails, ScopeDetails,
    ScoreBreakdown,
};
use super::scale::{clamp_score, snap_to_scale};
use super::taxonomy::{KeywordCategory, KeywordSet, KeywordTaxonomy};
use super::task_type::TaskType;

/// UTF-16 units of description per length point.
pub const CHARS_PER_LENGTH_POINT: usize = 200;
/// Cap on the length bonus.
pub const MAX_LENGTH_SCORE: i64 = 3;

/// Score a description against a taxonomy.
pub fn explain(taxonomy: &KeywordTaxonomy, description: &str, task_type: &TaskType) -> ScoreBreakdown {
    let lowered = description.to_lowercase();

    let base_points = task_type.base_points();

    let (high, high_score) = tier(taxonomy, KeywordCategory::ComplexityHigh, &lowered);
    let (medium, medium_score) = tier(taxonomy, KeywordCategory::ComplexityMedium, &lowered);
    let (low, low_score) = tier(taxonomy, KeywordCategory::ComplexityLow, &lowered);
    let complexity_details = ComplexityDetails {
        high,
        medium,
        low,
        score: high_score + medium_score + low_score,
    };

    let (large, large_score) = tier(taxonomy, KeywordCategory::ScopeLarge, &lowered);
    let (scope_medium, scope_medium_score) = tier(taxonomy, KeywordCategory::ScopeMedium, &lowered);
    let (small, small_score) = tier(taxonomy, KeywordCategory::ScopeSmall, &lowered);
    let scope_details = ScopeDetails {
        large,
        medium: scope_medium,
        small,
        score: large_score + scope_medium_score + small_score,
    };

    let (keywords, dependency_score) = tier(taxonomy, KeywordCategory::Dependency, &lowered);
    let dependency_details = DependencyDetails {
        keywords,
        score: dependency_score,
    };

    let character_count = super::text_length(description);
    let length_details = LengthDetails {
        character_count,
        score: length_score(character_count),
    };

    let total_score = base_points
        + complexity_details.score
        + scope_details.score
        + dependency_details.score
        + length_details.score;

    let clamped = clamp_score(total_score);
    let final_points = snap_to_scale(clamped);

    ScoreBreakdown {
        base_points,
        base_points_reason: task_type.base_points_reason().to_string(),
        complexity_score: complexity_details.score,
        complexity_details,
        scope_score: scope_details.score,
        scope_details,
        dependency_score: dependency_details.score,
        dependency_details,
        length_score: length_details.score,
        length_details,
        total_score,
        final_points,
        fibonacci_mapping: FibonacciMapping::new(clamped, final_points),
    }
}

/// Story points for a description; always a member of the scale.
pub fn estimate(taxonomy: &KeywordTaxonomy, description: &str, task_type: &TaskType) -> u32 {
    explain(taxonomy, description, task_type).final_points
}

/// Matched keywords of one tier and their contribution. Each keyword counts
/// once, however often it occurs.
fn tier(taxonomy: &KeywordTaxonomy, category: KeywordCategory, lowered: &str) -> (Vec<String>, i64) {
    let keywords: &KeywordSet = taxonomy.keywords(category);
    let matched: Vec<String> = keywords.matches_in(lowered).map(str::to_string).collect();
    let score = matched.len() as i64 * category.weight();
    (matched, score)
}

fn length_score(character_count: usize) -> i64 {
    ((character_count / CHARS_PER_LENGTH_POINT) as i64).min(MAX_LENGTH_SCORE)
}

/// Rule-based estimator bound to a taxonomy.
#[derive(Debug, Clone)]
pub struct RuleBasedEstimator {
    taxonomy: Arc<KeywordTaxonomy>,
}

impl RuleBasedEstimator {
    pub fn new(taxonomy: Arc<KeywordTaxonomy>) -> Self {
        Self { taxonomy }
    }

    pub fn taxonomy(&self) -> &Arc<KeywordTaxonomy> {
        &self.taxonomy
    }

    pub fn estimate(&self, description: &str, task_type: &TaskType) -> u32 {
        estimate(&self.taxonomy, description, task_type)
    }

    pub fn explain(&self, description: &str, task_type: &TaskType) -> ScoreBreakdown {
        explain(&self.taxonomy, description, task_type)
    }
}

impl Default for RuleBasedEstimator {
    fn default() -> Self {
        Self::new(Arc::new(KeywordTaxonomy::default()))
    }
}
