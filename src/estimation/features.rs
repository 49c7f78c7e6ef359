//! Feature extraction for the learned classifier
//!
//! Keyword counts here are occurrence counts, unlike the presence test used
//! by the scorer: a keyword repeated three times adds three to its tier.

use serde::{Deserialize, Serialize};

use super::taxonomy::{KeywordCategory, KeywordTaxonomy};
use super::task_type::TaskType;

/// Number of features produced per task.
pub const FEATURE_COUNT: usize = 13;

const LENGTH_NORMALIZER: f32 = 1000.0;
const COMPLEXITY_NORMALIZER: f32 = 5.0;
const SCOPE_NORMALIZER: f32 = 3.0;
const DEPENDENCY_NORMALIZER: f32 = 3.0;
const WORD_NORMALIZER: f32 = 100.0;

/// Fixed-length encoding of a task, every value in `[0, 1]`.
///
/// Layout: one-hot task type (4), description length, complexity
/// high/medium/low, scope large/medium/small, dependency, word count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f32; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Squared Euclidean distance to another vector.
    pub fn squared_distance(&self, other: &FeatureVector) -> f32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self([0.0; FEATURE_COUNT])
    }
}

pub fn extract_features(
    taxonomy: &KeywordTaxonomy,
    description: &str,
    task_type: &TaskType,
) -> FeatureVector {
    let lowered = description.to_lowercase();
    let mut features = [0.0_f32; FEATURE_COUNT];

    if let Some(index) = task_type.one_hot_index() {
        features[index] = 1.0;
    }

    features[4] = normalized(super::text_length(description), LENGTH_NORMALIZER);

    let count = |category: KeywordCategory| taxonomy.keywords(category).occurrences_in(&lowered);

    features[5] = normalized(count(KeywordCategory::ComplexityHigh), COMPLEXITY_NORMALIZER);
    features[6] = normalized(count(KeywordCategory::ComplexityMedium), COMPLEXITY_NORMALIZER);
    features[7] = normalized(count(KeywordCategory::ComplexityLow), COMPLEXITY_NORMALIZER);

    features[8] = normalized(count(KeywordCategory::ScopeLarge), SCOPE_NORMALIZER);
    features[9] = normalized(count(KeywordCategory::ScopeMedium), SCOPE_NORMALIZER);
    features[10] = normalized(count(KeywordCategory::ScopeSmall), SCOPE_NORMALIZER);

    features[11] = normalized(count(KeywordCategory::Dependency), DEPENDENCY_NORMALIZER);

    features[12] = normalized(word_count(description), WORD_NORMALIZER);

    FeatureVector(features)
}

/// Tokens left by splitting on whitespace runs. A leading or trailing run
/// leaves an empty token, and empty text is a single empty token.
fn word_count(text: &str) -> usize {
    let mut runs = 0;
    let mut in_run = false;
    for c in text.chars() {
        let whitespace = c.is_whitespace();
        if whitespace && !in_run {
            runs += 1;
        }
        in_run = whitespace;
    }
    runs + 1
}

fn normalized(count: usize, normalizer: f32) -> f32 {
    (count as f32 / normalizer).min(1.0)
}
