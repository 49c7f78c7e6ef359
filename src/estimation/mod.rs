//! Keyword-driven estimation engine
//!
//! Everything in here is pure and synchronous: the same description, task
//! type and taxonomy always give the same result, and no call touches shared
//! mutable state.
//!
//! - `taxonomy`: categorized keyword lists and their weights
//! - `scorer`: rule-based estimate and its breakdown
//! - `features`: fixed-length vector for the learned classifier
//! - `scale`: the Fibonacci scale, snapping and label encoding

pub mod breakdown;
pub mod features;
pub mod scale;
pub mod scorer;
pub mod strategy;
pub mod task_type;
pub mod taxonomy;

pub use breakdown::{
    ComplexityDetails, DependencyDetails, FibonacciMapping, LengthDetails, ScopeDetails,
    ScoreBreakdown,
};
pub use features::{extract_features, FeatureVector, FEATURE_COUNT};
pub use scale::{index_to_points, is_on_scale, points_to_index, snap_to_scale, FIBONACCI_SCALE};
pub use scorer::{estimate, explain, RuleBasedEstimator};
pub use strategy::{compare, ComparisonEntry, Estimate, EstimationMethod, Estimator, TaskInput};
pub use task_type::TaskType;
pub use taxonomy::{KeywordCategory, KeywordSet, KeywordTaxonomy, TaxonomyError};

/// Description length in UTF-16 code units. Characters outside the Basic
/// Multilingual Plane, such as most emoji, count as two.
pub(crate) fn text_length(text: &str) -> usize {
    text.encode_utf16().count()
}
