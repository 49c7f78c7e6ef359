//! Story-point estimation service
//!
//! The core is a keyword-driven rule engine (`estimation`) that turns a task
//! description and type into a value on the Fibonacci scale, with a full
//! breakdown of how it got there. Around it sit a locally trained classifier
//! over the same features, remote LLM and transformer estimators, CSV import
//! of historical tasks, readability metrics and an HTTP API.

pub mod api;
pub mod circuit_breaker;
pub mod classifier;
pub mod config;
pub mod csv_import;
pub mod error;
pub mod estimation;
pub mod history;
pub mod llm;
pub mod metrics;
pub mod readability;
pub mod telemetry;
pub mod text_classifier;

pub use config::Config;
pub use error::{EstimatorError, Result};
pub use estimation::{
    estimate, explain, extract_features, index_to_points, points_to_index, KeywordTaxonomy,
    RuleBasedEstimator, ScoreBreakdown, TaskType,
};
