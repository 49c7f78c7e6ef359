//! Crate-level error type

use thiserror::Error;

use crate::csv_import::CsvImportError;
use crate::estimation::TaxonomyError;
use crate::llm::LlmError;
use crate::text_classifier::TextClassifierError;

/// Errors surfaced by the service around the estimation core.
///
/// The scoring functions themselves are total and never produce one.
#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Keyword taxonomy error: {0}")]
    Taxonomy(#[from] TaxonomyError),

    #[error("CSV import error: {0}")]
    CsvImport(#[from] CsvImportError),

    #[error("LLM estimator error: {0}")]
    Llm(#[from] LlmError),

    #[error("Text classifier error: {0}")]
    TextClassifier(#[from] TextClassifierError),

    #[error("Classifier has not been trained yet")]
    ModelNotTrained,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, EstimatorError>;
