//! Locally trained classifier over task feature vectors
//!
//! Labels are positions on the story-point scale (`points_to_index`), and
//! predictions are decoded back with `index_to_points`.

pub mod centroid;

pub use centroid::CentroidClassifier;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{EstimatorError, Result};
use crate::estimation::{
    extract_features, index_to_points, points_to_index, Estimate, EstimationMethod, Estimator,
    FeatureVector, KeywordTaxonomy, TaskInput, TaskType, FIBONACCI_SCALE,
};
use crate::history::Task;
use crate::metrics::METRICS;

/// Fewest labelled tasks needed before a model is trained.
pub const MIN_TRAINING_TASKS: usize = 5;

/// Number of output classes (one per scale value).
pub const NUM_CLASSES: usize = FIBONACCI_SCALE.len();

/// A model mapping feature vectors to scale positions.
pub trait FeatureClassifier: Send + Sync {
    fn predict_index(&self, features: &FeatureVector) -> usize;

    fn predict_points(&self, features: &FeatureVector) -> u32 {
        index_to_points(self.predict_index(features))
    }
}

/// One labelled training example.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    pub features: FeatureVector,
    pub label: usize,
}

/// Build training examples from task history. Tasks whose final points are
/// off the scale carry no label and are skipped.
pub fn training_set(taxonomy: &KeywordTaxonomy, tasks: &[Task]) -> Vec<TrainingExample> {
    tasks
        .iter()
        .filter_map(|task| {
            let Some(label) = points_to_index(task.final_points) else {
                warn!(
                    "Skipping task {} with off-scale points {}",
                    task.id, task.final_points
                );
                return None;
            };
            let task_type = TaskType::parse(&task.task_type);
            Some(TrainingExample {
                features: extract_features(taxonomy, &task.description, &task_type),
                label,
            })
        })
        .collect()
}

/// Training summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStats {
    pub trained_on: usize,
    pub last_trained_at: Option<DateTime<Utc>>,
    pub accuracy: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModelSnapshot {
    model: CentroidClassifier,
    stats: ModelStats,
}

#[derive(Debug, Default)]
struct TrainedModel {
    model: Option<CentroidClassifier>,
    stats: ModelStats,
}

/// Holds the current model, retrains it from history and persists it.
pub struct ClassifierService {
    state: RwLock<TrainedModel>,
    model_path: Option<PathBuf>,
}

impl ClassifierService {
    pub fn new(model_path: Option<PathBuf>) -> Self {
        Self {
            state: RwLock::new(TrainedModel::default()),
            model_path,
        }
    }

    /// Restore a persisted model if one exists.
    pub async fn load(model_path: Option<PathBuf>) -> Result<Self> {
        let service = Self::new(model_path);
        if let Some(path) = service.model_path.as_deref() {
            if tokio::fs::try_exists(path).await? {
                let content = tokio::fs::read_to_string(path).await?;
                let snapshot: ModelSnapshot = serde_json::from_str(&content)?;
                info!(
                    "Loaded classifier trained on {} tasks from {}",
                    snapshot.stats.trained_on,
                    path.display()
                );
                let mut state = service.state.write().await;
                state.model = Some(snapshot.model);
                state.stats = snapshot.stats;
            } else {
                debug!("No saved classifier at {}", path.display());
            }
        }
        Ok(service)
    }

    pub async fn is_trained(&self) -> bool {
        self.state.read().await.model.is_some()
    }

    pub async fn stats(&self) -> ModelStats {
        self.state.read().await.stats.clone()
    }

    /// Retrain from history. Returns `Ok(None)` when there is not enough
    /// labelled data, leaving any previous model in place.
    pub async fn train(
        &self,
        taxonomy: &KeywordTaxonomy,
        tasks: &[Task],
    ) -> Result<Option<ModelStats>> {
        if tasks.len() < MIN_TRAINING_TASKS {
            info!(
                "Not enough data to train the classifier: {} of {} tasks",
                tasks.len(),
                MIN_TRAINING_TASKS
            );
            return Ok(None);
        }

        let examples = training_set(taxonomy, tasks);
        let Some(model) = CentroidClassifier::fit(&examples) else {
            warn!("Classifier training skipped: no labelled examples");
            return Ok(None);
        };

        let stats = ModelStats {
            trained_on: tasks.len(),
            last_trained_at: Some(Utc::now()),
            accuracy: Some(model.accuracy(&examples)),
        };

        info!(
            "Trained classifier on {} tasks (training accuracy {:.2})",
            stats.trained_on,
            stats.accuracy.unwrap_or_default()
        );
        METRICS.classifier_trainings.inc();

        // Held across the save so concurrent retrains write one at a time
        let mut state = self.state.write().await;
        if let Some(path) = self.model_path.as_deref() {
            save_snapshot(path, &model, &stats).await?;
        }
        state.model = Some(model);
        state.stats = stats.clone();

        Ok(Some(stats))
    }

    /// Predicted points, or `None` when no model has been trained.
    pub async fn predict(
        &self,
        taxonomy: &KeywordTaxonomy,
        description: &str,
        task_type: &TaskType,
    ) -> Option<u32> {
        let state = self.state.read().await;
        let model = state.model.as_ref()?;
        let features = extract_features(taxonomy, description, task_type);
        Some(model.predict_points(&features))
    }
}

async fn save_snapshot(path: &Path, model: &CentroidClassifier, stats: &ModelStats) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let snapshot = ModelSnapshot {
        model: model.clone(),
        stats: stats.clone(),
    };
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, serde_json::to_vec_pretty(&snapshot)?).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!("Saved classifier to {}", path.display());
    Ok(())
}

/// Classifier paired with the taxonomy its features are extracted with.
pub struct ClassifierEstimator {
    service: Arc<ClassifierService>,
    taxonomy: Arc<KeywordTaxonomy>,
}

impl ClassifierEstimator {
    pub fn new(service: Arc<ClassifierService>, taxonomy: Arc<KeywordTaxonomy>) -> Self {
        Self { service, taxonomy }
    }
}

#[async_trait]
impl Estimator for ClassifierEstimator {
    fn method(&self) -> EstimationMethod {
        EstimationMethod::Classifier
    }

    async fn estimate(&self, input: &TaskInput) -> Result<Estimate> {
        self.service
            .predict(&self.taxonomy, &input.description, &input.task_type)
            .await
            .map(|points| Estimate::new(points, EstimationMethod::Classifier))
            .ok_or(EstimatorError::ModelNotTrained)
    }
}
