//! HTTP handlers

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::models::*;
use crate::classifier::{ClassifierEstimator, ClassifierService, ModelStats, MIN_TRAINING_TASKS};
use crate::csv_import::{self, CsvImportError};
use crate::error::EstimatorError;
use crate::estimation::{
    compare, extract_features, Estimator, EstimationMethod, KeywordCategory, KeywordTaxonomy,
    RuleBasedEstimator, TaskInput, TaskType,
};
use crate::history::{NewTask, Task, TaskStore};
use crate::llm::{AiModel, LlmClient, LlmError, LlmEstimator};
use crate::metrics::METRICS;
use crate::readability::{
    calculate_readability_metrics, interpret_flesch_kincaid_grade, interpret_flesch_reading_ease,
};
use crate::text_classifier::{
    TextClassifierClient, TextClassifierError, TransformerEstimate, TransformerEstimator,
};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;
type Rejection = (StatusCode, Json<ApiError>);

/// Shared service state
#[derive(Clone)]
pub struct AppState {
    /// Swapped wholesale on update; readers keep the snapshot they took
    pub taxonomy: Arc<RwLock<Arc<KeywordTaxonomy>>>,
    pub keywords_path: Option<PathBuf>,
    pub tasks: Arc<TaskStore>,
    pub classifier: Arc<ClassifierService>,
    pub llm: Arc<LlmClient>,
    pub text_classifier: Arc<TextClassifierClient>,
}

impl AppState {
    pub fn new(
        taxonomy: KeywordTaxonomy,
        keywords_path: Option<PathBuf>,
        tasks: TaskStore,
        classifier: ClassifierService,
        llm: LlmClient,
        text_classifier: TextClassifierClient,
    ) -> Self {
        Self {
            taxonomy: Arc::new(RwLock::new(Arc::new(taxonomy))),
            keywords_path,
            tasks: Arc::new(tasks),
            classifier: Arc::new(classifier),
            llm: Arc::new(llm),
            text_classifier: Arc::new(text_classifier),
        }
    }

    pub async fn taxonomy(&self) -> Arc<KeywordTaxonomy> {
        self.taxonomy.read().await.clone()
    }

    async fn rules(&self) -> RuleBasedEstimator {
        RuleBasedEstimator::new(self.taxonomy().await)
    }

    /// Retrain from the full history once there is enough of it. Failures
    /// are logged; the previous model stays in place.
    async fn retrain(&self) -> Option<ModelStats> {
        if self.tasks.len() < MIN_TRAINING_TASKS {
            return None;
        }
        let taxonomy = self.taxonomy().await;
        match self.classifier.train(&taxonomy, &self.tasks.list()).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Classifier retraining failed: {}", e);
                None
            }
        }
    }

    /// Apply `edit` to a copy of the taxonomy, persist it and swap it in.
    /// The write guard is held across the save so concurrent edits apply
    /// one after another. Returns whether `edit` reported a change.
    async fn update_taxonomy<F>(&self, edit: F) -> Result<bool, Rejection>
    where
        F: FnOnce(&mut KeywordTaxonomy) -> Result<bool, Rejection>,
    {
        let mut current = self.taxonomy.write().await;
        let mut taxonomy = (**current).clone();
        if !edit(&mut taxonomy)? {
            return Ok(false);
        }

        if let Some(path) = &self.keywords_path {
            taxonomy.save_to(path).await.map_err(|e| {
                error!("Failed to save keywords to {}: {}", path.display(), e);
                internal_error(e)
            })?;
        }
        *current = Arc::new(taxonomy);
        drop(current);

        // Features depend on the keywords, so the model is refit against them
        self.retrain().await;
        Ok(true)
    }

    async fn replace_taxonomy(&self, taxonomy: KeywordTaxonomy) -> Result<(), Rejection> {
        self.update_taxonomy(|current| {
            *current = taxonomy;
            Ok(true)
        })
        .await
        .map(|_| ())
    }
}

fn validation_error(message: impl Into<String>) -> Rejection {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError::new(error_codes::VALIDATION_ERROR, message)),
    )
}

fn internal_error(e: impl std::fmt::Display) -> Rejection {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::new(error_codes::INTERNAL_ERROR, e.to_string())),
    )
}

fn status_from(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn llm_rejection(e: &LlmError, fallback_points: u32) -> Rejection {
    (
        status_from(e.status_code()),
        Json(
            ApiError::new(e.error_code(), e.to_string())
                .with_user_message(e.user_message())
                .with_fallback(fallback_points),
        ),
    )
}

fn text_classifier_rejection(e: &TextClassifierError, fallback_points: u32) -> Rejection {
    (
        status_from(e.status_code()),
        Json(
            ApiError::new(e.error_code(), e.to_string())
                .with_user_message("The transformer model is unavailable. Use the rule-based estimate.")
                .with_fallback(fallback_points),
        ),
    )
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /metrics
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        METRICS.export_prometheus(),
    )
}

/// Rule-based estimate plus the classifier's, when one is trained
///
/// POST /api/v1/estimate
pub async fn estimate(
    State(state): State<AppState>,
    Json(input): Json<TaskInput>,
) -> ApiResult<EstimateResponse> {
    let taxonomy = state.taxonomy().await;
    let rule_based_points =
        crate::estimation::estimate(&taxonomy, &input.description, &input.task_type);
    let classifier_points = state
        .classifier
        .predict(&taxonomy, &input.description, &input.task_type)
        .await;

    let (suggested_points, suggested_by) = match classifier_points {
        Some(points) => (points, EstimationMethod::Classifier),
        None => (rule_based_points, EstimationMethod::Rules),
    };

    info!(
        "Estimated {} points (rules {}, classifier {:?})",
        suggested_points, rule_based_points, classifier_points
    );
    METRICS.record_estimate(EstimationMethod::Rules.as_str(), true);

    Ok(Json(EstimateResponse {
        rule_based_points,
        classifier_points,
        suggested_points,
        suggested_by,
    }))
}

/// POST /api/v1/explain
pub async fn explain(
    State(state): State<AppState>,
    Json(input): Json<TaskInput>,
) -> ApiResult<ExplainResponse> {
    let breakdown = state.rules().await.explain(&input.description, &input.task_type);
    Ok(Json(ExplainResponse {
        points: breakdown.final_points,
        breakdown,
    }))
}

/// POST /api/v1/features
pub async fn features(
    State(state): State<AppState>,
    Json(input): Json<TaskInput>,
) -> ApiResult<FeaturesResponse> {
    let taxonomy = state.taxonomy().await;
    let vector = extract_features(&taxonomy, &input.description, &input.task_type);
    Ok(Json(FeaturesResponse {
        names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
        features: vector.as_slice().to_vec(),
    }))
}

/// Estimate with a remote LLM
///
/// POST /api/v1/estimate/ai
pub async fn estimate_ai(
    State(state): State<AppState>,
    Json(request): Json<AiEstimateRequest>,
) -> ApiResult<AiEstimateResponse> {
    if request.description.trim().is_empty()
        || request.task_type.trim().is_empty()
        || request.model.trim().is_empty()
    {
        return Err(validation_error(
            "description, taskType and model are required",
        ));
    }

    let task_type = TaskType::parse(&request.task_type);
    let fallback = state.rules().await.estimate(&request.description, &task_type);

    let model: AiModel = request.model.parse().map_err(|e: LlmError| {
        warn!("Rejected AI estimate for model {:?}", request.model);
        llm_rejection(&e, fallback)
    })?;

    info!("AI estimate request: model={}", model);

    match state.llm.estimate(model, &request.description, &task_type).await {
        Ok(result) => {
            METRICS.record_estimate(EstimationMethod::Llm.as_str(), true);
            Ok(Json(AiEstimateResponse {
                points: result.points,
                model: model.to_string(),
                note: result.note,
            }))
        }
        Err(e) => {
            METRICS.record_estimate(EstimationMethod::Llm.as_str(), false);
            error!("AI estimate failed: {}", e);
            Err(llm_rejection(&e, fallback))
        }
    }
}

/// POST /api/v1/estimate/transformer
pub async fn estimate_transformer(
    State(state): State<AppState>,
    Json(request): Json<TransformerEstimateRequest>,
) -> ApiResult<TransformerEstimate> {
    if request.title.trim().is_empty() || request.description.trim().is_empty() {
        return Err(validation_error("title and description are required"));
    }

    match state
        .text_classifier
        .classify(&request.title, &request.description)
        .await
    {
        Ok(result) => {
            METRICS.record_estimate(EstimationMethod::Transformer.as_str(), true);
            Ok(Json(result))
        }
        Err(e) => {
            METRICS.record_estimate(EstimationMethod::Transformer.as_str(), false);
            let fallback = state
                .rules()
                .await
                .estimate(&request.description, &TaskType::default());
            Err(text_classifier_rejection(&e, fallback))
        }
    }
}

/// Run the selected strategies side by side
///
/// POST /api/v1/estimate/compare
pub async fn estimate_compare(
    State(state): State<AppState>,
    Json(request): Json<CompareRequest>,
) -> ApiResult<CompareResponse> {
    let rules = state.rules().await;
    let mut estimators: Vec<Arc<dyn Estimator>> = vec![
        Arc::new(rules.clone()),
        Arc::new(ClassifierEstimator::new(
            state.classifier.clone(),
            rules.taxonomy().clone(),
        )),
    ];

    if let Some(model) = &request.model {
        let rule_points = rules.estimate(&request.task.description, &request.task.task_type);
        let model: AiModel = model
            .parse()
            .map_err(|e: LlmError| llm_rejection(&e, rule_points))?;
        estimators.push(Arc::new(LlmEstimator::new(state.llm.clone(), model)));
    }

    if request.include_transformer {
        estimators.push(Arc::new(TransformerEstimator::new(
            state.text_classifier.clone(),
        )));
    }

    let results = compare(&rules, &estimators, &request.task).await;
    Ok(Json(CompareResponse {
        rule_based_points: rules.estimate(&request.task.description, &request.task.task_type),
        results,
    }))
}

/// GET /api/v1/keywords
pub async fn get_keywords(State(state): State<AppState>) -> ApiResult<KeywordsResponse> {
    let taxonomy = state.taxonomy().await;
    Ok(Json(KeywordsResponse::new(&*taxonomy)))
}

/// Replace the whole taxonomy
///
/// PUT /api/v1/keywords
pub async fn put_keywords(
    State(state): State<AppState>,
    Json(taxonomy): Json<KeywordTaxonomy>,
) -> ApiResult<KeywordsResponse> {
    info!("Replacing keyword taxonomy ({} keywords)", taxonomy.keyword_count());
    let response = KeywordsResponse::new(&taxonomy);
    state.replace_taxonomy(taxonomy).await?;
    Ok(Json(response))
}

/// POST /api/v1/keywords/reset
pub async fn reset_keywords(State(state): State<AppState>) -> ApiResult<KeywordsResponse> {
    info!("Resetting keyword taxonomy to defaults");
    let taxonomy = KeywordTaxonomy::default();
    let response = KeywordsResponse::new(&taxonomy);
    state.replace_taxonomy(taxonomy).await?;
    Ok(Json(response))
}

fn parse_category(name: &str) -> Result<KeywordCategory, Rejection> {
    KeywordCategory::parse(name).map_err(|e| validation_error(e.to_string()))
}

/// POST /api/v1/keywords/:category
pub async fn add_keyword(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Json(request): Json<KeywordRequest>,
) -> ApiResult<KeywordChangeResponse> {
    let category = parse_category(&category)?;
    let changed = state
        .update_taxonomy(|taxonomy| {
            taxonomy
                .add_keyword(category, &request.keyword)
                .map_err(|e| validation_error(e.to_string()))
        })
        .await?;

    Ok(Json(KeywordChangeResponse {
        category: category.as_str(),
        keyword: request.keyword.trim().to_lowercase(),
        changed,
    }))
}

/// DELETE /api/v1/keywords/:category/:keyword
pub async fn remove_keyword(
    State(state): State<AppState>,
    Path((category, keyword)): Path<(String, String)>,
) -> ApiResult<KeywordChangeResponse> {
    let category = parse_category(&category)?;
    let changed = state
        .update_taxonomy(|taxonomy| Ok(taxonomy.remove_keyword(category, &keyword)))
        .await?;

    Ok(Json(KeywordChangeResponse {
        category: category.as_str(),
        keyword,
        changed,
    }))
}

/// POST /api/v1/readability
pub async fn readability(Json(request): Json<ReadabilityRequest>) -> ApiResult<ReadabilityResponse> {
    let metrics = calculate_readability_metrics(&request.text);
    Ok(Json(ReadabilityResponse {
        reading_ease: interpret_flesch_reading_ease(metrics.flesch_reading_ease),
        grade_level: interpret_flesch_kincaid_grade(metrics.flesch_kincaid_grade),
        metrics,
    }))
}

/// GET /api/v1/tasks
pub async fn list_tasks(State(state): State<AppState>) -> ApiResult<Vec<Task>> {
    Ok(Json(state.tasks.list()))
}

/// Record a task and retrain the classifier
///
/// POST /api/v1/tasks
pub async fn create_task(
    State(state): State<AppState>,
    Json(request): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), Rejection> {
    request.validate().map_err(validation_error)?;

    let rule_points = state
        .rules()
        .await
        .estimate(&request.description, &TaskType::parse(&request.task_type));

    let task = state
        .tasks
        .insert(request.into_task(rule_points))
        .await
        .map_err(internal_error)?;

    METRICS.tasks_recorded.inc();
    info!("Recorded task {} with {} points", task.id, task.final_points);

    state.retrain().await;
    Ok((StatusCode::CREATED, Json(task)))
}

/// DELETE /api/v1/tasks/:id
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, Rejection> {
    match state.tasks.remove(&id).await {
        Ok(_) => Ok(StatusCode::NO_CONTENT),
        Err(EstimatorError::TaskNotFound(id)) => Err((
            StatusCode::NOT_FOUND,
            Json(ApiError::new(
                error_codes::NOT_FOUND,
                format!("Task not found: {}", id),
            )),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

/// Import tasks from a CSV body
///
/// POST /api/v1/tasks/import
pub async fn import_tasks(State(state): State<AppState>, body: String) -> ApiResult<ImportResponse> {
    let rows = csv_import::parse_csv(&body).map_err(|e: CsvImportError| {
        warn!("CSV import rejected: {}", e);
        validation_error(e.to_string())
    })?;

    let skipped = csv_import::data_line_count(&body).saturating_sub(rows.len());
    let tasks = csv_import::csv_rows_to_tasks(rows);
    let imported = state.tasks.import(tasks).await.map_err(internal_error)?;
    METRICS.record_csv_import(imported, skipped);

    let model = state.retrain().await;
    Ok(Json(ImportResponse {
        imported,
        skipped,
        model,
    }))
}

/// GET /api/v1/tasks/import/sample
pub async fn sample_csv() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"sample-tasks.csv\"",
            ),
        ],
        csv_import::generate_sample_csv(),
    )
}

/// GET /api/v1/model
pub async fn model_status(State(state): State<AppState>) -> ApiResult<ModelStatusResponse> {
    Ok(Json(ModelStatusResponse {
        trained: state.classifier.is_trained().await,
        stats: state.classifier.stats().await,
        task_count: state.tasks.len(),
        min_training_tasks: MIN_TRAINING_TASKS,
    }))
}

/// POST /api/v1/model/train
pub async fn train_model(State(state): State<AppState>) -> ApiResult<ModelStats> {
    let taxonomy = state.taxonomy().await;
    match state.classifier.train(&taxonomy, &state.tasks.list()).await {
        Ok(Some(stats)) => Ok(Json(stats)),
        Ok(None) => Err(validation_error(format!(
            "At least {} tasks are needed to train the classifier, {} recorded",
            MIN_TRAINING_TASKS,
            state.tasks.len()
        ))),
        Err(e) => {
            error!("Classifier training failed: {}", e);
            Err(internal_error(e))
        }
    }
}
