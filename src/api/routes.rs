//! Router configuration

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{self, AppState};

/// Build the service router with request tracing and a body size limit.
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    let estimation = Router::new()
        .route("/api/v1/estimate", post(handlers::estimate))
        .route("/api/v1/estimate/ai", post(handlers::estimate_ai))
        .route("/api/v1/estimate/transformer", post(handlers::estimate_transformer))
        .route("/api/v1/estimate/compare", post(handlers::estimate_compare))
        .route("/api/v1/explain", post(handlers::explain))
        .route("/api/v1/features", post(handlers::features))
        .route("/api/v1/readability", post(handlers::readability));

    let keywords = Router::new()
        .route(
            "/api/v1/keywords",
            get(handlers::get_keywords).put(handlers::put_keywords),
        )
        .route("/api/v1/keywords/reset", post(handlers::reset_keywords))
        .route("/api/v1/keywords/:category", post(handlers::add_keyword))
        .route(
            "/api/v1/keywords/:category/:keyword",
            delete(handlers::remove_keyword),
        );

    let history = Router::new()
        .route(
            "/api/v1/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route("/api/v1/tasks/import", post(handlers::import_tasks))
        .route("/api/v1/tasks/import/sample", get(handlers::sample_csv))
        .route("/api/v1/tasks/:id", delete(handlers::delete_task))
        .route("/api/v1/model", get(handlers::model_status))
        .route("/api/v1/model/train", post(handlers::train_model));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .merge(estimation)
        .merge(keywords)
        .merge(history)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
