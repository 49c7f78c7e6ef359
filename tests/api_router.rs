//! End-to-end tests of the HTTP API with in-memory state

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::path::PathBuf;
use tower::ServiceExt;

use story_points::api::{build_router, AppState};
use story_points::classifier::ClassifierService;
use story_points::history::TaskStore;
use story_points::llm::{LlmClient, LlmConfig};
use story_points::text_classifier::{TextClassifierClient, TextClassifierConfig};
use story_points::{KeywordTaxonomy, TaskType};

fn test_router() -> Router {
    router_with_keywords(None)
}

fn router_with_keywords(keywords_path: Option<PathBuf>) -> Router {
    let mut llm_config = LlmConfig::default();
    llm_config.enabled = false;
    let mut text_config = TextClassifierConfig::default();
    text_config.enabled = false;

    let state = AppState::new(
        KeywordTaxonomy::default(),
        keywords_path,
        TaskStore::in_memory(),
        ClassifierService::new(None),
        LlmClient::new(llm_config).unwrap(),
        TextClassifierClient::new(text_config).unwrap(),
    );
    build_router(state, 64 * 1024)
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let router = test_router();
    let (status, body) = send(&router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_estimate_uses_rules_without_model() {
    let router = test_router();
    let description = "Implementar integração com API externa de pagamentos e migração do banco";
    let (status, body) = send(
        &router,
        "POST",
        "/api/v1/estimate",
        Some(json!({ "description": description, "taskType": "feature" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let expected =
        story_points::estimate(&KeywordTaxonomy::default(), description, &TaskType::Feature);
    assert_eq!(body["ruleBasedPoints"], expected);
    assert_eq!(body["suggestedPoints"], expected);
    assert_eq!(body["suggestedBy"], "rules");
    assert!(body.get("classifierPoints").is_none());
}

#[tokio::test]
async fn test_explain_matches_estimate() {
    let router = test_router();
    let (status, body) = send(
        &router,
        "POST",
        "/api/v1/explain",
        Some(json!({ "description": "Corrigir texto simples no rodapé", "taskType": "bug" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["points"], body["breakdown"]["finalPoints"]);
    assert_eq!(body["breakdown"]["basePoints"], 2);
}

#[tokio::test]
async fn test_features_vector_shape() {
    let router = test_router();
    let (status, body) = send(
        &router,
        "POST",
        "/api/v1/features",
        Some(json!({ "description": "Criar relatório", "taskType": "refactor" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["names"].as_array().unwrap().len(), 13);
    let features = body["features"].as_array().unwrap();
    assert_eq!(features.len(), 13);
    assert_eq!(features[2], 1.0);
    assert_eq!(features[0], 0.0);
}

#[tokio::test]
async fn test_ai_estimate_validation() {
    let router = test_router();
    let (status, body) = send(
        &router,
        "POST",
        "/api/v1/estimate/ai",
        Some(json!({ "description": "Nova tela", "taskType": "feature" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_ai_estimate_unsupported_model_has_fallback() {
    let router = test_router();
    let (status, body) = send(
        &router,
        "POST",
        "/api/v1/estimate/ai",
        Some(json!({ "description": "Nova tela", "taskType": "feature", "model": "gpt" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNSUPPORTED_MODEL");
    assert!(body["fallbackPoints"].is_u64());
    assert!(body["userMessage"].is_string());
}

#[tokio::test]
async fn test_ai_estimate_disabled() {
    let router = test_router();
    let (status, body) = send(
        &router,
        "POST",
        "/api/v1/estimate/ai",
        Some(json!({ "description": "Nova tela", "taskType": "feature", "model": "groq" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "UPSTREAM_DISABLED");
}

#[tokio::test]
async fn test_transformer_requires_title() {
    let router = test_router();
    let (status, _) = send(
        &router,
        "POST",
        "/api/v1/estimate/transformer",
        Some(json!({ "description": "Nova tela" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_compare_reports_untrained_classifier() {
    let router = test_router();
    let (status, body) = send(
        &router,
        "POST",
        "/api/v1/estimate/compare",
        Some(json!({ "title": "t", "description": "Nova tela", "taskType": "feature" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["method"], "rules");
    assert_eq!(results[0]["deltaFromRules"], 0);
    assert_eq!(results[1]["method"], "classifier");
    assert!(results[1]["error"].is_string());
}

#[tokio::test]
async fn test_tasks_train_classifier() {
    let router = test_router();
    let samples = [
        ("Login", "Criar tela de login simples", "feature", 3),
        ("Pagamento", "Integração com gateway de pagamento externo", "feature", 8),
        ("Texto", "Corrigir texto no rodapé", "bug", 1),
        ("Menu", "Refatorar componente de navegação", "refactor", 5),
        ("Docs", "Documentar endpoints da API", "documentation", 2),
    ];

    for (title, description, task_type, points) in samples {
        let (status, body) = send(
            &router,
            "POST",
            "/api/v1/tasks",
            Some(json!({
                "title": title,
                "description": description,
                "type": task_type,
                "finalPoints": points
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["estimatedPoints"].is_u64());
    }

    let (_, tasks) = send(&router, "GET", "/api/v1/tasks", None).await;
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 5);
    assert_eq!(tasks[0]["title"], "Docs");

    let (_, model) = send(&router, "GET", "/api/v1/model", None).await;
    assert_eq!(model["trained"], true);
    assert_eq!(model["taskCount"], 5);
    assert_eq!(model["stats"]["trainedOn"], 5);

    let (_, estimate) = send(
        &router,
        "POST",
        "/api/v1/estimate",
        Some(json!({ "description": "Corrigir texto", "taskType": "bug" })),
    )
    .await;
    assert_eq!(estimate["suggestedBy"], "classifier");
    assert!(estimate["classifierPoints"].is_u64());
}

#[tokio::test]
async fn test_create_task_rejects_off_scale_points() {
    let router = test_router();
    let (status, body) = send(
        &router,
        "POST",
        "/api/v1/tasks",
        Some(json!({ "title": "x", "description": "y", "finalPoints": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_delete_unknown_task() {
    let router = test_router();
    let (status, body) = send(&router, "DELETE", "/api/v1/tasks/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_train_without_enough_tasks() {
    let router = test_router();
    let (status, _) = send(&router, "POST", "/api/v1/model/train", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_import_csv() {
    let router = test_router();
    let csv = "title,description,type,storyPoints\n\
               Login,Criar tela de login,feature,5\n\
               Bug,Corrigir erro,bug,abc\n\
               Docs,Documentar API,docs,2\n";

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/tasks/import")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(csv))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["imported"], 2);
    assert_eq!(body["skipped"], 1);

    let (_, tasks) = send(&router, "GET", "/api/v1/tasks", None).await;
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[1]["type"], "documentation");
}

#[tokio::test]
async fn test_import_missing_columns() {
    let router = test_router();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/tasks/import")
        .body(Body::from("title,description\nA,B\n"))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sample_csv() {
    let router = test_router();
    let request = Request::builder()
        .uri("/api/v1/tasks/import/sample")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
}

#[tokio::test]
async fn test_keyword_updates() {
    let router = test_router();

    let (status, body) = send(
        &router,
        "POST",
        "/api/v1/keywords/complexity.high",
        Some(json!({ "keyword": "  Kubernetes " })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], true);
    assert_eq!(body["keyword"], "kubernetes");

    let (_, keywords) = send(&router, "GET", "/api/v1/keywords", None).await;
    let high = keywords["taxonomy"]["complexity"]["high"].as_array().unwrap();
    assert!(high.iter().any(|k| k == "kubernetes"));

    let (status, body) = send(
        &router,
        "DELETE",
        "/api/v1/keywords/complexity.high/kubernetes",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], true);

    let (status, _) = send(
        &router,
        "POST",
        "/api/v1/keywords/complexity.extreme",
        Some(json!({ "keyword": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_keyword_additions_are_all_kept() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keywords.json");
    let router = router_with_keywords(Some(path.clone()));

    let handles: Vec<_> = (0..64)
        .map(|i| {
            let router = router.clone();
            tokio::spawn(async move {
                send(
                    &router,
                    "POST",
                    "/api/v1/keywords/dependency",
                    Some(json!({ "keyword": format!("vendor-{}", i) })),
                )
                .await
            })
        })
        .collect();
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], true);
    }

    let (_, keywords) = send(&router, "GET", "/api/v1/keywords", None).await;
    let served: KeywordTaxonomy = serde_json::from_value(keywords["taxonomy"].clone()).unwrap();
    let saved = KeywordTaxonomy::load_from(&path).await.unwrap();
    for i in 0..64 {
        let keyword = format!("vendor-{}", i);
        assert!(served.dependency.contains(&keyword), "{} missing from memory", keyword);
        assert!(saved.dependency.contains(&keyword), "{} missing from file", keyword);
    }
    assert_eq!(served, saved);
}

#[tokio::test]
async fn test_reset_keywords() {
    let router = test_router();
    let (status, body) = send(&router, "POST", "/api/v1/keywords/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        serde_json::from_value::<KeywordTaxonomy>(body["taxonomy"].clone()).unwrap(),
        KeywordTaxonomy::default()
    );
    assert_eq!(body["categories"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn test_readability() {
    let router = test_router();
    let (status, body) = send(
        &router,
        "POST",
        "/api/v1/readability",
        Some(json!({ "text": "O sistema deve permitir login. O usuário informa a senha." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metrics"]["sentenceCount"], 2);
    assert!(body["readingEase"]["level"].is_string());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let router = test_router();
    let (status, _) = send(&router, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
}
