//! LLM client against a mock chat-completions server

use secrecy::SecretString;
use story_points::llm::models::DEFAULT_POINTS_NOTE;
use story_points::llm::{AiModel, LlmClient, LlmConfig, LlmError};
use story_points::TaskType;

fn config_for(server: &mockito::Server) -> LlmConfig {
    let mut config = LlmConfig::default();
    config.groq.base_url = server.url();
    config.groq.api_key = Some(SecretString::new("test-key".to_string()));
    config.retry_backoff_ms = 1;
    config.cache_ttl_secs = 0;
    config
}

fn reply(content: &str) -> String {
    serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
    .to_string()
}

fn error_body(message: &str) -> String {
    serde_json::json!({ "error": { "message": message } }).to_string()
}

#[tokio::test]
async fn test_estimate_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(reply("8"))
        .expect(1)
        .create_async()
        .await;

    let client = LlmClient::new(config_for(&server)).unwrap();
    let result = client
        .estimate(AiModel::Groq, "Implementar integração com gateway", &TaskType::Feature)
        .await
        .unwrap();

    assert_eq!(result.points, 8);
    assert!(result.note.is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_off_scale_reply_uses_default() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(reply("Probably around 4 points"))
        .create_async()
        .await;

    let client = LlmClient::new(config_for(&server)).unwrap();
    let result = client
        .estimate(AiModel::Groq, "Ajustar texto", &TaskType::Bug)
        .await
        .unwrap();

    assert_eq!(result.points, 3);
    assert_eq!(result.note.as_deref(), Some(DEFAULT_POINTS_NOTE));
}

#[tokio::test]
async fn test_credit_limit_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(400)
        .with_body(error_body("Your team has used all available credits"))
        .expect(1)
        .create_async()
        .await;

    let client = LlmClient::new(config_for(&server)).unwrap();
    let err = client
        .estimate(AiModel::Groq, "Nova tela", &TaskType::Feature)
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::CreditLimitExceeded(_)));
    assert_eq!(err.status_code(), 429);
    assert_eq!(err.error_code(), "CREDIT_LIMIT_EXCEEDED");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_model_access_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(404)
        .with_body(error_body(
            "The model `llama` does not exist or you do not have access to it.",
        ))
        .create_async()
        .await;

    let client = LlmClient::new(config_for(&server)).unwrap();
    let err = client
        .estimate(AiModel::Groq, "Nova tela", &TaskType::Feature)
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::ModelAccess { model: AiModel::Groq, .. }));
    assert_eq!(err.error_code(), "MODEL_ACCESS_ERROR");
}

#[tokio::test]
async fn test_unauthorized_maps_to_api_key_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body("unauthorized")
        .create_async()
        .await;

    let client = LlmClient::new(config_for(&server)).unwrap();
    let err = client
        .estimate(AiModel::Groq, "Nova tela", &TaskType::Feature)
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::ApiKey(_)));
    assert_eq!(err.status_code(), 401);
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body("internal error")
        .expect(3)
        .create_async()
        .await;

    let mut config = config_for(&server);
    config.retry_attempts = 2;
    config.circuit_breaker_failures = 10;
    let client = LlmClient::new(config).unwrap();

    let err = client
        .estimate(AiModel::Groq, "Nova tela", &TaskType::Feature)
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::Api(_)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rate_limit_status_is_classified() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_body("slow down")
        .create_async()
        .await;

    let mut config = config_for(&server);
    config.retry_attempts = 0;
    let client = LlmClient::new(config).unwrap();

    let err = client
        .estimate(AiModel::Groq, "Nova tela", &TaskType::Feature)
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::RateLimited(_)));
    assert_eq!(err.error_code(), "RATE_LIMIT_EXCEEDED");
}

#[tokio::test]
async fn test_circuit_opens_after_failures() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let mut config = config_for(&server);
    config.retry_attempts = 0;
    config.circuit_breaker_failures = 1;
    let client = LlmClient::new(config).unwrap();

    assert!(client
        .estimate(AiModel::Groq, "a", &TaskType::Feature)
        .await
        .is_err());

    let err = client
        .estimate(AiModel::Groq, "b", &TaskType::Feature)
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::CircuitOpen(AiModel::Groq)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_retries_stop_once_circuit_opens() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body("internal error")
        .expect(1)
        .create_async()
        .await;

    let mut config = config_for(&server);
    config.retry_attempts = 3;
    config.circuit_breaker_failures = 1;
    let client = LlmClient::new(config).unwrap();

    let err = client
        .estimate(AiModel::Groq, "Nova tela", &TaskType::Feature)
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::CircuitOpen(AiModel::Groq)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_repeated_request_is_cached() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(reply("5"))
        .expect(1)
        .create_async()
        .await;

    let mut config = config_for(&server);
    config.cache_ttl_secs = 60;
    let client = LlmClient::new(config).unwrap();

    for _ in 0..2 {
        let result = client
            .estimate(AiModel::Groq, "Criar relatório", &TaskType::Feature)
            .await
            .unwrap();
        assert_eq!(result.points, 5);
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_key_never_calls_upstream() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .expect(0)
        .create_async()
        .await;

    let mut config = config_for(&server);
    config.grok.base_url = server.url();
    config.grok.api_key = None;
    let client = LlmClient::new(config).unwrap();

    let err = client
        .estimate(AiModel::Grok, "Criar relatório", &TaskType::Feature)
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::ApiKey(_)));
    mock.assert_async().await;
}
