//! HTTP client for the text-classification endpoint

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use super::config::TextClassifierConfig;
use super::{build_context, interpret, ClassificationResponse, TextClassifierError, TransformerEstimate};
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::estimation::{Estimate, EstimationMethod, Estimator, TaskInput};
use crate::metrics::METRICS;

const UPSTREAM: &str = "text_classifier";

pub struct TextClassifierClient {
    http: Client,
    config: TextClassifierConfig,
    breaker: CircuitBreaker,
}

impl TextClassifierClient {
    pub fn new(config: TextClassifierConfig) -> Result<Self, TextClassifierError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TextClassifierError::RequestFailed(e.to_string()))?;

        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: config.circuit_breaker_failures,
            reset_timeout: config.breaker_reset_timeout(),
        });

        Ok(Self {
            http,
            config,
            breaker,
        })
    }

    pub async fn classify(
        &self,
        title: &str,
        description: &str,
    ) -> Result<TransformerEstimate, TextClassifierError> {
        if !self.config.enabled {
            return Err(TextClassifierError::Disabled);
        }

        if !self.breaker.allow(UPSTREAM) {
            METRICS.upstream_circuit_open.with_label_values(&[UPSTREAM]).inc();
            return Err(TextClassifierError::CircuitOpen);
        }

        let context = build_context(title, description, self.config.max_input_chars);
        debug!("Classifying {} characters of task text", context.chars().count());

        let start = Instant::now();
        let result = self.call_api(&context).await;
        let elapsed = start.elapsed().as_secs_f64();

        match result {
            Ok(estimate) => {
                self.breaker.record_success(UPSTREAM);
                METRICS.record_upstream(UPSTREAM, "success", elapsed);
                info!(
                    "Text classifier estimated {} points (confidence {:.2})",
                    estimate.points, estimate.confidence
                );
                Ok(estimate)
            }
            Err(e) => {
                self.breaker.record_failure(UPSTREAM);
                METRICS.record_upstream(UPSTREAM, "error", elapsed);
                error!("Text classification failed: {}", e);
                Err(e)
            }
        }
    }

    async fn call_api(&self, context: &str) -> Result<TransformerEstimate, TextClassifierError> {
        let body = json!({
            "inputs": context,
            "options": { "wait_for_model": true }
        });

        let mut req = self.http.post(&self.config.endpoint_url).json(&body);
        if let Some(token) = &self.config.api_token {
            req = req.bearer_auth(token.expose_secret());
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                TextClassifierError::Timeout(e.to_string())
            } else {
                TextClassifierError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TextClassifierError::Upstream(format!(
                "Status {}: {}",
                status, error_text
            )));
        }

        let parsed: ClassificationResponse = response
            .json()
            .await
            .map_err(|e| TextClassifierError::InvalidResponse(e.to_string()))?;

        interpret(parsed.into_predictions())
    }
}

pub struct TransformerEstimator {
    client: Arc<TextClassifierClient>,
}

impl TransformerEstimator {
    pub fn new(client: Arc<TextClassifierClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Estimator for TransformerEstimator {
    fn method(&self) -> EstimationMethod {
        EstimationMethod::Transformer
    }

    async fn estimate(&self, input: &TaskInput) -> crate::error::Result<Estimate> {
        let result = self.client.classify(&input.title, &input.description).await?;
        Ok(Estimate::new(result.points, EstimationMethod::Transformer)
            .with_confidence(result.confidence))
    }
}
