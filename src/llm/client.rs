//! Chat-completions client with retry, caching and circuit breaker

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::Client;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use super::config::{LlmConfig, ProviderConfig};
use super::models::{
    parse_points, AiModel, ApiErrorBody, ChatMessage, ChatRequest, ChatResponse, LlmEstimate,
};
use super::prompt::build_prompt;
use super::LlmError;
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::estimation::{Estimate, EstimationMethod, Estimator, TaskInput, TaskType};
use crate::metrics::METRICS;

pub struct LlmClient {
    http: Client,
    config: LlmConfig,
    cache: Option<Cache<String, LlmEstimate>>,
    semaphore: Semaphore,
    breaker: CircuitBreaker,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LlmError::Api(e.to_string()))?;

        let cache = (config.cache_ttl_secs > 0).then(|| {
            Cache::builder()
                .max_capacity(config.cache_max_size)
                .time_to_live(config.cache_ttl())
                .build()
        });

        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: config.circuit_breaker_failures,
            reset_timeout: config.breaker_reset_timeout(),
        });

        Ok(Self {
            http,
            semaphore: Semaphore::new(config.max_concurrent_requests.max(1)),
            config,
            cache,
            breaker,
        })
    }

    fn provider(&self, model: AiModel) -> &ProviderConfig {
        match model {
            AiModel::Groq => &self.config.groq,
            AiModel::Grok => &self.config.grok,
        }
    }

    /// Ask `model` for an estimate of the task.
    pub async fn estimate(
        &self,
        model: AiModel,
        description: &str,
        task_type: &TaskType,
    ) -> Result<LlmEstimate, LlmError> {
        let upstream = model.as_str();

        if !self.config.enabled {
            return Err(LlmError::Disabled);
        }

        let key = cache_key(model, task_type, description);
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key).await {
                debug!("LLM cache hit for {}", upstream);
                METRICS.upstream_cache_hits.with_label_values(&[upstream]).inc();
                return Ok(hit);
            }
        }

        if self.provider(model).api_key.is_none() {
            return Err(LlmError::ApiKey(format!(
                "No API key configured for {}",
                upstream
            )));
        }

        if !self.breaker.allow(upstream) {
            METRICS.upstream_circuit_open.with_label_values(&[upstream]).inc();
            error!("Circuit breaker is open for {}", upstream);
            return Err(LlmError::CircuitOpen(model));
        }

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        let start = Instant::now();
        let prompt = build_prompt(description, task_type);
        let mut attempt = 0;

        let reply = loop {
            attempt += 1;

            match self.call_api(model, &prompt).await {
                Ok(text) => {
                    self.breaker.record_success(upstream);
                    METRICS.record_upstream(upstream, "success", start.elapsed().as_secs_f64());
                    break text;
                }
                Err(e) => {
                    self.breaker.record_failure(upstream);

                    if !e.is_transient() || attempt > self.config.retry_attempts {
                        METRICS.record_upstream(upstream, "error", start.elapsed().as_secs_f64());
                        error!("{} estimate failed after {} attempts: {}", upstream, attempt, e);
                        return Err(e);
                    }

                    // The failure just recorded may have opened the circuit
                    if !self.breaker.allow(upstream) {
                        METRICS.upstream_circuit_open.with_label_values(&[upstream]).inc();
                        METRICS.record_upstream(upstream, "error", start.elapsed().as_secs_f64());
                        error!("Circuit breaker opened for {} after {} attempts", upstream, attempt);
                        return Err(LlmError::CircuitOpen(model));
                    }

                    let backoff = self.calculate_backoff(attempt);
                    warn!(
                        "{} attempt {} failed: {}, retrying in {:?}",
                        upstream, attempt, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        };

        let estimate = parse_points(&reply);
        if estimate.note.is_some() {
            warn!("{} gave a non-standard answer, using default points", upstream);
        }
        info!("{} estimated {} points", upstream, estimate.points);

        if let Some(cache) = &self.cache {
            cache.insert(key, estimate.clone()).await;
        }

        Ok(estimate)
    }

    /// One chat-completions round trip, returning the reply text.
    async fn call_api(&self, model: AiModel, prompt: &str) -> Result<String, LlmError> {
        let provider = self.provider(model);
        let api_key = provider
            .api_key
            .as_ref()
            .ok_or_else(|| LlmError::ApiKey(format!("No API key configured for {}", model)))?;

        let request = ChatRequest {
            model: provider.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!("Calling {} model {}", model, provider.model);

        let response = self
            .http
            .post(provider.chat_completions_url())
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(e.to_string())
                } else {
                    LlmError::Api(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(LlmError::classify(model, Some(status.as_u16()), &message));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        chat.text()
            .map(str::to_string)
            .ok_or_else(|| LlmError::InvalidResponse("Reply had no message content".to_string()))
    }

    fn calculate_backoff(&self, attempt: usize) -> Duration {
        let multiplier = 2_u32.saturating_pow(attempt.saturating_sub(1) as u32);
        self.config.retry_backoff().saturating_mul(multiplier)
    }
}

/// SHA-256 over provider, task type and description.
fn cache_key(model: AiModel, task_type: &TaskType, description: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(task_type.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(description.as_bytes());
    hex::encode(hasher.finalize())
}

/// One provider exposed through the common estimator interface.
pub struct LlmEstimator {
    client: Arc<LlmClient>,
    model: AiModel,
}

impl LlmEstimator {
    pub fn new(client: Arc<LlmClient>, model: AiModel) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl Estimator for LlmEstimator {
    fn method(&self) -> EstimationMethod {
        EstimationMethod::Llm
    }

    async fn estimate(&self, input: &TaskInput) -> crate::error::Result<Estimate> {
        let result = self
            .client
            .estimate(self.model, &input.description, &input.task_type)
            .await?;

        let estimate = Estimate::new(result.points, EstimationMethod::Llm);
        Ok(match result.note {
            Some(note) => estimate.with_note(note),
            None => estimate,
        })
    }
}
