
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use super::EmbeddingBackend;
use super::chunking::{HARD_CHUNK_LIMIT, truncate_chars};
use crate::RagError;
use crate::config::EmbeddingConfig;

const MAX_JITTER_MS: u64 = 250;

/// Client for an OpenAI/Mistral style `/embeddings` endpoint
#[derive(Debug, Clone)]
pub struct RemoteEmbeddingClient {
    endpoint: Url,
    model: String,
    api_key: Option<String>,
    batch_size: usize,
    retry_attempts: u32,
    retry_base_delay: Duration,
    inter_batch_delay: Duration,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<String>,
    encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: Option<usize>,
}

impl RemoteEmbeddingClient {
    #[inline]
    pub fn new(config: &EmbeddingConfig) -> crate::Result<Self> {
        let endpoint = config.endpoint_url()?;

        Ok(Self {
            endpoint,
            model: config.model.clone(),
            api_key: config.api_key(),
            batch_size: (config.batch_size as usize).max(1),
            retry_attempts: config.retry_attempts.max(1),
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
            inter_batch_delay: Duration::from_millis(config.inter_batch_delay_ms),
            agent: build_agent(Duration::from_secs(config.timeout_seconds)),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    /// Override the retry base delay and the pause between batches
    #[inline]
    pub fn with_delays(mut self, retry_base_delay: Duration, inter_batch_delay: Duration) -> Self {
        self.retry_base_delay = retry_base_delay;
        self.inter_batch_delay = inter_batch_delay;
        self
    }

    #[inline]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Embed texts in batches, pausing between consecutive batches
    #[inline]
    pub fn generate_embeddings_batch(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(position) = texts.iter().position(|text| text.trim().is_empty()) {
            return Err(RagError::Embedding(format!(
                "Text at position {position} is blank"
            )));
        }

        debug!(
            "Generating embeddings for {} texts in batches of {}",
            texts.len(),
            self.batch_size
        );

        let mut results = Vec::with_capacity(texts.len());
        let batch_count = texts.len().div_ceil(self.batch_size);

        for (batch_index, batch) in texts.chunks(self.batch_size).enumerate() {
            if batch_index > 0 && !self.inter_batch_delay.is_zero() {
                debug!("Waiting {:?} before next batch", self.inter_batch_delay);
                std::thread::sleep(self.inter_batch_delay);
            }

            debug!(
                "Processing batch {}/{} ({} texts)",
                batch_index + 1,
                batch_count,
                batch.len()
            );
            results.extend(self.embed_single_batch(batch)?);
        }

        if let Some(first) = results.first() {
            let dimension = first.len();
            if let Some(other) = results.iter().find(|v| v.len() != dimension) {
                return Err(RagError::DimensionMismatch {
                    expected: dimension,
                    actual: other.len(),
                });
            }
        }

        info!("Generated {} embeddings", results.len());
        Ok(results)
    }

    fn embed_single_batch(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.model,
            input: texts
                .iter()
                .map(|text| {
                    let mut text = text.clone();
                    truncate_chars(&mut text, HARD_CHUNK_LIMIT);
                    text
                })
                .collect(),
            encoding_format: "float",
        };

        let request_json = serde_json::to_string(&request)
            .map_err(|e| RagError::Embedding(format!("Failed to serialize request: {e}")))?;

        let response_text = self.make_request_with_retry(&request_json)?;

        parse_embeddings(&response_text, texts.len())
    }

    fn make_request_with_retry(&self, body: &str) -> crate::Result<String> {
        let mut last_error = String::new();

        for attempt in 0..self.retry_attempts {
            debug!(
                "Embedding request attempt {}/{}",
                attempt + 1,
                self.retry_attempts
            );
            let is_last = attempt + 1 == self.retry_attempts;

            let mut request = self
                .agent
                .post(self.endpoint.as_str())
                .header("Content-Type", "application/json");
            if let Some(key) = &self.api_key {
                request = request.header("Authorization", &format!("Bearer {key}"));
            }

            match request.send(body) {
                Ok(mut response) => {
                    let status = response.status().as_u16();

                    if (200..300).contains(&status) {
                        return response.body_mut().read_to_string().map_err(|e| {
                            RagError::Network(format!("Failed to read embedding response: {e}"))
                        });
                    }

                    if status == 429 {
                        let retry_after = response
                            .headers()
                            .get("retry-after")
                            .and_then(|value| value.to_str().ok())
                            .and_then(|value| value.trim().parse::<u64>().ok());
                        warn!(
                            "Rate limited (status 429), attempt {}/{}",
                            attempt + 1,
                            self.retry_attempts
                        );
                        last_error = "rate limited (HTTP 429)".to_string();
                        if !is_last {
                            let delay = retry_after
                                .map_or_else(|| self.backoff_delay(attempt), Duration::from_secs);
                            debug!("Waiting {:?} before retry", delay);
                            std::thread::sleep(delay);
                        }
                        continue;
                    }

                    let message = response.body_mut().read_to_string().unwrap_or_default();
                    if status >= 500 {
                        warn!(
                            "Server error (status {}), attempt {}/{}",
                            status,
                            attempt + 1,
                            self.retry_attempts
                        );
                        last_error = format!("server error HTTP {status}");
                    } else {
                        warn!("Client error (status {}), not retrying", status);
                        return Err(RagError::Embedding(format!(
                            "Embedding request rejected with HTTP {status}: {}",
                            message.trim()
                        )));
                    }
                }
                Err(
                    error @ (ureq::Error::ConnectionFailed
                    | ureq::Error::HostNotFound
                    | ureq::Error::Timeout(_)
                    | ureq::Error::Io(_)),
                ) => {
                    warn!(
                        "Transport error: {}, attempt {}/{}",
                        error,
                        attempt + 1,
                        self.retry_attempts
                    );
                    last_error = error.to_string();
                }
                Err(error) => {
                    warn!("Non-retryable error: {}", error);
                    return Err(RagError::Network(error.to_string()));
                }
            }

            if !is_last {
                let delay = self.backoff_delay(attempt);
                debug!("Waiting {:?} before retry", delay);
                std::thread::sleep(delay);
            }
        }

        error!("All retry attempts failed for request to {}", self.endpoint);

        Err(RagError::Embedding(format!(
            "Embedding request failed after {} attempts: {}",
            self.retry_attempts, last_error
        )))
    }

    /// `base * 2^attempt` plus up to 250ms of jitter
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt);
        let jitter = rand::thread_rng().gen_range(0..=MAX_JITTER_MS);
        self.retry_base_delay.saturating_mul(factor) + Duration::from_millis(jitter)
    }
}

impl EmbeddingBackend for RemoteEmbeddingClient {
    #[inline]
    fn embed(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        self.generate_embeddings_batch(texts)
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Decode a response body, restoring input order from `index` when present
fn parse_embeddings(body: &str, expected: usize) -> crate::Result<Vec<Vec<f32>>> {
    let mut response: EmbedResponse = serde_json::from_str(body)
        .map_err(|e| RagError::Embedding(format!("Failed to parse embedding response: {e}")))?;

    if response.data.len() != expected {
        return Err(RagError::Embedding(format!(
            "Mismatch between request and response counts: {} vs {}",
            expected,
            response.data.len()
        )));
    }

    if response.data.iter().all(|item| item.index.is_some()) {
        response.data.sort_by_key(|item| item.index);
    }

    Ok(response
        .data
        .into_iter()
        .map(|item| item.embedding)
        .collect())
}
