use async_trait::async_trait;
use reqwest::{header, Client as ReqwestClient};
use std::time::Duration;
use tracing::{debug, warn};

use super::errors::OpenAiApiError;
use super::rate_limiter::TokenBucketRateLimiter;
use super::retry::RetryPolicy;
use super::types::{EmbeddingRequest, EmbeddingResponse};
use crate::domain::errors::{PhaseError, PhaseResult};
use crate::domain::models::{BackendConfig, EmbeddingConfig, RateLimitConfig, RetryConfig};
use crate::domain::ports::EmbeddingProvider;

/// HTTP embedding provider for OpenAI-compatible APIs
///
/// Shares the backend's base URL and API key but carries its own rate
/// limiter and retry policy, so embedding traffic never starves chat
/// completions of tokens.
pub struct OpenAiEmbeddingProvider {
    http_client: ReqwestClient,
    base_url: String,
    model: String,
    dimension: usize,
    rate_limiter: TokenBucketRateLimiter,
    retry_policy: RetryPolicy,
}

impl OpenAiEmbeddingProvider {
    /// Create a new embedding provider
    ///
    /// # Errors
    /// Returns `OpenAiApiError::MissingApiKey` when no key is configured,
    /// or a network error if the HTTP client cannot be built.
    pub fn new(
        backend: &BackendConfig,
        embedding: &EmbeddingConfig,
        retry: &RetryConfig,
        rate_limit: &RateLimitConfig,
    ) -> Result<Self, OpenAiApiError> {
        let api_key = backend
            .api_key
            .clone()
            .ok_or(OpenAiApiError::MissingApiKey)?;

        let mut headers = header::HeaderMap::new();
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| OpenAiApiError::InvalidRequest(format!("Invalid API key: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let http_client = ReqwestClient::builder()
            .pool_max_idle_per_host(10)
            .timeout(Duration::from_secs(backend.timeout_secs))
            .tcp_nodelay(true)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http_client,
            base_url: backend.base_url.trim_end_matches('/').to_string(),
            model: embedding.model.clone(),
            dimension: embedding.dimension,
            rate_limiter: TokenBucketRateLimiter::from_config(rate_limit),
            retry_policy: RetryPolicy::from_config(retry),
        })
    }

    /// Execute a single embedding request (called by retry logic)
    async fn execute_embed_request(
        &self,
        request: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse, OpenAiApiError> {
        let url = format!("{}/v1/embeddings", self.base_url);

        debug!(%url, "POST embedding");

        let response = self.http_client.post(&url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            warn!(%status, "Embedding API returned an error");
            return Err(OpenAiApiError::from_status(status, body));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> PhaseResult<Vec<f32>> {
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: text.to_string(),
        };

        self.rate_limiter.acquire().await;

        let response = self
            .retry_policy
            .execute(|| self.execute_embed_request(&request))
            .await
            .map_err(|e| PhaseError::Retrieval(e.to_string()))?;

        let Some(item) = response.data.into_iter().next() else {
            return Err(PhaseError::Retrieval(
                "embedding response contained no data".to_string(),
            ));
        };

        if item.embedding.len() != self.dimension {
            warn!(
                expected = self.dimension,
                got = item.embedding.len(),
                "embedding dimension differs from configuration"
            );
        }

        Ok(item.embedding)
    }
}
