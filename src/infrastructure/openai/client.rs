use async_trait::async_trait;
use reqwest::{header, Client as ReqwestClient, Response};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use super::errors::OpenAiApiError;
use super::rate_limiter::TokenBucketRateLimiter;
use super::retry::RetryPolicy;
use super::types::{ChatCompletionRequest, ChatCompletionResponse, WireMessage};
use crate::domain::errors::{PhaseError, PhaseResult};
use crate::domain::models::{
    BackendConfig, ChatCompletion, ChatMessage, CompletionChoice, RateLimitConfig, RetryConfig,
    TokenUsage,
};
use crate::domain::ports::ModelBackend;

/// HTTP chat-completion backend for OpenAI-compatible APIs
///
/// Provides robust HTTP communication with:
/// - Connection pooling and reuse
/// - Rate limiting via token bucket algorithm
/// - Exponential backoff retry for transient errors
/// - Structured error classification (transient vs permanent)
pub struct OpenAiBackend {
    http_client: ReqwestClient,
    base_url: String,
    model: String,
    temperature: f32,
    rate_limiter: TokenBucketRateLimiter,
    retry_policy: RetryPolicy,
}

impl OpenAiBackend {
    /// Create a new backend client
    ///
    /// # Errors
    /// Returns `OpenAiApiError::MissingApiKey` when no key is configured,
    /// or a network error if the HTTP client cannot be built.
    pub fn new(
        config: &BackendConfig,
        retry: &RetryConfig,
        rate_limit: &RateLimitConfig,
    ) -> Result<Self, OpenAiApiError> {
        let api_key = config.api_key.clone().ok_or(OpenAiApiError::MissingApiKey)?;

        // Scrub API key from logs
        let api_key_scrubbed = if api_key.len() > 8 {
            format!("{}...[REDACTED]", &api_key[..8])
        } else {
            "[REDACTED]".to_string()
        };

        info!(
            base_url = %config.base_url,
            model = %config.model,
            timeout_secs = config.timeout_secs,
            api_key = %api_key_scrubbed,
            "Initializing backend client"
        );

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
            .timeout(Duration::from_secs(config.timeout_secs))
            .tcp_nodelay(true)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            rate_limiter: TokenBucketRateLimiter::from_config(rate_limit),
            retry_policy: RetryPolicy::from_config(retry),
        })
    }

    /// Send one chat request through the rate limiter and retry policy
    #[instrument(skip(self, messages), fields(model = %self.model, message_count = messages.len()))]
    async fn send_chat(
        &self,
        messages: &[ChatMessage],
    ) -> Result<ChatCompletionResponse, OpenAiApiError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role_kind.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: self.temperature,
            max_tokens: None,
        };

        self.rate_limiter.acquire().await;

        let result = self
            .retry_policy
            .execute(|| self.execute_chat_request(&request))
            .await;

        match &result {
            Ok(response) => {
                if let Some(usage) = &response.usage {
                    info!(
                        prompt_tokens = usage.prompt_tokens,
                        completion_tokens = usage.completion_tokens,
                        "Completion succeeded"
                    );
                }
            }
            Err(err) => error!(error = %err, "Completion request failed"),
        }

        result
    }

    /// Execute a single request (called by retry logic)
    async fn execute_chat_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, OpenAiApiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        debug!(%url, "POST chat completion");

        let response = self.http_client.post(&url).json(request).send().await?;

        Self::handle_response(response).await
    }

    /// Convert an HTTP response into a typed result
    async fn handle_response(
        response: Response,
    ) -> Result<ChatCompletionResponse, OpenAiApiError> {
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            warn!(%status, "API returned an error");
            return Err(OpenAiApiError::from_status(status, body));
        }

        Ok(response.json().await?)
    }
}

/// Shape the wire response into the domain completion.
///
/// An empty choice list is a backend error, never silently repaired.
fn into_completion(response: ChatCompletionResponse) -> PhaseResult<ChatCompletion> {
    if response.choices.is_empty() {
        return Err(PhaseError::Backend(
            "response contained no choices".to_string(),
        ));
    }

    let usage = response.usage.unwrap_or_default();

    Ok(ChatCompletion {
        id: response.id,
        choices: response
            .choices
            .into_iter()
            .map(|choice| CompletionChoice {
                role: choice.message.role,
                content: choice.message.content,
                stop_reason: choice.finish_reason,
            })
            .collect(),
        usage: TokenUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        },
    })
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> PhaseResult<ChatCompletion> {
        let response = self
            .send_chat(messages)
            .await
            .map_err(|e| PhaseError::Backend(e.to_string()))?;

        into_completion(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_configs(base_url: &str) -> (BackendConfig, RetryConfig, RateLimitConfig) {
        (
            BackendConfig {
                base_url: base_url.to_string(),
                model: "gpt-4o-mini".to_string(),
                api_key: Some("sk-test-key".to_string()),
                timeout_secs: 5,
                token_limit: 16_384,
                temperature: 0.2,
            },
            RetryConfig {
                max_retries: 2,
                initial_backoff_ms: 10,
                max_backoff_ms: 50,
            },
            RateLimitConfig {
                requests_per_second: 100.0,
                burst_size: 10,
            },
        )
    }

    fn dialogue() -> Vec<ChatMessage> {
        vec![
            ChatMessage::system("Chief Product Officer", "You analyze product demands."),
            ChatMessage::user("Chief Executive Officer", "Pick a modality."),
        ]
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        let (mut backend_cfg, retry, rate) = test_configs("http://localhost");
        backend_cfg.api_key = None;

        assert!(matches!(
            OpenAiBackend::new(&backend_cfg, &retry, &rate),
            Err(OpenAiApiError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn test_complete_maps_response() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "<INFO> PowerPoint"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}
        }"#;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let (backend_cfg, retry, rate) = test_configs(&server.url());
        let backend = OpenAiBackend::new(&backend_cfg, &retry, &rate).unwrap();

        let completion = backend.complete(&dialogue()).await.unwrap();

        assert_eq!(completion.id, "chatcmpl-1");
        assert_eq!(completion.choices[0].content, "<INFO> PowerPoint");
        assert_eq!(completion.choices[0].stop_reason.as_deref(), Some("stop"));
        assert_eq!(completion.usage.total_tokens, 14);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "chatcmpl-2", "choices": []}"#)
            .create_async()
            .await;

        let (backend_cfg, retry, rate) = test_configs(&server.url());
        let backend = OpenAiBackend::new(&backend_cfg, &retry, &rate).unwrap();

        let err = backend.complete(&dialogue()).await.unwrap_err();
        assert!(matches!(err, PhaseError::Backend(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(401)
            .with_body(r#"{"error": {"message": "bad key"}}"#)
            .expect(1)
            .create_async()
            .await;

        let (backend_cfg, retry, rate) = test_configs(&server.url());
        let backend = OpenAiBackend::new(&backend_cfg, &retry, &rate).unwrap();

        let err = backend.complete(&dialogue()).await.unwrap_err();
        assert!(matches!(err, PhaseError::Backend(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_until_exhausted() {
        let mut server = mockito::Server::new_async().await;
        // Initial attempt plus max_retries = 2 more
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .expect(3)
            .create_async()
            .await;

        let (backend_cfg, retry, rate) = test_configs(&server.url());
        let backend = OpenAiBackend::new(&backend_cfg, &retry, &rate).unwrap();

        let err = backend.complete(&dialogue()).await.unwrap_err();
        assert!(matches!(err, PhaseError::Backend(_)));
        mock.assert_async().await;
    }
}
