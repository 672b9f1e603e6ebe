//! Groq API client.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::config::GroqConfig;

use super::error::{ApiErrorResponse, GroqError};
use super::types::{ChatMessage, ChatRequest, ChatResponse};

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 1024;

/// Groq API client.
#[derive(Clone)]
pub struct GroqClient {
    inner: Arc<GroqClientInner>,
}

struct GroqClientInner {
    client: reqwest::Client,
    model: String,
}

impl GroqClient {
    /// Create a new Groq client.
    ///
    /// # Errors
    ///
    /// Returns `GroqError::InvalidApiKey` if the key is not a valid header
    /// value, or `GroqError::Http` if the HTTP client cannot be built.
    pub fn new(config: &GroqConfig) -> Result<Self, GroqError> {
        let bearer = format!("Bearer {}", config.api_key.expose_secret());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&bearer).map_err(|_| GroqError::InvalidApiKey)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(GroqClientInner {
                client,
                model: config.model.clone(),
            }),
        })
    }

    /// Send a conversation and return the reply text.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the API answers with an error,
    /// or the response carries no text.
    #[instrument(skip(self, messages), fields(model = %self.inner.model, messages = messages.len()))]
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, GroqError> {
        let request = ChatRequest {
            model: &self.inner.model,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .inner
            .client
            .post(GROQ_API_URL)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_status(status, response).await);
        }

        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| GroqError::Parse(format!("Failed to parse response: {e}")))?;
        parsed
            .text()
            .map(str::to_string)
            .ok_or_else(|| GroqError::Parse("response has no choices".to_string()))
    }

    /// Handle an error status code.
    async fn handle_error_status(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> GroqError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return GroqError::RateLimited(retry_after);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return GroqError::Unauthorized("Invalid API key".to_string());
        }

        match response.text().await {
            Ok(body) => match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_error) => GroqError::Api {
                    error_type: api_error
                        .error
                        .error_type
                        .unwrap_or_else(|| status.to_string()),
                    message: api_error.error.message,
                },
                Err(_) => GroqError::Api {
                    error_type: status.to_string(),
                    message: body,
                },
            },
            Err(e) => GroqError::Http(e),
        }
    }
}
