//! Error types for the Groq API client.

use thiserror::Error;

/// Errors that can occur when interacting with the Groq API.
#[derive(Debug, Error)]
pub enum GroqError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Groq returned an error body.
    #[error("API error ({error_type}): {message}")]
    Api {
        /// Error type from the API.
        error_type: String,
        /// Error message.
        message: String,
    },

    /// Rate limited by the API.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),

    /// The API key cannot be sent as a header.
    #[error("invalid API key header")]
    InvalidApiKey,
}

/// OpenAI-style error body.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

/// Nested error details.
#[derive(Debug, serde::Deserialize)]
pub struct ApiError {
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groq_error_display() {
        let err = GroqError::RateLimited(30);
        assert_eq!(err.to_string(), "rate limited, retry after 30 seconds");
    }

    #[test]
    fn test_api_error_deserialization() {
        let json = r#"{
            "error": {
                "message": "The model `llama-9` does not exist",
                "type": "invalid_request_error",
                "code": "model_not_found"
            }
        }"#;

        let response: ApiErrorResponse = serde_json::from_str(json).expect("deserialize");
        assert_eq!(response.error.error_type.as_deref(), Some("invalid_request_error"));
        assert!(response.error.message.contains("llama-9"));
    }
}
