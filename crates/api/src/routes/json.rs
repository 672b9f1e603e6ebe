//! JSON request bodies with rejections in the API's `{"message"}` shape.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Drop-in for `axum::Json` on the request side. A missing content type or
/// an unparseable body becomes `AppError::BadRequest`.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{StatusCode, header::CONTENT_TYPE},
        response::IntoResponse,
    };
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Subscribe {
        email: String,
    }

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = Request::builder().method("POST").uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn rejection_body(req: Request) -> (StatusCode, serde_json::Value) {
        let err = JsonBody::<Subscribe>::from_request(req, &())
            .await
            .unwrap_err();
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_valid_body_is_extracted() {
        let JsonBody(body) = JsonBody::<Subscribe>::from_request(
            request(Some("application/json"), r#"{"email": "a@example.com"}"#),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(body.email, "a@example.com");
    }

    #[tokio::test]
    async fn test_malformed_body_is_message_json() {
        let (status, body) =
            rejection_body(request(Some("application/json"), "{\"email\": ")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_wrong_field_type_is_bad_request() {
        let (status, body) =
            rejection_body(request(Some("application/json"), r#"{"email": 5}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("email"));
    }

    #[tokio::test]
    async fn test_missing_content_type_is_bad_request() {
        let (status, body) = rejection_body(request(None, "{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }
}
