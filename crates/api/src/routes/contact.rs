//! Contact form relay.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;

use super::json::JsonBody;

/// Build the `/api/contact` router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(send))
}

#[derive(Debug, Default, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    /// Message body, named after the storefront's form field.
    #[serde(default)]
    pub textarea: String,
}

impl ContactRequest {
    fn is_complete(&self) -> bool {
        [&self.username, &self.email, &self.subject, &self.textarea]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Relay a storefront message to the store inbox, replying to the sender.
///
/// Unlike the notification mails, delivery failure is the request's failure.
#[instrument(skip(state, req))]
async fn send(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ContactRequest>,
) -> Result<Json<ContactResponse>> {
    if !req.is_complete() {
        return Err(AppError::BadRequest("All fields are required".to_string()));
    }
    let mailer = state
        .email()
        .ok_or_else(|| AppError::ServiceUnavailable("Email is not configured".to_string()))?;
    let inbox = state
        .config()
        .contact_inbox
        .as_deref()
        .ok_or_else(|| AppError::ServiceUnavailable("Contact inbox is not configured".to_string()))?;

    mailer
        .send_contact_message(
            inbox,
            req.username.trim(),
            req.email.trim(),
            req.subject.trim(),
            req.textarea.trim(),
        )
        .await?;
    tracing::info!("Contact message relayed");

    Ok(Json(ContactResponse {
        success: true,
        message: "Message sent successfully",
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_request() {
        let req: ContactRequest = serde_json::from_str(
            r#"{"username": "Ana", "email": "ana@example.com", "subject": "Hi", "textarea": "Is the X1 in stock?"}"#,
        )
        .unwrap();
        assert!(req.is_complete());
    }

    #[test]
    fn test_blank_field_is_incomplete() {
        let req: ContactRequest = serde_json::from_str(
            r#"{"username": "Ana", "email": "ana@example.com", "subject": "   ", "textarea": "Hello"}"#,
        )
        .unwrap();
        assert!(!req.is_complete());
        assert!(!ContactRequest::default().is_complete());
    }
}
