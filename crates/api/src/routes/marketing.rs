//! Newsletter routes: subscribing, admin campaigns and the one-click
//! unsubscribe page linked from every marketing email.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::Email;

use crate::db::{RepositoryError, SubscriberRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Subscriber;
use crate::services::marketing::{self, CampaignReport};
use crate::state::AppState;

use super::MessageResponse;
use super::json::JsonBody;

/// Build the `/api/subscribers` router.
pub fn subscriber_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/subscribe", post(subscribe))
        .route("/campaign", post(campaign))
}

/// Build the `/api/unsubscribe` router.
pub fn unsubscribe_router() -> Router<AppState> {
    Router::new().route("/{token}", get(unsubscribe))
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct CampaignRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

/// Result page for an unsubscribe link.
#[derive(Template, WebTemplate)]
#[template(path = "pages/unsubscribe.html")]
pub struct UnsubscribeTemplate {
    pub success: bool,
    pub shop_url: String,
}

/// Shown when the unsubscribe lookup itself fails.
#[derive(Template, WebTemplate)]
#[template(path = "pages/error.html")]
pub struct UnsubscribeErrorTemplate {
    pub shop_url: String,
}

// =============================================================================
// Handlers
// =============================================================================

#[instrument(skip(state, req))]
async fn subscribe(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SubscribeRequest>,
) -> Result<Json<MessageResponse>> {
    let raw = req.email.trim();
    if raw.is_empty() {
        return Err(AppError::BadRequest("Email is required".to_string()));
    }
    let email = Email::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let subscriber = SubscriberRepository::new(state.pool())
        .create(&email)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                AppError::BadRequest("You are already subscribed!".to_string())
            }
            other => other.into(),
        })?;
    tracing::info!(subscriber_id = %subscriber.id, "New subscriber");

    if let (Some(mailer), Some(token)) = (state.email(), subscriber.unsubscribe_token.as_deref())
        && let Err(e) = mailer.send_subscriber_welcome(email.as_str(), token).await
    {
        tracing::warn!(error = %e, "Failed to send subscriber welcome email");
    }

    Ok(MessageResponse::new("Subscribed successfully!"))
}

async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Subscriber>>> {
    Ok(Json(SubscriberRepository::new(state.pool()).list().await?))
}

#[instrument(skip(state, admin, req), fields(admin_id = %admin.id))]
async fn campaign(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    JsonBody(req): JsonBody<CampaignRequest>,
) -> Result<Json<CampaignReport>> {
    let subject = req.subject.trim();
    let message = req.message.trim();
    if subject.is_empty() || message.is_empty() {
        return Err(AppError::BadRequest(
            "Subject and message are required".to_string(),
        ));
    }
    let mailer = state
        .email()
        .ok_or_else(|| AppError::ServiceUnavailable("Email is not configured".to_string()))?;

    let report = marketing::send_campaign(state.pool(), mailer, subject, message).await?;
    Ok(Json(report))
}

/// One-click unsubscribe. Newsletter subscribers are removed outright;
/// registered users are flagged so campaigns skip them.
#[instrument(skip(state, token))]
async fn unsubscribe(State(state): State<AppState>, Path(token): Path<String>) -> Response {
    let shop_url = state.config().frontend_url.clone();
    match unsubscribe_token(&state, &token).await {
        Ok(success) => UnsubscribeTemplate { success, shop_url }.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Unsubscribe lookup failed");
            UnsubscribeErrorTemplate { shop_url }.into_response()
        }
    }
}

async fn unsubscribe_token(
    state: &AppState,
    token: &str,
) -> std::result::Result<bool, RepositoryError> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(false);
    }
    if SubscriberRepository::new(state.pool())
        .delete_by_token(token)
        .await?
    {
        tracing::info!("Subscriber unsubscribed");
        return Ok(true);
    }
    let unsubscribed = UserRepository::new(state.pool())
        .unsubscribe_by_token(token)
        .await?;
    if unsubscribed {
        tracing::info!("User unsubscribed from campaigns");
    }
    Ok(unsubscribed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unsubscribe_page_renders_outcome() {
        let ok = UnsubscribeTemplate {
            success: true,
            shop_url: "https://shop.example".to_string(),
        }
        .render()
        .unwrap();
        assert!(ok.contains("You have been unsubscribed"));
        assert!(ok.contains("shop.example"));

        let bad = UnsubscribeTemplate {
            success: false,
            shop_url: "https://shop.example".to_string(),
        }
        .render()
        .unwrap();
        assert!(bad.contains("Invalid or expired unsubscribe link"));
    }

    #[test]
    fn test_subscribe_request_tolerates_missing_email() {
        let req: SubscribeRequest = serde_json::from_str("{}").unwrap();
        assert!(req.email.is_empty());
    }
}
