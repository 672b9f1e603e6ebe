//! AI sales assistant routes.
//!
//! The storefront widget always receives `{"reply": "..."}`, including on
//! failure, so it can show the text in the conversation.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::ChatLogRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::ChatLog;
use crate::services::sales_chat::{self, BUSY_REPLY, HistoryTurn, UNCONFIGURED_REPLY};
use crate::state::AppState;

use super::json::JsonBody;

const DEFAULT_LOG_LIMIT: i64 = 50;
const MAX_LOG_LIMIT: i64 = 500;

/// Build the `/api/chat` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(chat))
        .route("/logs", get(logs))
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

impl ChatReply {
    fn response(status: StatusCode, reply: impl Into<String>) -> Response {
        (
            status,
            Json(Self {
                reply: reply.into(),
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub limit: Option<i64>,
}

impl LogQuery {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT)
    }
}

// =============================================================================
// Handlers
// =============================================================================

#[instrument(skip(state, req), fields(history = req.history.len()))]
async fn chat(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ChatRequest>,
) -> Result<Response> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("Message is required".to_string()));
    }
    let Some(assistant) = state.sales_chat() else {
        tracing::warn!("Chat request with no model API key configured");
        return Ok(ChatReply::response(
            StatusCode::INTERNAL_SERVER_ERROR,
            UNCONFIGURED_REPLY,
        ));
    };

    let reply = match assistant.reply(state.pool(), message, &req.history).await {
        Ok(reply) => reply,
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            tracing::error!(error = %e, sentry_event_id = %event_id, "Sales chat failed");
            return Ok(ChatReply::response(
                StatusCode::INTERNAL_SERVER_ERROR,
                BUSY_REPLY,
            ));
        }
    };

    if sales_chat::is_visit_intent(message, &reply)
        && let Some(whatsapp) = state.whatsapp().cloned()
    {
        let customer_message = message.to_string();
        tokio::spawn(async move {
            if let Err(e) = whatsapp.send_visit_alert(&customer_message).await {
                tracing::error!(error = %e, "WhatsApp visit alert failed");
            }
        });
    }

    if let Err(e) = ChatLogRepository::new(state.pool())
        .insert(message, &reply)
        .await
    {
        tracing::warn!(error = %e, "Failed to store chat log");
    }

    Ok(ChatReply::response(StatusCode::OK, reply))
}

async fn logs(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<ChatLog>>> {
    Ok(Json(
        ChatLogRepository::new(state.pool())
            .recent(query.limit())
            .await?,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_history_is_optional() {
        let req: ChatRequest = serde_json::from_str(r#"{"message": "any gaming laptops?"}"#).unwrap();
        assert_eq!(req.message, "any gaming laptops?");
        assert!(req.history.is_empty());
    }

    #[test]
    fn test_request_reads_widget_history() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"message": "and the price?", "history": [
                {"role": "user", "parts": [{"text": "show me the ZenBook"}]},
                {"role": "model", "parts": [{"text": "The ZenBook 14 is in stock."}]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(req.history.len(), 2);
        assert_eq!(req.history.last().unwrap().role, "model");
    }

    #[test]
    fn test_log_limit_bounds() {
        assert_eq!(LogQuery::default().limit(), DEFAULT_LOG_LIMIT);
        assert_eq!(LogQuery { limit: Some(0) }.limit(), 1);
        assert_eq!(LogQuery { limit: Some(9_999) }.limit(), MAX_LOG_LIMIT);
    }
}
