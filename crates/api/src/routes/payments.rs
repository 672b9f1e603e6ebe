//! Hosted checkout sessions.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::services::PaymentError;
use crate::services::payments::CheckoutItem;
use crate::state::AppState;

use super::json::JsonBody;

/// Build the `/api/payments` router.
pub fn router() -> Router<AppState> {
    Router::new().route("/create-checkout-session", post(create_checkout_session))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub cart_items: Vec<CheckoutItem>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

#[instrument(skip(state, user, req), fields(user_id = %user.id, items = req.cart_items.len()))]
async fn create_checkout_session(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    JsonBody(req): JsonBody<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    if req.cart_items.is_empty() {
        return Err(PaymentError::InvalidCart.into());
    }
    let payments = state
        .payments()
        .ok_or_else(|| AppError::ServiceUnavailable("Payments are not configured".to_string()))?;

    let url = payments.create_checkout_session(&req.cart_items).await?;
    tracing::info!("Checkout session created");
    Ok(Json(CheckoutResponse { url }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_request_shape() {
        let req: CheckoutRequest = serde_json::from_str(
            r#"{"cartItems": [{"product": {"brand": "Lenovo", "price": 899.5}, "quantity": 2}]}"#,
        )
        .unwrap();
        assert_eq!(req.cart_items.len(), 1);
        assert_eq!(req.cart_items[0].quantity, 2);
        assert_eq!(req.cart_items[0].product.brand.as_deref(), Some("Lenovo"));
    }

    #[test]
    fn test_missing_cart_is_empty() {
        let req: CheckoutRequest = serde_json::from_str("{}").unwrap();
        assert!(req.cart_items.is_empty());
    }

    #[test]
    fn test_price_must_be_numeric() {
        let result = serde_json::from_str::<CheckoutRequest>(
            r#"{"cartItems": [{"product": {"price": "cheap"}, "quantity": 1}]}"#,
        );
        assert!(result.is_err());
    }
}
