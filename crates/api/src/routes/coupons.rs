//! Coupon routes: checkout-time validation and admin creation.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::{CouponRejection, UserId, normalize_code, validate_discount};

use crate::db::CouponRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Coupon;
use crate::state::AppState;

use super::json::JsonBody;

/// Build the `/api/coupons` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/validate", post(validate))
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub code: Option<String>,
    pub user_id: Option<UserId>,
}

/// Outcome of a coupon check. Rejections are still `200 OK`.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ValidateResponse {
    Valid {
        valid: bool,
        #[serde(with = "rust_decimal::serde::float")]
        discount: Decimal,
    },
    Invalid {
        valid: bool,
        message: String,
    },
}

impl ValidateResponse {
    const fn valid(discount: Decimal) -> Self {
        Self::Valid {
            valid: true,
            discount,
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            valid: false,
            message: message.into(),
        }
    }
}

impl From<CouponRejection> for ValidateResponse {
    fn from(rejection: CouponRejection) -> Self {
        Self::invalid(rejection.to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub discount: Option<Decimal>,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
}

// =============================================================================
// Handlers
// =============================================================================

#[instrument(skip(state, req))]
async fn validate(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ValidateRequest>,
) -> Result<Response> {
    let Some(code) = req
        .code
        .as_deref()
        .map(normalize_code)
        .filter(|c| !c.is_empty())
    else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(ValidateResponse::invalid("Coupon code required")),
        )
            .into_response());
    };

    let coupons = CouponRepository::new(state.pool());
    let Some(coupon) = coupons.find_by_code(&code).await? else {
        return Ok(Json(ValidateResponse::from(CouponRejection::Unknown)).into_response());
    };

    let already_used = match req.user_id {
        Some(user_id) => coupons.has_redeemed(coupon.id, user_id).await?,
        None => false,
    };
    let body = match coupon.terms().check(Utc::now(), already_used) {
        Ok(discount) => ValidateResponse::valid(discount),
        Err(rejection) => rejection.into(),
    };
    Ok(Json(body).into_response())
}

#[instrument(skip(state, admin, req), fields(admin_id = %admin.id))]
async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    JsonBody(req): JsonBody<CreateCouponRequest>,
) -> Result<impl IntoResponse> {
    let code = normalize_code(&req.code);
    if code.is_empty() {
        return Err(AppError::BadRequest("Coupon code is required".to_string()));
    }
    let discount = req
        .discount
        .ok_or_else(|| AppError::BadRequest("Discount is required".to_string()))
        .and_then(|d| validate_discount(d).map_err(|e| AppError::BadRequest(e.to_string())))?;
    if req.usage_limit.is_some_and(|limit| limit < 1) {
        return Err(AppError::BadRequest(
            "Usage limit must be at least 1".to_string(),
        ));
    }

    let coupon: Coupon = CouponRepository::new(state.pool())
        .create(&code, discount, req.expires_at, req.usage_limit)
        .await?;
    tracing::info!(code = %coupon.code, "Coupon created");
    Ok((StatusCode::CREATED, Json(coupon)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_response_shape() {
        let body = serde_json::to_value(ValidateResponse::valid(Decimal::new(15, 2))).unwrap();
        assert_eq!(body, serde_json::json!({"valid": true, "discount": 0.15}));
    }

    #[test]
    fn test_rejection_response_shape() {
        let body =
            serde_json::to_value(ValidateResponse::from(CouponRejection::Expired)).unwrap();
        assert_eq!(body["valid"], false);
        assert_eq!(body["message"], "Coupon has expired");
    }

    #[test]
    fn test_create_request_reads_float_discount() {
        let req: CreateCouponRequest =
            serde_json::from_str(r#"{"code": "save10", "discount": 0.1, "usageLimit": 50}"#)
                .unwrap();
        assert_eq!(req.discount, Some(Decimal::new(1, 1)));
        assert_eq!(req.usage_limit, Some(50));
        assert!(req.expires_at.is_none());
    }
}
