//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client with `{"message": "..."}`. All route
//! handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::{CartUpsertError, PlaceOrderError, RepositoryError};
use crate::services::auth::{AuthError, OAuthError};
use crate::services::invoice::InvoiceError;
use crate::services::{EmailError, MediaError, PaymentError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order placement was rejected or failed.
    #[error("Order error: {0}")]
    Order(#[from] PlaceOrderError),

    /// Adding to the cart was rejected or failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartUpsertError),

    /// Image upload was rejected or storage failed.
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Payment provider call failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Sending mail failed where the mail is the point of the request.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    #[error("Invoice error: {0}")]
    Invoice(#[from] InvoiceError),

    /// Google sign-in failed upstream.
    #[error("OAuth error: {0}")]
    OAuth(#[from] OAuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Duplicate resource.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// An optional integration is not configured.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

const INTERNAL_MESSAGE: &str = "Internal server error";
const UPSTREAM_MESSAGE: &str = "External service error";

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn repository_message(err: &RepositoryError) -> String {
    match err {
        RepositoryError::NotFound => "Not found".to_string(),
        RepositoryError::Conflict(what) => what.clone(),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            INTERNAL_MESSAGE.to_string()
        }
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_)
                | AuthError::MissingField(_)
                | AuthError::InvalidCredentials
                | AuthError::PasswordRequired
                | AuthError::GoogleAccount
                | AuthError::UserAlreadyExists
                | AuthError::WeakPassword(_)
                | AuthError::AlreadyVerified
                | AuthError::InvalidCode
                | AuthError::CodeExpired
                | AuthError::InvalidResetCode => StatusCode::BAD_REQUEST,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::Blocked => StatusCode::FORBIDDEN,
                AuthError::Unverified | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
                AuthError::Repository(err) => repository_status(err),
                AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Order(err) => match err {
                PlaceOrderError::UnknownProduct(_) => StatusCode::NOT_FOUND,
                PlaceOrderError::OutOfStock(_) | PlaceOrderError::Coupon(_) => {
                    StatusCode::BAD_REQUEST
                }
                PlaceOrderError::Repository(err) => repository_status(err),
            },
            Self::Cart(err) => match err {
                CartUpsertError::ProductNotFound => StatusCode::NOT_FOUND,
                CartUpsertError::OutOfStock | CartUpsertError::InsufficientStock(_) => {
                    StatusCode::BAD_REQUEST
                }
                CartUpsertError::Repository(err) => repository_status(err),
            },
            Self::Media(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Media(MediaError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Media(_) | Self::OAuth(_) => StatusCode::BAD_GATEWAY,
            Self::Payment(PaymentError::InvalidCart) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Payment(_) => StatusCode::BAD_GATEWAY,
            Self::Email(_) | Self::Invoice(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message safe to show the client.
    fn client_message(&self) -> String {
        match self {
            Self::Database(err)
            | Self::Auth(AuthError::Repository(err))
            | Self::Order(PlaceOrderError::Repository(err))
            | Self::Cart(CartUpsertError::Repository(err)) => repository_message(err),
            Self::Auth(AuthError::PasswordHash) | Self::Invoice(_) | Self::Internal(_) => {
                INTERNAL_MESSAGE.to_string()
            }
            Self::Auth(err) => err.to_string(),
            Self::Order(err) => err.to_string(),
            Self::Cart(err) => err.to_string(),
            Self::Media(err) if err.is_client_error() => err.to_string(),
            Self::Media(MediaError::Io(_)) => INTERNAL_MESSAGE.to_string(),
            Self::Payment(PaymentError::InvalidCart) => PaymentError::InvalidCart.to_string(),
            Self::Media(_) | Self::Payment(_) | Self::OAuth(_) => UPSTREAM_MESSAGE.to_string(),
            Self::Email(_) => "Failed to send email".to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg)
            | Self::ServiceUnavailable(msg) => msg.clone(),
            Self::RateLimited => "Too many requests. Try again later.".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let body = Json(json!({ "message": self.client_message() }));
        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called by the auth extractors so errors are associated with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use bazaar_core::{CouponRejection, ProductId};

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(get_status(AppError::NotFound("test".to_string())), StatusCode::NOT_FOUND);
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(get_status(AppError::Forbidden("test".to_string())), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            get_status(AppError::ServiceUnavailable("test".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_error_status() {
        assert_eq!(AppError::from(RepositoryError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::from(RepositoryError::Conflict("Coupon code already exists".to_string()))
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(RepositoryError::DataCorruption("x".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_error_status() {
        assert_eq!(AppError::from(AuthError::Blocked).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::from(AuthError::Unverified).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::from(AuthError::UserNotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::from(AuthError::InvalidCredentials).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(AuthError::UserAlreadyExists).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(AuthError::Repository(RepositoryError::NotFound)).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_order_and_cart_error_status() {
        assert_eq!(
            AppError::from(PlaceOrderError::UnknownProduct(ProductId::new(1))).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(PlaceOrderError::OutOfStock("Laptop".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(PlaceOrderError::Coupon(CouponRejection::Expired)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(CartUpsertError::InsufficientStock(2)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(CartUpsertError::ProductNotFound).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_upstream_and_client_file_errors() {
        assert_eq!(AppError::from(MediaError::TooLarge).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::from(MediaError::Cloudinary {
                status: 500,
                body: String::new()
            })
            .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(PaymentError::InvalidCart).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(PaymentError::Provider {
                status: 402,
                body: String::new()
            })
            .status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_client_messages_hide_internals() {
        let err = AppError::from(RepositoryError::DataCorruption("bad row 7".to_string()));
        assert_eq!(err.client_message(), INTERNAL_MESSAGE);

        let err = AppError::from(PlaceOrderError::OutOfStock("Laptop".to_string()));
        assert_eq!(err.client_message(), "Laptop is out of stock");

        let err = AppError::from(CartUpsertError::InsufficientStock(3));
        assert_eq!(err.client_message(), "Only 3 items available");

        let err = AppError::from(AuthError::Blocked);
        assert_eq!(err.client_message(), "Your account has been blocked.");
    }
}
