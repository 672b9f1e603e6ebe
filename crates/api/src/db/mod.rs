//! Database operations for the Bazaar `PostgreSQL` schema.
//!
//! # Schema: `bazaar`
//!
//! ## Tables
//!
//! - `user` - Accounts (password and Google sign-in), codes, unsubscribe tokens
//! - `product`, `product_review`, `wishlist_item` - Catalog
//! - `cart_item` - Per-user cart lines
//! - `customer_order`, `order_item` - Orders with price snapshots
//! - `coupon`, `coupon_redemption` - Discount codes
//! - `subscriber` - Newsletter subscribers
//! - `banner`, `discount_banner`, `cms_page`, `article` - Content
//! - `chat_log` - Sales assistant transcripts
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod articles;
pub mod banners;
pub mod cart;
pub mod chat;
pub mod cms;
pub mod coupons;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod subscribers;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use articles::{ArticleRepository, NewArticle};
pub use banners::{BannerFields, BannerRepository, DiscountBannerFields};
pub use cart::{CartRepository, CartUpsertError};
pub use chat::ChatLogRepository;
pub use cms::CmsRepository;
pub use coupons::CouponRepository;
pub use orders::{NewOrder, OrderLine, OrderRepository, PlaceOrderError};
pub use products::ProductRepository;
pub use reviews::{NewReview, ReviewOutcome, ReviewRepository};
pub use subscribers::SubscriberRepository;
pub use users::{CodeKind, NewGoogleUser, NewLocalUser, UserRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Generate a 64-character hex unsubscribe token.
#[must_use]
pub fn generate_unsubscribe_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsubscribe_token_is_64_hex() {
        let token = generate_unsubscribe_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_unsubscribe_token());
    }
}
