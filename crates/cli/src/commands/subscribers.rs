//! Subscriber list maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Give every subscriber without one an unsubscribe token
//! bazaar-cli subscribers backfill-tokens
//! ```
//!
//! Rows imported before unsubscribe links existed have no token and are
//! skipped by product notifications until backfilled.

use bazaar_api::db::{RepositoryError, SubscriberRepository};
use thiserror::Error;

use super::{CommandError, connect};

#[derive(Debug, Error)]
pub enum SubscriberError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Backfill missing unsubscribe tokens. Returns how many rows were updated.
pub async fn backfill_tokens() -> Result<u64, SubscriberError> {
    let pool = connect().await?;

    let updated = SubscriberRepository::new(&pool).backfill_tokens().await?;
    tracing::info!("Backfilled unsubscribe tokens for {} subscribers", updated);
    Ok(updated)
}
