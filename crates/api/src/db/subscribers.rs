//! Newsletter subscriber repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bazaar_core::{Email, SubscriberId};

use super::{RepositoryError, conflict_on_unique, generate_unsubscribe_token};
use crate::models::Subscriber;

#[derive(Debug, sqlx::FromRow)]
struct SubscriberRow {
    id: i32,
    email: String,
    unsubscribe_token: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = RepositoryError;

    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid subscriber email: {e}"))
        })?;
        Ok(Self {
            id: SubscriberId::new(row.id),
            email,
            unsubscribe_token: row.unsubscribe_token,
            created_at: row.created_at,
        })
    }
}

/// Repository for subscriber database operations.
pub struct SubscriberRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SubscriberRepository<'a> {
    /// Create a new subscriber repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Subscribe an email address with a fresh unsubscribe token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the address is already subscribed.
    pub async fn create(&self, email: &Email) -> Result<Subscriber, RepositoryError> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            r"
            INSERT INTO bazaar.subscriber (email, unsubscribe_token)
            VALUES ($1, $2)
            RETURNING id, email, unsubscribe_token, created_at
            ",
        )
        .bind(email.as_str())
        .bind(generate_unsubscribe_token())
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Subscriber"))?;
        row.try_into()
    }

    /// All subscribers, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Subscriber>, RepositoryError> {
        let rows = sqlx::query_as::<_, SubscriberRow>(
            "SELECT id, email, unsubscribe_token, created_at FROM bazaar.subscriber ORDER BY created_at DESC",
        )
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(Subscriber::try_from).collect()
    }

    /// All subscribers, each guaranteed to carry an unsubscribe token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_with_tokens(&self) -> Result<Vec<Subscriber>, RepositoryError> {
        self.backfill_tokens().await?;
        self.list().await
    }

    /// Remove the subscriber owning `token`. Returns whether one was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_by_token(&self, token: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM bazaar.subscriber WHERE unsubscribe_token = $1")
            .bind(token)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Assign tokens to subscribers that have none. Returns how many were updated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn backfill_tokens(&self) -> Result<u64, RepositoryError> {
        let ids = sqlx::query_scalar::<_, SubscriberId>(
            "SELECT id FROM bazaar.subscriber WHERE unsubscribe_token IS NULL",
        )
        .fetch_all(self.pool)
        .await?;

        let mut updated = 0;
        for id in ids {
            updated += sqlx::query(
                "UPDATE bazaar.subscriber SET unsubscribe_token = $2 \
                 WHERE id = $1 AND unsubscribe_token IS NULL",
            )
            .bind(id)
            .bind(generate_unsubscribe_token())
            .execute(self.pool)
            .await?
            .rows_affected();
        }
        Ok(updated)
    }
}
