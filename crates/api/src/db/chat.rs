//! Sales chat transcript repository.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::ChatLog;

/// Repository for stored chat exchanges.
pub struct ChatLogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ChatLogRepository<'a> {
    /// Create a new chat log repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store one question and answer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(&self, user_message: &str, ai_response: &str) -> Result<ChatLog, RepositoryError> {
        Ok(sqlx::query_as::<_, ChatLog>(
            r"
            INSERT INTO bazaar.chat_log (user_message, ai_response)
            VALUES ($1, $2)
            RETURNING id, user_message, ai_response, created_at
            ",
        )
        .bind(user_message)
        .bind(ai_response)
        .fetch_one(self.pool)
        .await?)
    }

    /// The most recent exchanges, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<ChatLog>, RepositoryError> {
        Ok(sqlx::query_as::<_, ChatLog>(
            r"
            SELECT id, user_message, ai_response, created_at
            FROM bazaar.chat_log
            ORDER BY created_at DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?)
    }
}
