//! User repository for database operations.
//!
//! Queries are checked at runtime (`query_as` + `FromRow`) so the crate
//! builds without a live database.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bazaar_core::{Email, UserId};

use super::{RepositoryError, conflict_on_unique, generate_unsubscribe_token};
use crate::models::{OneTimeCode, User, UserStats};

const USER_COLUMNS: &str = "id, username, email, password_hash, google_id, is_admin, \
     is_verified, is_blocked, is_logged_in, profile_image, unsubscribed, created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    username: String,
    email: Option<String>,
    password_hash: Option<String>,
    google_id: Option<String>,
    is_admin: bool,
    is_verified: bool,
    is_blocked: bool,
    is_logged_in: bool,
    profile_image: Option<String>,
    unsubscribed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = row
            .email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
            })?;

        Ok(Self {
            id: UserId::new(row.id),
            username: row.username,
            email,
            password_hash: row.password_hash,
            google_id: row.google_id,
            is_admin: row.is_admin,
            is_verified: row.is_verified,
            is_blocked: row.is_blocked,
            is_logged_in: row.is_logged_in,
            profile_image: row.profile_image,
            unsubscribed: row.unsubscribed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CodeRow {
    code: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl CodeRow {
    fn into_code(self) -> Option<OneTimeCode> {
        match (self.code, self.expires_at) {
            (Some(code), Some(expires_at)) => Some(OneTimeCode { code, expires_at }),
            _ => None,
        }
    }
}

/// Which one-time code column pair to operate on.
#[derive(Debug, Clone, Copy)]
pub enum CodeKind {
    Verification,
    PasswordReset,
}

impl CodeKind {
    const fn columns(self) -> (&'static str, &'static str) {
        match self {
            Self::Verification => ("verification_code", "verification_code_expires_at"),
            Self::PasswordReset => ("reset_code", "reset_code_expires_at"),
        }
    }
}

/// A brand-new account created by sign-up or the operator CLI.
#[derive(Debug)]
pub struct NewLocalUser<'a> {
    pub username: &'a str,
    pub email: &'a Email,
    pub password_hash: &'a str,
    pub is_admin: bool,
    pub is_verified: bool,
    /// Initial verification code, for unverified accounts.
    pub verification: Option<&'a OneTimeCode>,
}

/// A brand-new account created by Google sign-in.
#[derive(Debug)]
pub struct NewGoogleUser<'a> {
    pub username: &'a str,
    pub email: Option<&'a Email>,
    pub google_id: &'a str,
    pub profile_image: Option<&'a str>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        predicate: &str,
        value: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM bazaar.user WHERE {predicate} = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM bazaar.user WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_where("email", email.as_str()).await
    }

    /// Get a user by their Google account ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_google_id(&self, google_id: &str) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_where("google_id", google_id).await
    }

    /// List every account, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM bazaar.user ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(self.pool)
            .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    /// Create an email-password account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_local(&self, new: &NewLocalUser<'_>) -> Result<User, RepositoryError> {
        let sql = format!(
            "INSERT INTO bazaar.user \
                 (username, email, password_hash, is_admin, is_verified, \
                  verification_code, verification_code_expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(new.username)
            .bind(new.email)
            .bind(new.password_hash)
            .bind(new.is_admin)
            .bind(new.is_verified)
            .bind(new.verification.map(|c| c.code.as_str()))
            .bind(new.verification.map(|c| c.expires_at))
            .fetch_one(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "email"))?;
        row.try_into()
    }

    /// Create a verified account from a Google profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email or Google ID already exists.
    pub async fn create_google(&self, new: &NewGoogleUser<'_>) -> Result<User, RepositoryError> {
        let sql = format!(
            "INSERT INTO bazaar.user (username, email, google_id, profile_image, is_verified) \
             VALUES ($1, $2, $3, $4, TRUE) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(new.username)
            .bind(new.email)
            .bind(new.google_id)
            .bind(new.profile_image)
            .fetch_one(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "account"))?;
        row.try_into()
    }

    /// Attach a Google account to an existing user and mark them verified.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn link_google(&self, id: UserId, google_id: &str) -> Result<User, RepositoryError> {
        let sql = format!(
            "UPDATE bazaar.user \
             SET google_id = $2, is_verified = TRUE, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(google_id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "google account"))?
            .ok_or(RepositoryError::NotFound)?;
        row.try_into()
    }

    /// Read the pending one-time code of the given kind.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn code(
        &self,
        id: UserId,
        kind: CodeKind,
    ) -> Result<Option<OneTimeCode>, RepositoryError> {
        let (code_col, expires_col) = kind.columns();
        let sql = format!(
            "SELECT {code_col} AS code, {expires_col} AS expires_at FROM bazaar.user WHERE id = $1"
        );
        let row = sqlx::query_as::<_, CodeRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.and_then(CodeRow::into_code))
    }

    /// Store a fresh one-time code of the given kind.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_code(
        &self,
        id: UserId,
        kind: CodeKind,
        code: &OneTimeCode,
    ) -> Result<(), RepositoryError> {
        let (code_col, expires_col) = kind.columns();
        let sql = format!(
            "UPDATE bazaar.user SET {code_col} = $2, {expires_col} = $3, updated_at = NOW() \
             WHERE id = $1"
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(&code.code)
            .bind(code.expires_at)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Mark the email verified and clear the verification code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_verified(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE bazaar.user \
             SET is_verified = TRUE, verification_code = NULL, \
                 verification_code_expires_at = NULL, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Replace the password hash and clear the reset code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn reset_password(&self, id: UserId, password_hash: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE bazaar.user \
             SET password_hash = $2, reset_code = NULL, reset_code_expires_at = NULL, \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Record whether the user currently holds a session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_logged_in(&self, id: UserId, logged_in: bool) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE bazaar.user SET is_logged_in = $2 WHERE id = $1")
            .bind(id)
            .bind(logged_in)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Update any of username, email, and password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the new email is taken.
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        username: Option<&str>,
        email: Option<&Email>,
        password_hash: Option<&str>,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            "UPDATE bazaar.user \
             SET username = COALESCE($2, username), \
                 email = COALESCE($3, email), \
                 password_hash = COALESCE($4, password_hash), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "email"))?
            .ok_or(RepositoryError::NotFound)?;
        row.try_into()
    }

    /// Set the profile picture URL.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_profile_image(&self, id: UserId, url: &str) -> Result<User, RepositoryError> {
        let sql = format!(
            "UPDATE bazaar.user SET profile_image = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(url)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        row.try_into()
    }

    /// Flip the blocked flag. Blocking also ends the user's session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn toggle_blocked(&self, id: UserId) -> Result<User, RepositoryError> {
        let sql = format!(
            "UPDATE bazaar.user \
             SET is_blocked = NOT is_blocked, \
                 is_logged_in = CASE WHEN is_blocked THEN is_logged_in ELSE FALSE END, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        row.try_into()
    }

    /// Account counts for the admin dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self) -> Result<UserStats, RepositoryError> {
        let stats = sqlx::query_as::<_, UserStats>(
            "SELECT COUNT(*) AS total_users, \
                    COUNT(*) FILTER (WHERE is_verified) AS verified_users, \
                    COUNT(*) FILTER (WHERE is_blocked) AS blocked_users, \
                    COUNT(*) FILTER (WHERE is_admin) AS admin_users, \
                    COUNT(*) FILTER (WHERE is_logged_in) AS logged_in_users \
             FROM bazaar.user",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(stats)
    }

    /// Opt the owner of `token` out of marketing email.
    ///
    /// Returns `false` when no user holds the token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unsubscribe_by_token(&self, token: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE bazaar.user SET unsubscribed = TRUE, updated_at = NOW() \
             WHERE unsubscribe_token = $1",
        )
        .bind(token)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Return the user's unsubscribe token, creating one if missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn ensure_unsubscribe_token(&self, id: UserId) -> Result<String, RepositoryError> {
        let token = sqlx::query_scalar::<_, Option<String>>(
            "UPDATE bazaar.user \
             SET unsubscribe_token = COALESCE(unsubscribe_token, $2) \
             WHERE id = $1 \
             RETURNING unsubscribe_token",
        )
        .bind(id)
        .bind(generate_unsubscribe_token())
        .fetch_optional(self.pool)
        .await?
        .flatten();
        token.ok_or(RepositoryError::NotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_code_row_requires_both_columns() {
        let row = CodeRow {
            code: Some("123456".to_string()),
            expires_at: None,
        };
        assert!(row.into_code().is_none());
        let row = CodeRow {
            code: Some("123456".to_string()),
            expires_at: Some(Utc::now()),
        };
        assert_eq!(row.into_code().unwrap().code, "123456");
    }

    #[test]
    fn test_row_with_bad_email_is_corruption() {
        let row = UserRow {
            id: 1,
            username: "x".to_string(),
            email: Some("not-an-email".to_string()),
            password_hash: None,
            google_id: None,
            is_admin: false,
            is_verified: false,
            is_blocked: false,
            is_logged_in: false,
            profile_image: None,
            unsubscribed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(matches!(
            User::try_from(row),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
