//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
///
/// Display strings are client-facing messages.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("Invalid email address")]
    InvalidEmail(#[from] bazaar_core::EmailError),

    /// A required field was empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Invalid credentials (wrong password or user not found).
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Password account logged in without a password.
    #[error("Password is required")]
    PasswordRequired,

    /// Account has no password because it signs in with Google.
    #[error("This account uses Google sign-in")]
    GoogleAccount,

    /// User not found.
    #[error("User not found")]
    UserNotFound,

    /// User already exists.
    #[error("User already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    #[error("Email already verified")]
    AlreadyVerified,

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Verification code expired")]
    CodeExpired,

    #[error("Invalid or expired reset code")]
    InvalidResetCode,

    #[error("Your account has been blocked.")]
    Blocked,

    #[error("Please verify your email before logging in.")]
    Unverified,

    /// Bearer token or OAuth state failed validation.
    #[error("Invalid or expired token")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
