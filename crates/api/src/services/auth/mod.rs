//! Authentication service.
//!
//! Provides password accounts with emailed one-time codes, bearer tokens and
//! Google sign-in account resolution.

mod error;
pub mod google;
pub mod tokens;

pub use error::AuthError;
pub use google::{GoogleOAuth, OAuthError};
pub use tokens::{Claims, OAuthMode, TokenKeys};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use bazaar_core::{Email, UserId};

use crate::db::{CodeKind, NewGoogleUser, NewLocalUser, RepositoryError, UserRepository};
use crate::models::{CodeCheck, OneTimeCode, User};
use crate::services::email::generate_verification_code;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Lifetime of verification and reset codes.
pub const CODE_TTL_MINUTES: i64 = 15;

/// A fresh 6-digit code expiring [`CODE_TTL_MINUTES`] after `now`.
#[must_use]
pub fn new_one_time_code(now: DateTime<Utc>) -> OneTimeCode {
    OneTimeCode {
        code: generate_verification_code(),
        expires_at: now + Duration::minutes(CODE_TTL_MINUTES),
    }
}

/// Profile returned by Google after a successful consent.
#[derive(Debug, Clone)]
pub struct GoogleProfile {
    pub google_id: String,
    pub email: Option<Email>,
    pub name: String,
    pub picture: Option<String>,
}

/// How a Google sign-in was resolved to a local account.
#[derive(Debug)]
pub enum GoogleSignIn {
    /// An existing or newly created account.
    User(User),
    /// No matching account and the flow did not allow creating one.
    AccountNotFound,
}

/// Authentication service.
///
/// Handles registration, email verification, login and password resets.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    // =========================================================================
    // Registration & Verification
    // =========================================================================

    /// Register a new unverified customer.
    ///
    /// Returns the user and the verification code to email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, OneTimeCode), AuthError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::MissingField("Username"));
        }
        let email = Email::parse(email)?;
        validate_password(password)?;

        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(password)?;
        let code = new_one_time_code(Utc::now());

        let user = self
            .users
            .create_local(&NewLocalUser {
                username,
                email: &email,
                password_hash: &password_hash,
                is_admin: false,
                is_verified: false,
                verification: Some(&code),
            })
            .await
            .map_err(already_exists)?;

        Ok((user, code))
    }

    /// Create a verified admin account (operator CLI).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn create_admin(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        self.users
            .create_local(&NewLocalUser {
                username: username.trim(),
                email: &email,
                password_hash: &password_hash,
                is_admin: true,
                is_verified: true,
                verification: None,
            })
            .await
            .map_err(already_exists)
    }

    /// Confirm an email address with the emailed code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound`, `AlreadyVerified`, `InvalidCode` or
    /// `CodeExpired` as appropriate.
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<User, AuthError> {
        let user = self.find_by_email(email).await?;
        if user.is_verified {
            return Err(AuthError::AlreadyVerified);
        }

        let stored = self
            .users
            .code(user.id, CodeKind::Verification)
            .await?
            .ok_or(AuthError::InvalidCode)?;

        match stored.check(code, Utc::now()) {
            CodeCheck::Valid => {
                self.users.mark_verified(user.id).await?;
                Ok(user)
            }
            CodeCheck::Mismatch => Err(AuthError::InvalidCode),
            CodeCheck::Expired => Err(AuthError::CodeExpired),
        }
    }

    /// Replace the verification code of an unverified account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` or `AuthError::AlreadyVerified`.
    pub async fn resend_verification(&self, email: &str) -> Result<(User, OneTimeCode), AuthError> {
        let user = self.find_by_email(email).await?;
        if user.is_verified {
            return Err(AuthError::AlreadyVerified);
        }

        let code = new_one_time_code(Utc::now());
        self.users
            .set_code(user.id, CodeKind::Verification, &code)
            .await?;
        Ok((user, code))
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Check credentials and mark the account as logged in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email or wrong
    /// password, `Blocked` for blocked accounts and `Unverified` when the
    /// email has not been confirmed.
    pub async fn login(&self, email: &str, password: Option<&str>) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if user.is_blocked {
            return Err(AuthError::Blocked);
        }

        let Some(hash) = user.password_hash.as_deref() else {
            return Err(AuthError::GoogleAccount);
        };
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or(AuthError::PasswordRequired)?;
        verify_password(password, hash)?;

        if !user.is_verified {
            return Err(AuthError::Unverified);
        }

        self.users.set_logged_in(user.id, true).await?;
        Ok(user)
    }

    /// Clear the logged-in flag.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the update fails.
    pub async fn logout(&self, user_id: UserId) -> Result<(), AuthError> {
        self.users.set_logged_in(user_id, false).await?;
        Ok(())
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Start a password reset.
    ///
    /// Returns `None` when no account matches, so callers can answer the same
    /// way either way.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database fails.
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<(User, OneTimeCode)>, AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(None);
        };
        let Some(user) = self.users.get_by_email(&email).await? else {
            return Ok(None);
        };

        let code = new_one_time_code(Utc::now());
        self.users
            .set_code(user.id, CodeKind::PasswordReset, &code)
            .await?;
        Ok(Some((user, code)))
    }

    /// Set a new password using an emailed reset code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetCode` for an unknown account or a wrong
    /// or expired code.
    pub async fn reset_password(&self, email: &str, code: &str, password: &str) -> Result<(), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidResetCode)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidResetCode)?;

        let stored = self
            .users
            .code(user.id, CodeKind::PasswordReset)
            .await?
            .ok_or(AuthError::InvalidResetCode)?;
        if stored.check(code, Utc::now()) != CodeCheck::Valid {
            return Err(AuthError::InvalidResetCode);
        }

        validate_password(password)?;
        let password_hash = hash_password(password)?;
        self.users.reset_password(user.id, &password_hash).await?;
        Ok(())
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Update username, email and/or password. Blank values are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `WeakPassword` or `UserAlreadyExists`
    /// (email taken).
    pub async fn update_profile(
        &self,
        user_id: UserId,
        username: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<User, AuthError> {
        let username = username.map(str::trim).filter(|u| !u.is_empty());
        let email = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(Email::parse)
            .transpose()?;
        let password_hash = match password.filter(|p| !p.is_empty()) {
            Some(password) => {
                validate_password(password)?;
                Some(hash_password(password)?)
            }
            None => None,
        };

        self.users
            .update_profile(user_id, username, email.as_ref(), password_hash.as_deref())
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => already_exists(other),
            })
    }

    // =========================================================================
    // Google Sign-In
    // =========================================================================

    /// Resolve a Google profile to a local account.
    ///
    /// A known Google ID signs in. A known email gets the Google ID linked and
    /// is marked verified. Otherwise a verified account is created in
    /// [`OAuthMode::Signup`] and refused in [`OAuthMode::Login`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database fails.
    pub async fn google_sign_in(
        &self,
        profile: &GoogleProfile,
        mode: OAuthMode,
    ) -> Result<GoogleSignIn, AuthError> {
        if let Some(user) = self.users.get_by_google_id(&profile.google_id).await? {
            return Ok(GoogleSignIn::User(user));
        }

        if let Some(email) = &profile.email
            && let Some(existing) = self.users.get_by_email(email).await?
        {
            let linked = self.users.link_google(existing.id, &profile.google_id).await?;
            return Ok(GoogleSignIn::User(linked));
        }

        if mode == OAuthMode::Login {
            return Ok(GoogleSignIn::AccountNotFound);
        }

        let username = if profile.name.trim().is_empty() {
            "Google User"
        } else {
            profile.name.trim()
        };
        let user = self
            .users
            .create_google(&NewGoogleUser {
                username,
                email: profile.email.as_ref(),
                google_id: &profile.google_id,
                profile_image: profile.picture.as_deref(),
            })
            .await?;
        Ok(GoogleSignIn::User(user))
    }

    async fn find_by_email(&self, email: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::UserNotFound)?;
        self.users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

fn already_exists(e: RepositoryError) -> AuthError {
    match e {
        RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
        other => AuthError::Repository(other),
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("battery staple", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_against_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn test_new_one_time_code_expiry() {
        let now = Utc::now();
        let code = new_one_time_code(now);
        assert_eq!(code.code.len(), 6);
        assert_eq!(code.expires_at - now, Duration::minutes(15));
        assert_eq!(code.check(&code.code, now), CodeCheck::Valid);
        assert_eq!(
            code.check(&code.code, now + Duration::minutes(16)),
            CodeCheck::Expired
        );
    }
}
