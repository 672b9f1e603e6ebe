//! Admin account management.
//!
//! # Usage
//!
//! ```bash
//! bazaar-cli admin create -u "Store Admin" -e admin@example.com -p 'long-password'
//! ```
//!
//! Accounts created here are verified immediately. Public sign-up can never
//! grant admin rights, so this is the only way to create the first admin.

use thiserror::Error;

use bazaar_api::services::{AuthError, AuthService};

use super::{CommandError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Admin user already exists with email: {0}")]
    UserExists(String),

    #[error(transparent)]
    Auth(AuthError),
}

/// Create a verified admin account. Returns the new user's ID.
pub async fn create_user(username: &str, email: &str, password: &str) -> Result<String, AdminError> {
    let pool = connect().await?;

    tracing::info!("Creating admin user: {}", email);
    let user = AuthService::new(&pool)
        .create_admin(username, email, password)
        .await
        .map_err(|e| match e {
            AuthError::UserAlreadyExists => AdminError::UserExists(email.to_owned()),
            other => AdminError::Auth(other),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        email
    );
    Ok(user.id.to_string())
}
