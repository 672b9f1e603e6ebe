//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{Email, UserId};

/// A customer or admin account.
///
/// Accounts created through Google sign-in have no email-password credential,
/// and the very first Google profile may not carry an email at all.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub username: String,
    pub email: Option<Email>,
    #[serde(skip)]
    pub password_hash: Option<String>,
    #[serde(skip)]
    pub google_id: Option<String>,
    pub is_admin: bool,
    pub is_verified: bool,
    pub is_blocked: bool,
    pub is_logged_in: bool,
    pub profile_image: Option<String>,
    pub unsubscribed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A pending one-time code and its expiry.
#[derive(Debug, Clone)]
pub struct OneTimeCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl OneTimeCode {
    /// Whether `candidate` matches and the code has not expired.
    #[must_use]
    pub fn check(&self, candidate: &str, now: DateTime<Utc>) -> CodeCheck {
        if self.code != candidate.trim() {
            CodeCheck::Mismatch
        } else if self.expires_at < now {
            CodeCheck::Expired
        } else {
            CodeCheck::Valid
        }
    }
}

/// Outcome of comparing a submitted code with the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCheck {
    Valid,
    Mismatch,
    Expired,
}

/// The subset of a user returned by profile endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub username: String,
    pub email: Option<Email>,
    pub is_admin: bool,
    pub profile_image: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            profile_image: user.profile_image.clone(),
        }
    }
}

/// Account counts shown on the admin dashboard.
#[derive(Debug, Clone, Copy, Default, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: i64,
    pub verified_users: i64,
    pub blocked_users: i64,
    pub admin_users: i64,
    pub logged_in_users: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn user() -> User {
        User {
            id: UserId::new(7),
            username: "ada".to_string(),
            email: Some(Email::parse("ada@example.com").unwrap()),
            password_hash: Some("$argon2id$v=19$...".to_string()),
            google_id: None,
            is_admin: false,
            is_verified: true,
            is_blocked: false,
            is_logged_in: true,
            profile_image: None,
            unsubscribed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_json_hides_credentials() {
        let json = serde_json::to_string(&user()).unwrap();
        assert!(json.contains("\"_id\":7"));
        assert!(json.contains("\"isVerified\":true"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("passwordHash"));
    }

    #[test]
    fn test_profile_shape() {
        let profile = UserProfile::from(&user());
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["username"], "ada");
        assert_eq!(value["email"], "ada@example.com");
        assert_eq!(value["isAdmin"], false);
        assert!(value["profileImage"].is_null());
    }

    #[test]
    fn test_one_time_code_check() {
        let now = Utc::now();
        let code = OneTimeCode {
            code: "123456".to_string(),
            expires_at: now + Duration::minutes(15),
        };
        assert_eq!(code.check(" 123456 ", now), CodeCheck::Valid);
        assert_eq!(code.check("654321", now), CodeCheck::Mismatch);
        assert_eq!(
            code.check("123456", now + Duration::minutes(16)),
            CodeCheck::Expired
        );
    }
}
