//! Signed bearer tokens and OAuth `state` values (HS256 JWT).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use bazaar_core::UserId;

use super::AuthError;

/// Lifetime of a bearer token.
pub const ACCESS_TOKEN_TTL_DAYS: i64 = 7;

/// Lifetime of an OAuth `state` value.
pub const OAUTH_STATE_TTL_MINUTES: i64 = 10;

const OAUTH_STATE_AUDIENCE: &str = "bazaar:google-oauth-state";

/// Claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub admin: bool,
    pub iat: i64,
    pub exp: i64,
}

/// Whether a Google sign-in may create a new account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthMode {
    #[default]
    Login,
    Signup,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateClaims {
    mode: OAuthMode,
    nonce: String,
    aud: String,
    exp: i64,
}

/// Keys for issuing and checking tokens, derived from `JWT_SECRET`.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenKeys([REDACTED])")
    }
}

impl TokenKeys {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
        }
    }

    /// Issue a bearer token valid for [`ACCESS_TOKEN_TTL_DAYS`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if signing fails.
    pub fn issue(&self, user_id: UserId, admin: bool) -> Result<String, AuthError> {
        self.issue_at(user_id, admin, Utc::now())
    }

    fn issue_at(&self, user_id: UserId, admin: bool, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id,
            admin,
            iat: now.timestamp(),
            exp: (now + Duration::days(ACCESS_TOKEN_TTL_DAYS)).timestamp(),
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Check a bearer token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is malformed, forged or expired.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    /// Issue a signed `state` value for the Google consent redirect.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if signing fails.
    pub fn issue_oauth_state(&self, mode: OAuthMode) -> Result<String, AuthError> {
        let nonce: [u8; 16] = rand::random();
        let claims = StateClaims {
            mode,
            nonce: hex::encode(nonce),
            aud: OAUTH_STATE_AUDIENCE.to_string(),
            exp: (Utc::now() + Duration::minutes(OAUTH_STATE_TTL_MINUTES)).timestamp(),
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Check a `state` value returned by Google and recover the mode.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the state is forged or stale.
    pub fn verify_oauth_state(&self, state: &str) -> Result<OAuthMode, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[OAUTH_STATE_AUDIENCE]);
        let data = jsonwebtoken::decode::<StateClaims>(state, &self.decoding, &validation)?;
        Ok(data.claims.mode)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn keys() -> TokenKeys {
        TokenKeys::new(&SecretString::from("k3J9vQ2mX7pL4wR8tY1nB6cF0hD5sZ3aG"))
    }

    #[test]
    fn test_token_round_trip() {
        let keys = keys();
        let token = keys.issue(UserId::new(42), true).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, UserId::new(42));
        assert!(claims.admin);
        assert_eq!(claims.exp - claims.iat, ACCESS_TOKEN_TTL_DAYS * 24 * 60 * 60);
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = keys();
        let issued = Utc::now() - Duration::days(ACCESS_TOKEN_TTL_DAYS + 1);
        let token = keys.issue_at(UserId::new(1), false, issued).unwrap();
        assert!(matches!(keys.verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let other = TokenKeys::new(&SecretString::from("Zq8Lw3Rt6Yp1Mn4Bv7Cx0Kj2Hg5Fd9Sa"));
        let token = other.issue(UserId::new(1), true).unwrap();
        assert!(keys().verify(&token).is_err());
        assert!(keys().verify("not-a-token").is_err());
    }

    #[test]
    fn test_oauth_state_round_trip() {
        let keys = keys();
        let state = keys.issue_oauth_state(OAuthMode::Signup).unwrap();
        assert_eq!(keys.verify_oauth_state(&state).unwrap(), OAuthMode::Signup);
    }

    #[test]
    fn test_state_and_access_tokens_not_interchangeable() {
        let keys = keys();
        let state = keys.issue_oauth_state(OAuthMode::Login).unwrap();
        assert!(keys.verify(&state).is_err());
        let token = keys.issue(UserId::new(1), false).unwrap();
        assert!(keys.verify_oauth_state(&token).is_err());
    }
}
