//! Google OAuth 2.0 authorization-code flow.

use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use bazaar_core::Email;

use super::GoogleProfile;
use crate::config::GoogleOAuthConfig;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const SCOPES: &str = "openid profile email";

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Google returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("invalid authorize URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

impl From<UserInfo> for GoogleProfile {
    fn from(info: UserInfo) -> Self {
        // Unverified Google addresses are not trusted for account linking.
        let email = info
            .email
            .filter(|_| info.email_verified.unwrap_or(true))
            .and_then(|e| Email::parse(&e).ok());
        let name = info
            .name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| {
                email
                    .as_ref()
                    .and_then(|e| e.as_str().split('@').next())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "Google User".to_string());
        Self {
            google_id: info.sub,
            email,
            name,
            picture: info.picture,
        }
    }
}

/// Client for Google's OAuth endpoints.
#[derive(Clone)]
pub struct GoogleOAuth {
    client: reqwest::Client,
    config: GoogleOAuthConfig,
}

impl GoogleOAuth {
    #[must_use]
    pub const fn new(client: reqwest::Client, config: GoogleOAuthConfig) -> Self {
        Self { client, config }
    }

    /// Consent-screen URL carrying the signed `state`.
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::Url` if the URL cannot be built.
    pub fn authorize_url(&self, state: &str) -> Result<Url, OAuthError> {
        Ok(Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.callback_url.as_str()),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("state", state),
                ("prompt", "select_account"),
            ],
        )?)
    }

    /// Exchange an authorization code and fetch the user's profile.
    ///
    /// # Errors
    ///
    /// Returns `OAuthError` if either Google call fails.
    #[instrument(skip(self, code))]
    pub async fn fetch_profile(&self, code: &str) -> Result<GoogleProfile, OAuthError> {
        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.expose_secret()),
                ("redirect_uri", self.config.callback_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        let token: TokenResponse = checked(response).await?.json().await?;

        let response = self
            .client
            .get(USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await?;
        let info: UserInfo = checked(response).await?.json().await?;
        Ok(info.into())
    }
}

async fn checked(response: reqwest::Response) -> Result<reqwest::Response, OAuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(OAuthError::Provider {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn oauth() -> GoogleOAuth {
        GoogleOAuth::new(
            reqwest::Client::new(),
            GoogleOAuthConfig {
                client_id: "client-123".to_string(),
                client_secret: SecretString::from("shh"),
                callback_url: "http://localhost:5000/api/auth/google/callback".to_string(),
            },
        )
    }

    #[test]
    fn test_authorize_url_carries_state() {
        let url = oauth().authorize_url("abc.def").unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params.get("client_id").map(String::as_str), Some("client-123"));
        assert_eq!(params.get("state").map(String::as_str), Some("abc.def"));
        assert_eq!(params.get("scope").map(String::as_str), Some(SCOPES));
        assert_eq!(
            params.get("redirect_uri").map(String::as_str),
            Some("http://localhost:5000/api/auth/google/callback")
        );
    }

    #[test]
    fn test_profile_from_userinfo() {
        let info: UserInfo = serde_json::from_str(
            r#"{"sub":"1089","email":"Ada@Example.com","email_verified":true,"name":"Ada","picture":"https://p/x.png"}"#,
        )
        .unwrap();
        let profile = GoogleProfile::from(info);
        assert_eq!(profile.google_id, "1089");
        assert_eq!(profile.email.unwrap().as_str(), "ada@example.com");
        assert_eq!(profile.name, "Ada");
    }

    #[test]
    fn test_unverified_email_dropped() {
        let info: UserInfo =
            serde_json::from_str(r#"{"sub":"1","email":"x@example.com","email_verified":false}"#).unwrap();
        let profile = GoogleProfile::from(info);
        assert!(profile.email.is_none());
        assert_eq!(profile.name, "Google User");
    }
}
