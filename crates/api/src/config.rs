//! API server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `JWT_SECRET` - Bearer token signing secret (min 32 chars, high entropy)
//! - `FRONTEND_URL` - Public URL of the storefront (CORS, OAuth redirects)
//!
//! ## Optional
//! - `API_HOST` - Bind address (default: 127.0.0.1)
//! - `API_PORT` - Listen port (default: 5000)
//! - `BASE_URL` - Public URL of this API (default: `http://localhost:5000`)
//! - `CORS_ORIGINS` - Extra allowed origins, comma separated
//! - `UPLOADS_DIR` - Local media directory when Cloudinary is not set (default: uploads)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` - Outgoing mail
//! - `CONTACT_INBOX` - Where contact form messages are relayed (default: `EMAIL_FROM`)
//! - `STRIPE_SECRET_KEY` - Stripe Checkout
//! - `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET` - Image hosting
//! - `GROQ_API_KEY`, `GROQ_MODEL` - Sales assistant model
//! - `TWILIO_SID`, `TWILIO_AUTH_TOKEN`, `TWILIO_WHATSAPP_FROM`, `ADMIN_WHATSAPP_NUMBER` - Visit alerts
//! - `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, `GOOGLE_CALLBACK_URL` - Google sign-in
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT` - Error tracking

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default model for the sales assistant.
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

/// Origins of the local storefront dev servers, always allowed by CORS.
const DEV_ORIGINS: &[&str] = &["http://localhost:5173", "http://localhost:3000"];

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of this API, used in unsubscribe links
    pub base_url: String,
    /// Public URL of the storefront
    pub frontend_url: String,
    /// All origins allowed by CORS
    pub cors_origins: Vec<String>,
    /// Directory for locally stored uploads
    pub uploads_dir: PathBuf,
    /// Bearer token signing secret
    pub jwt_secret: SecretString,
    pub email: Option<EmailConfig>,
    /// Inbox that receives contact form messages
    pub contact_inbox: Option<String>,
    pub stripe: Option<StripeConfig>,
    pub cloudinary: Option<CloudinaryConfig>,
    pub groq: Option<GroqConfig>,
    pub twilio: Option<TwilioConfig>,
    pub google: Option<GoogleOAuthConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

/// SMTP settings.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    /// `From:` header, e.g. `Bazaar <no-reply@bazaar.shop>`
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Stripe Checkout settings.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: SecretString,
}

/// Cloudinary upload settings.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: SecretString,
}

/// Groq chat-completions settings.
#[derive(Debug, Clone)]
pub struct GroqConfig {
    pub api_key: SecretString,
    pub model: String,
}

/// Twilio WhatsApp settings.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: SecretString,
    /// Sender, e.g. `whatsapp:+14155238886`
    pub from: String,
    /// Admin recipient, e.g. `whatsapp:+15551234567`
    pub admin_to: String,
}

/// Google OAuth 2.0 client settings.
#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub callback_url: String,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_required_secret("DATABASE_URL")?;
        let host = get_env_or_default("API_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("API_HOST".to_string(), e.to_string()))?;
        let port = parse_port("API_PORT", &get_env_or_default("API_PORT", "5000"))?;
        let base_url = get_env_or_default("BASE_URL", "http://localhost:5000");
        let frontend_url = get_required_env("FRONTEND_URL")?;
        let jwt_secret = get_validated_secret("JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "JWT_SECRET")?;

        let cors_origins = cors_origins(&frontend_url, get_optional_env("CORS_ORIGINS").as_deref());
        let uploads_dir = PathBuf::from(get_env_or_default("UPLOADS_DIR", "uploads"));

        let email = EmailConfig::from_env()?;
        let contact_inbox = get_optional_env("CONTACT_INBOX")
            .or_else(|| email.as_ref().map(|e| e.from_address.clone()));

        Ok(Self {
            database_url,
            host,
            port,
            base_url: base_url.trim_end_matches('/').to_string(),
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
            cors_origins,
            uploads_dir,
            jwt_secret,
            email,
            contact_inbox,
            stripe: get_optional_env("STRIPE_SECRET_KEY").map(|key| StripeConfig {
                secret_key: SecretString::from(key),
            }),
            cloudinary: CloudinaryConfig::from_env()?,
            groq: get_optional_env("GROQ_API_KEY").map(|key| GroqConfig {
                api_key: SecretString::from(key),
                model: get_env_or_default("GROQ_MODEL", DEFAULT_GROQ_MODEL),
            }),
            twilio: TwilioConfig::from_env()?,
            google: GoogleOAuthConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };
        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_port("SMTP_PORT", &get_env_or_default("SMTP_PORT", "587"))?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("EMAIL_FROM")?,
        }))
    }
}

impl CloudinaryConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(cloud_name) = get_optional_env("CLOUDINARY_CLOUD_NAME") else {
            return Ok(None);
        };
        Ok(Some(Self {
            cloud_name,
            api_key: get_required_env("CLOUDINARY_API_KEY")?,
            api_secret: get_required_secret("CLOUDINARY_API_SECRET")?,
        }))
    }
}

impl TwilioConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(account_sid) = get_optional_env("TWILIO_SID") else {
            return Ok(None);
        };
        Ok(Some(Self {
            account_sid,
            auth_token: get_required_secret("TWILIO_AUTH_TOKEN")?,
            from: get_required_env("TWILIO_WHATSAPP_FROM")?,
            admin_to: get_required_env("ADMIN_WHATSAPP_NUMBER")?,
        }))
    }
}

impl GoogleOAuthConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(client_id) = get_optional_env("GOOGLE_CLIENT_ID") else {
            return Ok(None);
        };
        Ok(Some(Self {
            client_id,
            client_secret: get_required_secret("GOOGLE_CLIENT_SECRET")?,
            callback_url: get_required_env("GOOGLE_CALLBACK_URL")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_port(key: &str, value: &str) -> Result<u16, ConfigError> {
    value
        .parse::<u16>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Build the CORS allow-list: the frontend, the local dev servers, and any
/// extra comma-separated origins.
fn cors_origins(frontend_url: &str, extra: Option<&str>) -> Vec<String> {
    let mut origins: Vec<String> = Vec::new();
    let candidates = std::iter::once(frontend_url)
        .chain(DEV_ORIGINS.iter().copied())
        .chain(extra.unwrap_or_default().split(','));
    for origin in candidates {
        let origin = origin.trim().trim_end_matches('/');
        if !origin.is_empty() && !origins.iter().any(|o| o == origin) {
            origins.push(origin.to_string());
        }
    }
    origins
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-jwt-key-here", "JWT_SECRET").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
        assert!(validate_secret_strength("changeme123", "JWT_SECRET").is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"ab".repeat(20), "JWT_SECRET");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "JWT_SECRET");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_secret_length() {
        assert!(validate_secret_length(&SecretString::from("short"), "JWT_SECRET").is_err());
        assert!(validate_secret_length(&SecretString::from("a".repeat(32)), "JWT_SECRET").is_ok());
    }

    #[test]
    fn test_cors_origins_dedup_and_trim() {
        let origins = cors_origins(
            "https://shop.example.org/",
            Some(" https://admin.example.org , http://localhost:5173,,"),
        );
        assert_eq!(
            origins,
            vec![
                "https://shop.example.org",
                "http://localhost:5173",
                "http://localhost:3000",
                "https://admin.example.org",
            ]
        );
    }

    #[test]
    fn test_parse_port_rejects_garbage() {
        assert_eq!(parse_port("API_PORT", "5000").unwrap(), 5000);
        assert!(parse_port("API_PORT", "http").is_err());
    }

    #[test]
    fn test_email_config_debug_redacts_password() {
        let config = EmailConfig {
            smtp_host: "smtp.mailhost.test".to_string(),
            smtp_port: 587,
            smtp_username: "mailer".to_string(),
            smtp_password: SecretString::from("hunter2-very-private"),
            from_address: "Bazaar <no-reply@bazaar.test>".to_string(),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("smtp.mailhost.test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2-very-private"));
    }
}
