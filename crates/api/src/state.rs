//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::groq::{GroqClient, GroqError};
use crate::services::auth::{AuthService, GoogleOAuth, TokenKeys};
use crate::services::media::{CloudinaryUploader, LocalStore, MediaStore};
use crate::services::{EmailService, PaymentService, SalesChat, WhatsAppNotifier};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("sales assistant client error: {0}")]
    Groq(#[from] GroqError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    tokens: TokenKeys,
    email: Option<EmailService>,
    media: MediaStore,
    payments: Option<PaymentService>,
    sales_chat: Option<SalesChat>,
    whatsapp: Option<WhatsAppNotifier>,
    google: Option<GoogleOAuth>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Optional integrations are built only when configured. A broken SMTP
    /// configuration disables mail with a warning rather than failing startup.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let tokens = TokenKeys::new(&config.jwt_secret);

        let email = match &config.email {
            Some(email_config) => {
                match EmailService::new(email_config, &config.base_url, &config.frontend_url) {
                    Ok(service) => Some(service),
                    Err(e) => {
                        tracing::warn!(error = %e, "SMTP relay misconfigured, email disabled");
                        None
                    }
                }
            }
            None => {
                tracing::warn!("SMTP not configured, email disabled");
                None
            }
        };

        let media = match &config.cloudinary {
            Some(cloudinary) => {
                MediaStore::Cloudinary(CloudinaryUploader::new(http.clone(), cloudinary.clone()))
            }
            None => {
                tracing::info!(dir = %config.uploads_dir.display(), "Storing uploads locally");
                MediaStore::Local(LocalStore::new(
                    config.uploads_dir.clone(),
                    config.base_url.clone(),
                ))
            }
        };

        let payments = config.stripe.clone().map(|stripe| {
            PaymentService::new(http.clone(), stripe, config.frontend_url.clone())
        });
        let sales_chat = config
            .groq
            .as_ref()
            .map(GroqClient::new)
            .transpose()?
            .map(SalesChat::new);
        let whatsapp = config
            .twilio
            .clone()
            .map(|twilio| WhatsAppNotifier::new(http.clone(), twilio));
        let google = config
            .google
            .clone()
            .map(|google| GoogleOAuth::new(http.clone(), google));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                email,
                media,
                payments,
                sales_chat,
                whatsapp,
                google,
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenKeys {
        &self.inner.tokens
    }

    /// Auth service bound to this state's pool.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(&self.inner.pool)
    }

    /// Mail service, when SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    #[must_use]
    pub fn media(&self) -> &MediaStore {
        &self.inner.media
    }

    #[must_use]
    pub fn payments(&self) -> Option<&PaymentService> {
        self.inner.payments.as_ref()
    }

    #[must_use]
    pub fn sales_chat(&self) -> Option<&SalesChat> {
        self.inner.sales_chat.as_ref()
    }

    #[must_use]
    pub fn whatsapp(&self) -> Option<&WhatsAppNotifier> {
        self.inner.whatsapp.as_ref()
    }

    #[must_use]
    pub fn google(&self) -> Option<&GoogleOAuth> {
        self.inner.google.as_ref()
    }
}
