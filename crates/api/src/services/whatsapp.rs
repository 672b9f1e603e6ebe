//! Admin alerts over WhatsApp via the Twilio Messages API.

use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::instrument;

use crate::config::TwilioConfig;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Errors from sending a WhatsApp message.
#[derive(Debug, Error)]
pub enum WhatsAppError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Twilio returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Sends WhatsApp messages to the store admin.
#[derive(Clone)]
pub struct WhatsAppNotifier {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl WhatsAppNotifier {
    #[must_use]
    pub const fn new(client: reqwest::Client, config: TwilioConfig) -> Self {
        Self { client, config }
    }

    /// Tell the admin a customer intends to visit.
    ///
    /// # Errors
    ///
    /// Returns `WhatsAppError` if the request fails or Twilio rejects it.
    #[instrument(skip(self, customer_message))]
    pub async fn send_visit_alert(&self, customer_message: &str) -> Result<(), WhatsAppError> {
        self.send_to_admin(&visit_alert_body(customer_message)).await
    }

    async fn send_to_admin(&self, body: &str) -> Result<(), WhatsAppError> {
        let url = format!(
            "{TWILIO_API_BASE}/Accounts/{}/Messages.json",
            self.config.account_sid
        );
        let response = self
            .client
            .post(url)
            .basic_auth(
                &self.config.account_sid,
                Some(self.config.auth_token.expose_secret()),
            )
            .form(&[
                ("From", self.config.from.as_str()),
                ("To", self.config.admin_to.as_str()),
                ("Body", body),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WhatsAppError::Api {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!("Admin WhatsApp alert sent");
        Ok(())
    }
}

fn visit_alert_body(customer_message: &str) -> String {
    format!(
        "*Bazaar visit alert*\n\n*Customer message:* {customer_message}\n*Status:* Visit intent detected"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visit_alert_body_quotes_customer() {
        let body = visit_alert_body("Coming tomorrow at 5");
        assert!(body.contains("*Customer message:* Coming tomorrow at 5"));
    }

    #[test]
    fn test_api_error_display() {
        let err = WhatsAppError::Api {
            status: 401,
            body: "Authenticate".to_string(),
        };
        assert_eq!(err.to_string(), "Twilio returned 401: Authenticate");
    }
}
