//! Email service for codes, order confirmations and marketing mail.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and text templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::models::{Order, Product};

/// Store name used in subjects and footers.
const STORE_NAME: &str = "Bazaar";

// =============================================================================
// Templates
// =============================================================================

#[derive(Template)]
#[template(path = "email/code.html")]
struct CodeEmailHtml<'a> {
    username: &'a str,
    intro: &'a str,
    code: &'a str,
}

#[derive(Template)]
#[template(path = "email/code.txt")]
struct CodeEmailText<'a> {
    username: &'a str,
    intro: &'a str,
    code: &'a str,
}

/// One row of the order confirmation table.
struct OrderLineView {
    name: String,
    quantity: i32,
    line_total: String,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    username: &'a str,
    tracking_id: &'a str,
    lines: &'a [OrderLineView],
    total: &'a str,
    payment_method: &'a str,
    address: &'a str,
    track_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    username: &'a str,
    tracking_id: &'a str,
    lines: &'a [OrderLineView],
    total: &'a str,
    payment_method: &'a str,
    address: &'a str,
    track_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/subscriber_welcome.html")]
struct SubscriberWelcomeHtml<'a> {
    shop_url: &'a str,
    unsubscribe_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/subscriber_welcome.txt")]
struct SubscriberWelcomeText<'a> {
    shop_url: &'a str,
    unsubscribe_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/new_product.html")]
struct NewProductHtml<'a> {
    name: &'a str,
    brand: &'a str,
    price: &'a str,
    image: Option<&'a str>,
    product_url: &'a str,
    unsubscribe_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/new_product.txt")]
struct NewProductText<'a> {
    name: &'a str,
    brand: &'a str,
    price: &'a str,
    product_url: &'a str,
    unsubscribe_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/campaign.html")]
struct CampaignHtml<'a> {
    subject: &'a str,
    message: &'a str,
    unsubscribe_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/campaign.txt")]
struct CampaignText<'a> {
    message: &'a str,
    unsubscribe_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/contact.html")]
struct ContactHtml<'a> {
    name: &'a str,
    email: &'a str,
    subject: &'a str,
    message: &'a str,
}

#[derive(Template)]
#[template(path = "email/contact.txt")]
struct ContactText<'a> {
    name: &'a str,
    email: &'a str,
    subject: &'a str,
    message: &'a str,
}

// =============================================================================
// Service
// =============================================================================

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Email service for sending transactional and marketing emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    base_url: String,
    frontend_url: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// `base_url` is this API's public URL (unsubscribe links) and
    /// `frontend_url` the storefront's (product and tracking links).
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, base_url: &str, frontend_url: &str) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            base_url: base_url.to_string(),
            frontend_url: frontend_url.to_string(),
        })
    }

    /// Public unsubscribe link for a token.
    #[must_use]
    pub fn unsubscribe_url(&self, token: &str) -> String {
        unsubscribe_url(&self.base_url, token)
    }

    /// Send an email verification code.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_verification_code(&self, to: &str, username: &str, code: &str) -> Result<(), EmailError> {
        let intro = "Use this code to verify your email address. It expires in 15 minutes.";
        let html = CodeEmailHtml { username, intro, code }.render()?;
        let text = CodeEmailText { username, intro, code }.render()?;

        self.send_multipart_email(
            to,
            &format!("Verify your email - {STORE_NAME}"),
            &text,
            &html,
            None,
        )
        .await
    }

    /// Send a password reset code.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_password_reset(&self, to: &str, username: &str, code: &str) -> Result<(), EmailError> {
        let intro = "Use this code to reset your password. It expires in 15 minutes. \
                     If you did not ask for a reset you can ignore this email.";
        let html = CodeEmailHtml { username, intro, code }.render()?;
        let text = CodeEmailText { username, intro, code }.render()?;

        self.send_multipart_email(
            to,
            &format!("Password reset code - {STORE_NAME}"),
            &text,
            &html,
            None,
        )
        .await
    }

    /// Send an order confirmation with the line items and tracking link.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_confirmation(
        &self,
        to: &str,
        username: &str,
        order: &Order,
    ) -> Result<(), EmailError> {
        let lines: Vec<OrderLineView> = order
            .items
            .iter()
            .map(|item| OrderLineView {
                name: item.name.clone(),
                quantity: item.quantity,
                line_total: money(item.line_total()),
            })
            .collect();
        let total = money(order.total);
        let address = order.shipping_address.one_line();
        let track_url = format!("{}/track-order?id={}", self.frontend_url, order.tracking_id);

        let html = OrderConfirmationHtml {
            username,
            tracking_id: &order.tracking_id,
            lines: &lines,
            total: &total,
            payment_method: &order.payment_method,
            address: &address,
            track_url: &track_url,
        }
        .render()?;
        let text = OrderConfirmationText {
            username,
            tracking_id: &order.tracking_id,
            lines: &lines,
            total: &total,
            payment_method: &order.payment_method,
            address: &address,
            track_url: &track_url,
        }
        .render()?;

        self.send_multipart_email(
            to,
            &format!("Order {} confirmed - {STORE_NAME}", order.tracking_id),
            &text,
            &html,
            None,
        )
        .await
    }

    /// Welcome a new newsletter subscriber.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_subscriber_welcome(&self, to: &str, unsubscribe_token: &str) -> Result<(), EmailError> {
        let unsubscribe_url = self.unsubscribe_url(unsubscribe_token);
        let shop_url = self.frontend_url.as_str();
        let html = SubscriberWelcomeHtml {
            shop_url,
            unsubscribe_url: &unsubscribe_url,
        }
        .render()?;
        let text = SubscriberWelcomeText {
            shop_url,
            unsubscribe_url: &unsubscribe_url,
        }
        .render()?;

        self.send_multipart_email(
            to,
            &format!("Welcome to the {STORE_NAME} newsletter"),
            &text,
            &html,
            None,
        )
        .await
    }

    /// Announce a newly listed product to one subscriber.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_new_product(
        &self,
        to: &str,
        product: &Product,
        unsubscribe_token: &str,
    ) -> Result<(), EmailError> {
        let unsubscribe_url = self.unsubscribe_url(unsubscribe_token);
        let product_url = format!("{}/product/{}", self.frontend_url, product.id);
        let price = money(product.final_price());

        let html = NewProductHtml {
            name: &product.name,
            brand: &product.brand,
            price: &price,
            image: product.image.as_deref(),
            product_url: &product_url,
            unsubscribe_url: &unsubscribe_url,
        }
        .render()?;
        let text = NewProductText {
            name: &product.name,
            brand: &product.brand,
            price: &price,
            product_url: &product_url,
            unsubscribe_url: &unsubscribe_url,
        }
        .render()?;

        self.send_multipart_email(
            to,
            &format!("New arrival: {}", product.name),
            &text,
            &html,
            None,
        )
        .await
    }

    /// Send one copy of a marketing campaign.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_campaign(
        &self,
        to: &str,
        subject: &str,
        message: &str,
        unsubscribe_token: &str,
    ) -> Result<(), EmailError> {
        let unsubscribe_url = self.unsubscribe_url(unsubscribe_token);
        let html = CampaignHtml {
            subject,
            message,
            unsubscribe_url: &unsubscribe_url,
        }
        .render()?;
        let text = CampaignText {
            message,
            unsubscribe_url: &unsubscribe_url,
        }
        .render()?;

        self.send_multipart_email(to, subject, &text, &html, None)
            .await
    }

    /// Relay a contact form message to the store inbox, replying to the sender.
    ///
    /// # Errors
    ///
    /// Returns error if an address is invalid or the email fails to send.
    pub async fn send_contact_message(
        &self,
        inbox: &str,
        name: &str,
        email: &str,
        subject: &str,
        message: &str,
    ) -> Result<(), EmailError> {
        let html = ContactHtml {
            name,
            email,
            subject,
            message,
        }
        .render()?;
        let text = ContactText {
            name,
            email,
            subject,
            message,
        }
        .render()?;

        self.send_multipart_email(
            inbox,
            &format!("Contact form: {subject}"),
            &text,
            &html,
            Some(email),
        )
        .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
        reply_to: Option<&str>,
    ) -> Result<(), EmailError> {
        let mut builder = Message::builder()
            .from(parse_mailbox(&self.from_address)?)
            .to(parse_mailbox(to)?)
            .subject(subject);
        if let Some(reply_to) = reply_to {
            builder = builder.reply_to(parse_mailbox(reply_to)?);
        }

        let email = builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(text_body.to_string()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(html_body.to_string()),
                ),
        )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, EmailError> {
    address
        .parse()
        .map_err(|_| EmailError::InvalidAddress(address.to_string()))
}

/// Unsubscribe link under `base_url`.
#[must_use]
pub fn unsubscribe_url(base_url: &str, token: &str) -> String {
    format!("{}/api/unsubscribe/{token}", base_url.trim_end_matches('/'))
}

/// Format an amount as dollars with two decimals.
fn money(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

/// Generate a 6-digit verification code.
#[must_use]
pub fn generate_verification_code() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_verification_code_format() {
        let code = generate_verification_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_generate_verification_code_range() {
        for _ in 0..100 {
            let code: u32 = generate_verification_code().parse().expect("valid number");
            assert!(code >= 100_000);
            assert!(code < 1_000_000);
        }
    }

    #[test]
    fn test_unsubscribe_url() {
        assert_eq!(
            unsubscribe_url("https://api.bazaar.test/", "ab12"),
            "https://api.bazaar.test/api/unsubscribe/ab12"
        );
    }

    #[test]
    fn test_money_format() {
        assert_eq!(money(Decimal::new(1080, 0)), "$1080.00");
        assert_eq!(money(Decimal::new(19_999, 3)), "$20.00");
    }

    #[test]
    fn test_code_template_renders_code() {
        let html = CodeEmailHtml {
            username: "ada",
            intro: "Use this code.",
            code: "482913",
        }
        .render()
        .expect("template renders");
        assert!(html.contains("482913"));
        assert!(html.contains("ada"));
    }

    #[test]
    fn test_contact_template_escapes_html() {
        let html = ContactHtml {
            name: "<script>",
            email: "eve@example.com",
            subject: "Hi",
            message: "hello",
        }
        .render()
        .expect("template renders");
        assert!(!html.contains("<script>"));
    }
}
