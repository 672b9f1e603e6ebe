//! Stripe Checkout sessions.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use bazaar_core::pricing::round_cents;

use crate::config::StripeConfig;

const STRIPE_CHECKOUT_URL: &str = "https://api.stripe.com/v1/checkout/sessions";

/// Errors from creating a checkout session.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Cart is empty or invalid format")]
    InvalidCart,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stripe returned {status}: {body}")]
    Provider { status: u16, body: String },
}

/// Product fields the storefront sends with each cart line.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutProduct {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// A line of the cart being paid for.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutItem {
    pub product: CheckoutProduct,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    url: String,
}

/// Creates hosted checkout sessions.
#[derive(Clone)]
pub struct PaymentService {
    client: reqwest::Client,
    config: StripeConfig,
    frontend_url: String,
}

impl PaymentService {
    #[must_use]
    pub const fn new(client: reqwest::Client, config: StripeConfig, frontend_url: String) -> Self {
        Self {
            client,
            config,
            frontend_url,
        }
    }

    /// Create a checkout session and return the URL to redirect to.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidCart` for an empty or malformed cart, or
    /// a provider error if Stripe rejects the request.
    #[instrument(skip(self, items), fields(lines = items.len()))]
    pub async fn create_checkout_session(&self, items: &[CheckoutItem]) -> Result<String, PaymentError> {
        let form = checkout_form(items, &self.frontend_url)?;

        let response = self
            .client
            .post(STRIPE_CHECKOUT_URL)
            .bearer_auth(self.config.secret_key.expose_secret())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Provider {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<SessionResponse>().await?.url)
    }
}

/// Amount in cents, rejecting negative or unrepresentable prices.
fn to_cents(price: Decimal) -> Option<i64> {
    if price.is_sign_negative() {
        return None;
    }
    (round_cents(price) * Decimal::ONE_HUNDRED).to_i64()
}

/// Stripe's bracketed form encoding of a checkout session.
fn checkout_form(items: &[CheckoutItem], frontend_url: &str) -> Result<Vec<(String, String)>, PaymentError> {
    if items.is_empty() {
        return Err(PaymentError::InvalidCart);
    }

    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("success_url".to_string(), format!("{frontend_url}/success")),
        ("cancel_url".to_string(), format!("{frontend_url}/cancel")),
    ];

    for (i, item) in items.iter().enumerate() {
        if item.quantity == 0 {
            return Err(PaymentError::InvalidCart);
        }
        let cents = to_cents(item.product.price).ok_or(PaymentError::InvalidCart)?;
        let name = item
            .product
            .brand
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or("Product");
        let prefix = format!("line_items[{i}]");
        form.push((format!("{prefix}[price_data][currency]"), "usd".to_string()));
        form.push((format!("{prefix}[price_data][product_data][name]"), name.to_string()));
        form.push((format!("{prefix}[price_data][unit_amount]"), cents.to_string()));
        form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(brand: Option<&str>, price: Decimal, quantity: u32) -> CheckoutItem {
        CheckoutItem {
            product: CheckoutProduct {
                brand: brand.map(str::to_string),
                price,
            },
            quantity,
        }
    }

    fn value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_checkout_form_encodes_lines_in_cents() {
        let form = checkout_form(
            &[
                item(Some("Lenovo"), Decimal::new(129_999, 2), 1),
                item(None, Decimal::new(1995, 3), 2),
            ],
            "https://shop.example",
        )
        .expect("form");

        assert_eq!(value(&form, "line_items[0][price_data][unit_amount]"), Some("129999"));
        assert_eq!(value(&form, "line_items[0][price_data][product_data][name]"), Some("Lenovo"));
        // 1.995 rounds half away from zero to 2.00
        assert_eq!(value(&form, "line_items[1][price_data][unit_amount]"), Some("200"));
        assert_eq!(value(&form, "line_items[1][price_data][product_data][name]"), Some("Product"));
        assert_eq!(value(&form, "line_items[1][quantity]"), Some("2"));
        assert_eq!(value(&form, "success_url"), Some("https://shop.example/success"));
    }

    #[test]
    fn test_checkout_form_rejects_invalid_carts() {
        assert!(matches!(checkout_form(&[], "x"), Err(PaymentError::InvalidCart)));
        assert!(matches!(
            checkout_form(&[item(None, Decimal::ONE, 0)], "x"),
            Err(PaymentError::InvalidCart)
        ));
        assert!(matches!(
            checkout_form(&[item(None, Decimal::NEGATIVE_ONE, 1)], "x"),
            Err(PaymentError::InvalidCart)
        ));
    }

    #[test]
    fn test_checkout_item_deserializes_storefront_shape() {
        let items: Vec<CheckoutItem> = serde_json::from_str(
            r#"[{"product": {"brand": "Dell", "price": 499.5, "name": "XPS"}, "quantity": 1}]"#,
        )
        .expect("deserialize");
        assert_eq!(items[0].product.price, Decimal::new(4995, 1));
    }
}
