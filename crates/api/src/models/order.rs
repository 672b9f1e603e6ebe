//! Cart, order and coupon domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bazaar_core::{CartItemId, CouponId, Email, OrderId, OrderStatus, ProductId, UserId};

use super::product::ProductView;

/// Prefix of every public tracking identifier.
pub const TRACKING_ID_PREFIX: &str = "ORD-";

/// Payment method assumed when the client sends none.
pub const DEFAULT_PAYMENT_METHOD: &str = "Cash on Delivery";

/// A cart line with its product embedded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(rename = "_id")]
    pub id: CartItemId,
    #[serde(rename = "user")]
    pub user_id: UserId,
    pub quantity: i32,
    pub product: ProductView,
}

/// Where an order ships to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Name of the first required field that is blank, if any.
    #[must_use]
    pub fn first_missing_field(&self) -> Option<&'static str> {
        [
            ("fullName", &self.full_name),
            ("phone", &self.phone),
            ("street", &self.street),
            ("city", &self.city),
            ("postalCode", &self.postal_code),
            ("country", &self.country),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }

    /// Single-line rendering for emails and invoices.
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.street.as_str(), self.city.as_str()];
        if let Some(state) = self.state.as_deref().filter(|s| !s.is_empty()) {
            parts.push(state);
        }
        parts.push(self.postal_code.as_str());
        parts.push(self.country.as_str());
        parts.join(", ")
    }
}

/// A line of a placed order, with the name and price captured at purchase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// `None` once the product has been deleted from the catalog.
    pub product_id: Option<ProductId>,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A placed order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(rename = "user")]
    pub user_id: UserId,
    #[serde(rename = "products")]
    pub items: Vec<OrderItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub payment_method: String,
    pub tracking_id: String,
    pub status: OrderStatus,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub status_updated_at: Option<DateTime<Utc>>,
    pub shipping_address: ShippingAddress,
    pub hidden_for_user: bool,
    pub coupon_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Whether this order is paid on delivery rather than up front.
    #[must_use]
    pub fn is_cash_on_delivery(&self) -> bool {
        self.payment_method.eq_ignore_ascii_case(DEFAULT_PAYMENT_METHOD)
            || self.payment_method.eq_ignore_ascii_case("cod")
    }
}

/// Customer summary attached to orders in the admin list.
#[derive(Debug, Clone, Serialize)]
pub struct OrderCustomer {
    pub username: String,
    pub email: Option<Email>,
}

/// An order as shown to admins.
#[derive(Debug, Clone, Serialize)]
pub struct AdminOrder {
    #[serde(flatten)]
    pub order: Order,
    pub customer: Option<OrderCustomer>,
}

/// Public tracking view of an order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingInfo {
    pub tracking_id: String,
    pub status: OrderStatus,
    pub current_step: i32,
    pub steps: [OrderStatus; 4],
    pub created_at: DateTime<Utc>,
    pub estimated_delivery: Option<String>,
}

impl From<&Order> for TrackingInfo {
    fn from(order: &Order) -> Self {
        Self {
            tracking_id: order.tracking_id.clone(),
            status: order.status,
            current_step: order.status.tracking_step(),
            steps: bazaar_core::TRACKING_STEPS,
            created_at: order.created_at,
            estimated_delivery: order.status.estimated_delivery(order.created_at),
        }
    }
}

/// One bar of the admin orders chart.
#[derive(Debug, Clone, Serialize)]
pub struct DailyOrders {
    pub name: String,
    pub orders: i64,
}

/// A discount coupon.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    #[serde(rename = "_id")]
    pub id: CouponId,
    pub code: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub times_used: i64,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    #[must_use]
    pub const fn terms(&self) -> bazaar_core::CouponTerms {
        bazaar_core::CouponTerms {
            discount: self.discount,
            expires_at: self.expires_at,
            usage_limit: self.usage_limit,
            times_used: self.times_used,
        }
    }
}

/// Generate a fresh tracking identifier, e.g. `ORD-3FA2C91B`.
#[must_use]
pub fn generate_tracking_id() -> String {
    let bytes: [u8; 4] = rand::random();
    format!("{TRACKING_ID_PREFIX}{}", hex::encode_upper(bytes))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Lovelace".to_string(),
            phone: "+44 20 7946 0000".to_string(),
            street: "12 St James's Square".to_string(),
            city: "London".to_string(),
            state: None,
            postal_code: "SW1Y 4JH".to_string(),
            country: "UK".to_string(),
        }
    }

    fn order(status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(1042),
            user_id: UserId::new(1),
            items: vec![OrderItem {
                product_id: Some(ProductId::new(3)),
                name: "Aero 14".to_string(),
                unit_price: Decimal::new(1080_00, 2),
                quantity: 2,
            }],
            total: Decimal::new(2160_00, 2),
            payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
            tracking_id: "ORD-0A1B2C3D".to_string(),
            status,
            cancelled_at: None,
            status_updated_at: None,
            shipping_address: address(),
            hidden_for_user: false,
            coupon_code: None,
            created_at: Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_tracking_id_format() {
        let id = generate_tracking_id();
        assert!(id.starts_with("ORD-"));
        let suffix = &id[4..];
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_tracking_info_shape() {
        let value = serde_json::to_value(TrackingInfo::from(&order(OrderStatus::Shipped))).unwrap();
        assert_eq!(value["trackingId"], "ORD-0A1B2C3D");
        assert_eq!(value["status"], "Shipped");
        assert_eq!(value["currentStep"], 2);
        assert_eq!(
            value["steps"],
            serde_json::json!(["Placed", "Processing", "Shipped", "Delivered"])
        );
        assert_eq!(value["estimatedDelivery"], "Jun 13, 2025");
    }

    #[test]
    fn test_tracking_info_cancelled_and_delivered() {
        let cancelled = TrackingInfo::from(&order(OrderStatus::Cancelled));
        assert_eq!(cancelled.current_step, -1);
        let delivered = TrackingInfo::from(&order(OrderStatus::Delivered));
        assert_eq!(delivered.estimated_delivery, None);
    }

    #[test]
    fn test_shipping_address_validation() {
        assert_eq!(address().first_missing_field(), None);
        let blank_city = ShippingAddress {
            city: "  ".to_string(),
            ..address()
        };
        assert_eq!(blank_city.first_missing_field(), Some("city"));
        assert_eq!(
            address().one_line(),
            "12 St James's Square, London, SW1Y 4JH, UK"
        );
    }

    #[test]
    fn test_cash_on_delivery_detection() {
        assert!(order(OrderStatus::Placed).is_cash_on_delivery());
        let card = Order {
            payment_method: "Card".to_string(),
            ..order(OrderStatus::Placed)
        };
        assert!(!card.is_cash_on_delivery());
    }
}
