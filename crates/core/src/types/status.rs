//! Status enums for orders and articles.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Serialized with the same capitalized names the storefront displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "bazaar.order_status", rename_all = "PascalCase")
)]
pub enum OrderStatus {
    #[default]
    Placed,
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

/// Stages shown on the public order-tracking page, in order.
pub const TRACKING_STEPS: [OrderStatus; 4] = [
    OrderStatus::Placed,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
];

/// Days added to the order date for the delivery estimate.
pub const ESTIMATED_DELIVERY_DAYS: i64 = 3;

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Placed,
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Display name, identical to the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Placed => "Placed",
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Position of this status in [`TRACKING_STEPS`], or `-1` when the
    /// status is not a tracking stage (`Pending`, `Cancelled`).
    #[must_use]
    pub fn tracking_step(self) -> i32 {
        TRACKING_STEPS
            .iter()
            .position(|s| *s == self)
            .and_then(|i| i32::try_from(i).ok())
            .unwrap_or(-1)
    }

    /// Whether an admin may delete an order in this status.
    #[must_use]
    pub const fn is_deletable(self) -> bool {
        matches!(self, Self::Cancelled | Self::Delivered)
    }

    /// Whether a customer may hide an order in this status from their history.
    #[must_use]
    pub const fn is_hideable(self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Delivery estimate shown on the tracking page, formatted like
    /// `Mar 04, 2025`. `None` once the order has been delivered.
    #[must_use]
    pub fn estimated_delivery(self, placed_at: DateTime<Utc>) -> Option<String> {
        if self == Self::Delivered {
            return None;
        }
        let eta = placed_at + Duration::days(ESTIMATED_DELIVERY_DAYS);
        Some(eta.format("%b %d, %Y").to_string())
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl std::str::FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_owned()))
    }
}

/// Blog article category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "bazaar.article_category"))]
pub enum ArticleCategory {
    #[default]
    Laptops,
    #[serde(rename = "Tech News")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "Tech News"))]
    TechNews,
    #[serde(rename = "Buying Guide")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "Buying Guide"))]
    BuyingGuide,
    Reviews,
}

impl ArticleCategory {
    /// Display name, identical to the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Laptops => "Laptops",
            Self::TechNews => "Tech News",
            Self::BuyingGuide => "Buying Guide",
            Self::Reviews => "Reviews",
        }
    }
}

impl std::str::FromStr for ArticleCategory {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Laptops, Self::TechNews, Self::BuyingGuide, Self::Reviews]
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_owned()))
    }
}

/// Blog article publication status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "bazaar.article_status", rename_all = "lowercase")
)]
pub enum ArticleStatus {
    Draft,
    #[default]
    Published,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_tracking_step_positions() {
        assert_eq!(OrderStatus::Placed.tracking_step(), 0);
        assert_eq!(OrderStatus::Processing.tracking_step(), 1);
        assert_eq!(OrderStatus::Shipped.tracking_step(), 2);
        assert_eq!(OrderStatus::Delivered.tracking_step(), 3);
        assert_eq!(OrderStatus::Pending.tracking_step(), -1);
        assert_eq!(OrderStatus::Cancelled.tracking_step(), -1);
    }

    #[test]
    fn test_estimated_delivery() {
        let placed = Utc.with_ymd_and_hms(2025, 3, 1, 18, 30, 0).unwrap();
        assert_eq!(
            OrderStatus::Shipped.estimated_delivery(placed).as_deref(),
            Some("Mar 04, 2025")
        );
        assert_eq!(OrderStatus::Delivered.estimated_delivery(placed), None);
    }

    #[test]
    fn test_estimated_delivery_crosses_year() {
        let placed = Utc.with_ymd_and_hms(2024, 12, 30, 0, 0, 0).unwrap();
        assert_eq!(
            OrderStatus::Placed.estimated_delivery(placed).as_deref(),
            Some("Jan 02, 2025")
        );
    }

    #[test]
    fn test_parse_status() {
        assert_eq!("Shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!("shipped".parse::<OrderStatus>().is_err());
        assert!("Lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_delete_and_hide_rules() {
        assert!(OrderStatus::Cancelled.is_deletable());
        assert!(OrderStatus::Delivered.is_deletable());
        assert!(!OrderStatus::Shipped.is_deletable());
        assert!(OrderStatus::Cancelled.is_hideable());
        assert!(!OrderStatus::Delivered.is_hideable());
    }

    #[test]
    fn test_article_category_serde() {
        let json = serde_json::to_string(&ArticleCategory::TechNews).unwrap();
        assert_eq!(json, "\"Tech News\"");
        let back: ArticleCategory = serde_json::from_str("\"Buying Guide\"").unwrap();
        assert_eq!(back, ArticleCategory::BuyingGuide);
        assert_eq!(
            serde_json::to_string(&ArticleStatus::Draft).unwrap(),
            "\"draft\""
        );
    }
}
