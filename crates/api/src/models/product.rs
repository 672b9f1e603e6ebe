//! Catalog domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bazaar_core::pricing::final_price;
use bazaar_core::{ProductId, ReviewId, UserId};

/// A product in the catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub category: String,
    pub image: Option<String>,
    pub images: Vec<String>,
    pub processor: Option<String>,
    pub ram: Option<String>,
    pub storage: Option<String>,
    pub display: Option<String>,
    pub offer_message: Option<String>,
    pub on_sale: bool,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_percentage: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub discount_price: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float")]
    pub rating: Decimal,
    pub num_reviews: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Unit price after any discount.
    #[must_use]
    pub fn final_price(&self) -> Decimal {
        final_price(self.price, self.discount_percentage, self.discount_price)
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

/// Product as returned by the API, with the derived final price.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    #[serde(with = "rust_decimal::serde::float")]
    pub final_price: Decimal,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        let final_price = product.final_price();
        Self {
            product,
            final_price,
        }
    }
}

/// Fields accepted when creating or updating a product.
///
/// Every field is optional so the same type serves partial updates; creation
/// checks the required ones.
#[derive(Debug, Clone, Default)]
pub struct ProductDraft {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub processor: Option<String>,
    pub ram: Option<String>,
    pub storage: Option<String>,
    pub display: Option<String>,
    pub offer_message: Option<String>,
    pub on_sale: Option<bool>,
    pub quantity: Option<i32>,
    pub discount_percentage: Option<Decimal>,
    pub discount_price: Option<Decimal>,
    /// Uploaded image URLs; replaces the whole list when non-empty.
    pub images: Vec<String>,
}

/// Best seller entry on the home page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub total_sold: i64,
    pub product: ProductView,
}

/// A customer review of a product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: ReviewId,
    pub product_id: ProductId,
    #[serde(rename = "user")]
    pub user_id: UserId,
    pub name: String,
    pub rating: i16,
    pub comment: String,
    pub user_image: Option<String>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
}

/// A review flattened with its product for the testimonials wall.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    #[serde(flatten)]
    pub review: Review,
    pub product_name: String,
    pub product_category: String,
}

/// Testimonial ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestimonialSort {
    /// Highest rating first, newest first among equals.
    #[default]
    Top,
    /// Newest first.
    Latest,
    /// Lowest rating first.
    Low,
}

impl TestimonialSort {
    /// SQL `ORDER BY` clause for this ordering.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Top => "r.rating DESC, r.created_at DESC",
            Self::Latest => "r.created_at DESC",
            Self::Low => "r.rating ASC, r.created_at DESC",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn laptop() -> Product {
        Product {
            id: ProductId::new(3),
            name: "Aero 14".to_string(),
            brand: "Gigabyte".to_string(),
            description: "Thin and light".to_string(),
            price: Decimal::new(1200_00, 2),
            category: "Laptops".to_string(),
            image: Some("https://img.test/aero.jpg".to_string()),
            images: vec!["https://img.test/aero.jpg".to_string()],
            processor: Some("i7-13700H".to_string()),
            ram: Some("16GB".to_string()),
            storage: Some("1TB".to_string()),
            display: None,
            offer_message: None,
            on_sale: true,
            quantity: 4,
            discount_percentage: Decimal::new(10, 0),
            discount_price: None,
            rating: Decimal::new(45, 1),
            num_reviews: 2,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_product_view_has_numeric_prices() {
        let value = serde_json::to_value(ProductView::from(laptop())).unwrap();
        assert_eq!(value["_id"], 3);
        assert_eq!(value["price"], 1200.0);
        assert_eq!(value["finalPrice"], 1080.0);
        assert!(value["discountPrice"].is_null());
        assert_eq!(value["numReviews"], 2);
    }

    #[test]
    fn test_testimonial_sort_parse() {
        let sort: TestimonialSort = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(sort, TestimonialSort::Low);
        assert_eq!(TestimonialSort::default().order_by(), "r.rating DESC, r.created_at DESC");
    }
}
