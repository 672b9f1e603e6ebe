//! Product and wishlist repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use bazaar_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::{Product, ProductDraft, ProductView, TopProduct};

pub(crate) const PRODUCT_COLUMNS: &str = "p.id, p.name, p.brand, p.description, p.price, \
     p.category, p.image, p.images, p.processor, p.ram, p.storage, p.display, p.offer_message, \
     p.on_sale, p.quantity, p.discount_percentage, p.discount_price, p.rating, p.num_reviews, \
     p.created_at, p.updated_at";

/// Number of products on the home page teaser.
const LIMITED_COUNT: i64 = 8;
/// Number of best sellers.
const TOP_PRODUCTS_COUNT: i64 = 3;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: i32,
    name: String,
    brand: String,
    description: String,
    price: Decimal,
    category: String,
    image: Option<String>,
    images: Vec<String>,
    processor: Option<String>,
    ram: Option<String>,
    storage: Option<String>,
    display: Option<String>,
    offer_message: Option<String>,
    on_sale: bool,
    quantity: i32,
    discount_percentage: Decimal,
    discount_price: Option<Decimal>,
    rating: Decimal,
    num_reviews: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            brand: row.brand,
            description: row.description,
            price: row.price,
            category: row.category,
            image: row.image,
            images: row.images,
            processor: row.processor,
            ram: row.ram,
            storage: row.storage,
            display: row.display,
            offer_message: row.offer_message,
            on_sale: row.on_sale,
            quantity: row.quantity,
            discount_percentage: row.discount_percentage,
            discount_price: row.discount_price,
            rating: row.rating,
            num_reviews: row.num_reviews,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TopProductRow {
    #[sqlx(flatten)]
    product: ProductRow,
    total_sold: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_list(&self, tail: &str, limit: Option<i64>) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM bazaar.product p {tail}");
        let mut query = sqlx::query_as::<_, ProductRow>(&sql);
        if let Some(limit) = limit {
            query = query.bind(limit);
        }
        let rows = query.fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// All products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        self.fetch_list("ORDER BY p.created_at DESC", None).await
    }

    /// The first products in catalog order, for the home page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn limited(&self) -> Result<Vec<Product>, RepositoryError> {
        self.fetch_list("ORDER BY p.id LIMIT $1", Some(LIMITED_COUNT))
            .await
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM bazaar.product p WHERE p.id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Product::from))
    }

    /// The product with the largest percentage discount, if any is discounted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn highest_discount(&self) -> Result<Option<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM bazaar.product p \
             WHERE p.discount_percentage > 0 \
             ORDER BY p.discount_percentage DESC, p.created_at DESC \
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Product::from))
    }

    /// Best sellers by units ordered across all orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_products(&self) -> Result<Vec<TopProduct>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS}, SUM(oi.quantity)::BIGINT AS total_sold \
             FROM bazaar.order_item oi \
             JOIN bazaar.product p ON p.id = oi.product_id \
             GROUP BY p.id \
             ORDER BY total_sold DESC \
             LIMIT $1"
        );
        let rows = sqlx::query_as::<_, TopProductRow>(&sql)
            .bind(TOP_PRODUCTS_COUNT)
            .fetch_all(self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| TopProduct {
                total_sold: row.total_sold,
                product: ProductView::from(Product::from(row.product)),
            })
            .collect())
    }

    /// In-stock products whose name or brand contains any of `keywords`
    /// (case-insensitive). With no keywords, any in-stock products.
    ///
    /// Keywords must already be stripped of `LIKE` metacharacters.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search_in_stock(
        &self,
        keywords: &[String],
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let patterns: Vec<String> = keywords.iter().map(|k| format!("%{k}%")).collect();
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM bazaar.product p \
             WHERE p.quantity > 0 \
               AND (cardinality($1::TEXT[]) = 0 \
                    OR p.name ILIKE ANY($1) OR p.brand ILIKE ANY($1)) \
             ORDER BY p.created_at DESC \
             LIMIT $2"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&patterns)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Insert a product. `name` and `price` must be present on the draft.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if required fields are missing.
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        let (Some(name), Some(price)) = (draft.name.as_deref(), draft.price) else {
            return Err(RepositoryError::DataCorruption(
                "product requires a name and a price".to_string(),
            ));
        };
        let sql = format!(
            "INSERT INTO bazaar.product AS p \
                 (name, brand, description, price, category, image, images, processor, ram, \
                  storage, display, offer_message, on_sale, quantity, discount_percentage, \
                  discount_price) \
             VALUES ($1, COALESCE($2, ''), COALESCE($3, ''), $4, COALESCE($5, ''), $6, $7, $8, \
                     $9, $10, $11, $12, COALESCE($13, FALSE), COALESCE($14, 0), \
                     COALESCE($15, 0), $16) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(name)
            .bind(draft.brand.as_deref())
            .bind(draft.description.as_deref())
            .bind(price)
            .bind(draft.category.as_deref())
            .bind(draft.images.first())
            .bind(&draft.images)
            .bind(draft.processor.as_deref())
            .bind(draft.ram.as_deref())
            .bind(draft.storage.as_deref())
            .bind(draft.display.as_deref())
            .bind(draft.offer_message.as_deref())
            .bind(draft.on_sale)
            .bind(draft.quantity.map(|q| q.max(0)))
            .bind(draft.discount_percentage)
            .bind(draft.discount_price)
            .fetch_one(self.pool)
            .await?;
        Ok(row.into())
    }

    /// Apply the fields present on `draft`. New images replace the image list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn update(&self, id: ProductId, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        let new_images = (!draft.images.is_empty()).then_some(&draft.images);
        let sql = format!(
            "UPDATE bazaar.product AS p SET \
                 name = COALESCE($2, p.name), \
                 brand = COALESCE($3, p.brand), \
                 description = COALESCE($4, p.description), \
                 price = COALESCE($5, p.price), \
                 category = COALESCE($6, p.category), \
                 processor = COALESCE($7, p.processor), \
                 ram = COALESCE($8, p.ram), \
                 storage = COALESCE($9, p.storage), \
                 display = COALESCE($10, p.display), \
                 offer_message = COALESCE($11, p.offer_message), \
                 on_sale = COALESCE($12, p.on_sale), \
                 quantity = COALESCE($13, p.quantity), \
                 discount_percentage = COALESCE($14, p.discount_percentage), \
                 discount_price = COALESCE($15, p.discount_price), \
                 images = COALESCE($16, p.images), \
                 image = COALESCE(($16::TEXT[])[1], p.image), \
                 updated_at = NOW() \
             WHERE p.id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(draft.name.as_deref())
            .bind(draft.brand.as_deref())
            .bind(draft.description.as_deref())
            .bind(draft.price)
            .bind(draft.category.as_deref())
            .bind(draft.processor.as_deref())
            .bind(draft.ram.as_deref())
            .bind(draft.storage.as_deref())
            .bind(draft.display.as_deref())
            .bind(draft.offer_message.as_deref())
            .bind(draft.on_sale)
            .bind(draft.quantity.map(|q| q.max(0)))
            .bind(draft.discount_percentage)
            .bind(draft.discount_price)
            .bind(new_images)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok(row.into())
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM bazaar.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// Add the product to the user's wishlist, or remove it if present.
    ///
    /// Returns whether the product is in the wishlist afterwards.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn toggle_wishlist(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let removed = sqlx::query(
            "DELETE FROM bazaar.wishlist_item WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await?
        .rows_affected();
        if removed > 0 {
            return Ok(false);
        }
        sqlx::query(
            "INSERT INTO bazaar.wishlist_item (user_id, product_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;
        Ok(true)
    }

    /// IDs of the products on the user's wishlist, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn wishlist_ids(&self, user_id: UserId) -> Result<Vec<ProductId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, ProductId>(
            "SELECT product_id FROM bazaar.wishlist_item WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(ids)
    }

    /// The products on the user's wishlist, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn wishlist(&self, user_id: UserId) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM bazaar.wishlist_item w \
             JOIN bazaar.product p ON p.id = w.product_id \
             WHERE w.user_id = $1 \
             ORDER BY w.created_at"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }
}
