//! Shopping cart repository.

use sqlx::PgPool;
use thiserror::Error;

use bazaar_core::{CartItemId, ProductId, UserId};

use super::RepositoryError;
use super::products::{PRODUCT_COLUMNS, ProductRow};
use crate::models::{CartItem, Product, ProductView};

/// Why a cart line could not be added.
#[derive(Debug, Error)]
pub enum CartUpsertError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Product is out of stock")]
    OutOfStock,

    /// The requested total exceeds what is on hand.
    #[error("Only {0} items available")]
    InsufficientStock(i32),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CartUpsertError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    cart_id: i32,
    cart_user_id: i32,
    cart_quantity: i32,
    #[sqlx(flatten)]
    product: ProductRow,
}

impl From<CartRow> for CartItem {
    fn from(row: CartRow) -> Self {
        Self {
            id: CartItemId::new(row.cart_id),
            user_id: UserId::new(row.cart_user_id),
            quantity: row.cart_quantity,
            product: ProductView::from(Product::from(row.product)),
        }
    }
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add `quantity` units of a product to the user's cart, merging with an
    /// existing line. The combined quantity may not exceed stock.
    ///
    /// # Errors
    ///
    /// Returns the matching `CartUpsertError` when the product is unknown or
    /// there is not enough stock.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartItem, CartUpsertError> {
        let mut tx = self.pool.begin().await?;

        let stock = sqlx::query_scalar::<_, i32>(
            "SELECT quantity FROM bazaar.product WHERE id = $1 FOR SHARE",
        )
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CartUpsertError::ProductNotFound)?;

        if stock <= 0 {
            return Err(CartUpsertError::OutOfStock);
        }

        let existing = sqlx::query_scalar::<_, i32>(
            "SELECT quantity FROM bazaar.cart_item WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?
        .unwrap_or(0);

        if existing.saturating_add(quantity) > stock {
            return Err(CartUpsertError::InsufficientStock(stock));
        }

        let cart_id = sqlx::query_scalar::<_, i32>(
            r"
            INSERT INTO bazaar.cart_item (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = bazaar.cart_item.quantity + EXCLUDED.quantity
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get(CartItemId::new(cart_id))
            .await?
            .ok_or(CartUpsertError::Repository(RepositoryError::NotFound))
    }

    /// The user's cart, oldest line first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let sql = format!(
            "SELECT c.id AS cart_id, c.user_id AS cart_user_id, c.quantity AS cart_quantity, \
                    {PRODUCT_COLUMNS} \
             FROM bazaar.cart_item c \
             JOIN bazaar.product p ON p.id = c.product_id \
             WHERE c.user_id = $1 \
             ORDER BY c.created_at"
        );
        let rows = sqlx::query_as::<_, CartRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(CartItem::from).collect())
    }

    /// Get a single cart line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CartItemId) -> Result<Option<CartItem>, RepositoryError> {
        let sql = format!(
            "SELECT c.id AS cart_id, c.user_id AS cart_user_id, c.quantity AS cart_quantity, \
                    {PRODUCT_COLUMNS} \
             FROM bazaar.cart_item c \
             JOIN bazaar.product p ON p.id = c.product_id \
             WHERE c.id = $1"
        );
        let row = sqlx::query_as::<_, CartRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(CartItem::from))
    }

    /// Owner of a cart line, if the line exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn owner(&self, id: CartItemId) -> Result<Option<UserId>, RepositoryError> {
        let owner = sqlx::query_scalar::<_, UserId>(
            "SELECT user_id FROM bazaar.cart_item WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(owner)
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line does not exist.
    pub async fn delete(&self, id: CartItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM bazaar.cart_item WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
