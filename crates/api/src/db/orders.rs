//! Order repository.
//!
//! Placement is the only multi-statement write in the shop: stock is
//! decremented with a conditional `UPDATE` per line inside one transaction,
//! so a concurrent order can never drive a product's quantity below zero.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;

use bazaar_core::pricing::{apply_coupon, final_price, round_cents};
use bazaar_core::{CouponRejection, Email, OrderId, OrderStatus, ProductId, UserId, normalize_code};

use super::RepositoryError;
use super::coupons::find_for_update;
use crate::models::order::generate_tracking_id;
use crate::models::{AdminOrder, DailyOrders, Order, OrderCustomer, OrderItem, ShippingAddress};

const ORDER_COLUMNS: &str = "o.id, o.user_id, o.total, o.payment_method, o.tracking_id, o.status, \
     o.cancelled_at, o.status_updated_at, o.full_name, o.phone, o.street, o.city, o.state, \
     o.postal_code, o.country, o.hidden_for_user, o.coupon_code, o.created_at";

/// Longest window accepted by [`OrderRepository::daily_stats`].
pub const MAX_STATS_RANGE_DAYS: i32 = 365;

// =============================================================================
// Placement Types
// =============================================================================

/// One requested line of a new order.
#[derive(Debug, Clone, Copy)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Everything needed to place an order.
#[derive(Debug)]
pub struct NewOrder<'a> {
    pub user_id: UserId,
    pub lines: &'a [OrderLine],
    pub payment_method: &'a str,
    pub shipping_address: &'a ShippingAddress,
    pub coupon_code: Option<&'a str>,
}

/// Why an order could not be placed. Nothing is persisted in any case.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    #[error("Product not found")]
    UnknownProduct(ProductId),

    #[error("{0} is out of stock")]
    OutOfStock(String),

    #[error(transparent)]
    Coupon(CouponRejection),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for PlaceOrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    total: Decimal,
    payment_method: String,
    tracking_id: String,
    status: OrderStatus,
    cancelled_at: Option<DateTime<Utc>>,
    status_updated_at: Option<DateTime<Utc>>,
    full_name: String,
    phone: String,
    street: String,
    city: String,
    state: Option<String>,
    postal_code: String,
    country: String,
    hidden_for_user: bool,
    coupon_code: Option<String>,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: OrderId::new(self.id),
            user_id: UserId::new(self.user_id),
            items,
            total: self.total,
            payment_method: self.payment_method,
            tracking_id: self.tracking_id,
            status: self.status,
            cancelled_at: self.cancelled_at,
            status_updated_at: self.status_updated_at,
            shipping_address: ShippingAddress {
                full_name: self.full_name,
                phone: self.phone,
                street: self.street,
                city: self.city,
                state: self.state,
                postal_code: self.postal_code,
                country: self.country,
            },
            hidden_for_user: self.hidden_for_user,
            coupon_code: self.coupon_code,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AdminOrderRow {
    #[sqlx(flatten)]
    order: OrderRow,
    customer_username: Option<String>,
    customer_email: Option<Email>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: i32,
    product_id: Option<i32>,
    product_name: String,
    unit_price: Decimal,
    quantity: i32,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            product_id: row.product_id.map(ProductId::new),
            name: row.product_name,
            unit_price: row.unit_price,
            quantity: row.quantity,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReservedProduct {
    name: String,
    price: Decimal,
    discount_percentage: Decimal,
    discount_price: Option<Decimal>,
}

#[derive(Debug, sqlx::FromRow)]
struct DailyRow {
    day: NaiveDate,
    orders: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order.
    ///
    /// Reserves stock for every line, prices the lines from the current
    /// catalog, applies and records the coupon, stores the order with its
    /// items and empties the customer's cart, all in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `PlaceOrderError` if a product is unknown or short on stock,
    /// the coupon is rejected, or the database fails.
    pub async fn place(&self, new: &NewOrder<'_>) -> Result<Order, PlaceOrderError> {
        let mut tx = self.pool.begin().await?;

        let mut items = Vec::with_capacity(new.lines.len());
        for line in new.lines {
            let product = reserve_stock(&mut tx, *line).await?;
            items.push(OrderItem {
                product_id: Some(line.product_id),
                unit_price: final_price(
                    product.price,
                    product.discount_percentage,
                    product.discount_price,
                ),
                name: product.name,
                quantity: line.quantity,
            });
        }

        let subtotal = round_cents(items.iter().map(OrderItem::line_total).sum());
        let (total, coupon_code) = match new.coupon_code.map(normalize_code) {
            Some(code) if !code.is_empty() => {
                let fraction = redeem_coupon(&mut tx, &code, new.user_id).await?;
                (apply_coupon(subtotal, fraction), Some(code))
            }
            _ => (subtotal, None),
        };

        let address = new.shipping_address;
        let sql = format!(
            "INSERT INTO bazaar.customer_order AS o \
                 (user_id, total, payment_method, tracking_id, full_name, phone, street, city, \
                  state, postal_code, country, coupon_code) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(new.user_id)
            .bind(total)
            .bind(new.payment_method)
            .bind(generate_tracking_id())
            .bind(&address.full_name)
            .bind(&address.phone)
            .bind(&address.street)
            .bind(&address.city)
            .bind(address.state.as_deref())
            .bind(&address.postal_code)
            .bind(&address.country)
            .bind(coupon_code.as_deref())
            .fetch_one(&mut *tx)
            .await?;

        for item in &items {
            sqlx::query(
                r"
                INSERT INTO bazaar.order_item (order_id, product_id, product_name, unit_price, quantity)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(row.id)
            .bind(item.product_id)
            .bind(&item.name)
            .bind(item.unit_price)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM bazaar.cart_item WHERE user_id = $1")
            .bind(new.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(row.into_order(items))
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM bazaar.customer_order o WHERE o.id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        match row {
            Some(row) => Ok(self.attach_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Look up an order by its public tracking ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_tracking_id(&self, tracking_id: &str) -> Result<Option<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM bazaar.customer_order o WHERE o.tracking_id = $1"
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(tracking_id.trim().to_uppercase())
            .fetch_optional(self.pool)
            .await?;
        match row {
            Some(row) => Ok(self.attach_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// The user's visible orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM bazaar.customer_order o \
             WHERE o.user_id = $1 AND NOT o.hidden_for_user \
             ORDER BY o.created_at DESC"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;
        self.attach_items(rows).await
    }

    /// Every order with its customer, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_admin(&self) -> Result<Vec<AdminOrder>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS}, u.username AS customer_username, u.email AS customer_email \
             FROM bazaar.customer_order o \
             LEFT JOIN bazaar.user u ON u.id = o.user_id \
             ORDER BY o.created_at DESC"
        );
        let rows = sqlx::query_as::<_, AdminOrderRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        let mut customers = Vec::with_capacity(rows.len());
        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            customers.push(row.customer_username.map(|username| OrderCustomer {
                username,
                email: row.customer_email,
            }));
            orders.push(row.order);
        }

        let orders = self.attach_items(orders).await?;
        Ok(orders
            .into_iter()
            .zip(customers)
            .map(|(order, customer)| AdminOrder { order, customer })
            .collect())
    }

    /// Mark an order cancelled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn cancel(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE bazaar.customer_order
            SET status = 'Cancelled', cancelled_at = NOW(), status_updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Hide an order from the customer's history.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn hide_for_user(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE bazaar.customer_order SET hidden_for_user = TRUE WHERE id = $1")
                .bind(id)
                .execute(self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Set an order's status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, RepositoryError> {
        let sql = format!(
            "UPDATE bazaar.customer_order AS o SET \
                 status = $2, \
                 status_updated_at = NOW(), \
                 cancelled_at = CASE WHEN $2 = 'Cancelled'::bazaar.order_status \
                                     THEN COALESCE(o.cancelled_at, NOW()) ELSE o.cancelled_at END \
             WHERE o.id = $1 \
             RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(status)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        self.attach_items(vec![row])
            .await?
            .pop()
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete an order and its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM bazaar.customer_order WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Orders per calendar day over the last `range_days` days, oldest first,
    /// including days without orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn daily_stats(&self, range_days: i32) -> Result<Vec<DailyOrders>, RepositoryError> {
        let range_days = range_days.clamp(1, MAX_STATS_RANGE_DAYS);
        let rows = sqlx::query_as::<_, DailyRow>(
            r"
            SELECT d.day::DATE AS day, COUNT(o.id) AS orders
            FROM generate_series(CURRENT_DATE - ($1 - 1), CURRENT_DATE, INTERVAL '1 day') AS d(day)
            LEFT JOIN bazaar.customer_order o ON o.created_at::DATE = d.day::DATE
            GROUP BY d.day
            ORDER BY d.day
            ",
        )
        .bind(range_days)
        .fetch_all(self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| DailyOrders {
                name: day_label(row.day),
                orders: row.orders,
            })
            .collect())
    }

    /// Load the items of `rows` with one query and assemble orders, keeping
    /// the order of `rows`.
    async fn attach_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT order_id, product_id, product_name, unit_price, quantity
            FROM bazaar.order_item
            WHERE order_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<i32, Vec<OrderItem>> = HashMap::new();
        for item in item_rows {
            by_order
                .entry(item.order_id)
                .or_default()
                .push(item.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect())
    }
}

// =============================================================================
// Transaction Steps
// =============================================================================

/// Take `line.quantity` units out of stock, returning the product's pricing.
async fn reserve_stock(
    tx: &mut Transaction<'_, Postgres>,
    line: OrderLine,
) -> Result<ReservedProduct, PlaceOrderError> {
    let reserved = sqlx::query_as::<_, ReservedProduct>(
        r"
        UPDATE bazaar.product
        SET quantity = quantity - $2, updated_at = NOW()
        WHERE id = $1 AND quantity >= $2
        RETURNING name, price, discount_percentage, discount_price
        ",
    )
    .bind(line.product_id)
    .bind(line.quantity)
    .fetch_optional(&mut **tx)
    .await?;

    if let Some(product) = reserved {
        return Ok(product);
    }

    let name = sqlx::query_scalar::<_, String>("SELECT name FROM bazaar.product WHERE id = $1")
        .bind(line.product_id)
        .fetch_optional(&mut **tx)
        .await?;
    Err(name.map_or(
        PlaceOrderError::UnknownProduct(line.product_id),
        PlaceOrderError::OutOfStock,
    ))
}

/// Check the coupon under a row lock and record the user's redemption.
async fn redeem_coupon(
    tx: &mut Transaction<'_, Postgres>,
    code: &str,
    user_id: UserId,
) -> Result<Decimal, PlaceOrderError> {
    let (coupon, already_used) = find_for_update(tx, code, user_id)
        .await?
        .ok_or(PlaceOrderError::Coupon(CouponRejection::Unknown))?;

    let fraction = coupon
        .terms()
        .check(Utc::now(), already_used)
        .map_err(PlaceOrderError::Coupon)?;

    sqlx::query("INSERT INTO bazaar.coupon_redemption (coupon_id, user_id) VALUES ($1, $2)")
        .bind(coupon.id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

    Ok(fraction)
}

/// Chart label for a calendar day, e.g. `Day 14`.
fn day_label(day: NaiveDate) -> String {
    format!("Day {}", day.day())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_day_label_uses_day_of_month() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(day_label(day), "Day 7");
    }

    #[test]
    fn test_place_order_error_messages() {
        assert_eq!(
            PlaceOrderError::OutOfStock("Aero 14".to_string()).to_string(),
            "Aero 14 is out of stock"
        );
        assert_eq!(
            PlaceOrderError::Coupon(CouponRejection::Expired).to_string(),
            "Coupon has expired"
        );
    }
}
