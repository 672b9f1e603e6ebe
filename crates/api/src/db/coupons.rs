//! Coupon repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use bazaar_core::{CouponId, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::Coupon;

const COUPON_COLUMNS: &str = "c.id, c.code, c.discount, c.expires_at, c.usage_limit, c.created_at, \
     (SELECT COUNT(*) FROM bazaar.coupon_redemption r WHERE r.coupon_id = c.id) AS times_used";

#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: i32,
    code: String,
    discount: Decimal,
    expires_at: Option<DateTime<Utc>>,
    usage_limit: Option<i32>,
    times_used: i64,
    created_at: DateTime<Utc>,
}

impl From<CouponRow> for Coupon {
    fn from(row: CouponRow) -> Self {
        Self {
            id: CouponId::new(row.id),
            code: row.code,
            discount: row.discount,
            expires_at: row.expires_at,
            usage_limit: row.usage_limit,
            times_used: row.times_used,
            created_at: row.created_at,
        }
    }
}

/// Repository for coupon database operations.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    /// Create a new coupon repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find a coupon by its (already normalized) code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM bazaar.coupon c WHERE c.code = $1");
        let row = sqlx::query_as::<_, CouponRow>(&sql)
            .bind(code)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Coupon::from))
    }

    /// Whether the user has already redeemed the coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_redeemed(&self, coupon_id: CouponId, user_id: UserId) -> Result<bool, RepositoryError> {
        let redeemed = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM bazaar.coupon_redemption WHERE coupon_id = $1 AND user_id = $2)",
        )
        .bind(coupon_id)
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(redeemed)
    }

    /// Create a coupon. `code` must be normalized and `discount` validated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn create(
        &self,
        code: &str,
        discount: Decimal,
        expires_at: Option<DateTime<Utc>>,
        usage_limit: Option<i32>,
    ) -> Result<Coupon, RepositoryError> {
        let sql = format!(
            "INSERT INTO bazaar.coupon AS c (code, discount, expires_at, usage_limit) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COUPON_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CouponRow>(&sql)
            .bind(code)
            .bind(discount)
            .bind(expires_at)
            .bind(usage_limit)
            .fetch_one(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "Coupon code"))?;
        Ok(row.into())
    }
}

/// Lock a coupon for redemption inside an order transaction.
///
/// Returns the coupon and whether `user_id` already redeemed it.
pub(crate) async fn find_for_update(
    tx: &mut Transaction<'_, Postgres>,
    code: &str,
    user_id: UserId,
) -> Result<Option<(Coupon, bool)>, sqlx::Error> {
    let locked = sqlx::query_scalar::<_, i32>("SELECT id FROM bazaar.coupon WHERE code = $1 FOR UPDATE")
        .bind(code)
        .fetch_optional(&mut **tx)
        .await?;
    let Some(id) = locked else {
        return Ok(None);
    };

    let sql = format!("SELECT {COUPON_COLUMNS} FROM bazaar.coupon c WHERE c.id = $1");
    let coupon: Coupon = sqlx::query_as::<_, CouponRow>(&sql)
        .bind(id)
        .fetch_one(&mut **tx)
        .await?
        .into();

    let already_used = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM bazaar.coupon_redemption WHERE coupon_id = $1 AND user_id = $2)",
    )
    .bind(id)
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(Some((coupon, already_used)))
}
