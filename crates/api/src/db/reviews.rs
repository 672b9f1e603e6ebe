//! Product review repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use bazaar_core::{ProductId, ReviewId, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Review, Testimonial, TestimonialSort};

const REVIEW_COLUMNS: &str =
    "r.id, r.product_id, r.user_id, r.name, r.rating, r.comment, r.user_image, r.is_featured, r.created_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: i32,
    product_id: i32,
    user_id: i32,
    name: String,
    rating: i16,
    comment: String,
    user_image: Option<String>,
    is_featured: bool,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: ReviewId::new(row.id),
            product_id: ProductId::new(row.product_id),
            user_id: UserId::new(row.user_id),
            name: row.name,
            rating: row.rating,
            comment: row.comment,
            user_image: row.user_image,
            is_featured: row.is_featured,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TestimonialRow {
    #[sqlx(flatten)]
    review: ReviewRow,
    product_name: String,
    product_category: String,
}

#[derive(Debug, sqlx::FromRow)]
struct RatingRow {
    num_reviews: i32,
    rating: Decimal,
}

/// A new review as submitted by a signed-in customer.
#[derive(Debug)]
pub struct NewReview<'a> {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub name: &'a str,
    pub user_image: Option<&'a str>,
    pub rating: i16,
    pub comment: &'a str,
}

/// A stored review together with the product's refreshed aggregates.
#[derive(Debug)]
pub struct ReviewOutcome {
    pub review: Review,
    pub num_reviews: i32,
    pub rating: Decimal,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a review and recompute the product's review count and mean rating.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already reviewed the product.
    /// Returns `RepositoryError::NotFound` if the product vanished meanwhile.
    pub async fn create(&self, review: &NewReview<'_>) -> Result<ReviewOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO bazaar.product_review AS r \
                 (product_id, user_id, name, rating, comment, user_image) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {REVIEW_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(review.product_id)
            .bind(review.user_id)
            .bind(review.name)
            .bind(review.rating)
            .bind(review.comment)
            .bind(review.user_image)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| conflict_on_unique(e, "review"))?;

        let totals = sqlx::query_as::<_, RatingRow>(
            r"
            UPDATE bazaar.product p SET
                num_reviews = agg.n,
                rating = agg.mean,
                updated_at = NOW()
            FROM (
                SELECT COUNT(*)::INTEGER AS n,
                       ROUND(COALESCE(AVG(rating), 0), 2) AS mean
                FROM bazaar.product_review
                WHERE product_id = $1
            ) agg
            WHERE p.id = $1
            RETURNING p.num_reviews, p.rating
            ",
        )
        .bind(review.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;

        Ok(ReviewOutcome {
            review: row.into(),
            num_reviews: totals.num_reviews,
            rating: totals.rating,
        })
    }

    /// Reviews across all products with their product's name and category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn testimonials(
        &self,
        sort: TestimonialSort,
        featured_only: bool,
        limit: i64,
    ) -> Result<Vec<Testimonial>, RepositoryError> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS}, p.name AS product_name, p.category AS product_category \
             FROM bazaar.product_review r \
             JOIN bazaar.product p ON p.id = r.product_id \
             WHERE ($1 = FALSE OR r.is_featured) \
             ORDER BY {} \
             LIMIT $2",
            sort.order_by()
        );
        let rows = sqlx::query_as::<_, TestimonialRow>(&sql)
            .bind(featured_only)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| Testimonial {
                review: row.review.into(),
                product_name: row.product_name,
                product_category: row.product_category,
            })
            .collect())
    }

    /// Flip a review's featured flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn toggle_featured(&self, id: ReviewId) -> Result<Review, RepositoryError> {
        let sql = format!(
            "UPDATE bazaar.product_review AS r SET is_featured = NOT r.is_featured \
             WHERE r.id = $1 \
             RETURNING {REVIEW_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok(row.into())
    }
}
