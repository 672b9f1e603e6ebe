//! Hero banner and discount banner repository.

use sqlx::PgPool;

use bazaar_core::{BannerId, DiscountBannerId};

use super::RepositoryError;
use crate::models::{Banner, DiscountBanner};

const BANNER_COLUMNS: &str = "id, title, description, image, is_active, created_at, updated_at";
const DISCOUNT_BANNER_COLUMNS: &str =
    "id, title, subtitle, discount, category, image, is_active, created_at, updated_at";

/// Text fields of a banner. `None` leaves a field unchanged on update.
#[derive(Debug, Default)]
pub struct BannerFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Text fields of a discount banner. `None` leaves a field unchanged on update.
#[derive(Debug, Default)]
pub struct DiscountBannerFields {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub discount: Option<String>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

/// Repository for banner database operations.
pub struct BannerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BannerRepository<'a> {
    /// Create a new banner repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Banners
    // =========================================================================

    /// All banners, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Banner>, RepositoryError> {
        let sql = format!("SELECT {BANNER_COLUMNS} FROM bazaar.banner ORDER BY created_at DESC");
        Ok(sqlx::query_as::<_, Banner>(&sql).fetch_all(self.pool).await?)
    }

    /// Create a banner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, fields: &BannerFields, image: &str) -> Result<Banner, RepositoryError> {
        let sql = format!(
            "INSERT INTO bazaar.banner (title, description, image, is_active) \
             VALUES (COALESCE($1, ''), COALESCE($2, ''), $3, COALESCE($4, TRUE)) \
             RETURNING {BANNER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Banner>(&sql)
            .bind(fields.title.as_deref())
            .bind(fields.description.as_deref())
            .bind(image)
            .bind(fields.is_active)
            .fetch_one(self.pool)
            .await?)
    }

    /// Update a banner, replacing the image when one is given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner does not exist.
    pub async fn update(
        &self,
        id: BannerId,
        fields: &BannerFields,
        image: Option<&str>,
    ) -> Result<Banner, RepositoryError> {
        let sql = format!(
            "UPDATE bazaar.banner SET \
                 title = COALESCE($2, title), \
                 description = COALESCE($3, description), \
                 is_active = COALESCE($4, is_active), \
                 image = COALESCE($5, image), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {BANNER_COLUMNS}"
        );
        sqlx::query_as::<_, Banner>(&sql)
            .bind(id)
            .bind(fields.title.as_deref())
            .bind(fields.description.as_deref())
            .bind(fields.is_active)
            .bind(image)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a banner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner does not exist.
    pub async fn delete(&self, id: BannerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM bazaar.banner WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Discount Banners
    // =========================================================================

    /// All discount banners, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_discount(&self) -> Result<Vec<DiscountBanner>, RepositoryError> {
        let sql = format!(
            "SELECT {DISCOUNT_BANNER_COLUMNS} FROM bazaar.discount_banner ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, DiscountBanner>(&sql)
            .fetch_all(self.pool)
            .await?)
    }

    /// The most recently created active discount banner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_discount(&self) -> Result<Option<DiscountBanner>, RepositoryError> {
        let sql = format!(
            "SELECT {DISCOUNT_BANNER_COLUMNS} FROM bazaar.discount_banner \
             WHERE is_active ORDER BY created_at DESC LIMIT 1"
        );
        Ok(sqlx::query_as::<_, DiscountBanner>(&sql)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Create a discount banner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_discount(
        &self,
        fields: &DiscountBannerFields,
        image: &str,
    ) -> Result<DiscountBanner, RepositoryError> {
        let sql = format!(
            "INSERT INTO bazaar.discount_banner (title, subtitle, discount, category, image, is_active) \
             VALUES (COALESCE($1, ''), $2, $3, $4, $5, COALESCE($6, TRUE)) \
             RETURNING {DISCOUNT_BANNER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, DiscountBanner>(&sql)
            .bind(fields.title.as_deref())
            .bind(fields.subtitle.as_deref())
            .bind(fields.discount.as_deref())
            .bind(fields.category.as_deref())
            .bind(image)
            .bind(fields.is_active)
            .fetch_one(self.pool)
            .await?)
    }

    /// Update a discount banner, replacing the image when one is given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner does not exist.
    pub async fn update_discount(
        &self,
        id: DiscountBannerId,
        fields: &DiscountBannerFields,
        image: Option<&str>,
    ) -> Result<DiscountBanner, RepositoryError> {
        let sql = format!(
            "UPDATE bazaar.discount_banner SET \
                 title = COALESCE($2, title), \
                 subtitle = COALESCE($3, subtitle), \
                 discount = COALESCE($4, discount), \
                 category = COALESCE($5, category), \
                 is_active = COALESCE($6, is_active), \
                 image = COALESCE($7, image), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {DISCOUNT_BANNER_COLUMNS}"
        );
        sqlx::query_as::<_, DiscountBanner>(&sql)
            .bind(id)
            .bind(fields.title.as_deref())
            .bind(fields.subtitle.as_deref())
            .bind(fields.discount.as_deref())
            .bind(fields.category.as_deref())
            .bind(fields.is_active)
            .bind(image)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a discount banner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner does not exist.
    pub async fn delete_discount(&self, id: DiscountBannerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM bazaar.discount_banner WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
