//! CMS page content repository.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::CmsContent;

/// Repository for editable page copy.
pub struct CmsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CmsRepository<'a> {
    /// Create a new CMS repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Content for a page, if it has ever been saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, page_name: &str) -> Result<Option<CmsContent>, RepositoryError> {
        Ok(sqlx::query_as::<_, CmsContent>(
            r"
            SELECT page_name, hero_title, hero_description, seo_footer_title, seo_footer_description
            FROM bazaar.cms_page
            WHERE page_name = $1
            ",
        )
        .bind(page_name)
        .fetch_optional(self.pool)
        .await?)
    }

    /// Insert or replace a page's content.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, content: &CmsContent) -> Result<CmsContent, RepositoryError> {
        Ok(sqlx::query_as::<_, CmsContent>(
            r"
            INSERT INTO bazaar.cms_page
                (page_name, hero_title, hero_description, seo_footer_title, seo_footer_description)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (page_name) DO UPDATE SET
                hero_title = EXCLUDED.hero_title,
                hero_description = EXCLUDED.hero_description,
                seo_footer_title = EXCLUDED.seo_footer_title,
                seo_footer_description = EXCLUDED.seo_footer_description,
                updated_at = NOW()
            RETURNING page_name, hero_title, hero_description, seo_footer_title, seo_footer_description
            ",
        )
        .bind(&content.page_name)
        .bind(&content.hero_title)
        .bind(&content.hero_description)
        .bind(&content.seo_footer_title)
        .bind(&content.seo_footer_description)
        .fetch_one(self.pool)
        .await?)
    }
}
