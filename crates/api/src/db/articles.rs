//! Blog article repository.

use sqlx::PgPool;

use bazaar_core::{ArticleCategory, ArticleId};

use super::RepositoryError;
use crate::models::{Article, ArticlePage, slugify};

const ARTICLE_COLUMNS: &str =
    "id, title, slug, content, category, image, author, views, status, created_at, updated_at";

/// A new article as submitted by an admin.
#[derive(Debug)]
pub struct NewArticle<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub category: ArticleCategory,
    pub image: Option<&'a str>,
}

/// Repository for article database operations.
pub struct ArticleRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ArticleRepository<'a> {
    /// Create a new article repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of articles, newest first, optionally within a category.
    ///
    /// `page` is 1-based; both `page` and `per_page` are clamped to at least 1.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        page: i64,
        per_page: i64,
        category: Option<ArticleCategory>,
    ) -> Result<ArticlePage, RepositoryError> {
        let page = page.max(1);
        let per_page = per_page.max(1);

        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM bazaar.article \
             WHERE ($1::bazaar.article_category IS NULL OR category = $1) \
             ORDER BY created_at DESC \
             LIMIT $2 OFFSET $3"
        );
        let articles = sqlx::query_as::<_, Article>(&sql)
            .bind(category)
            .bind(per_page)
            .bind((page - 1).saturating_mul(per_page))
            .fetch_all(self.pool)
            .await?;

        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM bazaar.article \
             WHERE ($1::bazaar.article_category IS NULL OR category = $1)",
        )
        .bind(category)
        .fetch_one(self.pool)
        .await?;

        Ok(ArticlePage {
            articles,
            total_pages: total_pages(count, per_page),
            current_page: page,
        })
    }

    /// Fetch an article by numeric ID or slug and count the view.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn view(&self, id_or_slug: &str) -> Result<Option<Article>, RepositoryError> {
        let id = id_or_slug.parse::<i32>().ok();
        let sql = format!(
            "UPDATE bazaar.article SET views = views + 1 \
             WHERE id = (SELECT id FROM bazaar.article \
                         WHERE ($1::INTEGER IS NOT NULL AND id = $1) OR slug = $2 \
                         ORDER BY (id = $1) DESC NULLS LAST \
                         LIMIT 1) \
             RETURNING {ARTICLE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .bind(id_or_slug)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Create an article with a slug derived from its title. A taken slug gets
    /// a timestamp suffix.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, new: &NewArticle<'_>) -> Result<Article, RepositoryError> {
        let mut slug = slugify(new.title);
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM bazaar.article WHERE slug = $1)",
        )
        .bind(&slug)
        .fetch_one(self.pool)
        .await?;
        if taken {
            slug = format!("{slug}-{}", chrono::Utc::now().timestamp_millis());
        }

        let sql = format!(
            "INSERT INTO bazaar.article (title, slug, content, category, image) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {ARTICLE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(new.title)
            .bind(&slug)
            .bind(new.content)
            .bind(new.category)
            .bind(new.image)
            .fetch_one(self.pool)
            .await?)
    }

    /// Delete an article.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the article does not exist.
    pub async fn delete(&self, id: ArticleId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM bazaar.article WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

fn total_pages(count: i64, per_page: i64) -> i64 {
    (count + per_page - 1) / per_page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(total_pages(0, 9), 0);
        assert_eq!(total_pages(9, 9), 1);
        assert_eq!(total_pages(10, 9), 2);
    }
}
