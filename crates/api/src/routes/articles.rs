//! Blog article routes.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::{ArticleCategory, ArticleId};

use crate::db::{ArticleRepository, NewArticle, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Article, ArticlePage};
use crate::services::MediaFolder;
use crate::state::AppState;

use super::MessageResponse;
use super::multipart::Form;

const DEFAULT_PAGE_SIZE: i64 = 9;
const MAX_PAGE_SIZE: i64 = 50;

/// Build the `/api/articles` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id_or_slug}", get(show).delete(remove))
}

#[derive(Debug, Default, Deserialize)]
pub struct ArticleQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
}

impl ArticleQuery {
    /// Category filter; blank, `All` and unknown names mean no filter.
    fn category(&self) -> Option<ArticleCategory> {
        self.category.as_deref().and_then(|c| c.trim().parse().ok())
    }

    fn page_size(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedArticle {
    pub success: bool,
    pub article: Article,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ArticleQuery>,
) -> Result<Json<ArticlePage>> {
    let page = ArticleRepository::new(state.pool())
        .list(query.page.unwrap_or(1), query.page_size(), query.category())
        .await?;
    Ok(Json(page))
}

/// Fetch an article by numeric id or slug, counting the view.
async fn show(
    State(state): State<AppState>,
    Path(id_or_slug): Path<String>,
) -> Result<Json<Article>> {
    ArticleRepository::new(state.pool())
        .view(&id_or_slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Article not found".to_string()))
}

#[instrument(skip(state, admin, multipart), fields(admin_id = %admin.id))]
async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = Form::collect(multipart).await?;
    let title = form
        .text("title")
        .ok_or_else(|| AppError::BadRequest("Title is required".to_string()))?;
    let content = form
        .text("content")
        .ok_or_else(|| AppError::BadRequest("Content is required".to_string()))?;
    let category = match form.text("category") {
        Some(name) => name
            .parse::<ArticleCategory>()
            .map_err(|_| AppError::BadRequest(format!("Unknown category: {name}")))?,
        None => ArticleCategory::default(),
    };
    let image = match form.take_file("image") {
        Some(upload) => Some(state.media().store(upload, MediaFolder::Articles).await?),
        None => None,
    };

    let article = ArticleRepository::new(state.pool())
        .create(&NewArticle {
            title: &title,
            content: &content,
            category,
            image: image.as_deref(),
        })
        .await?;
    tracing::info!(article_id = %article.id, slug = %article.slug, "Article published");

    Ok((
        StatusCode::CREATED,
        Json(CreatedArticle {
            success: true,
            article,
        }),
    ))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let id: ArticleId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid article id".to_string()))?;
    ArticleRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Article not found".to_string()),
            other => other.into(),
        })?;
    Ok(MessageResponse::new("Article deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_filter() {
        let query = |c: &str| ArticleQuery {
            category: Some(c.to_string()),
            ..ArticleQuery::default()
        };
        assert_eq!(query("Tech News").category(), Some(ArticleCategory::TechNews));
        assert_eq!(query("All").category(), None);
        assert_eq!(query("").category(), None);
        assert_eq!(ArticleQuery::default().category(), None);
    }

    #[test]
    fn test_page_size_bounds() {
        assert_eq!(ArticleQuery::default().page_size(), DEFAULT_PAGE_SIZE);
        let huge = ArticleQuery {
            limit: Some(10_000),
            ..ArticleQuery::default()
        };
        assert_eq!(huge.page_size(), MAX_PAGE_SIZE);
        let zero = ArticleQuery {
            limit: Some(0),
            ..ArticleQuery::default()
        };
        assert_eq!(zero.page_size(), 1);
    }
}
