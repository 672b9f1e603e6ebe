//! Cross-product review routes for the storefront's testimonial sections.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::ReviewId;

use crate::db::{RepositoryError, ReviewRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Review, Testimonial, TestimonialSort};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

/// Build the `/api/reviews` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/testimonials", get(testimonials))
        .route("/{id}/featured", put(toggle_featured))
}

#[derive(Debug, Default, Deserialize)]
pub struct TestimonialQuery {
    #[serde(default)]
    pub sort: TestimonialSort,
    #[serde(default)]
    pub featured: bool,
    pub limit: Option<i64>,
}

impl TestimonialQuery {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(0, MAX_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct TestimonialsResponse {
    pub success: bool,
    pub count: usize,
    pub testimonials: Vec<Testimonial>,
}

async fn testimonials(
    State(state): State<AppState>,
    Query(query): Query<TestimonialQuery>,
) -> Result<Json<TestimonialsResponse>> {
    let testimonials = ReviewRepository::new(state.pool())
        .testimonials(query.sort, query.featured, query.limit())
        .await?;
    Ok(Json(TestimonialsResponse {
        success: true,
        count: testimonials.len(),
        testimonials,
    }))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn toggle_featured(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ReviewId>,
) -> Result<Json<Review>> {
    let review = ReviewRepository::new(state.pool())
        .toggle_featured(id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Review not found".to_string()),
            other => other.into(),
        })?;
    Ok(Json(review))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Uri;

    use super::*;

    fn parse(uri: &'static str) -> TestimonialQuery {
        Query::<TestimonialQuery>::try_from_uri(&Uri::from_static(uri))
            .unwrap()
            .0
    }

    #[test]
    fn test_query_defaults() {
        let query = parse("/testimonials");
        assert_eq!(query.sort, TestimonialSort::Top);
        assert!(!query.featured);
        assert_eq!(query.limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn test_query_parses_and_clamps() {
        let query = parse("/testimonials?sort=latest&featured=true&limit=5000");
        assert_eq!(query.sort, TestimonialSort::Latest);
        assert!(query.featured);
        assert_eq!(query.limit(), MAX_LIMIT);
    }
}
