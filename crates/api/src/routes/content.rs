//! Storefront content routes: home page copy, hero banners and discount
//! banners.

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use tracing::instrument;

use bazaar_core::{BannerId, DiscountBannerId};

use crate::db::{
    BannerFields, BannerRepository, CmsRepository, DiscountBannerFields, RepositoryError,
};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Banner, CmsContent, DiscountBanner};
use crate::services::MediaFolder;
use crate::state::AppState;

use super::MessageResponse;
use super::json::JsonBody;
use super::multipart::Form;

const HOME_PAGE: &str = "home";

/// Build the `/api/cms` router.
pub fn cms_router() -> Router<AppState> {
    Router::new().route("/home-content", get(home_content).put(update_home_content))
}

/// Build the `/api/banners` router.
pub fn banner_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_banners).post(create_banner))
        .route("/{id}", put(update_banner).delete(delete_banner))
}

/// Build the `/api/discountbanner` router.
pub fn discount_banner_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_discount_banners).post(create_discount_banner))
        .route("/active", get(active_discount_banner))
        .route(
            "/{id}",
            put(update_discount_banner).delete(delete_discount_banner),
        )
}

fn not_found(what: &'static str) -> impl FnOnce(RepositoryError) -> AppError {
    move |e| match e {
        RepositoryError::NotFound => AppError::NotFound(format!("{what} not found")),
        other => other.into(),
    }
}

// =============================================================================
// CMS
// =============================================================================

/// Home page copy, or `null` before anything has been saved.
async fn home_content(State(state): State<AppState>) -> Result<Json<Option<CmsContent>>> {
    Ok(Json(CmsRepository::new(state.pool()).get(HOME_PAGE).await?))
}

#[instrument(skip(state, admin, content), fields(admin_id = %admin.id))]
async fn update_home_content(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    JsonBody(mut content): JsonBody<CmsContent>,
) -> Result<Json<CmsContent>> {
    content.page_name = HOME_PAGE.to_string();
    Ok(Json(CmsRepository::new(state.pool()).upsert(&content).await?))
}

// =============================================================================
// Hero Banners
// =============================================================================

fn banner_fields(form: &Form) -> BannerFields {
    BannerFields {
        title: form.text("title"),
        description: form.text("description"),
        is_active: form.flag("isActive"),
    }
}

async fn banner_image(state: &AppState, form: &mut Form) -> Result<Option<String>> {
    match form.take_file("image") {
        Some(upload) => Ok(Some(state.media().store(upload, MediaFolder::Banners).await?)),
        None => Ok(None),
    }
}

async fn list_banners(State(state): State<AppState>) -> Result<Json<Vec<Banner>>> {
    Ok(Json(BannerRepository::new(state.pool()).list().await?))
}

#[instrument(skip(state, admin, multipart), fields(admin_id = %admin.id))]
async fn create_banner(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = Form::collect(multipart).await?;
    let image = banner_image(&state, &mut form)
        .await?
        .ok_or_else(|| AppError::BadRequest("Image is required".to_string()))?;
    let banner = BannerRepository::new(state.pool())
        .create(&banner_fields(&form), &image)
        .await?;
    Ok((StatusCode::CREATED, Json(banner)))
}

#[instrument(skip(state, admin, multipart), fields(admin_id = %admin.id))]
async fn update_banner(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<BannerId>,
    multipart: Multipart,
) -> Result<Json<Banner>> {
    let mut form = Form::collect(multipart).await?;
    let image = banner_image(&state, &mut form).await?;
    let banner = BannerRepository::new(state.pool())
        .update(id, &banner_fields(&form), image.as_deref())
        .await
        .map_err(not_found("Banner"))?;
    Ok(Json(banner))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn delete_banner(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<BannerId>,
) -> Result<Json<MessageResponse>> {
    BannerRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(not_found("Banner"))?;
    Ok(MessageResponse::new("Banner deleted successfully"))
}

// =============================================================================
// Discount Banners
// =============================================================================

fn discount_banner_fields(form: &Form) -> DiscountBannerFields {
    DiscountBannerFields {
        title: form.text("title"),
        subtitle: form.text("subtitle"),
        discount: form.text("discount"),
        category: form.text("category"),
        is_active: form.flag("isActive"),
    }
}

async fn list_discount_banners(
    State(state): State<AppState>,
) -> Result<Json<Vec<DiscountBanner>>> {
    Ok(Json(BannerRepository::new(state.pool()).list_discount().await?))
}

async fn active_discount_banner(State(state): State<AppState>) -> Result<Json<DiscountBanner>> {
    BannerRepository::new(state.pool())
        .active_discount()
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No active discount banner".to_string()))
}

#[instrument(skip(state, admin, multipart), fields(admin_id = %admin.id))]
async fn create_discount_banner(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = Form::collect(multipart).await?;
    let image = banner_image(&state, &mut form)
        .await?
        .ok_or_else(|| AppError::BadRequest("Image is required".to_string()))?;
    let banner = BannerRepository::new(state.pool())
        .create_discount(&discount_banner_fields(&form), &image)
        .await?;
    Ok((StatusCode::CREATED, Json(banner)))
}

#[instrument(skip(state, admin, multipart), fields(admin_id = %admin.id))]
async fn update_discount_banner(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DiscountBannerId>,
    multipart: Multipart,
) -> Result<Json<DiscountBanner>> {
    let mut form = Form::collect(multipart).await?;
    let image = banner_image(&state, &mut form).await?;
    let banner = BannerRepository::new(state.pool())
        .update_discount(id, &discount_banner_fields(&form), image.as_deref())
        .await
        .map_err(not_found("Discount banner"))?;
    Ok(Json(banner))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn delete_discount_banner(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DiscountBannerId>,
) -> Result<Json<MessageResponse>> {
    BannerRepository::new(state.pool())
        .delete_discount(id)
        .await
        .map_err(not_found("Discount banner"))?;
    Ok(MessageResponse::new("Discount banner deleted successfully"))
}
