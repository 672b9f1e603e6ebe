//! Catalog routes: products, reviews and the wishlist.

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::ProductId;

use crate::db::{NewReview, ProductRepository, RepositoryError, ReviewRepository};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireUser};
use crate::models::{ProductDraft, ProductView, Review, TopProduct};
use crate::services::{MediaFolder, marketing};
use crate::state::AppState;

use super::MessageResponse;
use super::json::JsonBody;
use super::multipart::Form;

/// Most images accepted per product.
const MAX_PRODUCT_IMAGES: usize = 4;

/// Build the `/api/products` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/limited", get(limited))
        .route("/top-products", get(top_products))
        .route("/highest-discount", get(highest_discount))
        .route("/wishlist", get(wishlist))
        .route("/wishlist/toggle/{product_id}", post(toggle_wishlist))
        .route("/{id}", get(show).put(update).delete(remove))
        .route("/{id}/reviews", post(add_review))
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: Option<i16>,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub message: &'static str,
    pub review: Review,
    pub num_reviews: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub rating: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistToggleResponse {
    pub in_wishlist: bool,
    pub wishlist: Vec<ProductId>,
}

// =============================================================================
// Form Parsing
// =============================================================================

/// Read product fields from a multipart form. Images are handled separately.
fn product_draft(form: &Form) -> ProductDraft {
    ProductDraft {
        name: form.text("name"),
        brand: form.text("brand"),
        description: form.text("description"),
        price: form.parse::<Decimal>("price"),
        category: form.text("category"),
        processor: form.text("processor"),
        ram: form.text("ram"),
        storage: form.text("storage"),
        display: form.text("display"),
        offer_message: form.text("offerMessage"),
        on_sale: form.flag("onSale"),
        quantity: form.parse::<i32>("quantity"),
        discount_percentage: form.parse::<Decimal>("discountPercentage"),
        discount_price: form
            .parse::<Decimal>("discountPrice")
            .filter(|price| *price > Decimal::ZERO),
        images: Vec::new(),
    }
}

/// Range checks shared by create and update. Absent fields are left alone.
fn validate_draft(draft: &ProductDraft) -> Result<()> {
    if draft.price.is_some_and(|price| price < Decimal::ZERO) {
        return Err(AppError::BadRequest("A valid price is required".to_string()));
    }
    if draft
        .discount_percentage
        .is_some_and(|pct| pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED)
    {
        return Err(AppError::BadRequest(
            "Discount percentage must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}

/// Upload every `images` part and return their URLs in order.
async fn store_images(state: &AppState, form: &mut Form) -> Result<Vec<String>> {
    let uploads = form.take_files("images");
    if uploads.len() > MAX_PRODUCT_IMAGES {
        return Err(AppError::BadRequest(format!(
            "At most {MAX_PRODUCT_IMAGES} images are allowed"
        )));
    }
    let mut urls = Vec::with_capacity(uploads.len());
    for upload in uploads {
        urls.push(state.media().store(upload, MediaFolder::Products).await?);
    }
    Ok(urls)
}

fn not_found(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::NotFound("Product not found".to_string()),
        other => other.into(),
    }
}

// =============================================================================
// Listing
// =============================================================================

async fn list(State(state): State<AppState>) -> Result<Json<Vec<ProductView>>> {
    let products = ProductRepository::new(state.pool()).list().await?;
    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}

async fn limited(State(state): State<AppState>) -> Result<Json<Vec<ProductView>>> {
    let products = ProductRepository::new(state.pool()).limited().await?;
    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}

async fn top_products(State(state): State<AppState>) -> Result<Json<Vec<TopProduct>>> {
    Ok(Json(ProductRepository::new(state.pool()).top_products().await?))
}

async fn highest_discount(State(state): State<AppState>) -> Result<Json<ProductView>> {
    ProductRepository::new(state.pool())
        .highest_discount()
        .await?
        .map(|product| Json(ProductView::from(product)))
        .ok_or_else(|| AppError::NotFound("No discounted products found".to_string()))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductView>> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .map(|product| Json(ProductView::from(product)))
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

// =============================================================================
// Admin
// =============================================================================

/// Create a product, then announce it to subscribers in the background.
#[instrument(skip(state, admin, multipart), fields(admin_id = %admin.id))]
async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = Form::collect(multipart).await?;
    let mut draft = product_draft(&form);
    if draft.name.is_none() {
        return Err(AppError::BadRequest("Product name is required".to_string()));
    }
    if draft.price.is_none() {
        return Err(AppError::BadRequest("A valid price is required".to_string()));
    }
    validate_draft(&draft)?;
    draft.images = store_images(&state, &mut form).await?;

    let product = ProductRepository::new(state.pool()).create(&draft).await?;
    tracing::info!(product_id = %product.id, "Product created");

    if let Some(email) = state.email() {
        tokio::spawn(marketing::notify_new_product(
            state.pool().clone(),
            email.clone(),
            product.clone(),
        ));
    }

    Ok((StatusCode::CREATED, Json(ProductView::from(product))))
}

#[instrument(skip(state, admin, multipart), fields(admin_id = %admin.id))]
async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Json<ProductView>> {
    let mut form = Form::collect(multipart).await?;
    let mut draft = product_draft(&form);
    validate_draft(&draft)?;
    draft.images = store_images(&state, &mut form).await?;

    let product = ProductRepository::new(state.pool())
        .update(id, &draft)
        .await
        .map_err(not_found)?;
    Ok(Json(ProductView::from(product)))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<MessageResponse>> {
    ProductRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(not_found)?;
    tracing::info!(product_id = %id, "Product deleted");
    Ok(MessageResponse::new("Product deleted"))
}

// =============================================================================
// Reviews
// =============================================================================

#[instrument(skip(state, user, req), fields(user_id = %user.id))]
async fn add_review(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<ProductId>,
    JsonBody(req): JsonBody<ReviewRequest>,
) -> Result<impl IntoResponse> {
    let rating = req
        .rating
        .filter(|r| (1..=5).contains(r))
        .ok_or_else(|| AppError::BadRequest("Please provide a valid rating (1-5)".to_string()))?;
    let comment = req.comment.trim();
    if comment.is_empty() {
        return Err(AppError::BadRequest(
            "Please add a comment for your review".to_string(),
        ));
    }

    if ProductRepository::new(state.pool()).get(id).await?.is_none() {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    let outcome = ReviewRepository::new(state.pool())
        .create(&NewReview {
            product_id: id,
            user_id: user.id,
            name: &user.username,
            user_image: user.profile_image.as_deref(),
            rating,
            comment,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                AppError::BadRequest("You have already reviewed this product".to_string())
            }
            other => not_found(other),
        })?;

    Ok((
        StatusCode::CREATED,
        Json(ReviewResponse {
            message: "Review added successfully",
            review: outcome.review,
            num_reviews: outcome.num_reviews,
            rating: outcome.rating,
        }),
    ))
}

// =============================================================================
// Wishlist
// =============================================================================

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn toggle_wishlist(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(product_id): Path<ProductId>,
) -> Result<Json<WishlistToggleResponse>> {
    let products = ProductRepository::new(state.pool());
    if products.get(product_id).await?.is_none() {
        return Err(AppError::NotFound("Product not found".to_string()));
    }
    let in_wishlist = products.toggle_wishlist(user.id, product_id).await?;
    let wishlist = products.wishlist_ids(user.id).await?;
    Ok(Json(WishlistToggleResponse {
        in_wishlist,
        wishlist,
    }))
}

async fn wishlist(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<ProductView>>> {
    let products = ProductRepository::new(state.pool()).wishlist(user.id).await?;
    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_review_request_defaults() {
        let req: ReviewRequest = serde_json::from_str(r#"{"rating": 4}"#).unwrap();
        assert_eq!(req.rating, Some(4));
        assert!(req.comment.is_empty());
    }

    fn draft(price: Option<i64>, discount_percentage: Option<i64>) -> ProductDraft {
        ProductDraft {
            price: price.map(Decimal::from),
            discount_percentage: discount_percentage.map(Decimal::from),
            ..ProductDraft::default()
        }
    }

    fn is_bad_request(result: Result<()>) -> bool {
        matches!(result, Err(AppError::BadRequest(_)))
    }

    #[test]
    fn test_discount_percentage_out_of_range_is_rejected() {
        assert!(is_bad_request(validate_draft(&draft(Some(100), Some(150)))));
        assert!(is_bad_request(validate_draft(&draft(Some(100), Some(-5)))));
        assert!(is_bad_request(validate_draft(&draft(None, Some(101)))));
    }

    #[test]
    fn test_discount_percentage_bounds_are_accepted() {
        assert!(validate_draft(&draft(Some(100), Some(0))).is_ok());
        assert!(validate_draft(&draft(Some(100), Some(100))).is_ok());
        let fractional = ProductDraft {
            discount_percentage: Some(Decimal::new(99_99, 2)),
            ..ProductDraft::default()
        };
        assert!(validate_draft(&fractional).is_ok());
    }

    #[test]
    fn test_negative_price_is_rejected() {
        assert!(is_bad_request(validate_draft(&draft(Some(-10), None))));
        assert!(validate_draft(&draft(Some(0), None)).is_ok());
    }

    #[test]
    fn test_partial_update_without_prices_passes() {
        assert!(validate_draft(&ProductDraft::default()).is_ok());
    }

    #[test]
    fn test_wishlist_response_shape() {
        let body = serde_json::to_value(WishlistToggleResponse {
            in_wishlist: true,
            wishlist: vec![ProductId::new(3), ProductId::new(9)],
        })
        .unwrap();
        assert_eq!(body["inWishlist"], true);
        assert_eq!(body["wishlist"], serde_json::json!([3, 9]));
    }
}
