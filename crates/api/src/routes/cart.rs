//! Shopping cart routes. Every route requires a signed-in user.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::{CartItemId, ProductId};

use crate::db::CartRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::CartItem;
use crate::state::AppState;

use super::MessageResponse;
use super::json::JsonBody;

/// Build the `/api/cart` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/add", post(add))
        .route("/{id}", delete(remove))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: i32,
}

const fn one() -> i32 {
    1
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartResponse {
    pub message: &'static str,
    pub cart_item: CartItem,
}

#[instrument(skip(state, user, req), fields(user_id = %user.id, product_id = %req.product_id))]
async fn add(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    JsonBody(req): JsonBody<AddToCartRequest>,
) -> Result<Json<AddToCartResponse>> {
    if req.quantity < 1 {
        return Err(AppError::BadRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }
    let cart_item = CartRepository::new(state.pool())
        .add(user.id, req.product_id, req.quantity)
        .await?;
    Ok(Json(AddToCartResponse {
        message: "Item added to cart",
        cart_item,
    }))
}

async fn list(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<CartItem>>> {
    Ok(Json(CartRepository::new(state.pool()).list(user.id).await?))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<CartItemId>,
) -> Result<Json<MessageResponse>> {
    let cart = CartRepository::new(state.pool());
    let owner = cart
        .owner(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".to_string()))?;
    if owner != user.id {
        return Err(AppError::Forbidden("Unauthorized".to_string()));
    }
    cart.delete(id).await?;
    Ok(MessageResponse::new("Item removed from cart"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_add_request_defaults_to_one() {
        let req: AddToCartRequest = serde_json::from_str(r#"{"productId": 12}"#).unwrap();
        assert_eq!(req.product_id, ProductId::new(12));
        assert_eq!(req.quantity, 1);
    }

    #[test]
    fn test_add_request_requires_product() {
        assert!(serde_json::from_str::<AddToCartRequest>(r#"{"quantity": 2}"#).is_err());
    }
}
