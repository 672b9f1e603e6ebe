//! Order routes: checkout, history, tracking and admin fulfilment.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{delete, get, put},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::{OrderId, OrderStatus, ProductId};

use crate::db::{NewOrder, OrderLine, OrderRepository, RepositoryError, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireUser};
use crate::models::order::DEFAULT_PAYMENT_METHOD;
use crate::models::{AdminOrder, DailyOrders, Order, OrderCustomer, ShippingAddress, TrackingInfo, User};
use crate::services::invoice;
use crate::state::AppState;

use super::MessageResponse;
use super::json::JsonBody;

const DEFAULT_STATS_RANGE: i32 = 7;

/// Build the `/api/orders` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(my_orders).post(place))
        .route("/admin", get(all_orders))
        .route("/stats", get(stats))
        .route("/track/{tracking_id}", get(track))
        .route("/cancelled/{id}", delete(hide_cancelled))
        .route("/{id}", delete(remove))
        .route("/{id}/cancel", put(cancel))
        .route("/{id}/status", put(update_status))
        .route("/{id}/invoice", get(download_invoice))
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub products: Vec<OrderLineRequest>,
    pub payment_method: Option<String>,
    pub shipping_address: ShippingAddress,
    pub coupon_code: Option<String>,
}

impl PlaceOrderRequest {
    /// Validate the request shape and return the order lines.
    fn lines(&self) -> Result<Vec<OrderLine>> {
        if self.products.is_empty() {
            return Err(AppError::BadRequest("No products in order".to_string()));
        }
        if self.products.iter().any(|line| line.quantity < 1) {
            return Err(AppError::BadRequest(
                "Quantity must be at least 1".to_string(),
            ));
        }
        if let Some(field) = self.shipping_address.first_missing_field() {
            return Err(AppError::BadRequest(format!(
                "Shipping address {field} is required"
            )));
        }
        Ok(self
            .products
            .iter()
            .map(|line| OrderLine {
                product_id: line.product_id,
                quantity: line.quantity,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub range: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct OrderMessageResponse {
    pub message: &'static str,
    pub order: Order,
}

fn order_not_found(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::NotFound("Order not found".to_string()),
        other => other.into(),
    }
}

async fn load_order(state: &AppState, id: OrderId) -> Result<Order> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

// =============================================================================
// Customer
// =============================================================================

/// Place an order, then send the confirmation mail.
#[instrument(skip(state, user, req), fields(user_id = %user.id))]
async fn place(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    JsonBody(req): JsonBody<PlaceOrderRequest>,
) -> Result<impl IntoResponse> {
    let lines = req.lines()?;
    let payment_method = req
        .payment_method
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_PAYMENT_METHOD);
    let coupon_code = req
        .coupon_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let order = OrderRepository::new(state.pool())
        .place(&NewOrder {
            user_id: user.id,
            lines: &lines,
            payment_method,
            shipping_address: &req.shipping_address,
            coupon_code,
        })
        .await?;
    tracing::info!(order_id = %order.id, tracking_id = %order.tracking_id, "Order placed");

    send_confirmation(&state, &user, &order).await;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn send_confirmation(state: &AppState, user: &User, order: &Order) {
    let (Some(email), Some(to)) = (state.email(), user.email.as_ref()) else {
        return;
    };
    if let Err(e) = email
        .send_order_confirmation(to.as_str(), &user.username, order)
        .await
    {
        tracing::warn!(error = %e, order_id = %order.id, "Order confirmation email failed");
    }
}

async fn my_orders(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(
        OrderRepository::new(state.pool())
            .list_for_user(user.id)
            .await?,
    ))
}

/// Cancel an order. Customers may cancel their own orders; admins any order.
#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn cancel(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderMessageResponse>> {
    let order = load_order(&state, id).await?;
    if order.user_id != user.id && !user.is_admin {
        return Err(AppError::Forbidden("Unauthorized action".to_string()));
    }

    OrderRepository::new(state.pool())
        .cancel(id)
        .await
        .map_err(order_not_found)?;
    tracing::info!(order_id = %id, "Order cancelled");

    Ok(Json(OrderMessageResponse {
        message: "Order cancelled successfully",
        order: load_order(&state, id).await?,
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn hide_cancelled(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderMessageResponse>> {
    let mut order = load_order(&state, id).await?;
    if order.user_id != user.id {
        return Err(AppError::Forbidden("Unauthorized action".to_string()));
    }
    if !order.status.is_hideable() {
        return Err(AppError::BadRequest(
            "Only cancelled orders can be hidden.".to_string(),
        ));
    }

    OrderRepository::new(state.pool())
        .hide_for_user(id)
        .await
        .map_err(order_not_found)?;
    order.hidden_for_user = true;

    Ok(Json(OrderMessageResponse {
        message: "Cancelled order hidden from your view.",
        order,
    }))
}

async fn track(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
) -> Result<Json<TrackingInfo>> {
    let order = OrderRepository::new(state.pool())
        .get_by_tracking_id(tracking_id.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    Ok(Json(TrackingInfo::from(&order)))
}

// =============================================================================
// Admin
// =============================================================================

async fn all_orders(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<AdminOrder>>> {
    Ok(Json(OrderRepository::new(state.pool()).list_admin().await?))
}

#[instrument(skip(state, admin, req), fields(admin_id = %admin.id))]
async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    JsonBody(req): JsonBody<StatusRequest>,
) -> Result<Json<OrderMessageResponse>> {
    let status: OrderStatus = req
        .status
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid order status".to_string()))?;

    let order = OrderRepository::new(state.pool())
        .update_status(id, status)
        .await
        .map_err(order_not_found)?;
    tracing::info!(order_id = %id, %status, "Order status updated");

    Ok(Json(OrderMessageResponse {
        message: "Order status updated",
        order,
    }))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<MessageResponse>> {
    let order = load_order(&state, id).await?;
    if !order.status.is_deletable() {
        return Err(AppError::BadRequest(
            "Only Cancelled or Delivered orders can be deleted.".to_string(),
        ));
    }
    OrderRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(order_not_found)?;
    tracing::info!(order_id = %id, "Order deleted");
    Ok(MessageResponse::new("Order deleted successfully"))
}

/// Render the order's invoice as a PDF download.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn download_invoice(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<impl IntoResponse> {
    let order = load_order(&state, id).await?;
    let customer = UserRepository::new(state.pool())
        .get_by_id(order.user_id)
        .await?
        .map(|user| OrderCustomer {
            username: user.username,
            email: user.email,
        });

    let pdf = tokio::task::spawn_blocking(move || invoice::render(&order, customer.as_ref()))
        .await
        .map_err(|e| AppError::Internal(format!("invoice task failed: {e}")))??;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"invoice-{id}.pdf\""),
            ),
        ],
        pdf,
    ))
}

async fn stats(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Vec<DailyOrders>>> {
    let range = query.range.unwrap_or(DEFAULT_STATS_RANGE);
    Ok(Json(
        OrderRepository::new(state.pool()).daily_stats(range).await?,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(body: serde_json::Value) -> PlaceOrderRequest {
        serde_json::from_value(body).unwrap()
    }

    fn address() -> serde_json::Value {
        serde_json::json!({
            "fullName": "Ada Lovelace",
            "phone": "+44 20 7946 0000",
            "street": "12 Analytical Row",
            "city": "London",
            "postalCode": "N1 9GU",
            "country": "UK"
        })
    }

    #[test]
    fn test_lines_are_extracted() {
        let req = request(serde_json::json!({
            "products": [{"productId": 4, "quantity": 2}, {"productId": 9, "quantity": 1}],
            "shippingAddress": address(),
            "couponCode": "SAVE10"
        }));
        let lines = req.lines().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_id, ProductId::new(4));
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(req.coupon_code.as_deref(), Some("SAVE10"));
    }

    #[test]
    fn test_empty_order_is_rejected() {
        let req = request(serde_json::json!({
            "products": [],
            "shippingAddress": address()
        }));
        assert!(matches!(req.lines(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_zero_quantity_is_rejected() {
        let req = request(serde_json::json!({
            "products": [{"productId": 4, "quantity": 0}],
            "shippingAddress": address()
        }));
        assert!(matches!(req.lines(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_blank_address_field_is_named() {
        let mut addr = address();
        addr["city"] = serde_json::json!("  ");
        let req = request(serde_json::json!({
            "products": [{"productId": 4, "quantity": 1}],
            "shippingAddress": addr
        }));
        match req.lines() {
            Err(AppError::BadRequest(msg)) => assert!(msg.contains("city")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
