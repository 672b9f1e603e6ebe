//! HTTP route handlers for the Bazaar API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                   - Welcome message
//! GET  /health                             - Liveness check
//! GET  /health/ready                       - Readiness check (database)
//! GET  /uploads/*                          - Locally stored media
//!
//! # Auth (/api/auth)
//! POST /signup, /verify, /resend, /login (rate limited), /logout
//! GET  /profile, PUT /profile, POST /upload-profile
//! POST /forgot-password, /reset-password
//! GET  /google, /google/callback
//! GET  /all-users, PUT /block/{id}, GET /stats      (admin)
//!
//! # Catalog
//! /api/products          - listing, detail, reviews, wishlist, admin CRUD
//! /api/reviews           - testimonials, featured toggle (admin)
//! /api/articles          - blog listing, detail, admin create/delete
//!
//! # Shopping (requires auth)
//! /api/cart              - cart lines
//! /api/orders            - placement, history, tracking, invoices, admin status
//! /api/coupons           - validation, admin creation
//! /api/payments          - hosted checkout sessions
//!
//! # Content
//! /api/cms               - home page copy
//! /api/banners           - hero banners
//! /api/discountbanner    - discount banners
//!
//! # Marketing
//! /api/subscribers       - subscribe, admin list and campaigns
//! /api/unsubscribe       - one-click unsubscribe page (HTML)
//! /api/contact           - contact form relay
//! /api/chat              - AI sales assistant, admin logs
//! ```

pub mod articles;
pub mod auth;
pub mod cart;
pub mod chat;
pub mod contact;
pub mod json;
pub mod content;
pub mod coupons;
pub mod marketing;
pub mod multipart;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

/// Plain `{"message": "..."}` body shared by handlers that only confirm.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

async fn welcome() -> Json<MessageResponse> {
    MessageResponse::new("Bazaar API is running")
}

/// Create the `/api` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/products", products::router())
        .nest("/reviews", reviews::router())
        .nest("/articles", articles::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/coupons", coupons::router())
        .nest("/payments", payments::router())
        .nest("/cms", content::cms_router())
        .nest("/banners", content::banner_router())
        .nest("/discountbanner", content::discount_banner_router())
        .nest("/subscribers", marketing::subscriber_router())
        .nest("/unsubscribe", marketing::unsubscribe_router())
        .nest("/contact", contact::router())
        .nest("/chat", chat::router())
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(welcome))
        .nest("/api", api_routes())
}
