//! Integration tests for the Bazaar API.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! cargo run -p bazaar-cli -- migrate
//!
//! # Start the API
//! cargo run -p bazaar-api
//!
//! # Run the (ignored) integration tests against it
//! cargo test -p bazaar-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `API_BASE_URL` - API origin (default: `http://localhost:5000`)
//! - `ADMIN_EMAIL` / `ADMIN_PASSWORD` - An admin created with
//!   `bazaar-cli admin create`, for the admin-only tests

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{Value, json};

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

/// Absolute URL for an API path such as `/api/products`.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", base_url())
}

/// A plain HTTP client.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .build()
        .expect("Failed to create HTTP client")
}

/// Attach a bearer token to a request.
#[must_use]
pub fn bearer(request: RequestBuilder, token: &str) -> RequestBuilder {
    request.header("Authorization", format!("Bearer {token}"))
}

/// A unique throwaway address on the reserved `example.com` domain.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", uuid::Uuid::new_v4().simple())
}

/// Log in and return the issued token.
///
/// # Panics
///
/// Panics if the login request fails or does not return a token.
pub async fn login(client: &Client, email: &str, password: &str) -> String {
    let resp = client
        .post(url("/api/auth/login"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");
    assert_eq!(resp.status(), StatusCode::OK, "login failed for {email}");
    let body: Value = resp.json().await.expect("Failed to parse login response");
    body["token"]
        .as_str()
        .expect("Login response has no token")
        .to_string()
}

/// Log in as the admin named by `ADMIN_EMAIL` / `ADMIN_PASSWORD`.
///
/// # Panics
///
/// Panics if the variables are unset or the login fails.
pub async fn admin_token(client: &Client) -> String {
    let email = std::env::var("ADMIN_EMAIL").expect("ADMIN_EMAIL must be set");
    let password = std::env::var("ADMIN_PASSWORD").expect("ADMIN_PASSWORD must be set");
    login(client, &email, &password).await
}
