//! Public storefront reads and guarded shopping routes.
//!
//! Requires a running API (`cargo run -p bazaar-api`) with its database.

use bazaar_integration_tests::{client, unique_email, url};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_product_listings() {
    let client = client();
    for path in [
        "/api/products",
        "/api/products/limited",
        "/api/products/top-products",
        "/api/reviews/testimonials?limit=5",
        "/api/articles?page=1&limit=3",
        "/api/banners",
    ] {
        let resp = client
            .get(url(path))
            .send()
            .await
            .expect("Failed to reach API");
        assert_eq!(resp.status(), StatusCode::OK, "GET {path}");
    }
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_unknown_product_is_404() {
    let resp = client()
        .get(url("/api/products/999999999"))
        .send()
        .await
        .expect("Failed to reach API");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_cart_and_orders_require_login() {
    let client = client();
    for path in ["/api/cart", "/api/orders"] {
        let resp = client
            .get(url(path))
            .send()
            .await
            .expect("Failed to reach API");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "GET {path}");
    }
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_unknown_coupon_is_invalid() {
    let resp = client()
        .post(url("/api/coupons/validate"))
        .json(&json!({ "code": "NO-SUCH-CODE-123" }))
        .send()
        .await
        .expect("Failed to reach API");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse body");
    assert_eq!(body["valid"], false);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_subscribe_twice() {
    let client = client();
    let email = unique_email("news");

    let resp = client
        .post(url("/api/subscribers/subscribe"))
        .json(&json!({ "email": email }))
        .send()
        .await
        .expect("Failed to subscribe");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(url("/api/subscribers/subscribe"))
        .json(&json!({ "email": email }))
        .send()
        .await
        .expect("Failed to subscribe again");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Failed to parse body");
    assert_eq!(body["message"], "You are already subscribed!");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_bogus_unsubscribe_link() {
    let resp = client()
        .get(url("/api/unsubscribe/not-a-real-token"))
        .send()
        .await
        .expect("Failed to reach API");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("Invalid or expired unsubscribe link"));
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_contact_requires_all_fields() {
    let resp = client()
        .post(url("/api/contact"))
        .json(&json!({ "username": "Ana", "email": "ana@example.com" }))
        .send()
        .await
        .expect("Failed to reach API");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
