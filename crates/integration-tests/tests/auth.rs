//! Account flows: sign-up, login failures and token-protected routes.
//!
//! Requires a running API (`cargo run -p bazaar-api`) with its database.

use bazaar_integration_tests::{admin_token, bearer, client, unique_email, url};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_signup_then_login_requires_verification() {
    let client = client();
    let email = unique_email("signup");

    let resp = client
        .post(url("/api/auth/signup"))
        .json(&json!({ "username": "Tester", "email": email, "password": "hunter22" }))
        .send()
        .await
        .expect("Failed to sign up");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .post(url("/api/auth/signup"))
        .json(&json!({ "username": "Tester", "email": email, "password": "hunter22" }))
        .send()
        .await
        .expect("Failed to repeat sign up");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .post(url("/api/auth/login"))
        .json(&json!({ "email": email, "password": "hunter22" }))
        .send()
        .await
        .expect("Failed to log in");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_login_with_wrong_password() {
    let resp = client()
        .post(url("/api/auth/login"))
        .json(&json!({ "email": unique_email("nobody"), "password": "whatever" }))
        .send()
        .await
        .expect("Failed to log in");
    assert!(resp.status().is_client_error());
    let body: Value = resp.json().await.expect("Failed to parse body");
    assert!(body["message"].is_string());
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_profile_requires_token() {
    let client = client();

    let resp = client
        .get(url("/api/auth/profile"))
        .send()
        .await
        .expect("Failed to get profile");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = bearer(client.get(url("/api/auth/profile")), "not-a-jwt")
        .send()
        .await
        .expect("Failed to get profile");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running API server, database and ADMIN_EMAIL/ADMIN_PASSWORD"]
async fn test_admin_routes() {
    let client = client();
    let token = admin_token(&client).await;

    let resp = bearer(client.get(url("/api/auth/profile")), &token)
        .send()
        .await
        .expect("Failed to get profile");
    assert_eq!(resp.status(), StatusCode::OK);
    let profile: Value = resp.json().await.expect("Failed to parse profile");
    assert_eq!(profile["isAdmin"], true);

    let resp = bearer(client.get(url("/api/auth/all-users")), &token)
        .send()
        .await
        .expect("Failed to list users");
    assert_eq!(resp.status(), StatusCode::OK);
    let users: Value = resp.json().await.expect("Failed to parse users");
    assert!(users.is_array());
}
