//! Liveness, readiness and routing basics.
//!
//! Requires a running API (`cargo run -p bazaar-api`) with its database.

use bazaar_integration_tests::{client, url};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_health() {
    let resp = client()
        .get(url("/health"))
        .send()
        .await
        .expect("Failed to reach API");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("Failed to read body"), "ok");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_readiness() {
    let resp = client()
        .get(url("/health/ready"))
        .send()
        .await
        .expect("Failed to reach API");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_welcome_message() {
    let resp = client()
        .get(url("/"))
        .send()
        .await
        .expect("Failed to reach API");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse body");
    assert!(body["message"].is_string());
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_security_headers_and_request_id() {
    let resp = client()
        .get(url("/health"))
        .header("x-request-id", "integration-check-1")
        .send()
        .await
        .expect("Failed to reach API");
    let headers = resp.headers();
    assert_eq!(headers["x-request-id"], "integration-check-1");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
}
