//! E2E tests for the public pages

mod common;

use common::{LANDING_PAGE, TestServer, location};

#[tokio::test]
async fn test_landing_page_is_served_to_anonymous_users() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/html"));
    assert_eq!(response.text().await.unwrap(), LANDING_PAGE);
}

#[tokio::test]
async fn test_landing_page_is_served_to_logged_in_users() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let response = server
        .client
        .get(server.url("/"))
        .header("Cookie", &cookie)
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), LANDING_PAGE);
}

#[tokio::test]
async fn test_failure_page() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/failure"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "Failed to log in!");
}

#[tokio::test]
async fn test_failed_login_lands_on_failure_page() {
    let server = TestServer::new().await;

    let start = server
        .client
        .get(server.url("/auth/google"))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(start.status(), 302);

    let callback = server
        .client
        .get(server.url("/auth/google/callback?code=invalid"))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(callback.status(), 302);
    let failure_path = location(&callback);
    assert_eq!(failure_path, "/failure");

    let failure = server
        .client
        .get(server.url(&failure_path))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(failure.status(), 200);
    assert_eq!(failure.text().await.unwrap(), "Failed to log in!");
}

#[tokio::test]
async fn test_security_headers_are_set() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/failure"))
        .send()
        .await
        .expect("request succeeds");

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "SAMEORIGIN");
    assert_eq!(headers.get("referrer-policy").unwrap(), "no-referrer");
    assert!(headers.get("strict-transport-security").is_some());
}

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_metrics_endpoint_serves_prometheus_text() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/metrics"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(
        content_type.starts_with("text/plain; version=0.0.4"),
        "unexpected content type: {content_type}"
    );
}
