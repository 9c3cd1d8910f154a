//! Tests for the HTTP client module

use super::*;
use crate::auth::AuthConfig;
use crate::error::Error;
use reqwest::StatusCode;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer) -> HttpClient {
    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .no_rate_limit()
        .build();
    HttpClient::with_config(config).unwrap()
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert!(config.base_url.is_none());
    assert!(config.rate_limit.is_some());
    assert_eq!(
        config.default_headers.get("Accept"),
        Some(&"application/json".to_string())
    );
    assert!(config.user_agent.starts_with("fidoo-extractor/"));
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("https://api.fidoo.com/v2")
        .timeout(Duration::from_secs(60))
        .rate_limit(RateLimiterConfig::per_second(2))
        .header("X-Custom", "value")
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.base_url, Some("https://api.fidoo.com/v2".to_string()));
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.rate_limit.unwrap().requests_per_second, 2);
    assert_eq!(
        config.default_headers.get("X-Custom"),
        Some(&"value".to_string())
    );
    assert_eq!(config.user_agent, "test-agent/1.0");
}

#[test]
fn test_request_config_builder() {
    let config = RequestConfig::new()
        .query("page", "1")
        .header("X-Request-Id", "abc123")
        .json(serde_json::json!({"limit": 10}))
        .timeout(Duration::from_secs(10));

    assert_eq!(config.query.get("page"), Some(&"1".to_string()));
    assert_eq!(
        config.headers.get("X-Request-Id"),
        Some(&"abc123".to_string())
    );
    assert!(config.body.is_some());
    assert_eq!(config.timeout, Some(Duration::from_secs(10)));
}

#[tokio::test]
async fn test_post_json_sends_body_and_parses_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/user/get-users"))
        .and(body_json(serde_json::json!({"limit": 50})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "userList": [{"userId": "u1"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let data = client
        .post_json("/v2/user/get-users", serde_json::json!({"limit": 50}))
        .await
        .unwrap();

    assert_eq!(data["userList"][0]["userId"], "u1");
}

#[tokio::test]
async fn test_get_json_with_query_params() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("q", "test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let data = client
        .request_json(
            reqwest::Method::GET,
            "/api/search",
            RequestConfig::new().query("q", "test"),
        )
        .await
        .unwrap();

    assert_eq!(data["ok"], true);
}

#[tokio::test]
async fn test_auth_header_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status/user-info"))
        .and(header("X-Api-Key", "secret123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .no_rate_limit()
        .build();
    let client = HttpClient::with_auth(config, AuthConfig::fidoo_api_key("secret123")).unwrap();

    client.get_json("status/user-info").await.unwrap();
}

#[tokio::test]
async fn test_empty_body_is_null() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let data = client
        .post_json("empty", serde_json::json!({}))
        .await
        .unwrap();
    assert!(data.is_null());
}

#[tokio::test]
async fn test_invalid_json_is_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .post_json("broken", serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}

#[tokio::test]
async fn test_single_attempt_on_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .post_json("flaky", serde_json::json!({}))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_rate_limit_reads_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "4"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .post_json("limited", serde_json::json!({}))
        .await
        .unwrap_err();

    assert_eq!(err.retry_after(), Some(Duration::from_secs(4)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_not_found_and_auth_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403).set_body_string("nope"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);

    let err = client
        .post_json("missing", serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = client
        .post_json("forbidden", serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
}

#[tokio::test]
async fn test_timeout_maps_to_timeout_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .timeout(Duration::from_millis(50))
        .no_rate_limit()
        .build();
    let client = HttpClient::with_config(config).unwrap();

    let err = client
        .post_json("slow", serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { timeout_ms: 50 }));
}

#[test]
fn test_classify_status() {
    let err = classify_status(StatusCode::UNAUTHORIZED, "x", String::new(), None);
    assert!(matches!(err, Error::Auth { .. }));

    let err = classify_status(StatusCode::UNPROCESSABLE_ENTITY, "x", "bad".into(), None);
    assert!(matches!(err, Error::Validation { .. }));
    assert!(!err.is_retryable());

    let err = classify_status(StatusCode::BAD_GATEWAY, "x", String::new(), None);
    assert!(matches!(err, Error::HttpStatus { status: 502, .. }));

    let err = classify_status(StatusCode::NOT_FOUND, "card/get-cards", String::new(), None);
    assert!(matches!(err, Error::NotFound { ref endpoint } if endpoint == "card/get-cards"));
}

#[test]
fn test_build_url_joins_slashes() {
    let config = HttpClientConfig::builder()
        .base_url("https://api.fidoo.com/v2/")
        .no_rate_limit()
        .build();
    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(
        client.build_url("/user/get-users"),
        "https://api.fidoo.com/v2/user/get-users"
    );
    assert_eq!(
        client.build_url("https://other.example.com/x"),
        "https://other.example.com/x"
    );
}
