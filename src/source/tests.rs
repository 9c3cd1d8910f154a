//! Tests for the record source module

use super::*;
use crate::error::Error;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn source_for(server: &MockServer) -> HttpRecordSource {
    HttpRecordSource::new(&server.uri(), "key-1", Duration::from_secs(5), Some(0)).unwrap()
}

#[test]
fn test_extract_records_top_level_array() {
    let records = extract_records(json!([{"id": 1}, {"id": 2}]));
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["id"], 2);
}

#[test]
fn test_extract_records_checks_known_keys_in_order() {
    let records = extract_records(json!({
        "items": [],
        "data": [{"id": "d1"}],
        "results": [{"id": "r1"}]
    }));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], "d1");
}

#[test]
fn test_extract_records_wraps_single_object() {
    let records = extract_records(json!({"root": {"id": "only"}}));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], "only");
}

#[test]
fn test_extract_records_single_array_field_fallback() {
    let records = extract_records(json!({
        "userList": [{"userId": "u1"}],
        "nextOffsetToken": "t1"
    }));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["userId"], "u1");

    // ambiguous: two array fields, nothing known
    let records = extract_records(json!({"a": [1], "b": [2]}));
    assert!(records.is_empty());
}

#[test]
fn test_extract_records_scalars_and_unknown_shapes() {
    let records = extract_records(json!(["x", null, 3]));
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["value"], "x");
    assert_eq!(records[1]["value"], 3);

    assert!(extract_records(json!("plain")).is_empty());
    assert!(extract_records(json!({"status": "ok"})).is_empty());
    assert!(extract_records(serde_json::Value::Null).is_empty());
}

#[test]
fn test_extract_next_token() {
    assert_eq!(
        extract_next_token(&json!({"nextOffsetToken": "t1"})),
        Some("t1".to_string())
    );
    assert_eq!(
        extract_next_token(&json!({"nextToken": "t2"})),
        Some("t2".to_string())
    );
    assert_eq!(extract_next_token(&json!({"nextOffsetToken": ""})), None);
    assert_eq!(extract_next_token(&json!({"nextOffsetToken": null})), None);
    assert_eq!(
        extract_next_token(&json!({"nextOffsetToken": "t3", "complete": true})),
        None
    );
    assert_eq!(extract_next_token(&json!([{"id": 1}])), None);
}

#[test]
fn test_new_rejects_empty_key_and_bad_url() {
    let err = HttpRecordSource::new(DEFAULT_BASE_URL, "  ", Duration::from_secs(1), None)
        .unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));

    let err =
        HttpRecordSource::new("not a url", "key", Duration::from_secs(1), None).unwrap_err();
    assert!(matches!(err, Error::InvalidUrl(_)));
}

#[tokio::test]
async fn test_fetch_posts_limit_token_and_params() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/expense/get-expense-items"))
        .and(header("X-Api-Key", "key-1"))
        .and(body_json(json!({
            "limit": 25,
            "offsetToken": "abc",
            "expenseId": "e1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"itemId": "i1"}],
            "nextOffsetToken": "def"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = source_for(&server).await;
    let mut params = crate::types::JsonObject::new();
    params.insert("expenseId".to_string(), json!("e1"));
    let request = PageRequest::new(25)
        .token(Some("abc".to_string()))
        .params(params);

    let page = source
        .fetch("expense/get-expense-items", &request)
        .await
        .unwrap();

    assert_eq!(page.records.len(), 1);
    assert_eq!(page.next_token.as_deref(), Some("def"));
}

#[tokio::test]
async fn test_first_page_omits_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/get-users"))
        .and(body_json(json!({"limit": 100})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"userId": "u1"}])))
        .expect(1)
        .mount(&server)
        .await;

    let source = source_for(&server).await;
    let page = source
        .fetch("user/get-users", &PageRequest::new(100))
        .await
        .unwrap();
    let expected = json!({"userId": "u1"}).as_object().unwrap().clone();
    assert_eq!(page, Page::last(vec![expected]));
}

#[tokio::test]
async fn test_connect_validates_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status/user-info"))
        .and(header("X-Api-Key", "key-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"userId": "me"})))
        .expect(1)
        .mount(&server)
        .await;

    let source = source_for(&server).await;
    let info = source.connect().await.unwrap();
    assert_eq!(info["userId"], "me");
}

#[tokio::test]
async fn test_connect_rejected_key_is_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status/user-info"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;

    let source = source_for(&server).await;
    let err = source.connect().await.unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
}
