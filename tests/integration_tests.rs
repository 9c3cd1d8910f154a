//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: Fidoo API → pagination → normalization →
//! DuckDB staging → CSV/Parquet output

use fidoo_extractor::catalog::Catalog;
use fidoo_extractor::engine::{Pipeline, PipelineSettings};
use fidoo_extractor::error::Error;
use fidoo_extractor::http::RetryPolicy;
use fidoo_extractor::output::{CsvSink, ParquetSink};
use fidoo_extractor::pagination::PaginatedFetcher;
use fidoo_extractor::source::HttpRecordSource;
use fidoo_extractor::staging::DuckDbStore;
use fidoo_extractor::types::JsonObject;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-key";

fn source(server: &MockServer) -> HttpRecordSource {
    HttpRecordSource::new(&server.uri(), API_KEY, Duration::from_secs(5), Some(0)).unwrap()
}

fn settings(output: &Path) -> PipelineSettings {
    PipelineSettings::new()
        .with_page_size(2)
        .with_output_dir(output)
        .with_retry(RetryPolicy::new(3, Duration::from_millis(1)))
}

fn objects(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

fn read(path: impl AsRef<Path>) -> String {
    std::fs::read_to_string(path).unwrap()
}

/// Two pages of users, the second reached through `offsetToken`
async fn mount_users(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/user/get-users"))
        .and(header("X-Api-Key", API_KEY))
        .and(body_partial_json(json!({"offsetToken": "page-2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userList": [
                {"userId": "u3", "firstName": "Cyril"}
            ],
            "complete": true
        })))
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/user/get-users"))
        .and(header("X-Api-Key", API_KEY))
        .and(body_partial_json(json!({"limit": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userList": [
                {"userId": "u1", "firstName": "Alena", "tags": ["admin", "ops"]},
                {"userId": "u2", "firstName": "Bohdan", "tags": ["ops"]}
            ],
            "nextOffsetToken": "page-2"
        })))
        .mount(server)
        .await;
}

// ============================================================================
// Connection Tests
// ============================================================================

#[tokio::test]
async fn test_connect_sends_api_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status/user-info"))
        .and(header("X-Api-Key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "email": "ops@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let info = source(&server).connect().await.unwrap();
    assert_eq!(info["email"], "ops@example.com");
}

#[tokio::test]
async fn test_connect_rejected_key_is_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status/user-info"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = source(&server).connect().await.unwrap_err();
    assert!(matches!(err, Error::Auth { .. }), "got {err:?}");
}

#[test]
fn test_empty_api_key_rejected() {
    let err = HttpRecordSource::new("http://localhost", "  ", Duration::from_secs(1), None)
        .unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
}

// ============================================================================
// Pagination Tests
// ============================================================================

#[tokio::test]
async fn test_fetcher_follows_offset_token() {
    let server = MockServer::start().await;
    mount_users(&server).await;

    let source = source(&server);
    let fetcher = PaginatedFetcher::new(&source, RetryPolicy::new(3, Duration::from_millis(1)));
    let records = fetcher
        .collect_all("user/get-users", 2, JsonObject::new())
        .await
        .unwrap();

    let ids: Vec<&str> = records
        .iter()
        .map(|r| r["userId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["u1", "u2", "u3"]);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_fetcher_retries_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/card/get-cards"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/card/get-cards"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cards": [{"cardId": "c1"}]
        })))
        .mount(&server)
        .await;

    let source = source(&server);
    let fetcher = PaginatedFetcher::new(&source, RetryPolicy::new(3, Duration::from_millis(1)));
    let records = fetcher
        .collect_all("card/get-cards", 100, JsonObject::new())
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

// ============================================================================
// Pipeline Tests
// ============================================================================

#[tokio::test]
async fn test_pipeline_exports_users_and_dependent_cards() {
    let server = MockServer::start().await;
    mount_users(&server).await;

    for (user, card) in [("u1", "c1"), ("u2", "c2")] {
        Mock::given(method("POST"))
            .and(path("/card/get-user-cards"))
            .and(body_partial_json(json!({"userId": user})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cardList": [{"cardId": card, "state": "active"}],
                "complete": true
            })))
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/card/get-user-cards"))
        .and(body_partial_json(json!({"userId": "u3"})))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let mut pipeline = Pipeline::new(
        Arc::new(source(&server)),
        Box::new(DuckDbStore::in_memory().unwrap()),
        Box::new(CsvSink::new("out.c-fidoo")),
        Catalog::builtin().unwrap(),
    )
    .with_settings(settings(dir.path()));

    let summary = pipeline.run(&objects(&["user"])).await.unwrap();

    assert_eq!(
        summary.object_counts,
        vec![("user".to_string(), 3), ("user_card".to_string(), 2)]
    );
    assert!(summary.failures.is_empty());

    let names: Vec<&str> = summary.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["user", "user__tags", "user_card"]);

    assert_eq!(
        read(dir.path().join("user.csv")),
        "userId,firstName\r\nu1,Alena\r\nu2,Bohdan\r\nu3,Cyril\r\n"
    );
    assert_eq!(
        read(dir.path().join("user__tags.csv")),
        "parent_id,idx,value\r\nu1,0,admin\r\nu1,1,ops\r\nu2,0,ops\r\n"
    );

    let cards = read(dir.path().join("user_card.csv"));
    let mut lines = cards.lines();
    let header_line = lines.next().unwrap();
    assert!(header_line.contains("cardId"));
    assert!(header_line.contains("_source_userId"));
    assert_eq!(lines.count(), 2);

    let manifest: serde_json::Value =
        serde_json::from_str(&read(dir.path().join("user.csv.manifest"))).unwrap();
    assert_eq!(manifest["destination"], "out.c-fidoo.user");
    assert_eq!(manifest["incremental"], false);
    assert_eq!(manifest["primary_key"], json!(["userId"]));
}

#[tokio::test]
async fn test_pipeline_isolates_failing_object() {
    let server = MockServer::start().await;
    mount_users(&server).await;

    Mock::given(method("POST"))
        .and(path("/expense/get-expenses"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let mut pipeline = Pipeline::new(
        Arc::new(source(&server)),
        Box::new(DuckDbStore::in_memory().unwrap()),
        Box::new(CsvSink::default()),
        Catalog::builtin().unwrap(),
    )
    .with_settings(settings(dir.path()).with_dependent(false));

    let summary = pipeline
        .run(&objects(&["expense", "user"]))
        .await
        .unwrap();

    assert_eq!(summary.count("expense"), Some(0));
    assert_eq!(summary.count("user"), Some(3));
    assert!(summary.failed("expense"));
    assert!(!dir.path().join("expense.csv").exists());
    assert!(dir.path().join("user.csv").exists());
}

#[tokio::test]
async fn test_pipeline_writes_parquet() {
    let server = MockServer::start().await;
    mount_users(&server).await;

    let dir = tempdir().unwrap();
    let mut pipeline = Pipeline::new(
        Arc::new(source(&server)),
        Box::new(DuckDbStore::in_memory().unwrap()),
        Box::new(ParquetSink::default()),
        Catalog::builtin().unwrap(),
    )
    .with_settings(settings(dir.path()).with_dependent(false));

    let summary = pipeline.run(&objects(&["user"])).await.unwrap();

    let table = summary.table("user").unwrap();
    assert_eq!(table.rows, 3);
    assert_eq!(table.path, dir.path().join("user.parquet"));

    let file = std::fs::File::open(&table.path).unwrap();
    let reader = parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .build()
        .unwrap();
    let rows: usize = reader.map(|batch| batch.unwrap().num_rows()).sum();
    assert_eq!(rows, 3);
}
