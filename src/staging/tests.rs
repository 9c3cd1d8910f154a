//! Tests for the staging module

use super::*;
use crate::error::Error;
use crate::types::{JsonValue, Record};
use pretty_assertions::assert_eq;
use serde_json::json;

fn records(value: JsonValue) -> Vec<Record> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect()
}

#[test]
fn test_create_and_read_back() {
    let mut store = DuckDbStore::in_memory().unwrap();
    let input = records(json!([
        {"userId": "u1", "age": 30, "active": true, "score": 1.5},
        {"userId": "u2", "age": null, "active": false, "score": 2}
    ]));

    let stored = store.create_or_replace("user", &input).unwrap();

    assert_eq!(stored, 2);
    assert_eq!(store.row_count("user").unwrap(), 2);
    assert_eq!(
        store.columns("user").unwrap(),
        vec!["userId", "age", "active", "score"]
    );

    let rows = store.read_table("user").unwrap();
    assert_eq!(rows[0]["userId"], json!("u1"));
    assert_eq!(rows[0]["age"], json!(30));
    assert_eq!(rows[0]["active"], json!(true));
    assert_eq!(rows[1]["age"], JsonValue::Null);
    assert_eq!(rows[1]["score"], json!(2.0));
}

#[test]
fn test_sparse_records_fill_nulls() {
    let mut store = DuckDbStore::in_memory().unwrap();
    let input = records(json!([{"id": 1, "a": "x"}, {"id": 2, "b": "y"}]));

    store.create_or_replace("card", &input).unwrap();

    let rows = store.read_table("card").unwrap();
    assert_eq!(
        JsonValue::Array(rows.into_iter().map(JsonValue::Object).collect()),
        json!([
            {"id": 1, "a": "x", "b": null},
            {"id": 2, "a": null, "b": "y"}
        ])
    );
}

#[test]
fn test_replace_overwrites() {
    let mut store = DuckDbStore::in_memory().unwrap();
    store
        .create_or_replace("expense", &records(json!([{"id": 1}, {"id": 2}])))
        .unwrap();
    store
        .create_or_replace("expense", &records(json!([{"id": 3, "extra": "e"}])))
        .unwrap();

    assert_eq!(store.row_count("expense").unwrap(), 1);
    assert_eq!(store.columns("expense").unwrap(), vec!["id", "extra"]);
}

#[test]
fn test_empty_records_remove_table() {
    let mut store = DuckDbStore::in_memory().unwrap();
    store
        .create_or_replace("receipt", &records(json!([{"id": 1}])))
        .unwrap();

    assert_eq!(store.create_or_replace("receipt", &[]).unwrap(), 0);
    assert!(!store.has_table("receipt").unwrap());
}

#[test]
fn test_list_and_has_tables() {
    let mut store = DuckDbStore::in_memory().unwrap();
    store
        .create_or_replace("user__tags", &records(json!([{"parent_id": "u1", "idx": 0, "value": "a"}])))
        .unwrap();
    store
        .create_or_replace("user", &records(json!([{"id": "u1"}])))
        .unwrap();

    assert_eq!(store.list_tables().unwrap(), vec!["user", "user__tags"]);
    assert!(store.has_table("user").unwrap());
    assert!(!store.has_table("card").unwrap());

    store.drop_table("user__tags").unwrap();
    assert_eq!(store.list_tables().unwrap(), vec!["user"]);
}

#[test]
fn test_distinct_values_first_seen_order() {
    let mut store = DuckDbStore::in_memory().unwrap();
    let input = records(json!([
        {"expenseId": "e3"},
        {"expenseId": "e1"},
        {"expenseId": null},
        {"expenseId": "e3"},
        {"expenseId": "e2"}
    ]));
    store.create_or_replace("expense", &input).unwrap();

    assert_eq!(
        store.distinct_values("expense", "expenseId").unwrap(),
        vec![json!("e3"), json!("e1"), json!("e2")]
    );
}

#[test]
fn test_distinct_values_unknown_column() {
    let mut store = DuckDbStore::in_memory().unwrap();
    store
        .create_or_replace("expense", &records(json!([{"id": 1}])))
        .unwrap();

    let err = store.distinct_values("expense", "expenseId").unwrap_err();
    assert!(matches!(err, Error::Staging { .. }));
}

#[test]
fn test_reserved_word_names_are_quoted() {
    let mut store = DuckDbStore::in_memory().unwrap();
    let input = records(json!([{"select": 1, "order": "x", "user": true}]));

    store.create_or_replace("user", &input).unwrap();

    let rows = store.read_table("user").unwrap();
    assert_eq!(rows[0]["order"], json!("x"));
}

#[test]
fn test_any_field_name_is_a_valid_table_name() {
    let mut store = DuckDbStore::in_memory().unwrap();
    let input = records(json!([{"parent_id": "u1", "code": "X"}]));

    for name in ["user__cost-center", "user__meta.data", "user__střed", "bad name; DROP"] {
        store.create_or_replace(name, &input).unwrap();
        assert_eq!(store.row_count(name).unwrap(), 1);
    }

    assert_eq!(
        store.list_tables().unwrap(),
        vec!["bad name; DROP", "user__cost-center", "user__meta.data", "user__střed"]
    );
    assert_eq!(
        store.read_table("user__cost-center").unwrap()[0]["code"],
        json!("X")
    );
}

#[test]
fn test_table_names_are_case_sensitive() {
    let mut store = DuckDbStore::in_memory().unwrap();
    store
        .create_or_replace("user__tags", &records(json!([{"value": "a"}])))
        .unwrap();
    store
        .create_or_replace("user__Tags", &records(json!([{"value": "B"}, {"value": "C"}])))
        .unwrap();

    assert_eq!(store.list_tables().unwrap(), vec!["user__Tags", "user__tags"]);
    assert_eq!(store.row_count("user__tags").unwrap(), 1);
    assert_eq!(store.row_count("user__Tags").unwrap(), 2);

    store.drop_table("user__Tags").unwrap();
    assert_eq!(store.list_tables().unwrap(), vec!["user__tags"]);
}

#[test]
fn test_column_names_are_case_sensitive() {
    let mut store = DuckDbStore::in_memory().unwrap();
    let input = records(json!([{"id": 1, "Id": "legacy", "cost-center": "X"}]));

    store.create_or_replace("card", &input).unwrap();

    assert_eq!(store.columns("card").unwrap(), vec!["id", "Id", "cost-center"]);
    let rows = store.read_table("card").unwrap();
    assert_eq!(
        JsonValue::Object(rows[0].clone()),
        json!({"id": 1, "Id": "legacy", "cost-center": "X"})
    );
    assert_eq!(store.distinct_values("card", "Id").unwrap(), vec![json!("legacy")]);
}

#[test]
fn test_missing_table_is_an_error() {
    let store = DuckDbStore::in_memory().unwrap();
    assert!(matches!(
        store.row_count("user").unwrap_err(),
        Error::Staging { .. }
    ));
    assert!(store.columns("user").unwrap().is_empty());
}

#[test]
fn test_mixed_values_stored_as_text() {
    let mut store = DuckDbStore::in_memory().unwrap();
    store
        .create_or_replace("vehicle", &records(json!([{"code": 1}, {"code": "A1"}])))
        .unwrap();

    let rows = store.read_table("vehicle").unwrap();
    assert_eq!(rows[0]["code"], json!("1"));
    assert_eq!(rows[1]["code"], json!("A1"));
}

#[test]
fn test_file_backed_store_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("staging.duckdb");

    {
        let mut store = DuckDbStore::open(&path).unwrap();
        store
            .create_or_replace("project", &records(json!([{"projectId": "p1"}])))
            .unwrap();
    }

    let store = DuckDbStore::open(&path).unwrap();
    assert_eq!(store.row_count("project").unwrap(), 1);
    assert!(store.location().ends_with("staging.duckdb"));
}
