//! Fidoo REST API record source

use super::types::{Page, PageRequest, RecordSource};
use crate::auth::AuthConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RateLimiterConfig};
use crate::types::{JsonObject, JsonValue, Record};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// Production API root
pub const DEFAULT_BASE_URL: &str = "https://api.fidoo.com/v2";

/// Endpoint used to validate credentials
const USER_INFO_ENDPOINT: &str = "status/user-info";

/// Keys tried, in order, for the record list of a response object
const RECORD_KEYS: &[&str] = &[
    "root", "items", "Items", "data", "Data", "results", "Results", "Records", "records",
];

/// Keys tried, in order, for the continuation token
const TOKEN_KEYS: &[&str] = &["nextOffsetToken", "nextToken"];

/// Record source that POSTs `{limit, offsetToken, ...params}` to `{base_url}/{endpoint}`
#[derive(Debug)]
pub struct HttpRecordSource {
    client: HttpClient,
}

impl HttpRecordSource {
    /// Build a source authenticated with the `X-Api-Key` header
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        requests_per_second: Option<u32>,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::auth("API key is empty"));
        }
        url::Url::parse(base_url)?;

        let mut builder = HttpClientConfig::builder()
            .base_url(base_url)
            .timeout(timeout);
        builder = match requests_per_second {
            Some(rps) if rps > 0 => builder.rate_limit(RateLimiterConfig::per_second(rps)),
            Some(_) => builder.no_rate_limit(),
            None => builder,
        };

        let client = HttpClient::with_auth(builder.build(), AuthConfig::fidoo_api_key(api_key))?;
        Ok(Self { client })
    }

    /// Wrap an already configured client
    pub fn from_client(client: HttpClient) -> Self {
        Self { client }
    }

    /// Validate credentials against the user-info endpoint.
    ///
    /// Any rejection there is reported as [`Error::Auth`].
    pub async fn connect(&self) -> Result<JsonValue> {
        match self.client.get_json(USER_INFO_ENDPOINT).await {
            Ok(info) => {
                info!(
                    base_url = self.client.base_url().unwrap_or_default(),
                    "Credentials accepted"
                );
                Ok(info)
            }
            Err(e @ Error::Auth { .. }) => Err(e),
            Err(Error::HttpStatus { status, body }) if status < 500 => Err(Error::auth(format!(
                "credential check returned {status}: {body}"
            ))),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    async fn fetch(&self, endpoint: &str, request: &PageRequest) -> Result<Page> {
        let mut body = JsonObject::new();
        body.insert("limit".to_string(), json!(request.limit));
        if let Some(token) = &request.token {
            body.insert("offsetToken".to_string(), json!(token));
        }
        for (key, value) in &request.params {
            body.insert(key.clone(), value.clone());
        }

        let response = self
            .client
            .post_json(endpoint, JsonValue::Object(body))
            .await?;

        let next_token = extract_next_token(&response);
        let records = extract_records(response);
        debug!(
            endpoint,
            records = records.len(),
            has_next = next_token.is_some(),
            "Fetched page"
        );

        Ok(Page::new(records, next_token))
    }
}

/// Pull the record list out of a response body.
///
/// A top-level array is the record list. For an object, the first non-empty
/// value among the well-known keys is used, falling back to the only
/// array-valued field when none of them is present. Scalars in a record list
/// are wrapped as `{"value": x}`.
pub fn extract_records(body: JsonValue) -> Vec<Record> {
    match body {
        JsonValue::Array(items) => into_records(items),
        JsonValue::Object(mut map) => {
            let known = RECORD_KEYS
                .iter()
                .find(|key| map.get(**key).is_some_and(is_present))
                .and_then(|key| map.remove(*key));

            let found = known.or_else(|| {
                let array_keys: Vec<String> = map
                    .iter()
                    .filter(|(_, v)| v.is_array())
                    .map(|(k, _)| k.clone())
                    .collect();
                match array_keys.as_slice() {
                    [only] => map.remove(only),
                    _ => None,
                }
            });

            match found {
                Some(JsonValue::Array(items)) => into_records(items),
                Some(JsonValue::Object(single)) => vec![single],
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

/// Read the continuation token from a response body.
///
/// Empty strings and an explicit `"complete": true` both mean "no more pages".
pub fn extract_next_token(body: &JsonValue) -> Option<String> {
    let map = body.as_object()?;
    if map.get("complete").and_then(JsonValue::as_bool) == Some(true) {
        return None;
    }

    TOKEN_KEYS
        .iter()
        .filter_map(|key| map.get(*key))
        .find_map(|value| match value {
            JsonValue::String(s) if !s.trim().is_empty() => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

fn is_present(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Array(items) => !items.is_empty(),
        JsonValue::Object(map) => !map.is_empty(),
        _ => true,
    }
}

fn into_records(items: Vec<JsonValue>) -> Vec<Record> {
    items
        .into_iter()
        .filter(|item| !item.is_null())
        .map(|item| match item {
            JsonValue::Object(map) => map,
            scalar => {
                let mut map = Record::new();
                map.insert("value".to_string(), scalar);
                map
            }
        })
        .collect()
}
