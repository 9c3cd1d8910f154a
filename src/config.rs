//! Pipeline configuration
//!
//! Settings are read from an optional YAML or JSON file and then overridden
//! from `FIDOO_*` environment variables. Every field has a default, so an
//! empty file (or no file at all) is a valid configuration as long as the
//! API key arrives from the environment.

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::http::RetryPolicy;
use crate::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::source::DEFAULT_BASE_URL;
use crate::types::{BackoffType, OutputFormat, OptionStringExt};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the API key
pub const ENV_API_KEY: &str = "FIDOO_API_KEY";
/// Environment variable overriding the API base URL
pub const ENV_API_URL: &str = "FIDOO_API_URL";
/// Environment variable overriding the request timeout in seconds
pub const ENV_TIMEOUT: &str = "FIDOO_TIMEOUT";
/// Environment variable overriding the retry budget
pub const ENV_MAX_RETRIES: &str = "FIDOO_MAX_RETRIES";
/// Environment variable enabling debug logging
pub const ENV_DEBUG: &str = "FIDOO_DEBUG";

/// Whether an environment value switches a flag on
pub fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ============================================================================
// Pipeline Config
// ============================================================================

/// Complete configuration of one extractor run
#[derive(Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// API root, including the version segment
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key; usually supplied through `FIDOO_API_KEY`
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Requested object types, in run order
    #[serde(
        default = "default_objects",
        deserialize_with = "deserialize_objects"
    )]
    pub objects: Vec<String>,

    /// Run the dependent phase
    #[serde(default = "default_true")]
    pub include_dependent: bool,

    /// Records requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Directory receiving exported tables
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Destination prefix written into table manifests
    #[serde(default = "default_output_bucket")]
    pub output_bucket: String,

    /// Export file format
    #[serde(default)]
    pub output_format: OutputFormat,

    /// DuckDB file for the staging store; in-memory when absent
    #[serde(default)]
    pub staging_path: Option<PathBuf>,

    /// Where the run summary is persisted; not persisted when absent
    #[serde(default)]
    pub state_file: Option<PathBuf>,

    /// Catalog file replacing the built-in one
    #[serde(default)]
    pub catalog: Option<PathBuf>,

    /// Transport settings
    #[serde(default)]
    pub http: HttpSettings,
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "****"))
            .field("objects", &self.objects)
            .field("include_dependent", &self.include_dependent)
            .field("page_size", &self.page_size)
            .field("output_dir", &self.output_dir)
            .field("output_bucket", &self.output_bucket)
            .field("output_format", &self.output_format)
            .field("staging_path", &self.staging_path)
            .field("state_file", &self.state_file)
            .field("catalog", &self.catalog)
            .field("http", &self.http)
            .finish()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            objects: default_objects(),
            include_dependent: true,
            page_size: DEFAULT_PAGE_SIZE,
            output_dir: default_output_dir(),
            output_bucket: default_output_bucket(),
            output_format: OutputFormat::default(),
            staging_path: None,
            state_file: None,
            catalog: None,
            http: HttpSettings::default(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_objects() -> Vec<String> {
    ["user", "card", "transaction", "expense"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out/tables")
}

fn default_output_bucket() -> String {
    "out.c-fidoo".to_string()
}

impl PipelineConfig {
    /// Load a config file; `.json` files are parsed as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config {}: {e}", path.display()))
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&contents)
        } else {
            Self::from_yaml(&contents)
        }
    }

    /// Parse YAML; an empty document yields the defaults
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse JSON; an empty document yields the defaults
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }

    /// Apply `FIDOO_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY).none_if_empty() {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup(ENV_API_URL).none_if_empty() {
            self.base_url = url;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT).none_if_empty() {
            self.http.timeout_secs = parse_number(ENV_TIMEOUT, &timeout)?;
        }
        if let Some(retries) = lookup(ENV_MAX_RETRIES).none_if_empty() {
            self.http.max_attempts = parse_number(ENV_MAX_RETRIES, &retries)?;
        }
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// The API key, or an auth failure when none was configured
    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::auth(format!("Missing API key. Set {ENV_API_KEY}.")))
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::invalid_value(
                "page_size",
                format!("must be between 1 and {MAX_PAGE_SIZE}, got {}", self.page_size),
            ));
        }
        if self.objects.is_empty() {
            return Err(Error::invalid_value("objects", "no object types requested"));
        }
        if self.http.timeout_secs == 0 {
            return Err(Error::invalid_value("http.timeout_secs", "must be positive"));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| Error::invalid_value("base_url", e.to_string()))?;
        Ok(())
    }

    /// Catalog named by the config, or the built-in one
    pub fn load_catalog(&self) -> Result<Catalog> {
        match &self.catalog {
            Some(path) => Catalog::from_file(path),
            None => Catalog::builtin(),
        }
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::invalid_value(field, format!("'{value}' is not a number")))
}

/// Split a comma-separated object list, dropping blanks
pub fn parse_object_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn deserialize_objects<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ObjectList {
        List(Vec<String>),
        Csv(String),
    }

    Ok(match ObjectList::deserialize(deserializer)? {
        ObjectList::List(items) => items
            .iter()
            .flat_map(|item| parse_object_list(item))
            .collect(),
        ObjectList::Csv(value) => parse_object_list(&value),
    })
}

// ============================================================================
// HTTP Settings
// ============================================================================

/// Transport and retry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound on any retry delay in seconds
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,

    /// Request rate cap; 0 disables throttling
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// How retry delays grow between attempts
    #[serde(default)]
    pub backoff: BackoffType,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_secs: default_max_backoff_secs(),
            requests_per_second: default_requests_per_second(),
            backoff: BackoffType::default(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_secs() -> u64 {
    60
}

fn default_requests_per_second() -> u32 {
    5
}

impl HttpSettings {
    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Retry policy built from these settings
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
        )
        .max_delay(Duration::from_secs(self.max_backoff_secs))
        .backoff(self.backoff)
    }
}
