//! Auth configuration types

/// Header the Fidoo API reads the key from
pub const FIDOO_API_KEY_HEADER: &str = "X-Api-Key";

/// API key credentials sent as a request header
#[derive(Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Header carrying the key
    pub header_name: String,
    /// The API key value
    pub value: String,
}

impl AuthConfig {
    /// API key sent in header `header_name`
    pub fn api_key(header_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
            value: value.into(),
        }
    }

    /// API key sent in the `X-Api-Key` header
    pub fn fidoo_api_key(value: impl Into<String>) -> Self {
        Self::api_key(FIDOO_API_KEY_HEADER, value)
    }
}

// Secrets never reach the logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("header_name", &self.header_name)
            .field("value", &"****")
            .finish()
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_fidoo_api_key() {
        let config = AuthConfig::fidoo_api_key("secret");
        assert_eq!(config.header_name, "X-Api-Key");
        assert_eq!(config.value, "secret");
    }

    #[test]
    fn test_debug_masks_secret() {
        let rendered = format!("{:?}", AuthConfig::fidoo_api_key("super-secret"));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("****"));
        assert!(rendered.contains("X-Api-Key"));
    }
}
