//! Client configuration.
//!
//! Every field has a default so a host page may pass an empty object (or
//! nothing at all) and override only what it needs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of images requested per page.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Default upper bound for a single uploaded file (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Default quality factor used when re-encoding an edited image.
pub const DEFAULT_EXPORT_QUALITY: f32 = 0.9;

/// Default local storage key holding the persisted session.
pub const DEFAULT_AUTH_STORAGE_KEY: &str = "auth-storage";

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration text is not valid JSON for this schema
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value outside its accepted range
    #[error("Invalid value for {field}: {reason}")]
    OutOfRange { field: &'static str, reason: String },
}

/// Settings shared by the API client, the stores and the previewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Prefix prepended to every request path (empty = same origin).
    pub api_base_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u32,
    /// Images per page.
    pub page_limit: u32,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: u64,
    /// Accepted upload types: MIME types, `type/*` wildcards or extensions.
    pub allowed_upload_types: Vec<String>,
    /// JPEG quality factor for exported edits (0.0 exclusive to 1.0).
    pub export_quality: f32,
    /// Local storage key for the persisted session.
    pub auth_storage_key: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            timeout_ms: 30_000,
            page_limit: DEFAULT_PAGE_LIMIT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_upload_types: vec!["image/*".to_string()],
            export_quality: DEFAULT_EXPORT_QUALITY,
            auth_storage_key: DEFAULT_AUTH_STORAGE_KEY.to_string(),
        }
    }
}

impl ClientConfig {
    /// Parse a configuration from JSON text and validate it.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every field is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_limit == 0 {
            return Err(ConfigError::OutOfRange {
                field: "pageLimit",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::OutOfRange {
                field: "timeoutMs",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.export_quality > 0.0 && self.export_quality <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "exportQuality",
                reason: format!("{} is not in (0, 1]", self.export_quality),
            });
        }
        if self.auth_storage_key.is_empty() {
            return Err(ConfigError::OutOfRange {
                field: "authStorageKey",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Join the base URL and a request path.
    pub fn url_for(&self, path: &str) -> String {
        let base = self.api_base_url.trim_end_matches('/');
        format!("{base}{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_yields_defaults() {
        let config = ClientConfig::from_json("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.page_limit, 20);
        assert_eq!(config.auth_storage_key, "auth-storage");
    }

    #[test]
    fn test_partial_override() {
        let config =
            ClientConfig::from_json(r#"{"apiBaseUrl": "https://img.example", "pageLimit": 50}"#)
                .unwrap();
        assert_eq!(config.api_base_url, "https://img.example");
        assert_eq!(config.page_limit, 50);
        assert_eq!(config.timeout_ms, 30_000);
    }

    #[test]
    fn test_zero_page_limit_rejected() {
        let result = ClientConfig::from_json(r#"{"pageLimit": 0}"#);
        assert!(matches!(
            result,
            Err(ConfigError::OutOfRange { field: "pageLimit", .. })
        ));
    }

    #[test]
    fn test_export_quality_range() {
        assert!(ClientConfig::from_json(r#"{"exportQuality": 0.0}"#).is_err());
        assert!(ClientConfig::from_json(r#"{"exportQuality": 1.5}"#).is_err());
        assert!(ClientConfig::from_json(r#"{"exportQuality": 1.0}"#).is_ok());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            ClientConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_url_for_trims_trailing_slash() {
        let mut config = ClientConfig::default();
        assert_eq!(config.url_for("/api/images"), "/api/images");
        config.api_base_url = "https://img.example/".to_string();
        assert_eq!(config.url_for("/api/images"), "https://img.example/api/images");
    }
}
