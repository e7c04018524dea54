//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::MAX_KEY_LENGTH;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The logical cache key
/// - `value`: Any JSON value
/// - `ttl`: Optional TTL in seconds (uses default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            ));
        }
        None
    }
}

/// Request body for POST /clear. Without a pattern everything is flushed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearRequest {
    /// Regular expression over logical keys
    #[serde(default)]
    pub pattern: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"key": "test", "value": {"v": 1}}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.key, "test");
        assert_eq!(req.value, json!({"v": 1}));
        assert!(req.ttl.is_none());
    }

    #[test]
    fn test_set_request_with_ttl() {
        let json = r#"{"key": "test", "value": "hello", "ttl": 60}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl, Some(60));
    }

    #[test]
    fn test_validate_keys() {
        let mut req = SetRequest {
            key: "".to_string(),
            value: json!(1),
            ttl: None,
        };
        assert!(req.validate().is_some());

        req.key = "x".repeat(MAX_KEY_LENGTH + 1);
        assert!(req.validate().is_some());

        req.key = "valid_key".to_string();
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_clear_request_pattern_optional() {
        let req: ClearRequest = serde_json::from_str("{}").unwrap();
        assert!(req.pattern.is_none());

        let req: ClearRequest = serde_json::from_str(r#"{"pattern": "^a:"}"#).unwrap();
        assert_eq!(req.pattern.as_deref(), Some("^a:"));
    }
}
