//! Conversation-registry configuration.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case
//! (`#[serde(rename_all = "camelCase")]`). Every field carries a default, so
//! a partial config file — or plain [`CacheConfig::default()`] — is always
//! usable.
//!
//! Out-of-range values are normalized by clamping when the registry is
//! constructed, never rejected: `max_conversations` is raised to at least 1
//! and `cleanup_probability` is clamped into `[0, 1]`. A `ttl_ms` of zero is
//! allowed and means "evict on the next cleanup pass".

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default hard capacity bound on live conversations.
pub const DEFAULT_MAX_CONVERSATIONS: usize = 100;

/// Default entry time-to-live: two hours.
pub const DEFAULT_TTL_MS: u64 = 2 * 60 * 60 * 1000;

/// Default probability that an access runs a cleanup pass first.
pub const DEFAULT_CLEANUP_PROBABILITY: f64 = 0.10;

/// Configuration for [`ConversationCache`](crate::cache::ConversationCache).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    /// Hard capacity bound on live conversations. After a cleanup pass the
    /// registry never holds more than this many entries.
    pub max_conversations: usize,
    /// Entry time-to-live in milliseconds, measured from last access.
    pub ttl_ms: u64,
    /// Probability in `[0, 1]` that an access runs a cleanup pass first.
    /// `1.0` cleans on every access; `0.0` disables opportunistic cleanup
    /// (only `force_cleanup` evicts).
    pub cleanup_probability: f64,
    /// Emit `tracing` debug events for entry creation, eviction, and
    /// cleanup passes.
    pub enable_logging: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_conversations: DEFAULT_MAX_CONVERSATIONS,
            ttl_ms: DEFAULT_TTL_MS,
            cleanup_probability: DEFAULT_CLEANUP_PROBABILITY,
            enable_logging: false,
        }
    }
}

impl CacheConfig {
    /// Load configuration from a JSON file.
    ///
    /// Missing fields take their defaults; unknown fields are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON for
    /// this schema.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: CacheConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Clamp out-of-range values instead of rejecting them.
    ///
    /// A zero capacity would evict every entry on every cleanup pass, so it
    /// is raised to 1; probabilities outside `[0, 1]` (including NaN) are
    /// pinned into range.
    pub(crate) fn normalized(mut self) -> Self {
        self.max_conversations = self.max_conversations.max(1);
        self.cleanup_probability = if self.cleanup_probability.is_nan() {
            0.0
        } else {
            self.cleanup_probability.clamp(0.0, 1.0)
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.max_conversations, 100);
        assert_eq!(config.ttl_ms, 7_200_000);
        assert!((config.cleanup_probability - 0.10).abs() < f64::EPSILON);
        assert!(!config.enable_logging);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: CacheConfig = serde_json::from_str(r#"{"maxConversations": 5}"#).unwrap();
        assert_eq!(config.max_conversations, 5);
        assert_eq!(config.ttl_ms, DEFAULT_TTL_MS);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, r#"{"ttlMs": 1000, "cleanupProbability": 1.0}"#).unwrap();

        let config = CacheConfig::load(&path).unwrap();
        assert_eq!(config.ttl_ms, 1000);
        assert!((config.cleanup_probability - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.max_conversations, DEFAULT_MAX_CONVERSATIONS);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = CacheConfig::load("/nonexistent/cache.json");
        assert!(matches!(result, Err(crate::error::CacheError::Io(_))));
    }

    #[test]
    fn test_load_invalid_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{not json").unwrap();

        let result = CacheConfig::load(&path);
        assert!(matches!(result, Err(crate::error::CacheError::Parse(_))));
    }

    #[test]
    fn test_normalized_clamps() {
        let config = CacheConfig {
            max_conversations: 0,
            cleanup_probability: 1.5,
            ..CacheConfig::default()
        }
        .normalized();
        assert_eq!(config.max_conversations, 1);
        assert!((config.cleanup_probability - 1.0).abs() < f64::EPSILON);

        let config = CacheConfig {
            cleanup_probability: -0.3,
            ..CacheConfig::default()
        }
        .normalized();
        assert!(config.cleanup_probability.abs() < f64::EPSILON);
    }

    #[test]
    fn test_serde_round_trip_camel_case() {
        let json = serde_json::to_value(CacheConfig::default()).unwrap();
        assert!(json.get("maxConversations").is_some());
        assert!(json.get("ttlMs").is_some());
        assert!(json.get("cleanupProbability").is_some());
        assert!(json.get("enableLogging").is_some());
    }
}
