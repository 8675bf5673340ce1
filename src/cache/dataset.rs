//! Cross-tool dataset handoff store.
//!
//! Some tools are conversation-agnostic by construction: a query tool
//! produces a dataset that a later rendering or statistics tool consumes by
//! name, in the same process, without caring which conversation asked. The
//! [`DatasetCache`] carries those payloads so they never take the detour
//! through a conversation's output log.
//!
//! Construct one per process and inject it into every tool that needs it;
//! clones are cheap and share the same underlying map, so test isolation is
//! a matter of constructing a fresh cache. Entries have no TTL — they live
//! until [`remove`](DatasetCache::remove) or [`clear`](DatasetCache::clear).

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Typed payload for a handed-off dataset.
///
/// Serialized as a `{"type": ..., "content": ...}` discriminated union so
/// payloads survive a trip through JSON-speaking hosts unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "camelCase")]
pub enum DatasetPayload {
    /// A GeoJSON document (FeatureCollection, Feature, or bare geometry).
    GeoJson(Value),
    /// Column-oriented rows: column name → values.
    Columnar(HashMap<String, Vec<Value>>),
    /// Row-object arrays, one JSON object per row.
    Rows(Vec<Value>),
    /// A raw Arrow IPC buffer.
    Arrow(Vec<u8>),
    /// A spatial-weights matrix, one row of weights per observation.
    Weights(Vec<Vec<f64>>),
    /// A raw string payload.
    Text(String),
    /// Arbitrary JSON that fits none of the other variants.
    Json(Value),
}

/// Process-wide dataset handoff store keyed by dataset name.
///
/// Re-inserting a name overwrites its payload; concurrent writers to the
/// same name are last-writer-wins. Reads return clones, never references
/// into the map.
///
/// # Example
///
/// ```
/// use convocache::{DatasetCache, DatasetPayload};
/// use serde_json::json;
///
/// let cache = DatasetCache::new();
/// cache.set("queryResult", DatasetPayload::Rows(vec![json!({"id": 1})]));
///
/// let handoff = cache.clone(); // shares the same map
/// assert!(handoff.get("queryResult").is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DatasetCache {
    datasets: Arc<DashMap<String, DatasetPayload>>,
}

impl DatasetCache {
    /// Create an empty dataset cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `payload` under `name`, replacing any existing entry.
    pub fn set(&self, name: impl Into<String>, payload: DatasetPayload) {
        self.datasets.insert(name.into(), payload);
    }

    /// A clone of the payload stored under `name`, if any.
    pub fn get(&self, name: &str) -> Option<DatasetPayload> {
        self.datasets.get(name).map(|entry| entry.value().clone())
    }

    /// Remove `name`. Returns whether an entry existed.
    pub fn remove(&self, name: &str) -> bool {
        self.datasets.remove(name).is_some()
    }

    /// Number of stored datasets.
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    /// Whether the cache holds no datasets.
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Drop every dataset.
    pub fn clear(&self) {
        self.datasets.clear();
    }

    /// All stored dataset names, sorted for stable output.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.datasets.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }
}
