//! Conversation registry with TTL expiry and LRU capacity eviction.
//!
//! [`ConversationCache`] owns one [`ToolOutputManager`] per conversation id.
//! Entries expire after a configurable idle TTL and the registry never holds
//! more than `max_conversations` entries after a cleanup pass; the oldest
//! entries by last access are evicted first.
//!
//! Cleanup is *opportunistic*: each access runs a pass with probability
//! `cleanup_probability`, amortizing eviction cost across accesses so the
//! registry works inside hosts that have no background scheduler (short-lived
//! request handlers). Hosts that do run a scheduler can call
//! [`force_cleanup`](ConversationCache::force_cleanup) from their own
//! interval task instead and set the probability to `0.0`.
//!
//! Eviction silently drops an entry's buffered tool outputs. The expiry
//! horizon is hours, not seconds, so a request that still needs its session's
//! outputs will have consumed them long before its conversation can expire.
//! Callers holding an `Arc` to an evicted manager keep a working, now
//! orphaned, manager; re-accessing the id creates a brand-new one — history
//! is not recoverable.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::CacheConfig;
use crate::output::ToolOutputManager;

/// Registry-internal record for one conversation.
struct ConversationEntry {
    manager: Arc<ToolOutputManager>,
    created_at: DateTime<Utc>,
    last_access: DateTime<Utc>,
}

/// Keyed collection of per-conversation output managers with TTL expiry, a
/// hard capacity bound, and probabilistic opportunistic cleanup.
///
/// # Example
///
/// ```
/// use convocache::{CacheConfig, ConversationCache};
///
/// # tokio_test::block_on(async {
/// let cache = ConversationCache::new(CacheConfig::default());
/// let manager = cache.tool_output_manager("conversation-1");
/// let session = manager.start_session().await;
/// // ... tool calls append outputs ...
/// manager.end_session().await;
/// # });
/// ```
pub struct ConversationCache {
    // Guarded by a plain mutex: every critical section is a short,
    // non-suspending map operation, and the guard is never held across an
    // `.await` (`status()` snapshots entries first).
    entries: Mutex<HashMap<String, ConversationEntry>>,
    config: CacheConfig,
}

impl ConversationCache {
    /// Create a registry with the given configuration.
    ///
    /// Out-of-range values are clamped, not rejected — see
    /// [`CacheConfig`](crate::config::CacheConfig).
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            config: config.normalized(),
        }
    }

    /// Create a registry with the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Return the output manager for `conversation_id`, creating it on first
    /// access.
    ///
    /// With probability `cleanup_probability` a cleanup pass runs first. The
    /// entry's last-access timestamp is refreshed, and the same `Arc` is
    /// returned for the same id until the entry is evicted.
    pub fn tool_output_manager(&self, conversation_id: &str) -> Arc<ToolOutputManager> {
        if rand::random::<f64>() < self.config.cleanup_probability {
            self.force_cleanup();
        }

        let now = Utc::now();
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .entry(conversation_id.to_string())
            .or_insert_with(|| {
                if self.config.enable_logging {
                    debug!(conversation_id, "creating conversation entry");
                }
                ConversationEntry {
                    manager: Arc::new(ToolOutputManager::new()),
                    created_at: now,
                    last_access: now,
                }
            });
        entry.last_access = now;
        Arc::clone(&entry.manager)
    }

    /// Run a cleanup pass unconditionally: TTL expiry first, then LRU
    /// eviction down to the capacity bound.
    ///
    /// This is the deterministic counterpart of the probabilistic on-access
    /// pass; tests and hosts with a background scheduler drive it directly.
    pub fn force_cleanup(&self) {
        let now = Utc::now();
        let ttl = Duration::milliseconds(self.config.ttl_ms.min(i64::MAX as u64) as i64);
        let enable_logging = self.config.enable_logging;

        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();

        entries.retain(|conversation_id, entry| {
            let keep = now - entry.last_access <= ttl;
            if !keep && enable_logging {
                debug!(conversation_id = %conversation_id, "evicting expired conversation");
            }
            keep
        });

        if entries.len() > self.config.max_conversations {
            let mut by_age: Vec<(String, DateTime<Utc>)> = entries
                .iter()
                .map(|(id, entry)| (id.clone(), entry.last_access))
                .collect();
            by_age.sort_by_key(|(_, last_access)| *last_access);

            let excess = entries.len() - self.config.max_conversations;
            for (conversation_id, _) in by_age.into_iter().take(excess) {
                entries.remove(&conversation_id);
                if enable_logging {
                    debug!(conversation_id = %conversation_id, "evicting conversation over capacity");
                }
            }
        }

        if enable_logging {
            debug!(before, after = entries.len(), "cleanup pass finished");
        }
    }

    /// Read-only snapshot of the registry.
    ///
    /// Async because per-conversation output counts go through each owned
    /// manager's mutex. The registry lock is not held across those awaits —
    /// entries are snapshotted first — so `status()` runs concurrently with
    /// accesses. Conversations are listed in id order for stable output.
    pub async fn status(&self) -> CacheStatus {
        let now = Utc::now();
        let snapshot: Vec<(String, Arc<ToolOutputManager>, DateTime<Utc>, DateTime<Utc>)> = {
            let entries = self.entries.lock().unwrap();
            entries
                .iter()
                .map(|(id, entry)| {
                    (
                        id.clone(),
                        Arc::clone(&entry.manager),
                        entry.created_at,
                        entry.last_access,
                    )
                })
                .collect()
        };

        let mut conversations = Vec::with_capacity(snapshot.len());
        for (id, manager, created_at, last_access) in snapshot {
            let tool_output_count = manager.output_count().await;
            conversations.push(ConversationStatus {
                id,
                created_at,
                age_minutes: (now - last_access).num_minutes().max(0) as u64,
                has_tool_outputs: tool_output_count > 0,
                tool_output_count,
            });
        }
        conversations.sort_by(|a, b| a.id.cmp(&b.id));

        CacheStatus {
            total_conversations: conversations.len(),
            conversations,
            config: self.config.clone(),
        }
    }

    /// Drop every entry unconditionally.
    pub fn clear_all(&self) {
        let mut entries = self.entries.lock().unwrap();
        let dropped = entries.len();
        entries.clear();
        if self.config.enable_logging {
            debug!(dropped, "cleared all conversations");
        }
    }

    /// A copy of the active (normalized) configuration.
    pub fn config(&self) -> CacheConfig {
        self.config.clone()
    }

    /// Number of live conversations.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Whether the registry holds no conversations.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl Default for ConversationCache {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Per-conversation line of a [`CacheStatus`] snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationStatus {
    /// Conversation id.
    pub id: String,
    /// When the entry was first created.
    pub created_at: DateTime<Utc>,
    /// Whole minutes since the entry was last accessed.
    pub age_minutes: u64,
    /// Whether the conversation's log holds any record.
    pub has_tool_outputs: bool,
    /// Number of records in the conversation's log.
    pub tool_output_count: usize,
}

/// Read-only snapshot of the registry returned by
/// [`ConversationCache::status`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    /// Number of live conversations.
    pub total_conversations: usize,
    /// One line per conversation, in id order.
    pub conversations: Vec<ConversationStatus>,
    /// The registry's active configuration.
    pub config: CacheConfig,
}
