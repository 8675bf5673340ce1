//! Conversation-scoped tool-output caching for LLM assistants with tool
//! calling.
//!
//! When an assistant executes tools — SQL queries, map rendering, spatial
//! statistics — the interesting artifacts (query results, GeoJSON, map
//! configs) are large and never shown to the LLM. This crate lets a
//! request-handling server keep those artifacts: scoped per conversation,
//! isolated per in-flight request ("session"), and bounded in memory by
//! TTL- and capacity-based eviction. Everything is in-memory, single-process
//! and best-effort; callers treat "no cached output found" as "the tool
//! never ran", not as an error.
//!
//! Three layers, outermost first:
//!
//! - [`ConversationCache`] — registry of per-conversation managers with TTL
//!   expiry, LRU capacity eviction, and opportunistic cleanup;
//! - [`ToolOutputManager`] — one conversation's append-only output log and
//!   current session, every operation serialized through a [`FifoMutex`];
//! - [`DatasetCache`] — process-wide handoff store for
//!   conversation-agnostic tools.
//!
//! # Example
//!
//! ```
//! use convocache::{CacheConfig, ConversationCache};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let cache = ConversationCache::new(CacheConfig::default());
//!
//! // One inbound request:
//! let manager = cache.tool_output_manager("conversation-1");
//! let session = manager.start_session().await;
//!
//! manager
//!     .add_tool_output("call-1", json!({"queryResult": [1, 2, 3]}))
//!     .await;
//!
//! assert!(manager.has_tool_outputs_in_current_session().await);
//! let last = manager.last_tool_output_from_current_session().await.unwrap();
//! assert_eq!(last.session_id.as_deref(), Some(session.as_str()));
//!
//! manager.end_session().await;
//! # });
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod output;
pub mod sync;

pub use cache::{CacheStatus, ConversationCache, ConversationStatus, DatasetCache, DatasetPayload};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use output::{ToolOutput, ToolOutputManager};
pub use sync::{FifoMutex, FifoMutexGuard};
