//! Append-only log of tool outputs for one conversation.
//!
//! A [`ToolOutputManager`] remembers the large, non-LLM-visible artifacts
//! (query results, GeoJSON, map configs) that tool calls produce while a
//! conversation is being processed. Records accumulate across requests; a
//! *session* marks the scope of one in-flight request so the request handler
//! can ask "did anything happen just now?" without confusing fresh outputs
//! with the conversation's history.
//!
//! Every operation is serialized through a [`FifoMutex`], so concurrent
//! requests touching the same conversation see a totally ordered log with no
//! lost updates. Lookups that find nothing return `None`/`false`/empty —
//! none of these methods can fail.
//!
//! # Request lifecycle
//!
//! ```
//! use convocache::ToolOutputManager;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let manager = ToolOutputManager::new();
//!
//! let session = manager.start_session().await;
//! manager.add_tool_output("call-1", json!({"rows": [1, 2, 3]})).await;
//!
//! assert!(manager.has_tool_outputs_in_current_session().await);
//! let last = manager.last_tool_output_from_current_session().await.unwrap();
//! assert_eq!(last.session_id.as_deref(), Some(session.as_str()));
//!
//! manager.end_session().await;
//! # });
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use ulid::Ulid;

use crate::sync::FifoMutex;

/// One immutable tool-output record.
///
/// Created only by [`ToolOutputManager::add_tool_output`]; never mutated and
/// never individually deleted (the log is cleared only in bulk).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutput {
    /// Caller-supplied id of the tool invocation that produced this record.
    pub tool_call_id: String,
    /// The artifact itself — arbitrary JSON, opaque to the cache.
    pub data: Value,
    /// Session active when the record was appended, or `None` for
    /// session-less history.
    pub session_id: Option<String>,
}

/// Log + current-session id, mutated only inside the FIFO mutex.
#[derive(Debug, Default)]
struct ManagerState {
    outputs: Vec<ToolOutput>,
    current_session: Option<String>,
}

/// Append-only tool-output log for one conversation.
///
/// Owned by the conversation registry; request handlers receive it as
/// `Arc<ToolOutputManager>` and drive the session lifecycle
/// ([`start_session`](Self::start_session) → appends → queries →
/// [`end_session`](Self::end_session)).
#[derive(Debug, Default)]
pub struct ToolOutputManager {
    state: FifoMutex<ManagerState>,
}

impl ToolOutputManager {
    /// Create an empty manager with no active session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session and return its id.
    ///
    /// The id is a fresh ULID (millisecond timestamp + 80 random bits, so
    /// collisions across a process lifetime are not a practical concern).
    /// Any session already active is simply replaced — sessions do not
    /// nest — and prior history is untouched.
    pub async fn start_session(&self) -> String {
        let session_id = Ulid::new().to_string();
        let mut state = self.state.lock().await;
        state.current_session = Some(session_id.clone());
        debug!(session_id = %session_id, "session started");
        session_id
    }

    /// End the current session.
    ///
    /// Idempotent: ending twice, or before any session was started, is a
    /// no-op.
    pub async fn end_session(&self) {
        let mut state = self.state.lock().await;
        if let Some(session_id) = state.current_session.take() {
            debug!(session_id = %session_id, "session ended");
        }
    }

    /// Id of the session currently in flight, if any.
    pub async fn current_session_id(&self) -> Option<String> {
        self.state.lock().await.current_session.clone()
    }

    /// Append a tool output tagged with the current session id.
    ///
    /// Appending outside any session is allowed; the record is stored with
    /// `session_id: None` and only visible to the non-session queries.
    pub async fn add_tool_output(&self, tool_call_id: impl Into<String>, data: Value) {
        let mut state = self.state.lock().await;
        let record = ToolOutput {
            tool_call_id: tool_call_id.into(),
            data,
            session_id: state.current_session.clone(),
        };
        debug!(
            tool_call_id = %record.tool_call_id,
            session_id = record.session_id.as_deref().unwrap_or("-"),
            "tool output appended"
        );
        state.outputs.push(record);
    }

    /// The most recent record overall, regardless of session.
    pub async fn last_tool_output(&self) -> Option<ToolOutput> {
        self.state.lock().await.outputs.last().cloned()
    }

    /// The most recent record belonging to the current session.
    ///
    /// Scans backward from the end of the log: a long-lived conversation's
    /// log interleaves many requests' sessions, so the last record overall
    /// may belong to an earlier session. `None` when no session is active or
    /// the session has produced nothing yet.
    pub async fn last_tool_output_from_current_session(&self) -> Option<ToolOutput> {
        let state = self.state.lock().await;
        let current = state.current_session.as_deref()?;
        state
            .outputs
            .iter()
            .rev()
            .find(|output| output.session_id.as_deref() == Some(current))
            .cloned()
    }

    /// Whether the current session has produced at least one record.
    ///
    /// `false` when no session is active, even if the log is non-empty.
    pub async fn has_tool_outputs_in_current_session(&self) -> bool {
        let state = self.state.lock().await;
        match state.current_session.as_deref() {
            Some(current) => state
                .outputs
                .iter()
                .any(|output| output.session_id.as_deref() == Some(current)),
            None => false,
        }
    }

    /// All records belonging to the current session, in log order.
    pub async fn tool_outputs_from_current_session(&self) -> Vec<ToolOutput> {
        let state = self.state.lock().await;
        match state.current_session.as_deref() {
            Some(current) => state
                .outputs
                .iter()
                .filter(|output| output.session_id.as_deref() == Some(current))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// First value stored under `name` by any record whose data is a JSON
    /// object, scanning the whole log (not session-filtered) in append order.
    ///
    /// First match wins: when two tool calls both produce a dataset named
    /// `name`, the *earliest* producer is returned, not the latest. Callers
    /// that re-run a producing tool under the same dataset name will keep
    /// seeing the original dataset until the log is cleared.
    pub async fn find_data_by_dataset_name(&self, name: &str) -> Option<Value> {
        let state = self.state.lock().await;
        state
            .outputs
            .iter()
            .find_map(|output| output.data.as_object().and_then(|map| map.get(name)).cloned())
    }

    /// Defensive copy of the full log, in append order.
    pub async fn all_tool_outputs(&self) -> Vec<ToolOutput> {
        self.state.lock().await.outputs.clone()
    }

    /// Whether the log contains any record at all.
    pub async fn has_tool_outputs(&self) -> bool {
        !self.state.lock().await.outputs.is_empty()
    }

    /// Number of records in the log.
    pub async fn output_count(&self) -> usize {
        self.state.lock().await.outputs.len()
    }

    /// Empty the log. The current session id is untouched, so a session in
    /// flight keeps tagging new records.
    pub async fn clear_all(&self) {
        let mut state = self.state.lock().await;
        state.outputs.clear();
    }

    /// Build a fire-and-forget completion hook for synchronous call sites.
    ///
    /// Tool runtimes report completion from synchronous callbacks that
    /// cannot await the manager. The returned closure spawns the append onto
    /// the tokio runtime and returns immediately; a `None` payload appends
    /// nothing. Call the closure from within a tokio runtime context.
    ///
    /// Consumes an `Arc` handle (the closure keeps the manager alive); pass
    /// a clone: `Arc::clone(&manager).completion_callback()`.
    pub fn completion_callback(self: Arc<Self>) -> impl Fn(&str, Option<Value>) + Send + Sync + 'static {
        let manager = self;
        move |tool_call_id: &str, data: Option<Value>| {
            let Some(data) = data else {
                return;
            };
            let manager = Arc::clone(&manager);
            let tool_call_id = tool_call_id.to_string();
            tokio::spawn(async move {
                manager.add_tool_output(tool_call_id, data).await;
            });
        }
    }
}
