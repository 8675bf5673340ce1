//! Per-conversation tool-output log with request-scoped sessions.

pub mod manager;

pub use manager::{ToolOutput, ToolOutputManager};
