//! Shared progress state, polled by callers during a run.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Lifecycle status of one tool within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ToolStatus {
    Pending,
    Running,
    Success,
    Failed,
    /// A dependency failed; the step was never attempted.
    Blocked,
    /// The run was cancelled before the step's level started.
    Cancelled,
}

/// Status plus a short human-readable message.
#[derive(Debug, Clone)]
pub struct ToolProgress {
    pub status: ToolStatus,
    pub message: String,
}

/// Cloneable handle over the per-run progress map.
///
/// Created per run and discarded at run end; never a process-wide
/// singleton. One mutex guards the map and is held only for the update
/// or snapshot itself, never across a command execution or a backoff
/// sleep. Lock order: any cache-file lock is acquired before this
/// mutex, never the reverse.
///
/// # Example
///
/// ```rust
/// use devtool_orchestrator::{ProgressTracker, ToolStatus};
///
/// let tracker = ProgressTracker::new();
/// tracker.set("ripgrep", ToolStatus::Running, "installing via cargo");
/// let snapshot = tracker.snapshot();
/// assert_eq!(snapshot["ripgrep"].status, ToolStatus::Running);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    inner: Arc<Mutex<HashMap<String, ToolProgress>>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a status transition for a tool.
    pub fn set(&self, tool: &str, status: ToolStatus, message: impl Into<String>) {
        let mut map = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.insert(
            tool.to_string(),
            ToolProgress {
                status,
                message: message.into(),
            },
        );
    }

    /// Point-in-time copy of the whole progress map.
    pub fn snapshot(&self) -> HashMap<String, ToolProgress> {
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Status of a single tool, if known.
    pub fn status_of(&self, tool: &str) -> Option<ToolStatus> {
        let map = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.get(tool).map(|p| p.status)
    }
}
