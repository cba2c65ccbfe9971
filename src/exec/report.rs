//! Aggregated outcome of one plan execution.

use crate::exec::unit::StepResult;
use std::collections::HashMap;
use std::time::Duration;

/// Final outcome for one tool in a run.
#[derive(Debug, Clone)]
pub enum ToolOutcome {
    /// Installed and verified.
    Success(StepResult),
    /// Attempted and failed; the result carries the error.
    Failed(StepResult),
    /// Never attempted because a dependency did not succeed.
    Blocked {
        /// The failed or blocked dependencies this tool was waiting on.
        waiting_on: Vec<String>,
    },
    /// Never attempted because the run was cancelled first.
    Cancelled,
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The step result, when the step actually ran.
    pub fn result(&self) -> Option<&StepResult> {
        match self {
            Self::Success(r) | Self::Failed(r) => Some(r),
            _ => None,
        }
    }
}

/// Per-tool outcomes plus total elapsed time for one run.
///
/// A partially failing run still carries full per-tool detail; the
/// run-level status reflects whether anything failed, was blocked or
/// was cancelled.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub outcomes: HashMap<String, ToolOutcome>,
    pub elapsed: Duration,
}

impl RunReport {
    /// True when every tool succeeded.
    pub fn succeeded(&self) -> bool {
        self.outcomes.values().all(ToolOutcome::is_success)
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, ToolOutcome::Failed(_)))
            .count()
    }

    pub fn blocked_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, ToolOutcome::Blocked { .. }))
            .count()
    }

    pub fn outcome(&self, tool: &str) -> Option<&ToolOutcome> {
        self.outcomes.get(tool)
    }
}
