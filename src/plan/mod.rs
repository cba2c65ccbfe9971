//! Install planning: steps, manager selection, dependency ordering.
//!
//! A plan is built in two stages. [`build_steps`] binds each requested
//! [`ToolSpec`](crate::ToolSpec) to a chosen package manager and command
//! template; [`resolve_levels`] orders the bound steps into
//! concurrency-safe levels via topological sort. Both stages fail fast:
//! a plan that cannot be ordered never reaches execution.

mod builder;
mod resolver;
mod step;

pub use builder::build_steps;
pub use resolver::{resolve_levels, InstallPlan};
pub use step::InstallStep;

use crate::tool_spec::Ecosystem;
use thiserror::Error;

/// Fatal planning error; aborts before any execution.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum PlanError {
    /// Two specs in the same request share a tool name.
    #[error("duplicate tool '{0}' in plan request")]
    DuplicateTool(String),

    /// No candidate manager for the tool's ecosystem is available.
    #[error("no available package manager for '{tool}' ({ecosystem})")]
    NoManagerAvailable {
        tool: String,
        ecosystem: Ecosystem,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The dependency graph contains a cycle.
    #[error("dependency cycle involving: {}", tools.join(", "))]
    DependencyCycle {
        /// Tools participating in the unresolvable remainder.
        tools: Vec<String>,
    },
}
