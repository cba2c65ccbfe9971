//! Dependency ordering via Kahn's algorithm.

use crate::plan::{InstallStep, PlanError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// An ordered sequence of concurrency-safe levels.
///
/// Invariants, established by [`resolve_levels`]:
///
/// - every step appears in exactly one level
/// - every dependency of a step resides in a strictly earlier level
/// - cyclic graphs are rejected before any execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallPlan {
    /// Levels in execution order; steps within a level may run
    /// concurrently.
    pub levels: Vec<Vec<InstallStep>>,
}

impl InstallPlan {
    /// Total number of steps across all levels.
    pub fn step_count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    /// Iterate over all steps in level order.
    pub fn steps(&self) -> impl Iterator<Item = &InstallStep> {
        self.levels.iter().flatten()
    }
}

/// Order steps into levels with Kahn's algorithm.
///
/// In-degrees count only dependencies on tools present in the plan; a
/// dependency naming an absent tool is treated as already satisfied.
/// Each round extracts the full set of zero-in-degree steps as the next
/// level, keeping input order within the level for reproducible output.
/// A non-empty remainder with no zero-in-degree step is a cycle and
/// fails with the participating tool names.
pub fn resolve_levels(steps: Vec<InstallStep>) -> Result<InstallPlan, PlanError> {
    let in_plan: HashSet<String> = steps.iter().map(|s| s.tool.clone()).collect();

    // in-degree per step, ignoring dependencies outside the plan
    let mut in_degree: HashMap<&str, usize> = steps
        .iter()
        .map(|s| {
            let degree = s
                .depends_on
                .iter()
                .filter(|d| in_plan.contains(*d))
                .count();
            (s.tool.as_str(), degree)
        })
        .collect();

    let mut remaining: Vec<&InstallStep> = steps.iter().collect();
    let mut levels: Vec<Vec<InstallStep>> = Vec::new();

    while !remaining.is_empty() {
        let (ready, rest): (Vec<&InstallStep>, Vec<&InstallStep>) = remaining
            .into_iter()
            .partition(|s| in_degree.get(s.tool.as_str()).copied().unwrap_or(0) == 0);

        if ready.is_empty() {
            let mut tools: Vec<String> = rest.iter().map(|s| s.tool.clone()).collect();
            tools.sort();
            return Err(PlanError::DependencyCycle { tools });
        }

        let ready_names: HashSet<&str> = ready.iter().map(|s| s.tool.as_str()).collect();
        for step in &rest {
            let satisfied = step
                .depends_on
                .iter()
                .filter(|d| ready_names.contains(d.as_str()))
                .count();
            if satisfied > 0 {
                if let Some(degree) = in_degree.get_mut(step.tool.as_str()) {
                    *degree = degree.saturating_sub(satisfied);
                }
            }
        }

        levels.push(ready.into_iter().cloned().collect());
        remaining = rest;
    }

    tracing::debug!(
        levels = levels.len(),
        steps = levels.iter().map(Vec::len).sum::<usize>(),
        "resolved install plan"
    );

    Ok(InstallPlan { levels })
}
