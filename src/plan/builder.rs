//! Binding tool specs to managers and command templates.

use crate::plan::{InstallStep, PlanError};
use crate::registry::ManagerRegistry;
use crate::tool_spec::ToolSpec;
use std::collections::HashSet;

/// Bind each spec to the most-preferred available manager.
///
/// Managers are tried in the registry's preference order for the spec's
/// ecosystem; the first one that is available on this host and can
/// produce an install command wins. A spec no manager can serve is a
/// [`PlanError::NoManagerAvailable`]. Duplicate tool names are rejected
/// before any binding happens.
pub fn build_steps(
    specs: &[ToolSpec],
    registry: &dyn ManagerRegistry,
) -> Result<Vec<InstallStep>, PlanError> {
    let mut seen = HashSet::new();
    for spec in specs {
        if !seen.insert(spec.name.as_str()) {
            return Err(PlanError::DuplicateTool(spec.name.clone()));
        }
    }

    let mut steps = Vec::with_capacity(specs.len());
    for spec in specs {
        let candidates = registry.managers_for(spec.ecosystem);
        let bound = candidates.iter().copied().find_map(|manager| {
            if !registry.available(manager) {
                return None;
            }
            registry
                .install_command(manager, spec, &spec.target)
                .map(|command| (manager, command))
        });

        let (manager, command) = bound.ok_or_else(|| PlanError::NoManagerAvailable {
            tool: spec.name.clone(),
            ecosystem: spec.ecosystem,
            fix: format!(
                "Install one of the {} package managers ({}) and retry",
                spec.ecosystem,
                candidates
                    .iter()
                    .map(|m| m.command_name())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })?;

        tracing::debug!(tool = %spec.name, manager = %manager, "bound install step");

        steps.push(InstallStep {
            tool: spec.name.clone(),
            manager,
            command,
            binary_names: spec.binary_names.clone(),
            target: spec.target.clone(),
            checksum: spec.checksum.clone(),
            depends_on: spec.depends_on.clone(),
            timeout_override: None,
        });
    }

    Ok(steps)
}
