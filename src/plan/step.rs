//! One unit of install work, bound to a chosen manager.

use crate::registry::{CommandTemplate, PackageManager};
use crate::tool_spec::{ChecksumSpec, VersionTarget};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single tool installation via one chosen package manager.
///
/// Step identity is the tool name; it is unique within a plan. The
/// command is fully resolved at planning time so execution needs no
/// further registry access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallStep {
    /// Tool name; unique within the plan.
    pub tool: String,

    /// The manager chosen to perform the installation.
    pub manager: PackageManager,

    /// Resolved command to run.
    pub command: CommandTemplate,

    /// Executable names expected after installation.
    pub binary_names: Vec<String>,

    /// Requested version, compared during post-install validation.
    pub target: VersionTarget,

    /// Optional expected digest for the installed binary.
    pub checksum: Option<ChecksumSpec>,

    /// Tools that must complete before this step runs.
    pub depends_on: Vec<String>,

    /// Per-step timeout override for long package-manager operations.
    pub timeout_override: Option<Duration>,
}

impl InstallStep {
    /// Effective timeout for this step given the configured default.
    pub fn effective_timeout(&self, default: Duration) -> Duration {
        self.timeout_override.unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool_spec::VersionTarget;

    fn sample_step() -> InstallStep {
        InstallStep {
            tool: "ripgrep".to_string(),
            manager: PackageManager::Cargo,
            command: CommandTemplate {
                program: "cargo".to_string(),
                args: vec!["install".to_string(), "ripgrep".to_string()],
                env_vars: vec![],
            },
            binary_names: vec!["rg".to_string()],
            target: VersionTarget::Latest,
            checksum: None,
            depends_on: vec![],
            timeout_override: None,
        }
    }

    #[test]
    fn test_effective_timeout_default() {
        let step = sample_step();
        assert_eq!(
            step.effective_timeout(Duration::from_secs(30)),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_effective_timeout_override() {
        let mut step = sample_step();
        step.timeout_override = Some(Duration::from_secs(300));
        assert_eq!(
            step.effective_timeout(Duration::from_secs(30)),
            Duration::from_secs(300)
        );
    }
}
