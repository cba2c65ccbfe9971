//! Version upgrades with breaking-change policy and rollback.
//!
//! An upgrade is an install with extra ceremony: probe what is there,
//! classify how far the jump is, apply the breaking-change policy,
//! remember what worked before touching it, and put it back if the
//! upgraded binary does not validate.

mod delta;

pub use delta::{classify_delta, VersionDelta};

use crate::config::BreakingPolicy;
use crate::exec::{StepResult, UnitInstaller};
use crate::plan::{build_steps, PlanError};
use crate::probe::{extract_version_string, probe_version, scan_search_path};
use crate::registry::{ManagerRegistry, VersionSource};
use crate::store::{RollbackRecord, StateStore, StoreError};
use crate::tool_spec::{ToolSpec, VersionTarget};
use crate::OrchestratorConfig;
use std::time::Duration;
use thiserror::Error;

/// Failure deciding or preparing an upgrade.
///
/// Execution failures do not land here; they come back inside the
/// [`UpgradeOutcome`]'s step result like any other install.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UpgradeError {
    /// The reject policy refused a major crossing; the installer was
    /// never invoked.
    #[error("refusing major upgrade of '{tool}' from {current} to {target}: {fix}")]
    PolicyViolation {
        tool: String,
        current: String,
        target: String,
        fix: String,
    },

    /// `Latest` was requested but no source knows a version.
    #[error("no known upstream version for '{tool}': {fix}")]
    NoKnownVersion { tool: String, fix: String },

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What an upgrade attempt did.
#[derive(Debug, Clone)]
pub struct UpgradeOutcome {
    pub tool: String,
    /// Version probed before the upgrade, when one was working.
    pub previous_version: Option<String>,
    /// Version the upgrade aimed for.
    pub target_version: String,
    pub delta: VersionDelta,
    /// Set when the warn policy let a breaking crossing through.
    pub policy_warning: Option<String>,
    /// The install step's result; `success` is false for a failed
    /// upgrade even when the revert restored the previous version.
    pub result: StepResult,
    /// Whether a failed upgrade was reverted to the previous version.
    pub reverted: bool,
}

/// Drives one tool's upgrade end to end.
pub struct UpgradeManager {
    policy: BreakingPolicy,
    probe_timeout: Duration,
    unit: UnitInstaller,
    search_path: Option<String>,
}

impl UpgradeManager {
    pub fn new(config: &OrchestratorConfig) -> Self {
        Self {
            policy: config.breaking_policy,
            probe_timeout: Duration::from_secs(5),
            unit: UnitInstaller::new(config),
            search_path: config.search_path.clone(),
        }
    }

    /// Override the search path; defaults to the process `PATH`.
    pub fn with_search_path(mut self, search_path: impl Into<String>) -> Self {
        let search_path = search_path.into();
        self.unit = self.unit.with_search_path(search_path.clone());
        self.search_path = Some(search_path);
        self
    }

    /// Upgrade one tool to `target`.
    ///
    /// The reject policy refuses a major crossing before the installer
    /// runs, unless `force` is set. When the pre-upgrade binary was
    /// verified working, a rollback record is persisted first and a
    /// failed post-upgrade validation triggers a best-effort revert.
    pub async fn upgrade(
        &self,
        spec: &ToolSpec,
        target: &VersionTarget,
        force: bool,
        registry: &dyn ManagerRegistry,
        version_source: &dyn VersionSource,
        store: &StateStore,
    ) -> Result<UpgradeOutcome, UpgradeError> {
        let target_version = self.resolve_target(spec, target, version_source, store)?;
        let previous_version = self.probe_current(spec).await;
        let delta = classify_delta(previous_version.as_deref(), &target_version);

        if delta == VersionDelta::None {
            tracing::info!(tool = %spec.name, version = %target_version, "already at target");
            return Ok(UpgradeOutcome {
                tool: spec.name.clone(),
                previous_version,
                target_version,
                delta,
                policy_warning: None,
                result: self.noop_result(spec),
                reverted: false,
            });
        }

        let policy_warning = self.apply_policy(
            spec,
            previous_version.as_deref(),
            &target_version,
            delta,
            force,
        )?;

        let step = self.build_step(spec, &target_version, registry)?;

        // Only a verified-working state is worth restoring.
        if let Some(previous) = &previous_version {
            store.record_rollback(&RollbackRecord {
                tool: spec.name.clone(),
                previous_version: previous.clone(),
                manager: step.manager,
            })?;
        }

        let result = self.unit.run(&step).await;

        let mut reverted = false;
        if !result.success && validation_failed(&result) {
            if let Some(record) = store.rollback_record(&spec.name)? {
                reverted = self.revert(spec, &record, registry).await;
                if reverted {
                    store.clear_rollback(&spec.name)?;
                }
            }
        }

        Ok(UpgradeOutcome {
            tool: spec.name.clone(),
            previous_version,
            target_version,
            delta,
            policy_warning,
            result,
            reverted,
        })
    }

    fn resolve_target(
        &self,
        spec: &ToolSpec,
        target: &VersionTarget,
        version_source: &dyn VersionSource,
        store: &StateStore,
    ) -> Result<String, UpgradeError> {
        match target {
            VersionTarget::Exact(version) => Ok(version.clone()),
            VersionTarget::Latest => {
                if let Some(cached) = store.cached_version(&spec.name)? {
                    tracing::debug!(
                        tool = %spec.name,
                        version = %cached.latest_version,
                        provenance = %cached.provenance,
                        "using cached upstream version"
                    );
                    return Ok(cached.latest_version);
                }
                let upstream = version_source.latest(&spec.name).ok_or_else(|| {
                    UpgradeError::NoKnownVersion {
                        tool: spec.name.clone(),
                        fix: "Provide an exact target version or configure a version source"
                            .to_string(),
                    }
                })?;
                store.record_version(&spec.name, &upstream)?;
                Ok(upstream.version)
            }
        }
    }

    async fn probe_current(&self, spec: &ToolSpec) -> Option<String> {
        let search_path = self
            .search_path
            .clone()
            .or_else(|| std::env::var("PATH").ok())
            .unwrap_or_default();
        let found = scan_search_path(&spec.binary_names, &search_path)
            .into_iter()
            .next()?;
        probe_version(&found.path, self.probe_timeout)
            .await
            .ok()
            .and_then(|out| extract_version_string(&out))
    }

    fn apply_policy(
        &self,
        spec: &ToolSpec,
        current: Option<&str>,
        target: &str,
        delta: VersionDelta,
        force: bool,
    ) -> Result<Option<String>, UpgradeError> {
        if !delta.is_breaking() {
            return Ok(None);
        }
        let current = current.unwrap_or("unknown").to_string();
        match self.policy {
            BreakingPolicy::Accept => Ok(None),
            BreakingPolicy::Warn => {
                let warning = format!(
                    "major upgrade of {} from {current} to {target} may be breaking",
                    spec.name
                );
                tracing::warn!(tool = %spec.name, %current, %target, "breaking upgrade allowed by policy");
                Ok(Some(warning))
            }
            BreakingPolicy::Reject if force => {
                tracing::warn!(tool = %spec.name, %current, %target, "reject policy overridden by force");
                Ok(None)
            }
            BreakingPolicy::Reject => Err(UpgradeError::PolicyViolation {
                tool: spec.name.clone(),
                current,
                target: target.to_string(),
                fix: "Pass force to override the reject policy, or pin a non-breaking version"
                    .to_string(),
            }),
        }
    }

    fn build_step(
        &self,
        spec: &ToolSpec,
        version: &str,
        registry: &dyn ManagerRegistry,
    ) -> Result<crate::plan::InstallStep, PlanError> {
        let mut pinned = spec.clone();
        pinned.target = VersionTarget::Exact(version.to_string());
        // A single spec yields exactly one step.
        let mut steps = build_steps(std::slice::from_ref(&pinned), registry)?;
        Ok(steps.remove(0))
    }

    /// Reinstall the recorded previous version. Best effort only.
    async fn revert(
        &self,
        spec: &ToolSpec,
        record: &RollbackRecord,
        registry: &dyn ManagerRegistry,
    ) -> bool {
        let step = match self.build_step(spec, &record.previous_version, registry) {
            Ok(step) => step,
            Err(e) => {
                tracing::warn!(tool = %spec.name, error = %e, "could not build revert step");
                return false;
            }
        };
        let result = self.unit.run(&step).await;
        if result.success {
            tracing::info!(
                tool = %spec.name,
                version = %record.previous_version,
                "reverted to previous version"
            );
        } else {
            tracing::warn!(tool = %spec.name, "revert failed; manual intervention needed");
        }
        result.success
    }

    fn noop_result(&self, spec: &ToolSpec) -> StepResult {
        StepResult {
            tool: spec.name.clone(),
            success: true,
            exit_code: None,
            output: "already at target version".to_string(),
            elapsed: Duration::ZERO,
            installed_version: None,
            installed_path: None,
            retry_count: 0,
            error: None,
        }
    }
}

fn validation_failed(result: &StepResult) -> bool {
    matches!(
        result.error,
        Some(crate::exec::InstallError::ValidationFailed { .. })
            | Some(crate::exec::InstallError::ChecksumMismatch { .. })
    )
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::registry::{CommandTemplate, NullVersionSource, PackageManager, UpstreamVersion};
    use crate::tool_spec::Ecosystem;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Registry whose install command runs a fixture script with the
    /// target version as its only argument.
    struct ScriptRegistry {
        script: PathBuf,
    }

    impl ManagerRegistry for ScriptRegistry {
        fn managers_for(&self, _ecosystem: Ecosystem) -> Vec<PackageManager> {
            vec![PackageManager::Cargo]
        }

        fn available(&self, _manager: PackageManager) -> bool {
            true
        }

        fn install_command(
            &self,
            _manager: PackageManager,
            _spec: &ToolSpec,
            target: &VersionTarget,
        ) -> Option<CommandTemplate> {
            let version = match target {
                VersionTarget::Latest => "latest".to_string(),
                VersionTarget::Exact(v) => v.clone(),
            };
            Some(CommandTemplate {
                program: self.script.to_string_lossy().into_owned(),
                args: vec![version],
                env_vars: vec![],
            })
        }
    }

    struct FixedVersionSource(&'static str);

    impl VersionSource for FixedVersionSource {
        fn latest(&self, _tool: &str) -> Option<UpstreamVersion> {
            Some(UpstreamVersion {
                version: self.0.to_string(),
                provenance: "test registry".to_string(),
            })
        }
    }

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// A fake installed binary answering --version with `version`.
    fn write_binary(dir: &Path, name: &str, version: &str) {
        write_script(dir, name, &format!("echo '{name} {version}'\n"));
    }

    /// Installer script that rewrites the fake binary to report `$1`.
    fn installer_script(dir: &Path, bin_dir: &Path) -> PathBuf {
        write_script(
            dir,
            "install.sh",
            &format!(
                "printf '#!/bin/sh\\necho \"tool %s\"\\n' \"$1\" > '{bin}/tool'\n\
                 chmod +x '{bin}/tool'\n\
                 exit 0\n",
                bin = bin_dir.display()
            ),
        )
    }

    fn manager(bin_dir: &Path, policy: BreakingPolicy) -> (UpgradeManager, StateStore) {
        let mut config = OrchestratorConfig::default();
        config.breaking_policy = policy;
        config.state_dir = Some(bin_dir.join("state"));
        let manager =
            UpgradeManager::new(&config).with_search_path(bin_dir.to_string_lossy().into_owned());
        (manager, StateStore::new(&config))
    }

    fn spec() -> ToolSpec {
        ToolSpec::new("tool", Ecosystem::Rust)
    }

    #[tokio::test]
    async fn test_reject_policy_refuses_before_installer_runs() {
        let dir = tempfile::TempDir::new().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        write_binary(&bin, "tool", "1.0.0");
        let marker = dir.path().join("ran");
        let script = write_script(
            dir.path(),
            "install.sh",
            &format!("touch '{}'\nexit 0\n", marker.display()),
        );
        let registry = ScriptRegistry { script };

        let (manager, store) = manager(&bin, BreakingPolicy::Reject);
        let err = manager
            .upgrade(
                &spec(),
                &VersionTarget::Exact("2.0.0".to_string()),
                false,
                &registry,
                &NullVersionSource,
                &store,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, UpgradeError::PolicyViolation { .. }));
        assert!(!marker.exists(), "installer must not run under reject");
    }

    #[tokio::test]
    async fn test_force_overrides_reject_policy() {
        let dir = tempfile::TempDir::new().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        write_binary(&bin, "tool", "1.0.0");
        let script = installer_script(dir.path(), &bin);
        let registry = ScriptRegistry { script };

        let (manager, store) = manager(&bin, BreakingPolicy::Reject);
        let outcome = manager
            .upgrade(
                &spec(),
                &VersionTarget::Exact("2.0.0".to_string()),
                true,
                &registry,
                &NullVersionSource,
                &store,
            )
            .await
            .unwrap();

        assert!(outcome.result.success, "{:?}", outcome.result.error);
        assert_eq!(outcome.delta, VersionDelta::Major);
        assert!(outcome.policy_warning.is_none());
    }

    #[tokio::test]
    async fn test_warn_policy_proceeds_with_warning_and_records_rollback() {
        let dir = tempfile::TempDir::new().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        write_binary(&bin, "tool", "1.0.0");
        let script = installer_script(dir.path(), &bin);
        let registry = ScriptRegistry { script };

        let (manager, store) = manager(&bin, BreakingPolicy::Warn);
        let outcome = manager
            .upgrade(
                &spec(),
                &VersionTarget::Exact("2.0.0".to_string()),
                false,
                &registry,
                &NullVersionSource,
                &store,
            )
            .await
            .unwrap();

        assert!(outcome.result.success, "{:?}", outcome.result.error);
        assert!(outcome.policy_warning.is_some());
        assert_eq!(outcome.previous_version.as_deref(), Some("1.0.0"));

        let record = store.rollback_record("tool").unwrap().unwrap();
        assert_eq!(record.previous_version, "1.0.0");
    }

    #[tokio::test]
    async fn test_failed_validation_triggers_revert() {
        let dir = tempfile::TempDir::new().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        write_binary(&bin, "tool", "1.0.0");
        // Only takes effect for 1.0.0, so the 2.0.0 upgrade reports
        // success but leaves the old binary in place.
        let script = write_script(
            dir.path(),
            "install.sh",
            &format!(
                "if [ \"$1\" = \"1.0.0\" ]; then\n\
                 printf '#!/bin/sh\\necho \"tool %s\"\\n' \"$1\" > '{bin}/tool'\n\
                 chmod +x '{bin}/tool'\n\
                 fi\n\
                 exit 0\n",
                bin = bin.display()
            ),
        );
        let registry = ScriptRegistry { script };

        let (manager, store) = manager(&bin, BreakingPolicy::Accept);
        let outcome = manager
            .upgrade(
                &spec(),
                &VersionTarget::Exact("2.0.0".to_string()),
                false,
                &registry,
                &NullVersionSource,
                &store,
            )
            .await
            .unwrap();

        assert!(!outcome.result.success);
        assert!(outcome.reverted, "previous version should be restored");
        // Revert consumed the rollback record
        assert!(store.rollback_record("tool").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_resolved_via_version_source_and_cached() {
        let dir = tempfile::TempDir::new().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        write_binary(&bin, "tool", "1.0.0");
        let script = installer_script(dir.path(), &bin);
        let registry = ScriptRegistry { script };

        let (manager, store) = manager(&bin, BreakingPolicy::Accept);
        let outcome = manager
            .upgrade(
                &spec(),
                &VersionTarget::Latest,
                false,
                &registry,
                &FixedVersionSource("1.1.0"),
                &store,
            )
            .await
            .unwrap();

        assert_eq!(outcome.target_version, "1.1.0");
        assert_eq!(outcome.delta, VersionDelta::Minor);
        assert!(outcome.result.success, "{:?}", outcome.result.error);

        let cached = store.cached_version("tool").unwrap().unwrap();
        assert_eq!(cached.latest_version, "1.1.0");
    }

    #[tokio::test]
    async fn test_latest_without_source_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        let script = write_script(dir.path(), "install.sh", "exit 0\n");
        let registry = ScriptRegistry { script };

        let (manager, store) = manager(&bin, BreakingPolicy::Accept);
        let err = manager
            .upgrade(
                &spec(),
                &VersionTarget::Latest,
                false,
                &registry,
                &NullVersionSource,
                &store,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UpgradeError::NoKnownVersion { .. }));
    }

    #[tokio::test]
    async fn test_already_at_target_is_a_noop() {
        let dir = tempfile::TempDir::new().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        write_binary(&bin, "tool", "1.0.0");
        let marker = dir.path().join("ran");
        let script = write_script(
            dir.path(),
            "install.sh",
            &format!("touch '{}'\nexit 0\n", marker.display()),
        );
        let registry = ScriptRegistry { script };

        let (manager, store) = manager(&bin, BreakingPolicy::Accept);
        let outcome = manager
            .upgrade(
                &spec(),
                &VersionTarget::Exact("1.0.0".to_string()),
                false,
                &registry,
                &NullVersionSource,
                &store,
            )
            .await
            .unwrap();

        assert_eq!(outcome.delta, VersionDelta::None);
        assert!(outcome.result.success);
        assert!(!marker.exists(), "nothing to do, installer must not run");
    }
}
