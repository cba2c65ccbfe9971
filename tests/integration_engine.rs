//! End-to-end tests for the orchestrator facade.
//!
//! Installers are fixture shell scripts and the search path is pinned
//! to a temp directory, so these tests pass regardless of what is
//! actually installed on the host.

#![cfg(unix)]

use devtool_orchestrator::{
    BreakingPolicy, CancellationToken, CommandTemplate, Confirm, Ecosystem, InstallMethod,
    ManagerRegistry, Orchestrator, OrchestratorConfig, PackageManager, ProgressTracker,
    ReconcileStrategy, ToolOutcome, ToolSpec, ToolStatus, UpgradeError, VersionTarget,
};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Registry driving every install through one fixture script.
///
/// The script receives the tool name and target version; tools listed
/// in `broken` get a script that always fails.
struct ScriptRegistry {
    install: PathBuf,
    fail: PathBuf,
    broken: Vec<String>,
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
        spec: &ToolSpec,
        target: &VersionTarget,
    ) -> Option<CommandTemplate> {
        let program = if self.broken.contains(&spec.name) {
            &self.fail
        } else {
            &self.install
        };
        let version = match target {
            VersionTarget::Latest => "1.0.0".to_string(),
            VersionTarget::Exact(v) => v.clone(),
        };
        Some(CommandTemplate {
            program: program.to_string_lossy().into_owned(),
            args: vec![spec.name.clone(), version],
            env_vars: vec![],
        })
    }
}

struct Fixture {
    root: tempfile::TempDir,
    bin: PathBuf,
    order_log: PathBuf,
    registry: Arc<ScriptRegistry>,
    config: OrchestratorConfig,
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{body}")).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn fixture(broken: &[&str]) -> Fixture {
    let root = tempfile::TempDir::new().unwrap();
    let bin = root.path().join("bin");
    fs::create_dir_all(&bin).unwrap();
    let order_log = root.path().join("order.log");

    // Appends the tool to the order log, then produces a fake binary
    // answering --version with the target version.
    let install = root.path().join("install.sh");
    write_script(
        &install,
        &format!(
            "echo \"$1\" >> '{log}'\n\
             printf '#!/bin/sh\\necho \"%s %s\"\\n' \"$1\" \"$2\" > '{bin}'/\"$1\"\n\
             chmod +x '{bin}'/\"$1\"\n\
             exit 0\n",
            log = order_log.display(),
            bin = bin.display()
        ),
    );

    let fail = root.path().join("fail.sh");
    write_script(&fail, "echo 'error: could not find package' >&2\nexit 1\n");

    let mut config = OrchestratorConfig::default();
    config.search_path = Some(bin.to_string_lossy().into_owned());
    config.safe_root = Some(root.path().to_path_buf());
    config.state_dir = Some(root.path().join("state"));

    Fixture {
        registry: Arc::new(ScriptRegistry {
            install,
            fail,
            broken: broken.iter().map(|s| s.to_string()).collect(),
        }),
        bin,
        order_log,
        config,
        root,
    }
}

fn orchestrator(fixture: &Fixture) -> Orchestrator {
    Orchestrator::new(
        fixture.config.clone(),
        fixture.registry.clone(),
        Arc::new(devtool_orchestrator::NullVersionSource),
    )
    .unwrap()
}

#[tokio::test]
async fn test_plan_and_execute_round_trip() {
    let fx = fixture(&[]);
    let orch = orchestrator(&fx);

    let specs = vec![
        ToolSpec::new("alpha", Ecosystem::Rust),
        ToolSpec::new("beta", Ecosystem::Rust).with_depends_on(["alpha"]),
        ToolSpec::new("gamma", Ecosystem::Rust),
    ];
    let plan = orch.build_plan(&specs).unwrap();
    assert_eq!(plan.step_count(), 3);
    assert_eq!(plan.levels.len(), 2, "beta must wait for alpha");

    let report = orch.execute_plan(plan).await;
    assert!(report.succeeded());
    assert_eq!(report.success_count(), 3);

    // Every tool produced a working binary on the pinned search path
    for tool in ["alpha", "beta", "gamma"] {
        assert!(fx.bin.join(tool).exists(), "{tool} binary missing");
        match report.outcome(tool) {
            Some(ToolOutcome::Success(result)) => {
                assert_eq!(result.installed_version.as_deref(), Some("1.0.0"));
            }
            other => panic!("unexpected outcome for {tool}: {other:?}"),
        }
    }

    // The install log proves alpha ran before beta
    let order = fs::read_to_string(&fx.order_log).unwrap();
    let position = |tool: &str| order.lines().position(|l| l == tool).unwrap();
    assert!(position("alpha") < position("beta"));
}

#[tokio::test]
async fn test_partial_failure_still_yields_full_report() {
    let fx = fixture(&["broken"]);
    let orch = orchestrator(&fx);

    let specs = vec![
        ToolSpec::new("broken", Ecosystem::Rust),
        ToolSpec::new("healthy", Ecosystem::Rust),
        ToolSpec::new("dependent", Ecosystem::Rust).with_depends_on(["broken"]),
    ];
    let plan = orch.build_plan(&specs).unwrap();

    let tracker = ProgressTracker::new();
    let cancel = CancellationToken::new();
    let report = orch
        .execute_plan_with_progress(plan, &tracker, &cancel)
        .await;

    assert!(!report.succeeded());
    assert_eq!(report.outcomes.len(), 3, "every tool gets an outcome");
    assert!(matches!(report.outcome("broken"), Some(ToolOutcome::Failed(_))));
    assert!(matches!(
        report.outcome("healthy"),
        Some(ToolOutcome::Success(_))
    ));
    assert!(matches!(
        report.outcome("dependent"),
        Some(ToolOutcome::Blocked { .. })
    ));
    assert_eq!(tracker.status_of("dependent"), Some(ToolStatus::Blocked));
}

#[tokio::test]
async fn test_cancelled_run_marks_everything_cancelled() {
    let fx = fixture(&[]);
    let orch = orchestrator(&fx);

    let plan = orch
        .build_plan(&[ToolSpec::new("alpha", Ecosystem::Rust)])
        .unwrap();

    let tracker = ProgressTracker::new();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = orch
        .execute_plan_with_progress(plan, &tracker, &cancel)
        .await;

    assert_eq!(report.success_count(), 0);
    assert!(matches!(
        report.outcome("alpha"),
        Some(ToolOutcome::Cancelled)
    ));
    assert!(!fx.order_log.exists(), "no installer may run after cancel");
}

#[tokio::test]
async fn test_reconcile_detects_competing_installations() {
    let fx = fixture(&[]);

    // A second installation shadowed by the pinned bin directory
    let cargo_bin = fx.root.path().join(".cargo/bin");
    fs::create_dir_all(&cargo_bin).unwrap();
    write_script(&fx.bin.join("node"), "echo 'node 20.0.0'\n");
    write_script(&cargo_bin.join("node"), "echo 'node 18.0.0'\n");

    let mut config = fx.config.clone();
    config.search_path = Some(
        std::env::join_paths([&fx.bin, &cargo_bin])
            .unwrap()
            .into_string()
            .unwrap(),
    );
    let orch = Orchestrator::new(
        config,
        fx.registry.clone(),
        Arc::new(devtool_orchestrator::NullVersionSource),
    )
    .unwrap();

    let report = orch.reconcile(&ToolSpec::new("node", Ecosystem::Node)).await;
    assert_eq!(report.records.len(), 2);
    assert!(report.has_conflicts());
    assert_eq!(report.winner, Some(0));
    assert!(report.records[1].shadowed);
    assert_eq!(
        report.records[1].installation.method,
        InstallMethod::Cargo
    );
    // Default strategy is parallel: nothing recommended for removal
    let removed = orch.apply_removals(&report, Confirm::DryRun).unwrap();
    assert!(removed.is_empty());
}

#[tokio::test]
async fn test_aggressive_reconcile_dry_run_lists_conflict() {
    let fx = fixture(&[]);

    let cargo_bin = fx.root.path().join(".cargo/bin");
    fs::create_dir_all(&cargo_bin).unwrap();
    write_script(&cargo_bin.join("rg"), "echo 'ripgrep 14.1.0'\n");
    write_script(&fx.bin.join("rg"), "echo 'ripgrep 13.0.0'\n");

    let mut config = fx.config.clone();
    config.reconcile_strategy = ReconcileStrategy::Aggressive;
    config.search_path = Some(
        std::env::join_paths([&cargo_bin, &fx.bin])
            .unwrap()
            .into_string()
            .unwrap(),
    );
    let orch = Orchestrator::new(
        config,
        fx.registry.clone(),
        Arc::new(devtool_orchestrator::NullVersionSource),
    )
    .unwrap();

    // Preferred manager for Rust is cargo; the script-installed copy
    // in bin/ is the conflict.
    let report = orch
        .reconcile(&ToolSpec::new("ripgrep", Ecosystem::Rust).with_binary_names(["rg"]))
        .await;
    let would_remove = orch.apply_removals(&report, Confirm::DryRun).unwrap();
    assert_eq!(would_remove, vec![fx.bin.join("rg")]);
    assert!(fx.bin.join("rg").exists(), "dry run must not delete");
}

#[tokio::test]
async fn test_upgrade_reject_policy_end_to_end() {
    let fx = fixture(&[]);
    write_script(&fx.bin.join("alpha"), "echo 'alpha 1.0.0'\n");

    let mut config = fx.config.clone();
    config.breaking_policy = BreakingPolicy::Reject;
    let orch = Orchestrator::new(
        config,
        fx.registry.clone(),
        Arc::new(devtool_orchestrator::NullVersionSource),
    )
    .unwrap();

    let spec = ToolSpec::new("alpha", Ecosystem::Rust);
    let err = orch
        .upgrade(&spec, &VersionTarget::Exact("2.0.0".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, UpgradeError::PolicyViolation { .. }));
    assert!(!fx.order_log.exists(), "installer must not have run");

    // Forcing goes through and replaces the binary
    let outcome = orch
        .upgrade_with_force(&spec, &VersionTarget::Exact("2.0.0".to_string()), true)
        .await
        .unwrap();
    assert!(outcome.result.success, "{:?}", outcome.result.error);
    assert_eq!(
        outcome.result.installed_version.as_deref(),
        Some("2.0.0")
    );
}
