//! # devtool-orchestrator
//!
//! Installation orchestration for developer command-line tools.
//!
//! Given a set of tool specifications, the engine plans which package
//! manager installs each tool, orders the steps by dependency, executes
//! them concurrently on a bounded worker pool with retry and
//! verification, reconciles competing installations already on the
//! system, and manages version upgrades with rollback.
//!
//! ## Features
//!
//! - [`ToolSpec`] describing a tool, its ecosystem and dependencies
//! - [`Orchestrator::build_plan`] binding specs to managers and ordering
//!   steps into concurrency-safe levels
//! - [`Orchestrator::execute_plan`] running a plan with per-tool
//!   timeout, transient-failure retry and post-install validation
//! - [`Orchestrator::reconcile`] detecting and classifying every
//!   installation of a tool on the search path
//! - [`Orchestrator::upgrade`] applying version upgrades under a
//!   breaking-change policy, with best-effort rollback
//!
//! ## Example
//!
//! ```rust,no_run
//! use devtool_orchestrator::{Ecosystem, Orchestrator, OrchestratorConfig, ToolSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let orchestrator = Orchestrator::with_defaults(OrchestratorConfig::default())
//!         .expect("default configuration is valid");
//!
//!     let specs = vec![
//!         ToolSpec::new("ripgrep", Ecosystem::Rust).with_binary_names(["rg"]),
//!         ToolSpec::new("httpie", Ecosystem::Python).with_binary_names(["http"]),
//!     ];
//!
//!     let plan = orchestrator.build_plan(&specs).expect("plan resolves");
//!     let report = orchestrator.execute_plan(plan).await;
//!     for (tool, outcome) in &report.outcomes {
//!         println!("{tool}: success={}", outcome.is_success());
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod exec;
pub mod plan;
pub mod probe;
pub mod reconcile;
pub mod registry;
pub mod store;
pub mod tool_spec;
pub mod upgrade;

pub use config::{
    BreakingPolicy, ConfigError, OrchestratorConfig, ReconcileStrategy, MAX_WORKERS,
};
pub use error::OrchestratorError;
pub use exec::{
    backoff_delay, BulkExecutor, InstallError, ProgressTracker, RunReport, StepResult, ToolOutcome,
    ToolProgress, ToolStatus, UnitInstaller,
};
pub use plan::{build_steps, resolve_levels, InstallPlan, InstallStep, PlanError};
pub use probe::{find_executable, probe_version, ProbeError};
pub use reconcile::{
    Confirm, InstallMethod, ReconcileError, Reconciler, ReconciliationReport, Recommendation,
};
pub use registry::{
    CommandTemplate, ManagerRegistry, NullVersionSource, PackageManager, StaticRegistry,
    UpstreamVersion, VersionSource,
};
pub use store::{CachedVersion, RollbackRecord, StateStore, StoreError};
pub use tool_spec::{ChecksumSpec, Ecosystem, ToolSpec, VersionTarget};
pub use upgrade::{
    classify_delta, UpgradeError, UpgradeManager, UpgradeOutcome, VersionDelta,
};

pub use tokio_util::sync::CancellationToken;

use std::sync::Arc;

/// Facade tying planning, execution, reconciliation and upgrades
/// together behind one validated configuration.
///
/// Collaborator concerns (which managers exist on this host, what the
/// latest upstream version is) come in through the [`ManagerRegistry`]
/// and [`VersionSource`] traits; [`Orchestrator::with_defaults`] wires
/// in the built-in [`StaticRegistry`] and a version source that knows
/// nothing.
pub struct Orchestrator {
    config: OrchestratorConfig,
    registry: Arc<dyn ManagerRegistry>,
    version_source: Arc<dyn VersionSource>,
    store: StateStore,
}

impl Orchestrator {
    /// Build an orchestrator, validating the configuration up front.
    pub fn new(
        config: OrchestratorConfig,
        registry: Arc<dyn ManagerRegistry>,
        version_source: Arc<dyn VersionSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let store = StateStore::new(&config);
        Ok(Self {
            config,
            registry,
            version_source,
            store,
        })
    }

    /// Build an orchestrator with the built-in registry and no version
    /// source.
    pub fn with_defaults(config: OrchestratorConfig) -> Result<Self, ConfigError> {
        Self::new(config, Arc::new(StaticRegistry), Arc::new(NullVersionSource))
    }

    /// The validated configuration in effect.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// The persisted state store in effect.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Bind specs to managers and order them into levels.
    ///
    /// Fails fast: duplicate names, unavailable ecosystems and
    /// dependency cycles are all rejected before anything executes.
    pub fn build_plan(&self, specs: &[ToolSpec]) -> Result<InstallPlan, PlanError> {
        let steps = build_steps(specs, self.registry.as_ref())?;
        resolve_levels(steps)
    }

    /// Execute a plan to completion without external observation.
    pub async fn execute_plan(&self, plan: InstallPlan) -> RunReport {
        let tracker = ProgressTracker::new();
        let cancel = CancellationToken::new();
        self.execute_plan_with_progress(plan, &tracker, &cancel).await
    }

    /// Execute a plan, reporting per-tool progress through `tracker`
    /// and honoring cooperative cancellation via `cancel`.
    ///
    /// A partially failing run still returns a full report; every tool
    /// in the plan gets an outcome.
    pub async fn execute_plan_with_progress(
        &self,
        plan: InstallPlan,
        tracker: &ProgressTracker,
        cancel: &CancellationToken,
    ) -> RunReport {
        tracing::info!(
            steps = plan.step_count(),
            levels = plan.levels.len(),
            workers = self.config.worker_count,
            "executing install plan"
        );
        let executor = BulkExecutor::new(self.config.worker_count, UnitInstaller::new(&self.config));
        executor.run(plan, tracker, cancel).await
    }

    /// Scan the search path for every installation of a tool and apply
    /// the configured reconciliation strategy. Read-only.
    pub async fn reconcile(&self, spec: &ToolSpec) -> ReconciliationReport {
        let preferred = self
            .registry
            .preferred(spec.ecosystem)
            .map(InstallMethod::from);
        Reconciler::new(&self.config)
            .reconcile(&spec.name, &spec.binary_names, preferred)
            .await
    }

    /// Apply a reconciliation report's removal recommendations.
    ///
    /// Requires [`Confirm::Proceed`] to delete anything; see
    /// [`Reconciler::apply_removals`].
    pub fn apply_removals(
        &self,
        report: &ReconciliationReport,
        confirm: Confirm,
    ) -> Result<Vec<std::path::PathBuf>, ReconcileError> {
        Reconciler::new(&self.config).apply_removals(report, confirm)
    }

    /// Upgrade one tool to `target` under the configured breaking
    /// policy.
    pub async fn upgrade(
        &self,
        spec: &ToolSpec,
        target: &VersionTarget,
    ) -> Result<UpgradeOutcome, UpgradeError> {
        self.upgrade_with_force(spec, target, false).await
    }

    /// Upgrade with an explicit override of the reject policy.
    pub async fn upgrade_with_force(
        &self,
        spec: &ToolSpec,
        target: &VersionTarget,
        force: bool,
    ) -> Result<UpgradeOutcome, UpgradeError> {
        UpgradeManager::new(&self.config)
            .upgrade(
                spec,
                target,
                force,
                self.registry.as_ref(),
                self.version_source.as_ref(),
                &self.store,
            )
            .await
    }
}
