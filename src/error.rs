//! Crate-wide error umbrella.

use thiserror::Error;

/// Any error the orchestration engine can surface.
///
/// Each layer keeps its own error type; this umbrella exists for
/// callers that funnel everything through one `Result`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OrchestratorError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Plan(#[from] crate::plan::PlanError),

    #[error(transparent)]
    Install(#[from] crate::exec::InstallError),

    #[error(transparent)]
    Probe(#[from] crate::probe::ProbeError),

    #[error(transparent)]
    Reconcile(#[from] crate::reconcile::ReconcileError),

    #[error(transparent)]
    Upgrade(#[from] crate::upgrade::UpgradeError),

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}
