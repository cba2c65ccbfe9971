//! Reconciliation of competing installations of the same tool.
//!
//! For one tool, the reconciler enumerates every search-path directory
//! in order, finds executables matching any candidate name, dedupes
//! them by resolved real path, classifies each by installation method,
//! determines the PATH-winning entry and reports conflicts. It is
//! read-only; removal is a distinct, explicitly confirmed operation.

mod classify;
mod discover;
mod report;

pub use classify::{classify_path, Classification, InstallMethod};
pub use discover::{discover_installations, Installation};
pub use report::{
    build_report, InstallationRecord, Recommendation, ReconciliationReport, ShadowWarning,
};

use crate::config::{OrchestratorConfig, ReconcileStrategy};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure applying reconciliation removals.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReconcileError {
    /// A removal target escaped the safe root; nothing was removed.
    #[error("refusing to remove '{0}': outside the safe root")]
    RemovalOutsideSafeRoot(PathBuf),

    /// Filesystem error while removing an installation.
    #[error("could not remove '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Explicit consent token for destructive reconciliation.
///
/// `DryRun` reports what would be removed without touching disk;
/// `Proceed` is the only value that deletes anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirm {
    DryRun,
    Proceed,
}

/// Detects and reports competing installations of a tool.
pub struct Reconciler {
    strategy: ReconcileStrategy,
    safe_root: Option<PathBuf>,
    probe_timeout: Duration,
    search_path: Option<String>,
}

impl Reconciler {
    pub fn new(config: &OrchestratorConfig) -> Self {
        Self {
            strategy: config.reconcile_strategy,
            safe_root: config.effective_safe_root(),
            probe_timeout: Duration::from_secs(5),
            search_path: config.search_path.clone(),
        }
    }

    /// Override the search path; defaults to the process `PATH`.
    pub fn with_search_path(mut self, search_path: impl Into<String>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Scan, classify and report. Read-only.
    ///
    /// `preferred` is the installation method matching the preferred
    /// manager for the tool's ecosystem; it drives the aggressive
    /// strategy's keep decision and the shadowing warning.
    pub async fn reconcile<S: AsRef<str>>(
        &self,
        tool: &str,
        binary_names: &[S],
        preferred: Option<InstallMethod>,
    ) -> ReconciliationReport {
        let search_path = self
            .search_path
            .clone()
            .or_else(|| std::env::var("PATH").ok())
            .unwrap_or_default();

        let installations =
            discover_installations(binary_names, &search_path, self.probe_timeout).await;

        tracing::debug!(
            tool,
            found = installations.len(),
            strategy = %self.strategy,
            "reconciliation scan complete"
        );

        build_report(
            tool,
            installations,
            self.strategy,
            preferred,
            self.safe_root.as_deref(),
        )
    }

    /// Apply the report's removal recommendations.
    ///
    /// Never automatic: requires [`Confirm::Proceed`], and re-checks
    /// the safe root before unlinking anything. Returns the removed
    /// (or, for a dry run, would-be-removed) paths.
    pub fn apply_removals(
        &self,
        report: &ReconciliationReport,
        confirm: Confirm,
    ) -> Result<Vec<PathBuf>, ReconcileError> {
        let targets: Vec<PathBuf> = report
            .records
            .iter()
            .filter(|r| matches!(r.recommendation, Recommendation::Remove { .. }))
            .map(|r| r.installation.path.clone())
            .collect();

        for path in &targets {
            let inside = self
                .safe_root
                .as_deref()
                .is_some_and(|root| path.starts_with(root));
            if !inside {
                return Err(ReconcileError::RemovalOutsideSafeRoot(path.clone()));
            }
        }

        if confirm == Confirm::DryRun {
            return Ok(targets);
        }

        for path in &targets {
            std::fs::remove_file(path).map_err(|source| ReconcileError::Io {
                path: path.clone(),
                source,
            })?;
            tracing::info!(path = %path.display(), "removed conflicting installation");
        }

        Ok(targets)
    }
}
