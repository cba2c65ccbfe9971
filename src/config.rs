//! Validated runtime configuration.
//!
//! [`OrchestratorConfig`] collects every tunable the engine honors:
//! worker pool size, per-step timeout, retry policy, reconciliation
//! strategy, breaking-change policy and cache time-to-live. Values are
//! checked once, up front, via [`OrchestratorConfig::validate`]; a bad
//! value is a [`ConfigError`] before any work starts.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on the worker pool size.
pub const MAX_WORKERS: usize = 32;

/// Bounds on the per-step timeout.
pub const MIN_STEP_TIMEOUT: Duration = Duration::from_secs(1);
pub const MAX_STEP_TIMEOUT: Duration = Duration::from_secs(60);

/// How the reconciler treats multiple installations of the same tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ReconcileStrategy {
    /// Report everything, recommend removing nothing.
    Parallel,
    /// Recommend removing every installation except the one matching
    /// the preferred manager, never outside the safe root.
    Aggressive,
}

/// How the upgrade manager treats a major-version boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum BreakingPolicy {
    /// Proceed without comment.
    Accept,
    /// Proceed, but flag the result.
    Warn,
    /// Refuse before invoking the installer, unless forced.
    Reject,
}

/// Configuration error raised at startup, before any execution.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Worker count outside 1..=32.
    #[error("worker count {0} out of range 1..={MAX_WORKERS}")]
    WorkerCountOutOfRange(usize),

    /// Step timeout outside the supported range.
    #[error("step timeout {0:?} out of range {MIN_STEP_TIMEOUT:?}..={MAX_STEP_TIMEOUT:?}")]
    StepTimeoutOutOfRange(Duration),

    /// Jitter fraction outside 0.0..=1.0.
    #[error("jitter fraction {0} out of range 0.0..=1.0")]
    JitterOutOfRange(f64),

    /// Backoff base must be non-zero.
    #[error("backoff base must be greater than zero")]
    ZeroBackoffBase,
}

/// Runtime configuration for the orchestration engine.
///
/// # Example
///
/// ```rust
/// use devtool_orchestrator::OrchestratorConfig;
///
/// let config = OrchestratorConfig::default();
/// assert!(config.validate().is_ok());
/// assert!(config.worker_count >= 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Concurrent install workers (1..=32).
    pub worker_count: usize,

    /// Timeout applied to each step's command execution.
    ///
    /// Individual steps may carry their own override for long-running
    /// package-manager operations.
    pub step_timeout: Duration,

    /// Maximum retries for a retryably-failed step.
    pub max_retries: u32,

    /// Base delay for exponential retry backoff.
    pub backoff_base: Duration,

    /// Jitter fraction (0.0..=1.0) added on top of the backoff delay.
    pub jitter: f64,

    /// Strategy applied by the reconciler.
    pub reconcile_strategy: ReconcileStrategy,

    /// Policy applied by the upgrade manager at major boundaries.
    pub breaking_policy: BreakingPolicy,

    /// How long a cached upstream version stays fresh.
    pub cache_ttl: Duration,

    /// Directory for the version cache and rollback records.
    ///
    /// `None` disables persistence.
    pub state_dir: Option<PathBuf>,

    /// Root under which the reconciler may recommend removals.
    ///
    /// Defaults to the home directory when unset.
    pub safe_root: Option<PathBuf>,

    /// Search path used for binary discovery and post-install
    /// validation.
    ///
    /// Defaults to the process `PATH` when unset.
    pub search_path: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        let host = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            worker_count: host.min(8),
            step_timeout: Duration::from_secs(60),
            max_retries: 2,
            backoff_base: Duration::from_millis(500),
            jitter: 0.25,
            reconcile_strategy: ReconcileStrategy::Parallel,
            breaking_policy: BreakingPolicy::Warn,
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            state_dir: None,
            safe_root: None,
            search_path: None,
        }
    }
}

impl OrchestratorConfig {
    /// Check every field against its documented range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 || self.worker_count > MAX_WORKERS {
            return Err(ConfigError::WorkerCountOutOfRange(self.worker_count));
        }
        if self.step_timeout < MIN_STEP_TIMEOUT || self.step_timeout > MAX_STEP_TIMEOUT {
            return Err(ConfigError::StepTimeoutOutOfRange(self.step_timeout));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigError::JitterOutOfRange(self.jitter));
        }
        if self.backoff_base.is_zero() {
            return Err(ConfigError::ZeroBackoffBase);
        }
        Ok(())
    }

    /// Safe root for removal recommendations: the configured root, or
    /// the home directory when none is set.
    pub fn effective_safe_root(&self) -> Option<PathBuf> {
        self.safe_root.clone().or_else(dirs::home_dir)
    }
}
