//! Execution engine: single-step installation and bulk scheduling.
//!
//! [`UnitInstaller`] executes exactly one [`InstallStep`](crate::plan::InstallStep)
//! to completion (timeout, failure classification, retry with backoff,
//! checksum verification and post-install validation) and always
//! returns a [`StepResult`]; a fault never crosses its boundary.
//! [`BulkExecutor`] drives a whole [`InstallPlan`](crate::plan::InstallPlan)
//! level by level on a bounded worker pool.

mod backoff;
mod classify;
mod errors;
mod progress;
mod report;
mod scheduler;
mod unit;

pub use backoff::{backoff_delay, Sleeper, TokioSleeper};
pub use classify::{classify_failure, FailureRule, Verdict, RETRYABLE_EXIT_CODES, TRANSIENT_RULES};
pub use errors::InstallError;
pub use progress::{ProgressTracker, ToolProgress, ToolStatus};
pub use report::{RunReport, ToolOutcome};
pub use scheduler::BulkExecutor;
pub use unit::{StepResult, UnitInstaller};
