//! Error types for single-step installation.
//!
//! Each variant carries a `fix` field with an actionable suggestion,
//! and distinguishes transient causes (retried per policy) from
//! permanent ones (surfaced immediately).

use std::time::Duration;
use thiserror::Error;

/// Failure of one install step.
///
/// The retry loop consults [`InstallError::is_retryable`]; everything
/// except a transiently-classified non-zero exit is permanent. Checksum
/// mismatches and validation failures are always permanent.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum InstallError {
    /// The install command exceeded its timeout and was killed.
    ///
    /// Not retried by this layer; the caller decides whether a longer
    /// timeout is warranted.
    #[error("installation of '{tool}' timed out after {duration:?}")]
    Timeout {
        tool: String,
        duration: Duration,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The installer program itself could not be launched.
    #[error("could not launch '{program}': {message}")]
    ExecutableNotFound {
        program: String,
        message: String,
        fix: String,
    },

    /// The installer ran but exited non-zero.
    ///
    /// `retryable` reflects classification of the exit code and
    /// captured error text against the transient-signature table.
    #[error("installer for '{tool}' exited with code {exit_code:?}")]
    NonZeroExit {
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
        retryable: bool,
        fix: String,
    },

    /// The installed artifact's digest does not match the expected one.
    ///
    /// Permanent; never retried regardless of retry configuration.
    #[error("checksum mismatch for '{tool}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        tool: String,
        expected: String,
        actual: String,
        fix: String,
    },

    /// The install command succeeded but the binary is missing or its
    /// version probe failed or mismatched.
    #[error("post-install validation failed for '{tool}': {reason}")]
    ValidationFailed {
        tool: String,
        reason: String,
        fix: String,
    },
}

impl InstallError {
    /// Whether the retry loop may attempt this step again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NonZeroExit { retryable: true, .. })
    }

    /// Actionable suggestion for fixing this error.
    pub fn fix_suggestion(&self) -> &str {
        match self {
            Self::Timeout { fix, .. } => fix,
            Self::ExecutableNotFound { fix, .. } => fix,
            Self::NonZeroExit { fix, .. } => fix,
            Self::ChecksumMismatch { fix, .. } => fix,
            Self::ValidationFailed { fix, .. } => fix,
        }
    }
}
