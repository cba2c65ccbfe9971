//! Executable probing: PATH lookup, version checks, version parsing.
//!
//! This module contains the low-level pieces shared by post-install
//! validation and reconciliation:
//!
//! - `find_executable`: PATH-based lookup of a single binary
//! - `scan_search_path`: ranked enumeration of every matching binary
//! - `probe_version`: async `--version` check with timeout
//! - `parse_version`: regex-based semver extraction from CLI output

mod parser;
mod path_finder;
mod version;

pub use parser::{extract_version_string, parse_version};
pub use path_finder::{find_executable, scan_search_path, RankedExecutable};
pub use version::probe_version;

use thiserror::Error;

/// Failure probing an executable's version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProbeError {
    /// The version command exceeded its timeout.
    #[error("version probe timed out")]
    Timeout,

    /// The executable could not be run due to permissions.
    #[error("permission denied running executable")]
    PermissionDenied,

    /// The command ran but exited non-zero or produced no usable output.
    #[error("version probe failed: {0}")]
    ProbeFailed(String),

    /// No version pattern could be extracted from the output.
    #[error("no version found in output")]
    VersionParseFailed,
}
