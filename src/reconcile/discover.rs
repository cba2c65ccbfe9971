//! Search-path discovery of every installation of a tool.

use crate::probe::{extract_version_string, probe_version, scan_search_path};
use crate::reconcile::classify::{classify_path, InstallMethod};
use std::path::PathBuf;
use std::time::Duration;

/// One discovered installation of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    /// Path as found on the search path (may be a symlink).
    pub path: PathBuf,
    /// Resolved real path; at most one record exists per real path.
    pub real_path: PathBuf,
    /// Search-order index; rank 0 is what the shell invokes.
    pub rank: usize,
    /// Classified installation method.
    pub method: InstallMethod,
    /// Basis for the classification.
    pub reason: String,
    /// Version probed from the binary, when it answered.
    pub version: Option<String>,
}

/// Find every executable matching a candidate name, classify it and
/// probe its version.
///
/// Records come back in rank order, deduplicated by resolved real path.
/// A binary that does not answer `--version` still yields a record,
/// with `version: None`.
pub async fn discover_installations<S: AsRef<str>>(
    binary_names: &[S],
    search_path: &str,
    probe_timeout: Duration,
) -> Vec<Installation> {
    let mut installations = Vec::new();

    for found in scan_search_path(binary_names, search_path) {
        let classification = classify_path(&found.path);
        let version = probe_version(&found.path, probe_timeout)
            .await
            .ok()
            .and_then(|out| extract_version_string(&out));

        installations.push(Installation {
            path: found.path,
            real_path: found.real_path,
            rank: found.rank,
            method: classification.method,
            reason: classification.reason,
            version,
        });
    }

    installations
}
