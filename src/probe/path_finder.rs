//! Search-path enumeration and executable lookup.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// An executable found on the search path, with its rank.
///
/// Rank is the index of the containing directory in search order; the
/// rank-0 entry for a name is the one the shell would actually invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedExecutable {
    /// Path as found (may be a symlink).
    pub path: PathBuf,
    /// Resolved real path, used for deduplication.
    pub real_path: PathBuf,
    /// Search-order index of the containing directory.
    pub rank: usize,
}

/// Find the first executable matching any of the candidate names.
///
/// Resolution follows the system PATH via the `which` crate, which
/// handles symlinks and platform differences. Candidates are tried in
/// order; the first hit wins.
pub fn find_executable<S: AsRef<str>>(names: &[S]) -> Option<PathBuf> {
    names
        .iter()
        .find_map(|name| which::which(name.as_ref()).ok())
}

/// Enumerate every executable matching any candidate name, in search
/// order, deduplicated by resolved real path.
///
/// Two PATH entries pointing at the same file (aliased directories,
/// symlinked binaries) collapse into one record keeping the earliest
/// rank. Directories that cannot be read are skipped.
pub fn scan_search_path<S: AsRef<str>>(names: &[S], search_path: &str) -> Vec<RankedExecutable> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut found = Vec::new();

    for (rank, dir) in std::env::split_paths(search_path).enumerate() {
        if dir.as_os_str().is_empty() {
            continue;
        }
        for name in names {
            let candidate = dir.join(name.as_ref());
            if !is_executable_file(&candidate) {
                continue;
            }
            let real_path = candidate.canonicalize().unwrap_or_else(|_| candidate.clone());
            if seen.insert(real_path.clone()) {
                found.push(RankedExecutable {
                    path: candidate,
                    real_path,
                    rank,
                });
            }
        }
    }

    found
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}
