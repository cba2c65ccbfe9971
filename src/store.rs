//! Persisted engine state: version cache and rollback records.
//!
//! Everything lives as JSON files under the configured state directory.
//! Mutations write a temp file in the same directory and rename it over
//! the target, so a crash mid-write never leaves a corrupt file behind.
//! A coarse lock file serializes concurrent processes; the lock is
//! always taken before any per-record work, and always before touching
//! the progress tracker's mutex.

use crate::registry::{PackageManager, UpstreamVersion};
use crate::OrchestratorConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

const VERSIONS_FILE: &str = "versions.json";
const ROLLBACK_FILE: &str = "rollback.json";
const LOCK_FILE: &str = ".lock";

const LOCK_RETRIES: u32 = 20;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Failure touching persisted state.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The state directory lock stayed held past the retry budget.
    ///
    /// Retryable: another process probably holds it; trying again
    /// later is safe. A stale lock from a crashed process must be
    /// removed by hand.
    #[error("could not acquire state lock at '{0}' within the retry budget")]
    LockTimeout(PathBuf),

    /// Filesystem error reading or writing state.
    #[error("state i/o error at '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A state file exists but does not parse.
    #[error("corrupt state file at '{path}'")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A cached upstream version lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedVersion {
    pub latest_version: String,
    /// Where the version was learned.
    pub provenance: String,
    /// Seconds since the Unix epoch at fetch time.
    pub fetched_at: u64,
}

/// What to restore when an upgrade goes wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackRecord {
    pub tool: String,
    /// Version that was verified working before the upgrade.
    pub previous_version: String,
    /// Manager that should perform the restore.
    pub manager: PackageManager,
}

/// Holds the state directory lock; releases it on drop.
struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// File-backed store for the version cache and rollback records.
///
/// Constructed from the configured `state_dir`; when that is unset the
/// store is inert and every read comes back empty.
///
/// # Example
///
/// ```rust
/// use devtool_orchestrator::{OrchestratorConfig, StateStore};
///
/// let config = OrchestratorConfig::default();
/// let store = StateStore::new(&config);
/// // No state_dir configured: reads are empty, writes are no-ops.
/// assert!(store.cached_version("ripgrep").unwrap().is_none());
/// ```
pub struct StateStore {
    dir: Option<PathBuf>,
    ttl: Duration,
}

impl StateStore {
    pub fn new(config: &OrchestratorConfig) -> Self {
        Self {
            dir: config.state_dir.clone(),
            ttl: config.cache_ttl,
        }
    }

    /// Whether persistence is active.
    pub fn is_persistent(&self) -> bool {
        self.dir.is_some()
    }

    /// Fresh cached version for a tool, if any.
    ///
    /// Entries older than the configured TTL are ignored, not deleted;
    /// the next write replaces them.
    pub fn cached_version(&self, tool: &str) -> Result<Option<CachedVersion>, StoreError> {
        let Some(dir) = &self.dir else {
            return Ok(None);
        };
        let cache: HashMap<String, CachedVersion> = read_json(&dir.join(VERSIONS_FILE))?;
        Ok(cache.get(tool).filter(|c| self.is_fresh(c)).cloned())
    }

    /// Record an upstream version lookup.
    pub fn record_version(
        &self,
        tool: &str,
        version: &UpstreamVersion,
    ) -> Result<(), StoreError> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let _lock = acquire_lock(dir)?;
        let path = dir.join(VERSIONS_FILE);
        let mut cache: HashMap<String, CachedVersion> = read_json(&path)?;
        cache.insert(
            tool.to_string(),
            CachedVersion {
                latest_version: version.version.clone(),
                provenance: version.provenance.clone(),
                fetched_at: epoch_seconds(),
            },
        );
        write_json(dir, &path, &cache)
    }

    /// Last persisted rollback record for a tool.
    pub fn rollback_record(&self, tool: &str) -> Result<Option<RollbackRecord>, StoreError> {
        let Some(dir) = &self.dir else {
            return Ok(None);
        };
        let records: HashMap<String, RollbackRecord> = read_json(&dir.join(ROLLBACK_FILE))?;
        Ok(records.get(tool).cloned())
    }

    /// Persist a rollback record, replacing any previous one.
    pub fn record_rollback(&self, record: &RollbackRecord) -> Result<(), StoreError> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let _lock = acquire_lock(dir)?;
        let path = dir.join(ROLLBACK_FILE);
        let mut records: HashMap<String, RollbackRecord> = read_json(&path)?;
        records.insert(record.tool.clone(), record.clone());
        write_json(dir, &path, &records)
    }

    /// Drop the rollback record for a tool after a confirmed-good state.
    pub fn clear_rollback(&self, tool: &str) -> Result<(), StoreError> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let _lock = acquire_lock(dir)?;
        let path = dir.join(ROLLBACK_FILE);
        let mut records: HashMap<String, RollbackRecord> = read_json(&path)?;
        if records.remove(tool).is_some() {
            write_json(dir, &path, &records)?;
        }
        Ok(())
    }

    fn is_fresh(&self, cached: &CachedVersion) -> bool {
        epoch_seconds().saturating_sub(cached.fetched_at) <= self.ttl.as_secs()
    }
}

fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn acquire_lock(dir: &Path) -> Result<LockGuard, StoreError> {
    fs::create_dir_all(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(LOCK_FILE);
    for _ in 0..LOCK_RETRIES {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let _ = write!(file, "{}", std::process::id());
                return Ok(LockGuard { path });
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                std::thread::sleep(LOCK_RETRY_DELAY);
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        }
    }
    Err(StoreError::LockTimeout(path))
}

fn read_json<T: for<'de> Deserialize<'de> + Default>(path: &Path) -> Result<T, StoreError> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write via temp-file-then-rename in the same directory.
fn write_json<T: Serialize>(dir: &Path, path: &Path, value: &T) -> Result<(), StoreError> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    serde_json::to_writer_pretty(&mut tmp, value).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
