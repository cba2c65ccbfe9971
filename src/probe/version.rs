//! Async version check with timeout.

use crate::probe::ProbeError;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Run `{executable} --version` and capture its output.
///
/// The check is wrapped in the given timeout to avoid hanging on
/// unresponsive binaries. Output is taken from stdout, falling back to
/// stderr (some tools write their version there).
pub async fn probe_version(path: &Path, limit: Duration) -> Result<String, ProbeError> {
    let output = timeout(
        limit,
        Command::new(path)
            .arg("--version")
            .kill_on_drop(true)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output(),
    )
    .await
    .map_err(|_| ProbeError::Timeout)?
    .map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            ProbeError::PermissionDenied
        } else {
            ProbeError::ProbeFailed(e.to_string())
        }
    })?;

    if !output.status.success() {
        return Err(ProbeError::ProbeFailed(format!(
            "exit code {:?}",
            output.status.code()
        )));
    }

    let out = if !output.stdout.is_empty() {
        output.stdout
    } else {
        output.stderr
    };

    String::from_utf8(out).map_err(|_| ProbeError::VersionParseFailed)
}
