//! Version extraction from CLI output.

use crate::probe::ProbeError;
use regex::Regex;
use semver::Version;
use std::sync::OnceLock;

fn semver_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+)\.(\d+)\.(\d+)(?:[-+][0-9A-Za-z.-]+)?").expect("Invalid version regex")
    })
}

/// Extract a semantic version from arbitrary CLI output.
///
/// Handles the common shapes of `--version` output:
///
/// - `ripgrep 14.1.0 (rev abc123)` -> 14.1.0
/// - `v1.1.25` -> 1.1.25
/// - `tool-cli 0.87.0-beta.1` -> 0.87.0-beta.1
pub fn parse_version(output: &str) -> Result<Version, ProbeError> {
    let caps = semver_pattern()
        .captures(output)
        .ok_or(ProbeError::VersionParseFailed)?;
    let matched = caps
        .get(0)
        .ok_or(ProbeError::VersionParseFailed)?
        .as_str();
    Version::parse(matched).map_err(|_| ProbeError::VersionParseFailed)
}

/// Extract the raw version string without requiring valid semver.
///
/// Used where the tool reports something non-semantic (date-based
/// versions and the like); falls back to the first whitespace-delimited
/// token that contains a digit.
pub fn extract_version_string(output: &str) -> Option<String> {
    if let Some(m) = semver_pattern().find(output) {
        return Some(m.as_str().to_string());
    }
    output
        .split_whitespace()
        .find(|token| token.chars().any(|c| c.is_ascii_digit()))
        .map(|token| token.trim_start_matches('v').to_string())
}
