//! Version delta classification for upgrade decisions.

use semver::Version;
use std::cmp::Ordering;

/// How far apart the current and target versions are.
///
/// Drives the breaking-change policy: only `Major` is a breaking
/// crossing. Non-semver versions (date-based schemes and the like) fall
/// back to ordinal string comparison, which can never be `Major` and so
/// never trips the reject policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionDelta {
    /// Major component differs; potentially breaking.
    Major,
    /// Same major, different minor.
    Minor,
    /// Same major and minor, different patch or pre-release.
    Patch,
    /// Versions are equal; nothing to do.
    None,
    /// At least one side is not semver; ordinal string comparison only.
    Ordinal(Ordering),
    /// No current version to compare against.
    Unknown,
}

impl VersionDelta {
    /// Whether the policy layer must treat this as a breaking crossing.
    pub fn is_breaking(&self) -> bool {
        matches!(self, Self::Major)
    }
}

fn parse(raw: &str) -> Option<Version> {
    Version::parse(raw.trim().trim_start_matches('v')).ok()
}

/// Classify the jump from `current` to `target`.
///
/// # Example
///
/// ```rust
/// use devtool_orchestrator::VersionDelta;
/// use devtool_orchestrator::classify_delta;
///
/// assert_eq!(classify_delta(Some("1.2.3"), "2.0.0"), VersionDelta::Major);
/// assert_eq!(classify_delta(Some("1.2.3"), "1.3.0"), VersionDelta::Minor);
/// assert_eq!(classify_delta(None, "2.0.0"), VersionDelta::Unknown);
/// ```
pub fn classify_delta(current: Option<&str>, target: &str) -> VersionDelta {
    let Some(current) = current else {
        return VersionDelta::Unknown;
    };

    match (parse(current), parse(target)) {
        (Some(cur), Some(tgt)) => {
            if cur == tgt {
                VersionDelta::None
            } else if cur.major != tgt.major {
                VersionDelta::Major
            } else if cur.minor != tgt.minor {
                VersionDelta::Minor
            } else {
                VersionDelta::Patch
            }
        }
        _ => {
            if current == target {
                VersionDelta::None
            } else {
                VersionDelta::Ordinal(current.cmp(target))
            }
        }
    }
}
