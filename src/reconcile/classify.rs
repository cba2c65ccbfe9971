//! Installation-method classification for discovered executables.
//!
//! Classification is two-stage: specific path-prefix rules first (a
//! manager's dedicated directory is unambiguous), then a shebang
//! inspection for prefixes shared by several install mechanisms. When
//! both stages come up empty the method is `Unknown` with the reason
//! recorded, never guessed.

use crate::registry::PackageManager;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// How an executable got onto the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[non_exhaustive]
pub enum InstallMethod {
    Cargo,
    Npm,
    Pnpm,
    Pip,
    Uv,
    Brew,
    Go,
    /// mise / asdf style version-manager shims and installs.
    Mise,
    Asdf,
    /// Distribution package (apt, dnf, pacman).
    System,
    /// Shell script or other interpreted wrapper of unknown origin.
    Script,
    /// Native binary with no recognizable provenance.
    Manual,
    /// Could not be determined; reason recorded, never guessed.
    Unknown,
}

impl InstallMethod {
    /// Whether this method corresponds to the given package manager.
    pub fn matches_manager(&self, manager: PackageManager) -> bool {
        matches!(
            (self, manager),
            (Self::Cargo, PackageManager::Cargo)
                | (Self::Npm, PackageManager::Npm)
                | (Self::Pnpm, PackageManager::Pnpm)
                | (Self::Pip, PackageManager::Pip)
                | (Self::Uv, PackageManager::Uv)
                | (Self::Brew, PackageManager::Brew)
                | (Self::Go, PackageManager::Go)
                | (
                    Self::System,
                    PackageManager::Apt | PackageManager::Dnf | PackageManager::Pacman
                )
        )
    }
}

impl From<PackageManager> for InstallMethod {
    fn from(manager: PackageManager) -> Self {
        match manager {
            PackageManager::Cargo => Self::Cargo,
            PackageManager::Npm => Self::Npm,
            PackageManager::Pnpm => Self::Pnpm,
            PackageManager::Pip => Self::Pip,
            PackageManager::Uv => Self::Uv,
            PackageManager::Brew => Self::Brew,
            PackageManager::Go => Self::Go,
            PackageManager::Apt | PackageManager::Dnf | PackageManager::Pacman => Self::System,
        }
    }
}

/// A classification plus how it was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub method: InstallMethod,
    /// Human-readable basis for the verdict (matched marker, shebang,
    /// or why it stayed unknown).
    pub reason: String,
}

/// Unambiguous directory markers, checked in order.
const PREFIX_RULES: &[(&str, InstallMethod)] = &[
    (".cargo/bin", InstallMethod::Cargo),
    (".local/share/mise", InstallMethod::Mise),
    ("mise/installs", InstallMethod::Mise),
    (".asdf", InstallMethod::Asdf),
    (".local/share/pnpm", InstallMethod::Pnpm),
    (".npm-global", InstallMethod::Npm),
    ("node_modules/.bin", InstallMethod::Npm),
    (".nvm/versions", InstallMethod::Npm),
    (".local/share/uv", InstallMethod::Uv),
    ("homebrew", InstallMethod::Brew),
    ("linuxbrew", InstallMethod::Brew),
    ("go/bin", InstallMethod::Go),
    ("/usr/bin", InstallMethod::System),
    ("/usr/sbin", InstallMethod::System),
];

/// Prefixes shared by several mechanisms; resolved via shebang.
const AMBIGUOUS_PREFIXES: &[&str] = &[".local/bin", "/usr/local/bin", "/bin"];

/// Classify one executable by path, falling back to its interpreter
/// declaration when the path alone is ambiguous.
pub fn classify_path(path: &Path) -> Classification {
    let path_str = path.to_string_lossy();

    for (marker, method) in PREFIX_RULES {
        if path_str.contains(marker) {
            return Classification {
                method: *method,
                reason: format!("path contains '{marker}'"),
            };
        }
    }

    if AMBIGUOUS_PREFIXES.iter().any(|p| path_str.contains(p)) {
        return classify_by_shebang(path);
    }

    // No recognized prefix at all; the shebang may still tell us
    classify_by_shebang(path)
}

fn classify_by_shebang(path: &Path) -> Classification {
    let first_line = File::open(path)
        .map(BufReader::new)
        .and_then(|mut reader| {
            let mut line = String::new();
            reader.read_line(&mut line)?;
            Ok(line)
        })
        .unwrap_or_default();

    if !first_line.starts_with("#!") {
        return Classification {
            method: InstallMethod::Manual,
            reason: "native binary, no interpreter declaration".to_string(),
        };
    }

    let shebang = first_line.trim();
    let method = if shebang.contains("python") {
        InstallMethod::Pip
    } else if shebang.contains("node") {
        InstallMethod::Npm
    } else if shebang.contains("sh") {
        InstallMethod::Script
    } else {
        InstallMethod::Unknown
    };

    Classification {
        reason: format!("shebang '{shebang}'"),
        method,
    }
}
