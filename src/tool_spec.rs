//! Tool specification types describing what to install.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// The ecosystem a tool belongs to.
///
/// The ecosystem determines which package managers are candidates for
/// installing the tool. A `ManagerRegistry` maps each ecosystem to an
/// ordered preference list of managers.
///
/// # Example
///
/// ```rust
/// use devtool_orchestrator::Ecosystem;
///
/// for eco in Ecosystem::all() {
///     println!("{}", eco);
/// }
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    strum::Display,
)]
#[strum(serialize_all = "lowercase")]
#[non_exhaustive]
pub enum Ecosystem {
    /// Rust crates installed via cargo.
    Rust,
    /// Node.js packages installed via npm or pnpm.
    Node,
    /// Python packages installed via uv or pip.
    Python,
    /// Go modules installed via `go install`.
    Go,
    /// Distribution packages installed via apt, dnf, pacman or brew.
    System,
    /// Tools with no ecosystem affiliation (prebuilt binaries, scripts).
    Standalone,
}

impl Ecosystem {
    /// Iterator over all known ecosystems.
    pub fn all() -> impl Iterator<Item = Self> {
        <Self as IntoEnumIterator>::iter()
    }
}

/// The requested version of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionTarget {
    /// Whatever the chosen manager considers current.
    Latest,
    /// A specific version string, compared exactly after installation.
    Exact(String),
}

impl VersionTarget {
    /// Whether a probed version satisfies this target.
    ///
    /// `Latest` accepts any probed version; `Exact` requires a literal
    /// match after trimming a leading `v`.
    pub fn accepts(&self, probed: &str) -> bool {
        match self {
            Self::Latest => true,
            Self::Exact(want) => {
                let want = want.trim_start_matches('v');
                let got = probed.trim_start_matches('v');
                want == got
            }
        }
    }
}

impl Default for VersionTarget {
    fn default() -> Self {
        Self::Latest
    }
}

/// Expected content digest for an installed artifact.
///
/// Optional per-step metadata; absent unless explicitly supplied.
/// Comparison is case-insensitive over the hex digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumSpec {
    /// Hex-encoded SHA-256 digest of the installed binary.
    pub sha256: String,
}

/// Specification of one tool to install or manage.
///
/// # Example
///
/// ```rust
/// use devtool_orchestrator::{Ecosystem, ToolSpec, VersionTarget};
///
/// let spec = ToolSpec::new("ripgrep", Ecosystem::Rust)
///     .with_binary_names(["rg"])
///     .with_target(VersionTarget::Exact("14.1.0".to_string()));
/// assert_eq!(spec.name, "ripgrep");
/// assert_eq!(spec.binary_names, vec!["rg".to_string()]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Canonical tool name; unique within a plan.
    pub name: String,

    /// Executable names the tool may install under.
    ///
    /// Defaults to the tool name itself. Some tools install a binary
    /// with a different name (e.g. ripgrep installs `rg`).
    pub binary_names: Vec<String>,

    /// Package identifier used by the manager when it differs from the
    /// tool name (e.g. an npm scope like `@anthropic-ai/claude-code`).
    pub package: Option<String>,

    /// Requested version.
    pub target: VersionTarget,

    /// Ecosystem used to pick candidate managers.
    pub ecosystem: Ecosystem,

    /// Names of tools that must be installed before this one.
    ///
    /// A dependency naming a tool absent from the plan is treated as
    /// already satisfied.
    pub depends_on: Vec<String>,

    /// Optional expected digest for the installed binary.
    pub checksum: Option<ChecksumSpec>,
}

impl ToolSpec {
    /// Create a spec with defaults: latest version, binary named after
    /// the tool, no dependencies, no checksum.
    pub fn new(name: impl Into<String>, ecosystem: Ecosystem) -> Self {
        let name = name.into();
        Self {
            binary_names: vec![name.clone()],
            package: None,
            target: VersionTarget::Latest,
            ecosystem,
            depends_on: Vec::new(),
            checksum: None,
            name,
        }
    }

    /// Override the executable names to look for after installation.
    pub fn with_binary_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.binary_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the package identifier passed to the manager.
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Set the requested version.
    pub fn with_target(mut self, target: VersionTarget) -> Self {
        self.target = target;
        self
    }

    /// Declare dependencies on other tools in the same plan.
    pub fn with_depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Attach an expected SHA-256 digest for the installed binary.
    pub fn with_checksum(mut self, sha256: impl Into<String>) -> Self {
        self.checksum = Some(ChecksumSpec {
            sha256: sha256.into(),
        });
        self
    }

    /// Package identifier to hand to the manager.
    pub fn package_id(&self) -> &str {
        self.package.as_deref().unwrap_or(&self.name)
    }
}
