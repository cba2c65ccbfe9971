//! Package-manager capability registry.
//!
//! The engine never decides for itself which manager installs what; it
//! consumes an ordered preference list and per-manager command templates
//! from a [`ManagerRegistry`]. A [`StaticRegistry`] with built-in
//! templates for the common managers ships as the default, probing
//! availability through a PATH lookup.

use crate::tool_spec::{Ecosystem, ToolSpec, VersionTarget};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// A package manager the engine knows how to drive.
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
pub enum PackageManager {
    Cargo,
    Npm,
    Pnpm,
    Pip,
    Uv,
    Apt,
    Dnf,
    Pacman,
    Brew,
    Go,
}

impl PackageManager {
    /// The command invoked to drive this manager.
    pub fn command_name(&self) -> &'static str {
        match self {
            Self::Cargo => "cargo",
            Self::Npm => "npm",
            Self::Pnpm => "pnpm",
            Self::Pip => "pip",
            Self::Uv => "uv",
            Self::Apt => "apt-get",
            Self::Dnf => "dnf",
            Self::Pacman => "pacman",
            Self::Brew => "brew",
            Self::Go => "go",
        }
    }

    /// The ecosystem this manager serves.
    pub fn ecosystem(&self) -> Ecosystem {
        match self {
            Self::Cargo => Ecosystem::Rust,
            Self::Npm | Self::Pnpm => Ecosystem::Node,
            Self::Pip | Self::Uv => Ecosystem::Python,
            Self::Apt | Self::Dnf | Self::Pacman | Self::Brew => Ecosystem::System,
            Self::Go => Ecosystem::Go,
        }
    }

    /// Path substrings that mark a binary as installed by this manager.
    ///
    /// Used by the reconciler's prefix classification.
    pub fn install_dir_markers(&self) -> &'static [&'static str] {
        match self {
            Self::Cargo => &[".cargo/bin"],
            Self::Npm => &[".npm", "node_modules", ".npm-global"],
            Self::Pnpm => &[".local/share/pnpm", "pnpm"],
            Self::Pip => &[".local/lib/python", "site-packages"],
            Self::Uv => &[".local/share/uv"],
            Self::Apt => &["/usr/bin", "/usr/sbin"],
            Self::Dnf => &["/usr/bin"],
            Self::Pacman => &["/usr/bin"],
            Self::Brew => &["homebrew", "linuxbrew"],
            Self::Go => &["go/bin"],
        }
    }

    /// Iterator over all known managers.
    pub fn all() -> impl Iterator<Item = Self> {
        <Self as IntoEnumIterator>::iter()
    }
}

/// A structured command for programmatic execution.
///
/// # Example
///
/// ```rust
/// use devtool_orchestrator::CommandTemplate;
///
/// let cmd = CommandTemplate {
///     program: "cargo".to_string(),
///     args: vec!["install".to_string(), "ripgrep".to_string()],
///     env_vars: vec![],
/// };
/// assert_eq!(cmd.display_line(), "cargo install ripgrep");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    /// The program to execute (e.g. "cargo", "npm").
    pub program: String,

    /// Arguments to pass to the program.
    pub args: Vec<String>,

    /// Environment variables to set before execution.
    pub env_vars: Vec<(String, String)>,
}

impl CommandTemplate {
    /// Human-readable command line for display and logs.
    pub fn display_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Latest known upstream version of a tool, with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamVersion {
    /// Version string as reported upstream.
    pub version: String,
    /// Where the version was learned (e.g. "crates.io", "npm registry").
    pub provenance: String,
}

/// Capability provider: which managers exist and how to drive them.
///
/// Implementations supply an ordered (most-preferred-first) manager list
/// per ecosystem plus install command templates. OS detection and the
/// actual preference policy live behind this trait.
pub trait ManagerRegistry: Send + Sync {
    /// Ordered candidate managers for an ecosystem, most preferred first.
    fn managers_for(&self, ecosystem: Ecosystem) -> Vec<PackageManager>;

    /// The single preferred manager for an ecosystem, if any.
    fn preferred(&self, ecosystem: Ecosystem) -> Option<PackageManager> {
        self.managers_for(ecosystem).into_iter().next()
    }

    /// Whether the manager's own executable is present on this host.
    fn available(&self, manager: PackageManager) -> bool;

    /// Install command for a tool via a manager, or `None` when the
    /// manager cannot install it.
    fn install_command(
        &self,
        manager: PackageManager,
        spec: &ToolSpec,
        target: &VersionTarget,
    ) -> Option<CommandTemplate>;
}

/// Source of upstream version knowledge.
///
/// Version discovery (registries, release feeds) is a collaborator
/// concern; the engine only consumes its answers.
pub trait VersionSource: Send + Sync {
    /// Latest known version for a tool, or `None` when unknown.
    fn latest(&self, tool: &str) -> Option<UpstreamVersion>;
}

/// A version source that knows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullVersionSource;

impl VersionSource for NullVersionSource {
    fn latest(&self, _tool: &str) -> Option<UpstreamVersion> {
        None
    }
}

/// Built-in registry with command templates for the common managers.
///
/// Availability is probed via PATH lookup of each manager's own
/// executable.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticRegistry;

impl StaticRegistry {
    fn versioned(package: &str, target: &VersionTarget, sep: &str) -> String {
        match target {
            VersionTarget::Latest => package.to_string(),
            VersionTarget::Exact(v) => format!("{package}{sep}{v}"),
        }
    }
}

impl ManagerRegistry for StaticRegistry {
    fn managers_for(&self, ecosystem: Ecosystem) -> Vec<PackageManager> {
        match ecosystem {
            Ecosystem::Rust => vec![PackageManager::Cargo],
            Ecosystem::Node => vec![PackageManager::Npm, PackageManager::Pnpm],
            Ecosystem::Python => vec![PackageManager::Uv, PackageManager::Pip],
            Ecosystem::Go => vec![PackageManager::Go],
            Ecosystem::System => vec![
                PackageManager::Apt,
                PackageManager::Dnf,
                PackageManager::Pacman,
                PackageManager::Brew,
            ],
            Ecosystem::Standalone => vec![PackageManager::Brew],
        }
    }

    fn available(&self, manager: PackageManager) -> bool {
        which::which(manager.command_name()).is_ok()
    }

    fn install_command(
        &self,
        manager: PackageManager,
        spec: &ToolSpec,
        target: &VersionTarget,
    ) -> Option<CommandTemplate> {
        let package = spec.package_id();
        let (program, args) = match manager {
            PackageManager::Cargo => {
                let mut args = vec!["install".to_string(), package.to_string()];
                if let VersionTarget::Exact(v) = target {
                    args.push("--version".to_string());
                    args.push(v.clone());
                }
                ("cargo", args)
            }
            PackageManager::Npm => (
                "npm",
                vec![
                    "install".to_string(),
                    "-g".to_string(),
                    Self::versioned(package, target, "@"),
                ],
            ),
            PackageManager::Pnpm => (
                "pnpm",
                vec![
                    "add".to_string(),
                    "-g".to_string(),
                    Self::versioned(package, target, "@"),
                ],
            ),
            PackageManager::Pip => (
                "pip",
                vec![
                    "install".to_string(),
                    "--user".to_string(),
                    Self::versioned(package, target, "=="),
                ],
            ),
            PackageManager::Uv => (
                "uv",
                vec![
                    "tool".to_string(),
                    "install".to_string(),
                    Self::versioned(package, target, "=="),
                ],
            ),
            PackageManager::Apt => (
                "apt-get",
                vec![
                    "install".to_string(),
                    "-y".to_string(),
                    Self::versioned(package, target, "="),
                ],
            ),
            PackageManager::Dnf => (
                "dnf",
                vec![
                    "install".to_string(),
                    "-y".to_string(),
                    Self::versioned(package, target, "-"),
                ],
            ),
            PackageManager::Pacman => (
                "pacman",
                vec![
                    "-S".to_string(),
                    "--noconfirm".to_string(),
                    package.to_string(),
                ],
            ),
            PackageManager::Brew => ("brew", vec!["install".to_string(), package.to_string()]),
            PackageManager::Go => {
                let suffix = match target {
                    VersionTarget::Latest => "latest".to_string(),
                    VersionTarget::Exact(v) => format!("v{}", v.trim_start_matches('v')),
                };
                ("go", vec!["install".to_string(), format!("{package}@{suffix}")])
            }
        };
        Some(CommandTemplate {
            program: program.to_string(),
            args,
            env_vars: Vec::new(),
        })
    }
}
