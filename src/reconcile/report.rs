//! Strategy application and report assembly.

use crate::config::ReconcileStrategy;
use crate::reconcile::classify::InstallMethod;
use crate::reconcile::discover::Installation;
use std::path::{Path, PathBuf};

/// Per-installation verdict under the applied strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recommendation {
    /// Keep; either it is wanted or the strategy keeps everything.
    Keep,
    /// Recommend removal; only ever issued for paths under the safe
    /// root, and only applied after explicit confirmation.
    Remove { reason: String },
    /// Outside the safe root: recorded, never a removal candidate.
    KeepOutsideSafeRoot,
}

/// One discovered installation plus the strategy's verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationRecord {
    pub installation: Installation,
    pub recommendation: Recommendation,
    /// True when a different installation outranks this one on PATH.
    pub shadowed: bool,
}

/// Warning that the preferred installation is not the one PATH picks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowWarning {
    pub preferred_path: PathBuf,
    pub winner_path: PathBuf,
}

/// Full reconciliation picture for one tool.
#[derive(Debug, Clone)]
pub struct ReconciliationReport {
    pub tool: String,
    pub strategy: ReconcileStrategy,
    pub preferred_method: Option<InstallMethod>,
    /// Records in rank order, one per distinct resolved path.
    pub records: Vec<InstallationRecord>,
    /// Index into `records` of the PATH-winning installation.
    pub winner: Option<usize>,
    /// Set when the preferred installation exists but is shadowed.
    pub shadow_warning: Option<ShadowWarning>,
}

impl ReconciliationReport {
    /// Whether more than one distinct installation exists.
    pub fn has_conflicts(&self) -> bool {
        self.records.len() > 1
    }

    /// Records the strategy wants removed.
    pub fn removal_candidates(&self) -> impl Iterator<Item = &InstallationRecord> {
        self.records
            .iter()
            .filter(|r| matches!(r.recommendation, Recommendation::Remove { .. }))
    }
}

/// Apply a strategy to discovered installations.
///
/// The winner is the lowest-ranked record. Under `Parallel` everything
/// is kept. Under `Aggressive`, when at least one installation matches
/// the preferred method, every other installation under the safe root
/// is recommended for removal; with no preferred match nothing is
/// removed, since there is no basis to choose a survivor. Paths outside
/// the safe root are always kept.
pub fn build_report(
    tool: &str,
    installations: Vec<Installation>,
    strategy: ReconcileStrategy,
    preferred_method: Option<InstallMethod>,
    safe_root: Option<&Path>,
) -> ReconciliationReport {
    let winner = installations
        .iter()
        .enumerate()
        .min_by_key(|(_, inst)| inst.rank)
        .map(|(i, _)| i);
    let winner_rank = winner.map(|i| installations[i].rank);

    let preferred_exists = preferred_method
        .map(|m| installations.iter().any(|inst| inst.method == m))
        .unwrap_or(false);

    let records: Vec<InstallationRecord> = installations
        .into_iter()
        .map(|installation| {
            let shadowed = winner_rank.is_some_and(|r| installation.rank > r);
            let inside_safe_root = safe_root
                .is_some_and(|root| installation.path.starts_with(root));

            let recommendation = if !inside_safe_root {
                Recommendation::KeepOutsideSafeRoot
            } else {
                match (strategy, preferred_method) {
                    (ReconcileStrategy::Aggressive, Some(preferred))
                        if preferred_exists && installation.method != preferred =>
                    {
                        Recommendation::Remove {
                            reason: format!(
                                "{} installation conflicts with preferred {}",
                                installation.method, preferred
                            ),
                        }
                    }
                    _ => Recommendation::Keep,
                }
            };

            InstallationRecord {
                installation,
                recommendation,
                shadowed,
            }
        })
        .collect();

    // Preferred exists but something else wins the PATH
    let shadow_warning = preferred_method.and_then(|preferred| {
        let winner_record = winner.map(|i| &records[i])?;
        if winner_record.installation.method == preferred {
            return None;
        }
        records
            .iter()
            .find(|r| r.installation.method == preferred)
            .map(|preferred_record| ShadowWarning {
                preferred_path: preferred_record.installation.path.clone(),
                winner_path: winner_record.installation.path.clone(),
            })
    });

    ReconciliationReport {
        tool: tool.to_string(),
        strategy,
        preferred_method,
        records,
        winner,
        shadow_warning,
    }
}
