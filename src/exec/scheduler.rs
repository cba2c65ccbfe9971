//! Level-by-level plan execution on a bounded worker pool.

use crate::exec::progress::{ProgressTracker, ToolStatus};
use crate::exec::report::{RunReport, ToolOutcome};
use crate::exec::unit::UnitInstaller;
use crate::plan::{InstallPlan, InstallStep};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Runs an [`InstallPlan`] level by level.
///
/// Every step of a level is submitted concurrently, bounded by the
/// worker count; the executor waits for the whole level (full barrier)
/// before releasing the next one; that barrier is what enforces the
/// dependency ordering guarantee. A step failure never aborts its
/// siblings; it marks dependents in later levels as blocked instead.
///
/// Cancellation is cooperative and checked between levels: in-flight
/// steps run to their own completion or timeout, never-started steps
/// are marked cancelled, finished levels' results are preserved.
pub struct BulkExecutor {
    worker_count: usize,
    unit: UnitInstaller,
}

impl BulkExecutor {
    pub fn new(worker_count: usize, unit: UnitInstaller) -> Self {
        Self {
            worker_count: worker_count.max(1),
            unit,
        }
    }

    /// Execute the whole plan, aggregating per-tool outcomes.
    pub async fn run(
        &self,
        plan: InstallPlan,
        tracker: &ProgressTracker,
        cancel: &CancellationToken,
    ) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::default();
        // Tools that failed, were blocked or cancelled; dependents of
        // these are blocked rather than attempted.
        let mut unavailable: HashSet<String> = HashSet::new();

        for step in plan.steps() {
            tracker.set(&step.tool, ToolStatus::Pending, "queued");
        }

        let total_levels = plan.levels.len();
        for (index, level) in plan.levels.into_iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(level = index, "run cancelled; skipping remaining levels");
                for step in &level {
                    tracker.set(&step.tool, ToolStatus::Cancelled, "run cancelled");
                    report
                        .outcomes
                        .insert(step.tool.clone(), ToolOutcome::Cancelled);
                }
                // remaining levels handled by the outer loop continuing
                continue;
            }

            let (blocked, runnable): (Vec<InstallStep>, Vec<InstallStep>) = level
                .into_iter()
                .partition(|step| step.depends_on.iter().any(|d| unavailable.contains(d)));

            for step in blocked {
                let waiting_on: Vec<String> = step
                    .depends_on
                    .iter()
                    .filter(|d| unavailable.contains(*d))
                    .cloned()
                    .collect();
                tracing::warn!(tool = %step.tool, waiting_on = ?waiting_on, "step blocked");
                tracker.set(
                    &step.tool,
                    ToolStatus::Blocked,
                    format!("blocked on {}", waiting_on.join(", ")),
                );
                unavailable.insert(step.tool.clone());
                report
                    .outcomes
                    .insert(step.tool, ToolOutcome::Blocked { waiting_on });
            }

            tracing::debug!(
                level = index,
                of = total_levels,
                steps = runnable.len(),
                "executing level"
            );

            // Full barrier: collect() waits for every step in the level
            let results = stream::iter(runnable.into_iter().map(|step| {
                let unit = &self.unit;
                async move {
                    tracker.set(
                        &step.tool,
                        ToolStatus::Running,
                        format!("installing via {}", step.manager),
                    );
                    unit.run(&step).await
                }
            }))
            .buffer_unordered(self.worker_count)
            .collect::<Vec<_>>()
            .await;

            for result in results {
                let tool = result.tool.clone();
                if result.success {
                    tracker.set(
                        &tool,
                        ToolStatus::Success,
                        result
                            .installed_version
                            .clone()
                            .unwrap_or_else(|| "installed".to_string()),
                    );
                    report.outcomes.insert(tool, ToolOutcome::Success(result));
                } else {
                    let message = result
                        .error
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "failed".to_string());
                    tracker.set(&tool, ToolStatus::Failed, message);
                    unavailable.insert(tool.clone());
                    report.outcomes.insert(tool, ToolOutcome::Failed(result));
                }
            }
        }

        report.elapsed = started.elapsed();
        report
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::registry::{CommandTemplate, PackageManager};
    use crate::tool_spec::VersionTarget;
    use crate::OrchestratorConfig;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn step(dir: &Path, tool: &str, script: &Path, deps: &[&str]) -> InstallStep {
        // Each tool has its own fake binary so validation passes
        write_script(dir, tool, &format!("echo '{tool} 1.0.0'\n"));
        InstallStep {
            tool: tool.to_string(),
            manager: PackageManager::Cargo,
            command: CommandTemplate {
                program: script.to_string_lossy().into_owned(),
                args: vec![],
                env_vars: vec![],
            },
            binary_names: vec![tool.to_string()],
            target: VersionTarget::Latest,
            checksum: None,
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
            timeout_override: None,
        }
    }

    fn executor(dir: &Path, workers: usize) -> BulkExecutor {
        let config = OrchestratorConfig::default();
        let unit = UnitInstaller::new(&config)
            .with_search_path(dir.to_string_lossy().into_owned());
        BulkExecutor::new(workers, unit)
    }

    #[tokio::test]
    async fn test_two_level_plan_succeeds() {
        let dir = tempfile::TempDir::new().unwrap();
        let ok = write_script(dir.path(), "ok.sh", "exit 0\n");

        let plan = crate::plan::resolve_levels(vec![
            step(dir.path(), "a", &ok, &[]),
            step(dir.path(), "b", &ok, &["a"]),
            step(dir.path(), "c", &ok, &["a"]),
        ])
        .unwrap();

        let tracker = ProgressTracker::new();
        let cancel = CancellationToken::new();
        let report = executor(dir.path(), 4).run(plan, &tracker, &cancel).await;

        assert!(report.succeeded());
        assert_eq!(report.success_count(), 3);
        assert_eq!(tracker.status_of("b"), Some(ToolStatus::Success));
    }

    #[tokio::test]
    async fn test_failure_blocks_dependents_not_siblings() {
        let dir = tempfile::TempDir::new().unwrap();
        let ok = write_script(dir.path(), "ok.sh", "exit 0\n");
        let bad = write_script(dir.path(), "bad.sh", "echo 'boom' >&2\nexit 1\n");

        // a fails; b depends on a (blocked); c is a sibling of a (runs)
        let plan = crate::plan::resolve_levels(vec![
            step(dir.path(), "a", &bad, &[]),
            step(dir.path(), "c", &ok, &[]),
            step(dir.path(), "b", &ok, &["a"]),
        ])
        .unwrap();

        let tracker = ProgressTracker::new();
        let cancel = CancellationToken::new();
        let report = executor(dir.path(), 4).run(plan, &tracker, &cancel).await;

        assert!(!report.succeeded());
        assert!(matches!(
            report.outcome("a"),
            Some(ToolOutcome::Failed(_))
        ));
        assert!(matches!(
            report.outcome("c"),
            Some(ToolOutcome::Success(_))
        ));
        match report.outcome("b") {
            Some(ToolOutcome::Blocked { waiting_on }) => {
                assert_eq!(waiting_on, &vec!["a".to_string()]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(tracker.status_of("b"), Some(ToolStatus::Blocked));
    }

    #[tokio::test]
    async fn test_blocked_propagates_transitively() {
        let dir = tempfile::TempDir::new().unwrap();
        let ok = write_script(dir.path(), "ok.sh", "exit 0\n");
        let bad = write_script(dir.path(), "bad.sh", "exit 1\n");

        let plan = crate::plan::resolve_levels(vec![
            step(dir.path(), "a", &bad, &[]),
            step(dir.path(), "b", &ok, &["a"]),
            step(dir.path(), "c", &ok, &["b"]),
        ])
        .unwrap();

        let tracker = ProgressTracker::new();
        let cancel = CancellationToken::new();
        let report = executor(dir.path(), 2).run(plan, &tracker, &cancel).await;

        assert!(matches!(
            report.outcome("c"),
            Some(ToolOutcome::Blocked { .. })
        ));
        assert_eq!(report.blocked_count(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_skips_later_levels() {
        let dir = tempfile::TempDir::new().unwrap();
        let ok = write_script(dir.path(), "ok.sh", "exit 0\n");

        let plan = crate::plan::resolve_levels(vec![
            step(dir.path(), "a", &ok, &[]),
            step(dir.path(), "b", &ok, &["a"]),
        ])
        .unwrap();

        let tracker = ProgressTracker::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = executor(dir.path(), 2).run(plan, &tracker, &cancel).await;

        assert_eq!(report.success_count(), 0);
        assert!(matches!(report.outcome("a"), Some(ToolOutcome::Cancelled)));
        assert!(matches!(report.outcome("b"), Some(ToolOutcome::Cancelled)));
        assert_eq!(tracker.status_of("a"), Some(ToolStatus::Cancelled));
    }

    #[tokio::test]
    async fn test_level_steps_run_concurrently() {
        let dir = tempfile::TempDir::new().unwrap();
        // Each step sleeps 300ms; two workers should overlap them
        let slow = write_script(dir.path(), "slow.sh", "sleep 0.3\nexit 0\n");

        let plan = crate::plan::resolve_levels(vec![
            step(dir.path(), "a", &slow, &[]),
            step(dir.path(), "b", &slow, &[]),
        ])
        .unwrap();

        let tracker = ProgressTracker::new();
        let cancel = CancellationToken::new();
        let started = Instant::now();
        let report = executor(dir.path(), 2).run(plan, &tracker, &cancel).await;

        assert!(report.succeeded());
        assert!(
            started.elapsed() < std::time::Duration::from_millis(550),
            "siblings should overlap, took {:?}",
            started.elapsed()
        );
    }
}
