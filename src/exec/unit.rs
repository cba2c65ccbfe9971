//! Single-step installation with timeout, retry and verification.

use crate::exec::backoff::{backoff_delay, Sleeper, TokioSleeper};
use crate::exec::classify::{classify_failure, FailureRule, Verdict, TRANSIENT_RULES};
use crate::exec::errors::InstallError;
use crate::plan::InstallStep;
use crate::probe::{extract_version_string, probe_version, scan_search_path};
use crate::OrchestratorConfig;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

/// Immutable outcome of one step execution.
///
/// Produced exactly once per step, success or not; the scheduler
/// aggregates these into the run report. Cache persistence is the
/// caller's responsibility, triggered from this value.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Step identity (tool name).
    pub tool: String,
    /// Whether install, checksum and validation all succeeded.
    pub success: bool,
    /// Exit code of the final command invocation, if it ran.
    pub exit_code: Option<i32>,
    /// Captured stdout/stderr of the final invocation.
    pub output: String,
    /// Wall time across all attempts.
    pub elapsed: Duration,
    /// Version probed from the installed binary.
    pub installed_version: Option<String>,
    /// Where the installed binary was found.
    pub installed_path: Option<PathBuf>,
    /// Number of retries performed (0 = first attempt decided).
    pub retry_count: u32,
    /// The failure, when `success` is false.
    pub error: Option<InstallError>,
}

/// Executes exactly one [`InstallStep`] to completion.
///
/// Never propagates a fault past its boundary; always returns a
/// [`StepResult`]. Runs the step's command under a timeout, classifies
/// failures against the transient-signature table, retries with
/// exponential backoff plus jitter when classification allows, then
/// verifies the result (checksum when specified, binary lookup and
/// version probe always).
pub struct UnitInstaller {
    default_timeout: Duration,
    probe_timeout: Duration,
    max_retries: u32,
    backoff_base: Duration,
    jitter: f64,
    sleeper: Arc<dyn Sleeper>,
    rules: Vec<FailureRule>,
    search_path: Option<String>,
}

impl UnitInstaller {
    /// Build an installer from validated configuration.
    pub fn new(config: &OrchestratorConfig) -> Self {
        Self {
            default_timeout: config.step_timeout,
            probe_timeout: Duration::from_secs(5),
            max_retries: config.max_retries,
            backoff_base: config.backoff_base,
            jitter: config.jitter,
            sleeper: Arc::new(TokioSleeper),
            rules: TRANSIENT_RULES.to_vec(),
            search_path: config.search_path.clone(),
        }
    }

    /// Replace the sleeper; tests inject a counting one.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the classification table.
    pub fn with_rules(mut self, rules: Vec<FailureRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Override the search path used for post-install validation.
    ///
    /// Defaults to the process `PATH` at validation time.
    pub fn with_search_path(mut self, search_path: impl Into<String>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Run the step to completion.
    pub async fn run(&self, step: &InstallStep) -> StepResult {
        let started = Instant::now();
        let step_timeout = step.effective_timeout(self.default_timeout);
        let mut attempt: u32 = 0;

        loop {
            match self.run_once(step, step_timeout).await {
                Ok((exit_code, output)) => {
                    return match self.verify(step).await {
                        Ok((path, version)) => {
                            tracing::debug!(tool = %step.tool, path = %path.display(), "step succeeded");
                            StepResult {
                                tool: step.tool.clone(),
                                success: true,
                                exit_code,
                                output,
                                elapsed: started.elapsed(),
                                installed_version: version,
                                installed_path: Some(path),
                                retry_count: attempt,
                                error: None,
                            }
                        }
                        Err(err) => self.failure(step, exit_code, output, started, attempt, err),
                    };
                }
                Err(err) => {
                    if err.is_retryable() && attempt < self.max_retries {
                        let delay =
                            backoff_delay(attempt, self.backoff_base, self.jitter, rand::random());
                        tracing::debug!(
                            tool = %step.tool,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "transient failure, backing off"
                        );
                        self.sleeper.sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    let exit_code = match &err {
                        InstallError::NonZeroExit { exit_code, .. } => *exit_code,
                        _ => None,
                    };
                    return self.failure(step, exit_code, String::new(), started, attempt, err);
                }
            }
        }
    }

    fn failure(
        &self,
        step: &InstallStep,
        exit_code: Option<i32>,
        output: String,
        started: Instant,
        retry_count: u32,
        error: InstallError,
    ) -> StepResult {
        tracing::warn!(tool = %step.tool, error = %error, "step failed");
        StepResult {
            tool: step.tool.clone(),
            success: false,
            exit_code,
            output,
            elapsed: started.elapsed(),
            installed_version: None,
            installed_path: None,
            retry_count,
            error: Some(error),
        }
    }

    /// One command invocation under the step timeout.
    async fn run_once(
        &self,
        step: &InstallStep,
        limit: Duration,
    ) -> Result<(Option<i32>, String), InstallError> {
        let mut command = Command::new(&step.command.program);
        command
            .args(&step.command.args)
            .envs(step.command.env_vars.iter().cloned())
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = match timeout(limit, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(InstallError::ExecutableNotFound {
                    program: step.command.program.clone(),
                    message: e.to_string(),
                    fix: format!(
                        "Ensure '{}' is installed and on PATH",
                        step.command.program
                    ),
                });
            }
            Err(_) => {
                return Err(InstallError::Timeout {
                    tool: step.tool.clone(),
                    duration: limit,
                    fix: format!(
                        "Raise the step timeout above {limit:?} or check network conditions"
                    ),
                });
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            let verdict = classify_failure(output.status.code(), &combined, &self.rules);
            let retryable = verdict == Verdict::Retryable;
            return Err(InstallError::NonZeroExit {
                tool: step.tool.clone(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                retryable,
                fix: if retryable {
                    "Transient failure; will retry with backoff".to_string()
                } else {
                    "Inspect the installer output for the underlying cause".to_string()
                },
            });
        }

        Ok((output.status.code(), combined))
    }

    /// Post-install verification: locate, checksum, probe, compare.
    async fn verify(
        &self,
        step: &InstallStep,
    ) -> Result<(PathBuf, Option<String>), InstallError> {
        let search_path = self
            .search_path
            .clone()
            .or_else(|| std::env::var("PATH").ok())
            .unwrap_or_default();

        // The rank-0 entry is what the shell would invoke
        let found = scan_search_path(&step.binary_names, &search_path)
            .into_iter()
            .next()
            .ok_or_else(|| InstallError::ValidationFailed {
                tool: step.tool.clone(),
                reason: format!(
                    "no executable named {} on the search path",
                    step.binary_names.join(" or ")
                ),
                fix: "The installer reported success but produced no binary; \
                      you may need to restart your shell for PATH changes"
                    .to_string(),
            })?;

        if let Some(expected) = &step.checksum {
            let bytes = tokio::fs::read(&found.path).await.map_err(|e| {
                InstallError::ValidationFailed {
                    tool: step.tool.clone(),
                    reason: format!("could not read installed binary: {e}"),
                    fix: "Check permissions on the installed binary".to_string(),
                }
            })?;
            let actual = format!("{:x}", Sha256::digest(&bytes));
            if !actual.eq_ignore_ascii_case(&expected.sha256) {
                return Err(InstallError::ChecksumMismatch {
                    tool: step.tool.clone(),
                    expected: expected.sha256.clone(),
                    actual,
                    fix: "Verify the expected digest; the artifact may be compromised or stale"
                        .to_string(),
                });
            }
        }

        let probed = probe_version(&found.path, self.probe_timeout)
            .await
            .map_err(|e| InstallError::ValidationFailed {
                tool: step.tool.clone(),
                reason: format!("version probe failed: {e}"),
                fix: "Run the binary's --version by hand to see what is wrong".to_string(),
            })?;

        let version = extract_version_string(&probed);
        if let crate::tool_spec::VersionTarget::Exact(want) = &step.target {
            match &version {
                Some(got) if step.target.accepts(got) => {}
                Some(got) => {
                    return Err(InstallError::ValidationFailed {
                        tool: step.tool.clone(),
                        reason: format!("installed version {got} does not match requested {want}"),
                        fix: "Another installation may shadow the new one; run reconcile"
                            .to_string(),
                    });
                }
                None => {
                    return Err(InstallError::ValidationFailed {
                        tool: step.tool.clone(),
                        reason: format!(
                            "requested exact version {want} but none could be probed"
                        ),
                        fix: "Run the binary's --version by hand to see what it reports"
                            .to_string(),
                    });
                }
            }
        }

        Ok((found.path, version))
    }
}
