//! Table-driven failure classification.
//!
//! A non-zero installer exit is classified against an ordered list of
//! substring rules over the captured output, plus a short list of
//! retryable exit codes. New signatures extend the table; the matching
//! logic never changes.

/// Classification verdict for a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Transient; worth retrying with backoff.
    Retryable,
    /// Permanent; retrying would not help.
    Permanent,
}

/// One substring-to-verdict rule. Matching is case-insensitive and the
/// first matching rule wins, so order the specific before the general.
#[derive(Debug, Clone, Copy)]
pub struct FailureRule {
    pub needle: &'static str,
    pub verdict: Verdict,
}

const fn rule(needle: &'static str, verdict: Verdict) -> FailureRule {
    FailureRule { needle, verdict }
}

/// Built-in classification table.
///
/// Specific network error codes come before the permanent "not found"
/// rule: `ENOTFOUND` contains "not found" and must match first.
pub const TRANSIENT_RULES: &[FailureRule] = &[
    // DNS / socket error codes as printed by npm, node and curl
    rule("enotfound", Verdict::Retryable),
    rule("eai_again", Verdict::Retryable),
    rule("etimedout", Verdict::Retryable),
    rule("econnreset", Verdict::Retryable),
    rule("econnrefused", Verdict::Retryable),
    // Registry-side package absence is permanent
    rule("404 not found", Verdict::Permanent),
    rule("could not find", Verdict::Permanent),
    rule("no matching package", Verdict::Permanent),
    rule("not found in registry", Verdict::Permanent),
    // Lock contention: apt/dpkg, cargo, generic flock
    rule("could not get lock", Verdict::Retryable),
    rule("dpkg frontend lock", Verdict::Retryable),
    rule("blocking waiting for file lock", Verdict::Retryable),
    rule("resource temporarily unavailable", Verdict::Retryable),
    rule("another process is using", Verdict::Retryable),
    // Generic network trouble
    rule("network", Verdict::Retryable),
    rule("connection reset", Verdict::Retryable),
    rule("connection refused", Verdict::Retryable),
    rule("temporary failure", Verdict::Retryable),
    rule("timed out", Verdict::Retryable),
    rule("tls handshake", Verdict::Retryable),
    rule("rate limit", Verdict::Retryable),
];

/// Exit codes treated as retryable regardless of output.
///
/// 75 is EX_TEMPFAIL from sysexits.h, used by well-behaved tools to
/// signal "try again later".
pub const RETRYABLE_EXIT_CODES: &[i32] = &[75];

/// Classify a failed step from its exit code and captured output.
///
/// Rules are checked in order against the lowercased output; the first
/// match decides. With no rule match, the exit code list decides; an
/// unknown failure is permanent.
pub fn classify_failure(
    exit_code: Option<i32>,
    output: &str,
    rules: &[FailureRule],
) -> Verdict {
    let haystack = output.to_lowercase();
    for rule in rules {
        if haystack.contains(rule.needle) {
            return rule.verdict;
        }
    }
    match exit_code {
        Some(code) if RETRYABLE_EXIT_CODES.contains(&code) => Verdict::Retryable,
        _ => Verdict::Permanent,
    }
}
