//! Structured observability hooks for the compliance run lifecycle.
//!
//! Every function emits one event carrying an `event = "..."` field so log
//! pipelines can filter on it. Instrument a run with [`run_span`] to tag
//! everything it logs with the run id.

use tracing::{info, warn};

use crate::checks::CheckOutcome;
use crate::error::FetchError;

/// Run-scoped span tagged with the run_id.
///
/// Attach it with `tracing::Instrument` rather than entering it, so the span
/// follows the run future across await points.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("repogate.run", run_id = %run_id)
}

/// Emit event: run started against a repository.
pub fn emit_run_started(run_id: &str, repository: &str, config_digest: &str) {
    info!(
        event = "run.started",
        run_id = %run_id,
        repository = %repository,
        config_digest = %config_digest,
    );
}

/// Emit event: one check finished, at info when it passed and warn when not.
pub fn emit_check_finished(outcome: &CheckOutcome) {
    if outcome.passed {
        info!(
            event = "check.passed",
            check = %outcome.check,
            step = outcome.check.step(),
            detail = %outcome.detail,
        );
    } else {
        let missing: Vec<String> = outcome.missing.iter().map(|m| m.to_string()).collect();
        warn!(
            event = "check.failed",
            check = %outcome.check,
            step = outcome.check.step(),
            detail = %outcome.detail,
            missing = ?missing,
        );
    }
    for warning in &outcome.warnings {
        warn!(event = "check.warning", check = %outcome.check, warning = %warning);
    }
}

/// Emit event: run finished with its verdict.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, checks_run: usize, passed: bool) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        checks_run = checks_run,
        passed = passed,
    );
}

/// Emit event: a remote fetch failed (warning level).
pub fn emit_fetch_failed(endpoint: &str, error: &FetchError) {
    warn!(event = "fetch.failed", endpoint = %endpoint, error = %error);
}
