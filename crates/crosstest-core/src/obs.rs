//! Structured observability hooks for matrix and pair lifecycle events.
//!
//! Every event carries an `event` field so log pipelines can filter on it:
//! `matrix.started`, `pair.started`, `pair.finished`, `pair.skipped`,
//! `swap.restore_failed` and `matrix.finished`.

use crate::domain::{PairOutcome, PairResult};
use std::path::Path;
use tracing::{error, info, warn};

/// Span tagging everything logged during one pair with its subject and source.
///
/// ```ignore
/// run_pair().instrument(pair_span("g1", "g2")).await
/// ```
pub fn pair_span(subject: &str, source: &str) -> tracing::Span {
    tracing::info_span!("crosstest.pair", subject = %subject, source = %source)
}

pub fn emit_matrix_started(run_id: &str, groups: usize, pairs: usize) {
    info!(event = "matrix.started", run_id = %run_id, groups = groups, pairs = pairs);
}

pub fn emit_pair_started(subject: &str, source: &str) {
    info!(event = "pair.started", subject = %subject, source = %source);
}

/// Completed pairs log at info; every other outcome at warn.
pub fn emit_pair_finished(result: &PairResult) {
    match &result.outcome {
        PairOutcome::Completed => info!(
            event = "pair.finished",
            subject = %result.subject,
            source = %result.source,
            runs = result.runs,
            successes = result.successes,
            failures = result.failures,
            errors = result.errors,
            skipped = result.skipped,
            duration_ms = result.duration_ms,
        ),
        outcome => warn!(
            event = "pair.finished",
            subject = %result.subject,
            source = %result.source,
            outcome = ?outcome,
            duration_ms = result.duration_ms,
        ),
    }
}

pub fn emit_pair_skipped(subject: &str, source: &str, reason: &dyn std::fmt::Display) {
    warn!(event = "pair.skipped", subject = %subject, source = %source, reason = %reason);
}

/// A submission was left without its own tests.
pub fn emit_restore_failed(subject: &Path, backup: &Path, error: &dyn std::fmt::Display) {
    error!(
        event = "swap.restore_failed",
        subject = %subject.display(),
        backup = %backup.display(),
        error = %error,
        "Submission left corrupted, manual repair required"
    );
}

pub fn emit_matrix_finished(run_id: &str, total: usize, completed: usize, poisoned: usize) {
    info!(
        event = "matrix.finished",
        run_id = %run_id,
        total = total,
        completed = completed,
        poisoned = poisoned,
    );
}
