//! Domain types shared by the resolver, parser and orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use uuid::Uuid;

/// A submission unit, one directory under the matrix root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group {
    /// Directory name, unique within a run.
    pub id: String,

    /// `<root>/<id>`.
    pub root: PathBuf,
}

impl Group {
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
        }
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Resolved paths for one group. Re-derived for every pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLocation {
    /// Directory holding the build descriptor; the build's working directory.
    pub project_root: PathBuf,

    /// `<project_root>/src`.
    pub src_root: PathBuf,

    /// First child of `src_root` whose name contains the marker.
    pub test_dir: PathBuf,

    /// Set when the test directory name is not exactly the marker.
    pub naming_deviation: bool,
}

/// Counts read from a build summary line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildCounts {
    pub runs: u32,
    pub failures: u32,
    pub errors: u32,
    pub skipped: u32,
}

impl BuildCounts {
    /// Tests that neither failed, errored nor were skipped.
    pub fn successes(&self) -> u32 {
        self.runs
            .saturating_sub(self.failures)
            .saturating_sub(self.errors)
            .saturating_sub(self.skipped)
    }

    /// Tests that did not pass: failures, errors and skipped combined.
    pub fn failures_total(&self) -> u32 {
        self.failures + self.errors + self.skipped
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// How a pair evaluation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PairOutcome {
    /// Build ran and its output was parsed.
    Completed,

    /// A test directory could not be resolved; no build was attempted.
    Skipped { reason: String },

    /// An earlier restore failure made one of the groups unusable.
    Poisoned { group: String },

    /// The swap could not be set up; the subject was left untouched or restored.
    SwapAborted { reason: String },

    /// The build tool could not be run to completion.
    BuildFailed { reason: String },

    /// The build summary line was malformed.
    ParseFailed { reason: String },

    /// The subject's tests could not be put back.
    RestoreFailed { reason: String },
}

impl PairOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PairOutcome::Completed)
    }
}

/// Outcome of one ordered (subject, source) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairResult {
    /// Group whose implementation was built.
    pub subject: String,

    /// Group whose tests were swapped in.
    pub source: String,

    pub runs: u32,
    pub successes: u32,
    pub failures: u32,
    pub errors: u32,
    pub skipped: u32,

    pub outcome: PairOutcome,

    /// Build tool exit code, when the build ran to completion.
    pub exit_code: Option<i32>,

    /// Wall-clock time spent on the pair in milliseconds.
    pub duration_ms: u64,
}

impl PairResult {
    /// All-zero result for a pair that produced no counts.
    pub fn zeroed(subject: impl Into<String>, source: impl Into<String>, outcome: PairOutcome) -> Self {
        Self {
            subject: subject.into(),
            source: source.into(),
            runs: 0,
            successes: 0,
            failures: 0,
            errors: 0,
            skipped: 0,
            outcome,
            exit_code: None,
            duration_ms: 0,
        }
    }

    /// Result for a pair whose build output was parsed.
    pub fn from_counts(
        subject: impl Into<String>,
        source: impl Into<String>,
        counts: BuildCounts,
        exit_code: Option<i32>,
    ) -> Self {
        Self {
            subject: subject.into(),
            source: source.into(),
            runs: counts.runs,
            successes: counts.successes(),
            failures: counts.failures,
            errors: counts.errors,
            skipped: counts.skipped,
            outcome: PairOutcome::Completed,
            exit_code,
            duration_ms: 0,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Same as [`BuildCounts::failures_total`].
    pub fn failures_total(&self) -> u32 {
        self.failures + self.errors + self.skipped
    }
}

/// All pair results for one run, in evaluation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMatrix {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub groups: Vec<String>,
    pub results: Vec<PairResult>,

    /// Groups whose tests could not be restored during this run.
    pub poisoned: BTreeSet<String>,
}

impl ResultMatrix {
    pub fn new(groups: Vec<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            groups,
            results: Vec::new(),
            poisoned: BTreeSet::new(),
        }
    }

    pub fn push(&mut self, result: PairResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Look up the result for an ordered pair.
    pub fn get(&self, subject: &str, source: &str) -> Option<&PairResult> {
        self.results
            .iter()
            .find(|r| r.subject == subject && r.source == source)
    }

    /// Number of pairs that ran to completion.
    pub fn completed_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_completed()).count()
    }

    pub fn has_poisoned(&self) -> bool {
        !self.poisoned.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_counts_derived_values() {
        let counts = BuildCounts {
            runs: 5,
            failures: 1,
            errors: 1,
            skipped: 1,
        };
        assert_eq!(counts.successes(), 2);
        assert_eq!(counts.failures_total(), 3);
        assert!(!counts.is_zero());
        assert!(BuildCounts::default().is_zero());
    }

    #[test]
    fn test_pair_result_from_counts_balances() {
        let counts = BuildCounts {
            runs: 10,
            failures: 2,
            errors: 1,
            skipped: 3,
        };
        let result = PairResult::from_counts("g1", "g2", counts, Some(1));
        assert_eq!(
            result.runs,
            result.successes + result.failures + result.errors + result.skipped
        );
        assert_eq!(result.successes, 4);
        assert_eq!(result.failures_total(), 6);
        assert!(result.outcome.is_completed());
    }

    #[test]
    fn test_zeroed_result() {
        let result = PairResult::zeroed(
            "g1",
            "g2",
            PairOutcome::Skipped {
                reason: "missing".to_string(),
            },
        );
        assert_eq!(result.runs, 0);
        assert_eq!(result.successes, 0);
        assert_eq!(result.failures_total(), 0);
        assert_eq!(result.exit_code, None);
        assert!(!result.outcome.is_completed());
    }

    #[test]
    fn test_matrix_lookup_and_counts() {
        let mut matrix = ResultMatrix::new(vec!["a".to_string(), "b".to_string()]);
        assert!(matrix.is_empty());
        matrix.push(PairResult::from_counts("a", "b", BuildCounts::default(), Some(0)));
        matrix.push(PairResult::zeroed(
            "b",
            "a",
            PairOutcome::BuildFailed {
                reason: "mvn not found".to_string(),
            },
        ));

        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.completed_count(), 1);
        assert!(matrix.get("a", "b").is_some());
        assert!(matrix.get("a", "a").is_none());
        assert!(!matrix.has_poisoned());
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome = PairOutcome::ParseFailed {
            reason: "bad".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "parse_failed");
        assert_eq!(json["reason"], "bad");
    }
}
