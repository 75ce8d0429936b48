//! Evaluation of a single ordered (subject, source) pair.

use crate::executor::BuildExecutor;
use crosstest_core::obs;
use crosstest_core::{
    parse_build_output, with_swapped_tests, Group, MatrixConfig, PairOutcome, PairResult,
    PathResolver, SwapError,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, Instrument};

/// Runs one pair: resolve → swap → build → parse.
///
/// Every failure is folded into the returned [`PairResult`]; `run` never
/// returns an error so that one pair cannot stop the matrix.
pub struct PairRunner {
    resolver: PathResolver,
    executor: Arc<dyn BuildExecutor>,
    backup_suffix: String,
}

impl PairRunner {
    pub fn new(config: &MatrixConfig, executor: Arc<dyn BuildExecutor>) -> Self {
        Self {
            resolver: PathResolver::from_config(config),
            executor,
            backup_suffix: config.backup_suffix.clone(),
        }
    }

    /// Build `subject` against the tests of `source`.
    pub async fn run(&self, subject: &Group, source: &Group) -> PairResult {
        let span = obs::pair_span(&subject.id, &source.id);
        let start = Instant::now();
        let result = self.run_inner(subject, source).instrument(span.clone()).await;
        let result = result.with_duration(start.elapsed().as_millis() as u64);
        span.in_scope(|| obs::emit_pair_finished(&result));
        result
    }

    async fn run_inner(&self, subject: &Group, source: &Group) -> PairResult {
        let subject_loc = match self.resolver.resolve(subject) {
            Ok(location) => location,
            Err(e) => return skipped(subject, source, &e),
        };
        let source_loc = match self.resolver.resolve(source) {
            Ok(location) => location,
            Err(e) => return skipped(subject, source, &e),
        };

        obs::emit_pair_started(&subject.id, &source.id);

        let executor = Arc::clone(&self.executor);
        let project_root = subject_loc.project_root.clone();
        let swapped = with_swapped_tests(
            &subject_loc.test_dir,
            &source_loc.test_dir,
            &self.backup_suffix,
            || async move { executor.execute(&project_root).await },
        )
        .await;

        let output = match swapped {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!(error = %e, "Build invocation failed");
                return PairResult::zeroed(
                    &subject.id,
                    &source.id,
                    PairOutcome::BuildFailed {
                        reason: e.to_string(),
                    },
                );
            }
            Err(e @ SwapError::SubjectMissing { .. }) => return skipped(subject, source, &e),
            Err(e) if e.is_fatal() => {
                return PairResult::zeroed(
                    &subject.id,
                    &source.id,
                    PairOutcome::RestoreFailed {
                        reason: e.to_string(),
                    },
                );
            }
            Err(e) => {
                error!(error = %e, "Test swap aborted");
                return PairResult::zeroed(
                    &subject.id,
                    &source.id,
                    PairOutcome::SwapAborted {
                        reason: e.to_string(),
                    },
                );
            }
        };

        let counts = match parse_build_output(output.lines()) {
            Ok(counts) => counts,
            Err(e) => {
                error!(error = %e, "Failed to parse build output");
                return PairResult::zeroed(
                    &subject.id,
                    &source.id,
                    PairOutcome::ParseFailed {
                        reason: e.to_string(),
                    },
                );
            }
        };

        if counts.is_zero() && !output.success {
            error!(exit_code = output.exit_code, "Build failed without a test summary");
            let mut result = PairResult::zeroed(
                &subject.id,
                &source.id,
                PairOutcome::BuildFailed {
                    reason: format!(
                        "build exited with code {} without a test summary",
                        output.exit_code
                    ),
                },
            );
            result.exit_code = Some(output.exit_code);
            return result;
        }

        PairResult::from_counts(&subject.id, &source.id, counts, Some(output.exit_code))
    }
}

fn skipped(subject: &Group, source: &Group, reason: &dyn std::fmt::Display) -> PairResult {
    obs::emit_pair_skipped(&subject.id, &source.id, reason);
    PairResult::zeroed(
        &subject.id,
        &source.id,
        PairOutcome::Skipped {
            reason: reason.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildOutput;
    use crate::error::BuildError;
    use crate::fakes::FakeExecutor;
    use std::fs;
    use std::path::{Path, PathBuf};

    fn make_group(root: &Path, id: &str, with_tests: bool) -> Group {
        let src = root.join(id).join("project").join("src");
        fs::create_dir_all(src.join("main")).unwrap();
        if with_tests {
            fs::create_dir_all(src.join("test")).unwrap();
            fs::write(src.join("test").join(format!("{id}Test.java")), id).unwrap();
        }
        Group::new(id, root.join(id))
    }

    fn test_file(root: &Path, id: &str, file_of: &str) -> PathBuf {
        root.join(id)
            .join("project/src/test")
            .join(format!("{file_of}Test.java"))
    }

    fn runner(root: &Path, executor: Arc<dyn BuildExecutor>) -> PairRunner {
        PairRunner::new(&MatrixConfig::new(root), executor)
    }

    #[tokio::test]
    async fn test_completed_pair() {
        let dir = tempfile::tempdir().unwrap();
        let g1 = make_group(dir.path(), "g1", true);
        let g2 = make_group(dir.path(), "g2", true);

        let fake = Arc::new(FakeExecutor::new(|root| {
            assert!(root.join("src/test/g2Test.java").exists());
            assert!(!root.join("src/test/g1Test.java").exists());
            Ok(BuildOutput::from_text("Tests run: 5, Failures: 1, Errors: 1, Skipped: 1")
                .with_exit_code(1))
        }));

        let result = runner(dir.path(), fake.clone()).run(&g1, &g2).await;

        assert_eq!(result.outcome, PairOutcome::Completed);
        assert_eq!((result.runs, result.successes), (5, 2));
        assert_eq!((result.failures, result.errors, result.skipped), (1, 1, 1));
        assert_eq!(result.exit_code, Some(1));
        assert_eq!(fake.calls(), vec![dir.path().join("g1").join("project")]);
        assert!(test_file(dir.path(), "g1", "g1").exists());
        assert!(!test_file(dir.path(), "g1", "g2").exists());
    }

    #[tokio::test]
    async fn test_missing_test_dir_skips_without_build() {
        let dir = tempfile::tempdir().unwrap();
        let g1 = make_group(dir.path(), "g1", true);
        let g3 = make_group(dir.path(), "g3", false);
        let fake = Arc::new(FakeExecutor::with_output(""));
        let runner = runner(dir.path(), fake.clone());

        let as_subject = runner.run(&g3, &g1).await;
        let as_source = runner.run(&g1, &g3).await;

        for result in [&as_subject, &as_source] {
            assert!(matches!(result.outcome, PairOutcome::Skipped { .. }));
            assert_eq!(result.runs, 0);
        }
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_leftover_backup_is_never_swapped() {
        let dir = tempfile::tempdir().unwrap();
        let g1 = make_group(dir.path(), "g1", false);
        let g2 = make_group(dir.path(), "g2", true);
        let stale = dir.path().join("g1/project/src/test_backup");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("g1Test.java"), "g1").unwrap();
        let fake = Arc::new(FakeExecutor::with_output(""));
        let runner = runner(dir.path(), fake.clone());

        for result in [runner.run(&g1, &g2).await, runner.run(&g2, &g1).await] {
            match &result.outcome {
                PairOutcome::Skipped { reason } => assert!(reason.contains("unrestored")),
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
        assert!(fake.calls().is_empty());
        assert_eq!(fs::read_to_string(stale.join("g1Test.java")).unwrap(), "g1");
        assert!(!stale.join("g2Test.java").exists());
    }

    #[tokio::test]
    async fn test_build_error_is_zeroed_and_restored() {
        let dir = tempfile::tempdir().unwrap();
        let g1 = make_group(dir.path(), "g1", true);
        let g2 = make_group(dir.path(), "g2", true);
        let fake = Arc::new(FakeExecutor::new(|_| {
            Err(BuildError::Spawn {
                program: "mvn".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            })
        }));

        let result = runner(dir.path(), fake).run(&g1, &g2).await;

        assert!(matches!(result.outcome, PairOutcome::BuildFailed { .. }));
        assert_eq!(result.runs, 0);
        assert!(test_file(dir.path(), "g1", "g1").exists());
        assert!(!dir.path().join("g1/project/src/test_backup").exists());
    }

    #[tokio::test]
    async fn test_malformed_summary_is_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let g1 = make_group(dir.path(), "g1", true);
        let g2 = make_group(dir.path(), "g2", true);
        let fake = Arc::new(FakeExecutor::with_output("Tests run: lots, Failures: 0"));

        let result = runner(dir.path(), fake).run(&g1, &g2).await;

        assert!(matches!(result.outcome, PairOutcome::ParseFailed { .. }));
        assert_eq!(result.runs, 0);
    }

    #[tokio::test]
    async fn test_nonzero_exit_without_summary() {
        let dir = tempfile::tempdir().unwrap();
        let g1 = make_group(dir.path(), "g1", true);
        let g2 = make_group(dir.path(), "g2", true);
        let fake = Arc::new(FakeExecutor::new(|_| {
            Ok(BuildOutput::from_text("[ERROR] COMPILATION ERROR").with_exit_code(1))
        }));

        let result = runner(dir.path(), fake).run(&g1, &g2).await;

        assert!(matches!(result.outcome, PairOutcome::BuildFailed { .. }));
        assert_eq!(result.exit_code, Some(1));
        assert_eq!(result.runs, 0);
    }

    #[tokio::test]
    async fn test_backup_collision_aborts_pair() {
        let dir = tempfile::tempdir().unwrap();
        let g1 = make_group(dir.path(), "g1", true);
        let g2 = make_group(dir.path(), "g2", true);
        let leftover = dir.path().join("g1/project/src/test_backup");
        fs::create_dir_all(&leftover).unwrap();
        let fake = Arc::new(FakeExecutor::with_output(""));

        let result = runner(dir.path(), fake.clone()).run(&g1, &g2).await;

        assert!(matches!(result.outcome, PairOutcome::SwapAborted { .. }));
        assert!(fake.calls().is_empty());
        assert!(leftover.exists());
        assert!(test_file(dir.path(), "g1", "g1").exists());
    }

    #[tokio::test]
    async fn test_restore_failure_reported() {
        let dir = tempfile::tempdir().unwrap();
        let g1 = make_group(dir.path(), "g1", true);
        let g2 = make_group(dir.path(), "g2", true);
        let fake = Arc::new(FakeExecutor::new(|root| {
            fs::remove_dir_all(root.join("src/test_backup"))?;
            fs::remove_dir_all(root.join("src/test"))?;
            Ok(BuildOutput::from_text(""))
        }));

        let result = runner(dir.path(), fake).run(&g1, &g2).await;

        assert!(matches!(result.outcome, PairOutcome::RestoreFailed { .. }));
        assert_eq!(result.runs, 0);
    }
}
