//! Matrix orchestration over all ordered pairs of groups.

use crate::executor::BuildExecutor;
use crate::pair::PairRunner;
use crosstest_core::obs;
use crosstest_core::report;
use crosstest_core::{
    list_groups, Group, MatrixConfig, PairOutcome, PairResult, ReportError, ResultMatrix,
};
use std::sync::Arc;
use tracing::{error, info};

/// Ordered pairs `(i, j)` with `i != j`, row by row.
pub fn ordered_pairs<T>(items: &[T]) -> Vec<(&T, &T)> {
    let mut pairs = Vec::with_capacity(items.len() * items.len().saturating_sub(1));
    for (i, a) in items.iter().enumerate() {
        for (j, b) in items.iter().enumerate() {
            if i != j {
                pairs.push((a, b));
            }
        }
    }
    pairs
}

/// Runs every ordered pair, one at a time.
///
/// Pairs are strictly sequential: a pair's swap is fully restored before the
/// next pair touches any directory. A group whose restore failed is poisoned
/// and every later pair involving it is recorded as all-zero.
pub struct MatrixRunner {
    config: MatrixConfig,
    pairs: PairRunner,
}

impl MatrixRunner {
    pub fn new(config: MatrixConfig, executor: Arc<dyn BuildExecutor>) -> Self {
        let pairs = PairRunner::new(&config, executor);
        Self { config, pairs }
    }

    pub fn config(&self) -> &MatrixConfig {
        &self.config
    }

    /// List the groups under the configured root and run every pair.
    ///
    /// An unreadable root is logged and yields an empty matrix.
    pub async fn run(&self) -> ResultMatrix {
        let groups = match list_groups(&self.config.root) {
            Ok(groups) => groups,
            Err(e) => {
                error!(error = %e, "Failed to list groups");
                Vec::new()
            }
        };
        self.run_groups(&groups).await
    }

    /// Run every ordered pair over `groups`, in the given order.
    pub async fn run_groups(&self, groups: &[Group]) -> ResultMatrix {
        let mut matrix = ResultMatrix::new(groups.iter().map(|g| g.id.clone()).collect());
        let pairs = ordered_pairs(groups);
        let run_id = matrix.run_id.to_string();

        obs::emit_matrix_started(&run_id, groups.len(), pairs.len());

        for (subject, source) in pairs {
            let poisoned = [subject, source]
                .into_iter()
                .find(|g| matrix.poisoned.contains(&g.id));

            let result = match poisoned {
                Some(group) => {
                    obs::emit_pair_skipped(
                        &subject.id,
                        &source.id,
                        &format!("group {} poisoned by restore failure", group.id),
                    );
                    PairResult::zeroed(
                        &subject.id,
                        &source.id,
                        PairOutcome::Poisoned {
                            group: group.id.clone(),
                        },
                    )
                }
                None => self.pairs.run(subject, source).await,
            };

            if matches!(result.outcome, PairOutcome::RestoreFailed { .. }) {
                error!(
                    group = %subject.id,
                    "Poisoning group, its remaining pairs will be skipped"
                );
                matrix.poisoned.insert(subject.id.clone());
            }

            matrix.push(result);
        }

        obs::emit_matrix_finished(
            &run_id,
            matrix.len(),
            matrix.completed_count(),
            matrix.poisoned.len(),
        );
        matrix
    }

    /// Run the matrix and write the configured reports.
    pub async fn run_and_report(&self) -> Result<ResultMatrix, ReportError> {
        let matrix = self.run().await;
        let settings = &self.config.report;

        report::write_csv(&matrix, &settings.path, settings.format)?;
        info!(path = %settings.path.display(), rows = matrix.len(), "Wrote CSV report");

        if let Some(json_path) = &settings.json_path {
            report::write_json(&matrix, json_path)?;
            info!(path = %json_path.display(), "Wrote JSON report");
        }

        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ordered_pairs_count_and_uniqueness() {
        for n in 0..6usize {
            let items: Vec<usize> = (0..n).collect();
            let pairs = ordered_pairs(&items);
            assert_eq!(pairs.len(), n * n.saturating_sub(1));

            let unique: HashSet<_> = pairs.iter().map(|(a, b)| (**a, **b)).collect();
            assert_eq!(unique.len(), pairs.len());
            assert!(pairs.iter().all(|(a, b)| a != b));
        }
    }

    #[test]
    fn test_ordered_pairs_row_order() {
        let items = ["a", "b", "c"];
        let pairs: Vec<_> = ordered_pairs(&items)
            .into_iter()
            .map(|(a, b)| format!("{a}{b}"))
            .collect();
        assert_eq!(pairs, vec!["ab", "ac", "ba", "bc", "ca", "cb"]);
    }
}
