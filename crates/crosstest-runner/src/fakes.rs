//! In-process fakes for [`BuildExecutor`] (testing only)
//!
//! `FakeExecutor` runs a closure instead of a build tool and records which
//! project roots it was invoked in. `SummaryExecutor` mimics Maven closely
//! enough for end-to-end tests: it reads the swapped-in test directory and
//! prints a summary line derived from the test files it finds.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::build::BuildOutput;
use crate::error::BuildError;
use crate::executor::BuildExecutor;

type BuildFn = dyn Fn(&Path) -> Result<BuildOutput, BuildError> + Send + Sync;

/// Executor backed by a closure.
pub struct FakeExecutor {
    build: Box<BuildFn>,
    calls: Mutex<Vec<PathBuf>>,
}

impl FakeExecutor {
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(&Path) -> Result<BuildOutput, BuildError> + Send + Sync + 'static,
    {
        Self {
            build: Box::new(build),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always prints `text` and exits 0.
    pub fn with_output(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(BuildOutput::from_text(&text)))
    }

    /// Project roots this executor was invoked in, in order.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildExecutor for FakeExecutor {
    async fn execute(&self, project_root: &Path) -> Result<BuildOutput, BuildError> {
        self.calls.lock().unwrap().push(project_root.to_path_buf());
        (self.build)(project_root)
    }
}

/// Maven look-alike driven by test file contents.
///
/// Every file under `<project_root>/src/<test_dir>` ending in `Test.java`
/// counts as one test. Its first line decides the verdict: `pass`, `fail`,
/// `error` or `skip`. Output is one per-file line followed by the summary,
/// and the exit code is 1 when anything failed or errored.
#[derive(Debug, Clone)]
pub struct SummaryExecutor {
    test_dir: String,
}

impl SummaryExecutor {
    pub fn new(test_dir: impl Into<String>) -> Self {
        Self {
            test_dir: test_dir.into(),
        }
    }
}

impl Default for SummaryExecutor {
    fn default() -> Self {
        Self::new("test")
    }
}

#[async_trait]
impl BuildExecutor for SummaryExecutor {
    async fn execute(&self, project_root: &Path) -> Result<BuildOutput, BuildError> {
        let test_root = project_root.join("src").join(&self.test_dir);
        let mut files = Vec::new();
        collect_tests(&test_root, &mut files)?;
        files.sort();

        let (mut runs, mut failures, mut errors, mut skipped) = (0u32, 0u32, 0u32, 0u32);
        let mut lines = vec!["[INFO] Scanning for projects...".to_string()];

        for file in &files {
            let content = std::fs::read_to_string(file)?;
            let verdict = content.lines().next().unwrap_or("").trim();
            let (f, e, s) = match verdict {
                "fail" => (1, 0, 0),
                "error" => (0, 1, 0),
                "skip" => (0, 0, 1),
                _ => (0, 0, 0),
            };
            runs += 1;
            failures += f;
            errors += e;
            skipped += s;
            lines.push(format!(
                "[INFO] Tests run: 1, Failures: {}, Errors: {}, Skipped: {}, Time elapsed: 0.01 s - in {}",
                f,
                e,
                s,
                file.file_stem().unwrap_or_default().to_string_lossy()
            ));
        }

        lines.push("[INFO] Results:".to_string());
        lines.push(format!(
            "[INFO] Tests run: {}, Failures: {}, Errors: {}, Skipped: {}",
            runs, failures, errors, skipped
        ));

        let exit_code = if failures + errors > 0 { 1 } else { 0 };
        Ok(BuildOutput {
            lines,
            exit_code,
            success: exit_code == 0,
            duration_ms: 0,
        })
    }
}

fn collect_tests(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_tests(&path, files)?;
        } else if path.to_string_lossy().ends_with("Test.java") {
            files.push(path);
        }
    }
    Ok(())
}
