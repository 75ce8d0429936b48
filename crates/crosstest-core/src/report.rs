//! Report artifacts written at the end of a run.
//!
//! - CSV (`test_results.csv`), one row per ordered pair
//! - optional JSON with run metadata and per-pair outcomes
//!
//! Both are written to a temp file next to the target and renamed into place,
//! so an interrupted run never leaves a truncated report.

use crate::config::ReportFormat;
use crate::domain::ResultMatrix;
use crate::error::ReportError;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub type Result<T> = std::result::Result<T, ReportError>;

pub const FULL_HEADER: &str = "Group,TestedBy,Runs,Success,Failures,Errors,Skipped";
pub const LEGACY_HEADER: &str = "Group,TestedBy,Success,Failures";

/// Render the matrix as CSV text.
///
/// The legacy layout reports `Failures` as failures + errors + skipped.
pub fn render_csv(matrix: &ResultMatrix, format: ReportFormat) -> String {
    let mut out = String::new();
    out.push_str(match format {
        ReportFormat::Full => FULL_HEADER,
        ReportFormat::Legacy => LEGACY_HEADER,
    });
    out.push('\n');

    for r in &matrix.results {
        let row = match format {
            ReportFormat::Full => format!(
                "{},{},{},{},{},{},{}",
                csv_field(&r.subject),
                csv_field(&r.source),
                r.runs,
                r.successes,
                r.failures,
                r.errors,
                r.skipped
            ),
            ReportFormat::Legacy => format!(
                "{},{},{},{}",
                csv_field(&r.subject),
                csv_field(&r.source),
                r.successes,
                r.failures_total()
            ),
        };
        out.push_str(&row);
        out.push('\n');
    }
    out
}

/// Write the CSV report to `path`.
pub fn write_csv(matrix: &ResultMatrix, path: &Path, format: ReportFormat) -> Result<()> {
    write_atomic(path, render_csv(matrix, format).as_bytes())
}

/// Write the full matrix, including outcomes, as pretty JSON.
pub fn write_json(matrix: &ResultMatrix, path: &Path) -> Result<()> {
    let json = serde_json::to_vec_pretty(matrix)?;
    write_atomic(path, &json)
}

/// Quote a field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let io_err = |source: std::io::Error| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(io_err)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(data).map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
