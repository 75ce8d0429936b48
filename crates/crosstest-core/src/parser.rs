//! Build output parser for Maven-style test summaries.
//!
//! Surefire and Failsafe print lines such as
//!
//! ```text
//! [INFO] Tests run: 3, Failures: 1, Errors: 0, Skipped: 0, Time elapsed: 0.05 s - in com.example.FooTest
//! [ERROR] Tests run: 12, Failures: 1, Errors: 0, Skipped: 2
//! ```
//!
//! Per-class lines come first and the cumulative summary last, so the last
//! matching line in the output determines the result.

use crate::domain::BuildCounts;
use crate::error::ParseError;

/// Literal marker identifying a summary line.
pub const SUMMARY_MARKER: &str = "Tests run:";

/// Parse the counts from the last summary line in `lines`.
///
/// Returns all-zero counts when no line contains [`SUMMARY_MARKER`].
/// Any malformed summary line is an error, even if a later line is valid.
pub fn parse_build_output<'a, I>(lines: I) -> Result<BuildCounts, ParseError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts = BuildCounts::default();
    for line in lines {
        if line.contains(SUMMARY_MARKER) {
            counts = parse_summary_line(line)?;
        }
    }
    Ok(counts)
}

/// Parse a single summary line.
///
/// Fields are taken from the marker onward, split on `,`; the first four are
/// runs, failures, errors and skipped. Trailing fields are ignored.
pub fn parse_summary_line(line: &str) -> Result<BuildCounts, ParseError> {
    let start = line.find(SUMMARY_MARKER).unwrap_or(0);
    let fields: Vec<&str> = line[start..].split(',').collect();

    if fields.len() < 4 {
        return Err(ParseError::FieldCount {
            line: line.to_string(),
            found: fields.len(),
        });
    }

    let runs = field_value(line, fields[0])?;
    let failures = field_value(line, fields[1])?;
    let errors = field_value(line, fields[2])?;
    let skipped = field_value(line, fields[3])?;

    let not_passed = failures
        .checked_add(errors)
        .and_then(|n| n.checked_add(skipped));
    match not_passed {
        Some(n) if n <= runs => {}
        _ => {
            return Err(ParseError::Inconsistent {
                line: line.to_string(),
            })
        }
    }

    Ok(BuildCounts {
        runs,
        failures,
        errors,
        skipped,
    })
}

/// Integer after the field's own colon.
fn field_value(line: &str, field: &str) -> Result<u32, ParseError> {
    field
        .split(':')
        .nth(1)
        .and_then(|v| v.trim().parse::<u32>().ok())
        .ok_or_else(|| ParseError::InvalidValue {
            line: line.to_string(),
            field: field.trim().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(output: &str) -> Result<BuildCounts, ParseError> {
        parse_build_output(output.lines())
    }

    #[test]
    fn test_single_summary_line() {
        let counts = parse("Tests run: 5, Failures: 1, Errors: 1, Skipped: 1").unwrap();
        assert_eq!(
            counts,
            BuildCounts {
                runs: 5,
                failures: 1,
                errors: 1,
                skipped: 1,
            }
        );
        assert_eq!(counts.successes(), 2);
        assert_eq!(counts.failures_total(), 3);
    }

    #[test]
    fn test_last_line_wins() {
        let output = "\
[INFO] Running com.example.FooTest
[INFO] Tests run: 2, Failures: 0, Errors: 0, Skipped: 0, Time elapsed: 0.01 s - in com.example.FooTest
[INFO] Running com.example.BarTest
[ERROR] Tests run: 3, Failures: 1, Errors: 0, Skipped: 0, Time elapsed: 0.02 s <<< FAILURE! - in com.example.BarTest
[INFO] Results:
[ERROR] Tests run: 5, Failures: 1, Errors: 0, Skipped: 0
[INFO] BUILD FAILURE";

        let counts = parse(output).unwrap();
        assert_eq!(counts.runs, 5);
        assert_eq!(counts.failures, 1);
        assert_eq!(counts.successes(), 4);
    }

    #[test]
    fn test_no_summary_is_zero() {
        let counts = parse("[INFO] BUILD SUCCESS\n[INFO] Total time: 1.2 s").unwrap();
        assert!(counts.is_zero());
        assert!(parse("").unwrap().is_zero());
    }

    #[test]
    fn test_prefix_with_colon_is_ignored() {
        let counts =
            parse("12:01:33 [INFO] Tests run: 4, Failures: 0, Errors: 0, Skipped: 1").unwrap();
        assert_eq!(counts.runs, 4);
        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.successes(), 3);
    }

    #[test]
    fn test_too_few_fields() {
        let err = parse("Tests run: 4, Failures: 0").unwrap_err();
        assert!(matches!(err, ParseError::FieldCount { found: 2, .. }));
    }

    #[test]
    fn test_non_numeric_value() {
        let err = parse("Tests run: four, Failures: 0, Errors: 0, Skipped: 0").unwrap_err();
        match err {
            ParseError::InvalidValue { field, .. } => assert_eq!(field, "Tests run: four"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_colon() {
        let err = parse("Tests run: 1, Failures 0, Errors: 0, Skipped: 0").unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { .. }));
    }

    #[test]
    fn test_counts_exceeding_runs() {
        let err = parse("Tests run: 1, Failures: 1, Errors: 1, Skipped: 0").unwrap_err();
        assert!(matches!(err, ParseError::Inconsistent { .. }));
    }

    #[test]
    fn test_malformed_earlier_line_fails_whole_output() {
        let output = "\
Tests run: x, Failures: 0, Errors: 0, Skipped: 0
Tests run: 1, Failures: 0, Errors: 0, Skipped: 0";
        assert!(parse(output).is_err());
    }

    #[test]
    fn test_marker_is_case_sensitive() {
        let counts = parse("tests run: 3, Failures: 0, Errors: 0, Skipped: 0").unwrap();
        assert!(counts.is_zero());
    }
}
