//! crosstest core - swap, restore and count
//!
//! Building blocks for cross-validating submission test suites:
//! - Resolve a group's project and test directory ([`resolver`])
//! - Swap a foreign test directory in and guarantee restoration ([`swap`])
//! - Extract test counts from build tool output ([`parser`])
//! - Write the resulting matrix as CSV or JSON ([`report`])
//!
//! Orchestration over pairs of groups lives in `crosstest-runner`.

pub mod config;
pub mod domain;
pub mod error;
pub mod obs;
pub mod parser;
pub mod report;
pub mod resolver;
pub mod swap;
pub mod telemetry;

pub use config::{BuildSettings, MatrixConfig, ReportFormat, ReportSettings};
pub use domain::{BuildCounts, Group, PairOutcome, PairResult, ProjectLocation, ResultMatrix};
pub use error::{ConfigError, ParseError, ReportError, ResolveError, SwapError};
pub use parser::parse_build_output;
pub use report::{write_csv, write_json};
pub use resolver::{list_groups, PathResolver};
pub use swap::{with_swapped_tests, SwapState, SwapTransaction};
pub use telemetry::init_tracing;
