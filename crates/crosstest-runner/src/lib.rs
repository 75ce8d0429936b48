//! crosstest runner - pair and matrix orchestration
//!
//! Drives the build tool over every ordered pair of groups:
//! - Runs the configured build command in the subject's project root
//! - Swaps the source group's tests in for the duration of the build
//! - Parses the build summary into a `PairResult`
//! - Never lets one pair's failure stop the matrix

pub mod build;
pub mod error;
pub mod executor;
pub mod fakes;
pub mod matrix;
pub mod pair;

// Re-export key types
pub use build::{BuildCommand, BuildOutput};
pub use error::BuildError;
pub use executor::{BuildExecutor, ProcessExecutor};
pub use matrix::{ordered_pairs, MatrixRunner};
pub use pair::PairRunner;
