//! Error types for build invocation

use thiserror::Error;

/// Errors raised while running the build tool
#[derive(Error, Debug)]
pub enum BuildError {
    /// Build command has no executable
    #[error("Build command {0} is empty")]
    EmptyCommand(String),

    /// Executable missing or not runnable
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Build did not finish in time; the process was killed
    #[error("Build {name} timed out after {secs} seconds")]
    Timeout { name: String, secs: u64 },

    /// IO error while collecting output
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
