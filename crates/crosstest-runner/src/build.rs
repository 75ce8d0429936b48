//! Build command definitions and captured output.

use crosstest_core::BuildSettings;
use serde::{Deserialize, Serialize};

/// The build/verify invocation run against each subject project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildCommand {
    /// Human-readable name used in logs.
    pub name: String,

    /// Command to execute (first element is executable).
    pub command: Vec<String>,

    /// Timeout in seconds (0 = wait forever).
    pub timeout_secs: u64,
}

impl BuildCommand {
    /// `mvn verify` with no timeout.
    pub fn maven_verify() -> Self {
        Self::from_settings(&BuildSettings::default())
    }

    pub fn from_settings(settings: &BuildSettings) -> Self {
        Self {
            name: settings.command.join(" "),
            command: settings.command.clone(),
            timeout_secs: settings.timeout_secs,
        }
    }

    /// Create a custom build command.
    pub fn custom(name: String, command: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            name,
            command,
            timeout_secs,
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

impl Default for BuildCommand {
    fn default() -> Self {
        Self::maven_verify()
    }
}

/// Output of a finished build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    /// Stdout and stderr lines interleaved in arrival order.
    pub lines: Vec<String>,

    /// Exit code (-1 when terminated by a signal).
    pub exit_code: i32,

    /// Whether the process exited successfully.
    pub success: bool,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl BuildOutput {
    /// Successful output from literal text, mostly for fakes and tests.
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
            exit_code: 0,
            success: true,
            duration_ms: 0,
        }
    }

    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = exit_code;
        self.success = exit_code == 0;
        self
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maven_verify_default() {
        let cmd = BuildCommand::default();
        assert_eq!(cmd.command, vec!["mvn", "verify"]);
        assert_eq!(cmd.name, "mvn verify");
        assert_eq!(cmd.timeout_secs, 0);
    }

    #[test]
    fn test_from_settings() {
        let settings = BuildSettings {
            command: vec!["mvn".to_string(), "-q".to_string(), "test".to_string()],
            timeout_secs: 120,
        };
        let cmd = BuildCommand::from_settings(&settings);
        assert_eq!(cmd.name, "mvn -q test");
        assert_eq!(cmd.timeout_secs, 120);
    }

    #[test]
    fn test_custom_with_timeout() {
        let cmd = BuildCommand::custom("echo".to_string(), vec!["echo".to_string()], 0)
            .with_timeout(5);
        assert_eq!(cmd.timeout_secs, 5);
    }

    #[test]
    fn test_output_from_text() {
        let output = BuildOutput::from_text("a\nb").with_exit_code(1);
        assert_eq!(output.lines().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(!output.success);
        assert_eq!(output.exit_code, 1);
    }
}
