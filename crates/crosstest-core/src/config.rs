//! Run configuration.
//!
//! A [`MatrixConfig`] can be loaded from a TOML file and then overridden
//! field by field from the command line. Every field except `root` has a
//! default, so a minimal file is just:
//!
//! ```toml
//! root = "/srv/submissions"
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default marker searched for under `<project>/src`.
pub const DEFAULT_TEST_DIR_MARKER: &str = "test";

/// Default suffix appended to the subject's test directory while swapped.
pub const DEFAULT_BACKUP_SUFFIX: &str = "_backup";

/// Default report file name.
pub const DEFAULT_REPORT_PATH: &str = "test_results.csv";

/// Top-level configuration for a matrix run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatrixConfig {
    /// Directory containing one folder per group.
    pub root: PathBuf,

    /// Fixed name of the submission folder inside each group folder.
    /// When unset, the first directory entry is used.
    pub project_dir: Option<String>,

    /// Substring identifying the test directory under `src`.
    pub test_dir_marker: String,

    /// Suffix for the backup of the subject's tests.
    pub backup_suffix: String,

    pub build: BuildSettings,

    pub report: ReportSettings,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            project_dir: None,
            test_dir_marker: DEFAULT_TEST_DIR_MARKER.to_string(),
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
            build: BuildSettings::default(),
            report: ReportSettings::default(),
        }
    }
}

/// Build tool invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuildSettings {
    /// Command to execute (first element is executable).
    pub command: Vec<String>,

    /// Timeout in seconds (0 = wait forever).
    pub timeout_secs: u64,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            command: vec!["mvn".to_string(), "verify".to_string()],
            timeout_secs: 0,
        }
    }
}

/// CSV column layout.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    /// `Group,TestedBy,Runs,Success,Failures,Errors,Skipped`
    #[default]
    Full,

    /// `Group,TestedBy,Success,Failures`
    Legacy,
}

impl std::str::FromStr for ReportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(ReportFormat::Full),
            "legacy" => Ok(ReportFormat::Legacy),
            other => Err(ConfigError::Invalid(format!(
                "unknown report format '{}' (expected full or legacy)",
                other
            ))),
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportSettings {
    pub path: PathBuf,
    pub format: ReportFormat,

    /// Optional JSON report with per-pair outcomes.
    pub json_path: Option<PathBuf>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_REPORT_PATH),
            format: ReportFormat::Full,
            json_path: None,
        }
    }
}

impl MatrixConfig {
    /// Configuration with defaults for everything but the root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: MatrixConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make every pair fail or corrupt a tree.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.build.command.is_empty() || self.build.command[0].trim().is_empty() {
            return Err(ConfigError::Invalid("build command is empty".to_string()));
        }
        if self.test_dir_marker.is_empty() {
            return Err(ConfigError::Invalid("test_dir_marker is empty".to_string()));
        }
        if self.backup_suffix.is_empty() {
            return Err(ConfigError::Invalid("backup_suffix is empty".to_string()));
        }
        if self.backup_suffix.contains(std::path::MAIN_SEPARATOR) {
            return Err(ConfigError::Invalid(format!(
                "backup_suffix must not contain a path separator: {:?}",
                self.backup_suffix
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MatrixConfig::new("/tmp/groups");
        assert_eq!(config.root, PathBuf::from("/tmp/groups"));
        assert_eq!(config.test_dir_marker, "test");
        assert_eq!(config.backup_suffix, "_backup");
        assert_eq!(config.build.command, vec!["mvn", "verify"]);
        assert_eq!(config.build.timeout_secs, 0);
        assert_eq!(config.report.format, ReportFormat::Full);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_toml() {
        let config = MatrixConfig::from_toml_str(r#"root = "/srv/groups""#).unwrap();
        assert_eq!(config.root, PathBuf::from("/srv/groups"));
        assert_eq!(config.build, BuildSettings::default());
    }

    #[test]
    fn test_full_toml() {
        let config = MatrixConfig::from_toml_str(
            r#"
            root = "/srv/groups"
            project_dir = "semester_project-main"

            [build]
            command = ["mvn", "-q", "verify"]
            timeout_secs = 600

            [report]
            path = "out.csv"
            format = "legacy"
            json_path = "out.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.project_dir.as_deref(), Some("semester_project-main"));
        assert_eq!(config.build.command.len(), 3);
        assert_eq!(config.build.timeout_secs, 600);
        assert_eq!(config.report.format, ReportFormat::Legacy);
        assert_eq!(config.report.json_path, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_empty_command_rejected() {
        let err = MatrixConfig::from_toml_str(
            r#"
            root = "."
            [build]
            command = []
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_empty_suffix_rejected() {
        let mut config = MatrixConfig::new(".");
        config.backup_suffix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_report_format_from_str() {
        assert_eq!("full".parse::<ReportFormat>().unwrap(), ReportFormat::Full);
        assert_eq!("LEGACY".parse::<ReportFormat>().unwrap(), ReportFormat::Legacy);
        assert!("xml".parse::<ReportFormat>().is_err());
    }
}
