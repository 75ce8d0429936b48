//! crosstest - cross-validate submission test suites
//!
//! For every ordered pair of groups under a root directory, swaps the second
//! group's tests into the first group's project, runs the build tool, and
//! records the test counts.
//!
//! ## Commands
//!
//! - `run`: evaluate the full matrix and write the report
//! - `check`: resolve every group's project and test directory without building
//! - `parse`: parse a saved build log and print the counts

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crosstest_core::{
    init_tracing, list_groups, parse_build_output, MatrixConfig, PathResolver, ReportFormat,
};
use crosstest_runner::{BuildCommand, MatrixRunner, ProcessExecutor};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, Level};

/// Exit code when at least one submission could not be restored.
const EXIT_POISONED: u8 = 2;

#[derive(Parser)]
#[command(name = "crosstest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cross-validate submission test suites", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every ordered pair and write the report
    Run {
        #[command(flatten)]
        target: TargetArgs,

        /// Build command, split on whitespace (default: "mvn verify")
        #[arg(long)]
        build: Option<String>,

        /// Build timeout in seconds (0 = wait forever)
        #[arg(long)]
        timeout: Option<u64>,

        /// CSV report path (default: test_results.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// CSV layout: full or legacy
        #[arg(long)]
        format: Option<ReportFormat>,

        /// Also write a JSON report with per-pair outcomes
        #[arg(long)]
        json_report: Option<PathBuf>,
    },

    /// Resolve every group's test directory without running any build
    Check {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Parse a saved build log and print the counts
    Parse {
        /// Build log file
        log: PathBuf,
    },
}

#[derive(clap::Args)]
struct TargetArgs {
    /// Directory containing one folder per group
    #[arg(env = "CROSSTEST_ROOT")]
    root: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fixed submission folder name inside each group
    #[arg(long)]
    project_dir: Option<String>,

    /// Substring identifying the test directory under src
    #[arg(long)]
    marker: Option<String>,
}

impl TargetArgs {
    fn load(&self) -> Result<MatrixConfig> {
        let mut config = match &self.config {
            Some(path) => MatrixConfig::from_file(path)
                .with_context(|| format!("Failed to load config {:?}", path))?,
            None => MatrixConfig::default(),
        };
        if let Some(root) = &self.root {
            config.root = root.clone();
        }
        if let Some(project_dir) = &self.project_dir {
            config.project_dir = Some(project_dir.clone());
        }
        if let Some(marker) = &self.marker {
            config.test_dir_marker = marker.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            target,
            build,
            timeout,
            output,
            format,
            json_report,
        } => {
            let mut config = target.load()?;
            if let Some(build) = build {
                config.build.command = build.split_whitespace().map(str::to_string).collect();
            }
            if let Some(timeout) = timeout {
                config.build.timeout_secs = timeout;
            }
            if let Some(output) = output {
                config.report.path = output;
            }
            if let Some(format) = format {
                config.report.format = format;
            }
            if json_report.is_some() {
                config.report.json_path = json_report;
            }
            cmd_run(config).await
        }
        Commands::Check { target } => cmd_check(target.load()?),
        Commands::Parse { log } => cmd_parse(&log),
    }
}

/// Run the full matrix and write the report
async fn cmd_run(config: MatrixConfig) -> Result<ExitCode> {
    config.validate().context("Invalid configuration")?;
    info!(root = %config.root.display(), command = ?config.build.command, "Starting matrix run");

    let executor = ProcessExecutor::new(BuildCommand::from_settings(&config.build));
    let runner = MatrixRunner::new(config, Arc::new(executor));
    let matrix = runner
        .run_and_report()
        .await
        .context("Failed to write report")?;

    println!(
        "Evaluated {} pair(s) across {} group(s); {} completed",
        matrix.len(),
        matrix.groups.len(),
        matrix.completed_count()
    );
    println!("Report: {}", runner.config().report.path.display());

    if matrix.has_poisoned() {
        for group in &matrix.poisoned {
            error!(group = %group, "Tests were not restored, repair this submission by hand");
        }
        return Ok(ExitCode::from(EXIT_POISONED));
    }
    Ok(ExitCode::SUCCESS)
}

/// Resolve all groups and print the test directory each would use
fn cmd_check(config: MatrixConfig) -> Result<ExitCode> {
    config.validate().context("Invalid configuration")?;
    let groups = list_groups(&config.root)
        .with_context(|| format!("Failed to list groups under {:?}", config.root))?;
    let resolver = PathResolver::from_config(&config);

    let mut missing = 0usize;
    for group in &groups {
        match resolver.resolve(group) {
            Ok(location) => {
                let note = if location.naming_deviation {
                    " (non-standard name)"
                } else {
                    ""
                };
                println!("{}\t{}{}", group.id, location.test_dir.display(), note);
            }
            Err(e) => {
                missing += 1;
                println!("{}\tMISSING: {}", group.id, e);
            }
        }
    }

    println!(
        "{} group(s), {} resolvable, {} pair(s) to run",
        groups.len(),
        groups.len() - missing,
        groups.len() * groups.len().saturating_sub(1)
    );
    Ok(ExitCode::SUCCESS)
}

/// Parse a build log and print the counts
fn cmd_parse(log: &Path) -> Result<ExitCode> {
    let content =
        std::fs::read_to_string(log).with_context(|| format!("Failed to read {:?}", log))?;
    let counts = parse_build_output(content.lines()).context("Malformed test summary")?;

    println!("Runs:     {}", counts.runs);
    println!("Success:  {}", counts.successes());
    println!("Failures: {}", counts.failures);
    println!("Errors:   {}", counts.errors);
    println!("Skipped:  {}", counts.skipped);
    Ok(ExitCode::SUCCESS)
}
