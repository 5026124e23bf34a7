//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Appeal Swarm - multi-agent review of property-tax appeals
///
/// Collects property and appeal records, runs them through a pool of
/// analyzer, processor and validator agents, and writes a report.
///
/// Examples:
///   appeal-swarm
///   appeal-swarm --dataset ./appeals.json --format json
///   appeal-swarm --mock-properties 200 --seed 7 --processors 4
///   appeal-swarm --complete --output full_report.md
///   appeal-swarm --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .appeal-swarm.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// JSON dataset with `properties` and `appeals` arrays
    ///
    /// When omitted, a synthetic dataset is generated.
    #[arg(short, long, value_name = "FILE", env = "APPEAL_SWARM_DATASET")]
    pub dataset: Option<PathBuf>,

    /// Number of properties in the synthetic dataset
    #[arg(long, value_name = "COUNT")]
    pub mock_properties: Option<usize>,

    /// Seed for the synthetic dataset
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Number of processor agents
    #[arg(long, value_name = "NUM")]
    pub processors: Option<usize>,

    /// Number of validator agents
    #[arg(long, value_name = "NUM")]
    pub validators: Option<usize>,

    /// Per-task deadline in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output file path for the report
    ///
    /// Defaults to `general.output` from the config file (appeal_report.md).
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Also generate the complete report (payment confirmed)
    #[arg(long)]
    pub complete: bool,

    /// Exit with code 2 when validator consensus falls below the threshold
    #[arg(long)]
    pub fail_on_unvalidated: bool,

    /// Dry run: show the agent pool and dataset statistics without running agents
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .appeal-swarm.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.processors == Some(0) {
            return Err("At least one processor agent is required".to_string());
        }

        if self.validators == Some(0) {
            return Err("At least one validator agent is required".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref path) = self.dataset {
            if !path.is_file() {
                return Err(format!("Dataset file does not exist: {}", path.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the config file's `general.verbose`; `--quiet` beats it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
