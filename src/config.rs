//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.appeal-swarm.toml` files. The core only ever sees the resulting
//! [`Config`] struct; path discovery stays here and in `main`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".appeal-swarm.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Agent pool and coordination settings.
    #[serde(default)]
    pub swarm: SwarmConfig,

    /// Dataset source settings.
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report file path, used when `--output` is not given.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Debug logging unless `--quiet` is given.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("appeal_report.md")
}

/// Agent pool sizing, thresholds and deadlines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Upper bound on the whole pool, including the three singleton agents.
    #[serde(default = "default_max_agents")]
    pub max_agents: usize,

    /// Number of processor agents.
    #[serde(default = "default_processor_agents")]
    pub processor_agents: usize,

    /// Number of validator agents taking part in consensus.
    #[serde(default = "default_validator_agents")]
    pub validator_agents: usize,

    /// Minimum consensus confidence for a batch to count as validated.
    #[serde(default = "default_validation_threshold")]
    pub validation_threshold: f64,

    /// Deadline for every dispatched task, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Attempts made against the dataset provider before giving up.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Base delay between provider attempts, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Sub-second deadline for tests. Not read from files.
    #[serde(skip)]
    pub(crate) request_timeout_override: Option<Duration>,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            max_agents: default_max_agents(),
            processor_agents: default_processor_agents(),
            validator_agents: default_validator_agents(),
            validation_threshold: default_validation_threshold(),
            request_timeout_seconds: default_request_timeout(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_override: None,
        }
    }
}

fn default_max_agents() -> usize {
    15
}

fn default_processor_agents() -> usize {
    8
}

fn default_validator_agents() -> usize {
    3
}

fn default_validation_threshold() -> f64 {
    0.7
}

fn default_request_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    250
}

impl SwarmConfig {
    /// Per-task deadline.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_override
            .unwrap_or_else(|| Duration::from_secs(self.request_timeout_seconds))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Total pool size: collector, analyzer and reporter plus both swarms.
    pub fn pool_size(&self) -> usize {
        3 + self.processor_agents + self.validator_agents
    }
}

/// Where the collector gets its records from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetSource {
    /// Seeded synthetic records.
    #[default]
    Mock,
    /// A JSON file on disk.
    File,
}

/// Dataset provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default)]
    pub source: DatasetSource,

    /// JSON dataset path, required when `source = "file"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Identifier passed to the provider's fetch call.
    #[serde(default = "default_source_id")]
    pub source_id: String,

    /// Human-readable jurisdiction, used in report titles.
    #[serde(default = "default_jurisdiction")]
    pub jurisdiction: String,

    /// Number of properties the mock provider generates.
    #[serde(default = "default_mock_properties")]
    pub mock_properties: usize,

    /// Share of mock properties that carry an appeal.
    #[serde(default = "default_appeal_rate")]
    pub appeal_rate: f64,

    /// Seed for the mock provider; random when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            source: DatasetSource::Mock,
            path: None,
            source_id: default_source_id(),
            jurisdiction: default_jurisdiction(),
            mock_properties: default_mock_properties(),
            appeal_rate: default_appeal_rate(),
            seed: None,
        }
    }
}

fn default_source_id() -> String {
    "lackawanna".to_string()
}

fn default_jurisdiction() -> String {
    "Lackawanna County".to_string()
}

fn default_mock_properties() -> usize {
    50
}

fn default_appeal_rate() -> f64 {
    0.15
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Number of sample results in the partial report.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Data sources listed in the complete report's methodology block.
    #[serde(default = "default_data_sources")]
    pub data_sources: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            data_sources: default_data_sources(),
        }
    }
}

fn default_sample_size() -> usize {
    5
}

fn default_data_sources() -> Vec<String> {
    vec!["County Assessment Database", "Appeal Records"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(processors) = args.processors {
            self.swarm.processor_agents = processors;
        }
        if let Some(validators) = args.validators {
            self.swarm.validator_agents = validators;
        }
        if let Some(timeout) = args.timeout {
            self.swarm.request_timeout_seconds = timeout;
        }

        // An explicit dataset file switches the provider
        if let Some(ref path) = args.dataset {
            self.dataset.source = DatasetSource::File;
            self.dataset.path = Some(path.clone());
        }
        if let Some(count) = args.mock_properties {
            self.dataset.mock_properties = count;
        }
        if let Some(seed) = args.seed {
            self.dataset.seed = Some(seed);
        }

        if let Some(ref output) = args.output {
            self.general.output = output.clone();
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.swarm.processor_agents, 8);
        assert_eq!(config.swarm.validator_agents, 3);
        assert_eq!(config.swarm.max_agents, 15);
        assert_eq!(config.swarm.validation_threshold, 0.7);
        assert_eq!(config.dataset.source, DatasetSource::Mock);
        assert_eq!(config.report.sample_size, 5);
        assert_eq!(config.swarm.pool_size(), 14);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "custom_report.md"
verbose = true

[swarm]
processor_agents = 4
validation_threshold = 0.8

[dataset]
source = "file"
path = "data/appeals.json"
jurisdiction = "Luzerne County"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, PathBuf::from("custom_report.md"));
        assert!(config.general.verbose);
        assert_eq!(config.swarm.processor_agents, 4);
        assert_eq!(config.swarm.validator_agents, 3);
        assert_eq!(config.swarm.validation_threshold, 0.8);
        assert_eq!(config.dataset.source, DatasetSource::File);
        assert_eq!(config.dataset.path, Some(PathBuf::from("data/appeals.json")));
        assert_eq!(config.dataset.jurisdiction, "Luzerne County");
    }

    #[test]
    fn test_request_timeout_override() {
        let mut swarm = SwarmConfig::default();
        assert_eq!(swarm.request_timeout(), Duration::from_secs(30));

        swarm.request_timeout_override = Some(Duration::from_millis(40));
        assert_eq!(swarm.request_timeout(), Duration::from_millis(40));
    }

    #[test]
    fn test_merge_output_from_args() {
        let mut config: Config = toml::from_str("[general]\noutput = \"county.md\"").unwrap();
        let mut args = crate::cli::Args::try_parse_from(["appeal-swarm"]).unwrap();
        config.merge_with_args(&args);
        assert_eq!(config.general.output, PathBuf::from("county.md"));

        args.output = Some(PathBuf::from("override.md"));
        config.merge_with_args(&args);
        assert_eq!(config.general.output, PathBuf::from("override.md"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[swarm]\nvalidator_agents = 5").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.swarm.validator_agents, 5);
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[swarm\nbroken").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[swarm]"));
        assert!(toml_str.contains("[dataset]"));
        assert!(toml_str.contains("[report]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.swarm, SwarmConfig::default());
    }
}
