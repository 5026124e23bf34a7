//! Appeal Swarm - multi-agent review of property-tax appeals
//!
//! A CLI tool that runs county property and appeal records through a pool
//! of worker agents and writes a tiered appeal report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error or aborted workflow
//!   2 - Consensus not validated and --fail-on-unvalidated was given

use anyhow::{Context, Result};
use appeal_swarm::cli::{Args, OutputFormat};
use appeal_swarm::config::{Config, DatasetSource, DEFAULT_CONFIG_FILE};
use appeal_swarm::provider::{DatasetProvider, JsonFileProvider, MockProvider};
use appeal_swarm::report::{self, CompleteReport, RunReport};
use appeal_swarm::swarm::Coordinator;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration; general.verbose feeds the log level
    let (mut config, origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&args, &config);

    info!("Appeal Swarm v{}", env!("CARGO_PKG_VERSION"));
    info!("{}", origin);
    debug!("Arguments: {:?}", args);

    match run_workflow(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Workflow failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default config file.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize pool sizes, thresholds, and the dataset source.");
    Ok(())
}

/// Initialize logging based on verbosity settings. `RUST_LOG` wins when set.
fn init_logging(args: &Args, config: &Config) {
    let level = args.log_level(config.general.verbose);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Build the dataset provider the config asks for.
fn build_provider(config: &Config) -> Result<Arc<dyn DatasetProvider>> {
    match config.dataset.source {
        DatasetSource::Mock => Ok(Arc::new(MockProvider::new(
            config.dataset.mock_properties,
            config.dataset.appeal_rate,
            config.dataset.seed,
        ))),
        DatasetSource::File => {
            let path = config
                .dataset
                .path
                .clone()
                .context("dataset.source = \"file\" requires dataset.path")?;
            Ok(Arc::new(JsonFileProvider::new(path)))
        }
    }
}

fn spinner(quiet: bool) -> Option<ProgressBar> {
    if quiet {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]") {
        bar.set_style(style);
    }
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_message("Running agent swarm...");
    Some(bar)
}

/// Run the complete workflow. Returns the exit code.
async fn run_workflow(args: Args, config: Config) -> Result<i32> {
    let provider = build_provider(&config)?;

    if args.dry_run {
        return handle_dry_run(&config, provider.as_ref()).await;
    }

    println!("🤖 Starting agent swarm...");
    println!("   Dataset: {} ({})", config.dataset.source_id, provider.name());
    println!(
        "   Processors: {} | Validators: {} | Threshold: {:.2}",
        config.swarm.processor_agents,
        config.swarm.validator_agents,
        config.swarm.validation_threshold
    );
    println!("   Timeout: {}s", config.swarm.request_timeout().as_secs());

    let mut coordinator = Coordinator::from_config(&config, provider)
        .context("Failed to start agent pool")?;

    let progress = spinner(args.quiet);
    let workflow = coordinator.run().await;

    let mut complete: Option<CompleteReport> = None;
    if args.complete && workflow.success {
        if let Some(ref bar) = progress {
            bar.set_message("Generating complete report...");
        }
        let result = coordinator
            .generate_complete_report(&workflow)
            .await
            .context("Failed to issue complete report")?;
        match result.payload().get("report") {
            Some(value) if result.is_completed() => {
                complete = Some(
                    serde_json::from_value(value.clone())
                        .context("Reporter returned a malformed complete report")?,
                );
            }
            _ => warn!(
                "Complete report failed: {}",
                result.error().unwrap_or("no report in payload")
            ),
        }
    }

    if let Some(bar) = progress {
        bar.finish_and_clear();
    }
    coordinator.shutdown();

    // Generate and save the report
    println!("\n📝 Generating report...");
    let validated = workflow.is_validated();
    let success = workflow.success;
    let run_report = RunReport::new(workflow, complete);

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&run_report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&run_report),
    };

    let path = &config.general.output;
    std::fs::write(path, &output)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    print_summary(&run_report);
    println!("\n📄 Report saved to: {}", path.display());

    if !success {
        eprintln!("\n⛔ Workflow aborted (exit code 1).");
        return Ok(1);
    }

    if args.fail_on_unvalidated && !validated {
        eprintln!("\n⛔ Consensus below validation threshold. Failing (exit code 2).");
        return Ok(2);
    }

    println!("\n✅ Workflow complete!");
    Ok(0)
}

fn print_summary(report: &RunReport) {
    let workflow = &report.workflow;

    println!("\n📊 Workflow Summary:");
    println!(
        "   Tasks: {} total | {} completed | {} failed",
        workflow.total_tasks, workflow.completed_tasks, workflow.failed_tasks
    );
    if let Some(validation) = workflow.validation() {
        println!(
            "   Consensus: {:.3} from {} validators ({})",
            validation.confidence,
            validation.validator_count,
            if validation.validated { "validated" } else { "not validated" }
        );
    }
    if let Some(partial) = workflow.report() {
        println!(
            "   Approval rate: {:.1}% | Estimated savings: ${:.0}",
            partial.summary.approval_rate * 100.0,
            partial.statistics.estimated_savings
        );
    }
    for error in &workflow.errors {
        println!("   ❗ {}", error);
    }
    println!("   Duration: {:.2}s", workflow.execution_time_seconds);
}

/// Handle --dry-run: fetch the dataset, print the pool layout, run no agents.
async fn handle_dry_run(config: &Config, provider: &dyn DatasetProvider) -> Result<i32> {
    println!("\n🔍 Dry run: no agents will be started...\n");

    let swarm = &config.swarm;
    println!("   Agent pool ({} of max {}):", swarm.pool_size(), swarm.max_agents);
    println!("     collector_001, analyzer_001, reporter_001");
    println!(
        "     processor_001..processor_{:03}",
        swarm.processor_agents
    );
    println!(
        "     validator_001..validator_{:03}",
        swarm.validator_agents
    );
    if swarm.pool_size() > swarm.max_agents {
        println!("   ⚠️  Pool exceeds max_agents; a real run would be rejected.");
    }

    let dataset = provider
        .fetch(&config.dataset.source_id)
        .await
        .with_context(|| format!("Failed to fetch dataset from {} provider", provider.name()))?;

    println!("\n   Dataset from {} provider:", provider.name());
    println!("     Properties: {}", dataset.properties.len());
    println!("     Appeals: {}", dataset.appeals.len());
    println!(
        "     Requested reduction: ${}",
        dataset.total_requested_reduction()
    );

    println!("\n✅ Dry run complete. No agents were run.");
    Ok(0)
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so it returns a line describing where the
/// config came from instead of logging it.
fn load_config(args: &Args) -> Result<(Config, String)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, format!("Loaded config from: {}", config_path.display())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((
            config,
            format!("Loaded default config from {}", DEFAULT_CONFIG_FILE),
        )),
        Ok(None) => Ok((
            Config::default(),
            "No config file found, using defaults".to_string(),
        )),
        Err(e) => {
            eprintln!("⚠️  Failed to load config: {:#}", e);
            Ok((Config::default(), "Using default config".to_string()))
        }
    }
}
