//! ld-harvest main entry point
//!
//! This is the command-line interface for the ld-harvest JSON-LD harvester.

use anyhow::{bail, Context};
use clap::Parser;
use ld_harvest::config::{compute_content_hash, load_config_with_hash, validate, Config};
use ld_harvest::crawler::run_harvest;
use ld_harvest::output::print_statistics;
use ld_harvest::state::ResultOutcome;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ld-harvest: JSON-LD harvester with sticky proxy sessions
///
/// Fetches every input URL through rotating proxy sessions, extracts the
/// embedded JSON-LD blocks and selects the block describing the target
/// entity type. One result is recorded per URL.
#[derive(Parser, Debug)]
#[command(name = "ld-harvest")]
#[command(version = "1.0.0")]
#[command(about = "JSON-LD harvester with sticky proxy sessions", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Input URL, may be repeated; replaces the URLs of the config file
    #[arg(long = "url", value_name = "URL")]
    urls: Vec<String>,

    /// Number of concurrent workers
    #[arg(long)]
    concurrency: Option<usize>,

    /// Pages served by one session before rotation
    #[arg(long)]
    session_pages: Option<u32>,

    /// Timeout of one fetch attempt in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Lower bound of the delay between items (milliseconds)
    #[arg(long)]
    delay_ms_min: Option<u64>,

    /// Upper bound of the delay between items (milliseconds)
    #[arg(long)]
    delay_ms_max: Option<u64>,

    /// Write results to this SQLite database
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Write results to this JSON lines file
    #[arg(long, value_name = "PATH")]
    jsonl: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without fetching
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics of the latest run in the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration
    fn apply_overrides(&self, config: &mut Config) {
        if !self.urls.is_empty() {
            config.urls = self.urls.clone();
            config.start_urls.clear();
            config.url = None;
        }
        if let Some(concurrency) = self.concurrency {
            config.scraper.concurrency = concurrency;
        }
        if let Some(pages) = self.session_pages {
            config.scraper.session_pages = pages;
        }
        if let Some(timeout) = self.timeout_secs {
            config.scraper.timeout_secs = timeout;
        }
        if let Some(min) = self.delay_ms_min {
            config.scraper.delay_ms_min = min;
        }
        if let Some(max) = self.delay_ms_max {
            config.scraper.delay_ms_max = max;
        }
        if let Some(path) = &self.database {
            config.output.database_path = Some(path.clone());
        }
        if let Some(path) = &self.jsonl {
            config.output.jsonl_path = Some(path.clone());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, hash)
        }
        None => (Config::default(), compute_content_hash(&cli.urls.join("\n"))),
    };

    cli.apply_overrides(&mut config);
    validate(&config).context("Invalid configuration")?;

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_harvest(config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ld_harvest=info,warn"),
            1 => EnvFilter::new("ld_harvest=debug,info"),
            2 => EnvFilter::new("ld_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== ld-harvest Dry Run ===\n");

    println!("Scraper Configuration:");
    println!("  Concurrency: {}", config.scraper.concurrency);
    println!("  Session pages: {}", config.scraper.session_pages);
    println!("  Fetch timeout: {}s", config.scraper.timeout_secs);
    if config.scraper.resolve_redirects {
        println!("  Redirect resolution: {}s per strategy", config.scraper.resolve_timeout_secs);
    } else {
        println!("  Redirect resolution: off");
    }
    println!(
        "  Delay between items: {}-{}ms",
        config.scraper.delay_ms_min, config.scraper.delay_ms_max
    );

    println!("\nProxy:");
    match &config.proxy.url_template {
        Some(template) => println!("  Template: {}", redact_template(template)),
        None => println!("  Direct connection"),
    }

    println!("\nTarget types: {}", config.extraction.target_types.join(", "));

    println!("\nOutput:");
    match &config.output.database_path {
        Some(path) => println!("  Database: {}", path.display()),
        None => println!("  Database: none"),
    }
    match &config.output.jsonl_path {
        Some(path) => println!("  JSON lines: {}", path.display()),
        None => println!("  JSON lines: none"),
    }

    let raw = config.input_urls();
    let urls = config.work_urls()?;
    println!("\nInput URLs ({} of {} usable):", urls.len(), raw.len());
    for url in &urls {
        println!("  - {}", url);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would harvest {} URLs", urls.len());

    Ok(())
}

/// Hides the password of a proxy template
fn redact_template(template: &str) -> String {
    match (template.find("://"), template.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let userinfo = &template[scheme_end + 3..at];
            match userinfo.split_once(':') {
                Some((user, _)) => format!("{}{}:***{}", &template[..scheme_end + 3], user, &template[at..]),
                None => template.to_string(),
            }
        }
        _ => template.to_string(),
    }
}

/// Handles the --stats mode: shows the latest run from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use ld_harvest::storage::{open_storage, Storage};

    let Some(path) = &config.output.database_path else {
        bail!("--stats needs a database (output.database-path or --database)");
    };

    println!("Database: {}\n", path.display());

    let storage = open_storage(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;

    let Some(run) = storage.get_latest_run()? else {
        println!("No runs recorded yet");
        return Ok(());
    };

    println!("Run {} ({})", run.id, run.status.to_db_string());
    println!("  Started: {}", run.started_at);
    if let Some(finished) = &run.finished_at {
        println!("  Finished: {}", finished);
    }
    println!();

    match &run.stats {
        Some(stats) => print_statistics(stats),
        None => println!(
            "Run did not complete; {} results recorded",
            storage.count_results(run.id, None)?
        ),
    }

    println!("\nResults by outcome:");
    for outcome in ResultOutcome::all() {
        let count = storage.count_results(run.id, Some(outcome))?;
        println!("  {:<20} {}", outcome.to_db_string(), count);
    }

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Target types: {}",
        config.extraction.target_types.join(", ")
    );

    let report = match run_harvest(config, config_hash).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            return Err(e.into());
        }
    };

    println!();
    print_statistics(&report.stats);
    if report.rejected_urls > 0 {
        println!(
            "Rejected input URLs: {} (not harvested, no result recorded)",
            report.rejected_urls
        );
    }

    Ok(())
}
