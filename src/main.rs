//! Moto-Harvest main entry point
//!
//! This is the command-line interface for the vehicle listing harvester.

use anyhow::Context;
use clap::Parser;
use moto_harvest::config::{load_config_with_hash, validate, Config};
use moto_harvest::output::{print_summary, transform_all, write_json};
use moto_harvest::reveal::{DisabledLauncher, SessionLauncher};
use moto_harvest::Harvester;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Moto-Harvest: a vehicle listing harvester
///
/// Walks the search result pages of the marketplace, visits every listing,
/// reveals the VIN in a headless browser when needed and writes the
/// listings as JSON.
#[derive(Parser, Debug)]
#[command(name = "moto-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A vehicle listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file; built-in defaults when omitted
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Number of search result pages to walk
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pages: Option<u32>,

    /// Where to write the JSON output
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Skip the interactive VIN reveal and rely on static sources
    #[arg(long)]
    no_browser: bool,

    /// Validate config and show what would be harvested without harvesting
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    apply_overrides(&mut config, &cli);
    validate(&config).context("invalid configuration after command-line overrides")?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_harvest(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("moto_harvest=info,warn"),
            1 => EnvFilter::new("moto_harvest=debug,info"),
            2 => EnvFilter::new("moto_harvest=trace,debug"),
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

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(pages) = cli.pages {
        config.crawler.max_pages = pages;
    }
    if let Some(output) = &cli.output {
        config.output.path = output.to_string_lossy().to_string();
    }
    if cli.no_browser {
        config.browser.enabled = false;
    }
}

/// Handles the --dry-run mode: shows what would be harvested
fn handle_dry_run(config: &Config) {
    println!("=== Moto-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Listing marker: {}", config.site.listing_marker);

    println!("\nCrawler:");
    println!("  Pages: {}", config.crawler.max_pages);
    println!("  Page delay: {}ms", config.crawler.page_delay_ms);
    println!("  Chunk size: {}", config.crawler.chunk_size);
    println!("  Chunk delay: {}ms", config.crawler.chunk_delay_ms);

    println!("\nFetch:");
    println!("  Max retries: {}", config.fetch.max_retries);
    println!("  Base delay: {}ms", config.fetch.base_delay_ms);
    println!(
        "  Blocked cooldown: {}ms (up to {} times)",
        config.fetch.blocked_cooldown_ms, config.fetch.max_blocked_retries
    );

    println!("\nBrowser:");
    if config.browser.enabled {
        println!("  Headless: {}", config.browser.headless);
        let executable = config.browser.chrome_path.as_deref();
        println!("  Executable: {}", executable.unwrap_or("(auto-detect)"));
        println!(
            "  Attempts: {} ({}ms cooldown)",
            config.browser.retries + 1,
            config.browser.retry_cooldown_ms
        );
    } else {
        println!("  Disabled, VIN comes from static sources only");
    }

    println!("\nIdentity:");
    match &config.identity.user_agents {
        Some(agents) => println!("  {} configured user agents", agents.len()),
        None => println!("  Built-in user agent pool"),
    }

    println!("\nOutput: {}", config.output.path);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would walk {} result page(s) starting at {}",
        config.crawler.max_pages, config.site.base_url
    );
}

/// Handles the main harvest operation
#[cfg(feature = "browser")]
async fn handle_harvest(config: Config) -> anyhow::Result<()> {
    if !config.browser.enabled {
        return harvest_with(config, DisabledLauncher).await;
    }

    let output_path = PathBuf::from(&config.output.path);
    let harvester = Harvester::with_chrome(config)
        .context("browser setup failed (use --no-browser to skip the VIN reveal)")?;
    run_and_write(&harvester, &output_path).await
}

/// Handles the main harvest operation
#[cfg(not(feature = "browser"))]
async fn handle_harvest(config: Config) -> anyhow::Result<()> {
    if config.browser.enabled {
        tracing::warn!("Built without the `browser` feature; VIN comes from static sources only");
    }
    harvest_with(config, DisabledLauncher).await
}

async fn harvest_with<L: SessionLauncher + 'static>(
    config: Config,
    launcher: L,
) -> anyhow::Result<()> {
    let output_path = PathBuf::from(&config.output.path);
    let harvester = Harvester::new(config, launcher).context("failed to initialize harvester")?;
    run_and_write(&harvester, &output_path).await
}

async fn run_and_write<L: SessionLauncher + 'static>(
    harvester: &Harvester<L>,
    output_path: &Path,
) -> anyhow::Result<()> {
    let (records, summary) = harvester.run().await;
    let listings = transform_all(&records);

    write_json(&listings, output_path)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    print_summary(&summary);
    println!(
        "\n✓ Saved {} listings to {}",
        listings.len(),
        output_path.display()
    );

    Ok(())
}
