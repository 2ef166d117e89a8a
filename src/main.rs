//! Warc-Harvest main entry point
//!
//! This is the command-line interface for the Warc-Harvest archiver.

use anyhow::{bail, Context};
use clap::Parser;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use warc_harvest::archive::{read_container, RecordType};
use warc_harvest::config::{load_config_with_hash, validate, Config};
use warc_harvest::crawler::{Crawler, TracingProgress};
use warc_harvest::output::print_summary;
use warc_harvest::seeds::load_seed_list;
use warc_harvest::url::{extract_domain, parse_seed_url};

const DEFAULT_OUTPUT_DIR: &str = "warcs/scraped-warcs";

/// Warc-Harvest: a pagination-aware WARC archiver
///
/// Warc-Harvest fetches every URL of a seed list, follows each seed's
/// pagination chain, and writes one WARC container per seed.
#[derive(Parser, Debug)]
#[command(name = "warc-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A pagination-aware WARC archiver", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Two-column CSV seed list (overrides [seeds] path)
    #[arg(long, value_name = "CSV")]
    seeds: Option<PathBuf>,

    /// Directory receiving the containers (overrides [output] directory)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Detect next-page links heuristically
    #[arg(long)]
    follow_pagination: bool,

    /// Maximum pages fetched per seed
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and seed list and show what would be crawled
    #[arg(long, conflicts_with = "inspect")]
    dry_run: bool,

    /// Print the records of an existing container and exit
    #[arg(long, value_name = "WARC", conflicts_with = "dry_run")]
    inspect: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.inspect {
        setup_logging(cli.verbose, cli.quiet, None)?;
        return handle_inspect(path);
    }

    let (config, config_hash) = load_effective_config(&cli)?;
    setup_logging(
        cli.verbose,
        cli.quiet,
        config.output.log_file.as_deref().map(Path::new),
    )?;

    match &config_hash {
        Some(hash) => tracing::info!("Configuration loaded successfully (hash: {})", hash),
        None => tracing::info!("No configuration file given, using defaults"),
    }

    let seeds_path = cli
        .seeds
        .clone()
        .or_else(|| config.seeds.path.as_ref().map(PathBuf::from));
    let Some(seeds_path) = seeds_path else {
        bail!("No seed list: pass --seeds or set [seeds] path in the configuration");
    };
    let seeds = load_seed_list(&seeds_path)
        .with_context(|| format!("Failed to load seeds from {}", seeds_path.display()))?;
    tracing::info!("Loaded {} seeds from {}", seeds.len(), seeds_path.display());

    if cli.dry_run {
        handle_dry_run(&config, &seeds);
        return Ok(());
    }

    handle_crawl(&config, &seeds).await
}

/// Loads the configuration file, if any, and applies command-line overrides
fn load_effective_config(cli: &Cli) -> anyhow::Result<(Config, Option<String>)> {
    let (mut config, hash) = match &cli.config {
        Some(path) => {
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            (config, Some(hash))
        }
        None => (Config::with_output_dir(DEFAULT_OUTPUT_DIR), None),
    };

    if let Some(output) = &cli.output {
        config.output.directory = output.display().to_string();
    }
    if cli.follow_pagination {
        config.crawler.follow_pagination = true;
    }
    if cli.max_pages.is_some() {
        config.crawler.max_pages = cli.max_pages;
    }

    validate(&config).context("Invalid configuration")?;
    Ok((config, hash))
}

/// Sets up the tracing subscriber for the run
///
/// Logs go to stderr and, when a log file is configured, are appended to
/// that file as well for the lifetime of the run.
fn setup_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warc_harvest=info,warn"),
            1 => EnvFilter::new("warc_harvest=debug,info"),
            2 => EnvFilter::new("warc_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory {}", parent.display())
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer)
        .init();

    Ok(())
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config, seeds: &[String]) {
    println!("=== Warc-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Follow pagination: {}", config.crawler.follow_pagination);
    println!(
        "  Custom next selector: {}",
        config.crawler.custom_next_selector.as_deref().unwrap_or("none")
    );
    match config.crawler.max_pages {
        Some(max) => println!("  Max pages per seed: {}", max),
        None => println!("  Max pages per seed: unbounded"),
    }
    println!(
        "  Max concurrent seeds: {}",
        config.crawler.max_concurrent_seeds
    );

    println!("\nFetch:");
    println!("  Max retries: {}", config.fetch.max_retries);
    println!("  Base retry delay: {}s", config.fetch.base_retry_delay);
    println!("  Retry jitter: {}s", config.fetch.retry_jitter);
    println!("  Fetch timeout: {}s", config.fetch.fetch_timeout);

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  File naming: {:?}", config.output.file_naming);
    if let Some(log_file) = &config.output.log_file {
        println!("  Log file: {}", log_file);
    }

    let mut hosts = HashSet::new();
    let mut invalid = 0;
    println!("\nSeeds ({}):", seeds.len());
    for seed in seeds {
        match parse_seed_url(seed) {
            Ok(url) => {
                hosts.extend(extract_domain(&url));
                println!("  - {}", seed);
            }
            Err(e) => {
                invalid += 1;
                println!("  - {} (skipped: {})", seed, e);
            }
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would write up to {} containers from {} hosts",
        seeds.len() - invalid,
        hosts.len()
    );
}

/// Handles the --inspect mode: prints the records of a container
fn handle_inspect(path: &Path) -> anyhow::Result<()> {
    let records = read_container(path)
        .with_context(|| format!("Failed to read container {}", path.display()))?;

    println!("=== {} ({} records) ===", path.display(), records.len());
    for (i, record) in records.iter().enumerate() {
        println!("\nRecord {}:", i + 1);
        for (name, value) in record.headers().iter() {
            println!("  {}: {}", name, value);
        }
        println!("  Block: {} bytes", record.block().len());
        if let Some(text) = record
            .record_type()
            .filter(|t| *t == RecordType::Metadata)
            .and_then(|_| std::str::from_utf8(record.block()).ok())
        {
            for line in text.lines() {
                println!("    {}", line);
            }
        }
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, seeds: &[String]) -> anyhow::Result<()> {
    tracing::warn!("TLS certificate validation is disabled for all fetches");

    let crawler = Crawler::new(config)
        .context("Failed to set up crawler")?
        .with_progress(Arc::new(TracingProgress));

    let token = crawler.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling remaining seeds");
            token.cancel();
        }
    });

    let summary = crawler
        .crawl(seeds, Path::new(&config.output.directory))
        .await;

    print_summary(&summary);
    Ok(())
}
