//! Site-Pipeline main entry point
//!
//! This is the command-line interface for running a single crawl job.

use anyhow::Context;
use clap::Parser;
use site_pipeline::config::{load_config_with_hash, Config};
use site_pipeline::crawler::{is_js_rendering_available, run_job};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Site-Pipeline: a polite single-site crawler
///
/// Crawls one website breadth-first while respecting robots.txt and a fixed
/// request rate, and extracts page text, links and images into records.
#[derive(Parser, Debug)]
#[command(name = "site-pipeline")]
#[command(version = "1.0.0")]
#[command(about = "A polite single-site crawler and extractor", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the effective settings without crawling
    #[arg(long)]
    dry_run: bool,

    /// Write the JSON job report to this file instead of stdout
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!(path = %cli.config.display(), "Loading configuration");
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!(hash = %config_hash, "Configuration loaded");

    if cli.dry_run {
        print_dry_run(&config);
        return Ok(());
    }

    let output = run_job(config).await.context("crawl job failed")?;
    let json = serde_json::to_string_pretty(&output.report)?;

    match cli.report {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            tracing::info!(path = %path.display(), "Report written");
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_pipeline=info,warn"),
            1 => EnvFilter::new("site_pipeline=debug,info"),
            2 => EnvFilter::new("site_pipeline=trace,debug"),
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

/// Prints the validated configuration with derived values filled in
fn print_dry_run(config: &Config) {
    println!("=== Site-Pipeline Dry Run ===\n");

    println!("Crawl:");
    println!("  Start URL: {}", config.crawl.start_url);
    println!("  Max depth: {}", config.crawl.max_depth);
    println!("  Page limit: {}", config.crawl.page_limit);
    println!("  Respect robots.txt: {}", config.crawl.respect_robots);

    let allowed = config.allowed_domains();
    println!("\nAllowed Domains ({}):", allowed.len());
    for domain in &allowed {
        println!("  - {}", domain);
    }

    println!("\nFetch:");
    println!("  Rate limit: {}s", config.fetch.rate_limit);
    println!("  Request timeout: {}s", config.fetch.request_timeout);
    println!("  Max retries: {}", config.fetch.max_retries);
    println!(
        "  Dynamic fallback: {} (renderer {})",
        config.fetch.dynamic_fallback,
        if is_js_rendering_available() {
            "available"
        } else {
            "not compiled in"
        }
    );
    println!("  User agents: {}", config.fetch.user_agents.len());
    println!("  Robots identity: {}", config.fetch.bot_user_agent);

    println!("\nOutput:");
    println!("  Directory: {}", config.output.output_dir);
    println!("  Format: {}", config.output.output_format);
    println!("  Save raw HTML: {}", config.output.save_raw_html);
    println!("  Download images: {}", config.output.download_images);
    println!("  Min image size: {}px", config.output.min_image_size);

    println!("\n✓ Configuration is valid");
}
