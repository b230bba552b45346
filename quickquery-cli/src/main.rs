//! QuickQuery CLI
//!
//! Country lookups through the memory → durable → network cache.

mod config;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quickquery_cache::RecencyCache;
use quickquery_core::clock::{Clock, SystemClock};
use quickquery_core::types::{CacheEntry, Origin, Resolved};
use quickquery_fetch::HttpFetcher;
use quickquery_resolver::{CacheResolver, ExpirySweeper, SweepReport};
use quickquery_store::SqliteStore;

use crate::config::AppConfig;

/// QuickQuery - cached country lookups
#[derive(Parser)]
#[command(name = "quickquery")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Durable store file (overrides QUICKQUERY_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// API root (overrides QUICKQUERY_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up one or more countries by name
    Lookup {
        /// Country names
        #[arg(required = true)]
        names: Vec<String>,
        /// Resolve each name this many times
        #[arg(short, long, default_value = "1")]
        repeat: usize,
        /// Print payloads as stored instead of pretty-printed
        #[arg(long)]
        raw: bool,
    },

    /// List cached entries
    Entries(EntriesArgs),

    /// Remove expired entries now
    Sweep,

    /// Read names from stdin with the background sweeper running
    Session,
}

#[derive(Args)]
struct EntriesArgs {
    /// Only the memory tier
    #[arg(long, conflicts_with = "durable")]
    memory: bool,
    /// Only the durable tier
    #[arg(long)]
    durable: bool,
}

/// The wired-up tiers.
struct App {
    resolver: CacheResolver,
    sweeper: Arc<ExpirySweeper>,
    clock: Arc<dyn Clock>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "quickquery=debug,info"
    } else {
        "quickquery=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = AppConfig::from_env().context("Failed to read configuration")?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    config.validate().context("Invalid configuration")?;

    let app = build_app(&config).await?;

    match cli.command {
        Commands::Lookup { names, repeat, raw } => cmd_lookup(&app, &names, repeat, raw).await,
        Commands::Entries(args) => cmd_entries(&app, args).await,
        Commands::Sweep => cmd_sweep(&app).await,
        Commands::Session => cmd_session(&app).await,
    }
}

async fn build_app(config: &AppConfig) -> Result<App> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let memory = Arc::new(RecencyCache::with_config(config.cache(), clock.clone()));
    let store = Arc::new(
        SqliteStore::open(&config.db_path, config.store(), clock.clone())
            .await
            .with_context(|| format!("Failed to open {}", config.db_path.display()))?,
    );
    let fetcher =
        Arc::new(HttpFetcher::with_config(config.fetch()).context("Failed to build HTTP client")?);

    let resolver = CacheResolver::with_config(
        config.resolver(),
        memory.clone(),
        store.clone(),
        fetcher,
        clock.clone(),
    );
    let sweeper = Arc::new(ExpirySweeper::new(
        memory,
        store,
        clock.clone(),
        config.sweeper(),
    ));

    Ok(App {
        resolver,
        sweeper,
        clock,
    })
}

/// Resolve names, one spinner per network fetch
async fn cmd_lookup(app: &App, names: &[String], repeat: usize, raw: bool) -> Result<()> {
    let mut failures = 0usize;
    let total = names.len() * repeat.max(1);

    for _ in 0..repeat.max(1) {
        for name in names {
            if !lookup_one(app, name, raw).await {
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} lookups failed", failures, total);
    }
    Ok(())
}

/// Returns false if the lookup failed.
async fn lookup_one(app: &App, name: &str, raw: bool) -> bool {
    let spinner = ProgressBar::hidden();
    let on_fetch = {
        let spinner = spinner.clone();
        let name = name.to_string();
        move || {
            spinner.set_draw_target(indicatif::ProgressDrawTarget::stderr());
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
                spinner.set_style(style);
            }
            spinner.set_message(format!("Fetching {} from the network...", name));
            spinner.enable_steady_tick(Duration::from_millis(80));
        }
    };

    let outcome = app.resolver.resolve_with(name, on_fetch).await;
    spinner.finish_and_clear();

    match outcome {
        Ok(resolved) => {
            print_resolved(&resolved, raw);
            true
        }
        Err(e) => {
            println!("{} {} {}", "✗".red().bold(), name.bold(), e.user_message().red());
            tracing::debug!(error = %e, "Lookup failed");
            false
        }
    }
}

fn print_resolved(resolved: &Resolved, raw: bool) {
    println!(
        "{} {} {}",
        "✓".green().bold(),
        resolved.key.bold(),
        origin_label(resolved.origin)
    );

    if raw {
        println!("{}", resolved.payload);
    } else {
        println!("{}", pretty_payload(&resolved.payload));
    }
}

fn origin_label(origin: Origin) -> ColoredString {
    let label = format!("[{}]", origin);
    match origin {
        Origin::Memory => label.green(),
        Origin::Durable => label.yellow(),
        Origin::Network => label.cyan(),
    }
}

fn pretty_payload(payload: &str) -> String {
    serde_json::from_str::<serde_json::Value>(payload)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| payload.to_string())
}

/// List tier contents
async fn cmd_entries(app: &App, args: EntriesArgs) -> Result<()> {
    let both = !args.memory && !args.durable;

    if args.memory || both {
        print_memory_entries(app);
    }
    if args.durable || both {
        print_durable_entries(app).await?;
    }
    Ok(())
}

fn print_memory_entries(app: &App) {
    let entries = app.resolver.list_memory_entries();
    let stats = app.resolver.memory().stats();
    println!(
        "{} {}/{}",
        "Memory tier:".cyan().bold(),
        stats.entries,
        stats.capacity
    );
    print_entries(&entries, app.clock.now_ms());
}

async fn print_durable_entries(app: &App) -> Result<()> {
    let entries = app
        .resolver
        .list_durable_entries()
        .await
        .context("Failed to read durable tier")?;
    println!("{} {}", "Durable tier:".cyan().bold(), entries.len());
    print_entries(&entries, app.clock.now_ms());
    Ok(())
}

fn print_entries(entries: &[CacheEntry], now_ms: i64) {
    if entries.is_empty() {
        println!("   {}", "(empty)".dimmed());
        return;
    }
    for entry in entries {
        println!(
            "   {} {} {} {}",
            entry.key.bold(),
            format_timestamp(entry.stored_at).dimmed(),
            format!("({} ago)", format_age(entry.age_ms(now_ms))).dimmed(),
            format!("{} bytes", entry.payload.len()).dimmed()
        );
    }
}

/// Local time, `%Y-%m-%d %H:%M:%S`.
fn format_timestamp(epoch_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(epoch_ms)
        .map(|dt| {
            dt.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| epoch_ms.to_string())
}

fn format_age(age_ms: i64) -> String {
    let secs = age_ms.max(0) / 1000;
    match secs {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m {}s", s / 60, s % 60),
        s => format!("{}h {}m", s / 3600, (s % 3600) / 60),
    }
}

/// Run one sweep
async fn cmd_sweep(app: &App) -> Result<()> {
    let report = app.sweeper.sweep().await.context("Sweep failed")?;
    print_sweep_report(&report);
    Ok(())
}

fn print_sweep_report(report: &SweepReport) {
    if report.skipped {
        println!("{}", "Sweep already running, skipped.".yellow());
        return;
    }
    println!(
        "{} {} from memory, {} from durable (cutoff {})",
        "✓ Swept".green().bold(),
        report.memory_removed,
        report.durable_removed,
        format_timestamp(report.cutoff_ms)
    );
}

/// Interactive session over stdin
async fn cmd_session(app: &App) -> Result<()> {
    let sweeps = app.sweeper.clone().spawn();

    println!("{}", "QuickQuery session".cyan().bold());
    println!(
        "   {}",
        "Type a country name, or :memory :durable :stats :sweep :clear :quit".dimmed()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", ">".cyan());
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match line.trim() {
            "" => continue,
            ":quit" | ":q" => break,
            ":memory" => print_memory_entries(app),
            ":durable" => print_durable_entries(app).await?,
            ":stats" => {
                let stats = app.resolver.memory().stats();
                println!(
                    "   entries {}/{}  hits {}  misses {}  evictions {}",
                    stats.entries, stats.capacity, stats.hits, stats.misses, stats.evictions
                );
                if let Some(at) = app.sweeper.last_sweep_at() {
                    println!("   last sweep {}", format_timestamp(at));
                }
            }
            ":sweep" => match app.sweeper.sweep().await {
                Ok(report) => print_sweep_report(&report),
                Err(e) => println!("{} {}", "✗ Sweep failed:".red(), e),
            },
            ":clear" => {
                app.resolver.clear_memory();
                println!("{}", "Memory tier cleared.".green());
            }
            cmd if cmd.starts_with(':') => {
                println!("{} {}", "Unknown command:".yellow(), cmd);
            }
            name => {
                lookup_one(app, name, false).await;
            }
        }
    }

    if let Some(handle) = sweeps {
        handle.abort();
    }
    println!("{}", "Bye.".dimmed());
    Ok(())
}
