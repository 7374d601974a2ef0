use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autopost::config::Config;
use autopost::limiter::RateLimitGate;
use autopost::publisher::{
    ApiTransport, DryRunTransport, InteractiveTransport, PublishRouter, StructuredTransport,
};
use autopost::runner::{execute_tick, TickContext, TickRunner};
use autopost::source::file::JsonStore;
use autopost::source::RosterSource;

#[derive(Parser)]
#[command(
    name = "autopost",
    version,
    about = "Scheduled social publishing engine with backlog selection and adaptive rate limiting",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); environment variables otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the periodic tick driver until interrupted
    Run,

    /// Execute exactly one tick at the current instant, then exit
    Once,

    /// Validate the configuration and the store files
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate()?;

    match cli.command {
        Commands::Run => {
            tracing::info!(interval_secs = config.scheduler.interval_secs, "starting tick driver");
            run(config).await?;
        }
        Commands::Once => {
            tracing::info!("executing a single tick");
            once(config).await;
        }
        Commands::Check => {
            check(config).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("autopost=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("autopost=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

fn build_context(config: &Config) -> Result<Arc<TickContext>> {
    let store = Arc::new(JsonStore::new(
        &config.store.accounts_path,
        &config.store.backlog_dir,
    ));

    let gate = Arc::new(RateLimitGate::with_state(
        config.limiter.initial_remaining,
        config.limiter.initial_reset_secs,
    )
    .with_throttle(config.throttle_sleep(), config.limiter.probe_floor));

    let structured: Arc<dyn StructuredTransport> = if config.publisher.dry_run {
        Arc::new(DryRunTransport)
    } else {
        Arc::new(ApiTransport::new(
            &config.publisher.endpoint,
            config.timeout(),
            gate,
        )?)
    };

    // The browser-driven long-form path is hosted elsewhere; in dry-run
    // mode the logging stand-in takes its place so routing is observable
    let interactive: Option<Arc<dyn InteractiveTransport>> = if config.publisher.dry_run {
        Some(Arc::new(DryRunTransport))
    } else {
        None
    };

    let router = Arc::new(PublishRouter::new(
        structured,
        interactive,
        config.publisher.char_threshold,
    ));

    Ok(Arc::new(TickContext {
        default_term_days: config.scheduler.default_term_days,
        max_jitter_secs: config.scheduler.max_jitter_secs,
        roster: store.clone(),
        backlog: store.clone(),
        sink: store,
        router,
    }))
}

async fn run(config: Config) -> Result<()> {
    let ctx = build_context(&config)?;
    let runner = Arc::new(TickRunner::new(config.interval(), ctx));

    let driver = runner.clone();
    let handle = tokio::spawn(async move { driver.run().await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupt received, stopping");
    runner.stop();

    handle.await??;
    Ok(())
}

async fn once(config: Config) {
    let ctx = match build_context(&config) {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::error!(error = %err, "failed to build tick context");
            return;
        }
    };

    let wall = chrono::Local::now().naive_local();
    let instant = chrono::Utc::now();
    execute_tick(ctx, wall, instant).await;
}

async fn check(config: Config) -> Result<()> {
    println!("Configuration valid");
    println!("  Interval: {}s", config.scheduler.interval_secs);
    println!("  Endpoint: {}", config.publisher.endpoint);
    println!("  Dry run: {}", config.publisher.dry_run);

    let store = JsonStore::new(&config.store.accounts_path, &config.store.backlog_dir);
    let accounts = store.accounts().await?;

    println!("  Roster: {} accounts", accounts.len());
    for account in &accounts {
        println!(
            "    {} active={} hours={:?} minutes={:?}",
            account.id, account.active, account.hours, account.minutes
        );
    }

    Ok(())
}
