use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use voiceops_directory::RedisDirectory;
use voiceops_events::LogFollower;
use voiceops_notify::{MattermostNotifier, Notifier, StdoutNotifier};

mod config;
mod pipeline;

use config::{Config, DEFAULT_CONFIG_PATH};
use pipeline::Pipeline;

/// Voiceops - Call-center queue log notifier for Mattermost
#[derive(Parser, Debug)]
#[command(name = "voiceops")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "VOICEOPS_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print alerts to stdout instead of posting them
    #[arg(long)]
    dry_run: bool,

    /// Log filter (overrides RUST_LOG), e.g. "debug" or "voiceops=debug"
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = match &args.log_level {
        Some(level) => tracing_subscriber::EnvFilter::try_new(level)
            .with_context(|| format!("Invalid log filter '{}'", level))?,
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Run the notifier
    let result = run(args).await;

    // Handle any errors
    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load(&args.config).context("Fatal error loading config file")?;

    let directory = RedisDirectory::new(
        &config.redis_host,
        &config.redis_password,
        &config.redis_path,
    )
    .context("Invalid Redis connection settings")?;

    if args.dry_run {
        info!("Dry run, alerts are printed to stdout");
        serve(&config, directory, StdoutNotifier).await
    } else {
        let notifier = MattermostNotifier::new(config.mattermost_api_url.clone());
        serve(&config, directory, notifier).await
    }
}

async fn serve<N: Notifier>(config: &Config, directory: RedisDirectory, notifier: N) -> Result<()> {
    let pipeline =
        Pipeline::new(config, directory, notifier).context("Failed to build event parser")?;

    let mut follower = LogFollower::start(&config.queue_log, config.poll_interval())
        .await
        .context("Failed to follow queue log")?;

    info!(
        queues = config.queues.len(),
        whitelist = config.phone_numbers_whitelist.len(),
        "Voiceops started"
    );

    pipeline.run(&mut follower).await;
    Ok(())
}
