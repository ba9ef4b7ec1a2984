//! # daynight
//!
//! Runs the day/night clock against a live backend and prints every
//! double-hour change.
//!
//! ## Usage
//!
//! ```bash
//! # Follow the clock on a local backend
//! daynight --api http://localhost:8080
//!
//! # Start in debug (+12h) mode and stop after three changes
//! daynight --api http://localhost:8080 --debug --ticks 3
//!
//! # Read settings from a file
//! daynight --config client.toml
//! ```

use anyhow::Context;
use clap::Parser;
use joseon_daynight::telemetry::init_tracing;
use joseon_daynight::{AppStateBus, ClientConfig, DayNightProvider};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "daynight")]
#[command(about = "Follow the server-synchronized Joseon day/night clock")]
#[command(version)]
struct Args {
    /// Backend base URL (overrides config and environment)
    #[arg(short, long)]
    api: Option<String>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Turn on the debug offset at start
    #[arg(long)]
    debug: bool,

    /// Exit after this many double-hour changes
    #[arg(long)]
    ticks: Option<u32>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(if args.verbose {
        "debug,hyper=info,reqwest=info"
    } else {
        "info"
    });

    let mut config = match &args.config {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ClientConfig::from_env().context("reading environment")?,
    };
    if let Some(api) = args.api {
        config.api_base_url = api;
    }

    let bus = AppStateBus::new();
    let provider = DayNightProvider::from_config(&config, &bus)
        .await
        .context("starting day/night clock")?;
    let clock = provider.handle();

    if args.debug {
        let phase = clock.toggle_debug_time();
        info!(%phase, "Debug offset enabled");
    }

    let mut changes = clock.subscribe();
    println!("{}", *changes.borrow_and_update());

    let mut seen = 0u32;
    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", *changes.borrow_and_update());
                seen += 1;
                if args.ticks.is_some_and(|limit| seen >= limit) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    provider.shutdown().await;
    Ok(())
}
