//! Answers identity and group membership queries against a JSON fixture
//! of the revu identity store.

mod check;
mod config;
mod error;

use crate::check::Query;
use crate::config::CheckConfig;
use crate::error::CheckError;
use clap::Parser;
use revu_access::CapabilityPolicy;
use revu_core::Result;
use revu_directory::IdentityService;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "revu-identity-check")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON store snapshot; overrides the configured fixture
    #[arg(short, long)]
    fixture: Option<PathBuf>,

    /// Print cache statistics to stderr when done
    #[arg(long)]
    stats: bool,

    #[command(subcommand)]
    query: Query,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,revu=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    match execute(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "identity check failed");
            ExitCode::FAILURE
        }
    }
}

async fn execute(args: Args) -> Result<(), CheckError> {
    let config = CheckConfig::load(args.config.as_deref()).map_err(|e| CheckError::Config {
        details: e.to_string(),
    })?;
    tracing::info!("Loaded configuration");

    let fixture = args
        .fixture
        .or(config.fixture)
        .ok_or(CheckError::NoFixture)?;
    let store = check::load_fixture(&fixture)?;

    let policy = CapabilityPolicy::from_config(&config.capabilities);
    let service = IdentityService::new(Arc::new(store), &config.caches, policy);

    let answer = check::run(&service, &args.query).await?;
    let rendered = serde_json::to_string_pretty(&answer).map_err(|e| CheckError::Query {
        details: e.to_string(),
    })?;
    println!("{rendered}");

    if args.stats {
        for stats in service.stats() {
            eprintln!(
                "{}: {} entries, {} hits, {} misses, {} loads, {} evictions",
                stats.name, stats.entries, stats.hits, stats.misses, stats.loads, stats.evictions
            );
        }
    }
    Ok(())
}
