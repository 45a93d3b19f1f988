use std::{
    io::Read,
    path::PathBuf,
    process::ExitCode,
};

use anyhow::Context;
use clap::Parser;
use itinerary_sorter::{config::Config, SortError};
use tracing::{error, info};

/// Sort itineraries by price, duration or a blend of both.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SQLite file caching sorted requests (falls back to ITINERARY_DB_PATH)
    #[arg(short, long)]
    db: Option<PathBuf>,

    /// ECB exchange rate XML (falls back to ITINERARY_RATES_PATH, then the embedded table)
    #[arg(short, long)]
    rates: Option<PathBuf>,

    /// Sort without reading or writing the cache
    #[arg(long)]
    no_cache: bool,

    /// Request body; stdin when omitted
    input: Option<PathBuf>,
}

fn read_body(input: Option<&PathBuf>) -> anyhow::Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading request from {}", path.display())),
        None => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .context("reading request from stdin")?;
            Ok(body)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = Config::from_env();
    if args.db.is_some() {
        config.database = args.db.clone();
    }
    if args.rates.is_some() {
        config.rates = args.rates.clone();
    }
    if args.no_cache {
        config.database = None;
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.log_filter)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run(&args, &config).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            match e.downcast_ref::<SortError>() {
                Some(SortError::MalformedRequest(_)) => {
                    eprintln!("{e}");
                    ExitCode::from(2)
                }
                _ => ExitCode::FAILURE,
            }
        }
    }
}

async fn run(args: &Args, config: &Config) -> anyhow::Result<String> {
    let resolver = config.build_resolver()?;
    let body = read_body(args.input.as_ref())?;

    let output = resolver.handle_str(&body).await?;

    let stats = resolver.stats().snapshot();
    info!(
        sorts_performed = stats.sorts_performed,
        cache_hits = stats.cache_hits,
        "request handled"
    );

    Ok(output)
}
