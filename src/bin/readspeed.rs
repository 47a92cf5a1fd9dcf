//! `readspeed` command-line entrypoint.
//! Parses arguments, runs one throughput measurement over Parquet files and
//! prints the report. Log verbosity follows `RUST_LOG` (default `warn`).

use anyhow::Context;
use clap::Parser;
use readspeed::{cli::Args, storage::parquet::ParquetStorage, ThroughputEngine};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let options = args.options();
    let engine = ThroughputEngine::new(ParquetStorage::from(&options), options);
    let report = engine
        .run(&args.dataset(), args.workers)
        .context("throughput run failed")?;
    println!("{report}");

    Ok(())
}
