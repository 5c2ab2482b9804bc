#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! CLI for the leak demonstration

use std::process;

use anyhow::{Context, Result};
use checkmem::{FanoutReporter, JsonlReporter, Meter, StdoutReporter, TracingAllocator};
use checkmem_demo::{Cli, DemoConfig, leak};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static ALLOCATOR: TracingAllocator = TracingAllocator::system();

fn main() {
    init_tracing();

    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = Cli::parse()
        .into_config()
        .context("invalid arguments")?;
    debug!(?config, "starting demo");

    let meter = build_meter(&config);
    let (leak_bytes, chunk_bytes) = (config.leak_bytes(), config.chunk_bytes());

    let retained = meter.run("create_memory_leak", || {
        leak::create_memory_leak(leak_bytes, chunk_bytes)
    });

    info!(
        retained,
        total_bytes = leak::retained_bytes(),
        blocks = leak::retained_blocks(),
        "demo finished"
    );
    Ok(())
}

/// Stdout in the requested format, plus the JSON-lines file when given.
fn build_meter(config: &DemoConfig) -> Meter {
    let measure = *config.measure();
    let stdout = StdoutReporter::new(measure.format());

    match config.output_path() {
        Some(path) => {
            let jsonl = JsonlReporter::new(path.clone());
            info!(path = %jsonl.output_path().display(), "appending reports");
            Meter::new(measure).with_reporter(FanoutReporter::new().with(stdout).with(jsonl))
        }
        None => Meter::new(measure).with_reporter(stdout),
    }
}

/// Initialize tracing subscriber with environment filter; logs go to stderr.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
