//! Flowline CLI — runs a declaratively configured pipeline.
//!
//! Takes the path to a YAML pipeline document, builds the graph, and drives
//! the full lifecycle. Exit code 0 on a clean run, non-zero on any
//! configuration or lifecycle failure. Logs go to stdout; the level is fixed
//! at startup via `RUST_LOG`.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use flowline::{modules, Pipeline};

#[derive(Parser)]
#[command(name = "flowline", about = "Run a declaratively configured dataflow pipeline")]
struct Cli {
    /// Path to the pipeline YAML document.
    config: PathBuf,

    /// Seconds to run before stopping. Runs until killed when omitted.
    #[arg(short, long)]
    duration: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,flowline=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    modules::register_builtins();

    let mut pipeline = Pipeline::from_yaml(&cli.config)
        .with_context(|| format!("loading pipeline from {}", cli.config.display()))?;

    pipeline.init().context("initializing pipeline")?;
    pipeline.start().context("starting pipeline")?;

    match cli.duration {
        Some(secs) => std::thread::sleep(Duration::from_secs(secs)),
        None => loop {
            std::thread::sleep(Duration::from_secs(1));
        },
    }

    pipeline.stop().context("stopping pipeline")?;
    pipeline.deinit().context("deinitializing pipeline")?;
    tracing::info!("clean shutdown");
    Ok(())
}
