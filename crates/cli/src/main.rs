mod cli;
mod config;
mod submissions;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing::info;

use taskq_core::{load_dotenv, QueueConfig};
use taskq_queue::{HttpAdapter, QueueOptions, Scheduler};

use crate::cli::CliArgs;
use crate::submissions::Entry;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    load_dotenv();
    let args = CliArgs::parse();

    let config = config::resolve(
        args.config.as_deref(),
        &args.profile,
        args.max,
        args.interval_ms,
    )?;

    let mut entries = Vec::new();
    if let Some(ref path) = args.file {
        entries.extend(submissions::from_file(path)?);
    }
    entries.extend(submissions::from_items(&args.items, args.priority));

    let results = execute(config, entries, args.progress).await?;

    let output = serde_json::to_string_pretty(&Value::Array(results))
        .context("failed to serialize results")?;
    println!("{output}");
    Ok(())
}

/// Admit every entry, run to completion and return the aggregate results.
async fn execute(config: QueueConfig, entries: Vec<Entry>, progress: bool) -> Result<Vec<Value>> {
    let adapter = HttpAdapter::new();
    let scheduler: Scheduler<Value> = Scheduler::new(config);

    if progress {
        scheduler.options(QueueOptions::new().callback(|batch: &[Value], _: &Scheduler<Value>| {
            match serde_json::to_string(batch) {
                Ok(line) => eprintln!("{line}"),
                Err(e) => tracing::warn!(error = %e, "failed to render batch"),
            }
        }));
    }

    for entry in entries {
        scheduler.add_with_priority(adapter.submission(entry.submission), entry.priority);
    }

    let pending = scheduler.snapshot().pending.len();
    info!(pending, max = scheduler.config().max, "running queue");

    scheduler.run();
    let results = scheduler.result().await.context("queue run failed")?;
    Ok(results)
}
