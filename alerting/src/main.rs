//! Stream monitor binary.
//!
//! Reads stdin as a single terminal stream, runs it through the alerting
//! pipeline, and prints created alerts to stdout (JSON lines with `--json`,
//! human-readable lines otherwise). Diagnostics go to stderr; tune with
//! `RUST_LOG`.
//!
//! ```bash
//! npm install 2>&1 | alerting --json
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use alerting::{
    AlertPipeline, AlertStore, AlertStoreConfig, AlertStoreEvent, DedupConfig, PipelineConfig,
    StreamMonitor,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Maximum concurrently active alerts
    #[arg(long, default_value_t = 20)]
    capacity: usize,

    /// Maximum history length
    #[arg(long, default_value_t = 50)]
    history: usize,

    /// Trailing-edge debounce before a quiesced buffer is classified (ms)
    #[arg(long, default_value_t = 300)]
    debounce_ms: u64,

    /// Coarse dedup suppression window (ms)
    #[arg(long, default_value_t = 1000)]
    coarse_window_ms: u64,

    /// Per-module dedup suppression window (ms)
    #[arg(long, default_value_t = 5000)]
    module_window_ms: u64,

    /// Print alerts as JSON lines instead of human-readable lines
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("alerting=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let store = AlertStore::new(AlertStoreConfig {
        capacity: args.capacity,
        history_limit: args.history,
    })
    .shared();

    let pipeline = Arc::new(AlertPipeline::new(
        store.clone(),
        PipelineConfig {
            dedup: DedupConfig {
                coarse_window: Duration::from_millis(args.coarse_window_ms),
                module_window: Duration::from_millis(args.module_window_ms),
            },
        },
    ));

    let mut events = store.subscribe();
    let json = args.json;
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            let AlertStoreEvent::AlertCreated { alert } = event else {
                continue;
            };
            if json {
                match serde_json::to_string(&alert) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::error!(error = %e, "failed to serialize alert"),
                }
            } else {
                println!("[{}] {}: {}", alert.severity, alert.title, alert.description);
            }
        }
    });

    let mut monitor = StreamMonitor::terminal(pipeline, Duration::from_millis(args.debounce_ms));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        monitor.push_chunk(&line);
        monitor.push_chunk("\n");
    }
    monitor.finish(0);

    // Let the printer drain events published by the final flush.
    tokio::time::sleep(Duration::from_millis(50)).await;
    printer.abort();

    Ok(())
}
