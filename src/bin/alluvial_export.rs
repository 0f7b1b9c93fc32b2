//! Alluvial Export Binary
//!
//! Runs one batch export: parse every snapshot, assign dynamic community
//! ids and write the export tables plus a run manifest.
//!
//! ## Configuration
//!
//! Either a JSON config file as the only argument, or environment variables:
//! - `ALLUVIAL_DATA_DIR`: Dataset root (default: data)
//! - `ALLUVIAL_TIMESTAMPS`: `1998..=2003` or `a,b,c` (required)
//! - `ALLUVIAL_STRATEGY`: `chronological` or `history_file` (default: chronological)
//! - `ALLUVIAL_JACCARD_THRESHOLD`: Chronological threshold (default: 0.4)
//! - `ALLUVIAL_HISTORY_THRESHOLD`: History-file threshold (default: 0.25)
//! - `ALLUVIAL_HISTORY_SELECTION`: `last` or `best` (default: last)
//! - `ALLUVIAL_FIRST_DYNAMIC_ID`: First minted id (default: 1)
//! - `ALLUVIAL_LAYOUT`: `gen-layout` file selector (default: 3-3)
//! - `ALLUVIAL_DEDUPE_EDGES`: `true` to collapse reverse edges (default: false)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! ALLUVIAL_TIMESTAMPS=1998..=2003 cargo run --bin alluvial_export
//! cargo run --bin alluvial_export -- run.json
//! ```

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use alluvial_kernel::{pipeline, PipelineConfig, PipelineError};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "alluvial_export=info,alluvial_kernel=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true),
            )
            .init();
    }
}

fn load_config() -> Result<PipelineConfig, PipelineError> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!(path = %path, "Loading config file");
            PipelineConfig::from_json_file(path)?
        }
        None => PipelineConfig::from_env()?,
    };
    Ok(config)
}

fn main() -> ExitCode {
    init_tracing();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting alluvial export"
    );

    let result = load_config().and_then(|config| pipeline::run(&config));
    match result {
        Ok(manifest) => {
            info!(
                strategy = %manifest.strategy,
                timestamps = manifest.timestamps.len(),
                nodes = manifest.rows.nodes,
                alluvial_nodes = manifest.rows.alluvial_nodes,
                fingerprint = %manifest.assignment_fingerprint,
                "Export complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Export failed");
            ExitCode::FAILURE
        }
    }
}
