//! Tracing subscriber initialisation.
//!
//! Only the CLI crate is allowed to call [`init_logging`]; `hatch-core` and
//! `hatch-adapters` only *emit* spans and events.
//!
//! # Verbosity mapping
//!
//! | Flag(s)            | Filter level |
//! |--------------------|--------------|
//! | (none)             | WARN         |
//! | `-v`               | INFO         |
//! | `-vv` / `--debug`  | DEBUG        |
//! | `-vvv`             | TRACE        |
//! | `--quiet`          | ERROR        |
//!
//! `RUST_LOG` overrides all of the above if set.

use std::io::IsTerminal as _;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::GlobalArgs;

/// Log file name inside the log directory.
pub const LOG_FILE: &str = "hatch.log";

/// Initialise the global tracing subscriber.
///
/// With `log_dir`, events are also appended to `<log_dir>/hatch.log`; keep
/// the returned guard alive until exit so buffered lines are flushed.
pub fn init_logging(args: &GlobalArgs, log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let level = derive_level(args);
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "hatch={level},hatch_core={level},hatch_adapters={level}"
            ))
        })
    };

    let use_ansi = !args.no_color && std::io::stderr().is_terminal();
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(use_ansi)
        .with_writer(std::io::stderr)
        .with_filter(filter());

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialise tracing: {e}"))?;

    Ok(guard)
}

/// Translate the verbosity counter and quiet/debug flags to a level string.
fn derive_level(args: &GlobalArgs) -> &'static str {
    if args.quiet {
        return "error";
    }
    match (args.verbose, args.debug) {
        (0, false) => "warn",
        (1, false) => "info",
        (0..=2, _) => "debug",
        _ => "trace",
    }
}
