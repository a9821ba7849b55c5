//! Tracing subscriber setup.
//!
//! Events are filtered by `SHK_LOG` (an `EnvFilter` directive), defaulting to
//! `sahaayak=warn`. One-shot commands and plain watch mode log JSON lines to
//! stderr. The TUI owns the terminal, so it logs to a daily rolling file.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{Error, Result};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "SHK_LOG";

const DEFAULT_DIRECTIVE: &str = "sahaayak=warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Log to stderr.
///
/// `verbose` raises the default level to `debug` when `SHK_LOG` is unset.
pub fn init_logging(verbose: bool) {
    let filter = if verbose && std::env::var_os(LOG_ENV).is_none() {
        EnvFilter::new("sahaayak=debug")
    } else {
        env_filter()
    };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(filter)
        .try_init();
}

/// Directory for log files (`~/.local/share/sahaayak/logs`).
pub fn log_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("sahaayak").join("logs"))
}

/// Log to a daily rolling file under [`log_dir`].
///
/// The returned guard flushes buffered events when dropped; keep it alive for
/// the life of the program.
pub fn init_file_logging() -> Result<WorkerGuard> {
    let dir = log_dir()?;
    std::fs::create_dir_all(&dir)?;

    let appender = tracing_appender::rolling::daily(&dir, "shk.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(env_filter())
        .try_init();

    Ok(guard)
}
