//! Tracing configuration and log routing.
//!
//! Logs go to stdout through a compact formatter and, when a log file can be
//! opened, to that file through a non-blocking writer. The file path comes
//! from configuration; without one, logs land under `logs/intelliarchive.log`.

use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// Keeps the non-blocking writer flushing for the process lifetime.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const DEFAULT_LOG_PATH: &str = "logs/intelliarchive.log";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` controls filtering and defaults to `info`. `log_file` overrides
/// the default log path; the file layer is skipped entirely when the target
/// cannot be opened, leaving stdout logging intact.
pub fn init_tracing(log_file: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    match open_log_writer(log_file.unwrap_or(DEFAULT_LOG_PATH)) {
        Some(writer) => {
            let file_layer = fmt::layer().with_writer(writer).with_ansi(false).compact();
            registry.with(file_layer).init();
        }
        None => registry.init(),
    }
}

/// Open the log file for appending behind a non-blocking writer, creating
/// missing parent directories along the way.
fn open_log_writer(path: &str) -> Option<NonBlocking> {
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
        && let Err(err) = std::fs::create_dir_all(parent)
    {
        eprintln!("Failed to create log directory {}: {err}", parent.display());
        return None;
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
    {
        Ok(file) => file,
        Err(err) => {
            eprintln!("Failed to open log file {path}: {err}");
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let _ = LOG_GUARD.set(guard);
    Some(non_blocking)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_writer_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("archive.log");
        let writer = open_log_writer(path.to_str().expect("utf8 path"));
        assert!(writer.is_some());
        assert!(path.exists());
    }
}
