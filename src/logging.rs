//! Tracing configuration and log routing.
//!
//! Logs go to stdout through a compact formatter and to a file. `TREND_LENS_LOG_FILE` selects the
//! file explicitly; otherwise entries are appended to `logs/trend-lens.log`. Missing parent
//! directories are created either way. The file layer uses a non‑blocking writer, so binaries
//! call [`shutdown_tracing`] before exiting to flush buffered lines.
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_ENV: &str = "TREND_LENS_LOG_FILE";
const DEFAULT_LOG_PATH: &str = "logs/trend-lens.log";

static LOG_GUARD: Mutex<Option<WorkerGuard>> = Mutex::new(None);

/// Configure tracing subscribers for stdout and file logging.
///
/// - Respects `RUST_LOG` for filtering (defaults to `info`).
/// - Installs a compact stdout layer and, when the target is writable, a file layer.
/// - Keeps the non‑blocking writer guard until [`shutdown_tracing`] is called.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    let path = resolve_log_path(std::env::var(LOG_FILE_ENV).ok());
    match open_log_file(&path) {
        Ok(file) => {
            let file_layer = fmt::layer()
                .with_writer(install_writer(file))
                .with_target(true)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).init();
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            registry.init();
        }
    }
}

/// Flush and detach the file writer. Later log lines only reach stdout.
pub fn shutdown_tracing() {
    let guard = LOG_GUARD
        .lock()
        .map(|mut slot| slot.take())
        .unwrap_or_default();
    drop(guard);
}

fn install_writer(file: File) -> NonBlocking {
    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    if let Ok(mut slot) = LOG_GUARD.lock() {
        *slot = Some(guard);
    }
    non_blocking
}

/// Log file location: the explicit override when non-blank, else the default path.
fn resolve_log_path(override_path: Option<String>) -> PathBuf {
    override_path
        .filter(|value| !value.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_LOG_PATH), PathBuf::from)
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn blank_override_uses_default_path() {
        assert_eq!(resolve_log_path(None), PathBuf::from(DEFAULT_LOG_PATH));
        assert_eq!(
            resolve_log_path(Some("  ".into())),
            PathBuf::from(DEFAULT_LOG_PATH)
        );
        assert_eq!(
            resolve_log_path(Some("/var/log/trend.log".into())),
            PathBuf::from("/var/log/trend.log")
        );
    }

    #[test]
    fn missing_parent_directories_are_created_and_file_appends() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("nested").join("run").join("trend.log");

        writeln!(open_log_file(&path).expect("open"), "first").expect("write");
        writeln!(open_log_file(&path).expect("reopen"), "second").expect("write");

        let contents = std::fs::read_to_string(&path).expect("read");
        assert_eq!(contents, "first\nsecond\n");
    }

    #[test]
    fn shutdown_flushes_buffered_lines() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("flush.log");
        let mut writer = install_writer(open_log_file(&path).expect("open"));

        writer.write_all(b"Analysis failed\n").expect("write");
        shutdown_tracing();

        let contents = std::fs::read_to_string(&path).expect("read");
        assert_eq!(contents, "Analysis failed\n");
    }
}
