//! Tracing setup: stderr always, plus a daily rolling file when a log
//! directory is configured.

use std::env;
use std::path::Path;

use fs_err as fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEBUG_ENV: &str = "CALLBOARD_DEBUG_LOG";
const LOG_FILE_PREFIX: &str = "callboard-server.log";

/// Installs the global subscriber. Keep the returned guard alive for the
/// process lifetime or buffered file output is lost.
pub fn init(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = if debug_enabled(env::var(DEBUG_ENV).ok().as_deref()) {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let mut dir_error = None;
    let mut guard = None;
    let file_layer = match log_dir.map(|dir| (dir, fs::create_dir_all(dir))) {
        Some((dir, Ok(()))) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, worker_guard) = tracing_appender::non_blocking(appender);
            guard = Some(worker_guard);
            Some(fmt::layer().with_ansi(false).with_writer(writer))
        }
        Some((_, Err(err))) => {
            dir_error = Some(err);
            None
        }
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    if let Some(err) = dir_error {
        tracing::warn!(error = %err, "Failed to create log directory; logging to stderr only");
    }
    guard
}

fn debug_enabled(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "TRUE" | "yes" | "YES"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_values() {
        assert!(debug_enabled(Some("1")));
        assert!(debug_enabled(Some("yes")));
        assert!(!debug_enabled(Some("0")));
        assert!(!debug_enabled(Some("")));
        assert!(!debug_enabled(None));
    }

    #[test]
    fn file_layer_only_when_log_dir_is_usable() {
        let dir = tempfile::TempDir::new().unwrap();
        let log_dir = dir.path().join("logs");
        assert!(init(Some(&log_dir)).is_some());
        assert!(log_dir.is_dir());

        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        assert!(init(Some(&blocker.join("logs"))).is_none());
        assert!(init(None).is_none());
    }
}
