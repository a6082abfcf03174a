//! callboard-server entrypoint.
//!
//! Serves the waiting-room display page and media, and relays changes to
//! the trigger file to polling clients. Startup ensures the trigger file
//! exists and starts the change watcher; if the watcher cannot be set up the
//! server keeps running in degraded (mtime) mode. Failing to bind the
//! listener is the only fatal error.

use std::path::PathBuf;
use std::sync::Arc;

use callboard_core::{CallboardError, ServerConfig, SharedStatus, TriggerStore, TriggerWatcher};
use clap::Parser;
use tracing::{error, info, warn};

mod api;
mod logging;

use api::AppState;

#[derive(Parser)]
#[command(name = "callboard-server")]
#[command(about = "Waiting-room call display server")]
#[command(version)]
struct Cli {
    /// Project root containing trigger.json, frontend/ and media/
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// TOML config file (default: <root>/callboard.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to bind
    #[arg(long)]
    port: Option<u16>,

    /// Trigger file path (relative paths resolve against the root)
    #[arg(long, value_name = "FILE")]
    trigger_file: Option<PathBuf>,
}

impl Cli {
    /// Loads the config file and applies command-line overrides. An
    /// unreadable or malformed file is returned alongside the defaults so
    /// it can be logged once logging is up.
    fn resolve_config(&self) -> (ServerConfig, Option<CallboardError>) {
        let lookup_root = self.root.clone().unwrap_or_else(|| PathBuf::from("."));
        let config_path = self
            .config
            .clone()
            .unwrap_or_else(|| ServerConfig::default_path(&lookup_root));
        let (mut config, load_error) = match ServerConfig::load(&config_path) {
            Ok(config) => (config, None),
            Err(err) => (ServerConfig::default(), Some(err)),
        };

        if let Some(root) = &self.root {
            config.root = root.clone();
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(trigger_file) = &self.trigger_file {
            config.trigger_file = trigger_file.clone();
        }
        (config, load_error)
    }
}

fn main() {
    let cli = Cli::parse();

    let (config, load_error) = cli.resolve_config();
    let _logging_guard = logging::init(config.log_path().as_deref());
    if let Some(err) = load_error {
        error!(error = %err, "Failed to load configuration; using defaults");
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "Failed to start async runtime");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(run(config)) {
        error!(error = %err, "callboard-server exited with error");
        std::process::exit(1);
    }
}

async fn run(config: ServerConfig) -> std::io::Result<()> {
    let store = TriggerStore::new(config.trigger_path());
    if let Err(err) = store.ensure_exists() {
        warn!(error = %err, "Failed to create trigger file");
    }

    let status = Arc::new(SharedStatus::new());
    let mut watcher = TriggerWatcher::new(store.path(), Arc::clone(&status));
    if let Err(err) = watcher.start() {
        warn!(error = %err, "Trigger watcher unavailable; serving in degraded mode");
    }

    let bind_addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(bind_addr.as_str()).await {
        Ok(listener) => listener,
        Err(err) => {
            watcher.stop();
            error!(error = %err, addr = %bind_addr, "Failed to bind HTTP listener");
            return Err(err);
        }
    };

    let state = AppState {
        store: Arc::new(store),
        status,
        test_trigger_name: Arc::from(config.test_trigger_name.as_str()),
    };
    let app = api::build_router(state, &config.frontend_path(), &config.media_path());

    match listener.local_addr() {
        Ok(addr) => info!(addr = %addr, "callboard-server listening"),
        Err(_) => info!(addr = %bind_addr, "callboard-server listening"),
    }
    info!(
        trigger_file = %config.trigger_path().display(),
        frontend = %config.frontend_path().display(),
        media = %config.media_path().display(),
        "Serving display"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    watcher.stop();
    info!("callboard-server stopped");
    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn malformed_config_keeps_cli_overrides() {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join("callboard.toml"), "port = \"eighty\"").unwrap();
        let root_arg = root.path().to_str().unwrap();
        let cli = Cli::parse_from(["callboard-server", "--root", root_arg, "--port", "5123"]);

        let (config, load_error) = cli.resolve_config();

        assert!(matches!(load_error, Some(CallboardError::ConfigMalformed { .. })));
        assert_eq!(config.port, 5123);
        assert_eq!(config.root, root.path());
        assert_eq!(config.host, ServerConfig::default().host);
    }

    #[test]
    fn missing_config_is_not_an_error() {
        let root = TempDir::new().unwrap();
        let root_arg = root.path().to_str().unwrap();
        let cli = Cli::parse_from(["callboard-server", "--root", root_arg]);

        let (config, load_error) = cli.resolve_config();

        assert!(load_error.is_none());
        assert_eq!(config.port, ServerConfig::default().port);
    }
}
