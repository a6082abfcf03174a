use std::path::PathBuf;

use callboard_core::{now_secs, CallboardError, ServerConfig, TriggerStore};
use callboard_protocol::{CallRecord, StatusResponse};
use serde_json::Value;

/// Which trigger file to operate on.
pub struct Target {
    pub root: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub trigger_file: Option<PathBuf>,
}

impl Target {
    fn store(&self) -> Result<TriggerStore, CallboardError> {
        let lookup_root = self.root.clone().unwrap_or_else(|| PathBuf::from("."));
        let config_path = self
            .config
            .clone()
            .unwrap_or_else(|| ServerConfig::default_path(&lookup_root));
        let mut config = ServerConfig::load(&config_path)?;
        if let Some(root) = &self.root {
            config.root = root.clone();
        }
        if let Some(trigger_file) = &self.trigger_file {
            config.trigger_file = trigger_file.clone();
        }
        Ok(TriggerStore::new(config.trigger_path()))
    }
}

pub fn call(target: &Target, name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("name must not be empty".to_string());
    }

    let store = target.store()?;
    let record = CallRecord::new(name, now_secs());
    store.write(&record)?;
    tracing::info!(path = %store.path().display(), name = %record.name, "Call written");

    serde_json::to_string(&record).map_err(|e| format!("Failed to serialize record: {}", e))
}

pub fn clear(target: &Target) -> Result<String, String> {
    let store = target.store()?;
    store.clear()?;
    serde_json::to_string(&StatusResponse::cleared())
        .map_err(|e| format!("Failed to serialize status: {}", e))
}

pub fn show(target: &Target) -> Result<String, String> {
    let store = target.store()?;
    let record = store.read()?.unwrap_or(Value::Null);
    serde_json::to_string_pretty(&record).map_err(|e| format!("Failed to serialize record: {}", e))
}
