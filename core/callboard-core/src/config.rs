//! Runtime configuration for the display server.
//!
//! Loaded from an optional TOML file (`<root>/callboard.toml` by default);
//! every field has a default so an absent file is not an error. Relative
//! paths are resolved against `root`.

use std::path::{Path, PathBuf};

use fs_err as fs;
use serde::Deserialize;

use crate::error::{CallboardError, Result};

pub const CONFIG_FILE_NAME: &str = "callboard.toml";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_TEST_TRIGGER_NAME: &str = "Herr Müller";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub root: PathBuf,
    pub trigger_file: PathBuf,
    pub frontend_dir: PathBuf,
    pub media_dir: PathBuf,
    pub host: String,
    pub port: u16,
    /// Name written by the diagnostic test-trigger endpoint.
    pub test_trigger_name: String,
    /// Enables a daily rolling log file in this directory.
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            root: PathBuf::from("."),
            trigger_file: PathBuf::from("trigger.json"),
            frontend_dir: PathBuf::from("frontend"),
            media_dir: PathBuf::from("media"),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            test_trigger_name: DEFAULT_TEST_TRIGGER_NAME.to_string(),
            log_dir: None,
        }
    }
}

impl ServerConfig {
    /// Loads `path`, returning defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(ServerConfig::default());
        }

        let content = fs::read_to_string(path).map_err(|source| CallboardError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str::<ServerConfig>(&content).map_err(|err| CallboardError::ConfigMalformed {
            path: path.to_path_buf(),
            details: err.to_string(),
        })
    }

    pub fn default_path(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE_NAME)
    }

    pub fn trigger_path(&self) -> PathBuf {
        self.root.join(&self.trigger_file)
    }

    pub fn frontend_path(&self) -> PathBuf {
        self.root.join(&self.frontend_dir)
    }

    pub fn media_path(&self) -> PathBuf {
        self.root.join(&self.media_dir)
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_dir.as_ref().map(|dir| self.root.join(dir))
    }

    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}
