//! HTTP payload types for the callboard display server.
//!
//! Shared by the server and its clients to prevent schema drift. Every API
//! response is a JSON object; failures use [`ErrorBody`] with a non-2xx status.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TRIGGER_PATH: &str = "/api/trigger";
pub const CLEAR_TRIGGER_PATH: &str = "/api/clear-trigger";
pub const TEST_TRIGGER_PATH: &str = "/api/test-trigger";
pub const HEALTH_PATH: &str = "/api/health";

pub const STATUS_CLEARED: &str = "cleared";
pub const STATUS_TEST_TRIGGER_SET: &str = "test trigger set";

/// `GET /api/trigger`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerResponse {
    /// Trigger file content as found on disk, or null when absent/unreadable.
    pub trigger: Option<Value>,
    /// Last observed modification, seconds since the Unix epoch (0 = never).
    pub timestamp: f64,
    pub has_data: bool,
}

/// `POST /api/clear-trigger`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn cleared() -> Self {
        Self {
            status: STATUS_CLEARED.to_string(),
        }
    }
}

/// `POST /api/test-trigger`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestTriggerResponse {
    pub status: String,
    pub data: CallRecord,
}

/// The record shape written by this system's own writers.
///
/// External writers may use any JSON; this is only what we produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub name: String,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
}

impl CallRecord {
    pub fn new(name: impl Into<String>, timestamp: f64) -> Self {
        Self {
            name: name.into(),
            timestamp,
        }
    }
}

/// `GET /api/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// `push` or `degraded`.
    pub watch_mode: String,
    pub trigger_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
