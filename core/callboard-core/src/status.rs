//! Last observed modification of the trigger file.
//!
//! Written by the change watcher's worker thread, read by any number of
//! request handlers. Both fields are atomics so a reader always sees either
//! the initial value or a value some writer stored.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;

use crate::store::TriggerStore;

/// How the observation timestamp is being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    /// OS file notifications update the shared status.
    Push,
    /// No watcher; callers fall back to the trigger file's mtime.
    Degraded,
}

impl WatchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            WatchMode::Push => "push",
            WatchMode::Degraded => "degraded",
        }
    }
}

#[derive(Debug, Default)]
pub struct SharedStatus {
    /// Microseconds since the Unix epoch; 0 until the first observation.
    last_modified_micros: AtomicU64,
    degraded: AtomicBool,
}

impl SharedStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an observation at the current wall-clock time.
    pub fn mark_modified(&self) -> u64 {
        self.set(now_micros())
    }

    /// Stores `micros`, bumped so the stored value is strictly greater than
    /// the previous one. Returns the value stored.
    pub fn set(&self, micros: u64) -> u64 {
        let bump = |previous: u64| micros.max(previous.saturating_add(1));
        let previous = self
            .last_modified_micros
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |previous| {
                Some(bump(previous))
            })
            .unwrap_or_else(|previous| previous);
        bump(previous)
    }

    pub fn get(&self) -> u64 {
        self.last_modified_micros.load(Ordering::Acquire)
    }

    pub fn last_modified_secs(&self) -> f64 {
        micros_to_secs(self.get())
    }

    pub fn set_degraded(&self, degraded: bool) {
        self.degraded.store(degraded, Ordering::Release);
    }

    pub fn mode(&self) -> WatchMode {
        if self.degraded.load(Ordering::Acquire) {
            WatchMode::Degraded
        } else {
            WatchMode::Push
        }
    }

    /// Timestamp to report to polling clients, in seconds.
    ///
    /// In degraded mode the trigger file is stat'ed on every call.
    pub fn observed_secs(&self, store: &TriggerStore) -> f64 {
        match self.mode() {
            WatchMode::Push => self.last_modified_secs(),
            WatchMode::Degraded => match store.modified_at() {
                Ok(Some(modified)) => system_time_secs(modified),
                Ok(None) => 0.0,
                Err(err) => {
                    tracing::warn!(error = %err, "Failed to stat trigger file in degraded mode");
                    0.0
                }
            },
        }
    }
}

pub fn now_micros() -> u64 {
    u64::try_from(Utc::now().timestamp_micros()).unwrap_or(0)
}

/// Current wall-clock time in fractional seconds.
pub fn now_secs() -> f64 {
    micros_to_secs(now_micros())
}

pub fn micros_to_secs(micros: u64) -> f64 {
    micros as f64 / 1_000_000.0
}

fn system_time_secs(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0)
}
