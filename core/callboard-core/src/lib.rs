//! # callboard-core
//!
//! Shared logic for the waiting-room call display: the trigger file, the
//! watcher that notices when it changes, and the status cell that carries
//! the last observed change to request handlers.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. The server wraps blocking calls itself.
//! - **Graceful degradation**: Missing or empty trigger files read as "no data", not errors.
//! - **Explicit ownership**: One `SharedStatus` is created at startup and shared by `Arc`;
//!   there is no global state.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use callboard_core::{SharedStatus, TriggerStore, TriggerWatcher};
//! use std::sync::Arc;
//!
//! let store = TriggerStore::open("trigger.json")?;
//! let status = Arc::new(SharedStatus::new());
//! let mut watcher = TriggerWatcher::new(store.path(), Arc::clone(&status));
//! watcher.start()?;
//! let record = store.read()?;
//! ```

pub mod config;
pub mod error;
pub mod status;
pub mod store;
pub mod watcher;

pub use config::ServerConfig;
pub use error::{CallboardError, Result};
pub use status::{now_secs, SharedStatus, WatchMode};
pub use store::{has_data, TriggerStore};
pub use watcher::TriggerWatcher;
