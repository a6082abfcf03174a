//! Change watcher for the trigger file.
//!
//! Watches the trigger file's parent directory (non-recursively) and records
//! an observation in [`SharedStatus`] whenever an event resolves to the
//! trigger file itself. Events for sibling files are ignored. A rescan
//! request counts as a modification; losing the watch (directory removed,
//! watch gone) flips the status to degraded so readers fall back to mtime.
//!
//! The notify callback only forwards events into a channel. A dedicated
//! worker thread drains that channel, so the status is written from exactly
//! one place and request handlers never wait on the watcher.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::error::{CallboardError, Result};
use crate::status::SharedStatus;

enum WatchMessage {
    Fs(notify::Result<Event>),
    Shutdown,
}

struct Running {
    watcher: RecommendedWatcher,
    control: Sender<WatchMessage>,
    worker: JoinHandle<()>,
}

/// Stopped until [`TriggerWatcher::start`] succeeds; stopped again after
/// [`TriggerWatcher::stop`] or drop.
pub struct TriggerWatcher {
    trigger_path: PathBuf,
    status: Arc<SharedStatus>,
    running: Option<Running>,
}

impl TriggerWatcher {
    pub fn new(trigger_path: impl Into<PathBuf>, status: Arc<SharedStatus>) -> Self {
        TriggerWatcher {
            trigger_path: trigger_path.into(),
            status,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Begins observing the trigger file's directory.
    ///
    /// On failure the shared status is switched to degraded mode so readers
    /// fall back to the file's mtime. Calling `start` while running is a no-op.
    pub fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Ok(());
        }

        match self.spawn() {
            Ok(running) => {
                self.running = Some(running);
                self.status.set_degraded(false);
                info!(path = %self.trigger_path.display(), "Trigger watcher started");
                Ok(())
            }
            Err(err) => {
                self.status.set_degraded(true);
                Err(err)
            }
        }
    }

    /// Releases the OS watch and joins the worker thread. Safe to call when
    /// never started or already stopped.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        // Drop the OS watcher first so no new events are produced.
        drop(running.watcher);
        let _ = running.control.send(WatchMessage::Shutdown);
        if running.worker.join().is_err() {
            warn!("Trigger watcher worker panicked");
        }
        info!(path = %self.trigger_path.display(), "Trigger watcher stopped");
    }

    fn spawn(&self) -> Result<Running> {
        let target = resolve_path(&self.trigger_path);
        let watch_dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let setup_error = |source: notify::Error| CallboardError::WatchSetup {
            path: watch_dir.clone(),
            source,
        };

        let (control, events) = mpsc::channel();
        let forward = control.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = forward.send(WatchMessage::Fs(res));
        })
        .map_err(setup_error)?;
        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(setup_error)?;

        let status = Arc::clone(&self.status);
        let worker = thread::Builder::new()
            .name("callboard-watcher".to_string())
            .spawn(move || run_worker(events, &target, &status))
            .map_err(|err| setup_error(notify::Error::io(err)))?;

        Ok(Running {
            watcher,
            control,
            worker,
        })
    }
}

impl Drop for TriggerWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(events: Receiver<WatchMessage>, target: &Path, status: &SharedStatus) {
    for message in events {
        match message {
            WatchMessage::Shutdown => break,
            WatchMessage::Fs(Ok(event)) => {
                if event.need_rescan() {
                    // Events were dropped; the trigger may have changed unseen.
                    let observed = status.mark_modified();
                    debug!(observed_micros = observed, "Watcher asked for rescan");
                } else if is_trigger_event(&event, target) {
                    let observed = status.mark_modified();
                    debug!(kind = ?event.kind, observed_micros = observed, "Trigger file modified");
                } else if is_watch_dir_removal(&event, target) {
                    status.set_degraded(true);
                    warn!(paths = ?event.paths, "Watched directory removed, falling back to mtime");
                }
            }
            WatchMessage::Fs(Err(err)) => {
                if is_watch_lost(&err) {
                    status.set_degraded(true);
                    warn!(error = %err, "File watch lost, falling back to mtime");
                } else {
                    warn!(error = %err, "File watcher error");
                }
            }
        }
    }
}

/// Errors after which no further events will arrive.
fn is_watch_lost(err: &notify::Error) -> bool {
    matches!(
        err.kind,
        notify::ErrorKind::PathNotFound
            | notify::ErrorKind::WatchNotFound
            | notify::ErrorKind::MaxFilesWatch
            | notify::ErrorKind::Io(_)
    )
}

fn is_watch_dir_removal(event: &Event, target: &Path) -> bool {
    let Some(watch_dir) = target.parent() else {
        return false;
    };
    matches!(event.kind, EventKind::Remove(_))
        && event.paths.iter().any(|path| resolve_path(path) == watch_dir)
}

/// True when `event` is a create/modify event for `target`.
///
/// `target` must already be resolved with [`resolve_path`].
pub fn is_trigger_event(event: &Event, target: &Path) -> bool {
    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
        return false;
    }
    event
        .paths
        .iter()
        .any(|path| resolve_path(path) == target)
}

/// Resolves `path` to an absolute, symlink-free form.
///
/// Falls back to resolving only the parent directory when the file itself
/// is gone (e.g. a temp file already renamed away).
pub fn resolve_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = std::fs::canonicalize(path) {
        return resolved;
    }
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    match (std::fs::canonicalize(parent), path.file_name()) {
        (Ok(parent), Some(name)) => parent.join(name),
        _ => path.to_path_buf(),
    }
}
