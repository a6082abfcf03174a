//! File-backed trigger record.
//!
//! The trigger file (default `<root>/trigger.json`) is the handoff point
//! between an external caller and the display. This module owns every read
//! and write this process makes to it; the external writer is outside our
//! control.
//!
//! # File Format
//!
//! Any single JSON value. Typically:
//!
//! ```json
//! { "name": "Herr Müller", "timestamp": 1718000000.25 }
//! ```
//!
//! `{}` means "nothing to show".
//!
//! # Reading
//!
//! - Missing file, whitespace-only file, or literal `null` → `Ok(None)`
//! - Anything else that fails to parse → `MalformedTrigger`
//!
//! The external writer may be mid-write when we read, so callers treat
//! `MalformedTrigger` as "no data" rather than a failure.
//!
//! # Atomic Writes
//!
//! Our own writes go through a temp file in the same directory followed by a
//! rename, so a concurrent `read()` sees either the old or the new content.

use std::fs::Permissions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use fs_err as fs;
use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::error::{CallboardError, Result};

/// Content written by `clear()` and on first start.
pub const EMPTY_TRIGGER: &str = "{}";

#[derive(Debug, Clone)]
pub struct TriggerStore {
    path: PathBuf,
}

impl TriggerStore {
    /// Creates a store handle without touching the filesystem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TriggerStore { path: path.into() }
    }

    /// Creates a store handle and makes sure the trigger file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = TriggerStore::new(path);
        store.ensure_exists()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `{}` if the trigger file is absent. Returns true when the file
    /// was created by this call.
    ///
    /// Never replaces a file that appears concurrently.
    pub fn ensure_exists(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }

        let temp_file = temp_file_in(parent_dir(&self.path), EMPTY_TRIGGER)?;
        set_permissions(&temp_file, new_file_permissions())?;
        match temp_file.persist_noclobber(&self.path) {
            Ok(_) => {
                tracing::info!(path = %self.path.display(), "Created empty trigger file");
                Ok(true)
            }
            Err(err) if err.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(err) => Err(CallboardError::store_io(
                "Failed to create trigger file",
                &self.path,
                err.error,
            )),
        }
    }

    /// Reads the current trigger record fresh from disk.
    pub fn read(&self) -> Result<Option<Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(CallboardError::store_io(
                    "Failed to read trigger file",
                    &self.path,
                    err,
                ))
            }
        };

        let content = content.trim();
        if content.is_empty() {
            return Ok(None);
        }

        match serde_json::from_str::<Value>(content) {
            Ok(Value::Null) => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(source) => Err(CallboardError::MalformedTrigger {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Replaces the trigger with `{}`.
    pub fn clear(&self) -> Result<()> {
        self.replace_contents(EMPTY_TRIGGER)
    }

    /// Replaces the trigger with `record`. Non-ASCII text is written as-is.
    pub fn write<T: Serialize + ?Sized>(&self, record: &T) -> Result<()> {
        let content = serde_json::to_string(record).map_err(CallboardError::Serialize)?;
        self.replace_contents(&content)
    }

    /// Last modification time of the trigger file, if it exists.
    pub fn modified_at(&self) -> Result<Option<SystemTime>> {
        match fs::metadata(&self.path) {
            Ok(metadata) => metadata.modified().map(Some).map_err(|err| {
                CallboardError::store_io("Failed to read trigger mtime", &self.path, err)
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(CallboardError::store_io(
                "Failed to stat trigger file",
                &self.path,
                err,
            )),
        }
    }

    /// Replaces the file the trigger path points at, keeping a symlinked
    /// trigger path a symlink and keeping the existing permissions.
    fn replace_contents(&self, content: &str) -> Result<()> {
        let target = self.target_path();
        let permissions = match fs::metadata(&target) {
            Ok(metadata) => Some(metadata.permissions()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => new_file_permissions(),
            Err(err) => {
                return Err(CallboardError::store_io(
                    "Failed to stat trigger file",
                    &target,
                    err,
                ))
            }
        };

        let temp_file = temp_file_in(parent_dir(&target), content)?;
        set_permissions(&temp_file, permissions)?;
        temp_file.persist(&target).map_err(|err| {
            CallboardError::store_io("Failed to replace trigger file", &target, err.error)
        })?;
        Ok(())
    }

    /// The real file behind the trigger path; the path itself if it does
    /// not resolve.
    fn target_path(&self) -> PathBuf {
        std::fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone())
    }
}

fn temp_file_in(dir: &Path, content: &str) -> Result<NamedTempFile> {
    let mut temp_file = NamedTempFile::new_in(dir).map_err(|err| {
        CallboardError::store_io("Failed to create temp trigger file", dir, err)
    })?;
    if let Err(err) = temp_file
        .write_all(content.as_bytes())
        .and_then(|()| temp_file.flush())
    {
        return Err(CallboardError::store_io(
            "Failed to write temp trigger file",
            temp_file.path(),
            err,
        ));
    }
    Ok(temp_file)
}

fn set_permissions(temp_file: &NamedTempFile, permissions: Option<Permissions>) -> Result<()> {
    let Some(permissions) = permissions else {
        return Ok(());
    };
    temp_file
        .as_file()
        .set_permissions(permissions)
        .map_err(|err| {
            CallboardError::store_io("Failed to set trigger file mode", temp_file.path(), err)
        })
}

/// Temp files are created 0600; the trigger file is shared with another
/// writer, so new files get the usual 0644.
#[cfg(unix)]
fn new_file_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<Permissions> {
    None
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Whether a record should be shown on the display.
///
/// `{}` is what `clear()` writes, so it counts as no data even though it is
/// a present value.
pub fn has_data(record: Option<&Value>) -> bool {
    match record {
        None | Some(Value::Null) => false,
        Some(Value::Object(map)) => !map.is_empty(),
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> TriggerStore {
        TriggerStore::new(dir.path().join("trigger.json"))
    }

    #[test]
    fn read_returns_none_when_file_missing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.read().unwrap().is_none());
    }

    #[test]
    fn read_returns_none_for_whitespace_only_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "  \n\t ").unwrap();
        assert!(store.read().unwrap().is_none());
    }

    #[test]
    fn read_returns_none_for_literal_null() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "null").unwrap();
        assert!(store.read().unwrap().is_none());
    }

    #[test]
    fn read_reports_malformed_content() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "not json").unwrap();

        let err = store.read().unwrap_err();
        assert!(err.is_malformed(), "unexpected error: {err}");
    }

    #[test]
    fn read_reports_truncated_object_as_malformed() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), r#"{"name": "Fr"#).unwrap();
        assert!(store.read().unwrap_err().is_malformed());
    }

    #[test]
    fn read_forwards_external_json_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let samples = [
            json!({"name": "Frau Öztürk", "timestamp": 1718000000.5}),
            json!({"name": "A", "room": {"floor": 2, "tags": ["x", null]}}),
            json!([1, 2, 3]),
            json!("just a string"),
            json!(42),
            json!(true),
        ];

        for sample in samples {
            std::fs::write(store.path(), serde_json::to_string_pretty(&sample).unwrap()).unwrap();
            assert_eq!(store.read().unwrap(), Some(sample));
        }
    }

    #[test]
    fn clear_writes_empty_object() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.write(&json!({"name": "B"})).unwrap();

        store.clear().unwrap();

        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "{}");
        let record = store.read().unwrap();
        assert_eq!(record, Some(json!({})));
        assert!(!has_data(record.as_ref()));
    }

    #[test]
    fn write_preserves_non_ascii_text() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.write(&json!({"name": "Herr Müller"})).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("Herr Müller"), "raw content was {raw}");
        assert!(!raw.contains("\\u"));
    }

    #[test]
    fn write_leaves_no_temp_files_behind() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.write(&json!({"name": "C"})).unwrap();
        store.clear().unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().flatten().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn write_fails_with_store_io_when_directory_missing() {
        let dir = TempDir::new().unwrap();
        let store = TriggerStore::new(dir.path().join("gone").join("trigger.json"));

        let err = store.clear().unwrap_err();
        assert!(matches!(err, CallboardError::StoreIo { .. }), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn clear_keeps_existing_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), r#"{"name":"A"}"#).unwrap();
        std::fs::set_permissions(store.path(), std::fs::Permissions::from_mode(0o664)).unwrap();

        store.clear().unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o664);
    }

    #[cfg(unix)]
    #[test]
    fn new_trigger_file_is_not_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = TriggerStore::open(dir.path().join("trigger.json")).unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn clear_writes_through_symlink() {
        let dir = TempDir::new().unwrap();
        let shared = dir.path().join("shared");
        std::fs::create_dir_all(&shared).unwrap();
        let real = shared.join("current.json");
        std::fs::write(&real, r#"{"name":"A"}"#).unwrap();
        let link = dir.path().join("trigger.json");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        let store = TriggerStore::new(&link);

        store.clear().unwrap();

        assert!(std::fs::symlink_metadata(&link)
            .unwrap()
            .file_type()
            .is_symlink());
        assert_eq!(std::fs::read_to_string(&real).unwrap(), "{}");
        assert_eq!(store.read().unwrap(), Some(json!({})));

        store.write(&json!({"name": "B"})).unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&std::fs::read_to_string(&real).unwrap()).unwrap(),
            json!({"name": "B"})
        );
    }

    #[test]
    fn open_creates_empty_trigger_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trigger.json");

        let store = TriggerStore::open(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        assert_eq!(store.read().unwrap(), Some(json!({})));
    }

    #[test]
    fn ensure_exists_keeps_existing_content() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), r#"{"name":"D"}"#).unwrap();

        assert!(!store.ensure_exists().unwrap());
        assert_eq!(store.read().unwrap(), Some(json!({"name": "D"})));
    }

    #[test]
    fn modified_at_is_none_for_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.modified_at().unwrap().is_none());

        store.clear().unwrap();
        assert!(store.modified_at().unwrap().is_some());
    }

    #[test]
    fn has_data_treats_empty_object_as_absent() {
        assert!(!has_data(None));
        assert!(!has_data(Some(&Value::Null)));
        assert!(!has_data(Some(&json!({}))));
        assert!(has_data(Some(&json!({"name": "E"}))));
        assert!(has_data(Some(&json!([]))));
    }

    #[test]
    fn concurrent_reads_never_see_partial_writes() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(TriggerStore::open(dir.path().join("trigger.json")).unwrap());
        let long_name = "Ä".repeat(4096);

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..200 {
                    if i % 2 == 0 {
                        store
                            .write(&json!({"name": long_name, "timestamp": i}))
                            .unwrap();
                    } else {
                        store.clear().unwrap();
                    }
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..300 {
                        match store.read() {
                            Ok(Some(Value::Object(_))) => {}
                            other => panic!("unexpected read result: {other:?}"),
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
