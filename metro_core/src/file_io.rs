//! # File I/O Module
//!
//! File-backed adapters for the engine's collaborators. The engine itself does
//! no I/O; these helpers exist so a host (or the CLI) can keep calibration
//! history and settings in plain JSON files.
//!
//! - **Atomic saves**: write to `.tmp`, fsync, rename
//! - **Writer lock**: a save holds an exclusive OS lock on a `.lock` sidecar
//!   and on the current target file until the rename is done, so concurrent
//!   saves and readers see [`CalcError::FileLocked`] instead of racing
//! - **Shared-lock reads**: a document locked by a writer is reported as
//!   [`CalcError::FileLocked`] instead of read half-written
//! - **Version validation**: history documents must match the schema version
//!
//! ## Example
//!
//! ```rust,no_run
//! use metro_core::file_io::{load_history, save_history};
//! use metro_core::record::CalibrationHistoryStore;
//! use std::path::Path;
//!
//! let store = CalibrationHistoryStore::new();
//! save_history(&store, Path::new("history.json"))?;
//! let loaded = load_history(Path::new("history.json"))?;
//! assert!(loaded.is_empty());
//! # Ok::<(), metro_core::errors::CalcError>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{CalcError, CalcResult};
use crate::record::{CalibrationHistoryStore, SCHEMA_VERSION};
use crate::settings::EngineSettings;

/// Save a history document with atomic write semantics.
///
/// Takes an exclusive lock on the temp file while writing.
pub fn save_history(store: &CalibrationHistoryStore, path: &Path) -> CalcResult<()> {
    write_json_atomic(store, path)
}

/// Load a history document.
///
/// # Returns
///
/// * `Ok(CalibrationHistoryStore)` - Successfully loaded
/// * `Err(CalcError::FileLocked)` - Another process holds an exclusive lock
/// * `Err(CalcError::VersionMismatch)` - File version is incompatible
/// * `Err(CalcError::SerializationError)` - Invalid JSON
/// * `Err(CalcError::FileError)` - I/O error
pub fn load_history(path: &Path) -> CalcResult<CalibrationHistoryStore> {
    let store: CalibrationHistoryStore = read_json_shared(path)?;
    validate_version(&store.version)?;
    tracing::debug!(path = %path.display(), records = store.len(), "loaded calibration history");
    Ok(store)
}

/// Save engine settings as pretty JSON.
pub fn save_settings(settings: &EngineSettings, path: &Path) -> CalcResult<()> {
    write_json_atomic(settings, path)
}

/// Load and validate engine settings.
pub fn load_settings(path: &Path) -> CalcResult<EngineSettings> {
    let settings: EngineSettings = read_json_shared(path)?;
    settings.validate()?;
    Ok(settings)
}

/// Load settings from `path` if given, otherwise use defaults.
pub fn load_settings_or_default(path: Option<&Path>) -> CalcResult<EngineSettings> {
    match path {
        Some(path) => load_settings(path),
        None => Ok(EngineSettings::default()),
    }
}

/// Read a JSON calibration record or other document without version checks.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> CalcResult<T> {
    read_json_shared(path)
}

/// Exclusive save lock, released when dropped.
///
/// Holds an OS lock on the `.lock` sidecar (serializes writers, including
/// the one that created the target) and on the existing target file (keeps
/// readers and outside lock holders out while the save runs). The sidecar is
/// left on disk so every writer locks the same inode.
struct SaveLock {
    _sidecar: File,
    _target: Option<File>,
}

impl SaveLock {
    fn acquire(path: &Path) -> CalcResult<Self> {
        let lock_path = lock_path_for(path);

        let sidecar = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| {
                CalcError::file_error("create lock", lock_path.display().to_string(), e.to_string())
            })?;

        FileExt::try_lock_exclusive(&sidecar)
            .map_err(|_| CalcError::file_locked(path.display().to_string()))?;

        let target = match File::open(path) {
            Ok(file) => {
                FileExt::try_lock_exclusive(&file)
                    .map_err(|_| CalcError::file_locked(path.display().to_string()))?;
                Some(file)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                return Err(CalcError::file_error(
                    "open",
                    path.display().to_string(),
                    e.to_string(),
                ))
            }
        };

        Ok(SaveLock {
            _sidecar: sidecar,
            _target: target,
        })
    }
}

/// Sidecar lock path: `history.json` -> `history.json.lock`
fn lock_path_for(path: &Path) -> PathBuf {
    let mut lock_path = path.to_path_buf();
    let extension = lock_path
        .extension()
        .map(|e| format!("{}.lock", e.to_string_lossy()))
        .unwrap_or_else(|| "lock".to_string());
    lock_path.set_extension(extension);
    lock_path
}

fn write_json_atomic<T: Serialize>(value: &T, path: &Path) -> CalcResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CalcError::SerializationError {
        reason: e.to_string(),
    })?;

    let _lock = SaveLock::acquire(path)?;

    let tmp_path = path.with_extension("json.tmp");

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        CalcError::file_error("create temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.write_all(json.as_bytes()).map_err(|e| {
        CalcError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.sync_all().map_err(|e| {
        CalcError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    drop(tmp_file);

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CalcError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    tracing::debug!(path = %path.display(), "saved document");
    Ok(())
}

fn read_json_shared<T: DeserializeOwned>(path: &Path) -> CalcResult<T> {
    let mut file = File::open(path).map_err(|e| {
        CalcError::file_error("open", path.display().to_string(), e.to_string())
    })?;

    FileExt::try_lock_shared(&file)
        .map_err(|_| CalcError::file_locked(path.display().to_string()))?;

    let mut contents = String::new();
    let read = file.read_to_string(&mut contents);
    let _ = FileExt::unlock(&file);
    read.map_err(|e| CalcError::file_error("read", path.display().to_string(), e.to_string()))?;

    serde_json::from_str(&contents).map_err(|e| CalcError::SerializationError {
        reason: format!("Invalid JSON in {}: {}", path.display(), e),
    })
}

/// Validate that a file version is compatible with the current schema.
fn validate_version(file_version: &str) -> CalcResult<()> {
    let mismatch = || CalcError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let file_parts: Vec<u32> = file_version
        .split('.')
        .filter_map(|p| p.parse().ok())
        .collect();
    let current_parts: Vec<u32> = SCHEMA_VERSION
        .split('.')
        .filter_map(|p| p.parse().ok())
        .collect();

    if file_parts.is_empty() || current_parts.is_empty() {
        return Err(mismatch());
    }

    // Major version must match
    if file_parts[0] != current_parts[0] {
        return Err(mismatch());
    }

    // For 0.x, a newer minor version is not readable
    if current_parts[0] == 0
        && file_parts.len() > 1
        && current_parts.len() > 1
        && file_parts[1] > current_parts[1]
    {
        return Err(mismatch());
    }

    Ok(())
}
