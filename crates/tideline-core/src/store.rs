//! Key/value storage boundary for profile blobs and engine state.
//!
//! The engine only needs whole-value `get`/`set`/`remove`/`keys` over string
//! keys. [`FileStore`] keeps one JSON file per key under a directory and
//! replaces files atomically while holding an exclusive advisory lock.
//! [`MemoryStore`] backs tests and embedding hosts that persist elsewhere.

use crate::error::ErrorCode;
use crate::lock::{LockError, StoreLock};
use crate::model::ProfileBlob;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

const LOCK_FILE: &str = ".lock";
const VALUE_EXT: &str = "json";

/// Errors from a [`ProfileStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{}: failed to read '{key}': {source}", ErrorCode::StoreReadFailed.code())]
    Read { key: String, source: io::Error },
    #[error("{}: failed to write '{key}': {source}", ErrorCode::StoreWriteFailed.code())]
    Write { key: String, source: io::Error },
    #[error("{}: value at '{key}' is not valid JSON: {source}", ErrorCode::ProfileBlobCorrupt.code())]
    Corrupt {
        key: String,
        source: serde_json::Error,
    },
    #[error("{}: failed to encode '{key}': {source}", ErrorCode::InternalUnexpected.code())]
    Encode {
        key: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Lock(#[from] LockError),
}

impl StoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } => ErrorCode::StoreReadFailed,
            Self::Write { .. } => ErrorCode::StoreWriteFailed,
            Self::Corrupt { .. } => ErrorCode::ProfileBlobCorrupt,
            Self::Encode { .. } => ErrorCode::InternalUnexpected,
            Self::Lock(err) => err.code(),
        }
    }

    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

/// Whole-value string storage keyed by profile or state key.
pub trait ProfileStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Read and decode a JSON value. Missing keys are `Ok(None)`.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn ProfileStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })
}

/// Encode and write a JSON value.
pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn ProfileStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)
}

pub fn load_blob(store: &dyn ProfileStore, key: &str) -> Result<Option<ProfileBlob>, StoreError> {
    load_json(store, key)
}

pub fn save_blob(store: &dyn ProfileStore, key: &str, blob: &ProfileBlob) -> Result<(), StoreError> {
    save_json(store, key, blob)
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// One `<key>.json` file per key under `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    lock_timeout: Duration,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>, lock_timeout: Duration) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Write {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir, lock_timeout })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{VALUE_EXT}", encode_key(key)))
    }
}

impl ProfileStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = StoreLock::shared(&self.lock_path(), self.lock_timeout)?;
        match fs::read_to_string(self.value_path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = StoreLock::exclusive(&self.lock_path(), self.lock_timeout)?;
        let target = self.value_path(key);
        let tmp = self.dir.join(format!(".{}.tmp", encode_key(key)));
        let write_err = |source| StoreError::Write {
            key: key.to_string(),
            source,
        };

        let mut file = fs::File::create(&tmp).map_err(write_err)?;
        file.write_all(value.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);
        fs::rename(&tmp, &target).map_err(write_err)?;

        debug!(key, bytes = value.len(), "stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = StoreLock::exclusive(&self.lock_path(), self.lock_timeout)?;
        match fs::remove_file(self.value_path(key)) {
            Ok(()) => {
                debug!(key, "removed value");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Write {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let read_err = |source| StoreError::Read {
            key: self.dir.display().to_string(),
            source,
        };
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(read_err)? {
            let entry = entry.map_err(read_err)?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if let Some(stem) = name.strip_suffix(&format!(".{VALUE_EXT}")) {
                if let Some(key) = decode_key(stem) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Percent-encode bytes outside `[A-Za-z0-9._@+-]` so any key is a safe
/// file name.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'@' | b'+' | b'-') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    // A leading dot would hide the file from `keys()`.
    if out.starts_with('.') {
        out.replace_range(0..1, "%2E");
    }
    out
}

fn decode_key(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Offer;
    use tempfile::TempDir;

    fn file_store() -> (TempDir, FileStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = FileStore::open(dir.path().join("store"), Duration::from_millis(200))
            .expect("open store");
        (dir, store)
    }

    #[test]
    fn key_encoding_is_reversible() {
        for key in ["goob-favorites", "gobo-a@example.com", "odd/key name", ".hidden", "ü"] {
            let encoded = encode_key(key);
            assert!(!encoded.contains('/'));
            assert!(!encoded.starts_with('.'));
            assert_eq!(decode_key(&encoded).as_deref(), Some(key));
        }
    }

    #[test]
    fn file_store_round_trip() {
        let (_dir, store) = file_store();
        assert_eq!(store.get("gobo-a@example.com").expect("get"), None);

        store.set("gobo-a@example.com", "{\"x\":1}").expect("set");
        store.set("goob-favorites", "{}").expect("set");
        assert_eq!(
            store.get("gobo-a@example.com").expect("get").as_deref(),
            Some("{\"x\":1}")
        );
        assert_eq!(
            store.keys().expect("keys"),
            vec!["gobo-a@example.com".to_string(), "goob-favorites".to_string()]
        );

        store.remove("gobo-a@example.com").expect("remove");
        store.remove("gobo-a@example.com").expect("remove is idempotent");
        assert_eq!(store.keys().expect("keys"), vec!["goob-favorites".to_string()]);
    }

    #[test]
    fn set_replaces_whole_value() {
        let (_dir, store) = file_store();
        store.set("k", "first value that is longer").expect("set");
        store.set("k", "second").expect("set");
        assert_eq!(store.get("k").expect("get").as_deref(), Some("second"));
    }

    #[test]
    fn write_fails_while_another_writer_holds_the_lock() {
        let (_dir, store) = file_store();
        let _held = StoreLock::exclusive(&store.dir().join(LOCK_FILE), Duration::from_millis(50))
            .expect("hold lock");
        let err = store.set("k", "v").expect_err("lock is held");
        assert_eq!(err.code(), ErrorCode::LockContention);
    }

    #[test]
    fn corrupt_blob_is_reported() {
        let store = MemoryStore::new();
        store.set("gobo-x", "not json").expect("set");
        let err = load_blob(&store, "gobo-x").expect_err("corrupt");
        assert_eq!(err.code(), ErrorCode::ProfileBlobCorrupt);
    }

    #[test]
    fn blob_helpers_round_trip() {
        let store = MemoryStore::new();
        let blob = ProfileBlob::new(vec![Offer {
            offer_code: "25WAV103".into(),
            ..Offer::default()
        }]);
        save_blob(&store, "gobo-x", &blob).expect("save");
        let loaded = load_blob(&store, "gobo-x").expect("load").expect("present");
        assert_eq!(loaded, blob);
        assert!(load_blob(&store, "gobo-missing").expect("load").is_none());
    }
}
