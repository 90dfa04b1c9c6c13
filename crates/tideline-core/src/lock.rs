//! Advisory locking for the profile store directory.
//!
//! Writers take the store lock exclusively for the duration of a
//! temp-file-and-rename; readers take it shared so they never see a value
//! mid-replace. Locks are `flock`-style (via `fs2`) and released when the
//! [`StoreLock`] is dropped.

use crate::error::ErrorCode;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

const FIRST_BACKOFF: Duration = Duration::from_millis(5);
const MAX_BACKOFF: Duration = Duration::from_millis(80);

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("{}: store lock at {} still held after {waited:?}", ErrorCode::LockContention.code(), .path.display())]
    Timeout { path: PathBuf, waited: Duration },
    #[error("{}: cannot open store lock: {0}", ErrorCode::StoreWriteFailed.code())]
    IoError(#[from] io::Error),
}

impl LockError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Timeout { .. } => ErrorCode::LockContention,
            Self::IoError(_) => ErrorCode::StoreWriteFailed,
        }
    }

    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

/// How the store lock is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Many readers at once.
    Shared,
    /// One writer, no readers.
    Exclusive,
}

/// A held lock on the store's lock file. Unlocks on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
    mode: LockMode,
}

impl StoreLock {
    /// Lock `path` in `mode`, polling with backoff until `timeout` elapses.
    ///
    /// The lock file and its parent directory are created when missing.
    pub fn acquire(path: &Path, mode: LockMode, timeout: Duration) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        let started = Instant::now();
        let mut backoff = FIRST_BACKOFF;
        loop {
            let attempt = match mode {
                LockMode::Shared => FileExt::try_lock_shared(&file),
                LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
            };
            if attempt.is_ok() {
                let waited = started.elapsed();
                if !waited.is_zero() {
                    debug!(path = %path.display(), ?mode, ?waited, "store lock acquired after waiting");
                }
                return Ok(Self {
                    file,
                    path: path.to_path_buf(),
                    mode,
                });
            }

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(LockError::Timeout {
                    path: path.to_path_buf(),
                    waited,
                });
            }
            thread::sleep(backoff.min(timeout - waited));
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    pub fn shared(path: &Path, timeout: Duration) -> Result<Self, LockError> {
        Self::acquire(path, LockMode::Shared, timeout)
    }

    pub fn exclusive(path: &Path, timeout: Duration) -> Result<Self, LockError> {
        Self::acquire(path, LockMode::Exclusive, timeout)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // unlock failure only means the OS already dropped it
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn lock_path(dir: &TempDir) -> PathBuf {
        dir.path().join("store").join(".lock")
    }

    #[test]
    fn creates_missing_lock_file() -> Result<(), LockError> {
        let dir = TempDir::new()?;
        let path = lock_path(&dir);
        let lock = StoreLock::exclusive(&path, Duration::from_millis(50))?;
        assert!(path.exists());
        assert_eq!(lock.path(), path.as_path());
        assert_eq!(lock.mode(), LockMode::Exclusive);
        Ok(())
    }

    #[test]
    fn second_writer_times_out() {
        let dir = TempDir::new().expect("tempdir");
        let path = lock_path(&dir);
        let _held = StoreLock::exclusive(&path, Duration::from_millis(50)).expect("first writer");

        let err = StoreLock::exclusive(&path, Duration::from_millis(30)).expect_err("lock is held");
        let LockError::Timeout { path: reported, waited } = &err else {
            panic!("expected timeout, got {err}");
        };
        assert_eq!(reported, &path);
        assert!(*waited >= Duration::from_millis(30));
        assert_eq!(err.code(), ErrorCode::LockContention);
        assert!(err.hint().is_some());
        assert!(err.to_string().starts_with("E5002"));
    }

    #[test]
    fn readers_share_but_exclude_writers() -> Result<(), LockError> {
        let dir = TempDir::new()?;
        let path = lock_path(&dir);
        let first = StoreLock::shared(&path, Duration::from_millis(50))?;
        let second = StoreLock::shared(&path, Duration::from_millis(50))?;

        assert!(matches!(
            StoreLock::exclusive(&path, Duration::from_millis(20)),
            Err(LockError::Timeout { .. })
        ));

        drop(first);
        drop(second);
        StoreLock::exclusive(&path, Duration::from_millis(50))?;
        Ok(())
    }

    #[test]
    fn waiting_reader_gets_in_after_writer_drops() {
        let dir = TempDir::new().expect("tempdir");
        let path = lock_path(&dir);
        let writer = StoreLock::exclusive(&path, Duration::from_millis(50)).expect("writer");

        let (ready_tx, ready_rx) = mpsc::channel();
        let reader_path = path.clone();
        let reader = thread::spawn(move || {
            ready_tx.send(()).expect("signal");
            StoreLock::shared(&reader_path, Duration::from_secs(5)).map(|lock| lock.mode())
        });

        ready_rx.recv().expect("reader started");
        thread::sleep(Duration::from_millis(30));
        drop(writer);

        let mode = reader.join().expect("reader thread").expect("reader lock");
        assert_eq!(mode, LockMode::Shared);
    }
}
