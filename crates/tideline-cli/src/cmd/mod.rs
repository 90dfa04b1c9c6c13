pub mod favorites;
pub mod financials;
pub mod offers;
pub mod profiles;

use crate::output::coded;
use anyhow::{Context as _, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tideline_core::config::EffectiveConfig;
use tideline_core::context::{ActiveView, ViewHooks};
use tideline_core::error::ErrorCode;
use tideline_core::store::FileStore;
use tracing::debug;

/// Open the profile store configured for this project.
pub fn open_store(config: &EffectiveConfig) -> Result<FileStore> {
    let store_cfg = &config.project.store;
    FileStore::open(store_cfg.dir.clone(), store_cfg.lock_timeout())
        .with_context(|| format!("opening store at {}", store_cfg.dir.display()))
}

/// Read and decode a JSON input file. Undecodable input is `InvalidInput`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).map_err(|err| {
        coded(
            ErrorCode::InvalidInput,
            format!("{} in {}: {err}", ErrorCode::InvalidInput.message(), path.display()),
        )
    })
}

/// The CLI renders nothing persistent, so view changes are only logged.
pub struct LogHooks;

impl ViewHooks for LogHooks {
    fn invalidate(&self, view: &ActiveView) {
        debug!(%view, key = view.storage_key(), "view invalidated");
    }

    fn reload(&self, view: &ActiveView) {
        debug!(%view, key = view.storage_key(), "view reload requested");
    }
}
