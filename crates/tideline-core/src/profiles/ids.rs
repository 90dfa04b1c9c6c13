//! Stable numeric ids for `gobo-` profile keys.
//!
//! An id never changes while its profile exists. Removing a profile returns
//! its id to a free pool; new keys take the smallest free id before the
//! counter advances.

use crate::context::ProfileIdResolver;
use crate::store::{ProfileStore, load_json, save_json};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Prefix of profile keys that receive numeric ids.
pub const PROFILE_KEY_PREFIX: &str = "gobo-";

const MAP_KEY: &str = "goboProfileIdMap_v1";
const FREE_KEY: &str = "goboProfileIdFreeIds_v1";
const NEXT_KEY: &str = "goboProfileIdNext_v1";

/// Snapshot of the id allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileIdState {
    pub map: BTreeMap<String, u32>,
    pub free: Vec<u32>,
    pub next: u32,
}

impl Default for ProfileIdState {
    fn default() -> Self {
        Self {
            map: BTreeMap::new(),
            free: Vec::new(),
            next: 1,
        }
    }
}

/// Allocator backed by three store keys.
pub struct ProfileIdManager<'a> {
    store: &'a dyn ProfileStore,
    state: ProfileIdState,
}

impl<'a> ProfileIdManager<'a> {
    /// Hydrate from `store`. Unreadable state falls back to empty.
    #[must_use]
    pub fn load(store: &'a dyn ProfileStore) -> Self {
        let map: BTreeMap<String, u32> = load_or_default(store, MAP_KEY).unwrap_or_default();
        let free: Vec<u32> = load_or_default(store, FREE_KEY).unwrap_or_default();
        let next = load_or_default::<u32>(store, NEXT_KEY)
            .unwrap_or_else(|| map.values().max().map_or(1, |max| max + 1));
        debug!(profiles = map.len(), free = free.len(), next, "profile ids loaded");
        Self {
            store,
            state: ProfileIdState { map, free, next },
        }
    }

    #[must_use]
    pub const fn state(&self) -> &ProfileIdState {
        &self.state
    }

    #[must_use]
    pub fn id(&self, key: &str) -> Option<u32> {
        self.state.map.get(key).copied()
    }

    /// Give every `gobo-` key in `keys` an id, leaving existing ids alone.
    /// Returns the keys that were newly assigned, with their ids.
    pub fn ensure_ids<S: AsRef<str>>(&mut self, keys: &[S]) -> Vec<(String, u32)> {
        let mut assigned = Vec::new();
        for key in keys.iter().map(AsRef::as_ref) {
            if !key.starts_with(PROFILE_KEY_PREFIX) || self.state.map.contains_key(key) {
                continue;
            }
            let id = self.take_id();
            debug!(key, id, "profile id assigned");
            self.state.map.insert(key.to_string(), id);
            assigned.push((key.to_string(), id));
        }
        if !assigned.is_empty() {
            self.persist();
        }
        assigned
    }

    /// Release the ids of `keys` into the free pool.
    /// Returns the keys that held an id.
    pub fn remove_keys<S: AsRef<str>>(&mut self, keys: &[S]) -> Vec<(String, u32)> {
        let mut removed = Vec::new();
        for key in keys.iter().map(AsRef::as_ref) {
            let Some(id) = self.state.map.remove(key) else {
                continue;
            };
            if !self.state.free.contains(&id) {
                self.state.free.push(id);
            }
            debug!(key, id, "profile id released");
            removed.push((key.to_string(), id));
        }
        if !removed.is_empty() {
            self.persist();
        }
        removed
    }

    fn take_id(&mut self) -> u32 {
        if self.state.free.is_empty() {
            let id = self.state.next;
            self.state.next += 1;
            return id;
        }
        self.state.free.sort_unstable();
        self.state.free.remove(0)
    }

    fn persist(&self) {
        let writes = [
            save_json(self.store, MAP_KEY, &self.state.map),
            save_json(self.store, FREE_KEY, &self.state.free),
            save_json(self.store, NEXT_KEY, &self.state.next),
        ];
        for err in writes.into_iter().filter_map(Result::err) {
            warn!(error = %err, "failed to persist profile ids");
        }
    }
}

impl ProfileIdResolver for ProfileIdManager<'_> {
    fn profile_id(&self, key: &str) -> Option<u32> {
        self.id(key)
    }
}

fn load_or_default<T: serde::de::DeserializeOwned>(store: &dyn ProfileStore, key: &str) -> Option<T> {
    match load_json(store, key) {
        Ok(value) => value,
        Err(err) => {
            warn!(key, error = %err, "ignoring unreadable profile id state");
            None
        }
    }
}
