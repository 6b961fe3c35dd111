//! Persisted record of already-processed filings.
//!
//! The store is the only durable state between runs: a JSON file holding the
//! processed-key map and the last-run timestamp. It is bounded; once over
//! capacity the oldest entries are evicted so the file cannot grow without
//! limit across months of scheduled runs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use radar_core::RadarError;

/// One processed filing. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupEntry {
    pub key: String,
    pub processed_at: DateTime<Utc>,
    /// Whether the filing produced at least one alert.
    pub matched: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    entries: Vec<DedupEntry>,
}

/// Bounded, order-preserving dedup store. Owned exclusively by a single run;
/// callers guarantee no two runs share one state file concurrently.
#[derive(Debug)]
pub struct DedupStore {
    entries: Vec<DedupEntry>,
    keys: HashSet<String>,
    capacity: usize,
    path: PathBuf,
}

impl DedupStore {
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            keys: HashSet::new(),
            capacity: capacity.max(1),
            path: path.into(),
        }
    }

    /// Load from disk. A missing, truncated or corrupt file falls back to an
    /// empty store (logged, not fatal) — worst case some filings are
    /// re-inspected once.
    pub fn load(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let mut store = Self::new(path, capacity);

        let raw = match std::fs::read_to_string(&store.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return store,
            Err(e) => {
                tracing::warn!(
                    "Could not read dedup state {}: {}; starting empty",
                    store.path.display(),
                    e
                );
                return store;
            }
        };

        match serde_json::from_str::<StateFile>(&raw) {
            Ok(state) => {
                for entry in state.entries {
                    if store.keys.insert(entry.key.clone()) {
                        store.entries.push(entry);
                    }
                }
                store.evict_over_capacity();
            }
            Err(e) => {
                tracing::warn!(
                    "Corrupt dedup state {}: {}; starting empty",
                    store.path.display(),
                    e
                );
            }
        }

        store
    }

    pub fn seen(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a processed filing. First write wins: recording a key that is
    /// already present is a no-op and returns false.
    pub fn record(&mut self, key: &str, matched: bool, processed_at: DateTime<Utc>) -> bool {
        if !self.keys.insert(key.to_string()) {
            return false;
        }
        self.entries.push(DedupEntry {
            key: key.to_string(),
            processed_at,
            matched,
        });
        self.evict_over_capacity();
        true
    }

    /// Evict oldest-first (by processing timestamp, insertion order breaking
    /// ties) until back at capacity.
    fn evict_over_capacity(&mut self) {
        while self.entries.len() > self.capacity {
            let oldest = self
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(idx, e)| (e.processed_at, *idx))
                .map(|(idx, _)| idx);
            let Some(idx) = oldest else { break };
            let removed = self.entries.remove(idx);
            self.keys.remove(&removed.key);
            tracing::debug!("Evicted dedup entry {} (store at capacity)", removed.key);
        }
    }

    /// Write the store to disk atomically: serialize to a sibling temp file,
    /// then rename over the target so an interrupted write cannot leave a
    /// half-written state file.
    pub fn persist(&self) -> Result<(), RadarError> {
        let state = StateFile {
            last_run: Some(Utc::now()),
            entries: self.entries.clone(),
        };
        let body = serde_json::to_string_pretty(&state)
            .map_err(|e| RadarError::Store(e.to_string()))?;

        let tmp = tmp_path(&self.path);
        std::fs::write(&tmp, body).map_err(|e| {
            RadarError::Store(format!("write {}: {}", tmp.display(), e))
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            RadarError::Store(format!("rename {}: {}", self.path.display(), e))
        })?;

        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
