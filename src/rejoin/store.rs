//! Rejoin counter store
//!
//! This module provides the durable mapping of user ID to the number of times
//! that user has left the guild. Every mutation rewrites the full mapping to
//! the configured backend before returning.

use crate::rejoin::{WardenError, WardenResult};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Snapshot of every stored count, ordered by user ID
pub type CounterSnapshot = BTreeMap<String, u64>;

/// Storage backend for the counter snapshot
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CounterBackend: Send + Sync {
    /// Load the last persisted snapshot. A missing snapshot is an empty map.
    async fn load(&self) -> WardenResult<CounterSnapshot>;

    /// Replace the persisted snapshot with `counts`
    async fn save(&self, counts: &CounterSnapshot) -> WardenResult<()>;
}

/// Backend that keeps the snapshot as a pretty-printed JSON object on disk
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait::async_trait]
impl CounterBackend for JsonFileBackend {
    async fn load(&self) -> WardenResult<CounterSnapshot> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No counter file at {}, starting empty", self.path.display());
                return Ok(CounterSnapshot::new());
            }
            Err(e) => return Err(WardenError::Io(e)),
        };

        if content.trim().is_empty() {
            return Ok(CounterSnapshot::new());
        }

        Ok(serde_json::from_str(&content)?)
    }

    async fn save(&self, counts: &CounterSnapshot) -> WardenResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(counts)?;

        // Write next to the target and rename over it so a crash never leaves half a file
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, json).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        Ok(())
    }
}

/// Durable store of per-user rejoin counts
#[derive(Clone)]
pub struct CounterStore {
    counts: Arc<DashMap<String, u64>>,
    backend: Arc<dyn CounterBackend>,
    /// Serializes mutate-then-save so snapshots reach the backend in order
    flush_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for CounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterStore")
            .field("counts", &self.counts)
            .finish_non_exhaustive()
    }
}

impl CounterStore {
    /// Load the store from its backend
    ///
    /// # Errors
    ///
    /// Returns an error if the backend holds a snapshot that cannot be read
    /// or decoded. A missing snapshot is not an error.
    pub async fn load(backend: Arc<dyn CounterBackend>) -> WardenResult<Self> {
        let snapshot = backend.load().await?;
        info!("Loaded rejoin counts for {} user(s)", snapshot.len());

        Ok(Self {
            counts: Arc::new(snapshot.into_iter().collect()),
            backend,
            flush_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Stored count for a user, 0 when absent
    #[must_use]
    pub fn get(&self, user_id: &str) -> u64 {
        self.counts.get(user_id).map_or(0, |entry| *entry.value())
    }

    /// Record one more leave for a user and persist the full mapping
    ///
    /// Persistence failures are logged; the returned in-memory count stays
    /// authoritative for the rest of the process lifetime.
    pub async fn increment(&self, user_id: &str) -> u64 {
        let _guard = self.flush_lock.lock().await;

        let count = {
            let mut entry = self.counts.entry(user_id.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };
        debug!("Rejoin count for {user_id} is now {count}");

        self.flush().await;
        count
    }

    /// Remove a user's record and persist the full mapping
    ///
    /// Returns whether a record existed.
    pub async fn reset(&self, user_id: &str) -> bool {
        let _guard = self.flush_lock.lock().await;

        let existed = self.counts.remove(user_id).is_some();
        self.flush().await;
        existed
    }

    /// Ordered copy of every stored count
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        self.counts
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    async fn flush(&self) {
        let snapshot = self.snapshot();
        if let Err(e) = self.backend.save(&snapshot).await {
            error!("Failed to persist rejoin counts: {e}");
        }
    }
}
