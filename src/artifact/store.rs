//! Time-bounded artifact store
//!
//! Holds encoded documents under fresh ids until they expire. Entries live in
//! a `tokio::sync::RwLock<HashMap>`; the lock is held only for map changes
//! and for the read of a document's bytes, never while encoding.
//!
//! Destruction has two paths that may race on the same id:
//! - a deferred delete scheduled after a successful download
//! - the expiry sweep, which removes anything older than the retention window
//!
//! Both go through [`destroy`], which removes the entry under the write lock
//! and frees its storage afterwards, so a second destroy finds nothing and
//! a concurrent `get` sees either the whole artifact or `NotFound`.

use super::blob::{BlobHandle, BlobStorage};
use super::types::{artifact_file_name, Artifact, ArtifactId, IdGenerator};
use crate::config::KfseqConfig;
use crate::error::{Error, Result};
use crate::sequence::Keyframe;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

type Entries = Arc<RwLock<HashMap<ArtifactId, ArtifactEntry>>>;

/// Store-owned record of one artifact
struct ArtifactEntry {
    name: String,
    rig_type: Option<String>,
    keyframes: Vec<Keyframe>,
    file_name: String,
    created_at: DateTime<Utc>,
    /// Monotonic creation instant, used for expiry
    created: Instant,
    handle: BlobHandle,
}

impl ArtifactEntry {
    fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created)
    }
}

/// Concurrent, time-bounded holding area for encoded documents
pub struct ArtifactStore {
    entries: Entries,
    blobs: BlobStorage,
    ids: IdGenerator,
    retention: Duration,
    shutdown: CancellationToken,
}

impl ArtifactStore {
    /// Create a store with the given backend and retention window
    pub fn new(blobs: BlobStorage, retention: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            blobs,
            ids: IdGenerator::new(),
            retention,
            shutdown: CancellationToken::new(),
        }
    }

    /// In-memory store, mostly for tests and one-off tools
    pub fn in_memory(retention: Duration) -> Self {
        Self::new(BlobStorage::Memory, retention)
    }

    /// Create a store from configuration, preparing its storage directory
    pub async fn from_config(config: &KfseqConfig) -> Result<Self> {
        let blobs = BlobStorage::from_config(&config.storage);
        blobs.prepare().await?;
        Ok(Self::new(blobs, config.retention.retention()))
    }

    /// Retention window applied on access and by the sweep loop
    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Store a new document, returning its fresh id.
    ///
    /// The document bytes are written before the entry becomes visible.
    pub async fn put(
        &self,
        name: impl Into<String>,
        rig_type: Option<String>,
        keyframes: Vec<Keyframe>,
        document: Bytes,
    ) -> Result<ArtifactId> {
        let name = name.into();
        let id = self.ids.next_id();
        let file_name = artifact_file_name(&name, id);
        let size = document.len();
        let handle = self.blobs.write(&file_name, document).await?;

        let entry = ArtifactEntry {
            name,
            rig_type,
            keyframes,
            file_name,
            created_at: Utc::now(),
            created: Instant::now(),
            handle,
        };

        {
            let mut map = self.entries.write().await;
            if map.contains_key(&id) {
                drop(map);
                // Ids are strictly increasing, but never overwrite a live entry.
                let _ = entry.handle.destroy().await;
                return Err(Error::StorageFailure(format!("artifact id {} already in use", id)));
            }
            map.insert(id, entry);
        }

        tracing::info!(artifact_id = %id, bytes = size, "Stored artifact");
        Ok(id)
    }

    /// Fetch a copy of a live artifact.
    ///
    /// Unknown and expired ids both report `NotFound`; an expired entry found
    /// here is destroyed on the spot.
    pub async fn get(&self, id: &ArtifactId) -> Result<Artifact> {
        {
            let map = self.entries.read().await;
            let entry = map.get(id).ok_or_else(|| not_found(id))?;
            if entry.age(Instant::now()) <= self.retention {
                // Read under the lock so a concurrent destroy cannot free the bytes mid-read.
                let document = entry.handle.read().await?;
                return Ok(Artifact {
                    id: *id,
                    name: entry.name.clone(),
                    rig_type: entry.rig_type.clone(),
                    keyframes: entry.keyframes.clone(),
                    file_name: entry.file_name.clone(),
                    created_at: entry.created_at,
                    document,
                });
            }
        }

        tracing::debug!(artifact_id = %id, "Evicting expired artifact on access");
        destroy(&self.entries, id).await;
        Err(not_found(id))
    }

    /// Whether `id` currently refers to a stored artifact, expired or not
    pub async fn contains(&self, id: &ArtifactId) -> bool {
        self.entries.read().await.contains_key(id)
    }

    /// Number of stored artifacts
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Destroy an artifact now. Returns whether it still existed; destroying
    /// a missing artifact is a no-op.
    pub async fn remove(&self, id: &ArtifactId) -> bool {
        destroy(&self.entries, id).await
    }

    /// Destroy `id` after `delay` without blocking the caller.
    ///
    /// The timer is dropped when the store shuts down; a missing artifact at
    /// fire time is ignored.
    pub fn schedule_deferred_delete(&self, id: ArtifactId, delay: Duration) -> JoinHandle<()> {
        let entries = self.entries.clone();
        let shutdown = self.shutdown.clone();

        tracing::debug!(artifact_id = %id, delay_secs = delay.as_secs(), "Scheduled deferred delete");

        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!(artifact_id = %id, "Deferred delete cancelled by shutdown");
                }
                _ = tokio::time::sleep(delay) => {
                    if destroy(&entries, &id).await {
                        tracing::info!(artifact_id = %id, "Deferred delete removed artifact");
                    }
                }
            }
        })
    }

    /// Destroy every artifact older than `retention`, returning how many
    /// were removed.
    ///
    /// Age is measured against the instant the sweep starts, so artifacts
    /// stored while it runs are never touched.
    pub async fn sweep_expired(&self, retention: Duration) -> usize {
        let started = Instant::now();

        let expired: Vec<(ArtifactId, ArtifactEntry)> = {
            let mut map = self.entries.write().await;
            let ids: Vec<ArtifactId> = map
                .iter()
                .filter(|(_, entry)| entry.age(started) > retention)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| map.remove(&id).map(|entry| (id, entry)))
                .collect()
        };

        let removed = expired.len();
        futures::future::join_all(expired.into_iter().map(|(id, entry)| async move {
            free_storage(&id, &entry.handle).await;
        }))
        .await;

        if removed > 0 {
            tracing::info!(count = removed, "Swept expired artifacts");
        }
        removed
    }

    /// Run [`sweep_expired`](Self::sweep_expired) with the store's retention
    /// window every `interval` until shutdown.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::debug!("Artifact sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        store.sweep_expired(store.retention).await;
                    }
                }
            }
        })
    }

    /// Cancel pending deferred deletes and the sweep loop
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// Remove `id` from the map, then free its storage. Returns whether an
/// entry was removed.
async fn destroy(entries: &Entries, id: &ArtifactId) -> bool {
    let entry = entries.write().await.remove(id);
    match entry {
        Some(entry) => {
            free_storage(id, &entry.handle).await;
            true
        }
        None => false,
    }
}

/// Best effort: failures are logged, never propagated.
async fn free_storage(id: &ArtifactId, handle: &BlobHandle) {
    if let Err(e) = handle.destroy().await {
        tracing::warn!(artifact_id = %id, "Failed to free artifact storage: {}", e);
    }
}

fn not_found(id: &ArtifactId) -> Error {
    Error::NotFound(format!("Artifact {} not found", id))
}
