//! Persistence service: JSON snapshots of the store and a periodic flush.
//!
//! DESIGN
//! ======
//! The store is the source of truth in memory. A background task wakes every
//! flush interval, compares the store's revision counter with the last one it
//! wrote, and writes a full snapshot when they differ. Edits stay fast and
//! reach disk within one interval. Snapshot encoding and file I/O run on
//! tokio's blocking pool, off the runtime workers that serve search requests.
//!
//! ERROR HANDLING
//! ==============
//! A failed flush is logged and leaves the last-written revision untouched,
//! so the next tick retries. Snapshots are written to a temp file and renamed
//! into place; a crash mid-write leaves the previous snapshot intact.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use canvas::doc::{Board, Item};
use canvas::store::{LocalStore, PersistenceError};

/// Format version written into every snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot json invalid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot rejected by store: {0}")]
    Store(#[from] PersistenceError),
    #[error("unsupported snapshot version: {0}")]
    Version(u32),
}

impl crate::error::ErrorCode for SnapshotError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "E_SNAPSHOT_IO",
            Self::Json(_) | Self::Version(_) => "E_SNAPSHOT_FORMAT",
            Self::Store(_) => "E_SNAPSHOT_STORE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// On-disk form of a whole store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub boards: Vec<Board>,
    pub items: Vec<Item>,
}

// =============================================================================
// SAVE / LOAD
// =============================================================================

/// Write the whole store to `path`.
///
/// # Errors
///
/// `Io` if the file cannot be written or renamed, `Json` if encoding fails.
pub fn save_snapshot(store: &LocalStore, path: &Path) -> Result<usize, SnapshotError> {
    let (boards, items) = store.export();
    let count = items.len();
    let snapshot = Snapshot { version: SNAPSHOT_VERSION, boards, items };
    let json = serde_json::to_vec(&snapshot)?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let tmp = tmp_path(path);
    std::fs::write(&tmp, &json)?;
    std::fs::rename(&tmp, path)?;
    debug!(path = %path.display(), bytes = json.len(), items = count, "snapshot written");
    Ok(count)
}

/// Read a store back from `path`. A missing file gives an empty store.
///
/// # Errors
///
/// `Io` for read failures other than not-found, `Json`/`Version` for a bad
/// file, `Store` if the records are inconsistent or exceed `quota_bytes`.
pub fn load_snapshot(path: &Path, quota_bytes: Option<usize>) -> Result<LocalStore, SnapshotError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no snapshot found; starting empty");
            return Ok(quota_bytes.map_or_else(LocalStore::new, LocalStore::with_quota));
        }
        Err(e) => return Err(e.into()),
    };
    let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::Version(snapshot.version));
    }
    let (boards, items) = (snapshot.boards.len(), snapshot.items.len());
    let store = LocalStore::from_records(snapshot.boards, snapshot.items, quota_bytes)?;
    info!(path = %path.display(), boards, items, "snapshot loaded");
    Ok(store)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

// =============================================================================
// BACKGROUND TASK
// =============================================================================

/// Spawn the background flush task. Returns a handle for shutdown.
pub fn spawn_persistence_task(store: Arc<LocalStore>, path: PathBuf, every: Duration) -> JoinHandle<()> {
    info!(path = %path.display(), interval_ms = every.as_millis(), "persistence task started");
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut flushed = store.revision();
        loop {
            interval.tick().await;
            if store.revision() == flushed {
                continue;
            }
            if let Some(revision) = flush_off_runtime(store.clone(), path.clone(), flushed).await {
                flushed = revision;
            }
        }
    })
}

/// Run [`flush_if_dirty`] on the blocking pool so snapshot file I/O never
/// stalls runtime workers.
async fn flush_off_runtime(store: Arc<LocalStore>, path: PathBuf, flushed: u64) -> Option<u64> {
    tokio::task::spawn_blocking(move || flush_if_dirty(&store, &path, flushed))
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, "persistence flush task join failed");
            None
        })
}

/// Write a snapshot if the store moved past `flushed`. Returns the revision
/// written, or `None` when clean or on failure.
fn flush_if_dirty(store: &LocalStore, path: &Path, flushed: u64) -> Option<u64> {
    let revision = store.revision();
    if revision == flushed {
        return None;
    }
    match save_snapshot(store, path) {
        Ok(_) => Some(revision),
        Err(e) => {
            error!(error = %e, revision, "persistence flush failed");
            None
        }
    }
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
