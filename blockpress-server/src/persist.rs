//! JSON snapshots of the document table.
//!
//! The store is loaded once at start-up and written back whenever its dirty
//! flag is set: on a fixed interval while serving, and once more on shutdown.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use blockpress_sync::{MemoryStore, Snapshot};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Load `path`, or start empty when it does not exist yet.
pub async fn load(path: &Path) -> Result<MemoryStore> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no snapshot yet; starting empty");
            return Ok(MemoryStore::new());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let snapshot: Snapshot = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse snapshot {}", path.display()))?;
    info!(path = %path.display(), documents = snapshot.documents.len(), "snapshot loaded");
    Ok(MemoryStore::from_snapshot(snapshot))
}

/// Write the whole store to `path` via a sibling temp file and a rename.
pub async fn write(store: &MemoryStore, path: &Path) -> Result<()> {
    let json = serde_json::to_vec_pretty(&store.snapshot())?;
    let tmp = temp_path(path);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tokio::fs::write(&tmp, json)
        .await
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

/// Write the snapshot if anything changed since the last flush.
///
/// A failed write leaves the store dirty so the next flush retries it.
pub async fn flush(store: &MemoryStore, path: &Path) -> Result<bool> {
    if !store.take_dirty() {
        return Ok(false);
    }
    if let Err(err) = write(store, path).await {
        store.mark_dirty();
        return Err(err);
    }
    debug!(path = %path.display(), documents = store.len(), "snapshot flushed");
    Ok(true)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Periodic flusher; flushes a final time once `stop` flips to `true`.
pub fn spawn_flusher(
    store: MemoryStore,
    path: PathBuf,
    every: Duration,
    mut stop: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = flush(&store, &path).await {
                        warn!(error = %err, "snapshot flush failed");
                    }
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }
        match flush(&store, &path).await {
            Ok(true) => info!(path = %path.display(), "final snapshot written"),
            Ok(false) => {}
            Err(err) => warn!(error = %err, "final snapshot flush failed"),
        }
    })
}
