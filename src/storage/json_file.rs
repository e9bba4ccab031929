use std::{
    collections::{HashSet, VecDeque},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{SeenStore, StorageError, StorageResult};

/// Ids in insertion order plus a lookup set.
#[derive(Debug, Default)]
struct SeenIds {
    order: VecDeque<String>,
    ids: HashSet<String>,
}

impl SeenIds {
    fn insert(&mut self, id: &str, capacity: usize) -> bool {
        if !self.ids.insert(id.to_string()) {
            return false;
        }
        self.order.push_back(id.to_string());
        while self.order.len() > capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.ids.remove(&evicted);
            }
        }
        true
    }
}

/// Seen-set persisted as a single JSON array of strings.
///
/// The whole file is rewritten after every new id. The mutex covers the
/// in-memory update and the write, so overlapping triggers cannot interleave
/// their flushes.
pub struct JsonFileStore {
    path: PathBuf,
    capacity: usize,
    seen: Mutex<SeenIds>,
}

impl JsonFileStore {
    /// Loads the seen-set from `path`. A missing or unreadable file yields an
    /// empty set.
    pub async fn open(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let path = path.into();
        let capacity = capacity.max(1);

        let ids = match load_ids(&path).await {
            Ok(ids) => {
                tracing::info!("Loaded {} seen ids from {}", ids.len(), path.display());
                ids
            }
            Err(StorageError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No seen-set at {}, starting empty", path.display());
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable seen-set at {}: {e}", path.display());
                Vec::new()
            }
        };

        let mut seen = SeenIds::default();
        for id in &ids {
            seen.insert(id, capacity);
        }

        Self { path, capacity, seen: Mutex::new(seen) }
    }

    /// A copy of the ids currently retained.
    pub async fn snapshot(&self) -> HashSet<String> {
        self.seen.lock().await.ids.clone()
    }
}

#[async_trait]
impl SeenStore for JsonFileStore {
    async fn is_new(&self, id: &str) -> bool {
        !self.seen.lock().await.ids.contains(id)
    }

    async fn mark_sent(&self, id: &str) -> StorageResult<()> {
        let mut seen = self.seen.lock().await;
        if !seen.insert(id, self.capacity) {
            return Ok(());
        }
        let ids: Vec<&String> = seen.order.iter().collect();
        write_ids(&self.path, &ids).await
    }
}

/// Reads the JSON array of ids stored at `path`.
pub(super) async fn load_ids(path: &Path) -> StorageResult<Vec<String>> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Writes through a temporary file so a crash never leaves a truncated set.
async fn write_ids(path: &Path, ids: &[&String]) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_vec(ids)?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;

    tracing::debug!("Flushed {} seen ids to {}", ids.len(), path.display());
    Ok(())
}
