//! TopologyStore — one YAML file per service in the proxy's config directory.
//!
//! Reads are tolerant of a missing file (fresh document) but not of a
//! malformed one. Writes go to a uniquely named hidden temp file in the same
//! directory that is then persisted over the target, so the proxy never
//! observes a half-written document. Read-modify-write cycles are serialized
//! per document file through [`lock`].
//!
//! [`lock`]: TopologyStore::lock

use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::fs;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::document::RoutingDocument;
use crate::error::{TopologyError, TopologyResult};

type LockMap = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// File-backed store of routing documents. Cheap to clone; clones share locks.
#[derive(Clone)]
pub struct TopologyStore {
    dir: PathBuf,
    locks: LockMap,
}

/// Exclusive hold on one document file, returned by [`TopologyStore::lock`].
///
/// The lock entry is dropped from the store once no other task holds or
/// waits for it.
pub struct DocumentGuard {
    key: String,
    lock: Arc<AsyncMutex<()>>,
    locks: LockMap,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for DocumentGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().expect("topology locks");
        // One reference in the map, one here. Waiters clone under the map lock.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.key);
        }
    }
}

impl TopologyStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic document path for `service`.
    pub fn path_for(&self, service: &str) -> PathBuf {
        self.dir.join(format!("{}.yml", file_stem(service)))
    }

    /// Acquire the write lock for the document holding `service`.
    ///
    /// Service names that map to the same file share one lock. Hold the
    /// guard across load → modify → save so that concurrent joins cannot
    /// lose each other's updates.
    pub async fn lock(&self, service: &str) -> DocumentGuard {
        let key = file_stem(service);
        let lock = {
            let mut locks = self.locks.lock().expect("topology locks");
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = Arc::clone(&lock).lock_owned().await;
        DocumentGuard {
            key,
            lock,
            locks: Arc::clone(&self.locks),
            guard: Some(guard),
        }
    }

    /// Load the document for `service`, or an empty one if none exists.
    pub async fn load(&self, service: &str) -> TopologyResult<RoutingDocument> {
        let path = self.path_for(service);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(service, path = %path.display(), "no routing document yet");
                return Ok(RoutingDocument::default());
            }
            Err(e) => {
                return Err(TopologyError::Read {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };

        parse_document(&path, &content)
    }

    /// Write the document for `service`, replacing any previous version.
    pub async fn save(&self, service: &str, doc: &RoutingDocument) -> TopologyResult<()> {
        let path = self.path_for(service);
        let yaml = serde_yaml::to_string(doc).map_err(|e| TopologyError::Serialize(e.to_string()))?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| persist_err(&self.dir, e))?;

        let bytes = yaml.len();
        let target = path.clone();
        tokio::task::spawn_blocking(move || atomic_write(&target, yaml.as_bytes()))
            .await
            .map_err(|e| TopologyError::Persist {
                path: path.display().to_string(),
                reason: e.to_string(),
            })??;

        debug!(service, path = %path.display(), bytes, "routing document saved");
        Ok(())
    }
}

fn persist_err(path: &Path, e: std::io::Error) -> TopologyError {
    TopologyError::Persist {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

/// Write `bytes` to a fresh temp file next to `path` and rename it into
/// place. The temp file is removed if anything fails before the rename.
fn atomic_write(path: &Path, bytes: &[u8]) -> TopologyResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::Builder::new()
        .prefix(".cutover-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| persist_err(dir, e))?;

    tmp.write_all(bytes).map_err(|e| persist_err(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| persist_err(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| persist_err(path, e.error))?;
    Ok(())
}

/// Parse document text. Blank files count as empty documents.
fn parse_document(path: &Path, content: &str) -> TopologyResult<RoutingDocument> {
    if content.trim().is_empty() {
        return Ok(RoutingDocument::default());
    }
    serde_yaml::from_str(content).map_err(|e| TopologyError::Parse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// File name stem for `service`: anything outside `[A-Za-z0-9._-]` becomes
/// `_`, as does a leading `.`, so the file always lands inside the store.
fn file_stem(service: &str) -> String {
    service
        .chars()
        .enumerate()
        .map(|(i, c)| match c {
            '.' if i == 0 => '_',
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') => c,
            _ => '_',
        })
        .collect()
}
