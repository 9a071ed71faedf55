//! Best-effort local cache of the last confirmed task list.
//!
//! The cache is never authoritative. It is read once on cold start so the
//! last known list can be shown while the first remote snapshot is awaited,
//! and fully overwritten after every confirmed snapshot. Read and write
//! failures are logged and otherwise ignored.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sync_types::{OwnerId, Task};
use thiserror::Error;
use tracing::{debug, warn};

/// Local storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem error.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored blob could not be encoded or decoded.
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Write refused by the backend.
    #[error("storage write failed: {0}")]
    WriteFailed(String),
}

/// Durable key/blob storage.
#[async_trait]
pub trait LocalStorage: Send + Sync + 'static {
    /// Read the blob stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous blob.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// One file per key inside a directory. Files are written 0600 on Unix.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Store blobs under `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the blobs.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl LocalStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(key);
        tokio::fs::write(&path, value).await?;
        set_file_permissions_0600(&path).await?;
        Ok(())
    }
}

/// Set file permissions to 0600 (owner read/write only) on Unix.
/// No-op on non-Unix platforms.
async fn set_file_permissions_0600(path: &Path) -> Result<(), StorageError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// Volatile storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryStorageInner>>,
}

#[derive(Debug, Default)]
struct MemoryStorageInner {
    blobs: HashMap<String, String>,
    fail_writes: bool,
}

impl MemoryStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set()` fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// Read a blob without going through the trait.
    pub fn blob(&self, key: &str) -> Option<String> {
        self.inner.lock().blobs.get(key).cloned()
    }

    /// Write a blob without going through the trait.
    pub fn put(&self, key: &str, value: impl Into<String>) {
        self.inner.lock().blobs.insert(key.to_string(), value.into());
    }
}

#[async_trait]
impl LocalStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.blob(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(StorageError::WriteFailed("storage full".into()));
        }
        inner.blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The task-list cache: one fixed key holding a JSON array of tasks.
#[derive(Debug)]
pub struct LocalCache<S> {
    storage: Arc<S>,
    key: String,
}

impl<S: LocalStorage> LocalCache<S> {
    /// Create a cache over `storage` using `key`.
    pub fn new(storage: Arc<S>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Key the list is stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the cached tasks owned by `owner`.
    ///
    /// Missing, unreadable or corrupt blobs yield an empty list.
    pub async fn load(&self, owner: &OwnerId) -> Vec<Task> {
        let blob = match self.storage.get(&self.key).await {
            Ok(Some(blob)) => blob,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read task cache: {}", e);
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<Task>>(&blob) {
            Ok(tasks) => {
                let total = tasks.len();
                let owned: Vec<Task> = tasks.into_iter().filter(|t| &t.owner == owner).collect();
                debug!("Loaded {} cached tasks ({} owned by {})", total, owned.len(), owner);
                owned
            }
            Err(e) => {
                warn!("Ignoring corrupt task cache: {}", e);
                Vec::new()
            }
        }
    }

    /// Overwrite the cache with `tasks`. Failures are logged and ignored.
    pub async fn store(&self, tasks: &[Task]) {
        if let Err(e) = self.try_store(tasks).await {
            warn!("Failed to write task cache: {}", e);
        }
    }

    async fn try_store(&self, tasks: &[Task]) -> Result<(), StorageError> {
        let blob = serde_json::to_string(tasks)?;
        self.storage.set(&self.key, &blob).await
    }
}
