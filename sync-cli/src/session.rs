//! A loaded task list for one CLI invocation.
//!
//! The remote store is an in-memory store seeded from a JSON file and written
//! back after mutations, so several users (or data directories) can share a
//! single remote file.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use sync_client::{FileStorage, MemoryRemoteStore, SyncConfig, TaskSync};
use sync_types::RemoteDocument;
use tracing::debug;

use crate::config::{set_file_permissions_0600, Settings};

/// Task sync bound to the remote file and cache of the current settings.
pub struct Session {
    /// The sync engine, identity set and first snapshot loaded.
    pub sync: TaskSync<MemoryRemoteStore, FileStorage>,
    remote: MemoryRemoteStore,
    remote_path: PathBuf,
}

impl Session {
    /// Load the remote file, set the identity and wait for the first list.
    pub async fn open(settings: &Settings) -> Result<Self> {
        let documents = load_documents(&settings.remote_path).await?;
        debug!(
            "Loaded {} records from {}",
            documents.len(),
            settings.remote_path.display()
        );

        let remote = MemoryRemoteStore::from_documents(documents);
        let sync = TaskSync::new(
            remote.clone(),
            FileStorage::new(&settings.cache_dir),
            SyncConfig::default(),
        );
        sync.set_identity(Some(settings.user.clone())).await;
        sync.wait_until_loaded()
            .await
            .context("Failed to load tasks")?;

        Ok(Self {
            sync,
            remote,
            remote_path: settings.remote_path.clone(),
        })
    }

    /// Number of records in the remote file, across all users.
    pub fn record_count(&self) -> usize {
        self.remote.documents().len()
    }

    /// Write the remote records back to the remote file.
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.remote_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create remote file directory")?;
        }
        let contents = serde_json::to_string_pretty(&self.remote.documents())
            .context("Failed to encode remote records")?;
        tokio::fs::write(&self.remote_path, contents)
            .await
            .with_context(|| format!("Failed to write {}", self.remote_path.display()))?;
        set_file_permissions_0600(&self.remote_path).await?;
        Ok(())
    }
}

/// Read the remote file. A missing file is an empty store.
async fn load_documents(path: &Path) -> Result<Vec<RemoteDocument>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    serde_json::from_str(&contents)
        .with_context(|| format!("Invalid remote file {}", path.display()))
}
