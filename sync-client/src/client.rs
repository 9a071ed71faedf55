//! TaskSync - the main interface for tasksync.
//!
//! This module provides [`TaskSync`], the API applications use to read and
//! change the task list of the signed-in user.
//!
//! # Architecture
//!
//! TaskSync wires the pure reducer and state machines from sync-core to the
//! remote store and local cache:
//!
//! ```text
//! Application → TaskSync ─┬─ MutationCoordinator → RemoteStore (writes)
//!                         └─ SyncEngine ← RemoteStore (snapshots)
//!                                  ↓
//!                 TaskStore (TaskListState) → LocalCache
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sync_client::{MemoryRemoteStore, MemoryStorage, SyncConfig, TaskSync};
//! use sync_types::{NewTask, OwnerId};
//!
//! let sync = TaskSync::new(MemoryRemoteStore::new(), MemoryStorage::new(), SyncConfig::default());
//! sync.set_identity(Some(OwnerId::new("user-1"))).await;
//! sync.wait_until_loaded().await?;
//!
//! let id = sync.create_task(NewTask::new("Write report", "2025-01-01")).await?;
//! ```

use std::sync::Arc;

use sync_core::{Action, SubscriptionState, TaskListState};
use sync_types::{NewTask, OwnerId, PriorityFilter, StatusFilter, TaskId, TaskPatch};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::{LocalCache, LocalStorage};
use crate::coordinator::MutationCoordinator;
use crate::engine::SyncEngine;
use crate::remote::{RemoteError, RemoteStore};
use crate::store::TaskStore;

/// Key the task list is cached under by default.
pub const DEFAULT_CACHE_KEY: &str = "tasks_cache_v2";

/// Default subscription channel capacity.
pub const DEFAULT_SNAPSHOT_BUFFER: usize = 16;

/// Errors surfaced to consumers.
#[derive(Debug, Error)]
pub enum TaskSyncError {
    /// A mutation was attempted with no active identity.
    #[error("authentication required")]
    AuthenticationRequired,

    /// No task with this id.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The remote store rejected the write; local state was rolled back.
    #[error("remote write failed: {0}")]
    RemoteWriteFailed(#[from] RemoteError),

    /// The remote subscription failed; the list may be stale.
    #[error("sync degraded: {0}")]
    SyncDegraded(String),

    /// The creation payload is invalid.
    #[error("invalid task: {0}")]
    InvalidTask(String),
}

/// Configuration for TaskSync.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Local storage key for the cached task list.
    pub cache_key: String,
    /// Capacity of the channel carrying snapshots from the remote store.
    pub snapshot_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            snapshot_buffer: DEFAULT_SNAPSHOT_BUFFER,
        }
    }
}

impl SyncConfig {
    /// Set the cache key.
    pub fn with_cache_key(mut self, key: &str) -> Self {
        self.cache_key = key.to_string();
        self
    }

    /// Set the snapshot channel capacity.
    pub fn with_snapshot_buffer(mut self, capacity: usize) -> Self {
        self.snapshot_buffer = capacity;
        self
    }
}

/// What an identity provider reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    /// The signed-in user, if any.
    pub user: Option<OwnerId>,
    /// True while the provider is still resolving the session.
    pub loading: bool,
}

/// The task sync engine.
///
/// Manages the subscription for the active identity, optimistic mutations,
/// and the local cache.
pub struct TaskSync<R, S> {
    store: TaskStore,
    engine: SyncEngine<R, S>,
    coordinator: MutationCoordinator<R>,
}

impl<R: RemoteStore, S: LocalStorage> TaskSync<R, S> {
    /// Create a TaskSync with no identity.
    pub fn new(remote: R, storage: S, config: SyncConfig) -> Self {
        let remote = Arc::new(remote);
        let store = TaskStore::new();
        let cache = LocalCache::new(Arc::new(storage), config.cache_key);
        let engine = SyncEngine::new(
            Arc::clone(&remote),
            cache,
            store.clone(),
            config.snapshot_buffer,
        );
        let coordinator = MutationCoordinator::new(
            remote,
            store.clone(),
            engine.shared_identity(),
            engine.shared_pending(),
        );
        Self {
            store,
            engine,
            coordinator,
        }
    }

    // ===== Identity =====

    /// Switch to a new (possibly absent) identity.
    pub async fn set_identity(&self, user: Option<OwnerId>) {
        self.engine.set_identity(user).await;
    }

    /// Follow an identity provider until its channel closes.
    ///
    /// While the provider reports `loading`, the current subscription is
    /// left alone.
    pub fn observe_identity(&self, mut auth: watch::Receiver<AuthState>) -> JoinHandle<()> {
        let engine = self.engine.clone();
        tokio::spawn(async move {
            loop {
                let current = auth.borrow_and_update().clone();
                if current.loading {
                    debug!("Identity provider still loading");
                } else {
                    engine.set_identity(current.user).await;
                }
                if auth.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// The active identity.
    pub fn identity(&self) -> Option<OwnerId> {
        self.engine.identity()
    }

    /// Current subscription state.
    pub async fn subscription_state(&self) -> SubscriptionState {
        self.engine.subscription_state().await
    }

    /// Resubscribe after the subscription failed.
    pub async fn retry_sync(&self) {
        self.engine.retry().await;
    }

    // ===== Mutations =====

    /// Create a task. Returns its permanent id.
    pub async fn create_task(&self, task: NewTask) -> Result<TaskId, TaskSyncError> {
        self.coordinator.create(task).await
    }

    /// Change fields of a task.
    pub async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<(), TaskSyncError> {
        self.coordinator.update(id, patch).await
    }

    /// Delete a task.
    pub async fn delete_task(&self, id: &TaskId) -> Result<(), TaskSyncError> {
        self.coordinator.delete(id).await
    }

    /// Set the priority filter.
    pub fn set_filter_priority(&self, filter: PriorityFilter) {
        self.store.dispatch(Action::SetFilterPriority(filter));
    }

    /// Set the status filter.
    pub fn set_filter_status(&self, filter: StatusFilter) {
        self.store.dispatch(Action::SetFilterStatus(filter));
    }

    // ===== State =====

    /// Current state.
    pub fn state(&self) -> TaskListState {
        self.store.snapshot()
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<TaskListState> {
        self.store.subscribe()
    }

    /// Number of creations awaiting remote confirmation.
    pub fn pending_creates(&self) -> usize {
        self.coordinator.pending_creates()
    }

    /// Wait until the list for the current identity has loaded.
    ///
    /// Returns [`TaskSyncError::SyncDegraded`] if loading ended because the
    /// subscription failed.
    pub async fn wait_until_loaded(&self) -> Result<TaskListState, TaskSyncError> {
        let mut rx = self.store.subscribe();
        let state = rx
            .wait_for(|state| !state.is_loading())
            .await
            .map_err(|_| TaskSyncError::SyncDegraded("task store closed".into()))?
            .clone();
        match state.sync_error() {
            Some(error) => Err(TaskSyncError::SyncDegraded(error.to_string())),
            None => Ok(state),
        }
    }
}
