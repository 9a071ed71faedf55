//! Optimistic create/update/delete.
//!
//! Each mutation is applied to local state immediately, then written to the
//! remote store. If the write fails, a compensating transition restores the
//! previous local state before the error is returned.
//!
//! Compensations are conditional. An update rollback is skipped if the task
//! has since disappeared; a delete reinstatement is skipped if a task with the
//! same id has reappeared. Mutations on the same id are serialized through a
//! per-id lock, so their remote writes and compensations never interleave.
//!
//! Tasks whose creation is still unconfirmed are only changed locally. Their
//! edits and deletes are recorded in [`PendingCreates`] and settled when the
//! permanent id arrives.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use sync_core::{Action, Resolution};
use sync_types::time::now_timestamp;
use sync_types::{NewTask, OwnerId, RemoteFields, Task, TaskId, TaskPatch};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use crate::client::TaskSyncError;
use crate::engine::{SharedIdentity, SharedPending};
use crate::remote::{RemoteError, RemoteStore};
use crate::store::TaskStore;

type IdLocks = HashMap<TaskId, Arc<tokio::sync::Mutex<()>>>;

/// Issues optimistic mutations against a [`TaskStore`] and a remote store.
pub struct MutationCoordinator<R> {
    remote: Arc<R>,
    store: TaskStore,
    identity: SharedIdentity,
    pending: SharedPending,
    locks: Arc<Mutex<IdLocks>>,
}

impl<R> Clone for MutationCoordinator<R> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            store: self.store.clone(),
            identity: Arc::clone(&self.identity),
            pending: Arc::clone(&self.pending),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<R: RemoteStore> MutationCoordinator<R> {
    pub(crate) fn new(
        remote: Arc<R>,
        store: TaskStore,
        identity: SharedIdentity,
        pending: SharedPending,
    ) -> Self {
        Self {
            remote,
            store,
            identity,
            pending,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of creations awaiting confirmation.
    pub fn pending_creates(&self) -> usize {
        self.pending.lock().len()
    }

    /// Create a task.
    ///
    /// The task appears immediately under a temporary id. Returns the
    /// permanent id once the remote store confirms it.
    pub async fn create(&self, task: NewTask) -> Result<TaskId, TaskSyncError> {
        let owner = self
            .identity
            .read()
            .clone()
            .ok_or(TaskSyncError::AuthenticationRequired)?;
        let task = task
            .validated()
            .map_err(|e| TaskSyncError::InvalidTask(e.to_string()))?;

        let fields = RemoteFields::for_create(&task, &owner);
        let original = self.add_optimistic(task, owner);
        let temp_id = original.id.clone();

        let created = self.remote.create(fields).await.and_then(|id| {
            TaskId::permanent(id.as_str()).map_err(|e| RemoteError::Rejected(e.to_string()))
        });
        match created {
            Ok(permanent) => {
                self.confirm(&original, permanent.clone()).await;
                Ok(permanent)
            }
            Err(e) => {
                {
                    let mut pending = self.pending.lock();
                    pending.fail(&temp_id);
                    self.store.dispatch(Action::RemoveLocal(temp_id.clone()));
                }
                warn!("Create failed, removed {}: {}", temp_id, e);
                Err(TaskSyncError::RemoteWriteFailed(e))
            }
        }
    }

    /// Insert the optimistic task under a fresh temporary id.
    fn add_optimistic(&self, task: NewTask, owner: OwnerId) -> Task {
        let mut pending = self.pending.lock();
        let temp_id = loop {
            let candidate = TaskId::temporary();
            if !self.store.contains(&candidate) && pending.status(&candidate).is_none() {
                break candidate;
            }
        };
        pending.begin(temp_id.clone());
        let local = task.into_task(temp_id.clone(), owner, Some(now_timestamp()));
        self.store.dispatch(Action::AddLocal(local.clone()));
        debug!("Added {} optimistically", temp_id);
        local
    }

    /// Swap in the permanent id and settle edits made in the meantime.
    async fn confirm(&self, original: &Task, permanent: TaskId) {
        let temp_id = &original.id;
        let guard = self.lock_id(&permanent).await;
        let resolution = {
            let mut pending = self.pending.lock();
            let resolution = pending.confirm(temp_id, permanent.clone());
            self.store.dispatch(Action::ReplaceLocalId {
                temp_id: temp_id.clone(),
                new_id: permanent.clone(),
            });
            resolution
        };
        debug!("Confirmed {} as {}", temp_id, permanent);

        match resolution {
            Resolution::Settled => {}
            Resolution::Replay(edits) => {
                debug!("Replaying pending edits on {}", permanent);
                if let Err(e) = self
                    .remote
                    .update(&permanent, RemoteFields::from_patch(&edits))
                    .await
                {
                    warn!("Replay of pending edits on {} failed: {}", permanent, e);
                    // Back to the values the remote record was created with.
                    self.rollback_update(&permanent, created_values(&edits, original));
                }
            }
            Resolution::Orphaned => {
                info!("Deleting {}, removed locally before confirmation", permanent);
                if let Err(e) = self.remote.delete(&permanent).await {
                    warn!("Failed to delete orphaned record {}: {}", permanent, e);
                }
            }
        }
        self.unlock_id(&permanent, guard);
    }

    /// Update fields of a task.
    pub async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<(), TaskSyncError> {
        if id.is_temporary() {
            return self.update_unconfirmed(id, patch);
        }

        let guard = self.lock_id(id).await;
        let result = self.update_confirmed(id, patch).await;
        self.unlock_id(id, guard);
        result
    }

    fn update_unconfirmed(&self, id: &TaskId, patch: TaskPatch) -> Result<(), TaskSyncError> {
        let mut pending = self.pending.lock();
        if !self.store.contains(id) {
            return Err(TaskSyncError::NotFound(id.clone()));
        }
        self.store.dispatch(Action::UpdateLocal {
            id: id.clone(),
            patch: patch.clone(),
        });
        pending.record_edit(id, patch);
        debug!("Recorded local-only edit on {}", id);
        Ok(())
    }

    async fn update_confirmed(&self, id: &TaskId, patch: TaskPatch) -> Result<(), TaskSyncError> {
        let rollback = self
            .store
            .find(id)
            .ok_or_else(|| TaskSyncError::NotFound(id.clone()))?
            .to_patch();
        if patch.is_empty() {
            return Ok(());
        }

        self.store.dispatch(Action::UpdateLocal {
            id: id.clone(),
            patch: patch.clone(),
        });

        match self.remote.update(id, RemoteFields::from_patch(&patch)).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Update of {} failed, rolling back: {}", id, e);
                self.rollback_update(id, rollback);
                Err(TaskSyncError::RemoteWriteFailed(e))
            }
        }
    }

    fn rollback_update(&self, id: &TaskId, rollback: TaskPatch) {
        let applied = self.store.dispatch_if(|state| {
            state.contains(id).then(|| Action::UpdateLocal {
                id: id.clone(),
                patch: rollback,
            })
        });
        if !applied {
            debug!("Skipped rollback of {}: no longer present", id);
        }
    }

    /// Delete a task. Deleting an unknown id does nothing.
    pub async fn delete(&self, id: &TaskId) -> Result<(), TaskSyncError> {
        if id.is_temporary() {
            self.delete_unconfirmed(id);
            return Ok(());
        }

        let guard = self.lock_id(id).await;
        let result = self.delete_confirmed(id).await;
        self.unlock_id(id, guard);
        result
    }

    fn delete_unconfirmed(&self, id: &TaskId) {
        let mut pending = self.pending.lock();
        if self.store.contains(id) {
            self.store.dispatch(Action::RemoveLocal(id.clone()));
            pending.record_delete(id);
            debug!("Removed unconfirmed {} locally", id);
        }
    }

    async fn delete_confirmed(&self, id: &TaskId) -> Result<(), TaskSyncError> {
        let Some(captured) = self.store.find(id) else {
            return Ok(());
        };
        self.store.dispatch(Action::RemoveLocal(id.clone()));

        match self.remote.delete(id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Delete of {} failed, reinstating: {}", id, e);
                let reinstated = self.store.dispatch_if(|state| {
                    (!state.contains(id)).then(|| Action::AddLocal(captured))
                });
                if !reinstated {
                    debug!("Skipped reinstating {}: already present", id);
                }
                Err(TaskSyncError::RemoteWriteFailed(e))
            }
        }
    }

    async fn lock_id(&self, id: &TaskId) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.locks.lock().entry(id.clone()).or_default());
        lock.lock_owned().await
    }

    fn unlock_id(&self, id: &TaskId, guard: OwnedMutexGuard<()>) {
        drop(guard);
        let mut locks = self.locks.lock();
        if locks.get(id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(id);
        }
    }
}

/// The fields touched by `edits`, as they were when the task was created.
fn created_values(edits: &TaskPatch, created: &Task) -> TaskPatch {
    let full = created.to_patch();
    TaskPatch {
        title: edits.title.as_ref().and(full.title),
        description: edits.description.as_ref().and(full.description),
        due_date: edits.due_date.as_ref().and(full.due_date),
        priority: edits.priority.and(full.priority),
        completed: edits.completed.and(full.completed),
    }
}
