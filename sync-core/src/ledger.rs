//! Per-task sync status and the ledger of unconfirmed creations.
//!
//! A task's sync status follows a one-way state machine:
//!
//! ```text
//! Unsynced(temp) ──create ok──► Synced(permanent) ──delete ok──► Removed
//!      │
//!      └──create failed / deleted before confirmation──► Removed
//! ```
//!
//! Failed updates never change sync status, so they are not events here.
//!
//! [`PendingCreates`] tracks every creation that is still in flight, so edits
//! and deletes made against its temporary id are not lost when the
//! permanent id arrives.

use std::collections::HashMap;

use sync_types::{TaskId, TaskPatch};

/// Where a task stands relative to the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// Created locally, not yet confirmed.
    Unsynced(TaskId),
    /// Confirmed by the remote store.
    Synced(TaskId),
    /// Gone (terminal).
    Removed,
}

/// Inputs to the per-task status machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// The remote create succeeded with this permanent id.
    CreateConfirmed(TaskId),
    /// The remote create failed.
    CreateFailed,
    /// The task was deleted (locally for unsynced, remotely for synced).
    Deleted,
}

impl SyncStatus {
    /// Apply an event and return the next status.
    pub fn on_event(self, event: StatusEvent) -> Self {
        match (self, event) {
            (Self::Unsynced(_), StatusEvent::CreateConfirmed(permanent)) => Self::Synced(permanent),
            (Self::Unsynced(_), StatusEvent::CreateFailed | StatusEvent::Deleted) => Self::Removed,
            (Self::Synced(_), StatusEvent::Deleted) => Self::Removed,
            (status, _) => status,
        }
    }

    /// Check if the task still awaits confirmation.
    pub fn is_unsynced(&self) -> bool {
        matches!(self, Self::Unsynced(_))
    }
}

/// What to do once an in-flight creation is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing further; the local rename is enough.
    Settled,
    /// Local edits were made while unconfirmed; send them to the new record.
    Replay(TaskPatch),
    /// The task was deleted while unconfirmed; the new record must go too.
    Orphaned,
}

#[derive(Debug, Clone)]
struct PendingCreate {
    status: SyncStatus,
    edits: TaskPatch,
}

/// Creations awaiting remote confirmation, keyed by temporary id.
#[derive(Debug, Clone, Default)]
pub struct PendingCreates {
    entries: HashMap<TaskId, PendingCreate>,
}

impl PendingCreates {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a creation for `temp_id` has been issued.
    pub fn begin(&mut self, temp_id: TaskId) {
        self.entries.insert(
            temp_id.clone(),
            PendingCreate {
                status: SyncStatus::Unsynced(temp_id),
                edits: TaskPatch::new(),
            },
        );
    }

    /// Accumulate a local-only edit made before confirmation.
    ///
    /// Returns `false` if no creation is pending for this id.
    pub fn record_edit(&mut self, temp_id: &TaskId, patch: TaskPatch) -> bool {
        match self.entries.get_mut(temp_id) {
            Some(entry) => {
                entry.edits.merge(patch);
                true
            }
            None => false,
        }
    }

    /// Record a local delete made before confirmation.
    ///
    /// Returns `false` if no creation is pending for this id.
    pub fn record_delete(&mut self, temp_id: &TaskId) -> bool {
        match self.entries.get_mut(temp_id) {
            Some(entry) => {
                let status = std::mem::replace(&mut entry.status, SyncStatus::Removed);
                entry.status = status.on_event(StatusEvent::Deleted);
                true
            }
            None => false,
        }
    }

    /// Settle a confirmed creation.
    pub fn confirm(&mut self, temp_id: &TaskId, permanent: TaskId) -> Resolution {
        let Some(entry) = self.entries.remove(temp_id) else {
            return Resolution::Settled;
        };
        match entry.status.on_event(StatusEvent::CreateConfirmed(permanent)) {
            SyncStatus::Removed => Resolution::Orphaned,
            _ if entry.edits.is_empty() => Resolution::Settled,
            _ => Resolution::Replay(entry.edits),
        }
    }

    /// Drop a failed creation.
    pub fn fail(&mut self, temp_id: &TaskId) {
        self.entries.remove(temp_id);
    }

    /// Check if `temp_id` is an unconfirmed creation that has not been
    /// deleted locally.
    pub fn is_live(&self, temp_id: &TaskId) -> bool {
        self.status(temp_id).is_some_and(SyncStatus::is_unsynced)
    }

    /// Current status of a pending creation.
    pub fn status(&self, temp_id: &TaskId) -> Option<&SyncStatus> {
        self.entries.get(temp_id).map(|entry| &entry.status)
    }

    /// Number of creations in flight.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no creation is in flight.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
