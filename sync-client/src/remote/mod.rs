//! Remote store abstraction for tasksync.
//!
//! The remote store is the authority for task records. It is reachable only
//! asynchronously and reports changes as full snapshots over a subscription.
//!
//! # Design
//!
//! - `subscribe()` registers a sink that receives every snapshot of records
//!   owned by one identity, ordered by due date then creation time. The
//!   subscription ends when the receiving half of the sink is dropped.
//! - `create()` stores a new record and returns its permanent id. The store
//!   assigns `createdAt`.
//! - `update()` merges the set fields into an existing record.
//! - `delete()` removes a record.

mod memory;

pub use memory::{MemoryRemoteStore, RemoteCall};

use async_trait::async_trait;
use sync_types::{OwnerId, RemoteDocument, RemoteFields, TaskId};
use thiserror::Error;
use tokio::sync::mpsc;

/// Remote store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The store could not be reached.
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    /// The caller is not allowed to perform the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// No record with the given id.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The store refused the write.
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// One delivery on a subscription: a complete snapshot or an error.
pub type SnapshotResult = Result<Vec<RemoteDocument>, RemoteError>;

/// Sending half of a subscription.
pub type SnapshotSink = mpsc::Sender<SnapshotResult>;

/// Remote store trait.
///
/// Implementations handle the actual storage backend (hosted document
/// store, in-memory, file-backed, etc).
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Subscribe to snapshots of the records owned by `owner`.
    ///
    /// Snapshots are delivered to `sink` until its receiver is dropped.
    async fn subscribe(&self, owner: &OwnerId, sink: SnapshotSink) -> Result<(), RemoteError>;

    /// Create a record and return the permanent id assigned to it.
    async fn create(&self, fields: RemoteFields) -> Result<TaskId, RemoteError>;

    /// Merge the set fields into the record with `id`.
    async fn update(&self, id: &TaskId, fields: RemoteFields) -> Result<(), RemoteError>;

    /// Delete the record with `id`.
    async fn delete(&self, id: &TaskId) -> Result<(), RemoteError>;
}
