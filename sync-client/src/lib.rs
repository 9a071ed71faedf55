//! # sync-client
//!
//! Optimistic task sync engine for tasksync.
//!
//! This is the main library that applications use to manage a user's task
//! list against a remote store.
//!
//! ## Features
//!
//! - **Optimistic Mutations**: create/update/delete show up locally at once
//!   and roll back if the remote write fails
//! - **Id Reconciliation**: temporary ids are swapped for permanent ones when
//!   the remote store confirms a creation; edits made meanwhile are replayed
//! - **Snapshot Subscription**: one subscription per identity, cancelled
//!   before the next opens
//! - **Local Cache**: last confirmed list for instant cold start
//! - **Pure State Machines**: uses sync-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use sync_client::{FileStorage, MemoryRemoteStore, SyncConfig, TaskSync};
//! use sync_types::{NewTask, OwnerId, TaskPatch};
//!
//! let sync = TaskSync::new(remote, FileStorage::new(cache_dir), SyncConfig::default());
//! sync.set_identity(Some(OwnerId::new("user-1"))).await;
//!
//! let id = sync.create_task(NewTask::new("Write report", "2025-01-01")).await?;
//! sync.update_task(&id, TaskPatch::new().with_completed(true)).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod client;
pub mod coordinator;
pub mod engine;
pub mod remote;
pub mod store;

pub use cache::{FileStorage, LocalCache, LocalStorage, MemoryStorage, StorageError};
pub use client::{
    AuthState, SyncConfig, TaskSync, TaskSyncError, DEFAULT_CACHE_KEY, DEFAULT_SNAPSHOT_BUFFER,
};
pub use coordinator::MutationCoordinator;
pub use engine::SyncEngine;
pub use remote::{
    MemoryRemoteStore, RemoteCall, RemoteError, RemoteStore, SnapshotResult, SnapshotSink,
};
pub use store::TaskStore;
