//! # sync-core
//!
//! Pure logic for tasksync (no I/O, instant tests).
//!
//! This crate implements the reducer and state machines behind optimistic
//! task synchronization without any network or disk I/O, enabling fast
//! unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (remote store, local cache) is performed by `sync-client`,
//! which dispatches [`Action`]s and interprets the [`Effect`]s produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ledger;
pub mod ordering;
pub mod state;
pub mod subscription;

pub use ledger::{PendingCreates, Resolution, StatusEvent, SyncStatus};
pub use ordering::{compare_tasks, is_sorted, sort_tasks};
pub use state::{Action, TaskListState};
pub use subscription::{snapshot_to_tasks, Effect, Event, SubscriptionState};
