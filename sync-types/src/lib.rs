//! # sync-types
//!
//! Data model for tasksync.
//!
//! This crate provides the foundational types used across all tasksync crates:
//! - [`TaskId`], [`OwnerId`] - Identity types (temporary vs permanent task ids)
//! - [`Task`], [`TaskPatch`], [`NewTask`] - The task entity and its mutations
//! - [`PriorityFilter`], [`StatusFilter`] - View-level selection criteria
//! - [`RemoteDocument`], [`RemoteFields`], [`RemoteTimestamp`] - Remote-native records
//! - [`TypesError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod filter;
mod ids;
mod record;
mod task;
pub mod time;

pub use error::TypesError;
pub use filter::{PriorityFilter, StatusFilter};
pub use ids::{OwnerId, TaskId, TEMP_ID_PREFIX};
pub use record::{DueDateValue, RemoteDocument, RemoteFields, RemoteTimestamp};
pub use task::{NewTask, Priority, Task, TaskPatch};
