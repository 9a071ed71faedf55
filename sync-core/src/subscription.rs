//! Subscription state machine for tasksync.
//!
//! This module provides a pure, side-effect-free state machine tracking the
//! active identity and its remote subscription. It takes events as input and
//! produces a new state plus a list of effects to execute.
//!
//! The actual I/O (opening the remote subscription, writing the local cache)
//! is performed by sync-client, not by this module.
//!
//! Exactly one subscription is active per identity. Every transition to a
//! new identity emits [`Effect::CancelSubscription`] before
//! [`Effect::OpenSubscription`], so two snapshot streams never feed the same
//! state.

use sync_types::{OwnerId, RemoteDocument, Task, TaskId};

use crate::state::Action;

/// Subscription state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionState {
    /// No authenticated identity; the task list is empty.
    NoIdentity,
    /// Subscription opened, first snapshot not yet delivered.
    Subscribing {
        /// Identity whose tasks are subscribed.
        owner: OwnerId,
    },
    /// At least one snapshot delivered.
    Subscribed {
        /// Identity whose tasks are subscribed.
        owner: OwnerId,
    },
    /// The subscription reported an error; the last known list is kept.
    Degraded {
        /// Identity whose tasks are subscribed.
        owner: OwnerId,
        /// Error reported by the remote store.
        error: String,
    },
}

impl SubscriptionState {
    /// Create a new state machine with no identity.
    pub fn new() -> Self {
        Self::NoIdentity
    }

    /// Process an event and return the new state plus effects to execute.
    ///
    /// This is a pure function - no side effects. The caller (sync-client)
    /// is responsible for executing the returned effects in order.
    pub fn on_event(self, event: Event) -> (Self, Vec<Effect>) {
        match (self, event) {
            // Identity cleared
            (Self::NoIdentity, Event::IdentityChanged(None)) => (
                Self::NoIdentity,
                vec![
                    Effect::Dispatch(Action::SetTasks(Vec::new())),
                    Effect::Dispatch(Action::SetLoading(false)),
                ],
            ),
            (_, Event::IdentityChanged(None)) => (
                Self::NoIdentity,
                vec![
                    Effect::CancelSubscription,
                    Effect::Dispatch(Action::SetTasks(Vec::new())),
                    Effect::Dispatch(Action::SetLoading(false)),
                ],
            ),

            // Identity set for the first time
            (Self::NoIdentity, Event::IdentityChanged(Some(owner))) => (
                Self::Subscribing {
                    owner: owner.clone(),
                },
                vec![
                    Effect::Dispatch(Action::SetLoading(true)),
                    Effect::OpenSubscription { owner },
                ],
            ),

            // Identity set while one is active
            (state, Event::IdentityChanged(Some(owner))) => {
                if state.owner() == Some(&owner) {
                    return (state, vec![]);
                }
                (
                    Self::Subscribing {
                        owner: owner.clone(),
                    },
                    vec![
                        Effect::CancelSubscription,
                        // Tasks of the previous identity must not linger.
                        Effect::Dispatch(Action::SetTasks(Vec::new())),
                        Effect::Dispatch(Action::SetLoading(true)),
                        Effect::OpenSubscription { owner },
                    ],
                )
            }

            // Snapshot delivery
            (
                Self::Subscribing { owner }
                | Self::Subscribed { owner }
                | Self::Degraded { owner, .. },
                Event::SnapshotDelivered(documents),
            ) => {
                let tasks = snapshot_to_tasks(&owner, documents);
                (
                    Self::Subscribed { owner },
                    vec![
                        Effect::Dispatch(Action::SetTasks(tasks.clone())),
                        Effect::PersistCache(tasks),
                    ],
                )
            }

            // Subscription error
            (
                Self::Subscribing { owner }
                | Self::Subscribed { owner }
                | Self::Degraded { owner, .. },
                Event::SubscriptionFailed { error },
            ) => (
                Self::Degraded {
                    owner,
                    error: error.clone(),
                },
                vec![
                    Effect::Dispatch(Action::SetLoading(false)),
                    Effect::Dispatch(Action::SetSyncError(Some(error))),
                ],
            ),

            // Retry after a failure
            (Self::Degraded { owner, .. }, Event::RetryRequested) => (
                Self::Subscribing {
                    owner: owner.clone(),
                },
                vec![
                    Effect::CancelSubscription,
                    Effect::Dispatch(Action::SetLoading(true)),
                    Effect::OpenSubscription { owner },
                ],
            ),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// The active identity, if any.
    pub fn owner(&self) -> Option<&OwnerId> {
        match self {
            Self::NoIdentity => None,
            Self::Subscribing { owner }
            | Self::Subscribed { owner }
            | Self::Degraded { owner, .. } => Some(owner),
        }
    }

    /// Check if a snapshot has been delivered for the current identity.
    pub fn is_subscribed(&self) -> bool {
        matches!(self, Self::Subscribed { .. })
    }

    /// Check if the subscription has failed.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

impl Default for SubscriptionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Events that can occur in the subscription lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The identity provider reported a (possibly absent) identity.
    IdentityChanged(Option<OwnerId>),
    /// The remote subscription delivered a full snapshot.
    SnapshotDelivered(Vec<RemoteDocument>),
    /// The remote subscription reported an error.
    SubscriptionFailed {
        /// Error message from the remote store.
        error: String,
    },
    /// The consumer asked to resubscribe after a failure.
    RetryRequested,
}

/// Effects to be executed by the sync-client.
///
/// These are instructions, not side effects. The sync-client interprets
/// these and performs the actual I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Cancel the active remote subscription, if any.
    CancelSubscription,
    /// Open a remote subscription for tasks owned by `owner`, ordered by
    /// due date then creation time.
    OpenSubscription {
        /// Identity to filter on.
        owner: OwnerId,
    },
    /// Dispatch an action into the task list reducer.
    Dispatch(Action),
    /// Overwrite the local cache with this list. Failures are ignored.
    PersistCache(Vec<Task>),
}

/// Map a remote snapshot to tasks for `owner`.
///
/// Records are repaired with defaults (see [`RemoteDocument::into_task`]).
/// Records explicitly owned by someone else are dropped, as are records
/// whose id is not a valid permanent id.
pub fn snapshot_to_tasks(owner: &OwnerId, documents: Vec<RemoteDocument>) -> Vec<Task> {
    documents
        .into_iter()
        .filter(|doc| TaskId::permanent(doc.id.as_str()).is_ok())
        .map(|doc| doc.into_task(owner))
        .filter(|task| &task.owner == owner)
        .collect()
}
