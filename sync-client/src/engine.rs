//! SyncEngine - keeps the task list following the remote store.
//!
//! The engine drives the pure [`SubscriptionState`] machine from sync-core
//! and interprets its effects:
//!
//! ```text
//! identity ──► SyncEngine ──► RemoteStore::subscribe
//!                  │                  │ snapshots
//!                  ▼                  ▼
//!          SubscriptionState ◄──── pump task
//!                  │ effects
//!                  ▼
//!        TaskStore / LocalCache
//! ```
//!
//! Every subscription gets its own pump task tagged with a generation
//! number. Cancelling bumps the generation and aborts the pump, so a
//! snapshot from a previous identity is never applied.
//!
//! A snapshot replaces the whole list, but optimistic tasks whose creation
//! is still in flight are carried over until their create is confirmed or
//! rolled back.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex as SyncMutex, RwLock};
use sync_core::{Action, Effect, Event, PendingCreates, SubscriptionState};
use sync_types::OwnerId;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{LocalCache, LocalStorage};
use crate::remote::{RemoteStore, SnapshotResult};
use crate::store::TaskStore;

/// The active identity, shared with the mutation coordinator.
pub(crate) type SharedIdentity = Arc<RwLock<Option<OwnerId>>>;

/// Creations in flight, shared with the mutation coordinator.
pub(crate) type SharedPending = Arc<SyncMutex<PendingCreates>>;

/// Owns the remote subscription for the active identity.
pub struct SyncEngine<R, S> {
    inner: Arc<EngineInner<R, S>>,
}

impl<R, S> Clone for SyncEngine<R, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct EngineInner<R, S> {
    remote: Arc<R>,
    cache: LocalCache<S>,
    store: TaskStore,
    identity: SharedIdentity,
    pending: SharedPending,
    snapshot_buffer: usize,
    generation: AtomicU64,
    control: Mutex<Control>,
}

#[derive(Default)]
struct Control {
    state: SubscriptionState,
    pump: Option<JoinHandle<()>>,
    hydrated: bool,
}

impl<R, S> Drop for EngineInner<R, S> {
    fn drop(&mut self) {
        if let Some(pump) = self.control.get_mut().pump.take() {
            pump.abort();
        }
    }
}

impl<R: RemoteStore, S: LocalStorage> SyncEngine<R, S> {
    /// Create an engine with no identity.
    pub fn new(remote: Arc<R>, cache: LocalCache<S>, store: TaskStore, snapshot_buffer: usize) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                remote,
                cache,
                store,
                identity: Arc::new(RwLock::new(None)),
                pending: Arc::new(SyncMutex::new(PendingCreates::new())),
                snapshot_buffer: snapshot_buffer.max(1),
                generation: AtomicU64::new(0),
                control: Mutex::new(Control::default()),
            }),
        }
    }

    /// The active identity.
    pub fn identity(&self) -> Option<OwnerId> {
        self.inner.identity.read().clone()
    }

    pub(crate) fn shared_identity(&self) -> SharedIdentity {
        Arc::clone(&self.inner.identity)
    }

    pub(crate) fn shared_pending(&self) -> SharedPending {
        Arc::clone(&self.inner.pending)
    }

    /// Current subscription state.
    pub async fn subscription_state(&self) -> SubscriptionState {
        self.inner.control.lock().await.state.clone()
    }

    /// Follow a new (possibly absent) identity.
    ///
    /// Setting the identity that is already active does nothing. The first
    /// identity ever set is hydrated from the local cache before the remote
    /// subscription opens.
    pub async fn set_identity(&self, owner: Option<OwnerId>) {
        let mut control = self.inner.control.lock().await;
        *self.inner.identity.write() = owner.clone();

        if let Some(owner) = &owner {
            if !control.hydrated {
                control.hydrated = true;
                let cached = self.inner.cache.load(owner).await;
                debug!("Hydrated {} tasks from cache", cached.len());
                self.inner
                    .store
                    .dispatch_all([Action::SetTasks(cached), Action::SetLoading(true)]);
            }
        }

        self.inner
            .handle(&mut control, Event::IdentityChanged(owner))
            .await;
    }

    /// Reopen the subscription after it failed. No-op unless degraded.
    pub async fn retry(&self) {
        let mut control = self.inner.control.lock().await;
        self.inner.handle(&mut control, Event::RetryRequested).await;
    }
}

impl<R: RemoteStore, S: LocalStorage> EngineInner<R, S> {
    /// Run an event (and any follow-up events) through the state machine.
    async fn handle(self: &Arc<Self>, control: &mut Control, event: Event) {
        let mut events = VecDeque::from([event]);
        while let Some(event) = events.pop_front() {
            let from_snapshot = matches!(event, Event::SnapshotDelivered(_));
            let (next, effects) = std::mem::take(&mut control.state).on_event(event);
            control.state = next;

            // Consecutive dispatches become visible together.
            let mut batch = Vec::new();
            for effect in effects {
                match effect {
                    Effect::Dispatch(action) => batch.push(action),
                    other => {
                        self.flush(std::mem::take(&mut batch), from_snapshot);
                        if let Some(follow_up) = self.execute(control, other).await {
                            events.push_back(follow_up);
                        }
                    }
                }
            }
            self.flush(batch, from_snapshot);
        }
    }

    fn flush(&self, batch: Vec<Action>, from_snapshot: bool) {
        if batch.is_empty() {
            return;
        }
        if from_snapshot {
            // Same lock order as the coordinator: ledger, then store.
            let pending = self.pending.lock();
            self.store
                .dispatch_keeping(batch, |task| pending.is_live(&task.id));
        } else {
            self.store.dispatch_all(batch);
        }
    }

    async fn execute(self: &Arc<Self>, control: &mut Control, effect: Effect) -> Option<Event> {
        match effect {
            Effect::Dispatch(action) => {
                self.store.dispatch(action);
                None
            }
            Effect::PersistCache(tasks) => {
                self.cache.store(&tasks).await;
                None
            }
            Effect::CancelSubscription => {
                self.generation.fetch_add(1, Ordering::SeqCst);
                if let Some(pump) = control.pump.take() {
                    pump.abort();
                    debug!("Subscription cancelled");
                }
                None
            }
            Effect::OpenSubscription { owner } => {
                let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                let (sink, snapshots) = mpsc::channel(self.snapshot_buffer);
                control.pump = Some(spawn_pump(Arc::downgrade(self), generation, snapshots));

                match self.remote.subscribe(&owner, sink).await {
                    Ok(()) => {
                        info!("Subscribed to tasks of {}", owner);
                        None
                    }
                    Err(e) => {
                        warn!("Failed to subscribe to tasks of {}: {}", owner, e);
                        Some(Event::SubscriptionFailed {
                            error: e.to_string(),
                        })
                    }
                }
            }
        }
    }
}

fn spawn_pump<R: RemoteStore, S: LocalStorage>(
    engine: Weak<EngineInner<R, S>>,
    generation: u64,
    snapshots: mpsc::Receiver<SnapshotResult>,
) -> JoinHandle<()> {
    tokio::spawn(pump(engine, generation, snapshots))
}

/// Feed deliveries from one subscription into the state machine until the
/// subscription ends or is superseded.
async fn pump<R: RemoteStore, S: LocalStorage>(
    engine: Weak<EngineInner<R, S>>,
    generation: u64,
    mut snapshots: mpsc::Receiver<SnapshotResult>,
) {
    while let Some(delivery) = snapshots.recv().await {
        let Some(engine) = engine.upgrade() else {
            break;
        };
        let mut control = engine.control.lock().await;
        if engine.generation.load(Ordering::SeqCst) != generation {
            debug!("Dropping delivery from superseded subscription");
            break;
        }

        let event = match delivery {
            Ok(documents) => {
                debug!("Snapshot delivered: {} records", documents.len());
                Event::SnapshotDelivered(documents)
            }
            Err(e) => {
                warn!("Subscription failed: {}", e);
                Event::SubscriptionFailed {
                    error: e.to_string(),
                }
            }
        };
        engine.handle(&mut control, event).await;
    }
}
