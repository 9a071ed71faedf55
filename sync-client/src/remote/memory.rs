//! In-memory remote store.
//!
//! Behaves like a hosted document store: assigns permanent ids and server
//! creation timestamps, and pushes a fresh ordered snapshot to every
//! affected subscriber after each write. Also used for testing: failures can
//! be injected, calls are recorded, and writes can be held open to observe
//! optimistic state.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sync_core::compare_tasks;
use sync_types::{OwnerId, RemoteDocument, RemoteFields, RemoteTimestamp, TaskId};
use tokio::sync::watch;

use super::{RemoteError, RemoteStore, SnapshotResult, SnapshotSink};

/// A call received by [`MemoryRemoteStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    /// `subscribe(owner)`
    Subscribe(OwnerId),
    /// `create(fields)`
    Create(RemoteFields),
    /// `update(id, fields)`
    Update(TaskId, RemoteFields),
    /// `delete(id)`
    Delete(TaskId),
}

/// In-memory remote store. Clones share the same records.
#[derive(Debug, Clone)]
pub struct MemoryRemoteStore {
    inner: Arc<Mutex<Inner>>,
    // Serializes fan-out so subscribers never see snapshots out of order.
    publish: Arc<tokio::sync::Mutex<()>>,
    hold: Arc<watch::Sender<bool>>,
}

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<String, RemoteFields>,
    subscribers: Vec<Subscriber>,
    last_created: Option<RemoteTimestamp>,
    calls: Vec<RemoteCall>,
    fail_next_subscribe: Option<RemoteError>,
    fail_next_create: Option<RemoteError>,
    fail_next_update: Option<RemoteError>,
    fail_next_delete: Option<RemoteError>,
}

#[derive(Debug)]
struct Subscriber {
    owner: OwnerId,
    sink: SnapshotSink,
}

impl Inner {
    fn snapshot(&self, owner: &OwnerId) -> Vec<RemoteDocument> {
        let mut matching: Vec<_> = self
            .records
            .iter()
            .filter(|(_, fields)| fields.owner.as_ref() == Some(owner))
            .map(|(id, fields)| {
                let doc = RemoteDocument::new(id.clone(), fields.clone());
                (doc.clone().into_task(owner), doc)
            })
            .collect();
        matching.sort_by(|a, b| compare_tasks(&a.0, &b.0));
        matching.into_iter().map(|(_, doc)| doc).collect()
    }

    /// Server timestamps are strictly increasing.
    fn next_created_at(&mut self) -> RemoteTimestamp {
        let mut now = RemoteTimestamp::now();
        if let Some(last) = self.last_created {
            if now <= last {
                now = if last.nanos < 999_999_999 {
                    RemoteTimestamp {
                        seconds: last.seconds,
                        nanos: last.nanos + 1,
                    }
                } else {
                    RemoteTimestamp {
                        seconds: last.seconds + 1,
                        nanos: 0,
                    }
                };
            }
        }
        self.last_created = Some(now);
        now
    }

    fn deliveries(&mut self, owners: &BTreeSet<OwnerId>) -> Vec<(SnapshotSink, SnapshotResult)> {
        self.subscribers.retain(|sub| !sub.sink.is_closed());
        self.subscribers
            .iter()
            .filter(|sub| owners.contains(&sub.owner))
            .map(|sub| (sub.sink.clone(), Ok(self.snapshot(&sub.owner))))
            .collect()
    }
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        let (hold, _) = watch::channel(false);
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            publish: Arc::new(tokio::sync::Mutex::new(())),
            hold: Arc::new(hold),
        }
    }
}

impl MemoryRemoteStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with records.
    pub fn from_documents(documents: impl IntoIterator<Item = RemoteDocument>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock();
            for doc in documents {
                if let Some(created) = doc.fields.created_at {
                    if inner.last_created.map_or(true, |last| created > last) {
                        inner.last_created = Some(created);
                    }
                }
                inner.records.insert(doc.id, doc.fields);
            }
        }
        store
    }

    /// All records, ordered by id.
    pub fn documents(&self) -> Vec<RemoteDocument> {
        let inner = self.inner.lock();
        inner
            .records
            .iter()
            .map(|(id, fields)| RemoteDocument::new(id.clone(), fields.clone()))
            .collect()
    }

    /// Get a single record.
    pub fn get(&self, id: &str) -> Option<RemoteDocument> {
        let inner = self.inner.lock();
        inner
            .records
            .get(id)
            .map(|fields| RemoteDocument::new(id, fields.clone()))
    }

    /// Get every call received so far.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.inner.lock().calls.clone()
    }

    /// Number of live subscriptions for `owner`.
    pub fn subscriber_count(&self, owner: &OwnerId) -> usize {
        let inner = self.inner.lock();
        inner
            .subscribers
            .iter()
            .filter(|sub| &sub.owner == owner && !sub.sink.is_closed())
            .count()
    }

    /// Cause the next subscribe() to fail with the given error.
    pub fn fail_next_subscribe(&self, error: RemoteError) {
        self.inner.lock().fail_next_subscribe = Some(error);
    }

    /// Cause the next create() to fail with the given error.
    pub fn fail_next_create(&self, error: RemoteError) {
        self.inner.lock().fail_next_create = Some(error);
    }

    /// Cause the next update() to fail with the given error.
    pub fn fail_next_update(&self, error: RemoteError) {
        self.inner.lock().fail_next_update = Some(error);
    }

    /// Cause the next delete() to fail with the given error.
    pub fn fail_next_delete(&self, error: RemoteError) {
        self.inner.lock().fail_next_delete = Some(error);
    }

    /// Deliver an error to every live subscription for `owner`.
    pub async fn fail_subscriptions(&self, owner: &OwnerId, error: RemoteError) {
        let _publish = self.publish.lock().await;
        let sinks: Vec<_> = {
            let inner = self.inner.lock();
            inner
                .subscribers
                .iter()
                .filter(|sub| &sub.owner == owner)
                .map(|sub| sub.sink.clone())
                .collect()
        };
        for sink in sinks {
            let _ = sink.send(Err(error.clone())).await;
        }
    }

    /// Insert or replace a record directly, as another client would.
    pub async fn insert(&self, doc: RemoteDocument) {
        let _publish = self.publish.lock().await;
        let deliveries = {
            let mut inner = self.inner.lock();
            let mut owners = BTreeSet::new();
            if let Some(previous) = inner.records.get(&doc.id).and_then(|f| f.owner.clone()) {
                owners.insert(previous);
            }
            owners.extend(doc.fields.owner.clone());
            inner.records.insert(doc.id, doc.fields);
            inner.deliveries(&owners)
        };
        deliver(deliveries).await;
    }

    /// Remove a record directly, as another client would.
    pub async fn remove(&self, id: &str) {
        let _publish = self.publish.lock().await;
        let deliveries = {
            let mut inner = self.inner.lock();
            let owners: BTreeSet<_> = inner
                .records
                .remove(id)
                .and_then(|fields| fields.owner)
                .into_iter()
                .collect();
            inner.deliveries(&owners)
        };
        deliver(deliveries).await;
    }

    /// Hold every subsequent write open until [`release_writes`] is called.
    ///
    /// Calls are still recorded on arrival.
    ///
    /// [`release_writes`]: Self::release_writes
    pub fn hold_writes(&self) {
        self.hold.send_replace(true);
    }

    /// Let held writes complete.
    pub fn release_writes(&self) {
        self.hold.send_replace(false);
    }

    async fn wait_released(&self) {
        let mut released = self.hold.subscribe();
        // The sender lives in self, so the channel cannot close here.
        let _ = released.wait_for(|held| !*held).await;
    }
}

async fn deliver(deliveries: Vec<(SnapshotSink, SnapshotResult)>) {
    for (sink, snapshot) in deliveries {
        // A closed sink is a cancelled subscription.
        let _ = sink.send(snapshot).await;
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn subscribe(&self, owner: &OwnerId, sink: SnapshotSink) -> Result<(), RemoteError> {
        let _publish = self.publish.lock().await;
        let initial = {
            let mut inner = self.inner.lock();
            inner.calls.push(RemoteCall::Subscribe(owner.clone()));
            if let Some(error) = inner.fail_next_subscribe.take() {
                return Err(error);
            }
            inner.subscribers.push(Subscriber {
                owner: owner.clone(),
                sink: sink.clone(),
            });
            inner.snapshot(owner)
        };
        let _ = sink.send(Ok(initial)).await;
        Ok(())
    }

    async fn create(&self, mut fields: RemoteFields) -> Result<TaskId, RemoteError> {
        self.inner.lock().calls.push(RemoteCall::Create(fields.clone()));
        self.wait_released().await;

        let _publish = self.publish.lock().await;
        let (id, deliveries) = {
            let mut inner = self.inner.lock();
            if let Some(error) = inner.fail_next_create.take() {
                return Err(error);
            }
            let id = uuid::Uuid::new_v4().simple().to_string();
            fields.created_at = Some(inner.next_created_at());
            let owners: BTreeSet<_> = fields.owner.clone().into_iter().collect();
            inner.records.insert(id.clone(), fields);
            (id, inner.deliveries(&owners))
        };
        deliver(deliveries).await;
        Ok(TaskId::from(id))
    }

    async fn update(&self, id: &TaskId, fields: RemoteFields) -> Result<(), RemoteError> {
        self.inner
            .lock()
            .calls
            .push(RemoteCall::Update(id.clone(), fields.clone()));
        self.wait_released().await;

        let _publish = self.publish.lock().await;
        let deliveries = {
            let mut inner = self.inner.lock();
            if let Some(error) = inner.fail_next_update.take() {
                return Err(error);
            }
            let record = inner
                .records
                .get_mut(id.as_str())
                .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
            let mut owners: BTreeSet<_> = record.owner.clone().into_iter().collect();
            record.merge(fields);
            owners.extend(record.owner.clone());
            inner.deliveries(&owners)
        };
        deliver(deliveries).await;
        Ok(())
    }

    async fn delete(&self, id: &TaskId) -> Result<(), RemoteError> {
        self.inner.lock().calls.push(RemoteCall::Delete(id.clone()));
        self.wait_released().await;

        let _publish = self.publish.lock().await;
        let deliveries = {
            let mut inner = self.inner.lock();
            if let Some(error) = inner.fail_next_delete.take() {
                return Err(error);
            }
            // Deleting a missing record succeeds.
            let owners: BTreeSet<_> = inner
                .records
                .remove(id.as_str())
                .and_then(|fields| fields.owner)
                .into_iter()
                .collect();
            inner.deliveries(&owners)
        };
        deliver(deliveries).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_types::{NewTask, Priority, TaskPatch};
    use tokio::sync::mpsc;

    fn owner() -> OwnerId {
        OwnerId::new("user-1")
    }

    fn fields(title: &str, due: &str) -> RemoteFields {
        RemoteFields::for_create(&NewTask::new(title, due), &owner())
    }

    fn titles(snapshot: &[RemoteDocument]) -> Vec<&str> {
        snapshot
            .iter()
            .map(|doc| doc.fields.title.as_deref().unwrap_or(""))
            .collect()
    }

    // ===========================================
    // Write Tests
    // ===========================================

    #[tokio::test]
    async fn create_assigns_permanent_id_and_timestamp() {
        let store = MemoryRemoteStore::new();
        let id = store.create(fields("a", "2025-01-01")).await.unwrap();

        assert!(id.is_permanent());
        let doc = store.get(id.as_str()).unwrap();
        assert!(doc.fields.created_at.is_some());
        assert_eq!(store.calls().len(), 1);
    }

    #[tokio::test]
    async fn created_timestamps_strictly_increase() {
        let store = MemoryRemoteStore::new();
        let a = store.create(fields("a", "2025-01-01")).await.unwrap();
        let b = store.create(fields("b", "2025-01-01")).await.unwrap();

        let ts_a = store.get(a.as_str()).unwrap().fields.created_at.unwrap();
        let ts_b = store.get(b.as_str()).unwrap().fields.created_at.unwrap();
        assert!(ts_b > ts_a);
    }

    #[tokio::test]
    async fn update_merges_set_fields() {
        let store = MemoryRemoteStore::new();
        let id = store.create(fields("a", "2025-01-01")).await.unwrap();
        store
            .update(
                &id,
                RemoteFields::from_patch(&TaskPatch::new().with_priority(Priority::High)),
            )
            .await
            .unwrap();

        let doc = store.get(id.as_str()).unwrap();
        assert_eq!(doc.fields.priority.as_deref(), Some("high"));
        assert_eq!(doc.fields.title.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn update_missing_record_fails() {
        let store = MemoryRemoteStore::new();
        let result = store
            .update(&TaskId::from("nope"), RemoteFields::default())
            .await;
        assert!(matches!(result, Err(RemoteError::NotFound(_))));
    }

    #[tokio::test]
    async fn injected_failures_fire_once() {
        let store = MemoryRemoteStore::new();
        store.fail_next_create(RemoteError::Unavailable("offline".into()));

        assert!(store.create(fields("a", "2025-01-01")).await.is_err());
        assert!(store.create(fields("a", "2025-01-01")).await.is_ok());
        assert_eq!(store.documents().len(), 1);
    }

    // ===========================================
    // Subscription Tests
    // ===========================================

    #[tokio::test]
    async fn subscribe_delivers_initial_ordered_snapshot() {
        let store = MemoryRemoteStore::new();
        store.create(fields("late", "2025-03-01")).await.unwrap();
        store.create(fields("early", "2025-01-01")).await.unwrap();

        let (tx, mut rx) = mpsc::channel(4);
        store.subscribe(&owner(), tx).await.unwrap();

        let snapshot = rx.recv().await.unwrap().unwrap();
        assert_eq!(titles(&snapshot), ["early", "late"]);
    }

    #[tokio::test]
    async fn writes_push_snapshots_to_owner_only() {
        let store = MemoryRemoteStore::new();
        let (tx, mut rx) = mpsc::channel(4);
        store.subscribe(&owner(), tx).await.unwrap();
        let (other_tx, mut other_rx) = mpsc::channel(4);
        store
            .subscribe(&OwnerId::new("someone-else"), other_tx)
            .await
            .unwrap();
        assert!(rx.recv().await.unwrap().unwrap().is_empty());
        assert!(other_rx.recv().await.unwrap().unwrap().is_empty());

        store.create(fields("mine", "2025-01-01")).await.unwrap();

        let snapshot = rx.recv().await.unwrap().unwrap();
        assert_eq!(titles(&snapshot), ["mine"]);
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_receiver_ends_subscription() {
        let store = MemoryRemoteStore::new();
        let (tx, rx) = mpsc::channel(4);
        store.subscribe(&owner(), tx).await.unwrap();
        assert_eq!(store.subscriber_count(&owner()), 1);

        drop(rx);
        assert_eq!(store.subscriber_count(&owner()), 0);
        // Writes after cancellation still succeed.
        store.create(fields("a", "2025-01-01")).await.unwrap();
    }

    #[tokio::test]
    async fn subscription_errors_are_delivered() {
        let store = MemoryRemoteStore::new();
        let (tx, mut rx) = mpsc::channel(4);
        store.subscribe(&owner(), tx).await.unwrap();
        rx.recv().await.unwrap().unwrap();

        store
            .fail_subscriptions(&owner(), RemoteError::PermissionDenied("revoked".into()))
            .await;
        assert!(matches!(
            rx.recv().await.unwrap(),
            Err(RemoteError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn held_writes_complete_after_release() {
        let store = MemoryRemoteStore::new();
        store.hold_writes();

        let writer = store.clone();
        let pending =
            tokio::spawn(async move { writer.create(fields("a", "2025-01-01")).await });
        tokio::task::yield_now().await;

        assert!(store.documents().is_empty());
        store.release_writes();
        pending.await.unwrap().unwrap();
        assert_eq!(store.documents().len(), 1);
    }
}
