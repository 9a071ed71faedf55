//! Serialized access to the shared task-list state.
//!
//! [`TaskStore`] owns the single [`TaskListState`]. Every transition goes
//! through [`TaskStore::dispatch`], which applies the reducer inside one
//! watch-channel critical section: dispatches never interleave, and
//! observers are notified after each one with a state that is already
//! sorted and unique by id.

use std::sync::Arc;

use sync_core::{Action, TaskListState};
use sync_types::{Task, TaskId};
use tokio::sync::watch;

/// Handle to the shared task-list state. Clones share the same state.
#[derive(Debug, Clone)]
pub struct TaskStore {
    tx: Arc<watch::Sender<TaskListState>>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    /// Create a store holding the initial (loading, empty) state.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(TaskListState::new());
        Self { tx: Arc::new(tx) }
    }

    /// Apply an action.
    pub fn dispatch(&self, action: Action) {
        self.tx.send_modify(|state| state.apply(action));
    }

    /// Apply several actions in one critical section. Observers only see the
    /// state after the last one.
    pub fn dispatch_all(&self, actions: impl IntoIterator<Item = Action>) {
        self.tx.send_modify(|state| {
            for action in actions {
                state.apply(action);
            }
        });
    }

    /// Like [`dispatch_all`](Self::dispatch_all), but tasks selected by
    /// `keep` before the actions ran are added back afterwards, unless their
    /// id is present again.
    pub fn dispatch_keeping(
        &self,
        actions: impl IntoIterator<Item = Action>,
        keep: impl Fn(&Task) -> bool,
    ) {
        self.tx.send_modify(|state| {
            let kept: Vec<Task> = state.tasks().iter().filter(|t| keep(t)).cloned().collect();
            for action in actions {
                state.apply(action);
            }
            for task in kept {
                state.apply(Action::AddLocal(task));
            }
        });
    }

    /// Apply the action chosen by `decide`, evaluated against the current
    /// state in the same critical section. Returns whether one was applied.
    pub fn dispatch_if<F>(&self, decide: F) -> bool
    where
        F: FnOnce(&TaskListState) -> Option<Action>,
    {
        self.tx.send_if_modified(|state| match decide(state) {
            Some(action) => {
                state.apply(action);
                true
            }
            None => false,
        })
    }

    /// Run `f` against the current state.
    pub fn read<T>(&self, f: impl FnOnce(&TaskListState) -> T) -> T {
        f(&self.tx.borrow())
    }

    /// Clone the current state.
    pub fn snapshot(&self) -> TaskListState {
        self.tx.borrow().clone()
    }

    /// Clone the task with `id`, if present.
    pub fn find(&self, id: &TaskId) -> Option<Task> {
        self.read(|state| state.find(id).cloned())
    }

    /// Check if a task with `id` is present.
    pub fn contains(&self, id: &TaskId) -> bool {
        self.read(|state| state.contains(id))
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<TaskListState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_types::{NewTask, OwnerId};

    fn task(id: &str, due: &str) -> Task {
        NewTask::new(id, due).into_task(TaskId::from(id), OwnerId::new("u"), None)
    }

    #[test]
    fn dispatch_applies_reducer() {
        let store = TaskStore::new();
        store.dispatch(Action::SetTasks(vec![task("b", "2025-02-01"), task("a", "2025-01-01")]));

        let state = store.snapshot();
        assert!(!state.is_loading());
        assert_eq!(state.tasks()[0].id.as_str(), "a");
        assert!(store.contains(&TaskId::from("b")));
    }

    #[test]
    fn dispatch_if_skips_when_declined() {
        let store = TaskStore::new();
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        let applied = store.dispatch_if(|state| {
            state
                .find(&TaskId::from("missing"))
                .map(|_| Action::RemoveLocal(TaskId::from("missing")))
        });

        assert!(!applied);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn dispatch_all_notifies_once() {
        let store = TaskStore::new();
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        store.dispatch_all([
            Action::SetTasks(vec![task("a", "2025-01-01")]),
            Action::SetLoading(true),
        ]);

        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update();
        assert!(state.is_loading());
        assert_eq!(state.tasks().len(), 1);
    }

    #[test]
    fn dispatch_keeping_carries_selected_tasks_over_replace() {
        let store = TaskStore::new();
        store.dispatch_all([
            Action::AddLocal(task("local-1", "2025-03-01")),
            Action::AddLocal(task("old", "2025-01-01")),
        ]);

        store.dispatch_keeping(
            [Action::SetTasks(vec![task("new", "2025-02-01")])],
            |t| t.id.is_temporary(),
        );

        let ids: Vec<_> = store
            .snapshot()
            .tasks()
            .iter()
            .map(|t| t.id.as_str().to_string())
            .collect();
        assert_eq!(ids, ["new", "local-1"]);
    }

    #[test]
    fn dispatch_keeping_does_not_duplicate_ids() {
        let store = TaskStore::new();
        store.dispatch(Action::AddLocal(task("local-1", "2025-03-01")));

        store.dispatch_keeping(
            [Action::SetTasks(vec![task("local-1", "2025-01-01")])],
            |_| true,
        );

        let state = store.snapshot();
        assert_eq!(state.tasks().len(), 1);
        assert_eq!(state.tasks()[0].due_date, "2025-01-01");
    }

    #[tokio::test]
    async fn observers_see_each_dispatch() {
        let store = TaskStore::new();
        let mut rx = store.subscribe();

        store.dispatch(Action::AddLocal(task("a", "2025-01-01")));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().tasks().len(), 1);

        store.dispatch(Action::RemoveLocal(TaskId::from("a")));
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().tasks().is_empty());
    }
}
