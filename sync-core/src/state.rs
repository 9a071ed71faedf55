//! Task list reducer for tasksync.
//!
//! [`TaskListState`] is the single aggregate the engine exposes. It is only
//! ever changed through [`TaskListState::reduce`], a pure function over a
//! closed set of [`Action`]s. After every action:
//! - task ids are unique
//! - tasks are in canonical order (see [`crate::ordering`])
//!
//! No action changes a task's owner.

use std::collections::HashSet;

use sync_types::{PriorityFilter, StatusFilter, Task, TaskId, TaskPatch};

use crate::ordering::sort_tasks;

/// State transitions accepted by the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Replace the whole list (a confirmed remote snapshot or cache restore).
    /// Clears `loading` and any sync error.
    SetTasks(Vec<Task>),
    /// Set the loading flag.
    SetLoading(bool),
    /// Change the priority filter (view only).
    SetFilterPriority(PriorityFilter),
    /// Change the status filter (view only).
    SetFilterStatus(StatusFilter),
    /// Insert a task. Ignored if the id is already present.
    AddLocal(Task),
    /// Merge fields into the task with this id. Ignored if absent.
    UpdateLocal {
        /// Target task.
        id: TaskId,
        /// Fields to merge.
        patch: TaskPatch,
    },
    /// Remove the task with this id. Ignored if absent.
    RemoveLocal(TaskId),
    /// Rename a task from its temporary id to its permanent id.
    ReplaceLocalId {
        /// Current (temporary) id.
        temp_id: TaskId,
        /// Remote-assigned id.
        new_id: TaskId,
    },
    /// Record (or clear) a failure of the remote subscription.
    SetSyncError(Option<String>),
}

/// The task list and its view criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListState {
    tasks: Vec<Task>,
    loading: bool,
    filter_priority: PriorityFilter,
    filter_status: StatusFilter,
    sync_error: Option<String>,
}

impl TaskListState {
    /// Initial state: empty and loading.
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            loading: true,
            filter_priority: PriorityFilter::All,
            filter_status: StatusFilter::All,
            sync_error: None,
        }
    }

    /// Apply an action and return the next state.
    ///
    /// This is a pure function - no side effects.
    pub fn reduce(mut self, action: Action) -> Self {
        match action {
            Action::SetTasks(tasks) => {
                self.tasks = dedup_by_id(tasks);
                sort_tasks(&mut self.tasks);
                self.loading = false;
                self.sync_error = None;
            }
            Action::SetLoading(loading) => self.loading = loading,
            Action::SetFilterPriority(filter) => self.filter_priority = filter,
            Action::SetFilterStatus(filter) => self.filter_status = filter,
            Action::AddLocal(task) => {
                if !self.contains(&task.id) {
                    self.tasks.push(task);
                    sort_tasks(&mut self.tasks);
                }
            }
            Action::UpdateLocal { id, patch } => {
                if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
                    task.apply_patch(&patch);
                    sort_tasks(&mut self.tasks);
                }
            }
            Action::RemoveLocal(id) => self.tasks.retain(|t| t.id != id),
            Action::ReplaceLocalId { temp_id, new_id } => {
                if temp_id == new_id || !self.contains(&temp_id) {
                    return self;
                }
                if self.contains(&new_id) {
                    // The confirmed record already arrived via a snapshot.
                    self.tasks.retain(|t| t.id != temp_id);
                } else if let Some(task) = self.tasks.iter_mut().find(|t| t.id == temp_id) {
                    task.id = new_id;
                }
            }
            Action::SetSyncError(error) => self.sync_error = error,
        }
        self
    }

    /// Apply an action in place.
    pub fn apply(&mut self, action: Action) {
        *self = std::mem::take(self).reduce(action);
    }

    /// All tasks in canonical order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Tasks passing both view filters, in canonical order.
    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| self.filter_priority.matches(t) && self.filter_status.matches(t))
            .collect()
    }

    /// Look up a task by id.
    pub fn find(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// Check if a task with this id is present.
    pub fn contains(&self, id: &TaskId) -> bool {
        self.find(id).is_some()
    }

    /// True while the first snapshot for the current identity is awaited.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Current priority filter.
    pub fn filter_priority(&self) -> PriorityFilter {
        self.filter_priority
    }

    /// Current status filter.
    pub fn filter_status(&self) -> StatusFilter {
        self.filter_status
    }

    /// The last subscription error, if sync is degraded.
    pub fn sync_error(&self) -> Option<&str> {
        self.sync_error.as_deref()
    }
}

impl Default for TaskListState {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep the first occurrence of each id.
fn dedup_by_id(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::with_capacity(tasks.len());
    tasks
        .into_iter()
        .filter(|t| seen.insert(t.id.clone()))
        .collect()
}
