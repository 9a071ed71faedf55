//! The task entity and the payloads that mutate it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{OwnerId, TaskId, TypesError};

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low priority
    Low,
    /// Medium priority (the default for new and repaired records)
    #[default]
    Medium,
    /// High priority
    High,
}

impl Priority {
    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(TypesError::InvalidPriority(s.to_string())),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work owned by a single user.
///
/// Serialized with the field names used by the local cache blob
/// (`dueDate`, `userId`, `createdAt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Temporary or permanent identifier.
    pub id: TaskId,
    /// Short title.
    #[serde(default)]
    pub title: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Calendar date (`YYYY-MM-DD`). May be empty or malformed when repaired
    /// from a remote record; such tasks sort first.
    #[serde(default)]
    pub due_date: String,
    /// Priority.
    #[serde(default)]
    pub priority: Priority,
    /// Completion flag.
    #[serde(default)]
    pub completed: bool,
    /// Owning identity.
    #[serde(rename = "userId")]
    pub owner: OwnerId,
    /// ISO creation timestamp. Absent only while a creation is in flight
    /// or when the remote record lacks one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Task {
    /// Check if this task has not yet been confirmed by the remote store.
    pub fn is_temporary(&self) -> bool {
        self.id.is_temporary()
    }

    /// Merge the set fields of `patch` into this task.
    ///
    /// `id`, `owner` and `created_at` are never touched.
    pub fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(due_date) = &patch.due_date {
            self.due_date = due_date.clone();
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
    }

    /// A patch that restores every mutable field to its current value.
    ///
    /// Used as the rollback snapshot for a failed update.
    pub fn to_patch(&self) -> TaskPatch {
        TaskPatch {
            title: Some(self.title.clone()),
            description: Some(self.description.clone()),
            due_date: Some(self.due_date.clone()),
            priority: Some(self.priority),
            completed: Some(self.completed),
        }
    }
}

/// A partial set of task fields for an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New due date (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// New priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// New completion flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskPatch {
    /// Create an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the due date.
    pub fn with_due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the completion flag.
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// Check if no field is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.priority.is_none()
            && self.completed.is_none()
    }

    /// Fold a later patch into this one; fields set in `later` win.
    pub fn merge(&mut self, later: TaskPatch) {
        if later.title.is_some() {
            self.title = later.title;
        }
        if later.description.is_some() {
            self.description = later.description;
        }
        if later.due_date.is_some() {
            self.due_date = later.due_date;
        }
        if later.priority.is_some() {
            self.priority = later.priority;
        }
        if later.completed.is_some() {
            self.completed = later.completed;
        }
    }
}

/// Payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    /// Title (required, trimmed).
    pub title: String,
    /// Description (trimmed, may be empty).
    #[serde(default)]
    pub description: String,
    /// Due date `YYYY-MM-DD` (required, trimmed).
    pub due_date: String,
    /// Priority.
    #[serde(default)]
    pub priority: Priority,
}

impl NewTask {
    /// Create a payload with the required fields.
    pub fn new(title: impl Into<String>, due_date: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            due_date: due_date.into(),
            priority: Priority::default(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Trim text fields and reject an empty title or due date.
    pub fn validated(self) -> Result<Self, TypesError> {
        let title = self.title.trim().to_string();
        let due_date = self.due_date.trim().to_string();
        if title.is_empty() {
            return Err(TypesError::EmptyField("title"));
        }
        if due_date.is_empty() {
            return Err(TypesError::EmptyField("due date"));
        }
        Ok(Self {
            title,
            description: self.description.trim().to_string(),
            due_date,
            priority: self.priority,
        })
    }

    /// Build the task this payload creates.
    pub fn into_task(self, id: TaskId, owner: OwnerId, created_at: Option<String>) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            due_date: self.due_date,
            priority: self.priority,
            completed: false,
            owner,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Task {
        NewTask::new("Write report", "2025-01-01")
            .with_priority(Priority::Low)
            .into_task(
                TaskId::from("abc"),
                OwnerId::new("user-1"),
                Some("2024-12-01T00:00:00.000Z".into()),
            )
    }

    #[test]
    fn priority_parse_and_display() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" low ".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
        assert_eq!(Priority::Medium.to_string(), "medium");
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn apply_patch_sets_only_given_fields() {
        let mut task = sample();
        task.apply_patch(&TaskPatch::new().with_priority(Priority::High).with_completed(true));
        assert_eq!(task.priority, Priority::High);
        assert!(task.completed);
        assert_eq!(task.title, "Write report");
        assert_eq!(task.due_date, "2025-01-01");
    }

    #[test]
    fn to_patch_restores_prior_values() {
        let original = sample();
        let rollback = original.to_patch();
        let mut task = original.clone();
        task.apply_patch(
            &TaskPatch::new()
                .with_title("changed")
                .with_due_date("2030-01-01")
                .with_priority(Priority::High),
        );
        task.apply_patch(&rollback);
        assert_eq!(task, original);
    }

    #[test]
    fn merge_later_fields_win() {
        let mut first = TaskPatch::new().with_title("a").with_completed(true);
        first.merge(TaskPatch::new().with_title("b").with_priority(Priority::Low));
        assert_eq!(first.title.as_deref(), Some("b"));
        assert_eq!(first.completed, Some(true));
        assert_eq!(first.priority, Some(Priority::Low));
        assert!(!first.is_empty());
        assert!(TaskPatch::new().is_empty());
    }

    #[test]
    fn validated_trims_and_rejects_empty() {
        let task = NewTask::new("  Title  ", " 2025-02-02 ")
            .with_description("  notes ")
            .validated()
            .unwrap();
        assert_eq!(task.title, "Title");
        assert_eq!(task.due_date, "2025-02-02");
        assert_eq!(task.description, "notes");

        assert_eq!(
            NewTask::new("   ", "2025-01-01").validated(),
            Err(TypesError::EmptyField("title"))
        );
        assert_eq!(
            NewTask::new("x", "").validated(),
            Err(TypesError::EmptyField("due date"))
        );
    }

    #[test]
    fn new_tasks_start_incomplete() {
        assert!(!sample().completed);
    }

    #[test]
    fn cache_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["dueDate"], "2025-01-01");
        assert_eq!(json["userId"], "user-1");
        assert_eq!(json["priority"], "low");
        assert_eq!(json["createdAt"], "2024-12-01T00:00:00.000Z");
    }

    #[test]
    fn cache_blob_defaults_missing_fields() {
        let task: Task = serde_json::from_str(r#"{"id":"x","userId":"u"}"#).unwrap();
        assert_eq!(task.title, "");
        assert_eq!(task.priority, Priority::Medium);
        assert!(!task.completed);
        assert!(task.created_at.is_none());
    }
}
