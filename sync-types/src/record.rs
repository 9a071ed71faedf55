//! Remote-native record types.
//!
//! The remote store keeps date-valued fields in its own temporal type
//! ([`RemoteTimestamp`]). Records may be partially populated or malformed;
//! [`RemoteDocument::into_task`] repairs them with fixed defaults instead of
//! rejecting them, so one corrupt record never blocks the rest of a snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::{format_calendar_date, format_timestamp, parse_due_date};
use crate::{NewTask, OwnerId, Task, TaskId, TaskPatch};

/// The remote store's native timestamp: seconds and nanoseconds since the
/// Unix epoch, UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RemoteTimestamp {
    /// Whole seconds since the epoch.
    pub seconds: i64,
    /// Sub-second nanoseconds.
    pub nanos: u32,
}

impl RemoteTimestamp {
    /// The current instant.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Convert from a chrono instant.
    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        Self {
            seconds: instant.timestamp(),
            nanos: instant.timestamp_subsec_nanos(),
        }
    }

    /// Convert to a chrono instant. `None` if out of chrono's range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanos)
    }

    /// Translate a due date string for writing.
    ///
    /// The date is stored at UTC midnight. An unparseable date is written as
    /// the current instant.
    pub fn from_due_date(value: &str) -> Self {
        parse_due_date(value)
            .map(Self::from_datetime)
            .unwrap_or_else(Self::now)
    }

    /// Calendar-date form (`YYYY-MM-DD`), or empty if out of range.
    pub fn to_calendar_date(&self) -> String {
        self.to_datetime()
            .map(format_calendar_date)
            .unwrap_or_default()
    }

    /// Full ISO timestamp form, or empty if out of range.
    pub fn to_iso_string(&self) -> String {
        self.to_datetime().map(format_timestamp).unwrap_or_default()
    }
}

/// A due date as found in a remote record.
///
/// Well-formed records carry a timestamp; older ones may carry a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DueDateValue {
    /// Native timestamp
    Timestamp(RemoteTimestamp),
    /// Legacy string value, passed through verbatim
    Text(String),
}

impl DueDateValue {
    /// Calendar-date form used by [`Task::due_date`].
    pub fn to_calendar_date(&self) -> String {
        match self {
            Self::Timestamp(ts) => ts.to_calendar_date(),
            Self::Text(text) => text.clone(),
        }
    }
}

/// Field data of a remote record.
///
/// Every field is optional: the same shape is used for records read from a
/// snapshot, for creates, and for partial updates (only set fields are sent).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFields {
    /// Title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Due date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DueDateValue>,
    /// Priority as stored; unknown values are repaired to medium on read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Completion flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// Owning identity.
    #[serde(default, rename = "userId", skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerId>,
    /// Creation time. Left unset on create; the store assigns it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<RemoteTimestamp>,
}

impl RemoteFields {
    /// Fields for creating a record from a validated payload.
    pub fn for_create(task: &NewTask, owner: &OwnerId) -> Self {
        Self {
            title: Some(task.title.clone()),
            description: Some(task.description.clone()),
            due_date: Some(DueDateValue::Timestamp(RemoteTimestamp::from_due_date(
                &task.due_date,
            ))),
            priority: Some(task.priority.as_str().to_string()),
            completed: Some(false),
            owner: Some(owner.clone()),
            created_at: None,
        }
    }

    /// Fields for a partial update, translating the due date to a timestamp.
    pub fn from_patch(patch: &TaskPatch) -> Self {
        Self {
            title: patch.title.clone(),
            description: patch.description.clone(),
            due_date: patch
                .due_date
                .as_deref()
                .map(|d| DueDateValue::Timestamp(RemoteTimestamp::from_due_date(d))),
            priority: patch.priority.map(|p| p.as_str().to_string()),
            completed: patch.completed,
            owner: None,
            created_at: None,
        }
    }

    /// Overlay the set fields of `update` onto this record.
    pub fn merge(&mut self, update: RemoteFields) {
        if update.title.is_some() {
            self.title = update.title;
        }
        if update.description.is_some() {
            self.description = update.description;
        }
        if update.due_date.is_some() {
            self.due_date = update.due_date;
        }
        if update.priority.is_some() {
            self.priority = update.priority;
        }
        if update.completed.is_some() {
            self.completed = update.completed;
        }
        if update.owner.is_some() {
            self.owner = update.owner;
        }
        if update.created_at.is_some() {
            self.created_at = update.created_at;
        }
    }

    /// Check if no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A remote record: the store-assigned id plus its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDocument {
    /// Store-assigned permanent id.
    pub id: String,
    /// Record data.
    #[serde(flatten)]
    pub fields: RemoteFields,
}

impl RemoteDocument {
    /// Create a document.
    pub fn new(id: impl Into<String>, fields: RemoteFields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Map to a task, repairing missing or malformed fields.
    ///
    /// Defaults: empty title/description, `medium` priority, not completed.
    /// A missing owner is taken from `subscribed_owner`, since the record
    /// matched that owner's subscription predicate.
    pub fn into_task(self, subscribed_owner: &OwnerId) -> Task {
        let fields = self.fields;
        Task {
            id: TaskId::from(self.id),
            title: fields.title.unwrap_or_default(),
            description: fields.description.unwrap_or_default(),
            due_date: fields
                .due_date
                .map(|d| d.to_calendar_date())
                .unwrap_or_default(),
            priority: fields
                .priority
                .and_then(|p| p.parse().ok())
                .unwrap_or_default(),
            completed: fields.completed.unwrap_or(false),
            owner: fields.owner.unwrap_or_else(|| subscribed_owner.clone()),
            created_at: fields
                .created_at
                .map(|ts| ts.to_iso_string())
                .filter(|s| !s.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Priority;

    fn owner() -> OwnerId {
        OwnerId::new("user-1")
    }

    #[test]
    fn due_date_written_at_utc_midnight() {
        let ts = RemoteTimestamp::from_due_date("2025-01-01");
        assert_eq!(ts.seconds, 1_735_689_600);
        assert_eq!(ts.nanos, 0);
        assert_eq!(ts.to_calendar_date(), "2025-01-01");
    }

    #[test]
    fn unparseable_due_date_written_as_now() {
        let before = RemoteTimestamp::now();
        let ts = RemoteTimestamp::from_due_date("not a date");
        assert!(ts >= before);
    }

    #[test]
    fn timestamp_iso_form() {
        let ts = RemoteTimestamp {
            seconds: 1_735_689_600,
            nanos: 250_000_000,
        };
        assert_eq!(ts.to_iso_string(), "2025-01-01T00:00:00.250Z");
    }

    #[test]
    fn sparse_record_repaired_with_defaults() {
        let doc = RemoteDocument::new("doc-1", RemoteFields::default());
        let task = doc.into_task(&owner());
        assert_eq!(task.id.as_str(), "doc-1");
        assert_eq!(task.title, "");
        assert_eq!(task.description, "");
        assert_eq!(task.due_date, "");
        assert_eq!(task.priority, Priority::Medium);
        assert!(!task.completed);
        assert_eq!(task.owner, owner());
        assert!(task.created_at.is_none());
    }

    #[test]
    fn malformed_priority_repaired_to_medium() {
        let doc = RemoteDocument::new(
            "doc-2",
            RemoteFields {
                priority: Some("urgent!!".into()),
                ..Default::default()
            },
        );
        assert_eq!(doc.into_task(&owner()).priority, Priority::Medium);
    }

    #[test]
    fn legacy_string_due_date_passes_through() {
        let doc = RemoteDocument::new(
            "doc-3",
            RemoteFields {
                due_date: Some(DueDateValue::Text("2024-05-06".into())),
                ..Default::default()
            },
        );
        assert_eq!(doc.into_task(&owner()).due_date, "2024-05-06");
    }

    #[test]
    fn full_record_maps_all_fields() {
        let new_task = NewTask::new("Plan", "2025-03-01").with_priority(Priority::High);
        let mut fields = RemoteFields::for_create(&new_task, &owner());
        fields.created_at = Some(RemoteTimestamp {
            seconds: 1_700_000_000,
            nanos: 0,
        });
        let task = RemoteDocument::new("doc-4", fields).into_task(&OwnerId::new("other"));
        assert_eq!(task.title, "Plan");
        assert_eq!(task.due_date, "2025-03-01");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.owner, owner());
        assert_eq!(task.created_at.as_deref(), Some("2023-11-14T22:13:20.000Z"));
    }

    #[test]
    fn patch_sends_only_set_fields() {
        let fields = RemoteFields::from_patch(&TaskPatch::new().with_priority(Priority::High));
        assert_eq!(fields.priority.as_deref(), Some("high"));
        assert!(fields.title.is_none());
        assert!(fields.due_date.is_none());
        assert!(fields.owner.is_none());
    }

    #[test]
    fn patch_translates_due_date() {
        let fields = RemoteFields::from_patch(&TaskPatch::new().with_due_date("2025-06-01"));
        assert_eq!(
            fields.due_date,
            Some(DueDateValue::Timestamp(RemoteTimestamp::from_due_date("2025-06-01")))
        );
    }

    #[test]
    fn merge_overlays_set_fields() {
        let mut record = RemoteFields::for_create(&NewTask::new("a", "2025-01-01"), &owner());
        record.merge(RemoteFields {
            completed: Some(true),
            ..Default::default()
        });
        assert_eq!(record.completed, Some(true));
        assert_eq!(record.title.as_deref(), Some("a"));
        assert!(RemoteFields::default().is_empty());
    }

    #[test]
    fn document_json_is_flat() {
        let doc = RemoteDocument::new(
            "doc-5",
            RemoteFields {
                title: Some("t".into()),
                due_date: Some(DueDateValue::Timestamp(RemoteTimestamp {
                    seconds: 10,
                    nanos: 0,
                })),
                ..Default::default()
            },
        );
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["id"], "doc-5");
        assert_eq!(json["title"], "t");
        assert_eq!(json["dueDate"]["seconds"], 10);

        let back: RemoteDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back, doc);
    }
}
