//! Identity types for tasksync.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// Reserved prefix marking a task id as temporary (not yet confirmed remotely).
pub const TEMP_ID_PREFIX: &str = "local-";

/// Identifier of a task.
///
/// An id lives in exactly one of two disjoint subspaces:
/// - *temporary*: generated locally, carries [`TEMP_ID_PREFIX`]
/// - *permanent*: assigned by the remote store on successful creation
///
/// Classification is purely by prefix, so ids read back from the local
/// cache keep their subspace.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Create a new random temporary id.
    ///
    /// Uniqueness against ids already in a list is the caller's concern;
    /// collisions of the random part are astronomically unlikely but the
    /// coordinator still checks.
    pub fn temporary() -> Self {
        Self(format!("{}{}", TEMP_ID_PREFIX, uuid::Uuid::new_v4().simple()))
    }

    /// Wrap an id assigned by the remote store.
    ///
    /// Rejects empty ids and ids that would be mistaken for temporary ones.
    pub fn permanent(id: impl Into<String>) -> Result<Self, TypesError> {
        let id = id.into();
        if id.is_empty() || id.starts_with(TEMP_ID_PREFIX) {
            return Err(TypesError::InvalidTaskId(id));
        }
        Ok(Self(id))
    }

    /// Check if this id is in the temporary subspace.
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }

    /// Check if this id was assigned by the remote store.
    pub fn is_permanent(&self) -> bool {
        !self.is_temporary()
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({})", self.0)
    }
}

/// Identity of the authenticated user owning a task list.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Create an owner id from the identity provider's user id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_ids_carry_prefix() {
        let id = TaskId::temporary();
        assert!(id.as_str().starts_with(TEMP_ID_PREFIX));
        assert!(id.is_temporary());
        assert!(!id.is_permanent());
    }

    #[test]
    fn temporary_ids_are_distinct() {
        let a = TaskId::temporary();
        let b = TaskId::temporary();
        assert_ne!(a, b);
    }

    #[test]
    fn permanent_id_accepts_remote_ids() {
        let id = TaskId::permanent("aZ3kq9PwX1").unwrap();
        assert!(id.is_permanent());
        assert_eq!(id.as_str(), "aZ3kq9PwX1");
    }

    #[test]
    fn permanent_id_rejects_reserved_prefix() {
        assert!(matches!(
            TaskId::permanent("local-123"),
            Err(TypesError::InvalidTaskId(_))
        ));
        assert!(TaskId::permanent("").is_err());
    }

    #[test]
    fn classification_survives_serde() {
        let id = TaskId::temporary();
        let json = serde_json::to_string(&id).unwrap();
        let back: TaskId = serde_json::from_str(&json).unwrap();
        assert!(back.is_temporary());
        assert_eq!(back, id);
    }

    #[test]
    fn owner_ids_are_ordered_set_keys() {
        let owners: std::collections::BTreeSet<OwnerId> =
            ["bob", "alice", "bob"].into_iter().map(OwnerId::new).collect();
        let names: Vec<_> = owners.iter().map(OwnerId::as_str).collect();
        assert_eq!(names, ["alice", "bob"]);
    }

    #[test]
    fn debug_shows_type() {
        let owner = OwnerId::new("user-1");
        assert_eq!(format!("{:?}", owner), "OwnerId(user-1)");
        assert_eq!(format!("{:?}", TaskId::from("abc")), "TaskId(abc)");
    }
}
