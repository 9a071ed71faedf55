//! Change fields of a task.

use anyhow::{Context, Result};
use sync_types::{TaskId, TaskPatch};

use crate::config::Settings;
use crate::session::Session;

/// Run the update command. Also used by `done`.
pub async fn run(settings: &Settings, id: &str, patch: TaskPatch) -> Result<()> {
    if patch.is_empty() {
        anyhow::bail!("Nothing to update. Pass at least one of --title, --description, --due, --priority, --completed");
    }

    let session = Session::open(settings).await?;
    let id = TaskId::from(id);
    session
        .sync
        .update_task(&id, patch)
        .await
        .with_context(|| format!("Failed to update {}", id))?;
    session.save().await?;

    println!("Updated {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use sync_types::{NewTask, OwnerId, Priority};
    use tempfile::tempdir;

    fn settings(dir: &Path) -> Settings {
        Settings {
            user: OwnerId::new("alice"),
            remote_path: dir.join("remote.json"),
            cache_dir: dir.join("cache"),
        }
    }

    async fn seed(settings: &Settings) -> TaskId {
        let session = Session::open(settings).await.unwrap();
        let id = session
            .sync
            .create_task(NewTask::new("Write report", "2025-01-01"))
            .await
            .unwrap();
        session.save().await.unwrap();
        id
    }

    #[tokio::test]
    async fn update_persists_fields() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());
        let id = seed(&settings).await;

        let patch = TaskPatch::new()
            .with_priority(Priority::Low)
            .with_completed(true);
        run(&settings, id.as_str(), patch).await.unwrap();

        let session = Session::open(&settings).await.unwrap();
        let task = session.sync.state().find(&id).cloned().unwrap();
        assert_eq!(task.priority, Priority::Low);
        assert!(task.completed);
        assert_eq!(task.title, "Write report");
    }

    #[tokio::test]
    async fn empty_patch_is_rejected() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());
        let id = seed(&settings).await;

        assert!(run(&settings, id.as_str(), TaskPatch::new()).await.is_err());
    }

    #[tokio::test]
    async fn unknown_id_is_an_error() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());
        seed(&settings).await;

        let patch = TaskPatch::new().with_completed(true);
        assert!(run(&settings, "missing", patch).await.is_err());
    }
}
