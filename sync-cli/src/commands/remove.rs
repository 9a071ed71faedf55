//! Delete a task.

use anyhow::{Context, Result};
use sync_types::TaskId;

use crate::config::Settings;
use crate::session::Session;

/// Run the rm command.
pub async fn run(settings: &Settings, id: &str) -> Result<()> {
    let session = Session::open(settings).await?;
    let id = TaskId::from(id);
    if !session.sync.state().contains(&id) {
        anyhow::bail!("No task {} for user {}", id, settings.user);
    }

    session
        .sync
        .delete_task(&id)
        .await
        .with_context(|| format!("Failed to delete {}", id))?;
    session.save().await?;

    println!("Deleted {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use sync_types::{NewTask, OwnerId};
    use tempfile::tempdir;

    fn settings(dir: &Path, user: &str) -> Settings {
        Settings {
            user: OwnerId::new(user),
            remote_path: dir.join("remote.json"),
            cache_dir: dir.join(format!("cache-{}", user)),
        }
    }

    #[tokio::test]
    async fn remove_deletes_record() {
        let dir = tempdir().unwrap();
        let alice = settings(dir.path(), "alice");
        let session = Session::open(&alice).await.unwrap();
        let id = session
            .sync
            .create_task(NewTask::new("Write report", "2025-01-01"))
            .await
            .unwrap();
        session.save().await.unwrap();

        run(&alice, id.as_str()).await.unwrap();

        let session = Session::open(&alice).await.unwrap();
        assert!(session.sync.state().tasks().is_empty());
        assert_eq!(session.record_count(), 0);
    }

    #[tokio::test]
    async fn cannot_remove_another_users_task() {
        let dir = tempdir().unwrap();
        let alice = settings(dir.path(), "alice");
        let session = Session::open(&alice).await.unwrap();
        let id = session
            .sync
            .create_task(NewTask::new("Alice's task", "2025-01-01"))
            .await
            .unwrap();
        session.save().await.unwrap();

        let bob = settings(dir.path(), "bob");
        assert!(run(&bob, id.as_str()).await.is_err());

        let session = Session::open(&alice).await.unwrap();
        assert_eq!(session.record_count(), 1);
    }
}
