//! Create a task.

use anyhow::{Context, Result};
use sync_types::{NewTask, Priority};

use crate::config::Settings;
use crate::session::Session;

/// Run the add command.
pub async fn run(
    settings: &Settings,
    title: &str,
    due: &str,
    description: &str,
    priority: Priority,
) -> Result<()> {
    let session = Session::open(settings).await?;
    let task = NewTask::new(title, due)
        .with_description(description)
        .with_priority(priority);

    let id = session
        .sync
        .create_task(task)
        .await
        .context("Failed to create task")?;
    session.save().await?;

    println!("{}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use sync_types::OwnerId;
    use tempfile::tempdir;

    fn settings(dir: &Path) -> Settings {
        Settings {
            user: OwnerId::new("alice"),
            remote_path: dir.join("remote.json"),
            cache_dir: dir.join("cache"),
        }
    }

    #[tokio::test]
    async fn add_persists_task() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());
        run(&settings, "Write report", "2025-01-01", "", Priority::High)
            .await
            .unwrap();

        let session = Session::open(&settings).await.unwrap();
        let state = session.sync.state();
        assert_eq!(state.tasks().len(), 1);
        assert_eq!(state.tasks()[0].title, "Write report");
        assert_eq!(state.tasks()[0].priority, Priority::High);
        assert!(!state.tasks()[0].completed);
    }

    #[tokio::test]
    async fn add_rejects_blank_title() {
        let dir = tempdir().unwrap();
        let settings = settings(dir.path());
        let result = run(&settings, "  ", "2025-01-01", "", Priority::Low).await;

        assert!(result.is_err());
        assert!(!dir.path().join("remote.json").exists());
    }
}
