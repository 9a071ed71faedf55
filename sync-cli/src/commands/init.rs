//! Configure the acting user.

use anyhow::Result;
use std::path::Path;

use crate::config::{Config, CONFIG_FILE};

/// Run the init command.
///
/// Keeps any other settings already in the config file.
pub async fn run(data_dir: &Path, user: &str) -> Result<()> {
    let user = user.trim();
    if user.is_empty() {
        anyhow::bail!("User id must not be empty");
    }

    let mut config = Config::load(data_dir).await?;
    let previous = config.user.id.replace(user.to_string());
    config.save(data_dir).await?;

    match previous {
        Some(old) if old != user => println!("Switched user from {} to {}", old, user),
        _ => println!("Configured user {}", user),
    }
    println!();
    println!("  Config:   {}", data_dir.join(CONFIG_FILE).display());
    println!("  Data dir: {}", data_dir.display());
    println!();
    println!("Next: tasksync add \"<title>\" --due <YYYY-MM-DD>");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[tokio::test]
    async fn init_writes_user() {
        let dir = tempdir().unwrap();
        run(dir.path(), "alice").await.unwrap();

        assert!(dir.path().join(CONFIG_FILE).exists());
        let config = Config::load(dir.path()).await.unwrap();
        assert_eq!(config.user.id.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn init_keeps_storage_settings() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.storage.remote_path = PathBuf::from("/shared/remote.json");
        config.save(dir.path()).await.unwrap();

        run(dir.path(), "bob").await.unwrap();

        let config = Config::load(dir.path()).await.unwrap();
        assert_eq!(config.user.id.as_deref(), Some("bob"));
        assert_eq!(
            config.storage.remote_path,
            PathBuf::from("/shared/remote.json")
        );
    }

    #[tokio::test]
    async fn init_rejects_blank_user() {
        let dir = tempdir().unwrap();
        assert!(run(dir.path(), "   ").await.is_err());
        assert!(!dir.path().join(CONFIG_FILE).exists());
    }
}
