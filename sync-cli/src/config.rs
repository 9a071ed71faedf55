//! Configuration management for the tasksync CLI.
//!
//! Stored as TOML in `tasksync.toml` inside the data directory. Every field
//! has a default, so a missing file or a partial file is valid.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use sync_types::OwnerId;

/// Config file name inside the data directory.
pub const CONFIG_FILE: &str = "tasksync.toml";

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Identity settings.
    #[serde(default)]
    pub user: UserConfig,

    /// File locations.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Identity settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    /// User id tasks are created for and listed by.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// File locations. Relative paths resolve against the data directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file standing in for the remote store.
    #[serde(default = "default_remote_path")]
    pub remote_path: PathBuf,

    /// Directory holding the local task cache.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            remote_path: default_remote_path(),
            cache_dir: default_cache_dir(),
        }
    }
}

fn default_remote_path() -> PathBuf {
    PathBuf::from("remote.json")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

/// Settings a command runs with, after overrides and path resolution.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Acting user.
    pub user: OwnerId,
    /// Absolute (or data-dir relative) path of the remote file.
    pub remote_path: PathBuf,
    /// Local cache directory.
    pub cache_dir: PathBuf,
}

impl Config {
    /// Load configuration from a data directory. A missing file yields the
    /// defaults.
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config file {}", path.display()))
            }
        };
        toml::from_str(&contents)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Save configuration to a data directory.
    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join(CONFIG_FILE);
        let contents = toml::to_string_pretty(self).context("Failed to encode configuration")?;
        tokio::fs::write(&path, contents)
            .await
            .context("Failed to save configuration")?;
        set_file_permissions_0600(&path).await?;
        Ok(())
    }

    /// Apply a user override and resolve relative paths against `data_dir`.
    pub fn resolve(&self, data_dir: &Path, user_override: Option<&str>) -> Result<Settings> {
        let user = user_override
            .or(self.user.id.as_deref())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .context("No user configured. Run 'tasksync init --user <id>' or pass --user")?;

        Ok(Settings {
            user: OwnerId::new(user),
            remote_path: data_dir.join(&self.storage.remote_path),
            cache_dir: data_dir.join(&self.storage.cache_dir),
        })
    }
}

/// Set file permissions to 0600 (owner read/write only) on Unix.
/// No-op on non-Unix platforms.
pub async fn set_file_permissions_0600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .context("Failed to set file permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path()).await.unwrap();

        assert!(config.user.id.is_none());
        assert_eq!(config.storage.remote_path, PathBuf::from("remote.json"));
        assert_eq!(config.storage.cache_dir, PathBuf::from("cache"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [user]
            id = "alice"
            "#,
        )
        .unwrap();

        assert_eq!(config.user.id.as_deref(), Some("alice"));
        assert_eq!(config.storage.cache_dir, PathBuf::from("cache"));
    }

    #[test]
    fn full_toml_parses() {
        let config: Config = toml::from_str(
            r#"
            [user]
            id = "bob"

            [storage]
            remote_path = "/srv/shared/remote.json"
            cache_dir = "bob-cache"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.storage.remote_path,
            PathBuf::from("/srv/shared/remote.json")
        );
        assert_eq!(config.storage.cache_dir, PathBuf::from("bob-cache"));
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.user.id = Some("carol".to_string());
        config.save(dir.path()).await.unwrap();

        let loaded = Config::load(dir.path()).await.unwrap();
        assert_eq!(loaded.user.id.as_deref(), Some("carol"));
    }

    #[tokio::test]
    async fn invalid_toml_is_reported() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join(CONFIG_FILE), "user = [")
            .await
            .unwrap();

        let err = Config::load(dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));
    }

    #[test]
    fn resolve_joins_relative_paths() {
        let mut config = Config::default();
        config.user.id = Some("alice".to_string());

        let settings = config.resolve(Path::new("/data"), None).unwrap();
        assert_eq!(settings.user, OwnerId::new("alice"));
        assert_eq!(settings.remote_path, PathBuf::from("/data/remote.json"));
        assert_eq!(settings.cache_dir, PathBuf::from("/data/cache"));
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let mut config = Config::default();
        config.storage.remote_path = PathBuf::from("/shared/remote.json");

        let settings = config.resolve(Path::new("/data"), Some("dave")).unwrap();
        assert_eq!(settings.remote_path, PathBuf::from("/shared/remote.json"));
    }

    #[test]
    fn resolve_prefers_override() {
        let mut config = Config::default();
        config.user.id = Some("alice".to_string());

        let settings = config.resolve(Path::new("/data"), Some("bob")).unwrap();
        assert_eq!(settings.user, OwnerId::new("bob"));
    }

    #[test]
    fn resolve_without_user_fails() {
        let config = Config::default();
        let err = config.resolve(Path::new("/data"), Some("  ")).unwrap_err();
        assert!(err.to_string().contains("tasksync init"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn config_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        Config::default().save(dir.path()).await.unwrap();

        let meta = std::fs::metadata(dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }
}
