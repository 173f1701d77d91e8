//! CLI configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/flaredrive/config.toml`
//! - Windows: `%APPDATA%/flaredrive/config.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use flaredrive_upload_queue::QueueConfig;
use serde::{Deserialize, Serialize};

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the FlareDrive deployment.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Remote directory prefix (empty = bucket root).
    #[serde(default)]
    pub base_directory: String,

    /// Render thumbnails for images.
    #[serde(default = "default_true")]
    pub thumbnails: bool,

    /// Video thumbnail render limit in seconds.
    #[serde(default = "default_render_timeout")]
    pub render_timeout_secs: u64,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8787".into()
}

fn default_true() -> bool {
    true
}

fn default_render_timeout() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            base_directory: String::new(),
            thumbnails: default_true(),
            render_timeout_secs: default_render_timeout(),
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Saves the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // Restrict permissions on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            thumbnails: self.thumbnails,
            render_timeout: Duration::from_secs(self.render_timeout_secs),
        }
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("flaredrive").join("config.toml"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("flaredrive")
            .join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.endpoint, "http://127.0.0.1:8787");
        assert!(config.base_directory.is_empty());
        assert!(config.thumbnails);
        assert_eq!(config.render_timeout_secs, 10);
    }

    #[test]
    fn config_partial_toml() {
        let config: Config = toml::from_str(r#"endpoint = "https://drive.example.com""#).unwrap();
        assert_eq!(config.endpoint, "https://drive.example.com");
        assert!(config.thumbnails);
        assert_eq!(config.render_timeout_secs, 10);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = Config {
            endpoint: "https://files.example.org".into(),
            base_directory: "backups/".into(),
            thumbnails: false,
            render_timeout_secs: 3,
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn load_creates_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let config = Config {
            base_directory: "music/".into(),
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn queue_config_uses_timeout() {
        let config = Config {
            render_timeout_secs: 4,
            thumbnails: false,
            ..Config::default()
        };
        let queue = config.queue_config();
        assert!(!queue.thumbnails);
        assert_eq!(queue.render_timeout, Duration::from_secs(4));
    }

    #[test]
    fn config_path_not_empty() {
        let path = config_path().unwrap();
        assert!(path.to_string_lossy().contains("flaredrive"));
    }
}
