use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SshConfig {
    pub connect_timeout_secs: u64,
    /// Extra `-o` options passed to every ssh/sftp invocation
    pub extra_options: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RsyncConfig {
    /// Local rsync binaries, first existing one wins
    pub local_candidates: Vec<String>,
    pub local_fallback: String,
    /// Remote rsync binaries probed with `--version` after connecting
    pub remote_candidates: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PanesConfig {
    pub left_default: Option<String>,
    pub right_default: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub ssh: SshConfig,
    pub rsync: RsyncConfig,
    pub panes: PanesConfig,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            extra_options: Vec::new(),
        }
    }
}

impl Default for RsyncConfig {
    fn default() -> Self {
        Self {
            // Prefer a full-featured rsync over the system openrsync
            local_candidates: vec![
                "/opt/homebrew/bin/rsync".to_string(),
                "/usr/local/bin/rsync".to_string(),
            ],
            local_fallback: "/usr/bin/rsync".to_string(),
            remote_candidates: vec![
                "/opt/homebrew/bin/rsync".to_string(),
                "/usr/local/bin/rsync".to_string(),
                "/usr/bin/rsync".to_string(),
            ],
        }
    }
}

impl AppConfig {
    /// Starting directory for a pane, the home directory when unset.
    pub fn default_path(&self, configured: &Option<String>) -> String {
        configured
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.display().to_string()))
            .unwrap_or_else(|| "/".to_string())
    }

    pub fn left_default(&self) -> String {
        self.default_path(&self.panes.left_default)
    }

    pub fn right_default(&self) -> String {
        self.default_path(&self.panes.right_default)
    }
}

#[derive(Debug)]
pub struct ConfigManager {
    config_file: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("pairsync");

        Ok(Self::with_file(config_dir.join("pairsync.toml")))
    }

    pub fn with_file(config_file: impl Into<PathBuf>) -> Self {
        Self {
            config_file: config_file.into(),
        }
    }

    pub fn load_config(&self) -> Result<AppConfig> {
        // If config file doesn't exist, create it with default values
        if !self.config_file.exists() {
            let default_config = AppConfig::default();
            self.save_config(&default_config)?;
            return Ok(default_config);
        }

        let content =
            fs::read_to_string(&self.config_file).context("Failed to read config file")?;

        let mut config: AppConfig =
            toml::from_str(&content).context("Failed to parse config file")?;

        if config.rsync.local_fallback.trim().is_empty() {
            config.rsync.local_fallback = RsyncConfig::default().local_fallback;
        }

        Ok(config)
    }

    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_file.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let toml = toml::to_string_pretty(config).context("Failed to serialize config")?;
        fs::write(&self.config_file, toml).context("Failed to write config file")?;
        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_default_config_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_file(dir.path().join("nested").join("pairsync.toml"));

        let config = manager.load_config().unwrap();
        assert_eq!(config.ssh.connect_timeout_secs, 10);
        assert!(manager.config_path().exists());
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairsync.toml");
        fs::write(
            &path,
            "[ssh]\nconnect_timeout_secs = 3\n\n[panes]\nleft_default = \"/data\"\n",
        )
        .unwrap();

        let config = ConfigManager::with_file(&path).load_config().unwrap();
        assert_eq!(config.ssh.connect_timeout_secs, 3);
        assert!(config.ssh.extra_options.is_empty());
        assert_eq!(config.rsync.local_fallback, "/usr/bin/rsync");
        assert_eq!(config.rsync.remote_candidates.len(), 3);
        assert_eq!(config.left_default(), "/data");
    }

    #[test]
    fn rejects_malformed_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairsync.toml");
        fs::write(&path, "[ssh\n").unwrap();

        assert!(ConfigManager::with_file(&path).load_config().is_err());
    }
}
