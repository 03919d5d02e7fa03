//! Configuration management for hush.
//!
//! The hotkey is stored as a string and parsed by the app, so this crate
//! does not depend on the hotkey library.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};

use crate::APP_NAME;

/// What the global hotkey does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HotkeyMode {
    /// Each press flips between muted and speaking
    #[default]
    Toggle,
    /// Speaking while the hotkey is held, muted on release
    PushToTalk,
}

/// Core configuration structure for the application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Hotkey configuration
    /// Format: "modifier+modifier+key" e.g., "super+shift+KeyM"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotkey: Option<String>,

    /// Hotkey behaviour
    #[serde(default, skip_serializing_if = "is_default_mode")]
    pub mode: HotkeyMode,

    /// Uid of the preferred input device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_device: Option<String>,

    /// Show desktop notifications for warnings and errors
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub notifications: bool,
}

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

fn is_default_mode(v: &HotkeyMode) -> bool {
    *v == HotkeyMode::default()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hotkey: None,
            mode: HotkeyMode::default(),
            input_device: None,
            notifications: true,
        }
    }
}

impl Config {
    /// Get the hotkey string, if one is configured
    pub fn hotkey(&self) -> Option<&str> {
        self.hotkey.as_deref()
    }

    /// Get the preferred input device uid
    pub fn input_device(&self) -> Option<&str> {
        self.input_device.as_deref()
    }
}

/// Manages loading and saving configuration files.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new ConfigManager with the default configuration directory.
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Creates a new ConfigManager with a specified configuration directory.
    pub fn with_config_dir<P: AsRef<std::path::Path>>(dir: P) -> Self {
        let config_path = dir.as_ref().join(format!("{}.toml", APP_NAME));
        Self { config_path }
    }

    /// Returns the default path to the configuration file.
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to retrieve configuration directory")?;
        Ok(config_dir.join(APP_NAME).join(format!("{}.toml", APP_NAME)))
    }

    /// Loads the configuration from the config file or returns default.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let config_content = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file at {:?}", self.config_path))?;

        let config: Config = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file at {:?}", self.config_path))?;

        Ok(config)
    }

    /// Saves the configuration to the config file, only writing non-default fields.
    pub fn save(&self, config: &Config) -> Result<()> {
        let config_dir = self
            .config_path
            .parent()
            .with_context(|| format!("Failed to get parent directory of {:?}", self.config_path))?;

        fs::create_dir_all(config_dir)
            .with_context(|| format!("Failed to create config directory at {:?}", config_dir))?;

        let serialized =
            toml::to_string_pretty(&config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, serialized)
            .with_context(|| format!("Failed to write config file at {:?}", self.config_path))?;

        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path(&self) -> &std::path::Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.hotkey.is_none());
        assert!(config.input_device.is_none());
        assert_eq!(config.mode, HotkeyMode::Toggle);
        assert!(config.notifications);
    }

    #[test]
    fn test_load_missing_file_gives_default() {
        let temp = tempdir().expect("Failed to create temp dir");
        let manager = ConfigManager::with_config_dir(temp.path());
        assert_eq!(manager.load().unwrap(), Config::default());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = tempdir().expect("Failed to create temp dir");
        let manager = ConfigManager::with_config_dir(temp.path());

        let config = Config {
            hotkey: Some("control+alt+KeyT".to_string()),
            mode: HotkeyMode::PushToTalk,
            input_device: Some("BuiltInMicrophoneDevice".to_string()),
            notifications: false,
        };
        manager.save(&config).unwrap();

        assert!(manager.config_path().exists());
        assert_eq!(manager.load().unwrap(), config);
    }

    #[test]
    fn test_defaults_are_not_written() {
        let temp = tempdir().expect("Failed to create temp dir");
        let manager = ConfigManager::with_config_dir(temp.path());

        manager.save(&Config::default()).unwrap();

        let written = fs::read_to_string(manager.config_path()).unwrap();
        assert!(written.trim().is_empty(), "unexpected content: {written}");
    }

    #[test]
    fn test_mode_uses_snake_case() {
        let config: Config = toml::from_str("mode = \"push_to_talk\"").unwrap();
        assert_eq!(config.mode, HotkeyMode::PushToTalk);
        assert!(config.notifications);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp = tempdir().expect("Failed to create temp dir");
        let manager = ConfigManager::with_config_dir(temp.path());
        fs::write(manager.config_path(), "mode = 12").unwrap();

        let err = manager.load().unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
