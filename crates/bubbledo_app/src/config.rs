// SPDX-License-Identifier: MIT OR Apache-2.0
//! Application configuration.
//!
//! Where data lives and how the window opens. Simulation tunables are not
//! here; they are read from [`SETTINGS_FILE_NAME`] in the data directory.

use bubbledo_physics::settings::{SettingsError, SETTINGS_FILE_NAME};
use bubbledo_physics::SimulationSettings;
use std::ffi::OsString;
use std::path::PathBuf;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "BUBBLEDO_HOME";

/// Store file name
pub const STORE_FILE_NAME: &str = "bubbledo-store.json";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Window title
    pub window_title: String,
    /// Initial window size (logical pixels)
    pub window_size: [u32; 2],
    /// Minimum window size (logical pixels)
    pub min_window_size: [u32; 2],
    /// Directory holding the store and settings files
    pub data_dir: PathBuf,
    /// Store file name inside `data_dir`
    pub store_file: String,
    /// Settings file name inside `data_dir`
    pub settings_file: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window_title: "BubbleDo".to_string(),
            window_size: [900, 700],
            min_window_size: [320, 400],
            data_dir: PathBuf::from("."),
            store_file: STORE_FILE_NAME.to_string(),
            settings_file: SETTINGS_FILE_NAME.to_string(),
        }
    }
}

impl AppConfig {
    /// Configuration with the data directory taken from `BUBBLEDO_HOME`
    pub fn from_env() -> Self {
        Self::with_data_dir_override(std::env::var_os(DATA_DIR_ENV))
    }

    fn with_data_dir_override(value: Option<OsString>) -> Self {
        let mut config = Self::default();
        match value.filter(|v| !v.is_empty()) {
            Some(dir) => config.data_dir = PathBuf::from(dir),
            None => {
                if let Ok(cwd) = std::env::current_dir() {
                    config.data_dir = cwd;
                }
            }
        }
        tracing::debug!("Data directory: {:?}", config.data_dir);
        config
    }

    /// Configuration rooted at an explicit directory
    #[cfg(test)]
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: dir.into(),
            ..Self::default()
        }
    }

    /// Path of the key/value store
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_file)
    }

    /// Path of the simulation settings
    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(&self.settings_file)
    }

    /// Load simulation settings; a missing file yields defaults
    pub fn load_settings(&self) -> Result<SimulationSettings, SettingsError> {
        SimulationSettings::load_or_default(&self.settings_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bubbledo-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_override_sets_data_dir() {
        let config = AppConfig::with_data_dir_override(Some(OsString::from("/tmp/bubbles")));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/bubbles"));
        assert_eq!(config.store_path(), PathBuf::from("/tmp/bubbles").join(STORE_FILE_NAME));
        assert_eq!(config.settings_path(), PathBuf::from("/tmp/bubbles").join(SETTINGS_FILE_NAME));
    }

    #[test]
    fn test_empty_override_falls_back_to_cwd() {
        let config = AppConfig::with_data_dir_override(Some(OsString::new()));
        assert_eq!(config.data_dir, std::env::current_dir().unwrap());
    }

    #[test]
    fn test_missing_settings_file_uses_defaults() {
        let dir = temp_dir();
        let settings = AppConfig::with_data_dir(&dir).load_settings().unwrap();
        assert_eq!(settings.wall_thickness, SimulationSettings::default().wall_thickness);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_settings_file_is_an_error() {
        let dir = temp_dir();
        let config = AppConfig::with_data_dir(&dir);
        std::fs::write(config.settings_path(), "(drag_stiffness: 3.0)").unwrap();
        assert!(matches!(config.load_settings(), Err(SettingsError::Invalid(_))));
        std::fs::remove_dir_all(&dir).ok();
    }
}
