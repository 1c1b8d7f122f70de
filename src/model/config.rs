use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration from tasky.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskyConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub countdown: CountdownConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one JSON file per storage key.
    /// Relative paths resolve against the config file's directory.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountdownConfig {
    /// Seconds between countdown refreshes in `tasky watch`
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
}

impl CountdownConfig {
    /// Refresh cadence, clamped to between one second and one day
    pub fn refresh_secs(&self) -> u64 {
        self.refresh_secs.clamp(1, 86_400)
    }
}

impl Default for CountdownConfig {
    fn default() -> Self {
        CountdownConfig {
            refresh_secs: default_refresh_secs(),
        }
    }
}

fn default_refresh_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Print create/update/delete notices to stderr
    #[serde(default = "default_true")]
    pub notifications: bool,
    /// Show the one-time welcome text on first use
    #[serde(default = "default_true")]
    pub welcome: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            notifications: true,
            welcome: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: TaskyConfig = toml::from_str("").unwrap();
        assert!(config.storage.dir.is_none());
        assert_eq!(config.countdown.refresh_secs, 60);
        assert!(config.ui.notifications);
        assert!(config.ui.welcome);
    }

    #[test]
    fn refresh_secs_is_clamped() {
        let config: TaskyConfig = toml::from_str("[countdown]\nrefresh_secs = 0\n").unwrap();
        assert_eq!(config.countdown.refresh_secs(), 1);
    }

    #[test]
    fn partial_ui_table_keeps_other_defaults() {
        let config: TaskyConfig = toml::from_str("[ui]\nwelcome = false\n").unwrap();
        assert!(!config.ui.welcome);
        assert!(config.ui.notifications);
    }
}
