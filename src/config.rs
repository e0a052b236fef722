//! Configuration file for folder-layout
//!
//! JSON at `<config_dir>/folder-layout/config.json`. Every field has a default,
//! so a partial file is valid. A missing file is created with defaults on
//! first load.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::constants::{file_manager, paths, settle, undo};
use crate::reconcile::SettlePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettleMode {
    Poll,
    Fixed,
}

/// Wait applied after launching windows, before repositioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleSettings {
    pub mode: SettleMode,
    pub delay_ms: u64,
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for SettleSettings {
    fn default() -> Self {
        Self {
            mode: SettleMode::Poll,
            delay_ms: settle::DEFAULT_DELAY_MS,
            interval_ms: settle::DEFAULT_INTERVAL_MS,
            max_attempts: settle::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl SettleSettings {
    pub fn policy(&self) -> SettlePolicy {
        match self.mode {
            SettleMode::Fixed => SettlePolicy::Fixed {
                delay: Duration::from_millis(self.delay_ms),
            },
            SettleMode::Poll => SettlePolicy::Poll {
                interval: Duration::from_millis(self.interval_ms),
                max_attempts: self.max_attempts,
            },
        }
    }
}

/// Which windows count as folder browsers and how to open new ones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileManagerSettings {
    /// WM_CLASS class or instance names, compared case-insensitively
    pub window_classes: Vec<String>,
    /// Stripped from the end of window titles before reading them as paths
    pub title_suffixes: Vec<String>,
    pub launch_program: String,
    /// Passed before the folder path
    pub launch_args: Vec<String>,
}

impl Default for FileManagerSettings {
    fn default() -> Self {
        Self {
            window_classes: file_manager::DEFAULT_WINDOW_CLASSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            title_suffixes: file_manager::DEFAULT_TITLE_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            launch_program: file_manager::DEFAULT_LAUNCH_PROGRAM.to_string(),
            launch_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    /// Overrides the default layouts file location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layouts_path: Option<PathBuf>,
    pub undo_depth: usize,
    pub settle: SettleSettings,
    pub file_manager: FileManagerSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            layouts_path: None,
            undo_depth: undo::DEFAULT_DEPTH,
            settle: SettleSettings::default(),
            file_manager: FileManagerSettings::default(),
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(paths::APP_DIR);
        path.push(paths::CONFIG_FILENAME);
        path
    }

    /// Load from `path`, writing defaults there if the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("Config file not found, creating default config at {:?}", path);
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let mut config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config JSON from {:?}", path))?;
        config.validate_and_clamp();

        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        fs::write(path, json).with_context(|| format!("Failed to write config to {:?}", path))?;
        info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Clamp out-of-range values after loading
    fn validate_and_clamp(&mut self) {
        if self.undo_depth < undo::MIN_DEPTH {
            warn!(undo_depth = self.undo_depth, min = undo::MIN_DEPTH, "undo_depth below minimum, clamping");
            self.undo_depth = undo::MIN_DEPTH;
        } else if self.undo_depth > undo::MAX_DEPTH {
            warn!(undo_depth = self.undo_depth, max = undo::MAX_DEPTH, "undo_depth exceeds maximum, clamping");
            self.undo_depth = undo::MAX_DEPTH;
        }

        let s = &mut self.settle;
        if s.delay_ms > settle::MAX_DELAY_MS {
            warn!(delay_ms = s.delay_ms, max = settle::MAX_DELAY_MS, "settle.delay_ms exceeds maximum, clamping");
            s.delay_ms = settle::MAX_DELAY_MS;
        }
        if s.interval_ms < settle::MIN_INTERVAL_MS {
            warn!(interval_ms = s.interval_ms, min = settle::MIN_INTERVAL_MS, "settle.interval_ms below minimum, clamping");
            s.interval_ms = settle::MIN_INTERVAL_MS;
        } else if s.interval_ms > settle::MAX_INTERVAL_MS {
            warn!(interval_ms = s.interval_ms, max = settle::MAX_INTERVAL_MS, "settle.interval_ms exceeds maximum, clamping");
            s.interval_ms = settle::MAX_INTERVAL_MS;
        }
        if s.max_attempts < settle::MIN_ATTEMPTS {
            warn!(max_attempts = s.max_attempts, min = settle::MIN_ATTEMPTS, "settle.max_attempts below minimum, clamping");
            s.max_attempts = settle::MIN_ATTEMPTS;
        } else if s.max_attempts > settle::MAX_ATTEMPTS {
            warn!(max_attempts = s.max_attempts, max = settle::MAX_ATTEMPTS, "settle.max_attempts exceeds maximum, clamping");
            s.max_attempts = settle::MAX_ATTEMPTS;
        }

        if self.file_manager.launch_program.trim().is_empty() {
            warn!(using = file_manager::DEFAULT_LAUNCH_PROGRAM, "file_manager.launch_program is empty, using default");
            self.file_manager.launch_program = file_manager::DEFAULT_LAUNCH_PROGRAM.to_string();
        }
        if self.file_manager.window_classes.is_empty() {
            warn!("file_manager.window_classes is empty, no windows will be recognized");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub/config.json");

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config, Config::default());
        assert!(path.exists());
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "settle": { "mode": "fixed", "delay_ms": 1500 } }"#).unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.undo_depth, undo::DEFAULT_DEPTH);
        assert_eq!(config.settle.mode, SettleMode::Fixed);
        assert_eq!(config.settle.interval_ms, settle::DEFAULT_INTERVAL_MS);
        assert_eq!(
            config.settle.policy(),
            SettlePolicy::Fixed {
                delay: Duration::from_millis(1500)
            }
        );
        assert_eq!(config.file_manager.launch_program, "thunar");
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "undo_depth": 0,
                "settle": { "delay_ms": 999999, "interval_ms": 1, "max_attempts": 1000 },
                "file_manager": { "launch_program": "  " }
            }"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.undo_depth, undo::MIN_DEPTH);
        assert_eq!(config.settle.delay_ms, settle::MAX_DELAY_MS);
        assert_eq!(config.settle.interval_ms, settle::MIN_INTERVAL_MS);
        assert_eq!(config.settle.max_attempts, settle::MAX_ATTEMPTS);
        assert_eq!(config.file_manager.launch_program, file_manager::DEFAULT_LAUNCH_PROGRAM);
    }

    #[test]
    fn test_default_policy_is_poll() {
        assert_eq!(Config::default().settle.policy(), SettlePolicy::default());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "undo_depth = 3").unwrap();

        assert!(Config::load_from(&path).is_err());
    }
}
