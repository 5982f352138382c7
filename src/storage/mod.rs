//! Persistent storage for the widget
//!
//! Two scopes under one root directory (default `~/.config/agni/`):
//!
//! ~/.config/agni/
//! ├── sync/
//! │   └── settings.json              # Settings record (synced scope)
//! └── local/
//!     └── tasks.json                 # Ordered task list (local scope)
//!
//! The split mirrors the runtime contract: settings follow the profile,
//! the task list stays device-local. Both records are small and rewritten
//! wholesale on every mutation.

use crate::protocol::Settings;
use crate::tasks::Task;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const STORAGE_DIR: &str = "agni";
const SETTINGS_FILE: &str = "settings.json";
const TASKS_FILE: &str = "tasks.json";

/// File-backed storage for the settings record and the task list
pub struct WidgetStorage {
    root: PathBuf,
}

impl WidgetStorage {
    /// Initialize storage under the user config directory
    pub fn new() -> Result<Self> {
        let root = if let Some(config_dir) = dirs::config_dir() {
            config_dir.join(STORAGE_DIR)
        } else {
            // Fallback to home directory
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
                .join(STORAGE_DIR)
        };
        Self::at(root)
    }

    /// Initialize storage at an explicit root (used by tests)
    pub fn at(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join("sync"))?;
        std::fs::create_dir_all(root.join("local"))?;
        Ok(Self { root })
    }

    /// Root storage directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load the settings record, `None` if nothing was ever stored
    pub fn load_settings(&self) -> Result<Option<Settings>> {
        let path = self.root.join("sync").join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        let settings =
            serde_json::from_str(&content).context("Failed to parse sync/settings.json")?;
        Ok(Some(settings))
    }

    /// Persist the settings record; returns once the write is durable
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let path = self.root.join("sync").join(SETTINGS_FILE);
        let content = serde_json::to_string_pretty(settings)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load the ordered task list, empty if nothing was ever stored
    pub fn load_tasks(&self) -> Result<Vec<Task>> {
        let path = self.root.join("local").join(TASKS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path)?;
        let tasks = serde_json::from_str(&content).context("Failed to parse local/tasks.json")?;
        Ok(tasks)
    }

    /// Persist the ordered task list
    pub fn save_tasks(&self, tasks: &[Task]) -> Result<()> {
        let path = self.root.join("local").join(TASKS_FILE);
        let content = serde_json::to_string_pretty(tasks)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
