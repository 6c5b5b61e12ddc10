//! Store configuration via `store.toml`
//!
//! A store is opened from a `StoreConfig`. Configs can be built in code
//! (`StoreConfig::in_memory()`) or loaded from a TOML file; on first use a
//! commented default file can be written next to the data.

use dualstore_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name used by `write_default_if_missing` callers.
pub const CONFIG_FILE_NAME: &str = "store.toml";

/// How change notifications are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerKind {
    /// Run handlers on the committing thread, right after commit returns
    /// its locks.
    Immediate,
    /// Run handlers on a dedicated notification thread.
    Thread,
}

/// Store configuration loaded from `store.toml`.
///
/// # Example
///
/// ```toml
/// path = "default.store"
/// schema_version = 0
/// scheduler = "immediate"
/// max_pending_notifications = 1024
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Identifies the store in logs. The store itself is held in memory.
    #[serde(default = "default_path")]
    pub path: String,
    /// Version of the schema the store is opened with.
    #[serde(default)]
    pub schema_version: u64,
    /// Notification delivery: `"immediate"` or `"thread"`.
    #[serde(default = "default_scheduler")]
    pub scheduler: String,
    /// Bound of the notification queue when `scheduler = "thread"`.
    #[serde(default = "default_max_pending")]
    pub max_pending_notifications: usize,
}

fn default_path() -> String {
    "default.store".to_string()
}

fn default_scheduler() -> String {
    "immediate".to_string()
}

fn default_max_pending() -> usize {
    1024
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            schema_version: 0,
            scheduler: default_scheduler(),
            max_pending_notifications: default_max_pending(),
        }
    }
}

impl StoreConfig {
    /// Default configuration for an in-memory store.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Same config, with a different path label.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Same config, with the given scheduler.
    pub fn with_scheduler(mut self, kind: SchedulerKind) -> Self {
        self.scheduler = match kind {
            SchedulerKind::Immediate => "immediate",
            SchedulerKind::Thread => "thread",
        }
        .to_string();
        self
    }

    /// Parse the scheduler string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not `"immediate"` or `"thread"`.
    pub fn scheduler_kind(&self) -> Result<SchedulerKind> {
        match self.scheduler.as_str() {
            "immediate" => Ok(SchedulerKind::Immediate),
            "thread" => Ok(SchedulerKind::Thread),
            other => Err(Error::InvalidInput(format!(
                "Invalid scheduler '{}' in store.toml. Expected \"immediate\" or \"thread\".",
                other
            ))),
        }
    }

    /// Check every field, returning the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.scheduler_kind()?;
        if self.max_pending_notifications == 0 {
            return Err(Error::InvalidInput(
                "max_pending_notifications must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Store configuration
#
# Label used in logs for this store.
path = "default.store"

# Schema version the store is opened with.
schema_version = 0

# Notification delivery: "immediate" (default) or "thread"
#   "immediate" = handlers run on the committing thread after commit
#   "thread"    = handlers run on a dedicated notification thread
scheduler = "immediate"

# Queue bound for the notification thread.
max_pending_notifications = 1024
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: StoreConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
